//! Reporter: injects the identity token into every request and wraps
//! each unary RPC with classified retry/backoff.

use crate::backoff::{self, RESOURCE_EXHAUSTED_EXTRA};
use crate::error::TaskError;
use crate::wire;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use taskagent_core::identity::TokenCache;
use taskagent_core::task::Task as CoreTask;
use taskagent_proto as proto;
use tonic::transport::Channel;
use tonic::{Code, Streaming};

/// Default per-call retry budget.
pub const DEFAULT_CALL_BUDGET: Duration = Duration::from_secs(600);

/// Outcome of a `ReportTaskProgress` or stream-driven directive check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Continue,
    Stop,
}

pub struct Reporter {
    client: proto::AgentEndpointServiceClient<Channel>,
    token_cache: Arc<TokenCache>,
    call_budget: Duration,
}

impl Reporter {
    pub fn new(client: proto::AgentEndpointServiceClient<Channel>, token_cache: Arc<TokenCache>) -> Self {
        Self { client, token_cache, call_budget: DEFAULT_CALL_BUDGET }
    }

    #[cfg(test)]
    pub fn with_call_budget(mut self, budget: Duration) -> Self {
        self.call_budget = budget;
        self
    }

    async fn token(&self) -> Result<String, TaskError> {
        Ok(self.token_cache.token(chrono::Utc::now()).await?)
    }

    /// Retries on the retryable status set, applying
    /// extended backoff for RESOURCE_EXHAUSTED, returning immediately on any
    /// other classified error.
    async fn retry_api_call<T, F, Fut>(&self, name: &'static str, mut f: F) -> Result<T, TaskError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, tonic::Status>>,
    {
        let mut attempt: u32 = 0;
        let mut elapsed = Duration::ZERO;
        loop {
            let token = self.token().await?;
            match f(token).await {
                Ok(v) => return Ok(v),
                Err(status) => {
                    let code = status.code();
                    if !backoff::is_retryable(code) {
                        return Err(TaskError::from_status(status));
                    }
                    let extra = if code == Code::ResourceExhausted { RESOURCE_EXHAUSTED_EXTRA } else { 0 };
                    let sleep = backoff::backoff_duration(attempt, extra);
                    if elapsed + sleep > self.call_budget {
                        tracing::warn!(rpc = name, attempts = attempt + 1, "retry budget exhausted");
                        return Err(TaskError::from_status(status));
                    }
                    tracing::debug!(rpc = name, attempt, sleep_secs = sleep.as_secs(), "retrying rpc");
                    tokio::time::sleep(sleep).await;
                    elapsed += sleep;
                    attempt += 1;
                }
            }
        }
    }

    pub async fn register_agent(&self, agent_version: &str, capabilities: Vec<String>) -> Result<(), TaskError> {
        self.retry_api_call("RegisterAgent", |token| {
            let mut client = self.client.clone();
            let req = proto::RegisterAgentRequest {
                instance_id_token: token,
                agent_version: agent_version.to_string(),
                supported_capabilities: capabilities.clone(),
            };
            async move { client.register_agent(req).await.map(|r| r.into_inner()) }
        })
        .await?;
        Ok(())
    }

    /// Opens the server-push notification stream. Not itself wrapped
    /// in `retry_api_call`; the notification stream controller owns
    /// reconnect policy since a stream error's classification differs from
    /// a unary call's.
    pub async fn receive_notifications(
        &self,
        agent_version: &str,
    ) -> Result<Streaming<proto::ReceiveTaskNotificationResponse>, TaskError> {
        let token = self.token().await?;
        let mut client = self.client.clone();
        let req = proto::ReceiveTaskNotificationRequest {
            instance_id_token: token,
            agent_version: agent_version.to_string(),
        };
        let resp = client.receive_task_notification(req).await.map_err(TaskError::from_status)?;
        Ok(resp.into_inner())
    }

    /// Polls for the next task, skipping over any the agent doesn't
    /// recognize the type of rather than surfacing them as a fatal error —
    /// a newer server may hand out task types older agent builds predate.
    pub async fn start_next_task(&self) -> Result<Option<CoreTask>, TaskError> {
        loop {
            let resp = self
                .retry_api_call("StartNextTask", |token| {
                    let mut client = self.client.clone();
                    let req = proto::StartNextTaskRequest { instance_id_token: token };
                    async move { client.start_next_task(req).await.map(|r| r.into_inner()) }
                })
                .await?;
            match resp.task {
                None => return Ok(None),
                Some(t) => match wire::decode_task(t) {
                    Ok(task) => return Ok(Some(task)),
                    Err(wire::DecodeError::UnknownTaskType) => {
                        tracing::warn!("skipping task of unrecognized type, polling for next");
                        continue;
                    }
                    Err(e) => return Err(TaskError::Infrastructure(e.to_string())),
                },
            }
        }
    }

    async fn report_progress_request(
        &self,
        build: impl Fn(String) -> proto::ReportTaskProgressRequest,
    ) -> Result<Directive, TaskError> {
        let resp = self
            .retry_api_call("ReportTaskProgress", |token| {
                let mut client = self.client.clone();
                let req = build(token);
                async move { client.report_task_progress(req).await.map(|r| r.into_inner()) }
            })
            .await?;
        Ok(decode_directive(resp.task_directive))
    }

    pub async fn report_patch_progress(
        &self,
        task_id: &taskagent_core::TaskId,
        state: proto::ApplyPatchesProgressState,
    ) -> Result<Directive, TaskError> {
        self.report_progress_request(|token| wire::patch_progress_request(token, task_id, state)).await
    }

    pub async fn report_exec_progress(
        &self,
        task_id: &taskagent_core::TaskId,
        state: proto::ExecStepProgressState,
    ) -> Result<Directive, TaskError> {
        self.report_progress_request(|token| wire::exec_progress_request(token, task_id, state)).await
    }

    pub async fn report_config_progress(
        &self,
        task_id: &taskagent_core::TaskId,
        state: proto::ApplyConfigProgressState,
    ) -> Result<Directive, TaskError> {
        self.report_progress_request(|token| wire::config_progress_request(token, task_id, state)).await
    }

    async fn report_complete_request(
        &self,
        build: impl Fn(String) -> proto::ReportTaskCompleteRequest,
    ) -> Result<(), TaskError> {
        self.retry_api_call("ReportTaskComplete", |token| {
            let mut client = self.client.clone();
            let req = build(token);
            async move { client.report_task_complete(req).await.map(|r| r.into_inner()) }
        })
        .await?;
        Ok(())
    }

    pub async fn report_patch_complete(
        &self,
        task_id: &taskagent_core::TaskId,
        state: proto::ApplyPatchesCompletionState,
        error_message: String,
    ) -> Result<(), TaskError> {
        self.report_complete_request(|token| {
            wire::patch_complete_request(token, task_id, state, error_message.clone())
        })
        .await
    }

    pub async fn report_exec_complete(
        &self,
        task_id: &taskagent_core::TaskId,
        state: proto::ExecStepCompletionState,
        exit_code: i32,
        error_message: String,
    ) -> Result<(), TaskError> {
        self.report_complete_request(|token| {
            wire::exec_complete_request(token, task_id, state, exit_code, error_message.clone())
        })
        .await
    }

    pub async fn report_config_complete(
        &self,
        task_id: &taskagent_core::TaskId,
        state: proto::ApplyConfigCompletionState,
        policy_results: Vec<proto::OsPolicyResult>,
        error_message: String,
    ) -> Result<(), TaskError> {
        self.report_complete_request(|token| {
            wire::config_complete_request(token, task_id, state, policy_results.clone(), error_message.clone())
        })
        .await
    }

    pub async fn report_inventory(
        &self,
        checksum: String,
        full_payload: Option<Vec<u8>>,
    ) -> Result<Option<bool>, TaskError> {
        let resp = self
            .retry_api_call("ReportInventory", |token| {
                let mut client = self.client.clone();
                let req = proto::ReportInventoryRequest {
                    instance_id_token: token,
                    inventory_checksum: checksum.clone(),
                    inventory: full_payload.clone().map(|payload| proto::Inventory { payload }),
                };
                async move { client.report_inventory(req).await.map(|r| r.into_inner()) }
            })
            .await?;
        Ok(resp.report_full_inventory)
    }
}

fn decode_directive(raw: i32) -> Directive {
    match proto::TaskDirective::try_from(raw) {
        Ok(proto::TaskDirective::Stop) => Directive::Stop,
        _ => Directive::Continue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_directive_defaults_to_continue_on_unknown() {
        assert_eq!(decode_directive(99), Directive::Continue);
    }

    #[test]
    fn decode_directive_recognizes_stop() {
        assert_eq!(decode_directive(proto::TaskDirective::Stop as i32), Directive::Stop);
    }
}
