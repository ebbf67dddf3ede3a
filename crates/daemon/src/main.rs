// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process entry point: resolves configuration, opens the gRPC channel,
//! wires the OS-facing adapters, then alternates between the task-runner
//! drain loop and the notification stream's wake-ups until the process is
//! asked to shut down.
//!
//! Exit codes: 0 on a clean shutdown, non-zero on an uncaught fatal error.

use std::sync::Arc;
use taskagent_adapters::exec::{NullObjectFetcher, TokioProcessLauncher};
use taskagent_adapters::identity::NullIdentitySource;
use taskagent_adapters::inventory::{NullGuestAttributeSink, NullInventoryCollector};
use taskagent_adapters::metadata::NullMetadataSource;
use taskagent_adapters::patch::default_adapters;
use taskagent_adapters::reboot::SystemRebootController;
use taskagent_adapters::resource_factory::NullResourceFactory;
use taskagent_core::identity::TokenCache;
use taskagent_core::SystemClock;
use taskagent_daemon::{config_loader, notification};
use taskagent_engine::{AgentContext, Reporter, TaskRunner};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tonic::transport::Channel;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .init();

    let exit_code = run().await;
    std::process::exit(exit_code);
}

async fn run() -> i32 {
    // The real metadata-server identity and attribute sources are out of
    // scope for this crate; NullMetadataSource/NullIdentitySource fail
    // every call until an environment-specific adapter replaces them.
    let metadata_source = NullMetadataSource;
    let config = config_loader::load(&metadata_source).await;

    let channel = match Channel::from_shared(format!("https://{}", config.endpoint)) {
        Ok(endpoint) => endpoint.connect_lazy(),
        Err(e) => {
            tracing::error!(error = %e, "invalid control-plane endpoint");
            return 1;
        }
    };
    let client = taskagent_proto::AgentEndpointServiceClient::new(channel);
    let token_cache = Arc::new(TokenCache::new(Box::new(NullIdentitySource)));
    let reporter = Reporter::new(client, token_cache);

    let ctx = Arc::new(AgentContext::new(
        SystemClock,
        config,
        reporter,
        default_adapters(),
        Arc::new(TokioProcessLauncher),
        Arc::new(NullObjectFetcher),
        Arc::new(SystemRebootController),
        Arc::new(NullInventoryCollector),
        Arc::new(NullGuestAttributeSink),
        Arc::new(NullResourceFactory),
    ));

    let state_store = Arc::new(taskagent_storage::StateStore::new(taskagent_storage::default_state_path()));
    let mut runner = TaskRunner::new(ctx.clone(), state_store);

    if let Err(e) = runner.resume_on_startup().await {
        if e.is_fatal() {
            tracing::error!(error = %e, "fatal error resuming persisted task");
            return 1;
        }
        tracing::warn!(error = %e, "failed to resume persisted task, continuing");
    }

    let capabilities = vec!["ApplyPatches".to_string(), "ExecStep".to_string(), "ApplyConfig".to_string()];
    if let Err(e) = ctx.reporter.register_agent(AGENT_VERSION, capabilities).await {
        if e.is_fatal() {
            tracing::error!(error = %e, "fatal error registering agent");
            return 1;
        }
        tracing::warn!(error = %e, "failed to register agent, continuing");
    }

    let wake = Arc::new(Notify::new());
    let cancel = CancellationToken::new();

    let notification_task = if ctx.config.task_notification_enabled {
        let notification_ctx = ctx.clone();
        let notification_wake = wake.clone();
        let notification_cancel = cancel.clone();
        Some(tokio::spawn(async move {
            notification::run(notification_ctx, AGENT_VERSION.to_string(), notification_wake, notification_cancel).await;
        }))
    } else {
        tracing::info!("task notification stream disabled, polling only");
        None
    };

    let shutdown_cancel = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        shutdown_cancel.cancel();
    });

    let mut exit_code = 0;
    loop {
        if cancel.is_cancelled() {
            break;
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = wake.notified() => {
                if let Err(e) = runner.drain().await {
                    tracing::error!(error = %e, "task runner drain failed");
                    if e.is_fatal() {
                        exit_code = 1;
                        cancel.cancel();
                        break;
                    }
                }
            }
            _ = tokio::time::sleep(ctx.config.poll_interval) => {
                if let Err(e) = runner.drain().await {
                    tracing::error!(error = %e, "task runner drain failed");
                    if e.is_fatal() {
                        exit_code = 1;
                        cancel.cancel();
                        break;
                    }
                }
            }
        }
    }

    cancel.cancel();
    if let Some(task) = notification_task {
        let _ = task.await;
    }
    exit_code
}
