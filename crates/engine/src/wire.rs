//! Conversions between the domain types in `taskagent-core` and the
//! generated gRPC messages in `taskagent-proto`.
//!
//! Kept as a dedicated module rather than `From`/`TryFrom` impls on the
//! proto types directly, since `taskagent-proto` must stay free of a
//! dependency on `taskagent-core` (the generated code is vendored output,
//! not hand-authored domain logic) — mirrors the reference's `oj-wire`
//! crate owning response shaping rather than its callers reimplementing it
//! ad hoc at each call site.

use taskagent_core::patch::RebootConfig as CoreRebootConfig;
use taskagent_core::resource::{OSPolicy as CoreOSPolicy, OSPolicyMode as CoreOSPolicyMode};
use taskagent_core::task::{
    ConfigPayload, ExecPayload, ExecSource, ExecStepConfig as CoreExecStepConfig, Interpreter as CoreInterpreter,
    Task as CoreTask, TaskPayload, TaskType as CoreTaskType,
};
use taskagent_core::{PatchPayload, TaskId};
use taskagent_proto as proto;

/// A task dispatched by `StartNextTask` could not be turned into a
/// `CoreTask`. `UnknownTaskType` covers a `task_type` this build doesn't
/// recognize — the server has outpaced the agent's supported set — which
/// callers should log and skip rather than treat as a fatal RPC error.
/// `Malformed` covers any other decode failure, which is always a bug
/// somewhere and stays fatal to the current poll.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DecodeError {
    #[error("unrecognized task type from service")]
    UnknownTaskType,
    #[error("malformed task from service: {0}")]
    Malformed(String),
}

fn bad(msg: impl Into<String>) -> DecodeError {
    DecodeError::Malformed(msg.into())
}

pub fn decode_task(t: proto::Task) -> Result<CoreTask, DecodeError> {
    let task_type = proto::TaskType::try_from(t.task_type).map_err(|_| DecodeError::UnknownTaskType)?;
    let payload = match t.task_details.ok_or(DecodeError::UnknownTaskType)? {
        proto::task::TaskDetails::ApplyPatchesTask(p) => TaskPayload::Patch(PatchPayload {
            dry_run: p.dry_run,
            pre_patch_reboot_config: decode_reboot_config(p.pre_patch_reboot_config)?,
            post_patch_reboot_config: decode_reboot_config(p.post_patch_reboot_config)?,
        }),
        proto::task::TaskDetails::ExecStepTask(p) => TaskPayload::Exec(ExecPayload {
            linux_step: p.linux_step.map(decode_exec_step_config).transpose()?,
            windows_step: p.windows_step.map(decode_exec_step_config).transpose()?,
        }),
        proto::task::TaskDetails::ApplyConfigTask(p) => TaskPayload::Config(ConfigPayload {
            policies: p.policies.into_iter().map(decode_os_policy).collect::<Result<_, _>>()?,
        }),
    };
    Ok(CoreTask {
        task_id: TaskId::from(t.task_id),
        task_type: decode_task_type(task_type),
        service_labels: t.service_labels,
        payload,
    })
}

fn decode_task_type(t: proto::TaskType) -> CoreTaskType {
    match t {
        proto::TaskType::ApplyPatches => CoreTaskType::ApplyPatches,
        proto::TaskType::ExecStepTask => CoreTaskType::ExecStep,
        proto::TaskType::ApplyConfigTask => CoreTaskType::ApplyConfig,
        proto::TaskType::Unspecified => CoreTaskType::ApplyPatches,
    }
}

pub fn encode_task_type(t: CoreTaskType) -> proto::TaskType {
    match t {
        CoreTaskType::ApplyPatches => proto::TaskType::ApplyPatches,
        CoreTaskType::ExecStep => proto::TaskType::ExecStepTask,
        CoreTaskType::ApplyConfig => proto::TaskType::ApplyConfigTask,
    }
}

fn decode_reboot_config(v: i32) -> Result<CoreRebootConfig, DecodeError> {
    match proto::RebootConfig::try_from(v).map_err(|_| bad("unknown reboot_config"))? {
        proto::RebootConfig::Default => Ok(CoreRebootConfig::Default),
        proto::RebootConfig::Always => Ok(CoreRebootConfig::Always),
        proto::RebootConfig::Never => Ok(CoreRebootConfig::Never),
    }
}

fn decode_exec_step_config(c: proto::ExecStepConfig) -> Result<CoreExecStepConfig, DecodeError> {
    let interpreter = match proto::Interpreter::try_from(c.interpreter).map_err(|_| bad("unknown interpreter"))? {
        proto::Interpreter::Unspecified => CoreInterpreter::Unspecified,
        proto::Interpreter::Shell => CoreInterpreter::Shell,
        proto::Interpreter::Powershell => CoreInterpreter::Powershell,
    };
    let source = match c.source.ok_or_else(|| bad("missing exec source"))? {
        proto::exec_step_config::Source::LocalPath(p) => ExecSource::LocalPath(p),
        proto::exec_step_config::Source::RemoteObject(r) => {
            ExecSource::Remote { uri: r.uri, sha256_checksum: r.sha256_checksum }
        }
    };
    Ok(CoreExecStepConfig { interpreter, source, allowed_success_codes: c.allowed_success_codes })
}

fn decode_os_policy(p: proto::OsPolicy) -> Result<CoreOSPolicy, DecodeError> {
    let mode = match proto::OsPolicyMode::try_from(p.mode).map_err(|_| bad("unknown policy mode"))? {
        proto::OsPolicyMode::Unspecified => return Err(bad("unspecified policy mode")),
        proto::OsPolicyMode::Validation => CoreOSPolicyMode::Validation,
        proto::OsPolicyMode::Enforcement => CoreOSPolicyMode::Enforcement,
    };
    Ok(CoreOSPolicy { id: p.id, mode, resource_ids: p.resource_ids })
}

/// Encodes a resolved resource-compliance traversal back into the wire
/// `OSPolicyResult` shape.
pub fn encode_policy_result(
    policy_id: String,
    has_error: bool,
    resource_results: Vec<proto::ResourceComplianceResult>,
) -> proto::OsPolicyResult {
    proto::OsPolicyResult { policy_id, has_error, resource_results }
}

pub fn encode_resource_compliance(rc: &taskagent_core::ResourceCompliance) -> proto::ResourceComplianceResult {
    proto::ResourceComplianceResult {
        resource_id: rc.resource_id.clone(),
        steps: rc.steps.iter().map(encode_config_step).collect(),
        state: encode_compliance_state(rc.state) as i32,
    }
}

fn encode_config_step(s: &taskagent_core::ConfigStep) -> proto::ConfigStepResult {
    proto::ConfigStepResult {
        kind: encode_step_kind(s.kind) as i32,
        outcome: encode_step_outcome(s.outcome) as i32,
        error: s.error.clone(),
    }
}

fn encode_step_kind(k: taskagent_core::ConfigStepKind) -> proto::ConfigStepKind {
    use taskagent_core::ConfigStepKind as K;
    match k {
        K::Validation => proto::ConfigStepKind::Validation,
        K::DesiredStateCheck => proto::ConfigStepKind::DesiredStateCheck,
        K::DesiredStateEnforcement => proto::ConfigStepKind::DesiredStateEnforcement,
        K::DesiredStateCheckPostEnforcement => proto::ConfigStepKind::DesiredStateCheckPostEnforcement,
    }
}

fn encode_step_outcome(o: taskagent_core::ConfigStepOutcome) -> proto::ConfigStepOutcome {
    use taskagent_core::ConfigStepOutcome as O;
    match o {
        O::Succeeded => proto::ConfigStepOutcome::ConfigStepSucceeded,
        O::Failed => proto::ConfigStepOutcome::ConfigStepFailed,
    }
}

fn encode_compliance_state(s: taskagent_core::ComplianceState) -> proto::ComplianceState {
    use taskagent_core::ComplianceState as S;
    match s {
        S::Unknown => proto::ComplianceState::Unknown,
        S::Compliant => proto::ComplianceState::Compliant,
        S::NonCompliant => proto::ComplianceState::NonCompliant,
    }
}

// --- Progress request builders -----------------------------

pub fn patch_progress_request(
    token: String,
    task_id: &TaskId,
    state: proto::ApplyPatchesProgressState,
) -> proto::ReportTaskProgressRequest {
    proto::ReportTaskProgressRequest {
        instance_id_token: token,
        task_id: task_id.as_str().to_string(),
        task_type: proto::TaskType::ApplyPatches as i32,
        progress: Some(proto::report_task_progress_request::Progress::ApplyPatchesTaskProgress(
            proto::ApplyPatchesTaskProgress { state: state as i32 },
        )),
    }
}

pub fn exec_progress_request(
    token: String,
    task_id: &TaskId,
    state: proto::ExecStepProgressState,
) -> proto::ReportTaskProgressRequest {
    proto::ReportTaskProgressRequest {
        instance_id_token: token,
        task_id: task_id.as_str().to_string(),
        task_type: proto::TaskType::ExecStepTask as i32,
        progress: Some(proto::report_task_progress_request::Progress::ExecStepTaskProgress(
            proto::ExecStepTaskProgress { state: state as i32 },
        )),
    }
}

pub fn config_progress_request(
    token: String,
    task_id: &TaskId,
    state: proto::ApplyConfigProgressState,
) -> proto::ReportTaskProgressRequest {
    proto::ReportTaskProgressRequest {
        instance_id_token: token,
        task_id: task_id.as_str().to_string(),
        task_type: proto::TaskType::ApplyConfigTask as i32,
        progress: Some(proto::report_task_progress_request::Progress::ApplyConfigTaskProgress(
            proto::ApplyConfigTaskProgress { state: state as i32 },
        )),
    }
}

// --- Completion request builders ---------------------------------------

pub fn patch_complete_request(
    token: String,
    task_id: &TaskId,
    state: proto::ApplyPatchesCompletionState,
    error_message: String,
) -> proto::ReportTaskCompleteRequest {
    proto::ReportTaskCompleteRequest {
        instance_id_token: token,
        task_id: task_id.as_str().to_string(),
        task_type: proto::TaskType::ApplyPatches as i32,
        error_message,
        output: Some(proto::report_task_complete_request::Output::ApplyPatchesTaskOutput(
            proto::ApplyPatchesTaskOutput { state: state as i32 },
        )),
    }
}

pub fn exec_complete_request(
    token: String,
    task_id: &TaskId,
    state: proto::ExecStepCompletionState,
    exit_code: i32,
    error_message: String,
) -> proto::ReportTaskCompleteRequest {
    proto::ReportTaskCompleteRequest {
        instance_id_token: token,
        task_id: task_id.as_str().to_string(),
        task_type: proto::TaskType::ExecStepTask as i32,
        error_message,
        output: Some(proto::report_task_complete_request::Output::ExecStepTaskOutput(
            proto::ExecStepTaskOutput { state: state as i32, exit_code },
        )),
    }
}

pub fn config_complete_request(
    token: String,
    task_id: &TaskId,
    state: proto::ApplyConfigCompletionState,
    policy_results: Vec<proto::OsPolicyResult>,
    error_message: String,
) -> proto::ReportTaskCompleteRequest {
    proto::ReportTaskCompleteRequest {
        instance_id_token: token,
        task_id: task_id.as_str().to_string(),
        task_type: proto::TaskType::ApplyConfigTask as i32,
        error_message,
        output: Some(proto::report_task_complete_request::Output::ApplyConfigTaskOutput(
            proto::ApplyConfigTaskOutput { state: state as i32, policy_results },
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_task_rejects_missing_details() {
        let t = proto::Task {
            task_id: "t1".into(),
            task_type: proto::TaskType::ApplyPatches as i32,
            service_labels: Default::default(),
            task_details: None,
        };
        assert!(decode_task(t).is_err());
    }

    #[test]
    fn decode_task_round_trips_patch_payload() {
        let t = proto::Task {
            task_id: "t1".into(),
            task_type: proto::TaskType::ApplyPatches as i32,
            service_labels: Default::default(),
            task_details: Some(proto::task::TaskDetails::ApplyPatchesTask(proto::ApplyPatchesTask {
                dry_run: true,
                pre_patch_reboot_config: proto::RebootConfig::Always as i32,
                post_patch_reboot_config: proto::RebootConfig::Never as i32,
            })),
        };
        let decoded = decode_task(t).unwrap();
        match decoded.payload {
            TaskPayload::Patch(p) => {
                assert!(p.dry_run);
                assert_eq!(p.pre_patch_reboot_config, CoreRebootConfig::Always);
                assert_eq!(p.post_patch_reboot_config, CoreRebootConfig::Never);
            }
            _ => panic!("expected patch payload"),
        }
    }

    #[test]
    fn encode_task_type_round_trips_through_decode() {
        for t in [CoreTaskType::ApplyPatches, CoreTaskType::ExecStep, CoreTaskType::ApplyConfig] {
            assert_eq!(decode_task_type(encode_task_type(t)), t);
        }
    }
}
