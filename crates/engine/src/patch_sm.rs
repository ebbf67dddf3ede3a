//! Patch Task State Machine: PrePatch → Patching → PostPatch,
//! with reboot checkpoints persisted before any system-mutating action.

use crate::context::AgentContext;
use crate::dedup::ProgressDedup;
use crate::error::TaskError;
use std::collections::HashMap;
use taskagent_adapters::patch::apply_patches;
use taskagent_core::patch::{PatchPayload, PatchStep, PatchTaskInstance, RebootConfig};
use taskagent_core::{Clock, TaskId};
use taskagent_proto::{ApplyPatchesCompletionState as Completion, ApplyPatchesProgressState as Progress};
use taskagent_storage::{StateFile, StateStore};

/// Sentinel message for a server-directed cancellation reported as patch
/// completion FAILED.
const CANCELED_BY_SERVER: &str = "task canceled by server directive";

fn evaluate_reboot(os_signal: bool, config: RebootConfig) -> bool {
    match config {
        RebootConfig::Always => true,
        RebootConfig::Never => false,
        RebootConfig::Default => os_signal,
    }
}

pub struct PatchTaskSm;

impl PatchTaskSm {
    /// Starts a brand-new patch task (not resumed from durable state).
    pub fn new_instance(task_id: TaskId, task: PatchPayload, labels: HashMap<String, String>) -> PatchTaskInstance {
        PatchTaskInstance::new(task_id, task, labels, chrono::Utc::now())
    }

    /// Runs the machine to completion (or until a fatal error forces agent
    /// shutdown), starting from `instance.patch_step` — this is how both a
    /// fresh dispatch and a post-reboot resume enter the machine.
    pub async fn run<C: Clock>(
        ctx: &AgentContext<C>,
        state_store: &StateStore,
        dedup: &mut ProgressDedup,
        mut instance: PatchTaskInstance,
    ) -> Result<(), TaskError> {
        match Self::drive(ctx, state_store, dedup, &mut instance).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => Err(e),
            Err(TaskError::ServerCancel) => {
                let _ = ctx
                    .reporter
                    .report_patch_complete(&instance.task_id, Completion::PatchesFailed, CANCELED_BY_SERVER.to_string())
                    .await;
                let _ = state_store.clear();
                dedup.forget(&instance.task_id);
                Ok(())
            }
            Err(e) => {
                let _ = ctx
                    .reporter
                    .report_patch_complete(&instance.task_id, Completion::PatchesFailed, e.to_string())
                    .await;
                let _ = state_store.clear();
                dedup.forget(&instance.task_id);
                Ok(())
            }
        }
    }

    /// Reports a progress state through the de-duplicator, returning `Err(ServerCancel)`
    /// if the response carries `STOP`.
    async fn report<C: Clock>(
        ctx: &AgentContext<C>,
        dedup: &mut ProgressDedup,
        task_id: &TaskId,
        label: &str,
        state: Progress,
    ) -> Result<(), TaskError> {
        if !dedup.should_emit(task_id, label, ctx.clock.now()) {
            return Ok(());
        }
        use crate::reporter::Directive;
        match ctx.reporter.report_patch_progress(task_id, state).await? {
            Directive::Continue => Ok(()),
            Directive::Stop => Err(TaskError::ServerCancel),
        }
    }

    async fn drive<C: Clock>(
        ctx: &AgentContext<C>,
        state_store: &StateStore,
        dedup: &mut ProgressDedup,
        instance: &mut PatchTaskInstance,
    ) -> Result<(), TaskError> {
        if instance.patch_step == PatchStep::PrePatch {
            Self::report(ctx, dedup, &instance.task_id, "STARTED", Progress::ApplyPatchesStarted).await?;

            instance.patch_step = PatchStep::Patching;
            state_store
                .save(&StateFile::from_patch_task(instance))
                .map_err(|e| TaskError::Infrastructure(e.to_string()))?;

            let os_signal = ctx.reboot_controller.reboot_required();
            if evaluate_reboot(os_signal, instance.task.pre_patch_reboot_config) && !instance.task.dry_run {
                Self::report(ctx, dedup, &instance.task_id, "REBOOTING", Progress::Rebooting).await?;
                instance.reboot_count += 1;
                state_store
                    .save(&StateFile::from_patch_task(instance))
                    .map_err(|e| TaskError::Infrastructure(e.to_string()))?;
                ctx.reboot_controller.reboot().await.map_err(TaskError::Infrastructure)?;
                // `reboot()` never returns on success (process suspends for
                // the actual restart); reaching here means it failed.
                return Ok(());
            }
        }

        if instance.patch_step == PatchStep::Patching {
            Self::report(ctx, dedup, &instance.task_id, "APPLYING_PATCHES", Progress::ApplyingPatches).await?;

            apply_patches(&ctx.patch_adapters).await.map_err(TaskError::Infrastructure)?;

            instance.patch_step = PatchStep::PostPatch;

            let os_signal = ctx.reboot_controller.reboot_required();
            if evaluate_reboot(os_signal, instance.task.post_patch_reboot_config) && !instance.task.dry_run {
                Self::report(ctx, dedup, &instance.task_id, "REBOOTING", Progress::Rebooting).await?;
                instance.reboot_count += 1;
                state_store
                    .save(&StateFile::from_patch_task(instance))
                    .map_err(|e| TaskError::Infrastructure(e.to_string()))?;
                ctx.reboot_controller.reboot().await.map_err(TaskError::Infrastructure)?;
                return Ok(());
            }

            state_store
                .save(&StateFile::from_patch_task(instance))
                .map_err(|e| TaskError::Infrastructure(e.to_string()))?;
        }

        let still_required = ctx.reboot_controller.reboot_required();
        let completion = if still_required { Completion::PatchesSucceededRebootRequired } else { Completion::PatchesSucceeded };
        ctx.reporter.report_patch_complete(&instance.task_id, completion, String::new()).await?;
        let _ = state_store.clear();
        dedup.forget(&instance.task_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_reboot_always_ignores_os_signal() {
        assert!(evaluate_reboot(false, RebootConfig::Always));
    }

    #[test]
    fn evaluate_reboot_never_ignores_os_signal() {
        assert!(!evaluate_reboot(true, RebootConfig::Never));
    }

    #[test]
    fn evaluate_reboot_default_follows_os_signal() {
        assert!(evaluate_reboot(true, RebootConfig::Default));
        assert!(!evaluate_reboot(false, RebootConfig::Default));
    }
}
