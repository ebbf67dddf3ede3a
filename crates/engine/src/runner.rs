//! Task Runner: the single-writer dispatch loop that drains
//! `start_next_task` until the service reports no further work, routing
//! each task to its state machine.

use crate::context::AgentContext;
use crate::dedup::ProgressDedup;
use crate::error::TaskError;
use crate::{ConfigTaskSm, ExecTaskSm, PatchTaskSm};
use std::sync::Arc;
use taskagent_core::task::{Task, TaskPayload};
use taskagent_core::Clock;
use taskagent_storage::StateStore;

/// Owns the in-memory dispatch state (`ProgressDedup`), touched only from
/// the dispatch loop holding the task-runner lock —
/// callers enforce that lock externally (the notification controller's
/// single-slot queue already guarantees one `drain` call runs at a time).
pub struct TaskRunner<C: Clock> {
    ctx: Arc<AgentContext<C>>,
    state_store: Arc<StateStore>,
    dedup: ProgressDedup,
}

impl<C: Clock> TaskRunner<C> {
    pub fn new(ctx: Arc<AgentContext<C>>, state_store: Arc<StateStore>) -> Self {
        Self { ctx, state_store, dedup: ProgressDedup::new() }
    }

    /// Loads any persisted task from durable storage and resumes it before the runner's
    /// first dispatch cycle. A loaded run re-enters the
    /// patch machine at its saved step (P6).
    pub async fn resume_on_startup(&mut self) -> Result<(), TaskError> {
        let Some(state_file) = self.state_store.load().map_err(|e| TaskError::Infrastructure(e.to_string()))? else {
            return Ok(());
        };
        let Some(instance) = state_file.into_patch_task().map_err(|e| TaskError::Infrastructure(e.to_string()))? else {
            return Ok(());
        };
        tracing::info!(task_id = instance.task_id.as_str(), step = ?instance.patch_step, "resuming persisted patch task");
        PatchTaskSm::run(&self.ctx, &self.state_store, &mut self.dedup, instance).await
    }

    /// Drains every pending task via `start_next_task` until the service
    /// reports no further work. The caller holds the task-runner
    /// lock for the duration of this call.
    pub async fn drain(&mut self) -> Result<(), TaskError> {
        loop {
            let Some(task) = self.ctx.reporter.start_next_task().await? else {
                return Ok(());
            };
            self.dispatch(task).await?;
        }
    }

    async fn dispatch(&mut self, task: Task) -> Result<(), TaskError> {
        match task.payload {
            TaskPayload::Patch(payload) => {
                let instance = PatchTaskSm::new_instance(task.task_id, payload, task.service_labels);
                PatchTaskSm::run(&self.ctx, &self.state_store, &mut self.dedup, instance).await
            }
            TaskPayload::Exec(payload) => ExecTaskSm::run(&self.ctx, &mut self.dedup, task.task_id, payload).await,
            TaskPayload::Config(payload) => ConfigTaskSm::run(&self.ctx, &mut self.dedup, task.task_id, payload).await,
        }
    }
}
