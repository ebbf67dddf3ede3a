//! Exec Task State Machine: single-shot fetch-and-run with
//! interpreter routing and a cancellation check before execution.

use crate::context::AgentContext;
use crate::dedup::ProgressDedup;
use crate::error::TaskError;
use crate::reporter::Directive;
use taskagent_adapters::exec::LaunchSpec;
use taskagent_core::task::{ExecPayload, ExecSource, ExecStepConfig, Interpreter};
use taskagent_core::{Clock, TaskId};
use taskagent_proto::{ExecStepCompletionState as Completion, ExecStepProgressState as Progress};

pub struct ExecTaskSm;

impl ExecTaskSm {
    pub async fn run<C: Clock>(
        ctx: &AgentContext<C>,
        dedup: &mut ProgressDedup,
        task_id: TaskId,
        payload: ExecPayload,
    ) -> Result<(), TaskError> {
        let directive = if dedup.should_emit(&task_id, "STARTED", ctx.clock.now()) {
            Some(ctx.reporter.report_exec_progress(&task_id, Progress::ExecStepStarted).await?)
        } else {
            None
        };
        dedup.forget(&task_id);

        if directive == Some(Directive::Stop) {
            ctx.reporter
                .report_exec_complete(&task_id, Completion::ExecStepCancelled, -1, String::new())
                .await?;
            return Ok(());
        }

        let step = if cfg!(target_os = "windows") { &payload.windows_step } else { &payload.linux_step };
        let Some(step) = step else {
            ctx.reporter.report_exec_complete(&task_id, Completion::ExecStepCompleted, 0, String::new()).await?;
            return Ok(());
        };

        let (exit_code, error_message) = Self::execute(ctx, step).await;
        ctx.reporter.report_exec_complete(&task_id, Completion::ExecStepCompleted, exit_code, error_message).await?;
        Ok(())
    }

    async fn execute<C: Clock>(ctx: &AgentContext<C>, step: &ExecStepConfig) -> (i32, String) {
        let local_path = match &step.source {
            ExecSource::LocalPath(p) => p.clone(),
            ExecSource::Remote { uri, sha256_checksum } => {
                let dest_dir = std::env::temp_dir();
                match ctx.object_fetcher.fetch(uri, sha256_checksum.as_deref(), &dest_dir).await {
                    Ok(path) => path.to_string_lossy().into_owned(),
                    Err(e) => return (-1, e.to_string()),
                }
            }
        };

        let spec = match Self::launch_spec(step.interpreter, &local_path) {
            Ok(spec) => spec,
            Err(e) => return (-1, e),
        };

        let result = ctx.process_launcher.launch(spec).await;
        (result.exit_code, result.launch_error.unwrap_or_default())
    }

    /// Routes interpreter + platform to an argv.
    fn launch_spec(interpreter: Interpreter, path: &str) -> Result<LaunchSpec, String> {
        if cfg!(target_os = "windows") {
            match interpreter {
                Interpreter::Unspecified => Err("WinNoInterpreter".to_string()),
                Interpreter::Shell => {
                    Ok(LaunchSpec { program: "cmd".to_string(), args: vec!["/c".to_string(), path.to_string()] })
                }
                Interpreter::Powershell => Ok(LaunchSpec {
                    program: "powershell".to_string(),
                    args: vec![
                        "-NonInteractive".to_string(),
                        "-NoProfile".to_string(),
                        "-ExecutionPolicy".to_string(),
                        "Bypass".to_string(),
                        "-File".to_string(),
                        path.to_string(),
                    ],
                }),
            }
        } else {
            match interpreter {
                Interpreter::Unspecified => Ok(LaunchSpec { program: path.to_string(), args: vec![] }),
                Interpreter::Shell => {
                    Ok(LaunchSpec { program: "/bin/sh".to_string(), args: vec![path.to_string()] })
                }
                Interpreter::Powershell => Err("LinuxPowerShell".to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_os = "windows"))]
    fn linux_shell_routes_through_bin_sh() {
        let spec = ExecTaskSm::launch_spec(Interpreter::Shell, "/tmp/x.sh").unwrap();
        assert_eq!(spec.program, "/bin/sh");
        assert_eq!(spec.args, vec!["/tmp/x.sh".to_string()]);
    }

    #[test]
    #[cfg(not(target_os = "windows"))]
    fn linux_powershell_is_rejected() {
        let err = ExecTaskSm::launch_spec(Interpreter::Powershell, "/tmp/x.ps1").unwrap_err();
        assert_eq!(err, "LinuxPowerShell");
    }

    #[test]
    #[cfg(not(target_os = "windows"))]
    fn linux_unspecified_execs_direct() {
        let spec = ExecTaskSm::launch_spec(Interpreter::Unspecified, "/tmp/x").unwrap();
        assert_eq!(spec.program, "/tmp/x");
        assert!(spec.args.is_empty());
    }

    #[test]
    #[cfg(target_os = "windows")]
    fn windows_unspecified_is_rejected() {
        let err = ExecTaskSm::launch_spec(Interpreter::Unspecified, "C:\\x.exe").unwrap_err();
        assert_eq!(err, "WinNoInterpreter");
    }
}
