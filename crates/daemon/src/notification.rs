//! Notification Stream Controller: Disconnected → Connecting →
//! Receiving → (Disconnected | Terminated), with classified-backoff
//! reconnection and a single-slot wake-up for the task runner.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use taskagent_engine::{backoff, AgentContext, TaskError};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Consecutive non-`RESOURCE_EXHAUSTED` errors tolerated before the
/// controller gives up and terminates.
const MAX_CONSECUTIVE_OTHER_ERRORS: u32 = 10;

enum Outcome {
    Terminate,
    ResourceExhausted,
    OtherRetryable,
}

fn classify(error: &TaskError) -> Outcome {
    match error {
        TaskError::ServiceDisabled(_) | TaskError::NoIdentity(_) => Outcome::Terminate,
        TaskError::ResourceExhausted(_) => Outcome::ResourceExhausted,
        _ => Outcome::OtherRetryable,
    }
}

/// Drives the reconnect loop until `cancel` fires or the controller
/// observes a fatal condition. Each delivered notification triggers
/// `wake.notify_one()`; `Notify` already coalesces concurrent permits into
/// one, which is exactly the single-slot de-duplication this needs.
pub async fn run<C: taskagent_core::Clock>(
    ctx: Arc<AgentContext<C>>,
    agent_version: String,
    wake: Arc<Notify>,
    cancel: CancellationToken,
) {
    let resource_exhausted_streak = AtomicU32::new(0);
    let other_error_streak = AtomicU32::new(0);

    loop {
        if cancel.is_cancelled() {
            return;
        }

        let stream = tokio::select! {
            _ = cancel.cancelled() => return,
            result = ctx.reporter.receive_notifications(&agent_version) => result,
        };

        let mut stream = match stream {
            Ok(s) => {
                resource_exhausted_streak.store(0, Ordering::SeqCst);
                other_error_streak.store(0, Ordering::SeqCst);
                s
            }
            Err(e) => {
                if handle_error(&e, &resource_exhausted_streak, &other_error_streak, &cancel).await {
                    return;
                }
                continue;
            }
        };

        loop {
            let msg = tokio::select! {
                _ = cancel.cancelled() => return,
                msg = stream.message() => msg,
            };

            match msg {
                Ok(Some(_)) => {
                    wake.notify_one();
                }
                Ok(None) => {
                    tracing::debug!("notification stream EOF, reconnecting");
                    break;
                }
                Err(status) => {
                    let e = TaskError::from(status);
                    if handle_error(&e, &resource_exhausted_streak, &other_error_streak, &cancel).await {
                        return;
                    }
                    break;
                }
            }
        }
    }
}

/// Applies classified backoff for a connect/stream error, returning `true`
/// when the controller should terminate.
async fn handle_error(
    error: &TaskError,
    resource_exhausted_streak: &AtomicU32,
    other_error_streak: &AtomicU32,
    cancel: &CancellationToken,
) -> bool {
    match classify(error) {
        Outcome::Terminate => {
            tracing::error!(error = %error, "notification controller terminating");
            true
        }
        Outcome::ResourceExhausted => {
            let streak = resource_exhausted_streak.fetch_add(1, Ordering::SeqCst) + 1;
            let sleep = backoff::backoff_duration(streak, backoff::RESOURCE_EXHAUSTED_EXTRA);
            tracing::warn!(streak, sleep_secs = sleep.as_secs(), "notification stream throttled");
            sleep_or_cancel(sleep, cancel).await;
            false
        }
        Outcome::OtherRetryable => {
            let streak = other_error_streak.fetch_add(1, Ordering::SeqCst) + 1;
            if streak >= MAX_CONSECUTIVE_OTHER_ERRORS {
                tracing::error!(streak, "notification controller exceeded retry streak, terminating");
                return true;
            }
            let sleep = backoff::backoff_duration(streak, 0);
            tracing::warn!(error = %error, streak, sleep_secs = sleep.as_secs(), "notification stream error, reconnecting");
            sleep_or_cancel(sleep, cancel).await;
            false
        }
    }
}

async fn sleep_or_cancel(sleep: std::time::Duration, cancel: &CancellationToken) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(sleep) => {}
    }
}
