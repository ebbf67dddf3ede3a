//! Progress de-duplicator: suppresses repeat progress emissions for the
//! same `(task_id, state)` within a short window.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use taskagent_core::TaskId;

/// Production value is not operator-configurable — the `#[cfg(test)]` constructor is the only override.
const DEFAULT_WINDOW: Duration = Duration::from_secs(5);

/// Per-task mapping from progress state to last-emission timestamp.
///
/// Lives behind the task runner's lock — this type is
/// intentionally `!Sync`-agnostic; callers own exclusivity.
pub struct ProgressDedup {
    window: Duration,
    last_emitted: HashMap<(TaskId, String), Instant>,
}

impl ProgressDedup {
    pub fn new() -> Self {
        Self { window: DEFAULT_WINDOW, last_emitted: HashMap::new() }
    }

    #[cfg(test)]
    pub fn with_window(window: Duration) -> Self {
        Self { window, last_emitted: HashMap::new() }
    }

    /// Returns `true` the first time `state` is seen for `task_id` (or once
    /// the window has elapsed since the last emission), recording `now` as
    /// the new last-emission time. Returns `false` when the emission should
    /// be suppressed.
    pub fn should_emit(&mut self, task_id: &TaskId, state: &str, now: Instant) -> bool {
        let key = (task_id.clone(), state.to_string());
        if let Some(&last) = self.last_emitted.get(&key) {
            if now.duration_since(last) < self.window {
                return false;
            }
        }
        self.last_emitted.insert(key, now);
        true
    }

    /// Drops all recorded state for a task; called once the task reaches a
    /// terminal completion report so the map doesn't grow unbounded across
    /// the agent's lifetime.
    pub fn forget(&mut self, task_id: &TaskId) {
        self.last_emitted.retain(|(id, _), _| id != task_id);
    }
}

impl Default for ProgressDedup {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_emission_for_state_is_never_suppressed() {
        let mut dedup = ProgressDedup::with_window(Duration::from_secs(5));
        let task: TaskId = "t1".into();
        assert!(dedup.should_emit(&task, "STARTED", Instant::now()));
    }

    #[test]
    fn repeat_within_window_is_suppressed() {
        let mut dedup = ProgressDedup::with_window(Duration::from_secs(5));
        let task: TaskId = "t1".into();
        let t0 = Instant::now();
        assert!(dedup.should_emit(&task, "APPLYING_PATCHES", t0));
        assert!(!dedup.should_emit(&task, "APPLYING_PATCHES", t0 + Duration::from_secs(1)));
    }

    #[test]
    fn repeat_after_window_is_emitted_again() {
        let mut dedup = ProgressDedup::with_window(Duration::from_secs(5));
        let task: TaskId = "t1".into();
        let t0 = Instant::now();
        assert!(dedup.should_emit(&task, "APPLYING_PATCHES", t0));
        assert!(dedup.should_emit(&task, "APPLYING_PATCHES", t0 + Duration::from_secs(6)));
    }

    #[test]
    fn zero_window_never_suppresses() {
        let mut dedup = ProgressDedup::with_window(Duration::ZERO);
        let task: TaskId = "t1".into();
        let now = Instant::now();
        assert!(dedup.should_emit(&task, "S", now));
        assert!(dedup.should_emit(&task, "S", now));
    }

    #[test]
    fn different_states_are_independent() {
        let mut dedup = ProgressDedup::with_window(Duration::from_secs(5));
        let task: TaskId = "t1".into();
        let now = Instant::now();
        assert!(dedup.should_emit(&task, "STARTED", now));
        assert!(dedup.should_emit(&task, "APPLYING_PATCHES", now));
    }

    #[test]
    fn different_tasks_are_independent() {
        let mut dedup = ProgressDedup::with_window(Duration::from_secs(5));
        let now = Instant::now();
        assert!(dedup.should_emit(&"t1".into(), "STARTED", now));
        assert!(dedup.should_emit(&"t2".into(), "STARTED", now));
    }

    #[test]
    fn forget_clears_a_tasks_entries() {
        let mut dedup = ProgressDedup::with_window(Duration::from_secs(5));
        let task: TaskId = "t1".into();
        let now = Instant::now();
        dedup.should_emit(&task, "STARTED", now);
        dedup.forget(&task);
        assert!(dedup.should_emit(&task, "STARTED", now));
    }
}
