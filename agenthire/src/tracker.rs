//! Read side of task runs: the latest snapshot of every run, in memory.

use crate::gateway::{EventBroadcaster, GatewayEvent};
use crate::models::TaskRun;
use dashmap::DashMap;
use std::sync::Arc;

/// Runs kept in memory before finished ones are dropped
pub const DEFAULT_MAX_RUNS: usize = 100;

/// Snapshots published by the orchestrator. Readers never see a run
/// mid-write; they see the last state the orchestrator pushed.
///
/// Holds at most `max_runs` runs. Past that, the least recently updated
/// finished runs are evicted; runs still in progress are always kept.
pub struct ExecutionTracker {
    runs: DashMap<String, TaskRun>,
    broadcaster: Arc<EventBroadcaster>,
    max_runs: usize,
}

impl ExecutionTracker {
    pub fn new(broadcaster: Arc<EventBroadcaster>) -> Self {
        Self::with_capacity(broadcaster, DEFAULT_MAX_RUNS)
    }

    pub fn with_capacity(broadcaster: Arc<EventBroadcaster>, max_runs: usize) -> Self {
        Self {
            runs: DashMap::new(),
            broadcaster,
            max_runs,
        }
    }

    /// Store a snapshot and push it to subscribers
    pub fn update(&self, run: &TaskRun) {
        self.runs.insert(run.id.clone(), run.clone());
        self.broadcaster.broadcast(GatewayEvent::task_updated(run));
        if self.runs.len() > self.max_runs {
            self.evict_finished(&run.id);
        }
    }

    fn evict_finished(&self, keep: &str) {
        let mut finished: Vec<(String, chrono::DateTime<chrono::Utc>)> = self
            .runs
            .iter()
            .filter(|r| r.step.is_terminal() && r.key() != keep)
            .map(|r| (r.key().clone(), r.updated_at))
            .collect();
        finished.sort_by(|a, b| a.1.cmp(&b.1));

        let excess = self.runs.len().saturating_sub(self.max_runs);
        for (id, _) in finished.into_iter().take(excess) {
            self.runs.remove(&id);
            log::debug!("[tracker] Evicted finished run {}", id);
        }
    }

    pub fn get(&self, run_id: &str) -> Option<TaskRun> {
        self.runs.get(run_id).map(|r| r.value().clone())
    }

    /// All runs, newest first
    pub fn list(&self) -> Vec<TaskRun> {
        let mut runs: Vec<TaskRun> = self.runs.iter().map(|r| r.value().clone()).collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        runs
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStep;
    use ethers::types::{Address, U256};

    #[tokio::test]
    async fn test_update_stores_and_broadcasts() {
        let broadcaster = Arc::new(EventBroadcaster::new());
        let mut rx = broadcaster.subscribe();
        let tracker = ExecutionTracker::new(broadcaster);

        let mut run = TaskRun::new(Address::zero(), "prompt", U256::from(5u64), "AGENT");
        tracker.update(&run);
        run.step = TaskStep::Creating;
        tracker.update(&run);

        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.get(&run.id).unwrap().step, TaskStep::Creating);
        assert_eq!(rx.recv().await.unwrap().data["step"], "checking");
        assert_eq!(rx.recv().await.unwrap().data["step"], "creating");
    }

    #[test]
    fn test_list_newest_first() {
        let tracker = ExecutionTracker::new(Arc::new(EventBroadcaster::new()));
        let older = TaskRun::new(Address::zero(), "a", U256::one(), "AGENT");
        let mut newer = TaskRun::new(Address::zero(), "b", U256::one(), "AGENT");
        newer.created_at = older.created_at + chrono::Duration::seconds(1);

        tracker.update(&older);
        tracker.update(&newer);

        let prompts: Vec<String> = tracker.list().into_iter().map(|r| r.prompt).collect();
        assert_eq!(prompts, vec!["b", "a"]);
        assert!(tracker.get("missing").is_none());
    }

    #[test]
    fn test_capacity_evicts_oldest_finished_runs() {
        let tracker = ExecutionTracker::with_capacity(Arc::new(EventBroadcaster::new()), 2);
        let start = chrono::Utc::now();
        let run_at = |prompt: &str, secs: i64, step: TaskStep| {
            let mut run = TaskRun::new(Address::zero(), prompt, U256::one(), "AGENT");
            run.step = step;
            run.updated_at = start + chrono::Duration::seconds(secs);
            run
        };

        let active = run_at("active", 0, TaskStep::Executing);
        let old_done = run_at("old", 1, TaskStep::Completed);
        let new_done = run_at("new", 2, TaskStep::Failed);
        let latest = run_at("latest", 3, TaskStep::Checking);
        for run in [&active, &old_done, &new_done, &latest] {
            tracker.update(run);
        }

        assert_eq!(tracker.len(), 2);
        assert!(tracker.get(&active.id).is_some());
        assert!(tracker.get(&latest.id).is_some());
        assert!(tracker.get(&old_done.id).is_none());
        assert!(tracker.get(&new_done.id).is_none());
    }

    #[test]
    fn test_active_runs_are_never_evicted() {
        let tracker = ExecutionTracker::with_capacity(Arc::new(EventBroadcaster::new()), 1);
        let first = TaskRun::new(Address::zero(), "a", U256::one(), "AGENT");
        let second = TaskRun::new(Address::zero(), "b", U256::one(), "AGENT");
        tracker.update(&first);
        tracker.update(&second);

        assert_eq!(tracker.len(), 2);
    }
}
