use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;

/// Run count, failure count and last error for one named scheduled task.
#[derive(Debug, Clone, Default)]
pub struct TaskStats {
    pub runs: u64,
    pub failures: u64,
    pub last_error: Option<String>,
}

struct TaskHandle {
    join: JoinHandle<()>,
    stats: std::sync::Arc<Mutex<TaskStats>>,
}

/// Named, periodic background tasks (`spec.md` §4.9: decay sweeps,
/// consolidation, waypoint pruning). Registering a name that already runs
/// replaces it. A callback's `Err` is counted and logged, never aborts the
/// timer.
#[derive(Default)]
pub struct Scheduler {
    tasks: DashMap<String, TaskHandle>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self { tasks: DashMap::new() }
    }

    pub fn register<F, Fut>(&self, name: impl Into<String>, interval: Duration, callback: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        let name = name.into();
        if let Some((_, old)) = self.tasks.remove(&name) {
            old.join.abort();
        }

        let stats = std::sync::Arc::new(Mutex::new(TaskStats::default()));
        let task_stats = stats.clone();
        let task_name = name.clone();
        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                ticker.tick().await;
                let mut s = task_stats.lock().unwrap();
                s.runs += 1;
                drop(s);
                match callback().await {
                    Ok(()) => {}
                    Err(err) => {
                        tracing::warn!(task = %task_name, error = %err, "scheduled task failed");
                        let mut s = task_stats.lock().unwrap();
                        s.failures += 1;
                        s.last_error = Some(err);
                    }
                }
            }
        });

        self.tasks.insert(name, TaskHandle { join, stats });
    }

    pub fn stats(&self, name: &str) -> Option<TaskStats> {
        self.tasks.get(name).map(|t| t.stats.lock().unwrap().clone())
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Aborts every timer, giving each task's current callback invocation
    /// up to `deadline` to finish before it is forcibly stopped.
    pub async fn stop_all(&self, deadline: Duration) {
        let names: Vec<String> = self.tasks.iter().map(|e| e.key().clone()).collect();
        for name in names {
            if let Some((_, task)) = self.tasks.remove(&name) {
                let abort_handle = task.join.abort_handle();
                if tokio::time::timeout(deadline, task.join).await.is_err() {
                    abort_handle.abort();
                    tracing::warn!(task = %name, "task exceeded stop deadline, aborted");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn registered_task_runs_and_counts_failures() {
        let scheduler = Scheduler::new();
        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();
        scheduler.register("sweep", Duration::from_millis(5), move || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err("first run fails".to_string())
                } else {
                    Ok(())
                }
            }
        });

        tokio::time::sleep(Duration::from_millis(40)).await;
        let stats = scheduler.stats("sweep").unwrap();
        assert!(stats.runs >= 2);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.last_error.as_deref(), Some("first run fails"));
        scheduler.stop_all(Duration::from_millis(10)).await;
        assert!(!scheduler.is_running("sweep"));
    }

    #[tokio::test]
    async fn reregistering_replaces_the_old_task() {
        let scheduler = Scheduler::new();
        scheduler.register("sweep", Duration::from_secs(60), || async { Ok(()) });
        scheduler.register("sweep", Duration::from_secs(60), || async { Ok(()) });
        assert_eq!(scheduler.tasks.len(), 1);
    }
}
