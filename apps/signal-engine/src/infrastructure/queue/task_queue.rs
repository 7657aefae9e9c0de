//! Bounded-concurrency task queue with per-key mutual exclusion.
//!
//! Tasks are enqueued without blocking and run on spawned workers, at most
//! `max_workers` at a time. A task may declare an exclusion key; while a task
//! holding a key is running, other tasks with the same key stay pending and
//! the scheduler skips over them to start the first unlocked task instead.
//! Tasks without a key (or with distinct keys) never block each other, and a
//! keyless queue with one worker degenerates to strict FIFO.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::retry::{Retryable, RetryPolicy, with_retry};

/// A unit of work the queue can run.
#[async_trait]
pub trait QueueTask: Send + Sync + 'static {
    /// Mutual-exclusion key; tasks sharing a key never run concurrently.
    fn exclusion_key(&self) -> Option<String> {
        None
    }

    /// Short label for log lines.
    fn describe(&self) -> String;

    /// Execute the task once.
    async fn run(&self) -> Result<(), TaskError>;
}

/// Task execution outcome the retry loop can classify.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    /// Retrying cannot help (bad credentials, rejected order, missing row).
    #[error("{0}")]
    Fatal(String),

    /// Transient failure worth another attempt.
    #[error("{0}")]
    Retryable(String),
}

impl Retryable for TaskError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }
}

/// Queue tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
    /// Maximum tasks running at once.
    pub max_workers: usize,
    /// Retry policy applied to each task.
    pub retry: RetryPolicy,
}

impl QueueConfig {
    /// Strict FIFO configuration: one worker.
    #[must_use]
    pub fn serial(retry: RetryPolicy) -> Self {
        Self {
            max_workers: 1,
            retry,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            retry: RetryPolicy::default(),
        }
    }
}

struct QueueState<T> {
    pending: VecDeque<Arc<T>>,
    locked_keys: HashSet<String>,
    running: usize,
}

struct Inner<T> {
    name: &'static str,
    config: QueueConfig,
    state: Mutex<QueueState<T>>,
}

/// Handle to a running task queue; cheap to clone.
pub struct TaskQueue<T: QueueTask> {
    inner: Arc<Inner<T>>,
}

impl<T: QueueTask> Clone for TaskQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: QueueTask> TaskQueue<T> {
    /// Create a queue. `name` shows up in log lines.
    #[must_use]
    pub fn new(name: &'static str, config: QueueConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                config: QueueConfig {
                    max_workers: config.max_workers.max(1),
                    retry: config.retry,
                },
                state: Mutex::new(QueueState {
                    pending: VecDeque::new(),
                    locked_keys: HashSet::new(),
                    running: 0,
                }),
            }),
        }
    }

    /// Add a task and kick the scheduler. Never blocks the caller.
    ///
    /// Must be called from within a tokio runtime, since ready tasks are
    /// spawned immediately.
    pub fn enqueue(&self, task: T) {
        let task = Arc::new(task);
        tracing::debug!(queue = self.inner.name, task = %task.describe(), "task enqueued");
        {
            let mut state = self
                .inner
                .state
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            state.pending.push_back(task);
        }
        Self::dispatch(&self.inner);
    }

    /// Number of tasks waiting to start.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.inner
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pending
            .len()
    }

    /// Number of tasks currently running.
    #[must_use]
    pub fn running_len(&self) -> usize {
        self.inner
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .running
    }

    /// Wait until nothing is pending or running. Used for graceful drain.
    pub async fn drained(&self) {
        loop {
            {
                let state = self
                    .inner
                    .state
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                if state.pending.is_empty() && state.running == 0 {
                    return;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }

    /// Start as many pending tasks as worker slots and key locks allow.
    ///
    /// Scans the pending list in order and starts the first task whose key is
    /// not locked, so one busy instrument never stalls the rest of the queue.
    fn dispatch(inner: &Arc<Inner<T>>) {
        loop {
            let task = {
                let mut state = inner
                    .state
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                if state.running >= inner.config.max_workers {
                    return;
                }
                let position = state
                    .pending
                    .iter()
                    .position(|t| match t.exclusion_key() {
                        Some(key) => !state.locked_keys.contains(&key),
                        None => true,
                    });
                let Some(position) = position else { return };
                let task = match state.pending.remove(position) {
                    Some(task) => task,
                    None => return,
                };
                if let Some(key) = task.exclusion_key() {
                    state.locked_keys.insert(key);
                }
                state.running += 1;
                task
            };

            let inner = Arc::clone(inner);
            tokio::spawn(async move {
                Self::run_one(&inner, &task).await;
                {
                    let mut state = inner
                        .state
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner);
                    state.running -= 1;
                    if let Some(key) = task.exclusion_key() {
                        state.locked_keys.remove(&key);
                    }
                }
                Self::dispatch(&inner);
            });
        }
    }

    async fn run_one(inner: &Arc<Inner<T>>, task: &Arc<T>) {
        let label = task.describe();
        tracing::debug!(queue = inner.name, task = %label, "task started");
        let outcome = with_retry(&inner.config.retry, || {
            let task = Arc::clone(task);
            async move { task.run().await }
        })
        .await;
        match outcome {
            Ok(()) => {
                tracing::debug!(queue = inner.name, task = %label, "task completed");
            }
            Err(error) => {
                // Errors are contained here: a failed task never takes the
                // queue or its workers down.
                tracing::error!(queue = inner.name, task = %label, error = %error, "task failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct ProbeTask {
        key: Option<String>,
        label: String,
        hold: Duration,
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        completed: Arc<Mutex<Vec<String>>>,
        fail_times: Arc<AtomicUsize>,
        fatal: bool,
    }

    impl ProbeTask {
        fn new(label: &str, key: Option<&str>, harness: &Harness) -> Self {
            Self {
                key: key.map(String::from),
                label: label.to_string(),
                hold: Duration::from_millis(30),
                running: Arc::clone(&harness.running),
                peak: Arc::clone(&harness.peak),
                completed: Arc::clone(&harness.completed),
                fail_times: Arc::new(AtomicUsize::new(0)),
                fatal: false,
            }
        }
    }

    #[derive(Default)]
    struct Harness {
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        completed: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl QueueTask for ProbeTask {
        fn exclusion_key(&self) -> Option<String> {
            self.key.clone()
        }

        fn describe(&self) -> String {
            self.label.clone()
        }

        async fn run(&self) -> Result<(), TaskError> {
            if self.fail_times.load(Ordering::SeqCst) > 0 {
                self.fail_times.fetch_sub(1, Ordering::SeqCst);
                if self.fatal {
                    return Err(TaskError::Fatal("boom".to_string()));
                }
                return Err(TaskError::Retryable("flaky".to_string()));
            }
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.hold).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            self.completed.lock().unwrap().push(self.label.clone());
            Ok(())
        }
    }

    fn quick_retry() -> RetryPolicy {
        RetryPolicy::fixed(2, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn respects_worker_cap() {
        let harness = Harness::default();
        let queue = TaskQueue::new(
            "test",
            QueueConfig {
                max_workers: 2,
                retry: quick_retry(),
            },
        );
        for i in 0..6 {
            queue.enqueue(ProbeTask::new(&format!("t{i}"), None, &harness));
        }
        queue.drained().await;

        assert_eq!(harness.completed.lock().unwrap().len(), 6);
        assert!(harness.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn same_key_tasks_never_overlap() {
        let harness = Harness::default();
        let queue = TaskQueue::new(
            "test",
            QueueConfig {
                max_workers: 4,
                retry: quick_retry(),
            },
        );
        for i in 0..4 {
            queue.enqueue(ProbeTask::new(&format!("t{i}"), Some("3045:C1"), &harness));
        }
        queue.drained().await;

        assert_eq!(harness.completed.lock().unwrap().len(), 4);
        // All four tasks share a key, so despite four workers at most one ran
        // at any moment.
        assert_eq!(harness.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn locked_key_does_not_stall_other_keys() {
        let harness = Harness::default();
        let queue = TaskQueue::new(
            "test",
            QueueConfig {
                max_workers: 2,
                retry: quick_retry(),
            },
        );
        let mut slow = ProbeTask::new("slow-a", Some("A"), &harness);
        slow.hold = Duration::from_millis(100);
        queue.enqueue(slow);
        queue.enqueue(ProbeTask::new("blocked-a", Some("A"), &harness));
        queue.enqueue(ProbeTask::new("free-b", Some("B"), &harness));
        queue.drained().await;

        let completed = harness.completed.lock().unwrap().clone();
        assert_eq!(completed.len(), 3);
        // The key-B task was scheduled past the blocked key-A task and
        // finished before the slow holder released the lock.
        assert_eq!(completed[0], "free-b");
    }

    #[tokio::test]
    async fn single_worker_keyless_queue_is_fifo() {
        let harness = Harness::default();
        let queue = TaskQueue::new("test", QueueConfig::serial(quick_retry()));
        for i in 0..5 {
            let mut task = ProbeTask::new(&format!("t{i}"), None, &harness);
            task.hold = Duration::from_millis(5);
            queue.enqueue(task);
        }
        queue.drained().await;

        let completed = harness.completed.lock().unwrap().clone();
        assert_eq!(completed, vec!["t0", "t1", "t2", "t3", "t4"]);
    }

    #[tokio::test]
    async fn retryable_failure_is_retried_then_succeeds() {
        let harness = Harness::default();
        let queue = TaskQueue::new("test", QueueConfig::serial(quick_retry()));
        let task = ProbeTask::new("flaky", None, &harness);
        task.fail_times.store(1, Ordering::SeqCst);
        queue.enqueue(task);
        queue.drained().await;

        assert_eq!(harness.completed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn fatal_failure_is_contained_and_queue_continues() {
        let harness = Harness::default();
        let queue = TaskQueue::new("test", QueueConfig::serial(quick_retry()));
        let mut doomed = ProbeTask::new("doomed", Some("K"), &harness);
        doomed.fail_times.store(5, Ordering::SeqCst);
        doomed.fatal = true;
        queue.enqueue(doomed);
        queue.enqueue(ProbeTask::new("survivor", Some("K"), &harness));
        queue.drained().await;

        // The doomed task never completed but released its key, and the
        // queue went on to run the next task under the same key.
        let completed = harness.completed.lock().unwrap().clone();
        assert_eq!(completed, vec!["survivor"]);
    }
}
