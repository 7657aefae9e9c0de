//! In-memory task queues for order dispatch and postback reconciliation.
//!
//! Both pipeline queues are instances of the same primitive: a
//! bounded-concurrency runner with optional per-key mutual exclusion and a
//! bounded retry policy around each task.

pub mod retry;
pub mod task_queue;

pub use retry::{Retryable, RetryDelay, RetryPolicy, with_retry};
pub use task_queue::{QueueConfig, QueueTask, TaskError, TaskQueue};
