//! Work queue and job store for the malfit job engine.
//!
//! This crate provides:
//! - The `WorkQueue` and `JobStore` seams the worker depends on
//! - Redis-backed implementations (list queue, hash-per-job store)
//! - In-memory implementations for tests and single-process runs
//! - `Intake`, which creates a job record before enqueueing its id

pub mod error;
pub mod intake;
pub mod memory;
pub mod queue;
pub mod redis_store;
pub mod store;

pub use error::{QueueError, QueueResult};
pub use intake::Intake;
pub use memory::{MemoryJobStore, MemoryQueue};
pub use queue::{QueueConfig, WorkQueue};
pub use redis_store::{RedisJobStore, RedisQueue};
pub use store::JobStore;
