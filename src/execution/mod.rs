//! Execution Module
//!
//! Pluggable strategies for running the invocations of a task.
//!
//! # Architecture
//!
//! - [`executor`]: The [`Executor`] contract, the in-process
//!   [`Sequential`] executor and the process-wide default
//! - [`distributed`]: Submit/gather execution over a [`Backend`]

pub mod distributed;
pub mod executor;

pub use distributed::{Backend, DistributedExecutor, JobHandle, ThreadPoolBackend, TokioBackend};
pub use executor::{
    clear_default_executor, default_executor, resolve_executor, set_default_executor, Executor,
    Job, JobResult, Sequential,
};
