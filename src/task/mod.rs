//! Task Module
//!
//! Pipeline steps and their composition.
//!
//! # Structure
//!
//! - [`task`]: The [`Task`] step type and the record of a run
//! - [`compose`]: Stages, the `>>` operator and [`Pipeline`]

pub mod compose;
#[allow(clippy::module_inception)]
pub mod task;

pub use compose::{compose, Flow, Pipeline, Stage};
pub use task::{Task, TaskOutput, TaskRun};
