//! Error Types
//!
//! Two layers of failure:
//!
//! - [`PatternError`]: raised by [`NamePattern`](crate::pattern::NamePattern)
//!   parsing, algebra and listing.
//! - [`FlowError`]: raised while running tasks and pipelines. Pattern
//!   errors and task-function errors propagate through it unchanged;
//!   nothing is retried.

use std::io;

use thiserror::Error;

/// Error type returned by user task functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures of the name-pattern algebra.
#[derive(Debug, Error)]
pub enum PatternError {
    /// Pattern text violates the literal/wildcard segment rules.
    #[error("malformed pattern '{text}': {reason}")]
    Malformed { text: String, reason: String },

    /// A listing found no file matching the pattern's shape.
    #[error("no files match '{pattern}'")]
    NoMatch { pattern: String },

    /// A wildcard-only operation was applied to a pattern without one.
    #[error("pattern '{pattern}' has no wildcard")]
    NoWildcard { pattern: String },

    /// A fix index does not address any wildcard of the pattern.
    #[error("wildcard index {index} out of range (pattern has {wildcards} wildcards)")]
    FixOutOfRange { index: isize, wildcards: usize },

    /// A fix label does not name any wildcard of the pattern.
    #[error("pattern '{pattern}' has no wildcard labelled '{label}'")]
    UnknownLabel { label: String, pattern: String },

    /// The directory to scan exists but could not be read.
    #[error("failed to read directory '{dir}': {source}")]
    Io {
        dir: String,
        #[source]
        source: io::Error,
    },
}

impl PatternError {
    pub(crate) fn malformed(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            text: text.into(),
            reason: reason.into(),
        }
    }
}

/// Failures while running tasks and composed pipelines.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// The wrapped function failed for one input group.
    #[error("task '{task}' failed on '{input}': {source}")]
    Task {
        task: String,
        input: String,
        #[source]
        source: BoxError,
    },

    /// Every invocation of the task returned no name.
    #[error("task '{task}' did not return any output name")]
    NoOutput { task: String },

    /// The per-group outputs do not share one wildcard shape.
    #[error("task '{task}' returned names that cannot be merged: {}", templates.join(", "))]
    IncompatibleOutputs { task: String, templates: Vec<String> },

    /// An expectation stage did not match the current name.
    #[error("expected '{expected}' but the pipeline produced '{actual}'")]
    Unexpected { expected: String, actual: String },

    /// A task was reached with no name to run it on.
    #[error("pipeline has no input name before its first task")]
    EmptyPipeline,
}
