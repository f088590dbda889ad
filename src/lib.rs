//! namepipe - Filename-Driven Pipelines
//!
//! Drives a processing pipeline entirely by file-name conventions. A step's
//! input and output are *names*: file names without extension, made of
//! dot-separated segments, where a `{}` segment is a wildcard. Names grow
//! by suffix as steps run, so a directory listing is the record of what
//! has been done. There is no metadata store; every listing reads the
//! live directory.
//!
//! # Architecture
//!
//! - [`pattern`]: The [`NamePattern`] algebra and its expansion against
//!   directory contents
//! - [`task`]: Pipeline steps ([`Task`]) and their composition
//! - [`execution`]: Pluggable executors (sequential, thread pool, tokio)
//! - [`config`]: YAML executor configuration
//! - [`error`]: Error types
//!
//! # Example
//!
//! ```rust,no_run
//! use namepipe::{compose, BoxError, NamePattern, Stage, Task};
//!
//! // 1 -> 1, called once per concrete sample
//! fn sort(input: &NamePattern) -> Result<NamePattern, BoxError> {
//!     let output = input.concat("sort")?;
//!     // samtools sort {input}.bam > {output}.bam, unless it exists
//!     Ok(output)
//! }
//!
//! // many -> 1, called once with the wildcard left in place
//! fn merge(input: &NamePattern) -> Result<NamePattern, BoxError> {
//!     Ok(input.replace_wildcard("merge")?)
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let flow = compose([
//!         Stage::pattern("sample.{}.bwa")?,
//!         Stage::func(sort),
//!         Task::new(merge).with_fix([-1]).into(),
//!     ])?;
//!     assert_eq!(flow.output().to_string(), "sample.merge.bwa.sort");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod execution;
pub mod pattern;
pub mod task;

// Re-export commonly used types
pub use config::{ExecutorConfig, FlowConfig};
pub use error::{BoxError, FlowError, PatternError};
pub use execution::{set_default_executor, DistributedExecutor, Executor, Sequential};
pub use pattern::{Fix, NamePattern};
pub use task::{compose, Flow, Pipeline, Stage, Task, TaskOutput, TaskRun};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "namepipe";
