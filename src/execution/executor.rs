//! Executors
//!
//! An [`Executor`] runs a batch of task invocations and returns their
//! results in submission order. The engine never looks inside a batch:
//! it lists names, hands the calls over, and waits for all of them.
//!
//! The process-wide default executor is the one piece of shared mutable
//! state. It is read each time a task runs, so changing it affects every
//! task that has not run yet.

use std::fmt;
use std::sync::{Arc, RwLock};

use log::{debug, info};
use once_cell::sync::Lazy;

use crate::error::BoxError;
use crate::pattern::NamePattern;
use crate::task::TaskOutput;

/// Result of one unit of work.
pub type JobResult = Result<TaskOutput, BoxError>;

/// One invocation of a task function on one input name.
pub struct Job {
    label: String,
    work: Box<dyn FnOnce() -> JobResult + Send + 'static>,
}

impl Job {
    /// Wraps a closure. `label` is only used for logging and errors.
    pub fn new<F>(label: impl Into<String>, work: F) -> Self
    where
        F: FnOnce() -> JobResult + Send + 'static,
    {
        Self {
            label: label.into(),
            work: Box::new(work),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Runs the job on the current thread.
    pub fn run(self) -> JobResult {
        (self.work)()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("label", &self.label).finish()
    }
}

/// Strategy for running batches of task invocations.
pub trait Executor: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Runs a batch, returning results in the order of `jobs`.
    ///
    /// An executor may stop at the first failure; the returned vector then
    /// ends with that failure and is shorter than `jobs`.
    fn run_many(&self, jobs: Vec<Job>) -> Vec<JobResult>;

    /// Runs a single job.
    fn run(&self, job: Job) -> JobResult {
        self.run_many(vec![job])
            .pop()
            .unwrap_or_else(|| Err(format!("executor '{}' returned no result", self.name()).into()))
    }

    /// Called with a task's input before it is listed.
    fn pre_task(&self, input: NamePattern) -> NamePattern {
        input
    }

    /// Called with a task's merged output.
    fn post_task(&self, output: NamePattern) -> NamePattern {
        output
    }
}

/// Runs every job in-process, one after the other, in submission order.
///
/// A failing job aborts the rest of its batch.
#[derive(Debug, Default, Clone)]
pub struct Sequential;

impl Sequential {
    pub fn new() -> Self {
        Self
    }
}

impl Executor for Sequential {
    fn name(&self) -> &str {
        "sequential"
    }

    fn run_many(&self, jobs: Vec<Job>) -> Vec<JobResult> {
        let total = jobs.len();
        let mut results = Vec::with_capacity(total);

        for (index, job) in jobs.into_iter().enumerate() {
            info!("Running {} ({}/{})", job.label(), index + 1, total);
            let result = job.run();
            let failed = result.is_err();
            results.push(result);

            if failed {
                debug!("Aborting batch after failure ({} of {} run)", index + 1, total);
                break;
            }
        }

        results
    }
}

static DEFAULT_EXECUTOR: RwLock<Option<Arc<dyn Executor>>> = RwLock::new(None);

static FALLBACK_EXECUTOR: Lazy<Arc<dyn Executor>> = Lazy::new(|| Arc::new(Sequential::new()));

/// Sets the executor used by tasks that do not name one.
///
/// Returns the previous default, if any.
pub fn set_default_executor(executor: Arc<dyn Executor>) -> Option<Arc<dyn Executor>> {
    info!("Default executor set to '{}'", executor.name());
    let mut slot = DEFAULT_EXECUTOR
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    slot.replace(executor)
}

/// Removes the process-wide default, falling back to [`Sequential`].
pub fn clear_default_executor() -> Option<Arc<dyn Executor>> {
    let mut slot = DEFAULT_EXECUTOR
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    slot.take()
}

/// The process-wide default executor, if one was set.
pub fn default_executor() -> Option<Arc<dyn Executor>> {
    DEFAULT_EXECUTOR
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Picks the executor for one task run.
///
/// Priority: the task's own, the pipeline override, the process-wide
/// default, then an in-process [`Sequential`].
pub fn resolve_executor(
    task: Option<&Arc<dyn Executor>>,
    pipeline: Option<&Arc<dyn Executor>>,
) -> Arc<dyn Executor> {
    if let Some(executor) = task.or(pipeline) {
        return Arc::clone(executor);
    }
    default_executor().unwrap_or_else(|| Arc::clone(&FALLBACK_EXECUTOR))
}
