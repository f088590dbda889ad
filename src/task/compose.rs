//! Pipeline Composition
//!
//! Threads a name through an ordered list of stages. Each task stage runs
//! on the output of the previous stage, and only after every call of the
//! previous stage has returned.
//!
//! # Example
//!
//! ```rust,no_run
//! use namepipe::{compose, BoxError, NamePattern, Stage, Task};
//!
//! fn bwa(input: &NamePattern) -> Result<NamePattern, BoxError> {
//!     let output = input.concat("bwa")?;
//!     // run the aligner unless `{output}.bam` exists
//!     Ok(output)
//! }
//!
//! fn merge(input: &NamePattern) -> Result<NamePattern, BoxError> {
//!     Ok(input.replace_wildcard("merge")?)
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let flow = compose([
//!         Stage::pattern("data/sample.{}.read")?,
//!         Stage::func(bwa),
//!         Task::new(merge).with_fix([-1]).into(),
//!     ])?;
//!     println!("{}", flow.output());
//!
//!     // Same pipeline with the chaining operator
//!     let reads = NamePattern::parse("data/sample.{}.read")?;
//!     let flow = (reads >> Task::new(bwa) >> Task::new(merge).with_fix([-1]))?;
//!     println!("{}", flow.output());
//!     Ok(())
//! }
//! ```

use std::ops::Shr;
use std::slice;
use std::sync::Arc;

use log::{debug, info};

use crate::error::{BoxError, FlowError, PatternError};
use crate::execution::Executor;
use crate::pattern::NamePattern;

use super::task::{Task, TaskOutput, TaskRun};

/// One item of a pipeline.
#[derive(Debug, Clone)]
pub enum Stage {
    /// Sets or replaces the current name.
    Pattern(NamePattern),
    /// Fails unless the current name equals this one.
    Expect(NamePattern),
    /// Runs a task on the current name.
    Task(Task),
}

impl Stage {
    pub fn pattern(text: &str) -> Result<Stage, PatternError> {
        Ok(Self::Pattern(NamePattern::parse(text)?))
    }

    pub fn expect(text: &str) -> Result<Stage, PatternError> {
        Ok(Self::Expect(NamePattern::parse(text)?))
    }

    /// Wraps a bare function as a task with no fixed wildcards.
    pub fn func<F, O, E>(func: F) -> Stage
    where
        F: Fn(&NamePattern) -> Result<O, E> + Send + Sync + 'static,
        O: Into<TaskOutput>,
        E: Into<BoxError>,
    {
        Self::Task(Task::new(func))
    }
}

impl From<NamePattern> for Stage {
    fn from(pattern: NamePattern) -> Self {
        Self::Pattern(pattern)
    }
}

impl From<Task> for Stage {
    fn from(task: Task) -> Self {
        Self::Task(task)
    }
}

/// The value flowing through a pipeline.
#[derive(Debug, Clone)]
pub enum Flow {
    /// A name set directly.
    Pattern(NamePattern),
    /// The result of the last task.
    Run(TaskRun),
}

impl Flow {
    /// The current name.
    pub fn output(&self) -> &NamePattern {
        match self {
            Self::Pattern(pattern) => pattern,
            Self::Run(run) => run.output(),
        }
    }

    /// Every concrete name produced by the last step.
    pub fn outputs(&self) -> &[NamePattern] {
        match self {
            Self::Pattern(pattern) => slice::from_ref(pattern),
            Self::Run(run) => run.outputs(),
        }
    }

    /// The last task run, if the last stage was a task.
    pub fn last_run(&self) -> Option<&TaskRun> {
        match self {
            Self::Pattern(_) => None,
            Self::Run(run) => Some(run),
        }
    }

    /// Applies one more stage.
    pub fn then(self, stage: impl Into<Stage>) -> Result<Flow, FlowError> {
        self.apply(&stage.into(), None)
    }

    fn apply(self, stage: &Stage, executor: Option<&Arc<dyn Executor>>) -> Result<Flow, FlowError> {
        match stage {
            Stage::Pattern(pattern) => {
                debug!("Current name '{}' replaced by '{}'", self.output(), pattern);
                Ok(Flow::Pattern(pattern.clone()))
            }
            Stage::Expect(expected) => {
                if self.output() == expected {
                    Ok(self)
                } else {
                    Err(FlowError::Unexpected {
                        expected: expected.to_string(),
                        actual: self.output().to_string(),
                    })
                }
            }
            Stage::Task(task) => Ok(Flow::Run(task.run_with(self.output(), executor)?)),
        }
    }
}

impl Shr<Task> for Flow {
    type Output = Result<Flow, FlowError>;

    fn shr(self, task: Task) -> Self::Output {
        self.then(task)
    }
}

impl Shr<Task> for NamePattern {
    type Output = Result<Flow, FlowError>;

    fn shr(self, task: Task) -> Self::Output {
        Flow::Pattern(self).then(task)
    }
}

impl Shr<Task> for Result<Flow, FlowError> {
    type Output = Result<Flow, FlowError>;

    fn shr(self, task: Task) -> Self::Output {
        self?.then(task)
    }
}

/// Ordered list of stages with an optional executor override.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
    executor: Option<Arc<dyn Executor>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor for tasks that do not carry their own.
    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Appends a stage.
    pub fn then(mut self, stage: impl Into<Stage>) -> Self {
        self.stages.push(stage.into());
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs every stage in order, stopping at the first error.
    pub fn run(&self) -> Result<Flow, FlowError> {
        info!("Running pipeline with {} stages", self.stages.len());

        let mut current: Option<Flow> = None;
        for stage in &self.stages {
            current = Some(match (current, stage) {
                (None, Stage::Pattern(pattern)) | (None, Stage::Expect(pattern)) => {
                    Flow::Pattern(pattern.clone())
                }
                (None, Stage::Task(_)) => return Err(FlowError::EmptyPipeline),
                (Some(flow), stage) => flow.apply(stage, self.executor.as_ref())?,
            });
        }

        let flow = current.ok_or(FlowError::EmptyPipeline)?;
        info!("Pipeline finished with '{}'", flow.output());
        Ok(flow)
    }
}

impl<S: Into<Stage>> FromIterator<S> for Pipeline {
    fn from_iter<I: IntoIterator<Item = S>>(stages: I) -> Self {
        Self {
            stages: stages.into_iter().map(Into::into).collect(),
            executor: None,
        }
    }
}

/// Builds and runs a pipeline from an ordered list of stages.
///
/// `compose([p, t1, t2])` is the same as `(p >> t1 >> t2)`.
pub fn compose<I, S>(stages: I) -> Result<Flow, FlowError>
where
    I: IntoIterator<Item = S>,
    S: Into<Stage>,
{
    stages.into_iter().collect::<Pipeline>().run()
}
