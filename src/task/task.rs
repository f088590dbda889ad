//! Task Definition and Invocation
//!
//! A [`Task`] wraps a function from an input name to output name(s),
//! together with the wildcard positions to keep fixed when the input is
//! listed and an optional executor.
//!
//! Running a task:
//! 1. Lists the input with the task's fix positions, one group per result
//! 2. Calls the function once per group through the resolved executor
//! 3. Merges the per-group outputs into one output pattern
//!
//! The framework never touches files itself. Functions are expected to
//! skip work whose outputs already exist.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use log::{error, info};

use crate::error::{BoxError, FlowError};
use crate::execution::{resolve_executor, Executor, Job, JobResult};
use crate::pattern::{Fix, NamePattern};

/// What a task function returns for one input group.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutput {
    /// Nothing to pass on; ignored when merging.
    None,
    One(NamePattern),
    Many(Vec<NamePattern>),
}

impl TaskOutput {
    /// The names carried by this output.
    pub fn into_names(self) -> Vec<NamePattern> {
        match self {
            Self::None => Vec::new(),
            Self::One(name) => vec![name],
            Self::Many(names) => names,
        }
    }
}

impl From<NamePattern> for TaskOutput {
    fn from(name: NamePattern) -> Self {
        Self::One(name)
    }
}

impl From<Vec<NamePattern>> for TaskOutput {
    fn from(names: Vec<NamePattern>) -> Self {
        Self::Many(names)
    }
}

impl From<Option<NamePattern>> for TaskOutput {
    fn from(name: Option<NamePattern>) -> Self {
        name.map_or(Self::None, Self::One)
    }
}

impl From<()> for TaskOutput {
    fn from(_: ()) -> Self {
        Self::None
    }
}

type TaskFn = dyn Fn(&NamePattern) -> JobResult + Send + Sync;

/// One pipeline step.
///
/// Cloning is cheap: the wrapped function is shared.
///
/// # Example
///
/// ```rust,no_run
/// use namepipe::{NamePattern, Task};
///
/// // many -> 1: called once with `sample.{}.bwa`
/// let merge = Task::new(|input: &NamePattern| input.replace_wildcard("merge"))
///     .named("merge")
///     .with_fix([-1]);
///
/// let run = merge.run(&NamePattern::parse("sample.{}.bwa").unwrap()).unwrap();
/// assert_eq!(run.output().to_string(), "sample.merge.bwa");
/// ```
#[derive(Clone)]
pub struct Task {
    name: String,
    func: Arc<TaskFn>,
    fix: Vec<Fix>,
    executor: Option<Arc<dyn Executor>>,
}

impl Task {
    /// Wraps a function. No wildcard is fixed, so the function is called
    /// once per concrete name.
    pub fn new<F, O, E>(func: F) -> Self
    where
        F: Fn(&NamePattern) -> Result<O, E> + Send + Sync + 'static,
        O: Into<TaskOutput>,
        E: Into<BoxError>,
    {
        Self {
            name: "task".to_string(),
            func: Arc::new(move |input: &NamePattern| -> JobResult {
                func(input).map(Into::into).map_err(Into::into)
            }),
            fix: Vec::new(),
            executor: None,
        }
    }

    /// Sets the name used in logs and errors.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the wildcard positions passed through unexpanded.
    pub fn with_fix<I, T>(mut self, fix: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Fix>,
    {
        self.fix = fix.into_iter().map(Into::into).collect();
        self
    }

    /// Binds an executor to this task, overriding every default.
    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fix(&self) -> &[Fix] {
        &self.fix
    }

    pub fn executor(&self) -> Option<&Arc<dyn Executor>> {
        self.executor.as_ref()
    }

    /// Calls the wrapped function directly, without listing.
    pub fn call(&self, input: &NamePattern) -> JobResult {
        (self.func)(input)
    }

    /// Runs the task on `input`.
    pub fn run(&self, input: &NamePattern) -> Result<TaskRun, FlowError> {
        self.run_with(input, None)
    }

    /// Runs the task, using `fallback` when the task has no executor of
    /// its own.
    pub fn run_with(
        &self,
        input: &NamePattern,
        fallback: Option<&Arc<dyn Executor>>,
    ) -> Result<TaskRun, FlowError> {
        let executor = resolve_executor(self.executor.as_ref(), fallback);
        info!(
            "Task '{}' started on '{}' (executor: {})",
            self.name,
            input,
            executor.name()
        );

        let input = executor.pre_task(input.clone());
        let groups = input.list(&self.fix)?;

        let jobs: Vec<Job> = groups
            .iter()
            .map(|group| {
                let func = Arc::clone(&self.func);
                let group = group.clone();
                Job::new(format!("{}({})", self.name, group), move || func(&group))
            })
            .collect();

        let results = executor.run_many(jobs);
        let outputs = self.collect_outputs(&groups, results)?;

        let output = executor.post_task(merge_outputs(&self.name, &outputs)?);
        info!(
            "Task '{}' done: {} groups -> '{}'",
            self.name,
            groups.len(),
            output
        );

        Ok(TaskRun {
            task: self.name.clone(),
            input,
            groups,
            outputs,
            output,
        })
    }

    /// Pairs results with their groups; the first failure wins.
    fn collect_outputs(
        &self,
        groups: &[NamePattern],
        results: Vec<JobResult>,
    ) -> Result<Vec<NamePattern>, FlowError> {
        let returned = results.len();
        let mut outputs = Vec::new();
        let mut failure = None;

        for (group, result) in groups.iter().zip(results) {
            match result {
                Ok(output) => outputs.extend(output.into_names()),
                Err(source) if failure.is_none() => {
                    failure = Some(FlowError::Task {
                        task: self.name.clone(),
                        input: group.to_string(),
                        source,
                    });
                }
                Err(source) => error!("Task '{}' also failed on '{}': {}", self.name, group, source),
            }
        }

        if let Some(failure) = failure {
            return Err(failure);
        }
        if returned < groups.len() {
            return Err(FlowError::Task {
                task: self.name.clone(),
                input: groups[returned].to_string(),
                source: format!("executor returned {} of {} results", returned, groups.len()).into(),
            });
        }
        Ok(outputs)
    }
}

/// Merges per-group outputs into the single pattern they share.
fn merge_outputs(task: &str, outputs: &[NamePattern]) -> Result<NamePattern, FlowError> {
    let mut seen = HashSet::new();
    let mut templates = Vec::new();
    for output in outputs {
        let template = output.template();
        if seen.insert(template.to_string()) {
            templates.push(template);
        }
    }

    match templates.len() {
        0 => Err(FlowError::NoOutput {
            task: task.to_string(),
        }),
        1 => Ok(templates.remove(0)),
        _ => Err(FlowError::IncompatibleOutputs {
            task: task.to_string(),
            templates: templates.iter().map(ToString::to_string).collect(),
        }),
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("fix", &self.fix)
            .field("executor", &self.executor.as_ref().map(|e| e.name().to_string()))
            .finish()
    }
}

/// Record of one task run.
#[derive(Debug, Clone)]
pub struct TaskRun {
    task: String,
    input: NamePattern,
    groups: Vec<NamePattern>,
    outputs: Vec<NamePattern>,
    output: NamePattern,
}

impl TaskRun {
    /// Name of the task that ran.
    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn input(&self) -> &NamePattern {
        &self.input
    }

    /// The names the function was called with, in call order.
    pub fn groups(&self) -> &[NamePattern] {
        &self.groups
    }

    /// Every name returned by the function calls.
    pub fn outputs(&self) -> &[NamePattern] {
        &self.outputs
    }

    /// The merged output pattern, input of the next step.
    pub fn output(&self) -> &NamePattern {
        &self.output
    }
}
