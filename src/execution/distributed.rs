//! Distributed Execution
//!
//! [`DistributedExecutor`] hands every job of a batch to a [`Backend`]
//! through a submit/gather contract and blocks until all of them report
//! back. Results come back in submission order whatever the completion
//! order; a failed unit fills its own slot and does not cancel the others.
//!
//! Two backends ship with the crate:
//!
//! - [`ThreadPoolBackend`]: a fixed pool of worker threads fed by a channel
//! - [`TokioBackend`]: the blocking pool of a private tokio runtime
//!
//! Any other cluster client can be plugged in by implementing [`Backend`].

use std::any::Any;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use log::{debug, error, info, warn};

use super::executor::{Executor, Job, JobResult};

/// Handle to a submitted unit of work.
pub struct JobHandle {
    label: String,
    receiver: Receiver<JobResult>,
}

impl JobHandle {
    /// Creates a handle and the sender its result must be delivered on.
    pub fn channel(label: impl Into<String>) -> (Sender<JobResult>, JobHandle) {
        let (sender, receiver) = channel();
        let handle = JobHandle {
            label: label.into(),
            receiver,
        };
        (sender, handle)
    }

    /// Creates a handle whose result is already known.
    pub fn ready(label: impl Into<String>, result: JobResult) -> JobHandle {
        let (sender, handle) = Self::channel(label);
        // The receiver is alive, so this cannot fail.
        let _ = sender.send(result);
        handle
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Blocks until the result arrives.
    ///
    /// A unit whose sender disappears without reporting is an error.
    pub fn wait(self) -> JobResult {
        self.receiver.recv().unwrap_or_else(|_| {
            Err(format!("unit of work '{}' was lost before reporting a result", self.label).into())
        })
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle").field("label", &self.label).finish()
    }
}

/// Submit/gather contract of an external execution backend.
pub trait Backend: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Starts a job and returns immediately.
    fn submit(&self, job: Job) -> JobHandle;

    /// Waits for every handle, returning results in the given order.
    fn gather(&self, handles: Vec<JobHandle>) -> Vec<JobResult> {
        handles.into_iter().map(JobHandle::wait).collect()
    }
}

/// Runs a job, turning a panic into an error for that job.
pub fn run_guarded(job: Job) -> JobResult {
    let label = job.label().to_string();
    match panic::catch_unwind(AssertUnwindSafe(move || job.run())) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("Job '{}' panicked: {}", label, message);
            Err(format!("job '{}' panicked: {}", label, message).into())
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Executor that forwards each job to a [`Backend`].
pub struct DistributedExecutor<B> {
    backend: B,
}

impl<B: Backend> DistributedExecutor<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl DistributedExecutor<ThreadPoolBackend> {
    /// Executor over a local pool of `workers` threads.
    pub fn threads(workers: usize) -> io::Result<Self> {
        Ok(Self::new(ThreadPoolBackend::new(workers)?))
    }
}

impl DistributedExecutor<TokioBackend> {
    /// Executor over a tokio runtime with `workers` blocking threads.
    pub fn tokio(workers: usize) -> io::Result<Self> {
        Ok(Self::new(TokioBackend::new(workers)?))
    }
}

impl<B: Backend> fmt::Debug for DistributedExecutor<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributedExecutor")
            .field("backend", &self.backend)
            .finish()
    }
}

impl<B: Backend> Executor for DistributedExecutor<B> {
    fn name(&self) -> &str {
        self.backend.name()
    }

    fn run_many(&self, jobs: Vec<Job>) -> Vec<JobResult> {
        let handles: Vec<JobHandle> = jobs.into_iter().map(|job| self.backend.submit(job)).collect();
        info!("Total {} tasks submitted to {}", handles.len(), self.backend.name());

        let results = self.backend.gather(handles);
        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            warn!("{} of {} tasks failed on {}", failed, results.len(), self.backend.name());
        } else {
            info!("All {} tasks done on {}", results.len(), self.backend.name());
        }
        results
    }
}

type Message = (Job, Sender<JobResult>);

static NEXT_POOL_ID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    // Id of the pool the current thread works for, 0 outside any pool.
    static CURRENT_POOL: Cell<usize> = Cell::new(0);
}

/// Fixed-size pool of worker threads pulling jobs from a shared queue.
///
/// A job that submits to the pool it is running on (a task function
/// running a nested [`Task`](crate::Task) on the same executor) has its
/// inner jobs run inline on the calling worker. Queueing them instead
/// would deadlock once every worker waits on inner jobs.
pub struct ThreadPoolBackend {
    id: usize,
    sender: Mutex<Option<Sender<Message>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl ThreadPoolBackend {
    /// Starts `size` workers (at least one).
    pub fn new(size: usize) -> io::Result<Self> {
        let size = size.max(1);
        let pool = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = channel::<Message>();
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let receiver = Arc::clone(&receiver);
            let worker = thread::Builder::new()
                .name(format!("namepipe-worker-{}", id))
                .spawn(move || {
                    CURRENT_POOL.with(|current| current.set(pool));
                    worker_loop(id, receiver)
                })?;
            workers.push(worker);
        }

        info!("Started thread pool with {} workers", size);
        Ok(Self {
            id: pool,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

fn worker_loop(id: usize, receiver: Arc<Mutex<Receiver<Message>>>) {
    loop {
        let message = receiver
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .recv();

        let Ok((job, reply)) = message else {
            debug!("Worker {} shutting down", id);
            break;
        };

        debug!("Worker {} running {}", id, job.label());
        if reply.send(run_guarded(job)).is_err() {
            warn!("Worker {}: result dropped, nobody is waiting", id);
        }
    }
}

impl Backend for ThreadPoolBackend {
    fn name(&self) -> &str {
        "threads"
    }

    fn submit(&self, job: Job) -> JobHandle {
        if CURRENT_POOL.with(Cell::get) == self.id {
            debug!("Running nested job {} inline", job.label());
            let label = job.label().to_string();
            return JobHandle::ready(label, run_guarded(job));
        }

        let (reply, handle) = JobHandle::channel(job.label());
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match sender.as_ref() {
            Some(sender) => {
                if sender.send((job, reply)).is_err() {
                    error!("Thread pool is gone, '{}' was not submitted", handle.label());
                }
            }
            None => error!("Thread pool is shut down, '{}' was not submitted", handle.label()),
        }
        handle
    }
}

impl fmt::Debug for ThreadPoolBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPoolBackend")
            .field("size", &self.size)
            .finish()
    }
}

impl Drop for ThreadPoolBackend {
    fn drop(&mut self) {
        // Closing the queue stops every worker once it is drained.
        self.sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        let workers = std::mem::take(
            &mut *self
                .workers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        for worker in workers {
            if worker.join().is_err() {
                warn!("A pool worker panicked during shutdown");
            }
        }
    }
}

/// Runs jobs on the blocking pool of a dedicated tokio runtime.
///
/// The runtime is shut down in the background on drop, so the backend may
/// be dropped from inside an async context.
pub struct TokioBackend {
    runtime: Option<tokio::runtime::Runtime>,
    workers: usize,
}

impl TokioBackend {
    /// Builds a runtime allowing at most `workers` concurrent jobs.
    pub fn new(workers: usize) -> io::Result<Self> {
        let workers = workers.max(1);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(workers)
            .thread_name("namepipe-tokio")
            .enable_all()
            .build()?;

        info!("Started tokio backend with {} blocking threads", workers);
        Ok(Self {
            runtime: Some(runtime),
            workers,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Backend for TokioBackend {
    fn name(&self) -> &str {
        "tokio"
    }

    fn submit(&self, job: Job) -> JobHandle {
        let Some(runtime) = self.runtime.as_ref() else {
            error!("Tokio runtime is shut down, '{}' was not submitted", job.label());
            let label = job.label().to_string();
            return JobHandle::ready(label.clone(), Err(format!("'{}' was not submitted", label).into()));
        };

        let (reply, handle) = JobHandle::channel(job.label());
        runtime.spawn_blocking(move || {
            let _ = reply.send(run_guarded(job));
        });
        handle
    }
}

impl Drop for TokioBackend {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            debug!("Shutting down tokio backend");
            runtime.shutdown_background();
        }
    }
}

impl fmt::Debug for TokioBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioBackend")
            .field("workers", &self.workers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::NamePattern;
    use crate::task::TaskOutput;
    use std::time::Duration;

    fn named(name: &str) -> TaskOutput {
        TaskOutput::One(NamePattern::parse(name).unwrap())
    }

    fn render(results: Vec<JobResult>) -> Vec<String> {
        results
            .into_iter()
            .map(|r| match r {
                Ok(TaskOutput::One(p)) => p.to_string(),
                Ok(other) => format!("{:?}", other),
                Err(e) => format!("error: {}", e),
            })
            .collect()
    }

    fn sleepy_jobs() -> Vec<Job> {
        (0..4)
            .map(|i| {
                Job::new(format!("job{}", i), move || {
                    // Later jobs finish first.
                    thread::sleep(Duration::from_millis(40 - i * 10));
                    Ok(named(&format!("out.{}", i)))
                })
            })
            .collect()
    }

    #[test]
    fn test_thread_pool_keeps_submission_order() {
        let executor = DistributedExecutor::threads(4).unwrap();
        let results = executor.run_many(sleepy_jobs());
        assert_eq!(render(results), vec!["out.0", "out.1", "out.2", "out.3"]);
    }

    #[test]
    fn test_tokio_keeps_submission_order() {
        let executor = DistributedExecutor::tokio(4).unwrap();
        let results = executor.run_many(sleepy_jobs());
        assert_eq!(render(results), vec!["out.0", "out.1", "out.2", "out.3"]);
    }

    #[tokio::test]
    async fn test_tokio_backend_drops_inside_async_context() {
        let executor = DistributedExecutor::tokio(2).unwrap();
        let result = executor.run(Job::new("one", || Ok(named("one"))));
        assert!(matches!(result, Ok(TaskOutput::One(_))));
        drop(executor);
    }

    #[test]
    fn test_failure_fills_its_own_slot() {
        let executor = DistributedExecutor::threads(2).unwrap();
        let jobs = vec![
            Job::new("a", || Ok(named("a"))),
            Job::new("b", || Err("disk full".into())),
            Job::new("c", || Ok(named("c"))),
        ];

        let rendered = render(executor.run_many(jobs));
        assert_eq!(rendered, vec!["a", "error: disk full", "c"]);
    }

    #[test]
    fn test_panic_is_reported_not_dropped() {
        let executor = DistributedExecutor::threads(1).unwrap();
        let jobs = vec![
            Job::new("bad", || panic!("exploded")),
            Job::new("good", || Ok(named("good"))),
        ];

        let rendered = render(executor.run_many(jobs));
        assert_eq!(rendered.len(), 2);
        assert!(rendered[0].contains("exploded"), "{}", rendered[0]);
        assert_eq!(rendered[1], "good");
    }

    #[test]
    fn test_ready_and_lost_handles() {
        let ready = JobHandle::ready("r", Ok(TaskOutput::None));
        assert!(matches!(ready.wait(), Ok(TaskOutput::None)));

        let (sender, lost) = JobHandle::channel("lost");
        drop(sender);
        let err = lost.wait().unwrap_err();
        assert!(err.to_string().contains("lost"));
    }

    #[test]
    fn test_nested_batch_on_busy_pool_completes() {
        let executor = Arc::new(DistributedExecutor::threads(1).unwrap());
        let inner = Arc::clone(&executor);
        let jobs = vec![Job::new("outer", move || {
            let results = inner.run_many(vec![
                Job::new("inner.1", || Ok(named("inner.1"))),
                Job::new("inner.2", || Ok(named("inner.2"))),
            ]);
            assert_eq!(render(results), vec!["inner.1", "inner.2"]);
            Ok(named("outer"))
        })];

        assert_eq!(render(executor.run_many(jobs)), vec!["outer"]);
    }

    #[test]
    fn test_pool_size_is_at_least_one() {
        let backend = ThreadPoolBackend::new(0).unwrap();
        assert_eq!(backend.size(), 1);
        assert_eq!(backend.name(), "threads");
    }
}
