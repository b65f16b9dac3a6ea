//! Best-effort task execution for hooks and export jobs.

use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{error, warn};

/// A unit of background work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Async execution boundary for the lifecycle engine and export pipeline.
///
/// Both entry points are best-effort: a task that panics is logged and
/// swallowed, never surfaced to the caller. Post-write hooks and export
/// jobs rely on this isolation - a failing hook must not undo or delay
/// the write that triggered it.
pub trait TaskRunner: Send + Sync {
    /// Executes the task on the calling thread, isolating panics.
    fn run(&self, task: Task);

    /// Executes the task off the calling thread, isolating panics.
    fn run_async(&self, task: Task);
}

fn execute_isolated(task: Task) {
    if catch_unwind(AssertUnwindSafe(task)).is_err() {
        error!("background task panicked");
    }
}

/// Bounded worker pool with an unbounded backlog queue.
///
/// Tasks queue rather than being rejected, trading latency for never
/// dropping work. Workers pull from a shared channel; dropping the pool
/// closes the channel and joins the workers, so queued tasks drain
/// before shutdown completes.
pub struct ThreadPoolRunner {
    sender: Mutex<Option<Sender<Task>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadPoolRunner {
    /// Creates a pool with the given number of worker threads.
    #[must_use]
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = channel::<Task>();
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..workers)
            .map(|i| {
                let receiver = Arc::clone(&receiver);
                std::thread::Builder::new()
                    .name(format!("sieva-worker-{i}"))
                    .spawn(move || Self::worker_loop(&receiver))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
        }
    }

    fn worker_loop(receiver: &Mutex<Receiver<Task>>) {
        loop {
            // The guard is a temporary: only one worker waits in recv at
            // a time, the rest wait on the mutex.
            let task = receiver.lock().recv();
            match task {
                Ok(task) => execute_isolated(task),
                Err(_) => break,
            }
        }
    }
}

impl TaskRunner for ThreadPoolRunner {
    fn run(&self, task: Task) {
        execute_isolated(task);
    }

    fn run_async(&self, task: Task) {
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(sender) => {
                if sender.send(task).is_err() {
                    warn!("task dropped: worker pool is shut down");
                }
            }
            None => warn!("task dropped: worker pool is shut down"),
        }
    }
}

impl Drop for ThreadPoolRunner {
    fn drop(&mut self) {
        // Closing the channel lets workers drain the backlog and exit.
        self.sender.lock().take();
        for handle in self.workers.lock().drain(..) {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for ThreadPoolRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPoolRunner")
            .field("workers", &self.workers.lock().len())
            .finish_non_exhaustive()
    }
}

/// Runner that executes everything inline, for deterministic tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineRunner;

impl TaskRunner for InlineRunner {
    fn run(&self, task: Task) {
        execute_isolated(task);
    }

    fn run_async(&self, task: Task) {
        execute_isolated(task);
    }
}
