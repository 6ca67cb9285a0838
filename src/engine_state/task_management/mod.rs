//! # Task Management System
//!
//! This module runs background work, such as frame capture, on a fixed pool of
//! worker threads and hands results back to the single-threaded preview loop.
//!
//! ## Architecture Overview
//!
//! - `TaskPool`: owns the worker threads, the job queue and the in-flight
//!   registry; enforces the shutdown barrier
//! - `Task` / `TaskHandle`: a unit of work and the caller's view of it
//! - `EventBridge`: queue the consumer drains once per frame
//!
//! ## Task Lifecycle
//! 1. `TaskPool::submit()` registers the task and queues it for the workers
//! 2. The first idle worker executes it; a looping task holds that worker until
//!    cancelled or failed
//! 3. Each iteration posts an `Event` to the bridge (if an event kind is set)
//! 4. The final outcome is stored on the handle and the task is unregistered
//!
//! ## Ownership
//! There is no global pool. The owner constructs one `TaskPool`, passes it by
//! reference to whatever submits work, and calls `shutdown()` (or drops it) at
//! teardown.
//!
//! ## Example Usage
//! ```rust
//! use live_preview::engine_state::task_management::{
//!     CancellationToken, EventBridge, EventKind, TaskOptions, TaskPool, TaskStatus,
//! };
//! use live_preview::error::TaskFailure;
//! use std::time::Duration;
//!
//! const FRAME_READY: EventKind = EventKind(201);
//!
//! let bridge = EventBridge::unbounded();
//! let pool = TaskPool::new(2, &bridge).unwrap();
//!
//! let handle = pool
//!     .submit(
//!         |_: &CancellationToken| Ok::<_, TaskFailure>(42u32),
//!         TaskOptions::once().emitting(FRAME_READY),
//!     )
//!     .unwrap();
//!
//! assert_eq!(pool.wait(&handle, Duration::from_secs(5)), TaskStatus::Completed(42));
//! assert_eq!(bridge.drain().len(), 1);
//! pool.shutdown();
//! ```

pub mod event_bridge;
pub mod task;

use std::{
    collections::HashMap,
    num::NonZeroUsize,
    sync::{
        mpsc::{channel, Receiver, Sender},
        Mutex, PoisonError,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{
    core::MtResource,
    error::{PreviewError, Result},
};

pub use event_bridge::{Backlog, Event, EventBridge, EventKind};
pub use task::{CancellationToken, Runnable, TaskHandle, TaskId, TaskOptions, TaskStatus};

use task::Task;

/// In-flight bookkeeping, mutated only under the registry lock.
///
/// The shutdown flag and the job sender live here too so that `submit` and
/// `shutdown` cannot interleave.
struct Registry<T: Send> {
    shutting_down: bool,
    tasks: HashMap<TaskId, CancellationToken>,
    job_sender: Option<Sender<Task<T>>>,
}

/// A fixed-size pool of worker threads executing [`Runnable`]s.
///
/// # Implementation Notes
/// - All workers pull from one shared job queue, so an idle worker always
///   picks up the oldest queued task
/// - A looping task occupies its worker until cancelled; size the pool for the
///   number of concurrent loops plus one-shot work
/// - A failing or panicking runnable ends only its own task
/// - Dropping the pool performs a blocking `shutdown()`
pub struct TaskPool<T: Clone + Send + 'static> {
    registry: MtResource<Registry<T>>,
    bridge: EventBridge<T>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl<T: Clone + Send + 'static> TaskPool<T> {
    /// Creates a pool with `num_workers` threads posting into `bridge`.
    ///
    /// # Arguments
    /// * `num_workers` - Worker thread count; `0` means one per available core
    /// * `bridge` - Event bridge that every task of this pool posts into
    ///
    /// # Errors
    /// `PreviewError::WorkerSpawn` if the OS refuses to create a thread. Any
    /// workers already started are shut down before returning.
    pub fn new(num_workers: usize, bridge: &EventBridge<T>) -> Result<Self> {
        let available = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        let num_workers = if num_workers == 0 { available } else { num_workers };
        log::info!(
            "Starting task pool: {} workers (available parallelism: {})",
            num_workers,
            available
        );

        let (job_sender, job_receiver) = channel::<Task<T>>();
        let pool = TaskPool {
            registry: MtResource::new(Registry {
                shutting_down: false,
                tasks: HashMap::new(),
                job_sender: Some(job_sender),
            }),
            bridge: bridge.clone(),
            workers: Mutex::new(Vec::with_capacity(num_workers)),
        };

        let job_receiver = MtResource::new(job_receiver);
        for index in 0..num_workers {
            let worker = Self::spawn_worker(index, job_receiver.clone(), pool.registry.clone())?;
            pool.workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(worker);
        }

        Ok(pool)
    }

    fn spawn_worker(
        index: usize,
        job_receiver: MtResource<Receiver<Task<T>>>,
        registry: MtResource<Registry<T>>,
    ) -> Result<JoinHandle<()>> {
        let worker_loop = move || loop {
            // The receiver guard is released before the task runs.
            let next = job_receiver.get().recv();
            let Ok(task) = next else {
                log::debug!("Worker {} exiting", index);
                break;
            };

            let id = task.id();
            task.execute();
            registry.get_mut().tasks.remove(&id);
        };

        thread::Builder::new()
            .name(format!("preview-worker-{index}"))
            .spawn(worker_loop)
            .map_err(PreviewError::WorkerSpawn)
    }

    /// Schedules `runnable` on the pool.
    ///
    /// # Errors
    /// `PreviewError::PoolShuttingDown` once `shutdown()` has been called.
    pub fn submit<R>(&self, runnable: R, options: TaskOptions) -> Result<TaskHandle<T>>
    where
        R: Runnable<T> + 'static,
    {
        let mut registry = self.registry.get_mut();
        if registry.shutting_down {
            return Err(PreviewError::PoolShuttingDown);
        }
        let Some(sender) = registry.job_sender.clone() else {
            return Err(PreviewError::PoolShuttingDown);
        };

        let (task, handle) = Task::new(Box::new(runnable), options, self.bridge.clone());
        let id = task.id();
        registry.tasks.insert(id, task.cancel_token().clone());
        if sender.send(task).is_err() {
            registry.tasks.remove(&id);
            return Err(PreviewError::PoolShuttingDown);
        }

        log::debug!(
            "Submitted {} (looping: {}, event kind: {:?})",
            id,
            options.looping,
            options.event_kind
        );
        Ok(handle)
    }

    /// Requests cooperative cancellation of the task.
    ///
    /// The worker observes it at the next iteration boundary; a runnable call
    /// already in progress runs to its end.
    pub fn cancel(&self, handle: &TaskHandle<T>) {
        log::debug!("Cancelling {}", handle.id());
        handle.cancel();
    }

    /// Blocks the calling thread until the task ends or `timeout` elapses.
    ///
    /// Must not be called from inside a runnable: a worker waiting on another
    /// task can starve the pool.
    pub fn wait(&self, handle: &TaskHandle<T>, timeout: Duration) -> TaskStatus<T> {
        handle.wait(timeout)
    }

    /// Number of tasks submitted and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.registry.get().tasks.len()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.registry.get().shutting_down
    }

    /// Stops accepting work, cancels every registered task and joins all
    /// workers.
    ///
    /// Returns only after every worker thread has exited. Idempotent.
    pub fn shutdown(&self) {
        let worker_handles = {
            let mut registry = self.registry.get_mut();
            if !registry.shutting_down {
                log::info!(
                    "Shutting down task pool ({} tasks in flight)",
                    registry.tasks.len()
                );
            }
            registry.shutting_down = true;
            for cancel in registry.tasks.values() {
                cancel.cancel();
            }
            registry.tasks.clear();
            // Closing the queue lets idle workers leave `recv`.
            registry.job_sender = None;

            let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *workers)
        };

        if worker_handles.is_empty() {
            return;
        }

        let count = worker_handles.len();
        for worker in worker_handles {
            if worker.join().is_err() {
                log::error!("A worker thread panicked outside of a task");
            }
        }
        log::info!("Task pool stopped ({} workers joined)", count);
    }
}

impl<T: Clone + Send + 'static> Drop for TaskPool<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskFailure;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    const KIND: EventKind = EventKind(201);
    const WAIT: Duration = Duration::from_secs(5);

    fn pool(workers: usize) -> (TaskPool<u32>, EventBridge<u32>) {
        let bridge = EventBridge::unbounded();
        let pool = TaskPool::new(workers, &bridge).unwrap();
        (pool, bridge)
    }

    #[test]
    fn test_submit_and_wait() {
        let (pool, bridge) = pool(2);
        let handle = pool
            .submit(
                |_: &CancellationToken| Ok::<u32, TaskFailure>(3),
                TaskOptions::once().emitting(KIND),
            )
            .unwrap();

        assert_eq!(pool.wait(&handle, WAIT), TaskStatus::Completed(3));
        let events = bridge.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].task, handle.id());
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let (pool, _bridge) = pool(1);
        pool.shutdown();
        let result = pool.submit(
            |_: &CancellationToken| Ok::<u32, TaskFailure>(1),
            TaskOptions::once(),
        );
        assert!(matches!(result, Err(PreviewError::PoolShuttingDown)));
        assert!(pool.is_shutting_down());
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let (pool, _bridge) = pool(2);
        pool.shutdown();
        pool.shutdown();
        assert_eq!(pool.in_flight(), 0);
    }

    #[test]
    fn test_failing_task_leaves_pool_usable() {
        let (pool, bridge) = pool(1);
        let failing = pool
            .submit(
                |_: &CancellationToken| Err::<u32, _>(TaskFailure::new("no sensor")),
                TaskOptions::once().emitting(KIND),
            )
            .unwrap();
        assert!(matches!(pool.wait(&failing, WAIT), TaskStatus::Failed(_)));

        let events = bridge.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload, Err(TaskFailure::new("no sensor")));

        let next = pool
            .submit(
                |_: &CancellationToken| Ok::<u32, TaskFailure>(8),
                TaskOptions::once(),
            )
            .unwrap();
        assert_eq!(pool.wait(&next, WAIT), TaskStatus::Completed(8));
    }

    #[test]
    fn test_looping_task_events_are_fifo() {
        let (pool, bridge) = pool(1);
        let mut counter = 0;
        let handle = pool
            .submit(
                move |cancel: &CancellationToken| {
                    counter += 1;
                    if counter == 3 {
                        cancel.cancel();
                    }
                    Ok::<u32, TaskFailure>(counter)
                },
                TaskOptions::looping().emitting(KIND),
            )
            .unwrap();

        assert_eq!(pool.wait(&handle, WAIT), TaskStatus::Cancelled(Some(3)));
        let values: Vec<_> = bridge
            .drain()
            .into_iter()
            .map(|event| event.payload.unwrap())
            .collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_cancel_stops_looping_task() {
        let (pool, _bridge) = pool(1);
        let iterations = Arc::new(AtomicUsize::new(0));
        let seen = iterations.clone();
        let handle = pool
            .submit(
                move |_: &CancellationToken| {
                    seen.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(1));
                    Ok::<u32, TaskFailure>(0)
                },
                TaskOptions::looping(),
            )
            .unwrap();

        while iterations.load(Ordering::SeqCst) == 0 {
            thread::yield_now();
        }
        pool.cancel(&handle);
        assert!(matches!(pool.wait(&handle, WAIT), TaskStatus::Cancelled(Some(0))));
        assert!(!handle.is_alive());
    }

    #[test]
    fn test_shutdown_cancels_and_joins_everything() {
        let (pool, _bridge) = pool(2);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                pool.submit(
                    |_: &CancellationToken| {
                        thread::sleep(Duration::from_millis(1));
                        Ok::<u32, TaskFailure>(1)
                    },
                    TaskOptions::looping(),
                )
                .unwrap()
            })
            .collect();

        pool.shutdown();
        assert_eq!(pool.in_flight(), 0);
        for handle in handles {
            // Two tasks were running, two never left the queue.
            assert!(matches!(handle.try_result(), TaskStatus::Cancelled(_)));
        }
    }
}
