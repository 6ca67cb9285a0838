//! # Task System Core Types
//!
//! This module defines the unit of background work and the handle a caller
//! keeps to cancel it or wait for its outcome.
//!
//! ## Core Components
//! - `Runnable`: the work itself, invoked once per iteration on a worker thread
//! - `TaskOptions`: single-shot vs. looping, and which event kind to emit
//! - `CancellationToken`: shared flag checked between iterations and, for long
//!   producers, inside the runnable itself
//! - `TaskHandle`: caller-side handle used for `cancel` and `wait`
//!
//! ## Task Lifecycle
//! 1. A runnable is submitted via `TaskPool::submit()` and registered in flight
//! 2. A worker picks it up and calls `run()` until it stops (see `Task::execute`)
//! 3. Every iteration posts one event to the bridge if an event kind is set
//! 4. The final outcome is stored for `TaskPool::wait()` and the task leaves the
//!    in-flight registry

use std::{
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use crate::{core::MtResource, error::TaskFailure};

use super::event_bridge::{Event, EventBridge, EventKind};

/// Opaque identifier of a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        TaskId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Cooperative cancellation flag shared between a task, its handle and the pool.
///
/// The worker checks it between iterations. Long-running runnables receive the
/// token too and should poll [`is_cancelled`](CancellationToken::is_cancelled)
/// at their own checkpoints.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// A unit of work executed on a worker thread.
///
/// Any `FnMut(&CancellationToken) -> Result<T, TaskFailure> + Send` closure is
/// a `Runnable`.
pub trait Runnable<T>: Send {
    /// Runs one iteration.
    ///
    /// Returning `Err` ends the task, even a looping one.
    fn run(&mut self, cancel: &CancellationToken) -> Result<T, TaskFailure>;
}

impl<T, F> Runnable<T> for F
where
    F: FnMut(&CancellationToken) -> Result<T, TaskFailure> + Send,
{
    fn run(&mut self, cancel: &CancellationToken) -> Result<T, TaskFailure> {
        self(cancel)
    }
}

/// How a submitted task runs and what it reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskOptions {
    /// Re-run the runnable until cancelled or until it fails.
    pub looping: bool,
    /// Event kind posted after every iteration; `None` posts nothing.
    pub event_kind: Option<EventKind>,
}

impl TaskOptions {
    /// Runs once, emits nothing.
    pub fn once() -> Self {
        Self::default()
    }

    /// Runs until cancelled or until the runnable fails.
    pub fn looping() -> Self {
        Self {
            looping: true,
            event_kind: None,
        }
    }

    /// Posts every result or failure to the bridge under `kind`.
    pub fn emitting(mut self, kind: EventKind) -> Self {
        self.event_kind = Some(kind);
        self
    }
}

/// Observed state of a task, as returned by `TaskPool::wait`.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskStatus<T> {
    /// Still queued or running when the wait timed out.
    Pending,
    /// A single-shot task produced its value.
    Completed(T),
    /// Cancelled; carries the last value a looping task produced, if any.
    Cancelled(Option<T>),
    /// The runnable failed or panicked.
    Failed(TaskFailure),
}

impl<T> TaskStatus<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, TaskStatus::Pending)
    }
}

/// Caller-side handle of a submitted task.
///
/// Cloning the handle is cheap; every clone observes the same task.
pub struct TaskHandle<T: Send> {
    id: TaskId,
    cancel: CancellationToken,
    outcome: MtResource<Option<TaskStatus<T>>>,
}

impl<T: Clone + Send> TaskHandle<T> {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Requests cancellation; honoured at the next iteration boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// True until the task has stored its final outcome.
    pub fn is_alive(&self) -> bool {
        self.outcome.get().is_none()
    }

    /// Blocks the calling thread until the task finishes or `timeout` elapses.
    ///
    /// A timeout yields [`TaskStatus::Pending`], not an error.
    pub fn wait(&self, timeout: Duration) -> TaskStatus<T> {
        let (outcome, _) = self.outcome.wait_until(timeout, Option::is_some);
        outcome.clone().unwrap_or(TaskStatus::Pending)
    }

    /// Non-blocking poll of the outcome.
    pub fn try_result(&self) -> TaskStatus<T> {
        self.outcome.get().clone().unwrap_or(TaskStatus::Pending)
    }
}

impl<T: Send> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            cancel: self.cancel.clone(),
            outcome: self.outcome.clone(),
        }
    }
}

impl<T: Send> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// A submitted runnable together with its scheduling state.
///
/// Owned by the pool's job queue until a worker executes it.
pub(crate) struct Task<T: Send> {
    id: TaskId,
    runnable: Box<dyn Runnable<T>>,
    options: TaskOptions,
    cancel: CancellationToken,
    outcome: MtResource<Option<TaskStatus<T>>>,
    bridge: EventBridge<T>,
}

impl<T: Clone + Send + 'static> Task<T> {
    /// Creates the task and the handle that observes it.
    pub(crate) fn new(
        runnable: Box<dyn Runnable<T>>,
        options: TaskOptions,
        bridge: EventBridge<T>,
    ) -> (Self, TaskHandle<T>) {
        let id = TaskId::next();
        let cancel = CancellationToken::new();
        let outcome = MtResource::new(None);
        let handle = TaskHandle {
            id,
            cancel: cancel.clone(),
            outcome: outcome.clone(),
        };
        let task = Task {
            id,
            runnable,
            options,
            cancel,
            outcome,
            bridge,
        };
        (task, handle)
    }

    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Runs the task to completion on the current (worker) thread.
    ///
    /// The cancel flag is checked before every iteration, never during one.
    /// Success posts the value and stops unless looping; failure, including a
    /// panic inside the runnable, posts the failure and always stops. A
    /// runnable that gives up because it saw the token set ends the task as
    /// cancelled, without an event.
    pub(crate) fn execute(mut self) -> TaskStatus<T> {
        let mut last = None;
        let status = loop {
            if self.cancel.is_cancelled() {
                break TaskStatus::Cancelled(last);
            }

            let cancel = &self.cancel;
            let runnable = &mut self.runnable;
            let iteration = catch_unwind(AssertUnwindSafe(|| runnable.run(cancel)))
                .unwrap_or_else(|payload| Err(TaskFailure::from_panic(payload)));

            match iteration {
                Ok(value) => {
                    self.emit(Ok(value.clone()));
                    if !self.options.looping {
                        break TaskStatus::Completed(value);
                    }
                    last = Some(value);
                }
                Err(failure) if self.cancel.is_cancelled() => {
                    log::debug!("{} interrupted: {}", self.id, failure);
                    break TaskStatus::Cancelled(last);
                }
                Err(failure) => {
                    log::warn!("{} stopped: {}", self.id, failure);
                    self.emit(Err(failure.clone()));
                    break TaskStatus::Failed(failure);
                }
            }
        };

        *self.outcome.get_mut() = Some(status.clone());
        self.outcome.notify_all();
        status
    }

    fn emit(&self, payload: Result<T, TaskFailure>) {
        if let Some(kind) = self.options.event_kind {
            self.bridge.post(Event {
                kind,
                task: self.id,
                payload,
            });
        }
    }
}
