//! Inbox of the single-threaded consumer loop.
//!
//! Worker threads `post` task results here; the consumer `drain`s everything
//! once per frame. Posting never blocks a worker for longer than a queue push.

use std::{collections::VecDeque, fmt, mem};

use crate::{core::MtResource, error::TaskFailure};

use super::task::TaskId;

/// Opaque tag the embedding application uses to tell event sources apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventKind(pub u32);

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event-kind-{}", self.0)
    }
}

/// One task iteration's result, delivered to the consumer exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<T> {
    pub kind: EventKind,
    /// Task that produced the event.
    pub task: TaskId,
    pub payload: Result<T, TaskFailure>,
}

/// What the bridge does when the consumer falls behind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backlog {
    /// Keep every event until drained.
    #[default]
    Unbounded,
    /// Keep at most this many events, discarding the oldest.
    DropOldest(usize),
}

struct Inbox<T> {
    events: VecDeque<Event<T>>,
    backlog: Backlog,
    dropped: u64,
}

/// Multi-producer, single-consumer event queue.
///
/// Clones share the same queue. Events from one task keep their posting order;
/// events from different tasks interleave in whatever order they were posted.
pub struct EventBridge<T: Send> {
    inbox: MtResource<Inbox<T>>,
}

impl<T: Send> EventBridge<T> {
    pub fn new(backlog: Backlog) -> Self {
        Self {
            inbox: MtResource::new(Inbox {
                events: VecDeque::new(),
                backlog,
                dropped: 0,
            }),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(Backlog::Unbounded)
    }

    /// Enqueues an event. Safe from any thread.
    pub fn post(&self, event: Event<T>) {
        let mut inbox = self.inbox.get_mut();
        if let Backlog::DropOldest(limit) = inbox.backlog {
            if limit == 0 {
                inbox.dropped += 1;
                return;
            }
            while inbox.events.len() >= limit {
                inbox.events.pop_front();
                inbox.dropped += 1;
            }
        }
        inbox.events.push_back(event);
    }

    /// Takes every event posted since the previous drain, oldest first.
    ///
    /// Never blocks on an empty queue.
    pub fn drain(&self) -> Vec<Event<T>> {
        let mut inbox = self.inbox.get_mut();
        Vec::from(mem::take(&mut inbox.events))
    }

    /// Number of events waiting to be drained.
    pub fn len(&self) -> usize {
        self.inbox.get().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total events discarded by a `DropOldest` backlog since creation.
    pub fn dropped_events(&self) -> u64 {
        self.inbox.get().dropped
    }
}

impl<T: Send> Clone for EventBridge<T> {
    fn clone(&self) -> Self {
        Self {
            inbox: self.inbox.clone(),
        }
    }
}
