//! Deferred resynchronization tasks
//!
//! The router never touches LED caches. When it needs a pad redrawn later it
//! hands a [`DeferredTask`] to a [`Scheduler`]. The tokio implementation is an
//! actor holding a min-heap of tasks; due targets come out of a channel that
//! the main loop applies to the pad grid.
//!
//! Tasks are never cancelled. A task made stale by a newer state change fires
//! anyway and simply retransmits the current cached value.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// What to redraw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResyncTarget {
    /// One pad, by note number
    Pad(u8),
    /// The whole pad grid
    AllPads,
}

/// A redraw that should happen at `fire_at`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeferredTask {
    pub target: ResyncTarget,
    pub fire_at: Instant,
}

impl DeferredTask {
    pub fn after(target: ResyncTarget, delay: Duration) -> Self {
        Self {
            target,
            fire_at: Instant::now() + delay,
        }
    }

    pub fn now(target: ResyncTarget) -> Self {
        Self::after(target, Duration::ZERO)
    }
}

/// Accepts one-shot tasks; timing is approximate, delivery at least once
pub trait Scheduler: Send + Sync {
    fn schedule_once(&self, task: DeferredTask);
}

/// Heap entry ordered by fire time, then by insertion order
#[derive(Debug, PartialEq, Eq)]
struct Entry {
    fire_at: Instant,
    seq: u64,
    target: ResyncTarget,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fire_at
            .cmp(&other.fire_at)
            .then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Actor owning the pending task queue
pub struct ResyncScheduler {
    task_rx: mpsc::UnboundedReceiver<DeferredTask>,
    due_tx: mpsc::UnboundedSender<ResyncTarget>,
    queue: BinaryHeap<Reverse<Entry>>,
    next_seq: u64,
}

/// Cheap, cloneable handle to the scheduler actor
#[derive(Clone)]
pub struct ResyncSchedulerHandle {
    task_tx: mpsc::UnboundedSender<DeferredTask>,
}

impl ResyncScheduler {
    /// Spawn the actor. Due targets are delivered on the returned receiver.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn() -> (ResyncSchedulerHandle, mpsc::UnboundedReceiver<ResyncTarget>) {
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let (due_tx, due_rx) = mpsc::unbounded_channel();

        let actor = ResyncScheduler {
            task_rx,
            due_tx,
            queue: BinaryHeap::new(),
            next_seq: 0,
        };
        tokio::spawn(actor.run());

        (ResyncSchedulerHandle { task_tx }, due_rx)
    }

    async fn run(mut self) {
        debug!("Resync scheduler started");

        loop {
            let next = self.queue.peek().map(|Reverse(e)| e.fire_at);
            // Parked far in the future when idle; the branch is disabled anyway
            let deadline = next.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                task = self.task_rx.recv() => match task {
                    Some(task) => self.push(task),
                    None => break,
                },
                _ = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)), if next.is_some() => {
                    if !self.fire_due() {
                        break;
                    }
                }
            }
        }

        debug!("Resync scheduler stopped ({} tasks dropped)", self.queue.len());
    }

    fn push(&mut self, task: DeferredTask) {
        trace!("Scheduling {:?}", task.target);
        self.queue.push(Reverse(Entry {
            fire_at: task.fire_at,
            seq: self.next_seq,
            target: task.target,
        }));
        self.next_seq += 1;
    }

    /// Emit every due task; false once the consumer is gone
    fn fire_due(&mut self) -> bool {
        let now = Instant::now();
        while let Some(Reverse(entry)) = self.queue.peek() {
            if entry.fire_at > now {
                break;
            }
            let target = entry.target;
            self.queue.pop();
            if self.due_tx.send(target).is_err() {
                return false;
            }
        }
        true
    }
}

impl Scheduler for ResyncSchedulerHandle {
    fn schedule_once(&self, task: DeferredTask) {
        // Fire-and-forget: a closed scheduler only means shutdown is underway
        let _ = self.task_tx.send(task);
    }
}
