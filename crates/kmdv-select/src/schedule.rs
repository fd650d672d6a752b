#![forbid(unsafe_code)]

//! Deferred work on a host-driven clock.
//!
//! The core never sleeps or reads wall time. Hosts pass a monotonic `now`
//! when scheduling and when draining, and arm a platform timer for
//! [`TaskQueue::next_deadline`]. Tests drive the same queue with synthetic
//! time.
//!
//! # Coalescing
//!
//! Scheduling a task identical to one already pending is absorbed: a burst
//! of "elements added" notifications yields one rescan, due `delay` after the
//! first notification of the burst. Both task kinds are idempotent, so
//! absorbing duplicates never loses work.

use std::time::Duration;

use crate::registry::PanelId;

/// Work the orchestrator runs later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredTask {
    /// Re-run the page scanner.
    Rescan,
    /// Re-render one panel's list from its live select.
    Refresh(PanelId),
}

#[derive(Debug, Clone)]
struct Pending {
    due: Duration,
    seq: u64,
    task: DeferredTask,
}

/// Deadline-ordered queue of [`DeferredTask`]s.
#[derive(Debug, Clone, Default)]
pub struct TaskQueue {
    pending: Vec<Pending>,
    next_seq: u64,
}

impl TaskQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `task` at `now + delay`.
    ///
    /// Returns `false` when an identical task was already pending.
    pub fn schedule(&mut self, now: Duration, delay: Duration, task: DeferredTask) -> bool {
        if self.pending.iter().any(|p| p.task == task) {
            return false;
        }
        self.pending.push(Pending {
            due: now.saturating_add(delay),
            seq: self.next_seq,
            task,
        });
        self.next_seq = self.next_seq.wrapping_add(1);
        true
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.iter().map(|p| p.due).min()
    }

    /// Remove and return every task due at `now`, earliest first
    /// (scheduling order breaks ties).
    pub fn take_due(&mut self, now: Duration) -> Vec<DeferredTask> {
        let mut due: Vec<Pending> = Vec::new();
        self.pending.retain(|p| {
            if p.due <= now {
                due.push(p.clone());
                false
            } else {
                true
            }
        });
        due.sort_by_key(|p| (p.due, p.seq));
        due.into_iter().map(|p| p.task).collect()
    }

    /// Number of pending tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
