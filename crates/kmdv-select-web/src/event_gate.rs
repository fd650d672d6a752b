#![forbid(unsafe_code)]

//! Re-entrancy gate for state driven by browser callbacks.
//!
//! Browser callbacks can nest: dispatching a `change` event from inside a
//! handler runs the page's `change` listeners synchronously, and those may
//! call back into our exports. The gate hands out exclusive access to the
//! state; an event posted while that access is held is queued and handled
//! before the outer access ends, so nothing is lost and nothing aliases.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt::Debug;

use tracing::trace;

/// State that consumes events posted through an [`EventGate`].
pub trait GateState {
    type Event: Debug;

    /// Handle one event with exclusive access.
    fn handle(&mut self, event: Self::Event);

    /// Runs at the end of every exclusive access, after the queue drained.
    fn settle(&mut self) {}
}

/// Exclusive access to an optional state plus a queue of deferred events.
pub struct EventGate<S: GateState> {
    state: RefCell<Option<S>>,
    pending: RefCell<VecDeque<S::Event>>,
}

impl<S: GateState> EventGate<S> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: RefCell::new(None),
            pending: RefCell::new(VecDeque::new()),
        }
    }

    /// Install the state. Returns `false` if the gate is currently held.
    pub fn install(&self, state: S) -> bool {
        match self.state.try_borrow_mut() {
            Ok(mut slot) => {
                *slot = Some(state);
                true
            }
            Err(_) => false,
        }
    }

    /// Run `f` with exclusive access, then handle queued events and settle.
    ///
    /// `None` when no state is installed or the gate is already held.
    pub fn with<T>(&self, f: impl FnOnce(&mut S) -> T) -> Option<T> {
        let mut guard = self.state.try_borrow_mut().ok()?;
        let state = guard.as_mut()?;
        let out = f(state);
        while let Some(event) = self.next_pending() {
            state.handle(event);
        }
        state.settle();
        Some(out)
    }

    /// Handle `event` now, or queue it if the gate is held or empty.
    ///
    /// Returns whether the event was handled immediately.
    pub fn post(&self, event: S::Event) -> bool {
        let mut slot = Some(event);
        let handled = self
            .with(|state| {
                if let Some(event) = slot.take() {
                    state.handle(event);
                }
            })
            .is_some();
        if let Some(event) = slot {
            trace!(?event, "gate busy; queued event");
            self.pending.borrow_mut().push_back(event);
        }
        handled
    }

    /// Number of events waiting for the next exclusive access.
    pub fn queued(&self) -> usize {
        self.pending.borrow().len()
    }

    fn next_pending(&self) -> Option<S::Event> {
        self.pending.borrow_mut().pop_front()
    }
}

impl<S: GateState> Default for EventGate<S> {
    fn default() -> Self {
        Self::new()
    }
}
