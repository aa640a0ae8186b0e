//! Abort signals - one cancellation token fanning out to many listeners.
//!
//! An [`AbortController`] owns the right to abort; the [`AbortSignal`] it
//! hands out is read-only. Listeners registered with a signal are removed in
//! a single step when the controller aborts.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

type AbortAlgorithm = Box<dyn FnOnce()>;

struct SignalState {
    aborted: Cell<bool>,
    algorithms: RefCell<Vec<AbortAlgorithm>>,
}

/// Read-only view of a cancellation token.
#[derive(Clone)]
pub struct AbortSignal {
    state: Rc<SignalState>,
}

impl AbortSignal {
    fn new() -> Self {
        Self {
            state: Rc::new(SignalState {
                aborted: Cell::new(false),
                algorithms: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn aborted(&self) -> bool {
        self.state.aborted.get()
    }

    /// Run `algorithm` when the signal aborts.
    ///
    /// Runs immediately if the signal already aborted.
    pub fn on_abort(&self, algorithm: impl FnOnce() + 'static) {
        if self.aborted() {
            algorithm();
            return;
        }
        self.state
            .algorithms
            .borrow_mut()
            .push(Box::new(algorithm));
    }

    /// Number of algorithms still waiting for the abort.
    pub fn pending(&self) -> usize {
        self.state.algorithms.borrow().len()
    }

    /// Identity comparison.
    pub fn same(&self, other: &AbortSignal) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortSignal")
            .field("aborted", &self.aborted())
            .field("pending", &self.pending())
            .finish()
    }
}

/// Owner of an [`AbortSignal`].
#[derive(Debug)]
pub struct AbortController {
    signal: AbortSignal,
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortController {
    pub fn new() -> Self {
        Self {
            signal: AbortSignal::new(),
        }
    }

    pub fn signal(&self) -> &AbortSignal {
        &self.signal
    }

    /// Abort once. Later calls are no-ops.
    ///
    /// Algorithms run in registration order after the flag flips, so an
    /// algorithm registered during the abort runs immediately.
    pub fn abort(&self) {
        let state = &self.signal.state;
        if state.aborted.replace(true) {
            return;
        }
        let algorithms = std::mem::take(&mut *state.algorithms.borrow_mut());
        for algorithm in algorithms {
            algorithm();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_runs_all_algorithms_once() {
        let controller = AbortController::new();
        let count = Rc::new(Cell::new(0));

        for _ in 0..3 {
            let count = count.clone();
            controller.signal().on_abort(move || count.set(count.get() + 1));
        }
        assert_eq!(controller.signal().pending(), 3);

        controller.abort();
        assert_eq!(count.get(), 3);
        assert!(controller.signal().aborted());
        assert_eq!(controller.signal().pending(), 0);

        controller.abort();
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn test_on_abort_after_abort_runs_immediately() {
        let controller = AbortController::new();
        controller.abort();

        let ran = Rc::new(Cell::new(false));
        let ran_clone = ran.clone();
        controller.signal().on_abort(move || ran_clone.set(true));
        assert!(ran.get());
    }
}
