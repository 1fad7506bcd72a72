use std::sync::Mutex;

use tokio::sync::mpsc;

/// One-way latch that defers actions until a prerequisite setup phase
/// completes.
///
/// [`ReadinessGate`] holds actions submitted before the gate is ready in an
/// ordered queue. Marking the gate ready drains the queue in submission order
/// into the dispatch channel; actions submitted afterwards are dispatched
/// directly. Dispatching always goes through the channel so an action is
/// never executed inline with its caller, which keeps ordering consistent
/// between queued and late-submitted actions.
#[derive(Debug)]
pub struct ReadinessGate<A> {
    inner: Mutex<Inner<A>>,
}

#[derive(Debug)]
struct Inner<A> {
    ready: bool,
    pending: Vec<A>,
    dispatch: mpsc::UnboundedSender<A>,
}

impl<A> ReadinessGate<A> {
    /// Creates a gate in the not-ready state dispatching into the given
    /// channel.
    pub fn new(dispatch: mpsc::UnboundedSender<A>) -> Self {
        let inner = Inner {
            ready: false,
            pending: Vec::new(),
            dispatch,
        };

        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Dispatches the action if the gate is ready, otherwise queues it.
    ///
    /// Queued actions are dispatched exactly once, in submission order, when
    /// [`ReadinessGate::mark_ready`] is called. Dispatch failures after the
    /// receiver has been dropped are ignored, since a closed dispatch channel
    /// means the pipeline is tearing down.
    pub fn when_ready(&self, action: A) {
        let mut inner = self.inner.lock().expect("readiness gate lock poisoned");

        if inner.ready {
            let _ = inner.dispatch.send(action);
        } else {
            inner.pending.push(action);
        }
    }

    /// Transitions the gate to ready and drains queued actions in FIFO order.
    ///
    /// # Panics
    ///
    /// Panics when called more than once. A second transition is a
    /// programming error that must fail loudly rather than being silently
    /// tolerated.
    pub fn mark_ready(&self) {
        let mut inner = self.inner.lock().expect("readiness gate lock poisoned");

        assert!(
            !inner.ready,
            "readiness gate marked ready more than once"
        );
        inner.ready = true;

        let Inner {
            pending, dispatch, ..
        } = &mut *inner;
        for action in pending.drain(..) {
            let _ = dispatch.send(action);
        }
    }

    /// Returns `true` once the gate has been marked ready.
    pub fn is_ready(&self) -> bool {
        self.inner
            .lock()
            .expect("readiness gate lock poisoned")
            .ready
    }
}
