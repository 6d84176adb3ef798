//! Trailing-edge debouncing on the local task set.
//!
//! Every [`Debouncer::trigger`] supersedes the invocation scheduled by the
//! previous call as long as that one has not started yet. Superseded calls
//! resolve to `None`; they never run their action and never error.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct PendingInvocation {
    id: u64,
    handle: JoinHandle<()>,
}

/// Must be used from within a `tokio::task::LocalSet`.
pub struct Debouncer {
    pending: Rc<RefCell<Option<PendingInvocation>>>,
    next_id: Cell<u64>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self {
            pending: Rc::new(RefCell::new(None)),
            next_id: Cell::new(0),
        }
    }

    /// Schedules `action` to run once `delay` has passed without another
    /// trigger. A zero delay still goes through the timer.
    pub fn trigger<F, Fut, T>(&self, delay: Duration, action: F) -> Debounced<T>
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = T> + 'static,
        T: 'static,
    {
        self.cancel();

        let id = self.next_id.get() + 1;
        self.next_id.set(id);

        let (tx, rx) = oneshot::channel();
        let pending = Rc::clone(&self.pending);
        let handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;

            // From here on the invocation has started and can no longer be superseded.
            {
                let mut slot = pending.borrow_mut();
                if slot.as_ref().map(|p| p.id) == Some(id) {
                    *slot = None;
                }
            }

            let value = action().await;
            let _ = tx.send(value);
        });

        *self.pending.borrow_mut() = Some(PendingInvocation { id, handle });
        Debounced { rx }
    }

    /// Drops the scheduled invocation if it has not started.
    pub fn cancel(&self) {
        if let Some(previous) = self.pending.borrow_mut().take() {
            tracing::trace!(id = previous.id, "debounced invocation superseded");
            previous.handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.borrow().is_some()
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Outcome of a [`Debouncer::trigger`] call. Resolves to `None` when the
/// call was superseded or cancelled before its action started.
pub struct Debounced<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Future for Debounced<T> {
    type Output = Option<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|res| res.ok())
    }
}
