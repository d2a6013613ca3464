//! Cooperative cancellation
//!
//! A [CancellationTokenSource] hands out [CancellationToken]s. Computations observe the token,
//! either by checking it, by registering a callback, or by awaiting
//! [CancellationToken::wait_for_cancellation].

use std::{
    fmt::Debug,
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
    task::{Context, Poll},
};

use futures_channel::oneshot;
use parking_lot::Mutex;
use pin_project_lite::pin_project;
use thiserror::Error;

/// Raised by computations which were cancelled before they settled
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Canceled")]
pub struct CancellationError;

type Callback = Box<dyn FnOnce() + Send>;

struct TokenState {
    cancelled: AtomicBool,
    listeners: Mutex<Listeners>,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    callbacks: Vec<(u64, Callback)>,
}

impl TokenState {
    fn new(cancelled: bool) -> Arc<Self> {
        Arc::new(TokenState {
            cancelled: AtomicBool::new(cancelled),
            listeners: Mutex::new(Listeners::default()),
        })
    }

    /// Returns false if cancellation was already requested
    fn cancel(&self) -> bool {
        let callbacks = {
            let mut listeners = self.listeners.lock();
            if self.cancelled.swap(true, Ordering::SeqCst) {
                return false;
            }
            std::mem::take(&mut listeners.callbacks)
        };

        // Run outside the lock, callbacks may register or drop other listeners
        for (_, callback) in callbacks {
            callback();
        }
        true
    }
}

/// Observes whether cancellation was requested
#[derive(Clone)]
pub struct CancellationToken(Arc<TokenState>);

impl CancellationToken {
    /// A token which is never cancelled
    pub fn none() -> Self {
        CancellationToken(TokenState::new(false))
    }

    /// A token which is already cancelled
    pub fn cancelled() -> Self {
        CancellationToken(TokenState::new(true))
    }

    pub fn is_cancellation_requested(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    /// Runs `callback` once cancellation is requested, or right away if it already was
    ///
    /// The callback is unregistered when the returned listener is dropped.
    pub fn on_cancellation_requested(
        &self,
        callback: impl FnOnce() + Send + 'static,
    ) -> CancellationListener {
        let mut listeners = self.0.listeners.lock();
        if self.is_cancellation_requested() {
            drop(listeners);
            callback();
            return CancellationListener { registration: None };
        }

        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.callbacks.push((id, Box::new(callback)));
        CancellationListener {
            registration: Some((Arc::downgrade(&self.0), id)),
        }
    }

    /// Resolves once cancellation is requested
    ///
    /// Never resolves if the source is dropped without cancelling.
    pub fn wait_for_cancellation(&self) -> WaitForCancellation {
        let (sender, receiver) = oneshot::channel();
        let listener = self.on_cancellation_requested(move || {
            let _ = sender.send(());
        });

        WaitForCancellation {
            receiver,
            _listener: listener,
        }
    }
}

impl Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancellation_requested())
            .finish()
    }
}

/// Registration of a cancellation callback
#[must_use = "the callback is unregistered when the listener is dropped"]
pub struct CancellationListener {
    registration: Option<(Weak<TokenState>, u64)>,
}

impl CancellationListener {
    /// Unregisters the callback
    pub fn dispose(self) {}
}

impl Drop for CancellationListener {
    fn drop(&mut self) {
        let Some((state, id)) = self.registration.take() else {
            return;
        };
        if let Some(state) = state.upgrade() {
            state
                .listeners
                .lock()
                .callbacks
                .retain(|(registered, _)| *registered != id);
        }
    }
}

pin_project! {
    /// Future returned by [CancellationToken::wait_for_cancellation]
    pub struct WaitForCancellation {
        #[pin]
        receiver: oneshot::Receiver<()>,
        _listener: CancellationListener,
    }
}

impl Future for WaitForCancellation {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match this.receiver.poll(cx) {
            Poll::Ready(Ok(())) => Poll::Ready(()),
            // The callback was dropped without running, nothing can cancel anymore
            Poll::Ready(Err(_)) | Poll::Pending => Poll::Pending,
        }
    }
}

/// Creates and cancels [CancellationToken]s
pub struct CancellationTokenSource {
    state: Arc<TokenState>,
    parent: Mutex<Option<CancellationListener>>,
}

impl Default for CancellationTokenSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationTokenSource {
    pub fn new() -> Self {
        CancellationTokenSource {
            state: TokenState::new(false),
            parent: Mutex::new(None),
        }
    }

    /// A source which is cancelled as soon as `parent` is
    pub fn with_parent(parent: &CancellationToken) -> Self {
        let source = Self::new();
        let state = Arc::downgrade(&source.state);
        let listener = parent.on_cancellation_requested(move || {
            if let Some(state) = state.upgrade() {
                state.cancel();
            }
        });
        *source.parent.lock() = Some(listener);
        source
    }

    pub fn token(&self) -> CancellationToken {
        CancellationToken(self.state.clone())
    }

    /// Requests cancellation, running all registered callbacks once
    pub fn cancel(&self) {
        if self.state.cancel() {
            tracing::trace!("Cancellation requested");
        }
    }

    /// Detaches from the parent token, cancelling first if `cancel` is set
    pub fn dispose(self, cancel: bool) {
        if cancel {
            self.cancel();
        }
        self.parent.lock().take();
    }
}

impl Debug for CancellationTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationTokenSource")
            .field("cancelled", &self.state.cancelled.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use futures::{executor::block_on, FutureExt};

    use super::*;

    fn counting_callback(counter: &Arc<AtomicUsize>) -> impl FnOnce() + Send + 'static {
        let counter = counter.clone();
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn static_tokens() {
        assert!(!CancellationToken::none().is_cancellation_requested());
        assert!(CancellationToken::cancelled().is_cancellation_requested());
    }

    #[test]
    fn callbacks_run_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = CancellationTokenSource::new();
        let _listener = source.token().on_cancellation_requested(counting_callback(&calls));

        source.cancel();
        source.cancel();

        assert!(source.token().is_cancellation_requested());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_listeners_are_not_called() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = CancellationTokenSource::new();
        let listener = source.token().on_cancellation_requested(counting_callback(&calls));

        listener.dispose();
        source.cancel();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn late_listeners_run_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::cancelled();

        let _listener = token.on_cancellation_requested(counting_callback(&calls));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn parent_cancellation_propagates() {
        let parent = CancellationTokenSource::new();
        let child = CancellationTokenSource::with_parent(&parent.token());
        let detached = CancellationTokenSource::with_parent(&parent.token());
        let detached_token = detached.token();

        detached.dispose(false);
        parent.cancel();

        assert!(child.token().is_cancellation_requested());
        assert!(!detached_token.is_cancellation_requested());
    }

    #[test]
    fn child_of_cancelled_parent_starts_cancelled() {
        let child = CancellationTokenSource::with_parent(&CancellationToken::cancelled());
        assert!(child.token().is_cancellation_requested());
    }

    #[test]
    fn dispose_can_cancel() {
        let source = CancellationTokenSource::new();
        let token = source.token();

        source.dispose(true);

        assert!(token.is_cancellation_requested());
    }

    #[test]
    fn wait_for_cancellation_resolves_on_cancel() {
        let source = CancellationTokenSource::new();
        let token = source.token();

        block_on(async {
            futures::join!(token.wait_for_cancellation(), async { source.cancel() });
        });

        assert!(token.is_cancellation_requested());
    }

    #[test]
    fn wait_for_cancellation_stays_pending_without_source() {
        let token = CancellationTokenSource::new().token();
        assert!(token.wait_for_cancellation().now_or_never().is_none());

        assert!(CancellationToken::none()
            .wait_for_cancellation()
            .now_or_never()
            .is_none());
    }
}
