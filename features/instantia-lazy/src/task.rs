use std::{
    fmt::Debug,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures::{
    future::{select, BoxFuture, Either, Shared},
    FutureExt,
};
use instantia_di::DynError;
use thiserror::Error;

use crate::cancellation::{CancellationError, CancellationToken, CancellationTokenSource};

/// How a [CancelableTask] did not produce a value
#[derive(Error, Debug, Clone)]
pub enum TaskError {
    #[error(transparent)]
    Cancelled(#[from] CancellationError),
    #[error("Task failed - error: {0}")]
    Failed(Arc<DynError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Resolved,
    Rejected,
    Cancelled,
}

/// A shared computation which can be cancelled until it settles
///
/// Every clone observes the same computation. The computation is driven by whoever awaits the
/// task, and is dropped as soon as cancellation is requested.
pub struct CancelableTask<T> {
    future: Shared<BoxFuture<'static, Result<T, TaskError>>>,
    source: Arc<CancellationTokenSource>,
}

/// Starts `computation` with a fresh cancellation token
///
/// `computation` is called right away; the returned future runs once the task is awaited.
pub fn create_cancelable_task<T, F, Fut>(computation: F) -> CancelableTask<T>
where
    T: Clone + Send + Sync + 'static,
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, DynError>> + Send + 'static,
{
    let source = Arc::new(CancellationTokenSource::new());
    let token = source.token();
    let computation = computation(token.clone()).boxed();

    let future = async move {
        // Cancellation is polled first, so a request made before settling always wins
        match select(token.wait_for_cancellation(), computation).await {
            Either::Left(((), _)) => Err(TaskError::Cancelled(CancellationError)),
            Either::Right((result, _)) => result.map_err(|error| TaskError::Failed(Arc::new(error))),
        }
    }
    .boxed()
    .shared();

    CancelableTask { future, source }
}

impl<T: Clone> CancelableTask<T> {
    /// Requests cancellation; no effect once the task has settled
    pub fn cancel(&self) {
        if self.is_settled() {
            return;
        }
        tracing::debug!("Cancelling task");
        self.source.cancel();
    }

    pub fn state(&self) -> TaskState {
        match self.future.peek() {
            Some(Ok(_)) => TaskState::Resolved,
            Some(Err(TaskError::Cancelled(_))) => TaskState::Cancelled,
            Some(Err(TaskError::Failed(_))) => TaskState::Rejected,
            None if self.source.token().is_cancellation_requested() => TaskState::Cancelled,
            None => TaskState::Running,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.state() != TaskState::Running
    }

    /// True if both handles observe the same computation
    pub fn ptr_eq(&self, other: &CancelableTask<T>) -> bool {
        Arc::ptr_eq(&self.source, &other.source)
    }
}

impl<T> Clone for CancelableTask<T> {
    fn clone(&self) -> Self {
        CancelableTask {
            future: self.future.clone(),
            source: self.source.clone(),
        }
    }
}

impl<T: Clone> Future for CancelableTask<T> {
    type Output = Result<T, TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.poll_unpin(cx)
    }
}

impl<T: Clone> Debug for CancelableTask<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelableTask")
            .field("state", &self.state())
            .finish()
    }
}
