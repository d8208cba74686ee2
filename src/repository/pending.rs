// Completion handles for jobs that run on the persistence worker

use super::worker::WorkerError;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Result of a background job.
///
/// Await it from async code, or call [`Pending::wait`] from a plain thread.
/// Dropping it does not cancel the job.
#[derive(Debug)]
pub struct Pending<T, E> {
    receiver: Option<oneshot::Receiver<Result<T, E>>>,
    _error: PhantomData<fn() -> E>,
}

impl<T, E: From<WorkerError>> Pending<T, E> {
    pub(crate) fn from_receiver(receiver: oneshot::Receiver<Result<T, E>>) -> Self {
        Self {
            receiver: Some(receiver),
            _error: PhantomData,
        }
    }

    /// A handle that is already resolved
    pub(crate) fn ready(result: Result<T, E>) -> Self {
        let (tx, rx) = oneshot::channel();
        // The receiver is alive, so this cannot fail
        let _ = tx.send(result);
        Self::from_receiver(rx)
    }

    /// A handle for a job that could not be queued
    pub(crate) fn disconnected() -> Self {
        Self {
            receiver: None,
            _error: PhantomData,
        }
    }

    fn flatten(response: Result<Result<T, E>, oneshot::error::RecvError>) -> Result<T, E> {
        response.unwrap_or_else(|_| Err(WorkerError::ThreadDisconnected.into()))
    }

    /// Block the current thread until the worker reports.
    ///
    /// Must not be called from inside an async runtime.
    pub fn wait(self) -> Result<T, E> {
        match self.receiver {
            Some(receiver) => Self::flatten(receiver.blocking_recv()),
            None => Err(WorkerError::ThreadDisconnected.into()),
        }
    }
}

impl<T, E: From<WorkerError>> Future for Pending<T, E> {
    type Output = Result<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.receiver.as_mut() {
            Some(receiver) => Pin::new(receiver).poll(cx).map(Self::flatten),
            None => Poll::Ready(Err(WorkerError::ThreadDisconnected.into())),
        }
    }
}
