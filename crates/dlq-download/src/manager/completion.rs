//! Per-item completion handles.

use std::fmt;

use dlq_core::{DownloadError, DownloadHandle, DownloadResult, Payload};
use tokio::sync::oneshot::{self, error::TryRecvError};

/// Resolves once with the item's terminal result.
///
/// - `Ok(payload)` when the transfer succeeded
/// - `Err(DownloadError::Cancelled)` when the item was cancelled
/// - `Err(DownloadError::Abandoned)` when the manager went away first
/// - any other `Err` when the transfer failed
pub struct DownloadCompletion {
    rx: Option<oneshot::Receiver<DownloadResult<Payload>>>,
}

impl DownloadCompletion {
    pub(crate) const fn new(rx: oneshot::Receiver<DownloadResult<Payload>>) -> Self {
        Self { rx: Some(rx) }
    }

    /// Wait for the terminal result.
    pub async fn wait(mut self) -> DownloadResult<Payload> {
        match self.rx.take() {
            Some(rx) => rx.await.unwrap_or(Err(DownloadError::Abandoned)),
            None => Err(DownloadError::Abandoned),
        }
    }

    /// Poll once without blocking.
    ///
    /// Returns `None` while the item is still live, and again after the
    /// result has been taken.
    pub fn try_result(&mut self) -> Option<DownloadResult<Payload>> {
        let rx = self.rx.as_mut()?;
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Closed) => Err(DownloadError::Abandoned),
        };
        self.rx = None;
        Some(result)
    }

    /// Block the current thread until the terminal result arrives.
    ///
    /// Must not be called from inside an async runtime.
    pub fn blocking_wait(mut self) -> DownloadResult<Payload> {
        match self.rx.take() {
            Some(rx) => rx.blocking_recv().unwrap_or(Err(DownloadError::Abandoned)),
            None => Err(DownloadError::Abandoned),
        }
    }
}

impl fmt::Debug for DownloadCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadCompletion")
            .field("consumed", &self.rx.is_none())
            .finish()
    }
}

impl std::future::IntoFuture for DownloadCompletion {
    type Output = DownloadResult<Payload>;
    type IntoFuture = std::pin::Pin<Box<dyn std::future::Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}

/// Returned by `DownloadManager::download`: the item's handle plus its
/// completion.
#[derive(Debug)]
pub struct DownloadTicket {
    /// Identifies the item for pause, resume and cancel.
    pub handle: DownloadHandle,
    /// Resolves with the terminal result.
    pub completion: DownloadCompletion,
}

impl DownloadTicket {
    /// Split into handle and completion.
    pub fn into_parts(self) -> (DownloadHandle, DownloadCompletion) {
        (self.handle, self.completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_wait_returns_sent_result() {
        let (tx, rx) = oneshot::channel();
        let completion = DownloadCompletion::new(rx);
        tx.send(Ok(Payload::Data(Bytes::from_static(b"ok")))).unwrap();

        let payload = completion.wait().await.unwrap();
        assert_eq!(payload.as_bytes().unwrap().as_ref(), b"ok");
    }

    #[tokio::test]
    async fn test_dropped_sender_is_abandoned() {
        let (tx, rx) = oneshot::channel();
        drop(tx);
        assert_eq!(
            DownloadCompletion::new(rx).await,
            Err(DownloadError::Abandoned)
        );
    }

    #[test]
    fn test_try_result_pending_then_ready() {
        let (tx, rx) = oneshot::channel();
        let mut completion = DownloadCompletion::new(rx);
        assert!(completion.try_result().is_none());

        tx.send(Err(DownloadError::Cancelled)).unwrap();
        assert_eq!(completion.try_result(), Some(Err(DownloadError::Cancelled)));
        assert!(completion.try_result().is_none());
    }

    #[test]
    fn test_blocking_wait() {
        let (tx, rx) = oneshot::channel();
        let handle = std::thread::spawn(move || DownloadCompletion::new(rx).blocking_wait());
        tx.send(Err(DownloadError::network("reset"))).unwrap();
        assert_eq!(
            handle.join().unwrap(),
            Err(DownloadError::network("reset"))
        );
    }
}
