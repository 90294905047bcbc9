//! Cancellation scope for clipboard watchers.
//!
//! Cancellation is signalled by closing a channel, so watchers can await it
//! alongside their poll timer instead of checking a flag.

use async_channel::{Receiver, Sender};

/// A handle that cancels its scope when dropped.
///
/// When this handle is dropped or [`cancel()`](Self::cancel) is called,
/// every [`CancelToken`] created from it reports cancellation.
///
/// # Example
///
/// ```ignore
/// let (handle, token) = CancelHandle::new();
/// let mut changes = clipboard.watch(token, Format::Text);
///
/// // Dropping the handle closes `changes`
/// drop(handle);
/// ```
#[derive(Debug)]
pub struct CancelHandle {
    sender: Sender<()>,
    receiver: Receiver<()>,
}

impl CancelHandle {
    /// Create a new cancel handle and token pair.
    #[must_use]
    pub fn new() -> (Self, CancelToken) {
        let (sender, receiver) = async_channel::bounded(1);
        let token = CancelToken {
            receiver: receiver.clone(),
        };
        (Self { sender, receiver }, token)
    }

    /// Explicitly cancel the scope.
    ///
    /// This is automatically called on drop.
    pub fn cancel(&self) {
        self.sender.close();
    }

    /// Create another token observing this scope.
    #[must_use]
    pub fn token(&self) -> CancelToken {
        CancelToken {
            receiver: self.receiver.clone(),
        }
    }
}

impl Drop for CancelHandle {
    fn drop(&mut self) {
        self.sender.close();
    }
}

/// Token that background tasks use to observe cancellation.
#[derive(Debug, Clone)]
pub struct CancelToken {
    receiver: Receiver<()>,
}

impl CancelToken {
    /// Check if the scope was cancelled (non-blocking).
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.receiver.is_closed()
    }

    /// Wait until the scope is cancelled.
    pub async fn cancelled(&self) {
        // Nothing is ever sent; recv only returns once the channel closes.
        let _ = self.receiver.recv().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn cancel_is_observed_by_every_token() {
        let (handle, token) = CancelHandle::new();
        let other = handle.token();
        let cloned = token.clone();
        assert!(!token.is_cancelled());

        handle.cancel();
        assert!(token.is_cancelled());
        assert!(other.is_cancelled());
        assert!(cloned.is_cancelled());
    }

    #[test]
    fn dropping_handle_cancels() {
        let (handle, token) = CancelHandle::new();
        drop(handle);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn token_made_later_observes_cancel() {
        let (handle, _token) = CancelHandle::new();
        let later = handle.token();
        assert!(!later.is_cancelled());

        let waiter = tokio::spawn(async move { later.cancelled().await });
        handle.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("cancellation not observed")
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let (handle, token) = CancelHandle::new();
        let waiter = tokio::spawn(async move { token.cancelled().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        handle.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("cancellation not observed")
            .unwrap();
    }
}
