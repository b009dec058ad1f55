use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Cooperative cancellation signal shared between a caller and the
/// asynchronous operations it started.
///
/// Clones observe the same signal. Once cancelled, a token stays cancelled.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called on any clone.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `future` until it completes or `cancel` fires, whichever is first.
///
/// Returns `None` on cancellation; the future is dropped without being polled
/// again. An already-cancelled token wins before the future is polled at all.
pub async fn cancellable<F: Future>(cancel: &CancelToken, future: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = future => Some(output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{Duration, sleep};

    #[tokio::test]
    async fn clones_share_cancellation() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
        clone.cancelled().await;
    }

    #[tokio::test]
    async fn cancellable_returns_output_when_not_cancelled() {
        let token = CancelToken::new();
        assert_eq!(cancellable(&token, async { 7 }).await, Some(7));
    }

    #[tokio::test]
    async fn cancellable_stops_pending_future() {
        let token = CancelToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result = cancellable(&token, async {
            sleep(Duration::from_secs(30)).await;
            1
        })
        .await;
        assert!(result.is_none());
    }
}
