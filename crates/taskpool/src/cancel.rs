//! Cooperative cancellation tokens.

use std::sync::Arc;
use tokio::sync::watch;

/// A cooperative cancellation signal.
///
/// Tokens are cheap to clone; all clones observe the same signal. A child
/// token ([`CancelToken::child`]) is cancelled when either it or any ancestor
/// is cancelled, which is how a run derives its own scope from a caller's
/// token: cancelling the run never touches the caller's token, while the
/// caller's cancellation reaches every waiter inside the run.
///
/// Cancellation is edge-insensitive: waiters arriving after the fact return
/// immediately.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    parent: Option<Arc<CancelToken>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            parent: None,
        }
    }

    /// Derive a scope that also observes this token's cancellation.
    pub fn child(&self) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            parent: Some(Arc::new(self.clone())),
        }
    }

    /// Cancel this token and, transitively, every child derived from it.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow() || self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }

    /// Wait until this token or an ancestor is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        match &self.parent {
            None => {
                // The sender lives in self, so wait_for cannot observe a
                // closed channel here.
                let _ = rx.wait_for(|cancelled| *cancelled).await;
            }
            Some(parent) => {
                tokio::select! {
                    _ = rx.wait_for(|cancelled| *cancelled) => {}
                    () = Box::pin(parent.cancelled()) => {}
                }
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
