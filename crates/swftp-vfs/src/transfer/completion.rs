//! One-shot completion signal shared between a transfer task and its
//! observers.
//!
//! ```text
//!   Resolver (task side)      watch       Completion (caller side, Clone)
//!   ┌──────────────────┐   ────────▶   ┌──────────────────────────────┐
//!   │ .complete(bytes) │               │ .wait() / .state()           │
//!   │ .fail(err)       │   ◀────────   │ .cancel()                    │
//!   │ .cancel()        │  cancel token └──────────────────────────────┘
//!   └──────────────────┘
//! ```
//!
//! The first resolution wins; later ones are ignored. Dropping an
//! unresolved [`Resolver`] resolves the signal as
//! [`TransferError::Abandoned`], so waiters never hang.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::TransferError;

/// Observable state of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferState {
    Pending,
    /// Finished; carries the number of bytes moved.
    Completed(u64),
    Failed(TransferError),
    Cancelled,
}

impl TransferState {
    /// Returns true once resolved.
    pub fn is_finished(&self) -> bool {
        !matches!(self, TransferState::Pending)
    }

    fn into_result(self) -> Result<u64, TransferError> {
        match self {
            TransferState::Completed(bytes) => Ok(bytes),
            TransferState::Failed(e) => Err(e),
            TransferState::Cancelled => Err(TransferError::Cancelled),
            TransferState::Pending => Err(TransferError::Abandoned),
        }
    }
}

/// Create a linked resolver and completion.
pub fn completion() -> (Resolver, Completion) {
    let (tx, rx) = watch::channel(TransferState::Pending);
    let cancel = CancellationToken::new();
    (
        Resolver {
            tx,
            cancel: cancel.clone(),
        },
        Completion { rx, cancel },
    )
}

/// Caller-side handle: wait for the outcome or cancel.
#[derive(Debug, Clone)]
pub struct Completion {
    rx: watch::Receiver<TransferState>,
    cancel: CancellationToken,
}

impl Completion {
    /// Current state without waiting.
    pub fn state(&self) -> TransferState {
        self.rx.borrow().clone()
    }

    /// Returns true once resolved.
    pub fn is_finished(&self) -> bool {
        self.rx.borrow().is_finished()
    }

    /// Wait for the outcome. Any number of clones may wait.
    pub async fn wait(&self) -> Result<u64, TransferError> {
        let mut rx = self.rx.clone();
        match rx.wait_for(TransferState::is_finished).await {
            Ok(state) => state.clone().into_result(),
            Err(_) => Err(TransferError::Abandoned),
        }
    }

    /// Ask the transfer to stop. Has no effect once resolved.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Task-side handle that settles the outcome exactly once.
#[derive(Debug)]
pub struct Resolver {
    tx: watch::Sender<TransferState>,
    cancel: CancellationToken,
}

impl Resolver {
    /// Resolve as completed. Returns false if already resolved.
    pub fn complete(&self, bytes: u64) -> bool {
        self.resolve(TransferState::Completed(bytes))
    }

    /// Resolve as failed. Returns false if already resolved.
    pub fn fail(&self, error: TransferError) -> bool {
        self.resolve(TransferState::Failed(error))
    }

    /// Resolve as cancelled. Returns false if already resolved.
    pub fn cancel(&self) -> bool {
        self.resolve(TransferState::Cancelled)
    }

    /// Token fired when a caller asks for cancellation.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn resolve(&self, state: TransferState) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_finished() {
                return false;
            }
            *current = state;
            true
        })
    }
}

impl Drop for Resolver {
    fn drop(&mut self) {
        self.resolve(TransferState::Failed(TransferError::Abandoned));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_resolution_wins() {
        let (resolver, completion) = completion();
        assert_eq!(completion.state(), TransferState::Pending);
        assert!(resolver.complete(10));
        assert!(!resolver.fail(TransferError::Closed));
        assert!(!resolver.cancel());
        assert_eq!(completion.wait().await, Ok(10));
    }

    #[tokio::test]
    async fn test_many_waiters() {
        let (resolver, completion) = completion();
        let other = completion.clone();
        let waiter = tokio::spawn(async move { other.wait().await });
        resolver.fail(TransferError::Consumer("boom".into()));
        assert_eq!(
            waiter.await.unwrap(),
            Err(TransferError::Consumer("boom".into()))
        );
        assert!(completion.is_finished());
    }

    #[tokio::test]
    async fn test_dropped_resolver_abandons() {
        let (resolver, completion) = completion();
        drop(resolver);
        assert_eq!(completion.wait().await, Err(TransferError::Abandoned));
    }

    #[tokio::test]
    async fn test_cancel_reaches_resolver() {
        let (resolver, completion) = completion();
        let token = resolver.cancellation();
        completion.cancel();
        token.cancelled().await;
        resolver.cancel();
        assert_eq!(completion.wait().await, Err(TransferError::Cancelled));
        drop(resolver);
        assert_eq!(completion.state(), TransferState::Cancelled);
    }
}
