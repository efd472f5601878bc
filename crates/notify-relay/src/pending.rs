use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::timeout;

use notify_types::{PendingRequest, Topic};

use crate::error::RelayError;

/// Default resolution timeout for reply-bearing operations (spec.md §4.1
/// outbound operation template, step 6).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// The relay history service: tracks in-flight requests by id so an
/// inbound response can be routed back to its caller, and drops responses
/// that don't match anything outstanding (out-of-order delivery, replayed
/// history) silently.
#[derive(Default)]
pub struct PendingRequests {
    inner: Mutex<HashMap<i64, (PendingRequest, oneshot::Sender<String>)>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `request_id` as awaiting a response, returning a future
    /// that resolves with the raw response envelope or `RelayError::Timeout`.
    pub fn register(
        &self,
        request_id: i64,
        topic: Topic,
        method: impl Into<String>,
    ) -> impl std::future::Future<Output = Result<String, RelayError>> + '_ {
        let (tx, rx) = oneshot::channel();
        let pending = PendingRequest { request_id, topic, method: method.into() };
        self.inner.lock().unwrap().insert(request_id, (pending, tx));

        async move {
            match timeout(DEFAULT_TIMEOUT, rx).await {
                Ok(Ok(envelope)) => Ok(envelope),
                Ok(Err(_)) => Err(RelayError::ConnectionClosed),
                Err(_) => {
                    self.inner.lock().unwrap().remove(&request_id);
                    Err(RelayError::Timeout)
                }
            }
        }
    }

    /// Routes an inbound response to its registered caller. Returns the
    /// originating method if one was found, or `None` if `request_id` was
    /// unknown (the caller should log and drop, per spec.md §4.1 inbound
    /// dispatch).
    pub fn resolve(&self, request_id: i64, envelope: String) -> Option<String> {
        let entry = self.inner.lock().unwrap().remove(&request_id);
        entry.map(|(pending, tx)| {
            let _ = tx.send(envelope);
            pending.method
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify_types::Topic;

    #[tokio::test]
    async fn resolves_registered_request() {
        let pending = PendingRequests::new();
        let fut = pending.register(1, Topic("t".into()), "notify_subscription");
        assert!(pending.resolve(1, "payload".into()).is_some());
        assert_eq!(fut.await.unwrap(), "payload");
    }

    #[tokio::test]
    async fn resolving_unknown_id_is_a_noop() {
        let pending = PendingRequests::new();
        assert!(pending.resolve(42, "payload".into()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_removes_the_entry() {
        let pending = PendingRequests::new();
        let fut = pending.register(7, Topic("t".into()), "notify_subscription");
        tokio::time::advance(DEFAULT_TIMEOUT + Duration::from_secs(1)).await;
        assert!(matches!(fut.await, Err(RelayError::Timeout)));

        // A late response for the same id now has nothing to route to.
        assert!(pending.resolve(7, "too-late".into()).is_none());
    }
}
