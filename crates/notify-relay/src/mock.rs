#![cfg(feature = "test-support")]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use notify_types::Topic;

use crate::client::RelayClient;
use crate::error::RelayError;
use crate::rpc::{PublishOptions, RelayEvent};

/// A published envelope, recorded for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedPublish {
    pub topic: Topic,
    pub envelope: String,
    pub options: PublishOptions,
    /// The JSON-RPC request id the envelope was sent under: caller-chosen
    /// for a new request ([`RelayClient::publish`]), or the inbound
    /// request's own id for a reply ([`RelayClient::respond`]).
    pub request_id: i64,
}

/// An in-process relay double. Tests drive inbound delivery with
/// [`MockRelayClient::inject_event`] and assert on outbound traffic via
/// [`MockRelayClient::published`].
pub struct MockRelayClient {
    next_id: AtomicI64,
    published: Mutex<Vec<RecordedPublish>>,
    inbound_tx: mpsc::UnboundedSender<RelayEvent>,
    inbound_rx: AsyncMutex<mpsc::UnboundedReceiver<RelayEvent>>,
}

impl Default for MockRelayClient {
    fn default() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            next_id: AtomicI64::new(1),
            published: Mutex::new(Vec::new()),
            inbound_tx,
            inbound_rx: AsyncMutex::new(inbound_rx),
        }
    }
}

impl MockRelayClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject_event(&self, event: RelayEvent) {
        let _ = self.inbound_tx.send(event);
    }

    pub fn published(&self) -> Vec<RecordedPublish> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl RelayClient for MockRelayClient {
    async fn connect(&self) -> Result<(), RelayError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), RelayError> {
        Ok(())
    }

    async fn publish(
        &self,
        topic: Topic,
        request_id: i64,
        envelope: String,
        options: PublishOptions,
    ) -> Result<(), RelayError> {
        self.published.lock().unwrap().push(RecordedPublish {
            topic,
            envelope,
            options,
            request_id,
        });
        Ok(())
    }

    async fn respond(
        &self,
        topic: Topic,
        request_id: i64,
        envelope: String,
        options: PublishOptions,
    ) -> Result<(), RelayError> {
        self.published.lock().unwrap().push(RecordedPublish {
            topic,
            envelope,
            options,
            request_id,
        });
        Ok(())
    }

    async fn subscribe(&self, _topic: Topic) -> Result<(), RelayError> {
        Ok(())
    }

    async fn unsubscribe(&self, _topic: Topic) -> Result<(), RelayError> {
        Ok(())
    }

    async fn next_event(&self) -> Option<RelayEvent> {
        self.inbound_rx.lock().await.recv().await
    }

    fn next_request_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}
