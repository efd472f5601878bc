use async_trait::async_trait;

use notify_types::Topic;

use crate::error::RelayError;
use crate::rpc::{PublishOptions, RelayEvent};

/// The relay transport, consumed as an interface (spec.md §6): a
/// publish/subscribe WebSocket broker with a message archive, out of core
/// scope. Implementations own their own connection lifecycle; `connect`/
/// `disconnect` only need to drive the watch reconnect policy's timers.
#[async_trait]
pub trait RelayClient: Send + Sync {
    async fn connect(&self) -> Result<(), RelayError>;
    async fn disconnect(&self) -> Result<(), RelayError>;

    /// Publishes a new outbound request, tagging it with `request_id` so
    /// the wire frame's JSON-RPC `id` matches what [`crate::PendingRequests`]
    /// registered it under.
    async fn publish(
        &self,
        topic: Topic,
        request_id: i64,
        envelope: String,
        options: PublishOptions,
    ) -> Result<(), RelayError>;

    /// Replies to an inbound request, reusing its `request_id` so the
    /// originating caller's own correlation map resolves it.
    async fn respond(
        &self,
        topic: Topic,
        request_id: i64,
        envelope: String,
        options: PublishOptions,
    ) -> Result<(), RelayError>;

    async fn subscribe(&self, topic: Topic) -> Result<(), RelayError>;
    async fn unsubscribe(&self, topic: Topic) -> Result<(), RelayError>;

    /// Blocks until the next inbound delivery (request or correlated
    /// response). `None` once the transport has shut down for good.
    async fn next_event(&self) -> Option<RelayEvent>;

    /// A monotonically increasing JSON-RPC request id, unique per client.
    fn next_request_id(&self) -> i64;
}
