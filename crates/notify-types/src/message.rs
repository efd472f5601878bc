use serde::{Deserialize, Serialize};

use crate::Topic;

/// A decoded notification stored per subscription topic.
///
/// Deduplication key is `id`, which is the `msg.id` field carried inside
/// the decoded JWT claims — **not** the relay JSON-RPC request id, which is
/// per-delivery and would defeat dedup on redelivery/replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub topic: Topic,
    pub message: NotificationBody,
    /// Milliseconds since epoch (`claims.iat * 1000`).
    pub published_at: i64,
}

/// The notification payload carried inside `msg` claims and returned to
/// callers, matching the fields exercised by spec.md §8's decrypt test
/// vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationBody {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "type")]
    pub notification_type: String,
}

/// A short-lived correlation entry the relay history service consults when
/// a JSON-RPC response arrives, to route it back to the originating
/// operation and to reject unknown/injected responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub request_id: i64,
    pub topic: Topic,
    pub method: String,
}
