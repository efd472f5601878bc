use serde::{Deserialize, Serialize};

use notify_types::Topic;

/// A protocol method's publish/subscribe tag and TTL pair (spec.md §6 tag
/// allocation table). `req` is what the engine publishes; `res` is what it
/// expects back on the shared topic.
#[derive(Debug, Clone, Copy)]
pub struct MethodTags {
    pub req_tag: u32,
    pub req_ttl_secs: u32,
    pub res_tag: u32,
    pub res_ttl_secs: u32,
}

pub const SUBSCRIBE: MethodTags =
    MethodTags { req_tag: 4000, req_ttl_secs: 300, res_tag: 4001, res_ttl_secs: 30 * 86_400 };
pub const MESSAGE: MethodTags =
    MethodTags { req_tag: 4002, req_ttl_secs: 30 * 86_400, res_tag: 4003, res_ttl_secs: 30 * 86_400 };
pub const DELETE: MethodTags =
    MethodTags { req_tag: 4004, req_ttl_secs: 30 * 86_400, res_tag: 4005, res_ttl_secs: 30 * 86_400 };
pub const UPDATE: MethodTags =
    MethodTags { req_tag: 4008, req_ttl_secs: 300, res_tag: 4009, res_ttl_secs: 30 * 86_400 };
pub const WATCH: MethodTags =
    MethodTags { req_tag: 4010, req_ttl_secs: 300, res_tag: 4011, res_ttl_secs: 300 };
pub const SUBSCRIPTIONS_CHANGED: MethodTags =
    MethodTags { req_tag: 4012, req_ttl_secs: 300, res_tag: 4013, res_ttl_secs: 300 };
pub const GET_NOTIFICATIONS: MethodTags =
    MethodTags { req_tag: 4014, req_ttl_secs: 300, res_tag: 4015, res_ttl_secs: 300 };
pub const MARK_READ: MethodTags =
    MethodTags { req_tag: 4020, req_ttl_secs: 300, res_tag: 4021, res_ttl_secs: 300 };

/// Publish-time options the relay transport attaches to every outbound
/// message.
#[derive(Debug, Clone, Copy)]
pub struct PublishOptions {
    pub tag: u32,
    pub ttl_secs: u32,
    pub prompt: bool,
}

impl PublishOptions {
    pub fn request(tags: MethodTags) -> Self {
        Self { tag: tags.req_tag, ttl_secs: tags.req_ttl_secs, prompt: true }
    }

    pub fn response(tags: MethodTags) -> Self {
        Self { tag: tags.res_tag, ttl_secs: tags.res_ttl_secs, prompt: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub id: i64,
    pub jsonrpc: String,
    pub method: String,
    pub params: JsonRpcPublishParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcPublishParams {
    pub topic: Topic,
    pub message: String,
    pub tag: u32,
    pub ttl: u32,
    #[serde(default)]
    pub prompt: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub id: i64,
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

/// A decoded inbound relay delivery: either a request the engine must
/// reply to, or a response correlated against a pending outbound request.
#[derive(Debug, Clone)]
pub enum RelayEvent {
    Request { topic: Topic, request_id: i64, method: String, envelope: String },
    Response { request_id: i64, envelope: String },
}
