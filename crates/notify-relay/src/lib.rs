//! Relay transport interface and request correlation for the Notify
//! protocol engine, consumed as an interface (spec.md §6 "Relay transport").

mod client;
mod error;
#[cfg(feature = "test-support")]
mod mock;
mod pending;
mod rpc;

pub use client::RelayClient;
pub use error::RelayError;
pub use pending::{PendingRequests, DEFAULT_TIMEOUT};
pub use rpc::{
    JsonRpcError, JsonRpcPublishParams, JsonRpcRequest, JsonRpcResponse, MethodTags,
    PublishOptions, RelayEvent, DELETE, GET_NOTIFICATIONS, MARK_READ, MESSAGE, SUBSCRIBE,
    SUBSCRIPTIONS_CHANGED, UPDATE, WATCH,
};

#[cfg(feature = "test-support")]
pub use mock::{MockRelayClient, RecordedPublish};
