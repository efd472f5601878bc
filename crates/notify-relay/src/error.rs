use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay connection closed")]
    ConnectionClosed,

    #[error("publish failed: {0}")]
    PublishFailed(String),

    #[error("request timed out")]
    Timeout,
}
