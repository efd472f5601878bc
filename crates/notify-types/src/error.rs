use thiserror::Error;

/// Errors raised while constructing or validating shared data-model values.
///
/// Protocol-level errors (timeouts, stale statements, key resolution
/// failures, …) live in `notify_engine::EngineError`; this enum only
/// covers malformed values that can be rejected at construction time.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid CAIP-10 account: {0}")]
    InvalidAccount(String),

    #[error("invalid scope id: {0}")]
    InvalidScope(String),
}
