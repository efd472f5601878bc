use thiserror::Error;

/// Taxonomy from spec.md §7. Every variant is scoped to the operation that
/// raised it — there is no fatal condition at the engine level.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("operation called before init")]
    NotInitialized,

    #[error("account has no identity key")]
    NotRegistered,

    #[error("registration statement is stale, unregister first")]
    StaleStatement,

    #[error("jwt failed structural decode")]
    InvalidToken,

    #[error("act claim did not match: {0}")]
    ActMismatch(String),

    #[error("failed to resolve dapp keys: {0}")]
    KeysUnavailable(String),

    #[error("subscription not found for topic")]
    SubscriptionMissing,

    #[error("no correlated response within the resolution window")]
    Timeout,

    #[error("network request failed: {0}")]
    NetworkFailure(String),

    #[error("store operation failed: {0}")]
    StoreFailure(String),

    #[error("envelope operation failed: {0}")]
    Crypto(#[from] notify_crypto::CryptoError),
}

impl From<notify_stores::StoreError> for EngineError {
    fn from(e: notify_stores::StoreError) -> Self {
        EngineError::StoreFailure(e.to_string())
    }
}

impl From<notify_relay::RelayError> for EngineError {
    fn from(e: notify_relay::RelayError) -> Self {
        match e {
            notify_relay::RelayError::Timeout => EngineError::Timeout,
            other => EngineError::NetworkFailure(other.to_string()),
        }
    }
}

impl From<notify_jwt::JwtError> for EngineError {
    fn from(e: notify_jwt::JwtError) -> Self {
        match e {
            notify_jwt::JwtError::ActMismatch { actual, .. } => EngineError::ActMismatch(actual),
            _ => EngineError::InvalidToken,
        }
    }
}

impl From<notify_identity::IdentityError> for EngineError {
    fn from(e: notify_identity::IdentityError) -> Self {
        match e {
            notify_identity::IdentityError::ResolveKeysFailed(msg) => {
                EngineError::KeysUnavailable(msg)
            }
            other => EngineError::NetworkFailure(other.to_string()),
        }
    }
}
