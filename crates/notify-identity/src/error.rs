use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity key not found for account")]
    NotFound,

    #[error("keyserver request failed: {0}")]
    KeyserverRequest(String),

    #[error("failed to resolve keys for dapp: {0}")]
    ResolveKeysFailed(String),

    #[error("jwt construction failed: {0}")]
    Jwt(#[from] notify_jwt::JwtError),

    #[error("invalid key encoding")]
    InvalidKeyEncoding,
}
