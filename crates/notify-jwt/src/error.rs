use thiserror::Error;

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("malformed compact JWS")]
    MalformedToken,

    #[error("invalid key encoding")]
    InvalidKeyEncoding,

    #[error("invalid did URI")]
    InvalidDid,

    #[error("signature verification failed")]
    InvalidSignature,

    #[error("claims do not deserialize to the expected shape")]
    InvalidClaims,

    #[error("act claim {actual:?} did not match expected {expected:?}")]
    ActMismatch { expected: String, actual: String },
}
