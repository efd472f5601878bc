use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key encoding")]
    InvalidKeyEncoding,

    #[error("malformed envelope")]
    MalformedEnvelope,

    #[error("unsupported envelope type byte: {0}")]
    UnsupportedEnvelopeType(u8),

    #[error("decryption failed")]
    DecryptionFailed,
}
