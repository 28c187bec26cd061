#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Wrong shape: missing separator, bad base64, undecodable payload.
    #[error("envelope is malformed")]
    MalformedEnvelope,

    /// Recomputed HMAC disagrees with the transported signature.
    #[error("envelope signature mismatch")]
    SignatureMismatch,

    /// Credential past its expiry.
    #[error("credential expired")]
    Expired,

    /// Paid-class access cap reached for the current counter window.
    #[error("access cap exhausted")]
    CapExhausted,

    /// Entitlement class outside the closed free/paid set.
    #[error("unknown entitlement class")]
    UnknownClass,

    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
