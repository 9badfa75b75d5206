use thiserror::Error;
use time::OffsetDateTime;

/// Failure reported by a [`CryptoService`](crate::CryptoService).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("no transformation is provisioned for service `{0}`")]
    UnknownService(String),

    #[error("unknown transformation id `{0}`")]
    UnknownTransformation(String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),
}

/// Errors returned by the token codec.
///
/// [`Malformed`](ScsError::Malformed), [`Authentication`](ScsError::Authentication) and
/// [`Expired`](ScsError::Expired) all mean "there is no valid session". The remaining variants
/// point at a configuration or data problem and should not be papered over.
#[derive(Debug, Clone, Error)]
pub enum ScsError {
    #[error("malformed session token: expected 5 fields, found {parts}")]
    Malformed { parts: usize },

    #[error("session token failed authentication")]
    Authentication,

    #[error("session token issued at {issued_at} has expired (now {now})")]
    Expired {
        issued_at: OffsetDateTime,
        now: OffsetDateTime,
    },

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("session token codec failure: {reason}")]
    Codec { reason: String },
}

impl ScsError {
    pub(crate) fn codec(reason: impl Into<String>) -> Self {
        Self::Codec {
            reason: reason.into(),
        }
    }

    /// Whether this error only means the client has no usable session.
    pub fn is_no_session(&self) -> bool {
        matches!(
            self,
            Self::Malformed { .. } | Self::Authentication | Self::Expired { .. }
        )
    }
}

pub type Result<T, E = ScsError> = std::result::Result<T, E>;
