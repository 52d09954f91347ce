//! Errors produced while validating signed access/refresh tokens.

use thiserror::Error;

/// Why a bearer or refresh token was rejected.
///
/// Callers branch on the variant, never on the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum TokenError {
    /// Not a well-formed token, an unknown algorithm name, missing claims,
    /// or the wrong token kind for the endpoint.
    #[error("token is malformed")]
    Malformed,

    /// Signature, algorithm or issuer did not verify.
    #[error("token signature is invalid")]
    SignatureInvalid,

    /// The `exp` claim is in the past.
    #[error("token has expired")]
    Expired,
}

impl TokenError {
    /// Stable machine-readable code used in HTTP error bodies.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Malformed => "TOKEN_MALFORMED",
            Self::SignatureInvalid => "TOKEN_INVALID",
            Self::Expired => "TOKEN_EXPIRED",
        }
    }
}
