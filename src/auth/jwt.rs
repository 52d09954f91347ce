//! JWT token management
//!
//! Issues and validates HS256 access/refresh tokens. Validation inspects the
//! header before verifying the signature so that only allow-listed algorithms
//! ever reach the verifier.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode};
use uuid::Uuid;

use crate::auth::types::{PrincipalIdentity, TokenClaims, TokenKind, TokenPair};
use crate::config::{JwtConfig, MAX_ACCESS_TTL_HOURS, MAX_REFRESH_TTL_DAYS, MIN_SECRET_LEN};
use crate::error::{AuthError, Result, TokenError};

/// Algorithms accepted by `validate`
const ALLOWED_ALGORITHMS: &[Algorithm] = &[Algorithm::HS256];

/// JWT token issuer
pub struct TokenIssuer {
    /// Encoding key
    encoding_key: EncodingKey,
    /// Decoding key
    decoding_key: DecodingKey,
    /// Validation configuration
    validation: Validation,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Create a new issuer; the secret must be at least 32 bytes
    pub fn new(config: &JwtConfig) -> Result<Self> {
        if config.secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::config(format!(
                "JWT secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        let in_range = (1..=MAX_ACCESS_TTL_HOURS).contains(&config.access_ttl_hours)
            && (1..=MAX_REFRESH_TTL_DAYS).contains(&config.refresh_ttl_days);
        let lifetimes = Duration::try_hours(config.access_ttl_hours)
            .zip(Duration::try_days(config.refresh_ttl_days))
            .filter(|_| in_range);
        let Some((access_ttl, refresh_ttl)) = lifetimes else {
            return Err(AuthError::config("token lifetimes must be positive and in range"));
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.validate_aud = false;
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            issuer: config.issuer.clone(),
            access_ttl,
            refresh_ttl,
        })
    }

    /// Access token lifetime in seconds
    #[must_use]
    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Generate access token
    pub fn issue_access(&self, principal: &PrincipalIdentity) -> Result<String> {
        self.issue(principal, TokenKind::Access, self.access_ttl)
    }

    /// Generate refresh token
    pub fn issue_refresh(&self, principal: &PrincipalIdentity) -> Result<String> {
        self.issue(principal, TokenKind::Refresh, self.refresh_ttl)
    }

    /// Generate token pair (access + refresh tokens)
    pub fn issue_pair(&self, principal: &PrincipalIdentity) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue_access(principal)?,
            refresh_token: self.issue_refresh(principal)?,
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl_secs(),
        })
    }

    /// Validate a token of either kind
    pub fn validate(&self, token: &str) -> std::result::Result<TokenClaims, TokenError> {
        let header = decode_header(token).map_err(|_| TokenError::Malformed)?;
        if !ALLOWED_ALGORITHMS.contains(&header.alg) {
            return Err(TokenError::SignatureInvalid);
        }

        decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidIssuer
                | ErrorKind::InvalidAlgorithm => TokenError::SignatureInvalid,
                _ => TokenError::Malformed,
            })
    }

    /// Validate a token that must be an access token
    pub fn validate_access(&self, token: &str) -> std::result::Result<TokenClaims, TokenError> {
        self.validate_kind(token, TokenKind::Access)
    }

    /// Validate a token that must be a refresh token
    pub fn validate_refresh(&self, token: &str) -> std::result::Result<TokenClaims, TokenError> {
        self.validate_kind(token, TokenKind::Refresh)
    }

    fn validate_kind(
        &self,
        token: &str,
        expected: TokenKind,
    ) -> std::result::Result<TokenClaims, TokenError> {
        let claims = self.validate(token)?;
        if claims.typ != expected || claims.user_id().is_none() {
            return Err(TokenError::Malformed);
        }
        Ok(claims)
    }

    fn issue(
        &self,
        principal: &PrincipalIdentity,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<String> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: principal.id.to_string(),
            email: principal.email.clone(),
            role: principal.role.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
            typ: kind,
        };
        self.encode_claims(&claims)
    }

    fn encode_claims(&self, claims: &TokenClaims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::internal_with_source("Token generation failed", e))
    }
}
