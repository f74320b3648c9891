//! Compact signed tokens
//!
//! A token is three dot-separated URL-safe base64 segments (no padding):
//! header, claims, and an HMAC-SHA256 signature over `header.claims`.
//! This is the HS256 flavour of JWT, so `jsonwebtoken` does the encoding
//! and the constant-time signature check. Expiry is checked here against
//! an explicit clock so callers can validate "as of" any instant.
//!
//! Nothing is stored server side: a token stays valid until its `exp`
//! passes. There is no revocation list.

use std::collections::HashSet;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Claims embedded in tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Role of the subject at issuance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token encoding failed: {0}")]
    Encoding(#[source] jsonwebtoken::errors::Error),

    #[error("Malformed token")]
    Malformed,

    #[error("Token signature mismatch")]
    BadSignature,

    #[error("Token has expired")]
    Expired,
}

/// Signs and verifies tokens with one shared secret
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenCodec {
    /// Create a codec for the given HMAC secret (should be >= 32 bytes)
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Issue a token for `subject` valid for `ttl_secs` from now
    pub fn generate(&self, subject: &str, role: Option<&str>, ttl_secs: u64) -> Result<String, TokenError> {
        self.generate_at(subject, role, ttl_secs, unix_now())
    }

    /// Issue a token as if the current time were `now`
    pub fn generate_at(
        &self,
        subject: &str,
        role: Option<&str>,
        ttl_secs: u64,
        now: u64,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: subject.to_string(),
            exp: now.saturating_add(ttl_secs),
            iat: now,
            role: role.map(String::from),
        };

        // Header::default() is {"typ":"JWT","alg":"HS256"}
        encode(&Header::default(), &claims, &self.encoding_key).map_err(TokenError::Encoding)
    }

    /// Verify signature and expiry against the current time
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_at(token, unix_now())
    }

    /// Verify signature and expiry as of `now`.
    ///
    /// A token whose `exp` equals `now` is already expired.
    pub fn validate_at(&self, token: &str, now: u64) -> Result<Claims, TokenError> {
        if token.split('.').count() != 3 {
            return Err(TokenError::Malformed);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against our own clock, with no leeway.
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            _ => TokenError::Malformed,
        })?;

        if data.claims.exp <= now {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}

/// Current Unix time in seconds
pub fn unix_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

/// Generate a secure random secret for token signing
pub fn generate_secret() -> [u8; 32] {
    use rand::Rng;
    rand::thread_rng().r#gen()
}
