//! Credential checks and token issuance
//!
//! Users come from configuration and never change while the server runs.
//! Passwords are stored as Argon2 PHC strings, so each check is slow and
//! salted. A successful login yields a signed token; every protected
//! request is then checked by validating that token, with no session
//! lookups.
//!
//! There is no lockout or rate limiting on failed logins.

use std::collections::HashMap;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use thiserror::Error;

use crate::config::UserConfig;
use crate::token::{Claims, TokenCodec, TokenError};

/// A configured user, keyed by username in [`AuthService`]
#[derive(Debug, Clone)]
pub struct Credential {
    pub password_hash: String,
    pub role: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Authentication gate in front of the appliance
pub struct AuthService {
    users: HashMap<String, Credential>,
    codec: TokenCodec,
    token_ttl: u64, // seconds
}

impl AuthService {
    /// Create a new auth service
    ///
    /// # Arguments
    /// * `users` - Configured accounts
    /// * `secret` - HMAC secret for signing tokens
    /// * `token_ttl` - Token lifetime in seconds
    pub fn new(users: &[UserConfig], secret: &[u8], token_ttl: u64) -> Self {
        let users = users
            .iter()
            .map(|u| {
                (
                    u.username.clone(),
                    Credential {
                        password_hash: u.password_hash.clone(),
                        role: u.role.clone(),
                    },
                )
            })
            .collect();

        Self {
            users,
            codec: TokenCodec::new(secret),
            token_ttl,
        }
    }

    /// Check credentials and issue a token.
    ///
    /// Returns `None` for an unknown user and for a wrong password alike.
    pub fn login(&self, username: &str, password: &str) -> Option<String> {
        match self.try_login(username, password) {
            Ok(token) => Some(token),
            Err(AuthError::InvalidCredentials) => None,
            Err(e) => {
                tracing::error!("Login for {} failed: {}", username, e);
                None
            }
        }
    }

    /// Like [`login`](Self::login) but reports why it failed
    pub fn try_login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let credential = self.users.get(username).ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &credential.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(self.codec.generate(username, Some(&credential.role), self.token_ttl)?)
    }

    /// Validate a bearer token, returning its claims when it is good
    pub fn validate_token(&self, token: &str) -> Option<Claims> {
        self.codec.validate(token).ok()
    }

    /// Token lifetime in seconds
    pub fn token_ttl(&self) -> u64 {
        self.token_ttl
    }

    /// Number of configured users
    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

/// Hash a password into an Argon2 PHC string
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt_bytes: [u8; 16] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AuthError::Hashing(e.to_string()))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// The two stock accounts used when configuration defines none:
/// `admin`/`senha123` and `user`/`user123`
pub fn stock_users() -> Result<Vec<UserConfig>, AuthError> {
    [("admin", "senha123", "admin"), ("user", "user123", "user")]
        .into_iter()
        .map(|(username, password, role)| {
            Ok(UserConfig {
                username: username.to_string(),
                password_hash: hash_password(password)?,
                role: role.to_string(),
            })
        })
        .collect()
}

/// Check a password against a PHC string. Unparsable hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is not a valid PHC string: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        let users = stock_users().unwrap();
        AuthService::new(&users, b"0123456789abcdef0123456789abcdef", 3600)
    }

    #[test]
    fn test_login_success() {
        let auth = service();
        let token = auth.login("admin", "senha123").unwrap();

        let claims = auth.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.role.as_deref(), Some("admin"));
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_stock_user_roles() {
        let auth = service();
        assert_eq!(auth.user_count(), 2);

        let token = auth.login("user", "user123").unwrap();
        let claims = auth.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "user");
        assert_eq!(claims.role.as_deref(), Some("user"));
    }

    #[test]
    fn test_login_wrong_password() {
        let auth = service();
        assert!(auth.login("admin", "user123").is_none());
        assert!(matches!(
            auth.try_login("admin", "wrong"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_login_unknown_user() {
        let auth = service();
        assert!(auth.login("ghost", "senha123").is_none());
        assert!(matches!(
            auth.try_login("ghost", "senha123"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_garbage() {
        let auth = service();
        assert!(auth.validate_token("not-a-token").is_none());
        assert!(auth.validate_token("a.b.c").is_none());
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let auth = service();
        let other = TokenCodec::new(b"some other secret of enough bytes");
        let token = other.generate("admin", Some("admin"), 3600).unwrap();
        assert!(auth.validate_token(&token).is_none());
    }

    #[test]
    fn test_hash_is_salted() {
        let a = hash_password("senha123").unwrap();
        let b = hash_password("senha123").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("senha123", &a));
        assert!(verify_password("senha123", &b));
        assert!(!verify_password("senha124", &a));
    }

    #[test]
    fn test_invalid_hash_never_matches() {
        assert!(!verify_password("anything", "plaintext"));
        assert!(!verify_password("", ""));
    }
}
