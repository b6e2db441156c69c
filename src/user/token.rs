//! Signed access and refresh tokens.

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,

    #[error("Failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenClaims {
    user_id: String,
    /// Unique per token so that two refresh tokens issued in the same second differ.
    jti: String,
    iat: i64,
    exp: i64,
}

struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    max_age: Duration,
}

impl TokenKeys {
    fn new(secret: &str, max_age: Duration) -> Self {
        TokenKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            max_age,
        }
    }

    fn sign(&self, user_id: &str) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            user_id: user_id.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.max_age.as_secs() as i64,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Signing)
    }

    fn verify(&self, token: &str) -> Result<String, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<TokenClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims.user_id)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

/// Issues and verifies HS256 tokens. Access and refresh tokens use separate secrets,
/// so one can never be presented as the other.
pub struct TokenManager {
    access: TokenKeys,
    refresh: TokenKeys,
}

impl TokenManager {
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        access_max_age: Duration,
        refresh_max_age: Duration,
    ) -> Self {
        TokenManager {
            access: TokenKeys::new(access_secret, access_max_age),
            refresh: TokenKeys::new(refresh_secret, refresh_max_age),
        }
    }

    pub fn generate_access_token(&self, user_id: &str) -> Result<String, TokenError> {
        self.access.sign(user_id)
    }

    pub fn generate_refresh_token(&self, user_id: &str) -> Result<String, TokenError> {
        self.refresh.sign(user_id)
    }

    /// Returns the user id bound to the token.
    pub fn verify_access_token(&self, token: &str) -> Result<String, TokenError> {
        self.access.verify(token)
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<String, TokenError> {
        self.refresh.verify(token)
    }
}
