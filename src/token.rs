//! Access Tokens
//!
//! HS256-signed JWTs: `base64url(header).base64url(payload).base64url(signature)`.
//! Validity is decided entirely by the signature and the claims; there is
//! no server-side session table.

use crate::config::SigningSecret;
use crate::error::TokenError;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JWT claims. `sub` and `exp` are required; any other claim a token
/// carries is kept in `extra` and survives a parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user email)
    pub sub: String,
    /// Expiration timestamp (seconds)
    pub exp: i64,
    /// Issued at timestamp (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// User role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Collapsed validation outcome exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenValidation {
    Valid,
    Invalid,
}

/// Issues and verifies access tokens under one signing secret
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(secret: &SigningSecret, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `email`/`role` with the configured lifetime
    pub fn issue(&self, email: &str, role: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        self.issue_with_ttl(email, role, now, self.ttl)
    }

    pub fn issue_with_ttl(
        &self,
        email: &str,
        role: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let exp = now
            .checked_add_signed(ttl)
            .ok_or_else(|| TokenError::Encoding(format!("expiry out of range for ttl {}", ttl)))?;

        let claims = Claims {
            sub: email.to_string(),
            exp: exp.timestamp(),
            iat: Some(now.timestamp()),
            role: Some(role.to_string()),
            extra: Map::new(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify the signature and expiry of `token` as of `now`
    pub fn parse_and_verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let segments = token.split('.').count();
        if segments != 3 {
            return Err(TokenError::Malformed(format!(
                "expected 3 segments, found {}",
                segments
            )));
        }

        // Expiry is checked against the supplied clock below, not the
        // library's wall clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)?.claims;

        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    /// Verify `token` and require that it was issued for `expected_email`
    pub fn verify_for(
        &self,
        token: &str,
        expected_email: &str,
        now: DateTime<Utc>,
    ) -> Result<Claims, TokenError> {
        let claims = self.parse_and_verify(token, now)?;
        if claims.sub != expected_email {
            return Err(TokenError::SubjectMismatch);
        }
        Ok(claims)
    }

    /// Same as [`verify_for`](Self::verify_for) with every failure collapsed
    /// into `Invalid`. The specific cause is logged at debug level.
    pub fn validate_for(&self, token: &str, expected_email: &str, now: DateTime<Utc>) -> TokenValidation {
        match self.verify_for(token, expected_email, now) {
            Ok(_) => TokenValidation::Valid,
            Err(e) => {
                tracing::debug!(email = %expected_email, reason = %e, "Token validation failed");
                TokenValidation::Invalid
            }
        }
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").field("ttl", &self.ttl).finish()
    }
}
