//! Authentication Configuration
//!
//! All configuration values are loaded from environment variables once at
//! process start. The signing secret is passed explicitly to the codecs
//! that need it; nothing reads the environment after startup.

use crate::error::AuthError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::env;
use std::fmt;

/// Minimum signing key length in bytes (HS256 block-size guidance)
pub const MIN_SECRET_BYTES: usize = 32;

/// Default access token lifetime in seconds (10 hours)
pub const DEFAULT_ACCESS_TOKEN_EXPIRATION: i64 = 10 * 60 * 60;

/// Longest accepted access token lifetime in seconds (one year)
pub const MAX_ACCESS_TOKEN_EXPIRATION: i64 = 365 * 24 * 60 * 60;

/// Shared HMAC key for access tokens and signed refresh tokens
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    /// Use the raw bytes of the secret string as the key
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }

    /// Treat the secret string as base64-encoded key material
    pub fn from_base64(encoded: &str) -> Result<Self, AuthError> {
        STANDARD
            .decode(encoded.trim())
            .map(Self)
            .map_err(|_| AuthError::Config("JWT_SECRET is not valid base64".to_string()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningSecret(<{} bytes redacted>)", self.0.len())
    }
}

/// Wire format of refresh tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshTokenFormat {
    /// base64 of `<email>,has role,<role>`, compatible with existing tokens
    #[default]
    Plain,
    /// Same payload with an HMAC-SHA256 tag appended
    Signed,
}

impl std::str::FromStr for RefreshTokenFormat {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "plain" => Ok(Self::Plain),
            "signed" => Ok(Self::Signed),
            other => Err(AuthError::Config(format!(
                "REFRESH_TOKEN_FORMAT must be 'plain' or 'signed', got '{}'",
                other
            ))),
        }
    }
}

/// Authentication configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT signing secret (from JWT_SECRET, optionally base64 via JWT_SECRET_BASE64)
    pub jwt_secret: SigningSecret,

    /// Access token lifetime in seconds (from JWT_ACCESS_EXPIRATION env var)
    pub access_token_expiration: i64,

    /// Refresh token wire format (from REFRESH_TOKEN_FORMAT env var)
    pub refresh_token_format: RefreshTokenFormat,

    /// Argon2 memory cost in KiB (from ARGON2_MEMORY_COST env var)
    pub argon2_memory_cost: u32,

    /// Argon2 time cost (iterations) (from ARGON2_TIME_COST env var)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (from ARGON2_PARALLELISM env var)
    pub argon2_parallelism: u32,

    /// PostgreSQL connection string; in-memory store when unset
    pub database_url: Option<String>,

    /// Listen address (from BIND_ADDR env var)
    pub bind_addr: String,
}

impl AuthConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> Result<Self, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_secret = lookup("JWT_SECRET").ok_or_else(|| {
            AuthError::Config("JWT_SECRET environment variable must be set".to_string())
        })?;

        let secret_is_base64 = lookup("JWT_SECRET_BASE64")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let jwt_secret = if secret_is_base64 {
            SigningSecret::from_base64(&raw_secret)?
        } else {
            SigningSecret::new(raw_secret)
        };

        let refresh_token_format = match lookup("REFRESH_TOKEN_FORMAT") {
            Some(v) => v.parse::<RefreshTokenFormat>()?,
            None => RefreshTokenFormat::default(),
        };

        let config = Self {
            jwt_secret,

            access_token_expiration: lookup("JWT_ACCESS_EXPIRATION")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_ACCESS_TOKEN_EXPIRATION),

            refresh_token_format,

            argon2_memory_cost: lookup("ARGON2_MEMORY_COST")
                .and_then(|v| v.parse().ok())
                .unwrap_or(65536), // 64 MiB

            argon2_time_cost: lookup("ARGON2_TIME_COST")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),

            argon2_parallelism: lookup("ARGON2_PARALLELISM")
                .and_then(|v| v.parse().ok())
                .unwrap_or(4),

            database_url: lookup("DATABASE_URL").filter(|v| !v.is_empty()),

            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.jwt_secret.len() < MIN_SECRET_BYTES {
            return Err(AuthError::Config(format!(
                "JWT_SECRET must be at least {} bytes",
                MIN_SECRET_BYTES
            )));
        }

        if self.access_token_expiration <= 0 {
            return Err(AuthError::Config(
                "JWT_ACCESS_EXPIRATION must be positive".to_string(),
            ));
        }

        if self.access_token_expiration > MAX_ACCESS_TOKEN_EXPIRATION
            || chrono::Duration::try_seconds(self.access_token_expiration).is_none()
        {
            return Err(AuthError::Config(format!(
                "JWT_ACCESS_EXPIRATION must be at most {} seconds",
                MAX_ACCESS_TOKEN_EXPIRATION
            )));
        }

        argon2::Params::new(
            self.argon2_memory_cost,
            self.argon2_time_cost,
            self.argon2_parallelism,
            None,
        )
        .map_err(|e| AuthError::Config(format!("invalid Argon2 parameters: {}", e)))?;

        Ok(())
    }

    /// Access token lifetime as a duration
    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::try_seconds(self.access_token_expiration).unwrap_or(chrono::Duration::MAX)
    }
}
