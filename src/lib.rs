//! Limpo Authentication Service
//!
//! Credential verification and token lifecycle for downstream services:
//! - User registration and login
//! - Argon2id password hashing (legacy bcrypt hashes still verify)
//! - HS256 access tokens carrying subject email and role
//! - Refresh tokens bound to the user's current role
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables:
//! - `JWT_SECRET` - Secret key for signing tokens (required, min 32 bytes)
//! - `JWT_SECRET_BASE64` - Treat `JWT_SECRET` as base64 key material (default: false)
//! - `JWT_ACCESS_EXPIRATION` - Access token expiration in seconds (default: 36000)
//! - `REFRESH_TOKEN_FORMAT` - `plain` or `signed` (default: plain)
//! - `DATABASE_URL` - PostgreSQL connection string (optional, in-memory store otherwise)
//! - `BIND_ADDR` - Listen address (default: 0.0.0.0:8080)
//!
//! # Usage
//!
//! ```rust,ignore
//! use limpo_auth::{bootstrap, create_routes, AuthConfig};
//!
//! let config = AuthConfig::from_env()?;
//! let auth = bootstrap(&config).await?;
//! let app = create_routes(auth);
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod password;
pub mod postgres;
pub mod refresh;
pub mod service;
pub mod store;
pub mod token;

// Re-export commonly used types
pub use config::{AuthConfig, RefreshTokenFormat, SigningSecret};
pub use error::{AuthError, RefreshTokenError, StoreError, TokenError};
pub use handlers::{create_routes, AuthState, BASE_PATH};
pub use models::*;
pub use password::PasswordHasher;
pub use postgres::PgUserStore;
pub use refresh::RefreshTokenCodec;
pub use service::AuthService;
pub use store::{InMemoryUserStore, UserStore};
pub use token::{Claims, TokenCodec, TokenValidation};

use std::sync::Arc;

/// Build the authentication service described by `config`.
///
/// Uses PostgreSQL when `database_url` is set (running migrations first),
/// otherwise a process-local store.
pub async fn bootstrap(config: &AuthConfig) -> Result<Arc<AuthService>, AuthError> {
    config.validate()?;

    tracing::info!(
        refresh_format = ?config.refresh_token_format,
        access_ttl_secs = config.access_token_expiration,
        "Initializing authentication service"
    );

    let store: Arc<dyn UserStore> = match &config.database_url {
        Some(url) => Arc::new(PgUserStore::connect(url).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, users are kept in memory only");
            Arc::new(InMemoryUserStore::new())
        }
    };

    let service = Arc::new(AuthService::new(store, config)?);

    tracing::info!("Authentication service ready");
    Ok(service)
}
