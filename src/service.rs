//! Authentication Service
//!
//! Orchestrates registration, login, token validation and token refresh.
//! Stateless between calls: everything it knows about a session is in the
//! tokens themselves or in the user store.

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::models::*;
use crate::password::PasswordHasher;
use crate::refresh::RefreshTokenCodec;
use crate::store::UserStore;
use crate::token::{TokenCodec, TokenValidation};

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Authentication service
pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    tokens: TokenCodec,
    refresh_tokens: RefreshTokenCodec,
    /// Hash verified against when the email is unknown, so both login
    /// failures pay the same hashing cost
    dummy_hash: OnceCell<String>,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(store: Arc<dyn UserStore>, config: &AuthConfig) -> Result<Self, AuthError> {
        Ok(Self {
            store,
            hasher: PasswordHasher::from_config(config)?,
            tokens: TokenCodec::new(&config.jwt_secret, config.access_token_ttl()),
            refresh_tokens: RefreshTokenCodec::new(config.refresh_token_format, &config.jwt_secret),
            dummy_hash: OnceCell::new(),
        })
    }

    /// Assemble a service from already-built parts
    pub fn from_parts(
        store: Arc<dyn UserStore>,
        hasher: PasswordHasher,
        tokens: TokenCodec,
        refresh_tokens: RefreshTokenCodec,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
            refresh_tokens,
            dummy_hash: OnceCell::new(),
        }
    }

    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    pub fn refresh_tokens(&self) -> &RefreshTokenCodec {
        &self.refresh_tokens
    }

    // ============================================
    // Password Hashing
    // ============================================

    // Argon2 is CPU-bound; keep it off the async worker threads.

    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| {
                tracing::error!("Password hashing task failed: {}", e);
                AuthError::Internal
            })?
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| {
                tracing::error!("Password verification task failed: {}", e);
                AuthError::Internal
            })
    }

    async fn dummy_hash(&self) -> Result<String, AuthError> {
        self.dummy_hash
            .get_or_try_init(|| self.hash_password("limpo-auth-dummy-password".to_string()))
            .await
            .cloned()
    }

    // ============================================
    // Registration
    // ============================================

    /// Register a new user
    pub async fn register(&self, req: RegisterRequest) -> Result<User, AuthError> {
        let RegisterRequest {
            first_name,
            last_name,
            email,
            password,
            role,
        } = req;

        let password_hash = self.hash_password(password).await?;

        // The store decides uniqueness atomically; no pre-check here.
        let user = self
            .store
            .create(NewUser {
                first_name,
                last_name,
                email,
                password_hash,
                role,
            })
            .await?;

        tracing::info!(user_id = %user.id, email = %user.email, "User registered");
        Ok(user)
    }

    // ============================================
    // Login
    // ============================================

    /// Check credentials and issue an access token plus refresh token.
    ///
    /// Unknown email and wrong password produce the same error.
    pub async fn login(&self, req: LoginRequest) -> Result<AuthorizedResponse, AuthError> {
        let user = match self.store.find_by_email(&req.email).await? {
            Some(user) => user,
            None => {
                tracing::debug!(email = %req.email, "Login for unknown email");
                let dummy = self.dummy_hash().await?;
                self.verify_password(req.password, dummy).await?;
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !self
            .verify_password(req.password, user.password_hash.clone())
            .await?
        {
            tracing::debug!(email = %user.email, "Login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.issue_access_token(&user.email, &user.role)?;
        let refresh_token = self.refresh_tokens.encode(&user.email, &user.role);

        tracing::info!(email = %user.email, "User logged in");

        Ok(AuthorizedResponse {
            email: user.email,
            token,
            role: user.role,
            refresh_token,
        })
    }

    // ============================================
    // Token Validation
    // ============================================

    /// Validate `token` for `email`. Every failure is the same `Invalid`.
    pub fn validate_token(&self, token: &str, email: &str) -> TokenValidation {
        self.tokens.validate_for(token, email, Utc::now())
    }

    // ============================================
    // Token Refresh
    // ============================================

    /// Issue a new access token from a refresh token.
    ///
    /// The refresh token is honored only while the role it carries still
    /// matches the role on file, and is returned unchanged.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthorizedResponse, AuthError> {
        let (email, role) = self.refresh_tokens.decode(refresh_token).map_err(|e| {
            tracing::debug!(reason = %e, "Rejected refresh token");
            AuthError::Unauthorized
        })?;

        let user = self
            .store
            .find_by_email(&email)
            .await?
            .ok_or_else(|| {
                tracing::warn!(email = %email, "Refresh token for unknown user");
                AuthError::Unauthorized
            })?;

        if user.role != role {
            tracing::warn!(
                email = %email,
                "Refresh token role no longer matches the user's role"
            );
            return Err(AuthError::Unauthorized);
        }

        let token = self.issue_access_token(&user.email, &user.role)?;

        tracing::info!(email = %user.email, "Access token refreshed");

        Ok(AuthorizedResponse {
            email: user.email,
            token,
            role: user.role,
            refresh_token: refresh_token.to_string(),
        })
    }

    fn issue_access_token(&self, email: &str, role: &str) -> Result<String, AuthError> {
        self.tokens.issue(email, role, Utc::now()).map_err(|e| {
            tracing::error!("Failed to issue access token: {}", e);
            AuthError::Internal
        })
    }
}
