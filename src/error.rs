//! Authentication Error Types
//!
//! `AuthError` is the per-request outcome surfaced to the HTTP layer. The
//! finer-grained token, refresh and store errors stay internal: they are
//! logged and then collapsed into the coarse outcomes callers see.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Authentication errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("Already exists")]
    DuplicateEmail,

    #[error("Wrong Credentials")]
    InvalidCredentials,

    #[error("Invalid Token")]
    InvalidToken,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error")]
    Internal,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            AuthError::DuplicateEmail => (StatusCode::CONFLICT, self.to_string()).into_response(),
            AuthError::InvalidCredentials => {
                (StatusCode::NOT_FOUND, self.to_string()).into_response()
            }
            AuthError::InvalidToken => (StatusCode::CONFLICT, self.to_string()).into_response(),
            AuthError::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            AuthError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": "validation_error",
                    "message": msg
                })),
            )
                .into_response(),
            AuthError::Config(_) | AuthError::Database(_) | AuthError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "internal_error",
                    "message": "An internal error occurred"
                })),
            )
                .into_response(),
        }
    }
}

/// Reasons an access token fails to verify
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("signature does not verify")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("subject does not match")]
    SubjectMismatch,

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::BadSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// Reasons a refresh token cannot be decoded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshTokenError {
    #[error("malformed refresh token")]
    Malformed,

    #[error("refresh token signature does not verify")]
    BadSignature,
}

/// User store failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("a user with this email already exists")]
    Conflict,

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => AuthError::DuplicateEmail,
            StoreError::Backend(msg) => {
                tracing::error!("User store error: {}", msg);
                AuthError::Database(msg)
            }
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // unique_violation
            if db_err.code().as_deref() == Some("23505") {
                return StoreError::Conflict;
            }
        }
        StoreError::Backend(err.to_string())
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AuthError::Database(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        tracing::error!("Password hashing error: {:?}", err);
        AuthError::Internal
    }
}
