//! Authentication HTTP Handlers
//!
//! REST endpoints under `/api/v1/auth-service`.

use crate::error::AuthError;
use crate::models::*;
use crate::service::AuthService;
use crate::token::TokenValidation;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use std::sync::Arc;
use validator::Validate;

/// Shared auth service state
pub type AuthState = Arc<AuthService>;

/// Mount point of the authentication routes
pub const BASE_PATH: &str = "/api/v1/auth-service";

// ============================================
// Route Builder
// ============================================

/// Create authentication routes
pub fn create_routes(auth_service: Arc<AuthService>) -> Router {
    let routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/validateToken", post(validate_token))
        .route("/refreshToken", post(refresh_token));

    Router::new()
        .nest(BASE_PATH, routes)
        .with_state(auth_service)
}

// ============================================
// Registration
// ============================================

/// POST /register
///
/// Register a new user account
pub async fn register(
    State(auth): State<AuthState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    req.validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;

    let user = auth.register(req).await?;

    Ok(Json(UserResponse::from(user)))
}

// ============================================
// Login
// ============================================

/// POST /login
///
/// Authenticate user and return access/refresh tokens
pub async fn login(
    State(auth): State<AuthState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let response = auth.login(req).await?;

    Ok(Json(response))
}

// ============================================
// Token Validation
// ============================================

/// POST /validateToken
///
/// Check that a token is valid for the given email
pub async fn validate_token(
    State(auth): State<AuthState>,
    Json(req): Json<ValidateTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let (Some(token), Some(email)) = (req.token.as_deref(), req.email.as_deref()) else {
        tracing::debug!("Token validation request without token or email");
        return Err(AuthError::InvalidToken);
    };

    match auth.validate_token(token, email) {
        TokenValidation::Valid => Ok((StatusCode::OK, "Valid Token")),
        TokenValidation::Invalid => Err(AuthError::InvalidToken),
    }
}

// ============================================
// Token Refresh
// ============================================

/// POST /refreshToken?refreshToken=...
///
/// Issue a new access token from a refresh token
pub async fn refresh_token(
    State(auth): State<AuthState>,
    Query(query): Query<RefreshTokenQuery>,
) -> Result<impl IntoResponse, AuthError> {
    let response = auth.refresh(&query.refresh_token).await?;

    Ok(Json(response))
}
