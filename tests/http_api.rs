//! End-to-end tests of the HTTP surface against an in-memory user store.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use limpo_auth::{
    create_routes, AuthService, AuthorizedResponse, InMemoryUserStore, PasswordHasher,
    RefreshTokenCodec, RefreshTokenFormat, SigningSecret, TokenCodec, BASE_PATH,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "http-test-secret-http-test-secret";

fn app() -> (Router, Arc<InMemoryUserStore>, Arc<AuthService>) {
    let store = Arc::new(InMemoryUserStore::new());
    let secret = SigningSecret::new(SECRET);
    let service = Arc::new(AuthService::from_parts(
        store.clone(),
        PasswordHasher::new(1024, 1, 1).unwrap(),
        TokenCodec::new(&secret, chrono::Duration::hours(10)),
        RefreshTokenCodec::new(RefreshTokenFormat::Plain, &secret),
    ));
    (create_routes(service.clone()), store, service)
}

async fn post_json(app: &Router, path: &str, body: Value) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("POST")
        .uri(format!("{}{}", BASE_PATH, path))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn post_empty(app: &Router, path_and_query: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("POST")
        .uri(format!("{}{}", BASE_PATH, path_and_query))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

fn registration(email: &str, password: &str, role: &str) -> Value {
    json!({
        "firstName": "Test",
        "lastName": "User",
        "email": email,
        "password": password,
        "role": role
    })
}

#[tokio::test]
async fn register_returns_user_without_password() {
    let (app, _, _) = app();

    let (status, body) = post_json(
        &app,
        "/register",
        registration("newuser@mail.com", "12345678", "ROLE_ADMIN"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let user: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(user["firstName"], "Test");
    assert_eq!(user["lastName"], "User");
    assert_eq!(user["email"], "newuser@mail.com");
    assert_eq!(user["role"], "ROLE_ADMIN");
    assert!(user.get("password").is_none());
    assert!(user.get("passwordHash").is_none());
}

#[tokio::test]
async fn register_duplicate_is_conflict() {
    let (app, _, _) = app();
    let body = registration("test@mail.com", "12345678", "ROLE_ADMIN");

    let (status, _) = post_json(&app, "/register", body.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(&app, "/register", body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, b"Already exists");
}

#[tokio::test]
async fn register_rejects_invalid_email() {
    let (app, store, _) = app();

    let (status, _) = post_json(&app, "/register", registration("nope", "pw", "ROLE_USER")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn login_flow() {
    let (app, _, service) = app();
    post_json(&app, "/register", registration("t@x.com", "pw123", "ROLE_USER")).await;

    let (status, body) = post_json(&app, "/login", json!({"email": "t@x.com", "password": "pw123"})).await;
    assert_eq!(status, StatusCode::OK);

    let authorized: AuthorizedResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(authorized.email, "t@x.com");
    assert_eq!(authorized.role, "ROLE_USER");
    assert!(authorized.token.starts_with("ey"));
    assert!(!authorized.refresh_token.is_empty());

    let claims = service
        .tokens()
        .parse_and_verify(&authorized.token, chrono::Utc::now())
        .unwrap();
    assert_eq!(claims.sub, "t@x.com");
    assert_eq!(claims.role.as_deref(), Some("ROLE_USER"));

    let (status, body) =
        post_json(&app, "/login", json!({"email": "t@x.com", "password": "wrongpw"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, b"Wrong Credentials");

    let (status, body) =
        post_json(&app, "/login", json!({"email": "who@x.com", "password": "pw123"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, b"Wrong Credentials");
}

#[tokio::test]
async fn validate_token_endpoint() {
    let (app, _, _) = app();
    post_json(&app, "/register", registration("dani@mail.bg", "12345678", "ROLE_ADMIN")).await;
    let (_, body) = post_json(
        &app,
        "/login",
        json!({"email": "dani@mail.bg", "password": "12345678"}),
    )
    .await;
    let authorized: Value = serde_json::from_slice(&body).unwrap();

    // the login payload can be posted back as-is
    let (status, body) = post_json(&app, "/validateToken", authorized.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"Valid Token");

    let (status, body) = post_json(
        &app,
        "/validateToken",
        json!({"email": "other@mail.bg", "token": authorized["token"]}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, b"Invalid Token");

    let (status, body) = post_json(
        &app,
        "/validateToken",
        json!({"email": "dani@mail.bg", "token": "eyJhbGciOiJIUzI1NiJ9.garbage"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, b"Invalid Token");
}

#[tokio::test]
async fn validate_token_missing_fields_is_invalid() {
    let (app, _, _) = app();

    for body in [
        json!({"token": "abc.def.ghi"}),
        json!({"email": "dani@mail.bg"}),
        json!({"email": null, "token": "abc.def.ghi"}),
        json!({}),
    ] {
        let (status, response) = post_json(&app, "/validateToken", body).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(response, b"Invalid Token");
    }
}

#[tokio::test]
async fn refresh_endpoint() {
    let (app, store, _) = app();
    post_json(&app, "/register", registration("dani@mail.bg", "12345678", "ROLE_ADMIN")).await;

    // artifact in the established wire format
    let artifact = "ZGFuaUBtYWlsLmJnLGhhcyByb2xlLFJPTEVfQURNSU4=";
    let (status, body) = post_empty(&app, &format!("/refreshToken?refreshToken={}", artifact)).await;
    assert_eq!(status, StatusCode::OK);

    let refreshed: AuthorizedResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(refreshed.email, "dani@mail.bg");
    assert_eq!(refreshed.role, "ROLE_ADMIN");
    assert!(refreshed.token.starts_with("ey"));
    assert_eq!(refreshed.refresh_token, artifact);

    // corrupted artifact
    let (status, body) = post_empty(
        &app,
        "/refreshToken?refreshToken=ZGFuaUBtYWlsLmJnLGhhcyByb2xlLFJPTEVfQURNSU43=",
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.is_empty());

    // role changed after the artifact was issued
    store.update_role("dani@mail.bg", "ROLE_USER").await;
    let (status, _) = post_empty(&app, &format!("/refreshToken?refreshToken={}", artifact)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
