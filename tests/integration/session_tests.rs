//! Session integration tests.
//!
//! Tests verify:
//! - Login issues exactly one HttpOnly `auth_token` cookie
//! - The response body carries a sanitized identity
//! - `/token` and `/logout` read and clear the cookie
//! - The session guard rejects expired and superseded credentials

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};

use media_gate::identity::Identity;

use super::test_utils::{
    body_json, cookie_token, get, login_request, password_hash, signed_url_request, TestApp,
    EMAIL, NOW, PASSWORD, SESSION_LIFETIME, VIDEO,
};

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let app = TestApp::new();

    let response = app.send(login_request(EMAIL, PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies: Vec<_> = response.headers().get_all(header::SET_COOKIE).iter().collect();
    assert_eq!(cookies.len(), 1);

    let cookie = cookies[0].to_str().unwrap();
    assert!(cookie.starts_with("auth_token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains(&format!("Max-Age={}", SESSION_LIFETIME.as_secs())));
    assert!(!cookie.contains("Secure"));
    assert!(!cookie_token(cookie).is_empty());
}

#[tokio::test]
async fn test_login_body_is_sanitized() {
    let app = TestApp::new();

    let response = app.send(login_request(EMAIL, PASSWORD)).await;
    let json = body_json(response).await;

    assert_eq!(json["status"], "success");
    let user = &json["data"]["user"];
    assert_eq!(user["id"], "u1");
    assert_eq!(user["email"], EMAIL);
    assert_eq!(user["name"], "Ada");

    for field in [
        "password",
        "passwordHash",
        "role",
        "active",
        "passwordChangedAt",
        "createdAt",
        "updatedAt",
        "profileImageId",
        "coverImageId",
    ] {
        assert!(user.get(field).is_none(), "{} leaked", field);
    }
}

#[tokio::test]
async fn test_login_email_is_case_insensitive() {
    let app = TestApp::new();

    let response = app.send(login_request("ADA@Example.com", PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = TestApp::new();

    let response = app.send(login_request(EMAIL, "wrong")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let json = body_json(response).await;
    assert_eq!(json["status"], "fail");
    assert_eq!(json["error"], "invalid_credentials");
}

#[tokio::test]
async fn test_login_inactive_identity() {
    let app = TestApp::new();

    let response = app
        .send(login_request("dormant@example.com", PASSWORD))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_login_malformed_body() {
    let app = TestApp::new();

    let request = Request::builder()
        .method("POST")
        .uri("/api/user/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\":"))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );

    let json = body_json(response).await;
    assert_eq!(json["status"], "fail");
    assert_eq!(json["error"], "invalid_body");
    assert!(json["message"].as_str().unwrap().contains("parse"));
}

#[tokio::test]
async fn test_login_missing_field() {
    let app = TestApp::new();

    let request = Request::builder()
        .method("POST")
        .uri("/api/user/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::json!({ "email": EMAIL }).to_string()))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let json = body_json(response).await;
    assert_eq!(json["status"], "fail");
    assert_eq!(json["error"], "invalid_body");
}

// =============================================================================
// Token and Logout
// =============================================================================

#[tokio::test]
async fn test_token_returns_cookie_value() {
    let app = TestApp::new();
    let token = app.login().await;

    let request = Request::builder()
        .uri("/token")
        .header(header::COOKIE, format!("theme=dark; auth_token={}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["data"]["token"], token.as_str());
}

#[tokio::test]
async fn test_token_without_cookie() {
    let app = TestApp::new();

    let response = app.send(get("/token")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "missing_credential");
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = TestApp::new();

    let response = app.send(get("/logout")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("auth_token=;"));
    assert!(cookie.contains("Max-Age=0"));

    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["message"], "Logged out successfully...");
}

// =============================================================================
// Session Guard
// =============================================================================

#[tokio::test]
async fn test_session_valid_until_lifetime_ends() {
    let app = TestApp::new();
    let token = app.login().await;

    app.clock.advance(SESSION_LIFETIME - Duration::from_secs(1));
    let response = app.send(signed_url_request(&token, VIDEO)).await;
    assert_eq!(response.status(), StatusCode::OK);

    app.clock.advance(Duration::from_secs(1));
    let response = app.send(signed_url_request(&token, VIDEO)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json["error"], "token_expired");
}

#[tokio::test]
async fn test_forged_session_rejected() {
    let app = TestApp::new();
    let token = app.login().await;

    let mut forged = token.clone();
    forged.push('x');

    let response = app.send(signed_url_request(&forged, VIDEO)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_token");
}

#[tokio::test]
async fn test_session_rejected_after_password_change() {
    let app = TestApp::new();
    let token = app.login().await;

    let mut ada = Identity::with_password("u1", EMAIL, "a new password").unwrap();
    ada.password_changed_at = Some(NOW + 10);
    app.identities.insert(ada).await;

    app.clock.advance(Duration::from_secs(20));
    let response = app.send(signed_url_request(&token, VIDEO)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json["error"], "password_changed");
}

#[tokio::test]
async fn test_session_rejected_for_deactivated_identity() {
    let app = TestApp::new();
    let token = app.login().await;

    let mut ada = Identity::new("u1", EMAIL, password_hash());
    ada.active = false;
    app.identities.insert(ada).await;

    let response = app.send(signed_url_request(&token, VIDEO)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json["error"], "inactive_identity");
}
