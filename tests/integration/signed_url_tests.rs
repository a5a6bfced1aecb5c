//! Signed URL integration tests.
//!
//! Tests verify:
//! - `/url/signed` requires a session (cookie or bearer)
//! - Minted URLs redeem until their expiry second
//! - Tampered, foreign and malformed URLs are rejected

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};

use media_gate::{SignedUrlAuth, VIDEO_URL_PATH};

use super::test_utils::{
    body_json, get, signed_url_request, TestApp, BASE_URL, NOW, TEST_SECRET, URL_TTL, VIDEO,
};

// =============================================================================
// Minting
// =============================================================================

#[tokio::test]
async fn test_mint_requires_session() {
    let app = TestApp::new();

    let request = Request::builder()
        .method("POST")
        .uri("/url/signed")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"resource":"videos/intro.mp4"}"#))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json["status"], "fail");
    assert_eq!(json["error"], "not_logged_in");
}

#[tokio::test]
async fn test_mint_with_cookie() {
    let app = TestApp::new();
    let token = app.login().await;

    let response = app.send(signed_url_request(&token, VIDEO)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "success");

    let data = &json["data"];
    assert_eq!(data["resource"], VIDEO);
    assert_eq!(data["expiresAt"], NOW + URL_TTL.as_secs());

    let url = data["url"].as_str().unwrap();
    assert!(url.starts_with(&format!("{}{}?", BASE_URL, VIDEO_URL_PATH)));
    assert!(url.contains("resource=videos%2Fintro.mp4"));
    assert!(url.contains("uid=u1"));
    assert!(url.contains(&format!("exp={}", NOW + URL_TTL.as_secs())));
    assert!(url.contains("sig="));
}

#[tokio::test]
async fn test_mint_with_bearer_token() {
    let app = TestApp::new();
    let token = app.login().await;

    let request = Request::builder()
        .method("POST")
        .uri("/url/signed")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(r#"{"videoId":"videos/intro.mp4"}"#))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_mint_empty_resource() {
    let app = TestApp::new();
    let token = app.login().await;

    let response = app.send(signed_url_request(&token, "  ")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "missing_resource");
}

#[tokio::test]
async fn test_mint_without_json_content_type() {
    let app = TestApp::new();
    let token = app.login().await;

    let request = Request::builder()
        .method("POST")
        .uri("/url/signed")
        .header(header::COOKIE, format!("auth_token={}", token))
        .body(Body::from(serde_json::json!({ "resource": VIDEO }).to_string()))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );

    let json = body_json(response).await;
    assert_eq!(json["status"], "fail");
    assert_eq!(json["error"], "invalid_body");
}

#[tokio::test]
async fn test_mint_body_checked_after_session() {
    let app = TestApp::new();

    let request = Request::builder()
        .method("POST")
        .uri("/url/signed")
        .body(Body::from("not json"))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json["error"], "not_logged_in");
}

// =============================================================================
// Redemption
// =============================================================================

#[tokio::test]
async fn test_redeem_fresh_url() {
    let app = TestApp::new();
    let path = app.signed_path(VIDEO).await;

    let response = app.send(get(&path)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_redeem_needs_no_cookie_after_logout() {
    let app = TestApp::new();
    let path = app.signed_path(VIDEO).await;

    let response = app.send(get("/logout")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.send(get(&path)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_redeem_expiry_boundary() {
    let app = TestApp::new();
    let path = app.signed_path(VIDEO).await;

    app.clock.advance(URL_TTL - Duration::from_secs(1));
    let response = app.send(get(&path)).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Exactly at the expiry second the URL is dead.
    app.clock.advance(Duration::from_secs(1));
    let response = app.send(get(&path)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json["error"], "signature_expired");
}

#[tokio::test]
async fn test_redeem_after_sixty_one_seconds() {
    let app = TestApp::new();
    let path = app.signed_path(VIDEO).await;

    app.clock.advance(Duration::from_secs(61));
    let response = app.send(get(&path)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_redeem_tampered_resource() {
    let app = TestApp::new();
    let path = app.signed_path(VIDEO).await;

    let tampered = path.replace("videos%2Fintro.mp4", "videos%2Fsecret.mp4");
    assert_ne!(tampered, path);

    let response = app.send(get(&tampered)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_signature");
}

#[tokio::test]
async fn test_redeem_extended_expiry() {
    let app = TestApp::new();
    let path = app.signed_path(VIDEO).await;

    let exp = NOW + URL_TTL.as_secs();
    let tampered = path.replace(&format!("exp={}", exp), &format!("exp={}", exp + 3600));

    let response = app.send(get(&tampered)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_tampered_expired_url_reports_signature() {
    let app = TestApp::new();
    let path = app.signed_path(VIDEO).await;

    app.clock.advance(Duration::from_secs(3600));
    let tampered = path.replace("uid=u1", "uid=u2");

    let response = app.send(get(&tampered)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_redeem_foreign_secret() {
    let app = TestApp::new();

    let foreign = SignedUrlAuth::new("some-other-secret");
    let exp = NOW + 30;
    let sig = foreign.sign_with_expiry_and_params(VIDEO_URL_PATH, exp, &[("resource", VIDEO)]);
    let uri = format!(
        "{}?resource=videos%2Fintro.mp4&exp={}&sig={}",
        VIDEO_URL_PATH, exp, sig
    );

    let response = app.send(get(&uri)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_redeem_url_signed_offline() {
    let app = TestApp::new();

    // A URL minted with the shared secret outside the server (e.g. the CLI)
    let auth = SignedUrlAuth::new(TEST_SECRET);
    let exp = NOW + 30;
    let sig = auth.sign_with_expiry_and_params(VIDEO_URL_PATH, exp, &[("resource", VIDEO)]);
    let uri = format!(
        "{}?resource=videos%2Fintro.mp4&exp={}&sig={}",
        VIDEO_URL_PATH, exp, sig
    );

    let response = app.send(get(&uri)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_redeem_malformed_urls() {
    let app = TestApp::new();
    let path = app.signed_path(VIDEO).await;
    let (base, query) = path.split_once('?').unwrap();

    let without = |name: &str| {
        let kept: Vec<&str> = query
            .split('&')
            .filter(|pair| !pair.starts_with(&format!("{}=", name)))
            .collect();
        format!("{}?{}", base, kept.join("&"))
    };

    let cases = [
        (without("sig"), "missing_signature"),
        (without("exp"), "missing_expiry"),
        (without("resource"), "missing_resource"),
        (format!("{}&sig=deadbeef", path), "invalid_signature_format"),
        (format!("{}?resource=x&exp=soon&sig=00", base), "invalid_expiry_format"),
    ];

    for (uri, error) in cases {
        let response = app.send(get(&uri)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);

        let json = body_json(response).await;
        assert_eq!(json["error"], error, "{}", uri);
    }
}
