//! API surface tests: health, CORS and the 404 fallback.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};

use media_gate::RouterConfig;

use super::test_utils::{body_json, get, TestApp};

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new();

    let response = app.send(get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_unknown_route_returns_not_found() {
    let app = TestApp::new();

    let response = app.send(get("/no/such/route")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["status"], "fail");
    assert_eq!(json["error"], "not_found");
    assert_eq!(json["message"], "Can't find this page or route /no/such/route");
}

#[tokio::test]
async fn test_unknown_route_is_not_guarded() {
    let app = TestApp::new();

    let request = Request::builder()
        .method("POST")
        .uri("/url/unsigned")
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dev_cors_allows_listed_origin_with_credentials() {
    let app = TestApp::new();

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;
    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:3000"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
}

#[tokio::test]
async fn test_dev_cors_rejects_unlisted_origin() {
    let app = TestApp::new();

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://evil.example.com")
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_dev_cors_preflight() {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/url/signed")
        .header(header::ORIGIN, "http://localhost:5050")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:5050"
    );
}

#[tokio::test]
async fn test_production_cors_allows_any_origin() {
    let app = TestApp::with_config(RouterConfig::production().with_tracing(false));

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://app.example.com")
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}
