mod common;

use axum::http::{Method, StatusCode};
use common::{build_request, test_config, TestApp, API};

#[tokio::test]
async fn request_id_is_echoed_when_supplied() {
    let app = TestApp::new();
    let request = build_request(Method::GET, &format!("{API}/ping"), None, None, &[("set-request-id", "req-42")]);
    let res = app.request(request).await;

    assert_eq!(res.headers.get("x-request-id").unwrap(), "req-42");
}

#[tokio::test]
async fn request_id_is_generated_otherwise() {
    let app = TestApp::new();
    let res = app.get(&format!("{API}/ping"), None).await;

    let id = res.headers.get("x-request-id").unwrap().to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

#[tokio::test]
async fn request_id_can_be_disabled() {
    let mut config = test_config();
    config.app.enable_request_id = false;
    let app = TestApp::with_config(config);

    let res = app.get(&format!("{API}/ping"), None).await;
    assert!(res.headers.get("x-request-id").is_none());
}

#[tokio::test]
async fn cors_allows_configured_origin() {
    let app = TestApp::new();
    let request = build_request(
        Method::GET,
        &format!("{API}/ping"),
        None,
        None,
        &[("origin", "http://example.test")],
    );
    let res = app.request(request).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.headers.get("access-control-allow-origin").unwrap(), "*");
}

#[tokio::test]
async fn unknown_route_returns_not_found_envelope() {
    let app = TestApp::new();
    let res = app.get("/api/v1/external/nowhere", None).await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["code"], 404);
    assert_eq!(res.body["error"], "NOT_FOUND");
    assert_eq!(res.body["message"], "Resource not found");
}

#[tokio::test]
async fn default_language_comes_from_config() {
    let mut config = test_config();
    config.app.language = "id".to_string();
    let app = TestApp::with_config(config);

    let res = app.get("/nowhere", None).await;
    assert_eq!(res.body["message"], "Data tidak ditemukan");
}
