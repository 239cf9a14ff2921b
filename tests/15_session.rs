mod common;

use axum::http::{Method, StatusCode};
use common::{build_request, TestApp, API};
use serde_json::json;

async fn login_pair(app: &TestApp) -> (String, String) {
    app.create_user("jane@example.com", "secret123").await;
    let res = app
        .post(&format!("{API}/login"), None, json!({"email": "jane@example.com", "password": "secret123"}))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    (
        res.body["data"]["token"].as_str().unwrap().to_string(),
        res.body["data"]["refresh_token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn refresh_issues_a_working_token_pair() {
    let app = TestApp::new();
    let (_, refresh_token) = login_pair(&app).await;

    let res = app
        .post(&format!("{API}/refresh"), None, json!({"refresh_token": refresh_token}))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Successfully refreshed token");
    assert_eq!(res.body["data"]["token_type"], "Bearer");
    assert!(res.body["data"]["refresh_token"].as_str().is_some_and(|t| !t.is_empty()));

    let token = res.body["data"]["token"].as_str().unwrap();
    let profile = app.get(&format!("{API}/profile"), Some(token)).await;
    assert_eq!(profile.status, StatusCode::OK);
    assert_eq!(profile.body["data"]["email"], "jane@example.com");
}

#[tokio::test]
async fn refresh_rejects_access_tokens() {
    let app = TestApp::new();
    let (access_token, _) = login_pair(&app).await;

    let res = app
        .post(&format!("{API}/refresh"), None, json!({"refresh_token": access_token}))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["message"], "Refresh token is invalid or expired");
}

#[tokio::test]
async fn refresh_token_cannot_reach_protected_routes() {
    let app = TestApp::new();
    let (_, refresh_token) = login_pair(&app).await;

    let res = app.get(&format!("{API}/profile"), Some(&refresh_token)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_requires_a_token() {
    let app = TestApp::new();
    let res = app.post(&format!("{API}/refresh"), None, json!({})).await;

    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        res.field_errors(),
        vec![("refresh_token".to_string(), "The refresh_token field is required".to_string())]
    );
}

#[tokio::test]
async fn refresh_is_refused_once_the_user_is_deleted() {
    let app = TestApp::new();
    let (access_token, refresh_token) = login_pair(&app).await;

    let profile = app.get(&format!("{API}/profile"), Some(&access_token)).await;
    let uuid = profile.body["data"]["uuid"].as_str().unwrap().to_string();
    let deleted = app
        .send(Method::DELETE, &format!("{API}/users/{uuid}"), Some(&access_token), None)
        .await;
    assert_eq!(deleted.status, StatusCode::OK);

    let res = app
        .post(&format!("{API}/refresh"), None, json!({"refresh_token": refresh_token}))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn switching_language_localizes_the_session() {
    let app = TestApp::new();
    let (access_token, _) = login_pair(&app).await;

    let switched = app
        .post(&format!("{API}/language"), Some(&access_token), json!({"language": "id"}))
        .await;
    assert_eq!(switched.status, StatusCode::OK);
    assert_eq!(switched.body["message"], "Bahasa berhasil diubah");
    assert_eq!(switched.body["data"]["language"], "id");

    let token = switched.body["data"]["token"].as_str().unwrap().to_string();
    let profile = app.get(&format!("{API}/profile"), Some(&token)).await;
    assert_eq!(profile.body["message"], "Berhasil mengambil profil");

    // an explicit header still wins over the session
    let request = build_request(
        Method::GET,
        &format!("{API}/profile"),
        Some(&token),
        None,
        &[("accept-language", "en")],
    );
    let english = app.request(request).await;
    assert_eq!(english.body["message"], "Successfully get profile");

    // the old session keeps its language
    let old = app.get(&format!("{API}/profile"), Some(&access_token)).await;
    assert_eq!(old.body["message"], "Successfully get profile");
}

#[tokio::test]
async fn refreshed_session_keeps_its_language() {
    let app = TestApp::new();
    let (access_token, _) = login_pair(&app).await;

    let switched = app
        .post(&format!("{API}/language"), Some(&access_token), json!({"language": "id"}))
        .await;
    let refresh_token = switched.body["data"]["refresh_token"].as_str().unwrap().to_string();

    let refreshed = app
        .post(&format!("{API}/refresh"), None, json!({"refresh_token": refresh_token}))
        .await;
    let token = refreshed.body["data"]["token"].as_str().unwrap().to_string();

    let profile = app.get(&format!("{API}/profile"), Some(&token)).await;
    assert_eq!(profile.body["message"], "Berhasil mengambil profil");
}

#[tokio::test]
async fn unsupported_language_is_rejected() {
    let app = TestApp::new();
    let (access_token, _) = login_pair(&app).await;

    let res = app
        .post(&format!("{API}/language"), Some(&access_token), json!({"language": "fr"}))
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        res.field_errors(),
        vec![("language".to_string(), "The language must be one of: en, id".to_string())]
    );

    let anonymous = app.post(&format!("{API}/language"), None, json!({"language": "id"})).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}
