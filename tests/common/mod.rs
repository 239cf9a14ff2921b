#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use rest_skeleton::app::{app, AppState};
use rest_skeleton::config::AppConfig;
use rest_skeleton::database::{MemoryStore, SharedStore};
use rest_skeleton::entity::{BcryptHasher, Operation, User, Validated};

pub const API: &str = "/api/v1/external";

/// Local config with the cheapest bcrypt cost
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::local();
    config.security.bcrypt_cost = 4;
    config
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let state = AppState::new(config, store).expect("app state");
        Self {
            router: app(state.clone()),
            state,
        }
    }

    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.expect("router response");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON body")
        };
        TestResponse { status, headers, body }
    }

    pub async fn send(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        self.request(build_request(method, path, token, body, &[])).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::POST, path, token, Some(body)).await
    }

    /// Insert a user straight into the store through the entity lifecycle
    pub async fn create_user(&self, email: &str, password: &str) -> User {
        let user = User {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: email.to_string(),
            password: password.to_string(),
            ..Default::default()
        };
        let user = Validated::check(user, Operation::Create)
            .expect("valid user")
            .prepare()
            .before_save(&BcryptHasher::new(4))
            .expect("hashed")
            .into_inner();
        self.state.store.create_user(&user).await.expect("stored user")
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .post(
                &format!("{API}/login"),
                None,
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);
        response.body["data"]["token"].as_str().expect("token").to_string()
    }

    /// A fresh user and an access token for it
    pub async fn authenticated(&self) -> String {
        self.create_user("admin@example.com", "secret123").await;
        self.login("admin@example.com", "secret123").await
    }
}

pub fn build_request(
    method: Method,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("request")
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn field_errors(&self) -> Vec<(String, String)> {
        self.body["data"]
            .as_array()
            .map(|errors| {
                errors
                    .iter()
                    .map(|e| {
                        (
                            e["field"].as_str().unwrap_or_default().to_string(),
                            e["message"].as_str().unwrap_or_default().to_string(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// The built binary serving from memory on a free port
pub struct TestServer {
    pub base_url: String,
    child: Child,
}

impl TestServer {
    pub fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let child = Command::new(env!("CARGO_BIN_EXE_rest-skeleton"))
            .args(["serve", "--in-memory", "--port", &port.to_string()])
            .env("APP_ENV", "local")
            .env("BCRYPT_COST", "4")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        Ok(Self {
            base_url: format!("http://127.0.0.1:{}{}", port, API),
            child,
        })
    }

    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(format!("{}/ping", self.base_url)).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
