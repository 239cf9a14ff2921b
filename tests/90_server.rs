mod common;

use std::time::Duration;

use anyhow::Result;
use common::TestServer;
use serde_json::json;

#[tokio::test]
async fn in_memory_server_serves_login_flow() -> Result<()> {
    let server = TestServer::spawn()?;
    server.wait_ready(Duration::from_secs(20)).await?;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/ping", server.base_url)).send().await?;
    assert!(res.headers().contains_key("x-request-id"));
    let body: serde_json::Value = res.json().await?;
    assert_eq!(body["data"], "pong");

    let res = client
        .post(format!("{}/login", server.base_url))
        .json(&json!({"email": "", "password": ""}))
        .send()
        .await?;
    assert_eq!(res.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);

    let res = client.get(format!("{}/profile", server.base_url)).send().await?;
    assert_eq!(res.status(), reqwest::StatusCode::UNAUTHORIZED);
    Ok(())
}
