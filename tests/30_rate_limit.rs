mod common;

use std::time::Duration;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestServer;

#[tokio::test]
async fn login_attempts_are_limited_per_window() -> Result<()> {
    // Dedicated server so the tightened limit does not bleed into other tests.
    let server = TestServer::spawn_with_env(&[
        ("GATEWAY_LOGIN_MAX_REQUESTS", "3"),
        ("GATEWAY_LOGIN_WINDOW_SECS", "60"),
    ])?;
    server.wait_ready(Duration::from_secs(10)).await?;

    let client = reqwest::Client::new();
    let payload = json!({ "email": "admin@example.com", "password": "wrong" });

    // The limiter counts attempts before credentials are checked.
    for attempt in 1..=3 {
        let res = client
            .post(format!("{}/auth/login", server.base_url))
            .json(&payload)
            .send()
            .await?;
        assert_eq!(
            res.status(),
            StatusCode::UNAUTHORIZED,
            "attempt {} should pass the limiter",
            attempt
        );
    }

    let res = client
        .post(format!("{}/auth/login", server.base_url))
        .json(&payload)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

    assert_eq!(res.headers().get("retry-after").unwrap(), "60");
    assert_eq!(res.headers().get("x-ratelimit-limit").unwrap(), "3");
    assert_eq!(res.headers().get("x-ratelimit-remaining").unwrap(), "0");
    assert!(res.headers().contains_key("x-ratelimit-reset"));

    let body = res.json::<Value>().await?;
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "TOO_MANY_REQUESTS");

    Ok(())
}

#[tokio::test]
async fn login_limit_does_not_throttle_other_routes() -> Result<()> {
    let server = TestServer::spawn_with_env(&[
        ("GATEWAY_LOGIN_MAX_REQUESTS", "1"),
        ("GATEWAY_LOGIN_WINDOW_SECS", "60"),
    ])?;
    server.wait_ready(Duration::from_secs(10)).await?;

    let client = reqwest::Client::new();

    // Exhaust the login window.
    let payload = json!({ "email": "admin@example.com", "password": "wrong" });
    for _ in 0..2 {
        client
            .post(format!("{}/auth/login", server.base_url))
            .json(&payload)
            .send()
            .await?;
    }

    // Anonymous session creation falls in the default class and stays open.
    let res = client
        .post(format!("{}/auth/session", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    Ok(())
}

#[tokio::test]
async fn health_is_exempt_from_limiting() -> Result<()> {
    let server = TestServer::spawn_with_env(&[
        ("GATEWAY_DEFAULT_MAX_REQUESTS", "1"),
        ("GATEWAY_DEFAULT_WINDOW_SECS", "60"),
    ])?;
    server.wait_ready(Duration::from_secs(10)).await?;

    let client = reqwest::Client::new();
    for _ in 0..5 {
        let res = client
            .get(format!("{}/health", server.base_url))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::OK);
    }

    Ok(())
}
