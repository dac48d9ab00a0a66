#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use journal_api_rust::config::AppConfig;
use journal_api_rust::server::{app, AppState};

pub const PASSWORD: &str = "secret-pass";
pub const JWT_SECRET: &str = "integration-test-signing-secret";

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.jwt_secret = JWT_SECRET.to_string();
    config
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// The full router over fresh in-memory stores, driven without a socket
pub struct TestApp {
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let state = AppState::in_memory(&test_config());
        Self { router: app(state) }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .context("router failed")?;

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).with_context(|| format!("non-JSON body: {:?}", bytes))?
        };

        Ok(TestResponse { status, headers, body })
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<TestResponse> {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Result<TestResponse> {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> Result<TestResponse> {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Result<TestResponse> {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Register `<name>@example.com` and return its token
    pub async fn register(&self, name: &str, display_name: &str) -> Result<String> {
        let res = self
            .post(
                "/auth/register",
                None,
                json!({
                    "email": format!("{}@example.com", name),
                    "password": PASSWORD,
                    "display_name": display_name
                }),
            )
            .await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "register failed: {:?}", res.body);
        token_of(&res)
    }

    /// Create an entry and return its id
    pub async fn create_entry(&self, token: &str, title: &str) -> Result<String> {
        let res = self
            .post("/api/entries", Some(token), json!({ "title": title, "body": "" }))
            .await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "create failed: {:?}", res.body);
        res.data()["id"]
            .as_str()
            .map(str::to_string)
            .context("create response missing id")
    }
}

pub fn token_of(res: &TestResponse) -> Result<String> {
    res.data()["token"]
        .as_str()
        .map(str::to_string)
        .context("response missing token")
}
