//! Shared helpers for driving the router in-process.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt; // for `.oneshot()`

use brevity_api::{build_router, AppState};
use brevity_db::{InMemoryIdentityProvider, InMemoryNoteRepository};
use brevity_inference::mock::MockCompletionBackend;

pub const PASSWORD: &str = "Abcdefg1";

/// Router over in-memory storage and a scripted completion model.
pub struct TestApp {
    pub router: Router,
    pub completion: MockCompletionBackend,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_completion(MockCompletionBackend::new())
    }

    pub fn with_completion(completion: MockCompletionBackend) -> Self {
        let state = AppState::new(
            Arc::new(InMemoryIdentityProvider::new()),
            Arc::new(InMemoryNoteRepository::new()),
            Arc::new(completion.clone()),
        );
        Self::with_state(state, completion)
    }

    pub fn with_state(state: AppState, completion: MockCompletionBackend) -> Self {
        Self {
            router: build_router(state),
            completion,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> axum::response::Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Register `email` and return its session token.
    pub async fn register(&self, email: &str) -> String {
        let resp = self
            .send(json_request(
                Method::POST,
                "/api/v1/auth/register",
                Some(json!({ "email": email, "password": PASSWORD })),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        body_json(resp).await["token"].as_str().unwrap().to_string()
    }

    /// Create a note and return its JSON.
    pub async fn create_note(&self, token: &str, title: &str, content: &str) -> Value {
        let resp = self
            .send(authed_request(
                Method::POST,
                "/api/v1/notes",
                token,
                Some(json!({ "title": title, "content": content })),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        body_json(resp).await
    }
}

pub fn json_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    match body {
        Some(val) => builder.body(Body::from(val.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn authed_request(method: Method, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let mut request = json_request(method, uri, body);
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    request
}

pub async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
}

pub async fn body_text(resp: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8_lossy(&bytes).to_string()
}
