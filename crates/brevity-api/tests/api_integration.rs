//! Full-stack REST API integration tests.
//!
//! Each test builds the axum Router over in-memory storage and a scripted
//! completion model, then sends real HTTP requests via `tower::ServiceExt`.

mod common;

use std::time::Duration;

use axum::http::{Method, StatusCode};
use futures::StreamExt;
use serde_json::{json, Value};

use brevity_core::{PASSWORD_RULE_MESSAGE, UPSTREAM_USER_MESSAGE};
use brevity_inference::mock::MockCompletionBackend;

use common::{authed_request, body_json, body_text, json_request, TestApp, PASSWORD};

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let app = TestApp::new();
    let resp = app.send(json_request(Method::GET, "/health", None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    let body = body_json(resp).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "not_configured");
    assert!(body.get("pool").is_none());
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_login_me_logout_flow() {
    let app = TestApp::new();
    let token = app.register("Ada@Example.com").await;

    let resp = app
        .send(authed_request(Method::GET, "/api/v1/auth/me", &token, None))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["email"], "ada@example.com");

    let resp = app
        .send(json_request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": "ada@example.com", "password": PASSWORD })),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let second = body_json(resp).await["token"].as_str().unwrap().to_string();
    assert_ne!(second, token);

    let resp = app
        .send(authed_request(Method::POST, "/api/v1/auth/logout", &token, None))
        .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .send(authed_request(Method::GET, "/api/v1/auth/me", &token, None))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .send(authed_request(Method::GET, "/api/v1/auth/me", &second, None))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_rejects_weak_password_with_field() {
    let app = TestApp::new();
    let resp = app
        .send(json_request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({ "email": "ada@example.com", "password": "abcdefgh" })),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert_eq!(body["field"], "password");
    assert_eq!(body["error"], PASSWORD_RULE_MESSAGE);
}

#[tokio::test]
async fn register_duplicate_email_is_validation_error() {
    let app = TestApp::new();
    app.register("ada@example.com").await;

    let resp = app
        .send(json_request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({ "email": "ADA@example.com", "password": PASSWORD })),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(resp).await["field"], "email");
}

#[tokio::test]
async fn login_failures_share_one_message() {
    let app = TestApp::new();
    app.register("ada@example.com").await;

    let mut messages = Vec::new();
    for (email, password) in [
        ("ada@example.com", "Wrong1234"),
        ("nobody@example.com", PASSWORD),
    ] {
        let resp = app
            .send(json_request(
                Method::POST,
                "/api/v1/auth/login",
                Some(json!({ "email": email, "password": password })),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        messages.push(body_json(resp).await["error"].clone());
    }
    assert_eq!(messages[0], "Invalid login credentials");
    assert_eq!(messages[0], messages[1]);
}

#[tokio::test]
async fn malformed_json_body_is_unprocessable() {
    let app = TestApp::new();
    let mut request = json_request(Method::POST, "/api/v1/auth/login", None);
    *request.body_mut() = axum::body::Body::from("{not json");
    let resp = app.send(request).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(resp).await["field"], "body");
}

#[tokio::test]
async fn oauth_routes_are_404_when_not_configured() {
    let app = TestApp::new();
    for uri in [
        "/api/v1/auth/oauth/google",
        "/api/v1/auth/oauth/google/callback?code=c&state=s",
    ] {
        let resp = app.send(json_request(Method::GET, uri, None)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["error"], "OAuth provider not configured");
    }
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn note_routes_require_a_session() {
    let app = TestApp::new();
    let id = brevity_core::new_v7();
    let requests = [
        json_request(Method::GET, "/api/v1/notes", None),
        json_request(
            Method::POST,
            "/api/v1/notes",
            Some(json!({ "title": "t", "content": "c" })),
        ),
        json_request(Method::GET, &format!("/api/v1/notes/{id}"), None),
        json_request(
            Method::PATCH,
            &format!("/api/v1/notes/{id}"),
            Some(json!({ "title": "t" })),
        ),
        json_request(Method::DELETE, &format!("/api/v1/notes/{id}"), None),
        authed_request(Method::GET, "/api/v1/notes", "brv_st_bogus", None),
    ];
    for request in requests {
        let resp = app.send(request).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["error"], "Not authenticated");
    }
}

#[tokio::test]
async fn create_then_get_returns_same_note() {
    let app = TestApp::new();
    let token = app.register("ada@example.com").await;

    let resp = app
        .send(authed_request(
            Method::POST,
            "/api/v1/notes",
            &token,
            Some(json!({ "title": "Groceries", "content": "Milk, eggs", "summary": "Food" })),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await;

    let me = body_json(
        app.send(authed_request(Method::GET, "/api/v1/auth/me", &token, None))
            .await,
    )
    .await;
    assert_eq!(created["owner_id"], me["id"]);

    let resp = app
        .send(authed_request(
            Method::GET,
            &format!("/api/v1/notes/{}", created["id"].as_str().unwrap()),
            &token,
            None,
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched = body_json(resp).await;
    assert_eq!(fetched, created);
    assert_eq!(fetched["title"], "Groceries");
    assert_eq!(fetched["content"], "Milk, eggs");
    assert_eq!(fetched["summary"], "Food");
}

#[tokio::test]
async fn create_validation_reports_first_field() {
    let app = TestApp::new();
    let token = app.register("ada@example.com").await;

    let long_title = "x".repeat(256);
    let cases = [
        (json!({ "content": "c" }), "title", "Title is required"),
        (
            json!({ "title": long_title, "content": "c" }),
            "title",
            "Title must be at most 255 characters",
        ),
        (json!({ "title": "t", "content": "" }), "content", "Content is required"),
    ];
    for (body, field, message) in cases {
        let resp = app
            .send(authed_request(Method::POST, "/api/v1/notes", &token, Some(body)))
            .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(resp).await;
        assert_eq!(body["field"], field);
        assert_eq!(body["error"], message);
    }
}

#[tokio::test]
async fn other_owner_sees_not_found_and_cannot_mutate() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com").await;
    let bob = app.register("bob@example.com").await;
    let note = app.create_note(&alice, "Private", "Diary").await;
    let uri = format!("/api/v1/notes/{}", note["id"].as_str().unwrap());

    let resp = app.send(authed_request(Method::GET, &uri, &bob, None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let not_found = body_json(resp).await;

    let resp = app
        .send(authed_request(
            Method::PATCH,
            &uri,
            &bob,
            Some(json!({ "content": "overwritten" })),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app.send(authed_request(Method::DELETE, &uri, &bob, None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // Indistinguishable from an id that never existed
    let missing = format!("/api/v1/notes/{}", brevity_core::new_v7());
    let resp = app.send(authed_request(Method::GET, &missing, &bob, None)).await;
    assert_eq!(body_json(resp).await, not_found);

    let resp = app.send(authed_request(Method::GET, &uri, &alice, None)).await;
    assert_eq!(body_json(resp).await, note);

    let resp = app
        .send(authed_request(Method::GET, "/api/v1/notes", &bob, None))
        .await;
    assert_eq!(body_json(resp).await, json!([]));
}

#[tokio::test]
async fn malformed_id_is_not_found() {
    let app = TestApp::new();
    let token = app.register("ada@example.com").await;
    let resp = app
        .send(authed_request(Method::GET, "/api/v1/notes/not-a-uuid", &token, None))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn summary_only_update_keeps_other_fields_and_advances_timestamp() {
    let app = TestApp::new();
    let token = app.register("ada@example.com").await;
    let note = app.create_note(&token, "Title", "Body").await;
    let uri = format!("/api/v1/notes/{}", note["id"].as_str().unwrap());

    let resp = app
        .send(authed_request(
            Method::PATCH,
            &uri,
            &token,
            Some(json!({ "summary": "x" })),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = body_json(resp).await;
    assert_eq!(updated["title"], "Title");
    assert_eq!(updated["content"], "Body");
    assert_eq!(updated["summary"], "x");
    assert_eq!(updated["created_at_utc"], note["created_at_utc"]);

    let before: chrono::DateTime<chrono::Utc> =
        serde_json::from_value(note["updated_at_utc"].clone()).unwrap();
    let after: chrono::DateTime<chrono::Utc> =
        serde_json::from_value(updated["updated_at_utc"].clone()).unwrap();
    assert!(after > before);

    let resp = app
        .send(authed_request(
            Method::PATCH,
            &uri,
            &token,
            Some(json!({ "summary": null })),
        ))
        .await;
    assert_eq!(body_json(resp).await["summary"], Value::Null);
}

#[tokio::test]
async fn empty_patch_is_rejected() {
    let app = TestApp::new();
    let token = app.register("ada@example.com").await;
    let note = app.create_note(&token, "Title", "Body").await;
    let uri = format!("/api/v1/notes/{}", note["id"].as_str().unwrap());

    let resp = app
        .send(authed_request(Method::PATCH, &uri, &token, Some(json!({}))))
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert_eq!(body["field"], "note");
    assert_eq!(body["error"], "At least one field must be provided");
}

#[tokio::test]
async fn list_orders_by_recent_update_and_filters() {
    let app = TestApp::new();
    let token = app.register("ada@example.com").await;
    let first = app.create_note(&token, "Rust ownership", "Borrowing").await;
    let second = app.create_note(&token, "Groceries", "Milk").await;

    let list = body_json(
        app.send(authed_request(Method::GET, "/api/v1/notes", &token, None))
            .await,
    )
    .await;
    assert_eq!(list[0]["id"], second["id"]);
    assert_eq!(list[1]["id"], first["id"]);

    // Touching the older note moves it to the front
    app.send(authed_request(
        Method::PATCH,
        &format!("/api/v1/notes/{}", first["id"].as_str().unwrap()),
        &token,
        Some(json!({ "content": "Borrowing and lifetimes" })),
    ))
    .await;
    let list = body_json(
        app.send(authed_request(Method::GET, "/api/v1/notes", &token, None))
            .await,
    )
    .await;
    assert_eq!(list[0]["id"], first["id"]);

    let filtered = body_json(
        app.send(authed_request(
            Method::GET,
            "/api/v1/notes?q=LIFETIMES",
            &token,
            None,
        ))
        .await,
    )
    .await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);
    assert_eq!(filtered[0]["id"], first["id"]);
}

#[tokio::test]
async fn second_delete_reports_not_found() {
    let app = TestApp::new();
    let token = app.register("ada@example.com").await;
    let note = app.create_note(&token, "Title", "Body").await;
    let uri = format!("/api/v1/notes/{}", note["id"].as_str().unwrap());

    let resp = app.send(authed_request(Method::DELETE, &uri, &token, None)).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = app.send(authed_request(Method::DELETE, &uri, &token, None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = app.send(authed_request(Method::GET, &uri, &token, None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn summarize_streams_plain_text() {
    let app = TestApp::with_completion(
        MockCompletionBackend::new().with_fragments(["Milk ", "and ", "eggs."]),
    );
    let token = app.register("ada@example.com").await;

    let resp = app
        .send(authed_request(
            Method::POST,
            "/api/v1/summarize",
            &token,
            Some(json!({ "prompt": "Buy milk and eggs" })),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()["content-type"],
        "text/plain; charset=utf-8"
    );
    assert_eq!(body_text(resp).await, "Milk and eggs.");
    assert!(app
        .completion
        .last_prompt()
        .unwrap()
        .ends_with("Buy milk and eggs"));
}

#[tokio::test]
async fn summarize_events_ends_with_done() {
    let app = TestApp::with_completion(MockCompletionBackend::new().with_fragments(["A ", "B"]));
    let token = app.register("ada@example.com").await;

    let resp = app
        .send(authed_request(
            Method::POST,
            "/api/v1/summarize/events",
            &token,
            Some(json!({ "content": "note body" })),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let text = body_text(resp).await;

    let fragment_a = text.find("event: fragment\ndata: A ").unwrap();
    let fragment_b = text.find("event: fragment\ndata: B").unwrap();
    let done = text.find("event: done\ndata: A B").unwrap();
    assert!(fragment_a < fragment_b && fragment_b < done);
    assert!(!text.contains("event: error"));
}

#[tokio::test]
async fn summarize_events_carries_crlf_fragments() {
    let app = TestApp::with_completion(
        MockCompletionBackend::new().with_fragments(["Line one.\r\n", "Line two."]),
    );
    let token = app.register("ada@example.com").await;

    let resp = app
        .send(authed_request(
            Method::POST,
            "/api/v1/summarize/events",
            &token,
            Some(json!({ "content": "note body" })),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let text = body_text(resp).await;

    assert!(!text.contains('\r'));
    assert_eq!(text.matches("event: fragment").count(), 2);
    assert!(text.contains("event: fragment\ndata: Line one.\n"));
    assert!(text.contains("event: done\ndata: Line one.\ndata: Line two."));
    assert!(!text.contains("event: error"));
}

#[tokio::test]
async fn summarize_events_mid_stream_failure_sends_single_error() {
    let app = TestApp::with_completion(
        MockCompletionBackend::new()
            .with_fragments(["one ", "two"])
            .failing_after(1, "connection reset by peer"),
    );
    let token = app.register("ada@example.com").await;

    let resp = app
        .send(authed_request(
            Method::POST,
            "/api/v1/summarize/events",
            &token,
            Some(json!({ "content": "note body" })),
        ))
        .await;
    let text = body_text(resp).await;

    assert_eq!(text.matches("event: fragment").count(), 1);
    assert_eq!(text.matches("event: error").count(), 1);
    assert!(!text.contains("event: done"));
    assert!(!text.contains("connection reset"));
}

#[tokio::test]
async fn summarize_plain_text_aborts_on_mid_stream_failure() {
    let app = TestApp::with_completion(
        MockCompletionBackend::new()
            .with_fragments(["one ", "two"])
            .failing_after(1, "boom"),
    );
    let token = app.register("ada@example.com").await;

    let resp = app
        .send(authed_request(
            Method::POST,
            "/api/v1/summarize",
            &token,
            Some(json!({ "content": "note body" })),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .is_err());
}

#[tokio::test]
async fn summarize_empty_content_never_calls_model() {
    let app = TestApp::new();
    let token = app.register("ada@example.com").await;

    for body in [json!({ "content": "   " }), json!({})] {
        let resp = app
            .send(authed_request(
                Method::POST,
                "/api/v1/summarize",
                &token,
                Some(body),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(resp).await["field"], "content");
    }
    assert_eq!(app.completion.call_count(), 0);
}

#[tokio::test]
async fn summarize_unreachable_model_is_bad_gateway() {
    let app = TestApp::with_completion(
        MockCompletionBackend::new().failing_to_open("401 Unauthorized: bad key sk-123"),
    );
    let token = app.register("ada@example.com").await;

    let resp = app
        .send(authed_request(
            Method::POST,
            "/api/v1/summarize/events",
            &token,
            Some(json!({ "content": "note body" })),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(resp).await["error"], UPSTREAM_USER_MESSAGE);
}

#[tokio::test]
async fn summarize_requires_session() {
    let app = TestApp::new();
    let resp = app
        .send(json_request(
            Method::POST,
            "/api/v1/summarize",
            Some(json!({ "content": "note body" })),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.completion.call_count(), 0);
}

// ---------------------------------------------------------------------------
// Change feed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn change_feed_only_carries_own_events() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com").await;
    let bob = app.register("bob@example.com").await;

    let resp = app
        .send(authed_request(Method::GET, "/api/v1/events", &alice, None))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let mut frames = resp.into_body().into_data_stream();

    let bobs = app.create_note(&bob, "Bob", "not for alice").await;
    let alices = app.create_note(&alice, "Alice", "mine").await;

    let frame = tokio::time::timeout(Duration::from_secs(2), frames.next())
        .await
        .expect("event within timeout")
        .unwrap()
        .unwrap();
    let frame = String::from_utf8_lossy(&frame).to_string();

    assert!(frame.contains("event: note.created"));
    assert!(frame.contains(alices["id"].as_str().unwrap()));
    assert!(!frame.contains(bobs["id"].as_str().unwrap()));
}

#[tokio::test]
async fn change_feed_requires_session() {
    let app = TestApp::new();
    let resp = app
        .send(json_request(Method::GET, "/api/v1/events", None))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
