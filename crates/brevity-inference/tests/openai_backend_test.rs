//! HTTP behaviour of the OpenAI-compatible backend against a mock server.

use std::sync::Arc;

use brevity_inference::openai::{OpenAIBackend, OpenAIConfig};
use brevity_inference::{Error, StreamingCompletion, SummaryBridge, SummaryEvent};
use futures::StreamExt;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse_body(fragments: &[&str]) -> String {
    let mut body = String::new();
    for fragment in fragments {
        let chunk = serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "delta": {"content": fragment}, "finish_reason": null}]
        });
        body.push_str(&format!("data: {}\n\n", chunk));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn backend_for(server: &MockServer) -> OpenAIBackend {
    OpenAIBackend::new(OpenAIConfig {
        base_url: server.uri(),
        api_key: Some("test-key".to_string()),
        model: "test-model".to_string(),
        ..Default::default()
    })
    .expect("Failed to create backend")
}

#[tokio::test]
async fn test_streams_fragments_with_auth_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "test-model",
            "stream": true
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body(&["The note ", "lists groceries."]), "text/event-stream"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let backend = backend_for(&mock_server);
    let fragments: Vec<String> = backend
        .complete_stream("Summarize: milk")
        .await
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
        .await;

    assert_eq!(fragments, vec!["The note ", "lists groceries."]);
}

#[tokio::test]
async fn test_rejected_request_is_upstream_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {"message": "Incorrect API key", "type": "invalid_request_error"}
        })))
        .mount(&mock_server)
        .await;

    let result = backend_for(&mock_server).complete_stream("hi").await;
    match result {
        Err(Error::Upstream(msg)) => assert!(msg.contains("Authentication failed")),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected an error"),
    }
}

#[tokio::test]
async fn test_unparseable_error_body_still_upstream() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream overloaded"))
        .mount(&mock_server)
        .await;

    let result = backend_for(&mock_server).complete_stream("hi").await;
    assert!(matches!(result, Err(Error::Upstream(_))));
}

#[tokio::test]
async fn test_bridge_end_to_end_over_http() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "messages": [{
                "role": "user",
                "content": "Summarize the following note content in a concise paragraph:\n\nBuy milk"
            }]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body(&["Buy ", "milk."]), "text/event-stream"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let bridge = SummaryBridge::new(Arc::new(backend_for(&mock_server)));
    let events: Vec<SummaryEvent> = bridge.summarize("Buy milk").await.unwrap().collect().await;

    assert_eq!(events.len(), 3);
    match events.last() {
        Some(SummaryEvent::Done(summary)) => assert_eq!(summary, "Buy milk."),
        other => panic!("unexpected terminal event: {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_content_never_reaches_server() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let bridge = SummaryBridge::new(Arc::new(backend_for(&mock_server)));
    let result = bridge.summarize("   ").await;
    assert!(matches!(result, Err(Error::Validation(_))));
}
