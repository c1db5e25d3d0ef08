//! Integration tests for the relay server
//!
//! Runs the real router on a local port with a scripted completion backend.

mod common;

use common::{RecordingSearch, ScriptedBackend, Step, hit, spawn};
use futures::StreamExt;
use plawai::ai::Relay;
use plawai::search::SearchProvider;
use plawai::server::{AppState, MESSAGE_REQUIRED, router};
use plawai::types::{ChatMessage, ChatTurnRequest, Mood, Role};
use serde_json::json;
use std::sync::Arc;

async fn relay_url(backend: Arc<ScriptedBackend>, search: Option<Arc<dyn SearchProvider>>) -> String {
    let addr = spawn(router(AppState::new(Relay::new(backend, search)))).await;
    format!("http://{addr}/api/chat")
}

fn turn(message: &str, web_access: bool) -> ChatTurnRequest {
    ChatTurnRequest {
        message: Some(message.into()),
        history: Some(vec![
            ChatMessage::user("Hi"),
            ChatMessage::assistant("Hello! How can I help?"),
        ]),
        web_access_enabled: Some(web_access),
        mood: Some(Mood::Casual),
    }
}

mod validation_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_message_is_answered_in_body() {
        let backend = Arc::new(ScriptedBackend::default());
        let url = relay_url(backend.clone(), None).await;
        let http = reqwest::Client::new();

        for body in [json!({}), json!({ "message": "   " }), json!({ "message": null })] {
            let response = http.post(&url).json(&body).send().await.unwrap();
            assert_eq!(response.status(), 200);
            let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
            assert!(content_type.starts_with("text/plain"));
            assert_eq!(response.text().await.unwrap(), MESSAGE_REQUIRED);
        }
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_client_error() {
        let url = relay_url(Arc::new(ScriptedBackend::default()), None).await;
        let response = reqwest::Client::new()
            .post(&url)
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_any_origin_is_allowed() {
        let backend = Arc::new(ScriptedBackend::new(vec![vec![Step::Text("ok")]]));
        let url = relay_url(backend, None).await;
        let response = reqwest::Client::new()
            .post(&url)
            .header("origin", "http://localhost:3000")
            .json(&turn("ping", false))
            .send()
            .await
            .unwrap();
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert_eq!(response.text().await.unwrap(), "ok");
    }
}

mod streaming_tests {
    use super::*;

    #[tokio::test]
    async fn test_fragments_arrive_in_order() {
        let backend = Arc::new(ScriptedBackend::new(vec![vec![
            Step::Text("Hel"),
            Step::Text("lo, "),
            Step::Text("world!"),
        ]]));
        let url = relay_url(backend.clone(), None).await;

        let response = reqwest::Client::new()
            .post(&url)
            .json(&turn("Say hello", false))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let mut body = Vec::new();
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            body.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(String::from_utf8(body).unwrap(), "Hello, world!");

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        let messages = &requests[0].messages;
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("Web access is currently disabled"));
        assert!(messages[0].content.contains("more casual"));
        assert_eq!(messages[1], ChatMessage::user("Hi"));
        assert_eq!(messages[3], ChatMessage::user("Say hello"));
        assert!(requests[0].stream);
    }

    #[tokio::test]
    async fn test_partial_answer_then_upstream_error() {
        let backend = Arc::new(ScriptedBackend::new(vec![vec![
            Step::Text("Partial answer"),
            Step::Fail("upstream dropped the connection"),
        ]]));
        let url = relay_url(backend, None).await;

        let response = reqwest::Client::new()
            .post(&url)
            .json(&turn("Explain lifetimes", false))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.text().await.unwrap(),
            "Partial answerError: upstream dropped the connection"
        );
    }

    #[tokio::test]
    async fn test_search_request_is_answered_from_results() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            vec![
                Step::Text("Let me look that up. 🔍 SEA"),
                Step::Text("RCH: \"rust 2024 edition\""),
            ],
            vec![Step::Text("It shipped with Rust 1.85.")],
        ]));
        let search = Arc::new(RecordingSearch::new(vec![
            hit(
                "Announcing Rust 1.85.0",
                "Rust 1.85 stabilizes the 2024 edition.",
                "https://blog.rust-lang.org/2025/02/20/Rust-1.85.0.html",
            ),
            hit("Sponsored", "Buy now", "https://example.com/ads/rust"),
        ]));
        let url = relay_url(
            backend.clone(),
            Some(search.clone() as Arc<dyn SearchProvider>),
        )
        .await;

        let body = reqwest::Client::new()
            .post(&url)
            .json(&turn("When did the 2024 edition ship?", true))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();

        assert_eq!(body, "Let me look that up. It shipped with Rust 1.85.");
        assert_eq!(search.queries(), vec!["rust 2024 edition".to_string()]);

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].messages[0].content.contains("🔍 SEARCH:"));
        let results = requests[1].messages.last().unwrap();
        assert_eq!(results.role, Role::User);
        assert!(results.content.contains("Rust-1.85.0.html"));
        assert!(!results.content.contains("/ads/"));
    }
}
