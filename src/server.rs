//! HTTP surface of the relay: `POST /api/chat`.
use crate::ai::{CompletionBackend, GroqBackend, Relay, StreamHandle, Turn};
use crate::config::RelayConfig;
use crate::search::{BraveSearch, SearchProvider};
use crate::types::ChatTurnRequest;
use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub const MESSAGE_REQUIRED: &str = "Error: Message is required";

const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

#[derive(Clone)]
pub struct AppState {
    relay: Relay,
}

impl AppState {
    pub fn new(relay: Relay) -> Self {
        Self { relay }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        let backend: Arc<dyn CompletionBackend> = Arc::new(GroqBackend::new(
            &config.groq_api_base,
            config.groq_api_key.clone(),
        ));
        let search: Arc<dyn SearchProvider> = Arc::new(BraveSearch::new(
            config.search_endpoint.clone(),
            config.brave_api_key.clone(),
        ));
        Self::new(Relay::new(backend, Some(search)))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves until Ctrl-C.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Server running on http://{addr}");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
}

/// A turn with a non-blank message; anything else is answered in the body.
pub fn validate(request: ChatTurnRequest) -> Option<Turn> {
    let message = request.message.filter(|m| !m.trim().is_empty())?;
    Some(Turn {
        message,
        history: request.history.unwrap_or_default(),
        web_access: request.web_access_enabled.unwrap_or(false),
        mood: request.mood,
    })
}

async fn chat(State(state): State<AppState>, Json(request): Json<ChatTurnRequest>) -> Response {
    let Some(turn) = validate(request) else {
        return plain_text(Body::from(MESSAGE_REQUIRED));
    };

    let (handle, body) = StreamHandle::channel();
    let relay = state.relay.clone();
    tokio::spawn(async move { relay.run(turn, handle).await });

    plain_text(Body::from_stream(body.map(Ok::<_, Infallible>)))
}

fn plain_text(body: Body) -> Response {
    ([(header::CONTENT_TYPE, PLAIN_TEXT)], body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatMessage, Mood};

    #[test]
    fn blank_messages_are_rejected() {
        assert!(validate(ChatTurnRequest::default()).is_none());
        assert!(
            validate(ChatTurnRequest {
                message: Some(" \n\t".into()),
                ..Default::default()
            })
            .is_none()
        );
    }

    #[test]
    fn optional_fields_fall_back() {
        let turn = validate(ChatTurnRequest {
            message: Some(" hi ".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(turn.message, " hi ");
        assert!(turn.history.is_empty());
        assert!(!turn.web_access);
        assert_eq!(turn.mood, None);

        let turn = validate(ChatTurnRequest {
            message: Some("hi".into()),
            history: Some(vec![ChatMessage::assistant("earlier")]),
            web_access_enabled: Some(true),
            mood: Some(Mood::Creative),
        })
        .unwrap();
        assert_eq!(turn.history.len(), 1);
        assert!(turn.web_access);
        assert_eq!(turn.mood, Some(Mood::Creative));
    }
}
