use crate::types::ChatMessage;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

// ============================================
// Error Types
// ============================================

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream error {status}: {body}")]
    Upstream {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("{0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Stream(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("client disconnected")]
    Disconnected,
}

impl ChatError {
    pub fn stream(message: impl Into<String>) -> Self {
        ChatError::Stream(message.into())
    }
}

pub type ChatResult<T> = Result<T, ChatError>;

// ============================================
// Completion Requests
// ============================================

pub const MODEL: &str = "llama-3.3-70b-versatile";
pub const TEMPERATURE: f64 = 0.9;
pub const MAX_TOKENS: u32 = 2048;

/// Payload for an OpenAI-compatible chat-completions call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub stream: bool,
}

impl CompletionRequest {
    pub fn streaming(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: MODEL.to_string(),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            stream: true,
        }
    }
}

/// Text fragments in the order the upstream produced them.
pub type FragmentStream = BoxStream<'static, ChatResult<String>>;

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Opens a streamed completion. Resolves once the upstream has accepted
    /// the request; fragments then arrive through the returned stream.
    async fn stream(&self, request: &CompletionRequest) -> ChatResult<FragmentStream>;
}

// ============================================
// Response Body Handle
// ============================================

const BODY_BUFFER: usize = 32;

/// Writing end of a streamed response body.
///
/// Dropping the last handle ends the body.
#[derive(Clone)]
pub struct StreamHandle {
    sender: mpsc::Sender<String>,
}

impl StreamHandle {
    pub fn channel() -> (Self, ReceiverStream<String>) {
        let (sender, receiver) = mpsc::channel(BODY_BUFFER);
        (Self { sender }, ReceiverStream::new(receiver))
    }

    pub async fn append(&self, piece: &str) -> ChatResult<()> {
        if piece.is_empty() {
            return Ok(());
        }
        self.sender
            .send(piece.to_string())
            .await
            .map_err(|_| ChatError::Disconnected)
    }

    /// Writes `Error: <message>` after whatever was already sent.
    pub async fn fail(&self, err: &ChatError) {
        let _ = self.sender.send(format!("Error: {err}")).await;
    }
}
