/// AI module for PlawAI
///
/// Everything between an accepted chat turn and the bytes written back to the
/// caller: prompt assembly, the streamed completion call, and the optional
/// search round trip the model can request.
///
/// # Architecture
///
/// - `client` - Error types, the `CompletionBackend` seam and the response body handle
/// - `groq` - Groq chat-completions backend with SSE decoding
/// - `prompt` - System prompt and message assembly
/// - `relay` - Drives one turn from request to streamed body
/// - `sentinel` - Spots search requests in model output
///
/// # Usage
///
/// ```rust,no_run
/// use plawai::ai::{GroqBackend, Relay, StreamHandle, Turn};
/// use std::sync::Arc;
///
/// # async fn example() {
/// let relay = Relay::new(Arc::new(GroqBackend::new(plawai::ai::groq::DEFAULT_API_BASE, "key")), None);
/// let (handle, _body) = StreamHandle::channel();
/// let turn = Turn {
///     message: "Hello!".into(),
///     history: Vec::new(),
///     web_access: false,
///     mood: None,
/// };
/// relay.run(turn, handle).await;
/// # }
/// ```
mod client;
pub mod groq;
pub mod prompt;
pub mod relay;
pub mod sentinel;

// Re-export main types
pub use client::{
    ChatError, ChatResult, CompletionBackend, CompletionRequest, FragmentStream, MAX_TOKENS,
    MODEL, StreamHandle, TEMPERATURE,
};
pub use groq::GroqBackend;
pub use relay::{Relay, Turn};
