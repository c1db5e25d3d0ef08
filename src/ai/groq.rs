use super::{ChatError, ChatResult, CompletionBackend, CompletionRequest, FragmentStream};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use std::collections::VecDeque;

pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";

/// Groq's OpenAI-compatible chat-completions API.
pub struct GroqBackend {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl GroqBackend {
    pub fn new(api_base: &str, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            api_key: api_key.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Deserialize)]
struct GroqMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct GroqDelta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct GroqChoice {
    #[serde(default)]
    delta: Option<GroqDelta>,
    #[serde(default)]
    message: Option<GroqMessage>,
}

#[derive(Deserialize)]
struct GroqChunk {
    choices: Vec<GroqChoice>,
}

#[derive(Deserialize)]
struct ContentOnly {
    content: String,
}

#[derive(Deserialize)]
struct GroqErrorEvent {
    error: GroqErrorBody,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GroqErrorBody {
    Detailed { message: String },
    Plain(String),
}

/// One decoded server-sent event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SseEvent {
    /// Text to forward. Empty for role-only or keep-alive chunks.
    Piece(String),
    Done,
    /// The upstream reported an error mid-stream.
    Failed(String),
}

/// Parses the payload of one SSE event.
pub fn parse_sse_data(data: &str) -> Option<SseEvent> {
    let trimmed = data.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed == "[DONE]" {
        return Some(SseEvent::Done);
    }

    if let Ok(parsed) = serde_json::from_str::<GroqErrorEvent>(trimmed) {
        let message = match parsed.error {
            GroqErrorBody::Detailed { message } | GroqErrorBody::Plain(message) => message,
        };
        return Some(SseEvent::Failed(message));
    }

    if let Ok(parsed) = serde_json::from_str::<GroqChunk>(trimmed) {
        if let Some(first) = parsed.choices.into_iter().next() {
            if let Some(piece) = first.delta.and_then(|delta| delta.content) {
                return Some(SseEvent::Piece(piece));
            }
            if let Some(piece) = first.message.and_then(|msg| msg.content) {
                return Some(SseEvent::Piece(piece));
            }
        }
        return Some(SseEvent::Piece(String::new()));
    }

    if let Ok(parsed) = serde_json::from_str::<ContentOnly>(trimmed) {
        return Some(SseEvent::Piece(parsed.content));
    }

    None
}

/// Incremental `text/event-stream` decoder.
///
/// Lines are split on raw bytes so a UTF-8 sequence cut across network
/// chunks is only decoded once its line is complete.
#[derive(Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Option<String>,
}

impl SseDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..pos]);
            self.feed_line(line.trim_end_matches('\r'), &mut events);
        }
        events
    }

    /// Flushes an event the upstream left unterminated.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let raw = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&raw);
            self.feed_line(line.trim_end_matches('\r'), &mut events);
        }
        self.feed_line("", &mut events);
        events
    }

    fn feed_line(&mut self, line: &str, events: &mut Vec<SseEvent>) {
        if line.is_empty() {
            if let Some(data) = self.data.take()
                && let Some(event) = parse_sse_data(&data)
            {
                events.push(event);
            }
            return;
        }

        if let Some(rest) = line.strip_prefix("data:") {
            let fragment = rest.strip_prefix(' ').unwrap_or(rest);
            match &mut self.data {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(fragment);
                }
                None => self.data = Some(fragment.to_string()),
            }
        }
    }
}

struct SseState {
    bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseDecoder,
    pending: VecDeque<ChatResult<String>>,
    finished: bool,
}

impl SseState {
    fn absorb(&mut self, events: Vec<SseEvent>) {
        for event in events {
            if self.finished {
                break;
            }
            match event {
                SseEvent::Piece(piece) if piece.is_empty() => {}
                SseEvent::Piece(piece) => self.pending.push_back(Ok(piece)),
                SseEvent::Done => self.finished = true,
                SseEvent::Failed(message) => {
                    self.pending.push_back(Err(ChatError::Stream(message)));
                    self.finished = true;
                }
            }
        }
    }
}

fn sse_fragments(response: reqwest::Response) -> FragmentStream {
    let state = SseState {
        bytes: response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .boxed(),
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(next) = state.pending.pop_front() {
                return Some((next, state));
            }
            if state.finished {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(&chunk);
                    state.absorb(events);
                }
                Some(Err(err)) => {
                    state.finished = true;
                    return Some((Err(ChatError::from(err)), state));
                }
                None => {
                    let events = state.decoder.finish();
                    state.absorb(events);
                    state.finished = true;
                }
            }
        }
    })
    .boxed()
}

#[async_trait]
impl CompletionBackend for GroqBackend {
    async fn stream(&self, request: &CompletionRequest) -> ChatResult<FragmentStream> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("accept", "text/event-stream")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Upstream { status, body });
        }

        Ok(sse_fragments(response))
    }
}
