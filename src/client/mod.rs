//! Chat client for PlawAI
//!
//! Holds the chat threads, talks to the relay, and folds the streamed reply
//! into the selected chat as it arrives.
//!
//! # Architecture
//!
//! - `transport` - `ChatTransport` seam, the reqwest transport and UTF-8 decoding
//! - `storage` - Chat and preference persistence
//! - `export` - Plain text and markdown exports
mod export;
mod storage;
mod transport;

pub use export::{ExportFormat, ExportedChat, export_chat};
pub use storage::{
    CHATS_FILE, ChatRepository, JsonFileRepository, MemoryRepository, PREFERENCES_FILE,
    Preferences, PreferencesStore, StorageError, storage_dir,
};
pub use transport::{ByteStream, ChatTransport, HttpTransport, Utf8Decoder};

use crate::ai::{ChatError, ChatResult};
use crate::types::{Chat, ChatMessage, ChatTurnRequest, Mood, Role};
use futures::StreamExt;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::warn;

pub const ERROR_REPLY: &str = "Sorry, there was an error processing your request.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input, no selected chat, or a send already in flight.
    Ignored,
    Completed,
    Failed,
}

/// Points at the assistant message a streamed reply is written into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplyHandle {
    chat_id: String,
    index: usize,
}

pub struct ChatClient {
    transport: Arc<dyn ChatTransport>,
    repository: Box<dyn ChatRepository>,
    chats: Vec<Chat>,
    current_chat_id: Option<String>,
    web_access_enabled: bool,
    loading: bool,
}

impl ChatClient {
    pub fn new(
        transport: impl ChatTransport + 'static,
        repository: impl ChatRepository + 'static,
    ) -> Self {
        let chats = repository.load().unwrap_or_else(|err| {
            warn!(error = %err, "could not load saved chats");
            Vec::new()
        });
        let current_chat_id = chats.first().map(|chat| chat.id.clone());

        Self {
            transport: Arc::new(transport),
            repository: Box::new(repository),
            chats,
            current_chat_id,
            web_access_enabled: false,
            loading: false,
        }
    }

    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    pub fn chat(&self, id: &str) -> Option<&Chat> {
        self.chats.iter().find(|chat| chat.id == id)
    }

    pub fn current_chat_id(&self) -> Option<&str> {
        self.current_chat_id.as_deref()
    }

    pub fn current_chat(&self) -> Option<&Chat> {
        self.chat(self.current_chat_id.as_deref()?)
    }

    pub fn web_access_enabled(&self) -> bool {
        self.web_access_enabled
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Adds a chat and selects it. A blank title becomes `New Chat <n>`.
    pub fn create_chat(&mut self, title: Option<&str>, mood: Mood) -> &Chat {
        let title = title
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("New Chat {}", self.chats.len() + 1));
        let id = self.next_chat_id();

        self.chats.push(Chat {
            id: id.clone(),
            title,
            mood,
            messages: Vec::new(),
        });
        self.current_chat_id = Some(id);
        self.persist();

        &self.chats[self.chats.len() - 1]
    }

    pub fn delete_chat(&mut self, id: &str) -> bool {
        let before = self.chats.len();
        self.chats.retain(|chat| chat.id != id);
        if self.chats.len() == before {
            return false;
        }

        if self.current_chat_id.as_deref() == Some(id) {
            self.current_chat_id = self.chats.first().map(|chat| chat.id.clone());
        }
        self.persist();
        true
    }

    pub fn rename_chat(&mut self, id: &str, title: &str) -> bool {
        let Some(chat) = self.chat_mut(id) else {
            return false;
        };
        chat.title = title.to_string();
        self.persist();
        true
    }

    pub fn select_chat(&mut self, id: &str) -> bool {
        if self.chat(id).is_none() {
            return false;
        }
        self.current_chat_id = Some(id.to_string());
        true
    }

    pub fn clear_chat(&mut self) {
        if let Some(chat) = self.current_chat_mut() {
            chat.messages.clear();
            self.persist();
        }
    }

    /// Flips web access and posts a notice into the selected chat.
    pub fn toggle_web_access(&mut self) -> bool {
        self.web_access_enabled = !self.web_access_enabled;
        let status = if self.web_access_enabled {
            "enabled"
        } else {
            "disabled"
        };

        if let Some(chat) = self.current_chat_mut() {
            chat.messages
                .push(ChatMessage::assistant(format!("Web access {status}.")));
            self.persist();
        }
        self.web_access_enabled
    }

    pub fn search_within_chat(&self, query: &str) -> Vec<&ChatMessage> {
        let needle = query.to_lowercase();
        self.current_chat()
            .map(|chat| {
                chat.messages
                    .iter()
                    .filter(|message| message.content.to_lowercase().contains(&needle))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn start_assistant_reply(&mut self, chat_id: &str) -> ChatResult<ReplyHandle> {
        let handle = self.begin_reply(chat_id)?;
        self.persist();
        Ok(handle)
    }

    pub fn append_to_reply(&mut self, handle: &ReplyHandle, fragment: &str) -> ChatResult<()> {
        let message = self
            .chat_mut(&handle.chat_id)
            .and_then(|chat| chat.messages.get_mut(handle.index))
            .filter(|message| message.role == Role::Assistant)
            .ok_or_else(|| ChatError::NotFound(format!("reply in chat {}", handle.chat_id)))?;
        message.content.push_str(fragment);
        self.persist();
        Ok(())
    }

    /// Sends `text` from the selected chat and streams the reply into it.
    pub async fn send_message(&mut self, text: &str) -> SendOutcome {
        self.send_message_with(text, |_| {}).await
    }

    /// Like [`send_message`](Self::send_message), calling `on_update` with
    /// the reply each time a fragment lands in it.
    pub async fn send_message_with(
        &mut self,
        text: &str,
        mut on_update: impl FnMut(&ChatMessage),
    ) -> SendOutcome {
        if text.trim().is_empty() || self.loading {
            return SendOutcome::Ignored;
        }
        let Some(chat) = self.current_chat_mut() else {
            return SendOutcome::Ignored;
        };

        let chat_id = chat.id.clone();
        let history = chat.messages.clone();
        let mood = chat.mood;
        chat.messages.push(ChatMessage::user(text));
        self.persist();

        self.loading = true;
        let turn = ChatTurnRequest {
            message: Some(text.to_string()),
            history: Some(history),
            web_access_enabled: Some(self.web_access_enabled),
            mood: Some(mood),
        };

        let outcome = match self.receive_reply(&chat_id, &turn, &mut on_update).await {
            Ok(()) => SendOutcome::Completed,
            Err(err) => {
                warn!(error = %err, "chat request failed");
                if let Some(chat) = self.chat_mut(&chat_id) {
                    chat.messages.push(ChatMessage::assistant(ERROR_REPLY));
                    self.persist();
                }
                SendOutcome::Failed
            }
        };
        self.loading = false;
        outcome
    }

    async fn receive_reply(
        &mut self,
        chat_id: &str,
        turn: &ChatTurnRequest,
        on_update: &mut impl FnMut(&ChatMessage),
    ) -> ChatResult<()> {
        let mut body = self.transport.send(turn).await?;
        let mut decoder = Utf8Decoder::default();
        let mut reply = None;

        while let Some(chunk) = body.next().await {
            let fragment = decoder.decode(&chunk?);
            self.apply_fragment(chat_id, &mut reply, &fragment, on_update)?;
        }
        let rest = decoder.finish();
        self.apply_fragment(chat_id, &mut reply, &rest, on_update)
    }

    fn apply_fragment(
        &mut self,
        chat_id: &str,
        reply: &mut Option<ReplyHandle>,
        fragment: &str,
        on_update: &mut impl FnMut(&ChatMessage),
    ) -> ChatResult<()> {
        if fragment.is_empty() {
            return Ok(());
        }
        if reply.is_none() {
            *reply = Some(self.begin_reply(chat_id)?);
        }
        let Some(handle) = reply.as_ref() else {
            return Ok(());
        };

        self.append_to_reply(handle, fragment)?;
        if let Some(message) = self
            .chat(&handle.chat_id)
            .and_then(|chat| chat.messages.get(handle.index))
        {
            on_update(message);
        }
        Ok(())
    }

    fn begin_reply(&mut self, chat_id: &str) -> ChatResult<ReplyHandle> {
        let chat = self
            .chat_mut(chat_id)
            .ok_or_else(|| ChatError::NotFound(format!("chat {chat_id}")))?;
        chat.messages.push(ChatMessage::assistant(String::new()));
        Ok(ReplyHandle {
            chat_id: chat_id.to_string(),
            index: chat.messages.len() - 1,
        })
    }

    fn chat_mut(&mut self, id: &str) -> Option<&mut Chat> {
        self.chats.iter_mut().find(|chat| chat.id == id)
    }

    fn current_chat_mut(&mut self) -> Option<&mut Chat> {
        let id = self.current_chat_id.clone()?;
        self.chat_mut(&id)
    }

    // Millisecond timestamps, bumped past any id already taken.
    fn next_chat_id(&self) -> String {
        let mut millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        while self.chats.iter().any(|chat| chat.id == millis.to_string()) {
            millis += 1;
        }
        millis.to_string()
    }

    fn persist(&self) {
        if let Err(err) = self.repository.save(&self.chats) {
            warn!(error = %err, "failed to save chats");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream;

    struct Unreachable;

    #[async_trait]
    impl ChatTransport for Unreachable {
        async fn send(&self, _turn: &ChatTurnRequest) -> ChatResult<ByteStream> {
            Err(ChatError::stream("connection refused"))
        }
    }

    struct Echo;

    #[async_trait]
    impl ChatTransport for Echo {
        async fn send(&self, turn: &ChatTurnRequest) -> ChatResult<ByteStream> {
            let text = format!("echo: {}", turn.message.clone().unwrap_or_default());
            Ok(stream::iter(vec![Ok(text.into_bytes())]).boxed())
        }
    }

    fn client_with<T: ChatTransport + 'static>(transport: T) -> (ChatClient, MemoryRepository) {
        let repo = MemoryRepository::default();
        (ChatClient::new(transport, repo.clone()), repo)
    }

    #[test]
    fn create_selects_and_names_chats() {
        let (mut client, repo) = client_with(Echo);
        let first = client.create_chat(None, Mood::Casual).id.clone();
        assert_eq!(client.chat(&first).unwrap().title, "New Chat 1");

        let second = client.create_chat(Some("  Plans "), Mood::Creative).id.clone();
        assert_ne!(first, second);
        assert_eq!(client.current_chat_id(), Some(second.as_str()));
        assert_eq!(client.current_chat().unwrap().title, "Plans");
        assert_eq!(repo.snapshot().len(), 2);
    }

    #[test]
    fn deleting_selected_chat_selects_first_remaining() {
        let (mut client, repo) = client_with(Echo);
        let first = client.create_chat(Some("one"), Mood::Casual).id.clone();
        let second = client.create_chat(Some("two"), Mood::Casual).id.clone();

        assert!(client.delete_chat(&second));
        assert_eq!(client.current_chat_id(), Some(first.as_str()));
        assert!(client.delete_chat(&first));
        assert_eq!(client.current_chat_id(), None);
        assert!(!client.delete_chat("missing"));
        assert!(repo.snapshot().is_empty());
    }

    #[test]
    fn loads_saved_chats_and_selects_first() {
        let repo = MemoryRepository::with_chats(vec![
            Chat {
                id: "a".into(),
                title: "A".into(),
                mood: Mood::Casual,
                messages: Vec::new(),
            },
            Chat {
                id: "b".into(),
                title: "B".into(),
                mood: Mood::Casual,
                messages: Vec::new(),
            },
        ]);
        let mut client = ChatClient::new(Echo, repo);
        assert_eq!(client.current_chat_id(), Some("a"));
        assert!(client.select_chat("b"));
        assert!(!client.select_chat("c"));
        assert_eq!(client.current_chat_id(), Some("b"));
        assert!(client.rename_chat("b", "Renamed"));
        assert_eq!(client.chat("b").unwrap().title, "Renamed");
    }

    #[test]
    fn toggling_web_access_posts_notice() {
        let (mut client, _) = client_with(Echo);
        assert!(client.toggle_web_access());
        client.create_chat(None, Mood::Casual);
        assert!(!client.toggle_web_access());
        assert!(client.toggle_web_access());

        let messages = &client.current_chat().unwrap().messages;
        assert_eq!(
            messages,
            &vec![
                ChatMessage::assistant("Web access disabled."),
                ChatMessage::assistant("Web access enabled."),
            ]
        );
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_clear_empties() {
        let (mut client, _) = client_with(Echo);
        client.create_chat(None, Mood::Casual);
        assert_eq!(client.send_message("Tell me about Rust").await, SendOutcome::Completed);

        let hits = client.search_within_chat("RUST");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].role, Role::User);
        assert!(client.search_within_chat("python").is_empty());

        client.clear_chat();
        assert!(client.current_chat().unwrap().messages.is_empty());
    }

    #[tokio::test]
    async fn updates_follow_each_fragment() {
        struct Chunked;

        #[async_trait]
        impl ChatTransport for Chunked {
            async fn send(&self, _turn: &ChatTurnRequest) -> ChatResult<ByteStream> {
                let chunks = ["Hel", "lo, ", "world!"]
                    .map(|piece| Ok::<_, ChatError>(piece.as_bytes().to_vec()));
                Ok(stream::iter(chunks).boxed())
            }
        }

        let (mut client, _) = client_with(Chunked);
        client.create_chat(None, Mood::Casual);

        let mut seen = Vec::new();
        let outcome = client
            .send_message_with("hi", |reply| seen.push(reply.clone()))
            .await;

        assert_eq!(outcome, SendOutcome::Completed);
        assert_eq!(
            seen,
            vec![
                ChatMessage::assistant("Hel"),
                ChatMessage::assistant("Hello, "),
                ChatMessage::assistant("Hello, world!"),
            ]
        );
    }

    #[tokio::test]
    async fn nothing_selected_is_ignored() {
        let (mut client, _) = client_with(Echo);
        assert_eq!(client.send_message("hi").await, SendOutcome::Ignored);
    }

    #[tokio::test]
    async fn connection_failure_appends_error_reply() {
        let (mut client, repo) = client_with(Unreachable);
        client.create_chat(None, Mood::Casual);

        assert_eq!(client.send_message("hi").await, SendOutcome::Failed);
        assert!(!client.is_loading());
        assert_eq!(
            repo.snapshot()[0].messages,
            vec![ChatMessage::user("hi"), ChatMessage::assistant(ERROR_REPLY)]
        );
    }

    #[test]
    fn stale_reply_handle_is_rejected() {
        let (mut client, _) = client_with(Echo);
        let id = client.create_chat(None, Mood::Casual).id.clone();
        let handle = client.start_assistant_reply(&id).unwrap();
        client.append_to_reply(&handle, "partial").unwrap();
        assert_eq!(client.chat(&id).unwrap().messages[0].content, "partial");

        client.clear_chat();
        assert!(matches!(
            client.append_to_reply(&handle, "more"),
            Err(ChatError::NotFound(_))
        ));
        assert!(client.start_assistant_reply("missing").is_err());
    }
}
