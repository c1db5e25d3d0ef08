use super::prompt::{assemble_messages, system_prompt};
use super::sentinel::{SEARCH_MARKER, SentinelScanner};
use super::{
    ChatError, ChatResult, CompletionBackend, CompletionRequest, FragmentStream, StreamHandle,
};
use crate::search::{SearchProvider, process_search_results};
use crate::types::{ChatMessage, Mood, SearchSummary};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, error, info};

/// A validated chat turn.
#[derive(Clone, Debug, PartialEq)]
pub struct Turn {
    pub message: String,
    pub history: Vec<ChatMessage>,
    pub web_access: bool,
    pub mood: Option<Mood>,
}

/// Streams completions for chat turns into response bodies.
#[derive(Clone)]
pub struct Relay {
    backend: Arc<dyn CompletionBackend>,
    search: Option<Arc<dyn SearchProvider>>,
}

impl Relay {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        search: Option<Arc<dyn SearchProvider>>,
    ) -> Self {
        Self { backend, search }
    }

    /// Runs one turn to completion. Failures are written into the body as
    /// `Error: <message>` after whatever has already been sent.
    pub async fn run(&self, turn: Turn, handle: StreamHandle) {
        info!(
            mood = ?turn.mood,
            web_access = turn.web_access,
            history = turn.history.len(),
            "relaying chat turn"
        );

        match self.relay(turn, &handle).await {
            Ok(()) => {}
            Err(ChatError::Disconnected) => debug!("client went away mid-stream"),
            Err(err) => {
                error!(error = %err, "chat relay failed");
                handle.fail(&err).await;
            }
        }
    }

    async fn relay(&self, turn: Turn, handle: &StreamHandle) -> ChatResult<()> {
        let web_access = turn.web_access;
        let system = system_prompt(web_access, turn.mood);
        let request = CompletionRequest::streaming(assemble_messages(
            system,
            turn.history,
            &turn.message,
        ));
        let fragments = self.backend.stream(&request).await?;

        match self.search.as_ref().filter(|_| web_access) {
            Some(search) => {
                self.forward_with_search(request, fragments, search.as_ref(), handle)
                    .await
            }
            None => forward(fragments, handle).await,
        }
    }

    async fn forward_with_search(
        &self,
        request: CompletionRequest,
        mut fragments: FragmentStream,
        search: &dyn SearchProvider,
        handle: &StreamHandle,
    ) -> ChatResult<()> {
        let mut scanner = SentinelScanner::default();
        let mut produced = String::new();
        let mut query = None;

        while let Some(next) = fragments.next().await {
            let fragment = match next {
                Ok(fragment) => fragment,
                Err(err) => {
                    handle.append(&scanner.finish()).await?;
                    return Err(err);
                }
            };
            let scan = scanner.push(&fragment);
            handle.append(&scan.forward).await?;
            produced.push_str(&scan.forward);
            if let Some(found) = scan.query {
                produced.push_str(&format!("{SEARCH_MARKER} \"{found}\""));
                query = Some(found);
                break;
            }
        }
        drop(fragments);

        let Some(query) = query else {
            return handle.append(&scanner.finish()).await;
        };

        info!(query = %query, "model requested a web search");
        let summary = process_search_results(search, &query, true).await;

        let mut messages = request.messages;
        messages.push(ChatMessage::assistant(produced));
        messages.push(ChatMessage::user(search_results_message(
            &query,
            summary.as_ref(),
        )));

        let fragments = self
            .backend
            .stream(&CompletionRequest::streaming(messages))
            .await?;
        forward(fragments, handle).await
    }
}

async fn forward(mut fragments: FragmentStream, handle: &StreamHandle) -> ChatResult<()> {
    while let Some(fragment) = fragments.next().await {
        handle.append(&fragment?).await?;
    }
    Ok(())
}

/// Follow-up prompt carrying search results back to the model.
pub fn search_results_message(query: &str, summary: Option<&SearchSummary>) -> String {
    let Some(summary) = summary else {
        return format!(
            "The web search for \"{query}\" returned no results. Answer from your existing knowledge and do not search again."
        );
    };

    let sources = summary
        .sources
        .iter()
        .map(|source| format!("- {}: {}", source.title, source.url))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Search results for \"{query}\":\n\n{}\n\nSources:\n{sources}\n\nIntegrate these results into your answer and cite the sources by URL. Do not search again.",
        summary.summary
    )
}
