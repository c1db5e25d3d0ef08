use super::SearchProvider;
use crate::ai::{ChatError, ChatResult};
use crate::types::RawSearchResult;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;

pub const DEFAULT_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";

/// Brave web search API.
pub struct BraveSearch {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl BraveSearch {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Option<Vec<RawSearchResult>>,
}

#[async_trait]
impl SearchProvider for BraveSearch {
    async fn fetch(&self, query: &str) -> ChatResult<Option<Vec<RawSearchResult>>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .header(ACCEPT, "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Upstream { status, body });
        }

        let body = response.text().await?;
        let parsed: BraveResponse = serde_json::from_str(&body)?;
        Ok(parsed.web.and_then(|web| web.results))
    }
}
