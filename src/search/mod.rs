//! Web search helper.
//!
//! Fetches results from a search provider, drops unusable or sponsored
//! entries and condenses the top hits into a summary with citations.
//! Failures never propagate: callers only ever see "no result".
mod brave;

pub use brave::{BraveSearch, DEFAULT_ENDPOINT};

use crate::ai::ChatResult;
use crate::types::{RawSearchResult, SearchResult, SearchSource, SearchSummary};
use async_trait::async_trait;
use tracing::warn;

/// URL segment that marks sponsored results.
pub const AD_MARKER: &str = "/ads/";

/// Number of results that feed a summary.
pub const SUMMARY_LIMIT: usize = 3;

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Raw results for `query`, or `None` when the response carried no
    /// result list at all.
    async fn fetch(&self, query: &str) -> ChatResult<Option<Vec<RawSearchResult>>>;
}

fn present(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.is_empty())
}

pub fn filter_results(raw: Vec<RawSearchResult>) -> Vec<SearchResult> {
    raw.into_iter()
        .filter_map(|result| {
            let title = present(result.title)?;
            let description = present(result.description)?;
            let url = present(result.url)?;
            if url.contains(AD_MARKER) {
                return None;
            }
            Some(SearchResult {
                title,
                description,
                url,
            })
        })
        .collect()
}

pub async fn perform_search(
    provider: &dyn SearchProvider,
    query: &str,
    web_access: bool,
) -> Option<Vec<SearchResult>> {
    if !web_access || query.trim().is_empty() {
        return None;
    }

    match provider.fetch(query).await {
        Ok(Some(raw)) => Some(filter_results(raw)),
        Ok(None) => None,
        Err(err) => {
            warn!(error = %err, query, "search failed");
            None
        }
    }
}

pub fn summarize(results: &[SearchResult]) -> Option<SearchSummary> {
    if results.is_empty() {
        return None;
    }

    let top = &results[..results.len().min(SUMMARY_LIMIT)];
    Some(SearchSummary {
        summary: top
            .iter()
            .map(|r| r.description.as_str())
            .collect::<Vec<_>>()
            .join("\n\n"),
        sources: top
            .iter()
            .map(|r| SearchSource {
                title: r.title.clone(),
                url: r.url.clone(),
            })
            .collect(),
    })
}

pub async fn process_search_results(
    provider: &dyn SearchProvider,
    query: &str,
    web_access: bool,
) -> Option<SearchSummary> {
    let results = perform_search(provider, query, web_access).await?;
    summarize(&results)
}
