//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use futures::{StreamExt, stream};
use plawai::ai::{ChatError, ChatResult, CompletionBackend, CompletionRequest, FragmentStream};
use plawai::search::SearchProvider;
use plawai::types::RawSearchResult;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Mutex;
use tokio::net::TcpListener;

/// Serves `app` on an ephemeral local port.
pub async fn spawn(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[derive(Clone, Debug)]
pub enum Step {
    Text(&'static str),
    Fail(&'static str),
}

/// Completion backend that plays back one script per call.
#[derive(Default)]
pub struct ScriptedBackend {
    scripts: Mutex<VecDeque<Vec<Step>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    pub fn new(scripts: Vec<Vec<Step>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::default(),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn stream(&self, request: &CompletionRequest) -> ChatResult<FragmentStream> {
        self.requests.lock().unwrap().push(request.clone());
        let steps = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ChatError::stream("no script left"))?;
        let items: Vec<ChatResult<String>> = steps
            .into_iter()
            .map(|step| match step {
                Step::Text(text) => Ok(text.to_string()),
                Step::Fail(message) => Err(ChatError::stream(message)),
            })
            .collect();
        Ok(stream::iter(items).boxed())
    }
}

/// Search provider with canned results that remembers every query.
#[derive(Default)]
pub struct RecordingSearch {
    results: Vec<RawSearchResult>,
    queries: Mutex<Vec<String>>,
}

impl RecordingSearch {
    pub fn new(results: Vec<RawSearchResult>) -> Self {
        Self {
            results,
            queries: Mutex::default(),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for RecordingSearch {
    async fn fetch(&self, query: &str) -> ChatResult<Option<Vec<RawSearchResult>>> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(Some(self.results.clone()))
    }
}

pub fn hit(title: &str, description: &str, url: &str) -> RawSearchResult {
    RawSearchResult {
        title: Some(title.into()),
        description: Some(description.into()),
        url: Some(url.into()),
    }
}
