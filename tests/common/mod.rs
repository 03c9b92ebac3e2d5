#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chess_core::suggest::{
    AnalysisReply, AnalysisRequest, CollaboratorError, MoveSuggester, PositionAnalyst, Suggestion,
    SuggestionRequest,
};
use chess_core::MoveResolver;
use reqwest::Client;
use server::state::{AppState, SharedState};

/// Replays canned suggestions, then reports itself unavailable.
#[derive(Default)]
pub struct ScriptedSuggester {
    replies: Mutex<VecDeque<String>>,
    pub requests: Mutex<Vec<SuggestionRequest>>,
}

impl ScriptedSuggester {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            requests: Mutex::default(),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl MoveSuggester for ScriptedSuggester {
    async fn suggest(&self, request: SuggestionRequest) -> Result<Suggestion, CollaboratorError> {
        self.requests.lock().unwrap().push(request);
        let reply = self.replies.lock().unwrap().pop_front();
        reply
            .map(|move_text| Suggestion {
                move_text,
                explanation: Some("scripted".to_string()),
            })
            .ok_or_else(|| CollaboratorError("scripted suggester exhausted".to_string()))
    }
}

pub struct UnavailableAnalyst;

#[async_trait]
impl PositionAnalyst for UnavailableAnalyst {
    async fn analyze(&self, _request: AnalysisRequest) -> Result<AnalysisReply, CollaboratorError> {
        Err(CollaboratorError("analysis offline".to_string()))
    }
}

pub fn state(replies: &[&str]) -> SharedState {
    Arc::new(AppState::new(
        MoveResolver::default(),
        Arc::new(ScriptedSuggester::new(replies)),
        Arc::new(UnavailableAnalyst),
    ))
}

/// Serve the app on an ephemeral local port and return its base URL.
pub async fn spawn_server(state: SharedState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, server::router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

/// Build a reqwest client for tests.
pub fn client() -> Client {
    Client::new()
}
