//! Canned collaborators for handler tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chess_core::suggest::{
    AnalysisReply, AnalysisRequest, CollaboratorError, MoveSuggester, PositionAnalyst, Suggestion,
    SuggestionRequest,
};
use chess_core::MoveResolver;

use crate::state::{AppState, SharedState};

/// Hands out scripted replies in order, then fails.
#[derive(Default)]
pub struct ScriptedSuggester {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedSuggester {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
        }
    }
}

#[async_trait]
impl MoveSuggester for ScriptedSuggester {
    async fn suggest(&self, _request: SuggestionRequest) -> Result<Suggestion, CollaboratorError> {
        let reply = self.replies.lock().unwrap().pop_front();
        reply
            .map(|text| Suggestion {
                move_text: text,
                explanation: None,
            })
            .ok_or_else(|| CollaboratorError("no more scripted replies".to_string()))
    }
}

pub struct EchoAnalyst;

#[async_trait]
impl PositionAnalyst for EchoAnalyst {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisReply, CollaboratorError> {
        Ok(AnalysisReply {
            analysis_text: format!("Looked at {}", request.fen),
            suggested_move: Some("e4".to_string()),
            evaluation: Some(0.3),
        })
    }
}

pub fn state(replies: &[&str]) -> SharedState {
    Arc::new(AppState::new(
        MoveResolver::default(),
        Arc::new(ScriptedSuggester::new(replies)),
        Arc::new(EchoAnalyst),
    ))
}
