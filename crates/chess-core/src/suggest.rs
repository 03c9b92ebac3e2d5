//! Language-model collaborators consumed by the resolver and the HTTP layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game_data::Difficulty;

/// Failure of an external suggestion or analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CollaboratorError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    pub fen: String,
    pub difficulty: Difficulty,
    pub want_explanation: bool,
    /// Legal moves in SAN, offered as a hint. May be empty.
    #[serde(default)]
    pub legal_moves: Vec<String>,
    /// Suggestions already tried this turn that could not be resolved.
    #[serde(default)]
    pub rejected: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    /// Untrusted free text; may be bare SAN or a sentence containing it.
    pub move_text: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub explanation: Option<String>,
}

#[async_trait]
pub trait MoveSuggester: Send + Sync {
    async fn suggest(&self, request: SuggestionRequest) -> Result<Suggestion, CollaboratorError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub fen: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub query: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReply {
    pub analysis_text: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub suggested_move: Option<String>,
    /// Pawns from white's point of view.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub evaluation: Option<f64>,
}

#[async_trait]
pub trait PositionAnalyst: Send + Sync {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisReply, CollaboratorError>;
}
