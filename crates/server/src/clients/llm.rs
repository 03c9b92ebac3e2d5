//! LLM API client for OpenAI-compatible chat completions and Anthropic messages.
//!
//! The same client serves as the move suggester and the position analyst.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chess_core::game_data::Difficulty;
use chess_core::notation::extract_move;
use chess_core::suggest::{
    AnalysisReply, AnalysisRequest, CollaboratorError, MoveSuggester, PositionAnalyst, Suggestion,
    SuggestionRequest,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI or any server speaking its chat completions API.
    OpenAi,
    Anthropic,
}

impl LlmProvider {
    pub fn default_model(self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "gpt-4o-mini",
            LlmProvider::Anthropic => "claude-3-5-haiku-latest",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "https://api.openai.com/v1",
            LlmProvider::Anthropic => "https://api.anthropic.com/v1",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "open_ai" => Ok(LlmProvider::OpenAi),
            "anthropic" | "claude" => Ok(LlmProvider::Anthropic),
            other => Err(format!("unknown LLM provider '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM_API_KEY is not configured")]
    MissingApiKey,

    #[error("LLM request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("LLM API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("LLM reply had no text content")]
    EmptyReply,
}

impl From<LlmError> for CollaboratorError {
    fn from(e: LlmError) -> Self {
        CollaboratorError(e.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct LlmClient {
    http: Client,
    settings: LlmSettings,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        let http = Client::builder()
            .user_agent("LlmChess/1.0")
            .timeout(settings.timeout)
            .build()?;
        info!(provider = ?settings.provider, model = %settings.model, "Creating LLM client");
        Ok(Self { http, settings })
    }

    /// One system + user exchange, returning the reply text.
    #[instrument(skip(self, system_prompt, user_message), fields(provider = ?self.settings.provider, model = %self.settings.model))]
    pub async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String, LlmError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(LlmError::MissingApiKey)?;

        let (url, body) = match self.settings.provider {
            LlmProvider::OpenAi => (
                format!("{}/chat/completions", self.settings.base_url),
                serde_json::json!({
                    "model": self.settings.model,
                    "max_tokens": self.settings.max_tokens,
                    "messages": [
                        { "role": "system", "content": system_prompt },
                        { "role": "user", "content": user_message }
                    ]
                }),
            ),
            LlmProvider::Anthropic => (
                format!("{}/messages", self.settings.base_url),
                serde_json::json!({
                    "model": self.settings.model,
                    "max_tokens": self.settings.max_tokens,
                    "system": system_prompt,
                    "messages": [
                        { "role": "user", "content": user_message }
                    ]
                }),
            ),
        };

        let request = self.http.post(&url).json(&body);
        let request = match self.settings.provider {
            LlmProvider::OpenAi => request.bearer_auth(api_key),
            LlmProvider::Anthropic => request
                .header("x-api-key", api_key)
                .header("anthropic-version", "2023-06-01"),
        };

        debug!(%url, "Sending LLM request");
        let response = request.send().await.map_err(|e| {
            error!(error = ?e, "LLM request failed");
            LlmError::Request(e)
        })?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            error!(status = %status, response = %text, "LLM API error");
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let json: Value = serde_json::from_str(&text).map_err(|_| LlmError::EmptyReply)?;
        let content = reply_text(self.settings.provider, &json).ok_or(LlmError::EmptyReply)?;
        info!(content_length = content.len(), "Generated completion");
        Ok(content)
    }
}

/// Pull the assistant text out of a provider response body.
fn reply_text(provider: LlmProvider, json: &Value) -> Option<String> {
    let text = match provider {
        LlmProvider::OpenAi => json["choices"][0]["message"]["content"].as_str(),
        LlmProvider::Anthropic => json["content"][0]["text"].as_str(),
    }?;
    let text = text.trim();
    if text.is_empty() { None } else { Some(text.to_string()) }
}

#[async_trait]
impl MoveSuggester for LlmClient {
    async fn suggest(&self, request: SuggestionRequest) -> Result<Suggestion, CollaboratorError> {
        let reply = self
            .complete(&move_system_prompt(request.difficulty), &move_user_prompt(&request))
            .await?;
        Ok(parse_suggestion(&reply))
    }
}

#[async_trait]
impl PositionAnalyst for LlmClient {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisReply, CollaboratorError> {
        let reply = self
            .complete(ANALYSIS_SYSTEM_PROMPT, &analysis_user_prompt(&request))
            .await?;
        Ok(parse_analysis(&reply))
    }
}

fn move_system_prompt(difficulty: Difficulty) -> String {
    let style = match difficulty {
        Difficulty::Beginner => {
            "You play like a casual beginner: simple developing moves, and you sometimes miss tactics."
        }
        Difficulty::Intermediate => "You play like a solid club player rated around 1500.",
        Difficulty::Advanced => "You play like a strong tournament player rated around 2000.",
        Difficulty::Expert => "You play like a grandmaster. Calculate concretely and choose the strongest move.",
    };
    format!(
        "You are a chess engine opponent. {style} \
         Reply with a JSON object {{\"move\": \"<SAN>\", \"explanation\": \"<one sentence>\"}} \
         and nothing else. The move must be legal in standard algebraic notation."
    )
}

fn move_user_prompt(request: &SuggestionRequest) -> String {
    let mut prompt = format!("Position (FEN): {}\n", request.fen);
    if !request.legal_moves.is_empty() {
        prompt.push_str(&format!("Legal moves: {}\n", request.legal_moves.join(", ")));
    }
    if !request.rejected.is_empty() {
        prompt.push_str(&format!(
            "These replies could not be played, do not repeat them: {}\n",
            request.rejected.join(" | ")
        ));
    }
    if request.want_explanation {
        prompt.push_str("Choose your move and explain it briefly.");
    } else {
        prompt.push_str("Choose your move. Leave the explanation empty.");
    }
    prompt
}

const ANALYSIS_SYSTEM_PROMPT: &str = "You are a chess coach. Analyse the position you are given. \
Reply with a JSON object {\"analysis\": \"<a few sentences>\", \"suggestedMove\": \"<SAN>\", \
\"evaluation\": <pawns from white's side as a number>} and nothing else.";

fn analysis_user_prompt(request: &AnalysisRequest) -> String {
    match request.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(query) => format!("Position (FEN): {}\nQuestion: {query}", request.fen),
        None => format!("Position (FEN): {}", request.fen),
    }
}

/// The first `{...}` span of a reply, parsed as JSON.
fn json_object(reply: &str) -> Option<Value> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&reply[start..=end])
        .ok()
        .filter(Value::is_object)
}

fn non_empty(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Read a move reply: structured JSON when the model complied, otherwise the
/// first notation-shaped token in the text.
pub fn parse_suggestion(reply: &str) -> Suggestion {
    if let Some(json) = json_object(reply) {
        if let Some(move_text) = non_empty(&json["move"]) {
            return Suggestion {
                move_text,
                explanation: non_empty(&json["explanation"]),
            };
        }
    }

    let trimmed = reply.trim();
    match extract_move(trimmed) {
        Some(token) => Suggestion {
            move_text: token,
            explanation: (trimmed.len() > 12).then(|| trimmed.to_string()),
        },
        None => Suggestion {
            move_text: trimmed.to_string(),
            explanation: None,
        },
    }
}

pub fn parse_analysis(reply: &str) -> AnalysisReply {
    if let Some(json) = json_object(reply) {
        if let Some(analysis_text) = non_empty(&json["analysis"]) {
            return AnalysisReply {
                analysis_text,
                suggested_move: non_empty(&json["suggestedMove"]),
                evaluation: json["evaluation"].as_f64(),
            };
        }
    }
    AnalysisReply {
        analysis_text: reply.trim().to_string(),
        suggested_move: extract_move(reply),
        evaluation: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(api_key: Option<&str>) -> LlmSettings {
        LlmSettings {
            provider: LlmProvider::Anthropic,
            api_key: api_key.map(str::to_string),
            model: "test-model".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
            max_tokens: 64,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_parse_json_suggestion() {
        let s = parse_suggestion(
            "Here you go: {\"move\": \"Nf3\", \"explanation\": \"Develops toward the centre.\"}",
        );
        assert_eq!(s.move_text, "Nf3");
        assert_eq!(s.explanation.as_deref(), Some("Develops toward the centre."));
    }

    #[test]
    fn test_parse_free_text_suggestion() {
        let s = parse_suggestion("I'll castle with O-O to get my king safe.");
        assert_eq!(s.move_text, "O-O");
        assert!(s.explanation.is_some());

        let s = parse_suggestion("e4");
        assert_eq!(s.move_text, "e4");
        assert_eq!(s.explanation, None);

        // Nothing notation-shaped: pass the text on untouched.
        let s = parse_suggestion("  the knight one  ");
        assert_eq!(s.move_text, "the knight one");
    }

    #[test]
    fn test_json_without_move_falls_back_to_text() {
        let s = parse_suggestion("{\"thoughts\": \"hmm\"} so Bb5");
        assert_eq!(s.move_text, "Bb5");
    }

    #[test]
    fn test_parse_analysis() {
        let a = parse_analysis(
            "{\"analysis\": \"White is better.\", \"suggestedMove\": \"d4\", \"evaluation\": 0.8}",
        );
        assert_eq!(a.analysis_text, "White is better.");
        assert_eq!(a.suggested_move.as_deref(), Some("d4"));
        assert_eq!(a.evaluation, Some(0.8));

        let a = parse_analysis("Black should play Nf6 here.");
        assert_eq!(a.suggested_move.as_deref(), Some("Nf6"));
        assert_eq!(a.evaluation, None);
    }

    #[test]
    fn test_reply_text_per_provider() {
        let openai = serde_json::json!({"choices": [{"message": {"content": " e4 "}}]});
        assert_eq!(reply_text(LlmProvider::OpenAi, &openai).as_deref(), Some("e4"));
        let anthropic = serde_json::json!({"content": [{"type": "text", "text": "d4"}]});
        assert_eq!(reply_text(LlmProvider::Anthropic, &anthropic).as_deref(), Some("d4"));
        assert_eq!(reply_text(LlmProvider::Anthropic, &openai), None);
    }

    #[test]
    fn test_prompts_carry_request_context() {
        let request = SuggestionRequest {
            fen: "8/8/8/8/8/8/8/8 w - - 0 1".to_string(),
            difficulty: Difficulty::Beginner,
            want_explanation: false,
            legal_moves: vec!["e4".to_string(), "d4".to_string()],
            rejected: vec!["Qh5??".to_string()],
        };
        let prompt = move_user_prompt(&request);
        assert!(prompt.contains("Legal moves: e4, d4"));
        assert!(prompt.contains("Qh5??"));
        assert!(move_system_prompt(Difficulty::Expert).contains("grandmaster"));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_collaborator_error() {
        let client = LlmClient::new(settings(None)).unwrap();
        let err = client
            .suggest(SuggestionRequest {
                fen: chess_core::pgn::STANDARD_START_FEN.to_string(),
                difficulty: Difficulty::Intermediate,
                want_explanation: true,
                legal_moves: Vec::new(),
                rejected: Vec::new(),
            })
            .await
            .unwrap_err();
        assert!(err.0.contains("LLM_API_KEY"));
    }
}
