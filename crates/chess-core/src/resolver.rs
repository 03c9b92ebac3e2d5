//! Move resolution orchestrator.
//!
//! Drives an AI suggestion through Normalize → Match → Fallback, asks the
//! suggester for a fresh move when nothing fits (bounded by
//! [`ResolverConfig::max_retries`]), then applies the result to the session.
//! The session mutex is never held while waiting on the suggester.

use serde::Serialize;

use crate::enumerator::enumerate_candidates;
use crate::error::ResolveError;
use crate::fallback::resolve_fallback;
use crate::game_data::{GameSnapshot, MoveDto};
use crate::matcher::{match_notation, MatchOutcome, Strategy};
use crate::notation::normalize;
use crate::oracle::RulesOracle;
use crate::session::{GameSession, SharedSession};
use crate::suggest::{MoveSuggester, Suggestion, SuggestionRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Fresh suggestions requested after the first one fails to resolve.
    pub max_retries: u32,
    /// Ask the suggester to explain its move.
    pub want_explanation: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            want_explanation: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Matcher,
    Fallback,
}

/// Bookkeeping for one suggestion being resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionAttempt {
    pub original: String,
    pub cleaned: String,
    /// 1-based.
    pub attempt: u32,
    pub exhausted: Vec<Phase>,
}

impl ResolutionAttempt {
    pub fn new(original: impl Into<String>) -> Self {
        let original = original.into();
        Self {
            cleaned: normalize(&original),
            original,
            attempt: 1,
            exhausted: Vec::new(),
        }
    }

    fn retry(&self, original: impl Into<String>) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..Self::new(original)
        }
    }

    /// Run matcher then fallback against the oracle's current position.
    pub fn run<O: RulesOracle + ?Sized>(
        &mut self,
        oracle: &mut O,
    ) -> Result<Option<MatchOutcome>, ResolveError> {
        let candidates = enumerate_candidates(oracle)?;
        if let Some(outcome) = match_notation(&self.cleaned, &candidates, oracle.turn()) {
            return Ok(Some(outcome));
        }
        self.exhausted.push(Phase::Matcher);

        if let Some(outcome) = resolve_fallback(&self.cleaned, &self.original, oracle) {
            return Ok(Some(outcome));
        }
        self.exhausted.push(Phase::Fallback);
        Ok(None)
    }
}

/// Resolve `raw` in the oracle's position without applying anything.
pub fn resolve_in_position<O: RulesOracle + ?Sized>(
    oracle: &mut O,
    raw: &str,
) -> Result<Option<MatchOutcome>, ResolveError> {
    let mut attempt = ResolutionAttempt::new(raw);
    let outcome = attempt.run(oracle)?;
    if let Some(outcome) = &outcome {
        log_outcome(&attempt, outcome);
    }
    Ok(outcome)
}

fn log_outcome(attempt: &ResolutionAttempt, outcome: &MatchOutcome) {
    if outcome.is_ambiguous() {
        tracing::warn!(
            event = "ambiguous_resolution",
            notation = %attempt.original,
            token = %attempt.cleaned,
            strategy = ?outcome.strategy,
            ambiguity = ?outcome.ambiguity,
            chosen = %outcome.mv,
            "Ambiguous notation resolved to first candidate"
        );
    } else {
        tracing::debug!(
            token = %attempt.cleaned,
            strategy = ?outcome.strategy,
            resolved = %outcome.mv,
            "Notation resolved"
        );
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiMoveReport {
    pub resolved: MoveDto,
    pub san: String,
    pub strategy: Strategy,
    pub ambiguous: bool,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub snapshot: GameSnapshot,
}

/// Everything about a successful resolution except the final snapshot.
struct Resolution {
    outcome: MatchOutcome,
    san: String,
    attempts: u32,
    explanation: Option<String>,
}

impl Resolution {
    fn into_report(self, snapshot: GameSnapshot) -> AiMoveReport {
        AiMoveReport {
            resolved: self.outcome.mv.into(),
            san: self.san,
            strategy: self.outcome.strategy,
            ambiguous: self.outcome.is_ambiguous(),
            attempts: self.attempts,
            explanation: self.explanation,
            snapshot,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MoveResolver {
    config: ResolverConfig,
}

impl MoveResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Ask the suggester for the AI's move and play it.
    pub async fn play_ai_turn<O: RulesOracle>(
        &self,
        session: &SharedSession<O>,
        suggester: &dyn MoveSuggester,
    ) -> Result<AiMoveReport, ResolveError> {
        let request = {
            let mut guard = session.lock().await;
            guard.begin_ai_turn()?;
            match self.request(&mut guard, Vec::new()) {
                Ok(request) => request,
                Err(e) => {
                    guard.finish_ai_turn(Some(e.to_string()));
                    return Err(e);
                }
            }
        };

        let result = match suggester.suggest(request).await {
            Ok(suggestion) => self.drive(session, suggestion, suggester).await,
            Err(e) => Err(ResolveError::CollaboratorUnavailable(e.to_string())),
        };
        self.finish(session, result).await
    }

    /// Resolve a suggestion the caller already has, retrying through
    /// `suggester` if it does not fit the position.
    pub async fn resolve<O: RulesOracle>(
        &self,
        session: &SharedSession<O>,
        raw: &str,
        suggester: &dyn MoveSuggester,
    ) -> Result<AiMoveReport, ResolveError> {
        session.lock().await.begin_ai_turn()?;
        let suggestion = Suggestion {
            move_text: raw.to_string(),
            explanation: None,
        };
        let result = self.drive(session, suggestion, suggester).await;
        self.finish(session, result).await
    }

    fn request<O: RulesOracle>(
        &self,
        session: &mut GameSession<O>,
        rejected: Vec<String>,
    ) -> Result<SuggestionRequest, ResolveError> {
        Ok(SuggestionRequest {
            fen: session.current_position(),
            difficulty: session.difficulty(),
            want_explanation: self.config.want_explanation,
            legal_moves: session.candidate_sans()?,
            rejected,
        })
    }

    async fn drive<O: RulesOracle>(
        &self,
        session: &SharedSession<O>,
        first: Suggestion,
        suggester: &dyn MoveSuggester,
    ) -> Result<Resolution, ResolveError> {
        let mut attempt = ResolutionAttempt::new(first.move_text);
        let mut explanation = first.explanation;
        let mut rejected = Vec::new();

        loop {
            let request = {
                let mut guard = session.lock().await;
                let found = attempt.run(guard.oracle_mut())?;

                if let Some(outcome) = found {
                    log_outcome(&attempt, &outcome);
                    let applied = guard.commit_ai_move(outcome.mv).map_err(|e| {
                        ResolveError::IllegalMove {
                            notation: attempt.original.clone(),
                            reason: e.to_string(),
                        }
                    })?;
                    tracing::info!(
                        san = %applied.san,
                        mv = %applied.resolved(),
                        attempts = attempt.attempt,
                        "AI move applied"
                    );
                    return Ok(Resolution {
                        outcome,
                        san: applied.san,
                        attempts: attempt.attempt,
                        explanation,
                    });
                }

                tracing::info!(
                    notation = %attempt.original,
                    token = %attempt.cleaned,
                    attempt = attempt.attempt,
                    exhausted = ?attempt.exhausted,
                    "Suggestion did not resolve"
                );
                if attempt.attempt > self.config.max_retries {
                    return Err(ResolveError::MalformedNotation {
                        notation: attempt.original,
                        attempts: attempt.attempt,
                    });
                }
                rejected.push(attempt.original.clone());
                self.request(&mut guard, rejected.clone())?
            };

            let suggestion = suggester
                .suggest(request)
                .await
                .map_err(|e| ResolveError::CollaboratorUnavailable(e.to_string()))?;
            attempt = attempt.retry(suggestion.move_text);
            explanation = suggestion.explanation;
        }
    }

    /// Release the busy lock whatever happened and build the report.
    async fn finish<O: RulesOracle>(
        &self,
        session: &SharedSession<O>,
        result: Result<Resolution, ResolveError>,
    ) -> Result<AiMoveReport, ResolveError> {
        let mut guard = session.lock().await;
        match result {
            Ok(resolution) => {
                guard.finish_ai_turn(None);
                Ok(resolution.into_report(guard.snapshot()))
            }
            Err(e) => {
                tracing::error!(error = %e, "AI move failed");
                guard.finish_ai_turn(Some(e.to_string()));
                Err(e)
            }
        }
    }
}
