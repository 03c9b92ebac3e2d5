//! Game session: one position, its history and the turn-taking rules.
//!
//! A session is shared between request handlers as [`SharedSession`]. The
//! `is_loading` flag is the busy lock: while an AI resolution is in flight
//! every operation that could start or revert a move is refused.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use shakmaty::Color;
use tokio::sync::Mutex;

use crate::error::{ResolveError, SessionError};
use crate::game_data::{color_name, Controller, Difficulty, GameSnapshot, OracleState, ResolvedMove};
use crate::matcher::MatchOutcome;
use crate::oracle::{AppliedMove, LegalMoveMap, OracleError, RulesOracle, ShakmatyOracle};
use crate::pgn::{self, PgnHeaders};
use crate::resolver::resolve_in_position;

pub type SharedSession<O = ShakmatyOracle> = Arc<Mutex<GameSession<O>>>;

/// Outcome of taking back a human + AI move pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoReport {
    /// Moves actually taken back, most recent first. Fewer than two means
    /// the history ran out part way.
    pub undone: Vec<AppliedMove>,
}

#[derive(Debug, Clone)]
pub struct GameSession<O: RulesOracle = ShakmatyOracle> {
    oracle: O,
    human_color: Color,
    difficulty: Difficulty,
    controller: Controller,
    is_loading: bool,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
}

impl GameSession<ShakmatyOracle> {
    pub fn new(human_color: Color, difficulty: Difficulty) -> Self {
        Self::with_oracle(ShakmatyOracle::new(), human_color, difficulty)
    }

    pub fn from_fen(fen: &str, human_color: Color, difficulty: Difficulty) -> Result<Self, OracleError> {
        Ok(Self::with_oracle(ShakmatyOracle::from_fen(fen)?, human_color, difficulty))
    }

    /// Replay the SAN moves of a PGN, honouring its FEN header.
    pub fn from_pgn(pgn_text: &str, human_color: Color, difficulty: Difficulty) -> Result<Self, ResolveError> {
        let oracle = match pgn::extract_header(pgn_text, "FEN") {
            Some(fen) => ShakmatyOracle::from_fen(&fen).map_err(SessionError::from)?,
            None => ShakmatyOracle::new(),
        };
        let mut session = Self::with_oracle(oracle, human_color, difficulty);

        for san in pgn::extract_moves(pgn_text) {
            let outcome = resolve_in_position(&mut session.oracle, &san)?.ok_or_else(|| {
                ResolveError::IllegalMove {
                    notation: san.clone(),
                    reason: format!("not legal after {} moves", session.oracle.history().len()),
                }
            })?;
            session.apply_move(outcome.mv)?;
        }
        Ok(session)
    }

    /// Start over from the position the session was created with.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.oracle = ShakmatyOracle::from_fen(self.oracle.initial_fen())?;
        self.controller = Controller::Human;
        self.last_error = None;
        Ok(())
    }

    pub fn pgn(&self) -> String {
        let state = self.oracle.state();
        let (white, black) = match self.human_color {
            Color::White => ("Human".to_string(), self.ai_name()),
            Color::Black => (self.ai_name(), "Human".to_string()),
        };
        let headers = PgnHeaders {
            event: "Casual Game".to_string(),
            site: "LLM Chess".to_string(),
            date: self.created_at.format("%Y.%m.%d").to_string(),
            white,
            black,
            result: pgn::game_result(&state).to_string(),
            fen: Some(self.oracle.initial_fen().to_string()),
        };
        let sans: Vec<String> = self.oracle.history().iter().map(|m| m.san.clone()).collect();
        pgn::format_pgn(&headers, &sans)
    }

    fn ai_name(&self) -> String {
        format!("AI ({})", self.difficulty.as_str())
    }
}

impl<O: RulesOracle> GameSession<O> {
    pub fn with_oracle(oracle: O, human_color: Color, difficulty: Difficulty) -> Self {
        Self {
            oracle,
            human_color,
            difficulty,
            controller: Controller::Human,
            is_loading: false,
            last_error: None,
            created_at: Utc::now(),
        }
    }

    pub fn into_shared(self) -> SharedSession<O> {
        Arc::new(Mutex::new(self))
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub(crate) fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    pub fn human_color(&self) -> Color {
        self.human_color
    }

    pub fn ai_color(&self) -> Color {
        !self.human_color
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn controller(&self) -> Controller {
        self.controller
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Time since the session was created.
    pub fn age(&self) -> Duration {
        (Utc::now() - self.created_at).to_std().unwrap_or_default()
    }

    /// FEN of the current position.
    pub fn current_position(&self) -> String {
        self.oracle.fen()
    }

    pub fn turn(&self) -> Color {
        self.oracle.turn()
    }

    pub fn is_ai_turn(&self) -> bool {
        self.oracle.turn() == self.ai_color()
    }

    pub fn is_game_over(&self) -> bool {
        self.oracle.is_game_over()
    }

    pub fn legal_moves_by_origin(&self) -> LegalMoveMap {
        self.oracle.legal_moves_by_origin()
    }

    pub fn history(&self) -> &[AppliedMove] {
        self.oracle.history()
    }

    pub fn state(&self) -> OracleState {
        self.oracle.state()
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            position: self.oracle.state(),
            human_color: color_name(self.human_color).to_string(),
            difficulty: self.difficulty,
            controller: self.controller,
            is_loading: self.is_loading,
            last_error: self.last_error.clone(),
        }
    }

    pub fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.is_loading {
            Err(SessionError::Busy)
        } else {
            Ok(())
        }
    }

    /// Apply a move for whichever side is to move.
    pub fn apply_move(&mut self, mv: ResolvedMove) -> Result<AppliedMove, SessionError> {
        self.ensure_idle()?;
        self.play(mv)
    }

    /// Apply a move on behalf of the human player.
    pub fn apply_human_move(&mut self, mv: ResolvedMove) -> Result<AppliedMove, SessionError> {
        self.ensure_idle()?;
        if self.oracle.turn() != self.human_color {
            return Err(SessionError::NotYourTurn(color_name(self.human_color)));
        }
        let applied = self.play(mv)?;
        self.last_error = None;
        tracing::info!(san = %applied.san, mv = %applied.resolved(), "Human move applied");
        Ok(applied)
    }

    /// Resolve free-form notation against the current position without
    /// applying it.
    pub fn resolve_notation(&mut self, text: &str) -> Result<Option<MatchOutcome>, ResolveError> {
        resolve_in_position(&mut self.oracle, text)
    }

    /// SAN of every legal move, in enumeration order.
    pub fn candidate_sans(&mut self) -> Result<Vec<String>, ResolveError> {
        Ok(crate::enumerator::enumerate_candidates(&mut self.oracle)?
            .into_iter()
            .map(|c| c.san)
            .collect())
    }

    pub fn undo(&mut self) -> Result<AppliedMove, SessionError> {
        self.ensure_idle()?;
        Ok(self.oracle.undo()?)
    }

    /// Take back the last two moves. If only the first succeeds its effect
    /// stays in place and the report says so.
    pub fn undo_pair(&mut self) -> Result<UndoReport, SessionError> {
        let first = self.undo()?;
        let mut undone = vec![first];
        match self.oracle.undo() {
            Ok(second) => undone.push(second),
            Err(e) => tracing::debug!(error = %e, "Partial undo, history exhausted"),
        }
        self.last_error = None;
        Ok(UndoReport { undone })
    }

    /// Take the busy lock for an AI move.
    pub fn begin_ai_turn(&mut self) -> Result<(), SessionError> {
        self.ensure_idle()?;
        if self.oracle.is_game_over() {
            return Err(SessionError::GameOver);
        }
        if !self.is_ai_turn() {
            return Err(SessionError::NotYourTurn(color_name(self.ai_color())));
        }
        self.is_loading = true;
        self.controller = Controller::Ai;
        self.last_error = None;
        Ok(())
    }

    /// Apply the AI's resolved move. Only valid while the busy lock is held.
    pub(crate) fn commit_ai_move(&mut self, mv: ResolvedMove) -> Result<AppliedMove, SessionError> {
        if !self.is_loading {
            return Err(SessionError::NotYourTurn(color_name(self.ai_color())));
        }
        self.play(mv)
    }

    /// Release the busy lock and hand the turn back to the human.
    pub fn finish_ai_turn(&mut self, error: Option<String>) {
        self.is_loading = false;
        self.controller = Controller::Human;
        self.last_error = error;
    }

    fn play(&mut self, mv: ResolvedMove) -> Result<AppliedMove, SessionError> {
        if self.oracle.is_game_over() {
            return Err(SessionError::GameOver);
        }
        Ok(self.oracle.apply_move(mv.from, mv.to, mv.promotion)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::Square;

    fn e2e4() -> ResolvedMove {
        ResolvedMove::new(Square::E2, Square::E4, None)
    }

    #[test]
    fn test_human_move_and_turn_check() {
        let mut session = GameSession::new(Color::White, Difficulty::Beginner);
        let applied = session.apply_human_move(e2e4()).unwrap();
        assert_eq!(applied.san, "e4");
        assert!(session.is_ai_turn());

        let err = session
            .apply_human_move(ResolvedMove::new(Square::E7, Square::E5, None))
            .unwrap_err();
        assert_eq!(err, SessionError::NotYourTurn("white"));
    }

    #[test]
    fn test_busy_lock_blocks_every_move_operation() {
        let mut session = GameSession::new(Color::Black, Difficulty::Expert);
        session.begin_ai_turn().unwrap();
        assert!(session.is_loading());
        assert_eq!(session.controller(), Controller::Ai);

        assert_eq!(session.begin_ai_turn(), Err(SessionError::Busy));
        assert_eq!(session.apply_move(e2e4()).unwrap_err(), SessionError::Busy);
        assert_eq!(session.undo().unwrap_err(), SessionError::Busy);
        assert_eq!(session.reset().unwrap_err(), SessionError::Busy);

        session.finish_ai_turn(Some("boom".to_string()));
        assert!(!session.is_loading());
        assert_eq!(session.controller(), Controller::Human);
        assert_eq!(session.last_error(), Some("boom"));
        assert!(session.begin_ai_turn().is_ok());
    }

    #[test]
    fn test_ai_turn_refused_on_human_turn() {
        let mut session = GameSession::new(Color::White, Difficulty::Intermediate);
        assert_eq!(session.begin_ai_turn(), Err(SessionError::NotYourTurn("black")));
        assert!(!session.is_loading());
    }

    #[test]
    fn test_commit_requires_lock() {
        let mut session = GameSession::new(Color::Black, Difficulty::Intermediate);
        assert!(session.commit_ai_move(e2e4()).is_err());
        session.begin_ai_turn().unwrap();
        assert_eq!(session.commit_ai_move(e2e4()).unwrap().san, "e4");
    }

    #[test]
    fn test_undo_pair_and_partial_undo() {
        let mut session = GameSession::new(Color::White, Difficulty::Intermediate);
        session.apply_human_move(e2e4()).unwrap();
        session
            .apply_move(ResolvedMove::new(Square::E7, Square::E5, None))
            .unwrap();
        session.apply_human_move(ResolvedMove::new(Square::G1, Square::F3, None)).unwrap();

        let report = session.undo_pair().unwrap();
        assert_eq!(report.undone.len(), 2);
        assert_eq!(report.undone[0].san, "Nf3");
        assert_eq!(session.history().len(), 1);

        // Only one move left: the first undo sticks, the second is skipped.
        let report = session.undo_pair().unwrap();
        assert_eq!(report.undone.len(), 1);
        assert!(session.history().is_empty());

        assert!(matches!(
            session.undo_pair(),
            Err(SessionError::Oracle(OracleError::NothingToUndo))
        ));
    }

    #[test]
    fn test_game_over_blocks_moves() {
        // Fool's mate, white is mated.
        let fen = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3";
        let mut session = GameSession::from_fen(fen, Color::White, Difficulty::Beginner).unwrap();
        assert!(session.is_game_over());
        assert_eq!(session.apply_human_move(e2e4()).unwrap_err(), SessionError::GameOver);
    }

    #[test]
    fn test_snapshot_shape() {
        let session = GameSession::new(Color::Black, Difficulty::Advanced);
        let json = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(json["humanColor"], "black");
        assert_eq!(json["difficulty"], "advanced");
        assert_eq!(json["controller"], "human");
        assert_eq!(json["isLoading"], false);
        assert_eq!(json["turn"], "white");
        let knight = json["legalMoves"]["g1"].as_array().unwrap();
        assert_eq!(knight.len(), 2);
        assert!(knight.contains(&serde_json::json!("f3")));
        assert!(json.get("lastError").is_none());
    }

    #[test]
    fn test_pgn_round_trip() {
        let mut session = GameSession::new(Color::White, Difficulty::Expert);
        session.apply_human_move(e2e4()).unwrap();
        session
            .apply_move(ResolvedMove::new(Square::E7, Square::E5, None))
            .unwrap();
        let pgn = session.pgn();
        assert!(pgn.contains("[White \"Human\"]"));
        assert!(pgn.contains("[Black \"AI (expert)\"]"));
        assert!(pgn.contains("1. e4 e5 *"));

        let replayed = GameSession::from_pgn(&pgn, Color::White, Difficulty::Expert).unwrap();
        assert_eq!(replayed.current_position(), session.current_position());
    }

    #[test]
    fn test_from_pgn_rejects_illegal_move() {
        let err = GameSession::from_pgn("1. e4 e5 2. Ke3", Color::White, Difficulty::Beginner)
            .unwrap_err();
        assert!(matches!(err, ResolveError::IllegalMove { ref notation, .. } if notation == "Ke3"));
    }

    #[test]
    fn test_reset_restores_initial_position() {
        let fen = "8/4P3/8/8/8/8/k7/4K3 w - - 0 1";
        let mut session = GameSession::from_fen(fen, Color::White, Difficulty::Beginner).unwrap();
        session
            .apply_human_move(ResolvedMove::new(Square::E7, Square::E8, None))
            .unwrap();
        session.reset().unwrap();
        assert_eq!(session.current_position(), fen);
    }
}
