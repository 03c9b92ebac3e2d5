//! Rules oracle: the authority on legality, SAN and game status.
//!
//! The resolution pipeline only talks to [`RulesOracle`]. [`ShakmatyOracle`]
//! is the production implementation on top of `shakmaty`; undo is a stack of
//! prior positions since shakmaty positions are immutable values.

use std::collections::BTreeMap;

use shakmaty::{
    fen::Fen, san::San, uci::UciMove, CastlingMode, Chess, Color, EnPassantMode, Move, Piece,
    Position, Role, Square,
};
use thiserror::Error;

use crate::game_data::{color_name, HistoryEntry, OracleState, ResolvedMove};
use crate::notation::promotion_char;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("Invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },

    #[error("Illegal move: {0}")]
    IllegalMove(String),

    #[error("No move to undo")]
    NothingToUndo,
}

/// A move the oracle accepted, with the SAN it assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
    pub san: String,
    pub fen_after: String,
}

impl AppliedMove {
    pub fn resolved(&self) -> ResolvedMove {
        ResolvedMove::new(self.from, self.to, self.promotion)
    }

    pub fn history_entry(&self) -> HistoryEntry {
        HistoryEntry {
            from: self.from.to_string(),
            to: self.to.to_string(),
            san: self.san.clone(),
            promotion: self.promotion.map(|r| promotion_char(r).to_string()),
            fen_after: self.fen_after.clone(),
        }
    }
}

/// Origin square → reachable squares, in the oracle's generation order.
/// Castling appears as the king's two-square step (`e1` → `g1`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegalMoveMap {
    entries: Vec<(Square, Vec<Square>)>,
}

impl LegalMoveMap {
    /// Add a (from, to) pair, ignoring duplicates (promotion variants).
    pub fn insert(&mut self, from: Square, to: Square) {
        match self.entries.iter_mut().find(|(origin, _)| *origin == from) {
            Some((_, targets)) => {
                if !targets.contains(&to) {
                    targets.push(to);
                }
            }
            None => self.entries.push((from, vec![to])),
        }
    }

    pub fn targets(&self, from: Square) -> &[Square] {
        self.entries
            .iter()
            .find(|(origin, _)| *origin == from)
            .map(|(_, targets)| targets.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, from: Square, to: Square) -> bool {
        self.targets(from).contains(&to)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Square, &[Square])> {
        self.entries.iter().map(|(from, targets)| (*from, targets.as_slice()))
    }

    /// Total number of (from, to) pairs.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, targets)| targets.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_strings(&self) -> BTreeMap<String, Vec<String>> {
        self.entries
            .iter()
            .map(|(from, targets)| {
                (
                    from.to_string(),
                    targets.iter().map(|t| t.to_string()).collect(),
                )
            })
            .collect()
    }
}

/// The rules collaborator the resolution pipeline is written against.
pub trait RulesOracle {
    /// Full status report, including history and the legal-move map.
    fn state(&self) -> OracleState;

    fn fen(&self) -> String;

    fn turn(&self) -> Color;

    fn legal_moves_by_origin(&self) -> LegalMoveMap;

    fn piece_at(&self, square: Square) -> Option<Piece>;

    fn is_game_over(&self) -> bool;

    /// Apply a move. A missing promotion piece on a promoting pawn move
    /// promotes to a queen.
    fn apply_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<Role>,
    ) -> Result<AppliedMove, OracleError>;

    /// Take back the most recent move.
    fn undo(&mut self) -> Result<AppliedMove, OracleError>;

    fn last_applied(&self) -> Option<&AppliedMove>;

    fn history(&self) -> &[AppliedMove];
}

#[derive(Debug, Clone)]
pub struct ShakmatyOracle {
    position: Chess,
    initial_fen: String,
    previous: Vec<Chess>,
    history: Vec<AppliedMove>,
}

impl Default for ShakmatyOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShakmatyOracle {
    pub fn new() -> Self {
        let position = Chess::default();
        let initial_fen = fen_of(&position);
        Self {
            position,
            initial_fen,
            previous: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, OracleError> {
        let parsed: Fen = fen.trim().parse().map_err(|e| OracleError::InvalidFen {
            fen: fen.to_string(),
            reason: format!("{e}"),
        })?;
        let position: Chess =
            parsed
                .into_position(CastlingMode::Standard)
                .map_err(|e| OracleError::InvalidFen {
                    fen: fen.to_string(),
                    reason: format!("{e}"),
                })?;
        let initial_fen = fen_of(&position);
        Ok(Self {
            position,
            initial_fen,
            previous: Vec::new(),
            history: Vec::new(),
        })
    }

    /// FEN the game started from.
    pub fn initial_fen(&self) -> &str {
        &self.initial_fen
    }

    fn is_threefold_repetition(&self) -> bool {
        let current = repetition_key(&self.position);
        let earlier = self
            .previous
            .iter()
            .filter(|pos| repetition_key(pos) == current)
            .count();
        earlier + 1 >= 3
    }

    fn is_draw(&self) -> bool {
        self.position.is_stalemate()
            || self.position.is_insufficient_material()
            || self.position.halfmoves() >= 100
            || self.is_threefold_repetition()
    }

    fn find_legal(&self, from: Square, to: Square, promotion: Option<Role>) -> Option<Move> {
        self.position
            .legal_moves()
            .iter()
            .find(|m| {
                let (f, t) = match king_step(m) {
                    Some(squares) => squares,
                    None => return false,
                };
                if f != from || t != to {
                    return false;
                }
                match m.promotion() {
                    Some(role) => role == promotion.unwrap_or(Role::Queen),
                    None => true,
                }
            })
            .cloned()
    }
}

impl RulesOracle for ShakmatyOracle {
    fn state(&self) -> OracleState {
        let is_checkmate = self.position.is_checkmate();
        let is_stalemate = self.position.is_stalemate();
        let is_draw = self.is_draw();
        OracleState {
            fen: self.fen(),
            turn: color_name(self.position.turn()).to_string(),
            is_check: self.position.is_check(),
            is_checkmate,
            is_stalemate,
            is_draw,
            is_game_over: is_checkmate || is_draw,
            history: self.history.iter().map(AppliedMove::history_entry).collect(),
            legal_moves: self.legal_moves_by_origin().to_strings(),
        }
    }

    fn fen(&self) -> String {
        fen_of(&self.position)
    }

    fn turn(&self) -> Color {
        self.position.turn()
    }

    fn legal_moves_by_origin(&self) -> LegalMoveMap {
        let mut map = LegalMoveMap::default();
        for m in self.position.legal_moves().iter() {
            if let Some((from, to)) = king_step(m) {
                map.insert(from, to);
            }
        }
        map
    }

    fn piece_at(&self, square: Square) -> Option<Piece> {
        self.position.board().piece_at(square)
    }

    fn is_game_over(&self) -> bool {
        self.position.is_checkmate() || self.is_draw()
    }

    fn apply_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<Role>,
    ) -> Result<AppliedMove, OracleError> {
        let requested = ResolvedMove::new(from, to, promotion);
        let mv = self
            .find_legal(from, to, promotion)
            .ok_or_else(|| OracleError::IllegalMove(requested.to_string()))?;

        let san = San::from_move(&self.position, mv.clone()).to_string();
        let mut after = self.position.clone();
        after.play_unchecked(mv.clone());

        let suffix = if after.is_checkmate() {
            "#"
        } else if after.is_check() {
            "+"
        } else {
            ""
        };

        let applied = AppliedMove {
            from,
            to,
            promotion: mv.promotion(),
            san: format!("{san}{suffix}"),
            fen_after: fen_of(&after),
        };

        let before = std::mem::replace(&mut self.position, after);
        self.previous.push(before);
        self.history.push(applied.clone());
        Ok(applied)
    }

    fn undo(&mut self) -> Result<AppliedMove, OracleError> {
        let before = self.previous.pop().ok_or(OracleError::NothingToUndo)?;
        self.position = before;
        self.history.pop().ok_or(OracleError::NothingToUndo)
    }

    fn last_applied(&self) -> Option<&AppliedMove> {
        self.history.last()
    }

    fn history(&self) -> &[AppliedMove] {
        &self.history
    }
}

/// (from, to) as the king / piece physically moves. Castling maps to the
/// king's two-square step in standard chess.
fn king_step(m: &Move) -> Option<(Square, Square)> {
    match m.to_uci(CastlingMode::Standard) {
        UciMove::Normal { from, to, .. } => Some((from, to)),
        _ => None,
    }
}

fn fen_of(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

/// Board, side to move, castling rights and en-passant square.
fn repetition_key(pos: &Chess) -> String {
    fen_of(pos)
        .split(' ')
        .take(4)
        .collect::<Vec<_>>()
        .join(" ")
}
