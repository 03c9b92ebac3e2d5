//! Stateless move parsing: free text + FEN in, a concrete move out.

use serde::{Deserialize, Serialize};

use crate::enumerator::enumerate_candidates;
use crate::error::ResolveError;
use crate::game_data::ResolvedMove;
use crate::oracle::ShakmatyOracle;
use crate::resolver::resolve_in_position;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseMoveFailure {
    pub error: String,
    /// SAN of every legal move in the position, empty if the FEN was unusable.
    pub available_moves: Vec<String>,
}

/// Resolve `move_text` in the position described by `fen`, using a
/// throw-away oracle.
pub fn parse_move(fen: &str, move_text: &str) -> Result<ResolvedMove, ParseMoveFailure> {
    let mut oracle = ShakmatyOracle::from_fen(fen).map_err(|e| ParseMoveFailure {
        error: e.to_string(),
        available_moves: Vec::new(),
    })?;

    match resolve_in_position(&mut oracle, move_text) {
        Ok(Some(outcome)) => Ok(outcome.mv),
        Ok(None) => Err(ParseMoveFailure {
            error: format!("Could not parse move '{}'", move_text.trim()),
            available_moves: available_moves(&mut oracle),
        }),
        Err(e) => Err(failure(e, &mut oracle)),
    }
}

fn failure(e: ResolveError, oracle: &mut ShakmatyOracle) -> ParseMoveFailure {
    tracing::error!(error = %e, "Move parsing failed");
    ParseMoveFailure {
        error: e.to_string(),
        available_moves: available_moves(oracle),
    }
}

fn available_moves(oracle: &mut ShakmatyOracle) -> Vec<String> {
    enumerate_candidates(oracle)
        .map(|candidates| candidates.into_iter().map(|c| c.san).collect())
        .unwrap_or_default()
}
