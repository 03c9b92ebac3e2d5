//! Candidate move enumeration.
//!
//! Every legal (from, to) pair is played on the oracle, the SAN the oracle
//! assigns is recorded, and the move is taken back. The SAN is therefore
//! ground truth for what a notation token should map to.

use shakmaty::{Color, Rank, Role, Square};

use crate::error::ResolveError;
use crate::game_data::ResolvedMove;
use crate::notation::strip_check_suffix;
use crate::oracle::{AppliedMove, RulesOracle};

/// Promotion pieces in the order candidates are generated.
pub const PROMOTION_ORDER: [Role; 4] = [Role::Queen, Role::Rook, Role::Bishop, Role::Knight];

/// A legal move in a specific position, paired with its oracle SAN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveCandidate {
    pub from: Square,
    pub to: Square,
    pub san: String,
    pub role: Role,
    pub promotion: Option<Role>,
}

impl MoveCandidate {
    pub fn resolved(&self) -> ResolvedMove {
        ResolvedMove::new(self.from, self.to, self.promotion)
    }

    /// SAN without the `+` / `#` marker.
    pub fn bare_san(&self) -> &str {
        strip_check_suffix(&self.san)
    }
}

/// A move played on the oracle that is taken back when the guard drops,
/// whichever way the caller leaves.
struct Speculation<'a, O: RulesOracle + ?Sized> {
    oracle: &'a mut O,
}

impl<'a, O: RulesOracle + ?Sized> Speculation<'a, O> {
    fn play(
        oracle: &'a mut O,
        from: Square,
        to: Square,
        promotion: Option<Role>,
    ) -> Result<Self, ResolveError> {
        oracle.apply_move(from, to, promotion).map_err(|e| {
            ResolveError::OracleInvariantViolation(format!(
                "oracle rejected its own legal move {}: {e}",
                ResolvedMove::new(from, to, promotion)
            ))
        })?;
        Ok(Self { oracle })
    }

    fn applied(&self) -> Option<&AppliedMove> {
        self.oracle.last_applied()
    }
}

impl<O: RulesOracle + ?Sized> Drop for Speculation<'_, O> {
    fn drop(&mut self) {
        if let Err(e) = self.oracle.undo() {
            tracing::error!(error = %e, "Failed to revert speculative move");
        }
    }
}

/// Whether a pawn landing on `to` promotes for the side to move.
pub fn is_promotion_square(role: Role, to: Square, turn: Color) -> bool {
    role == Role::Pawn
        && match turn {
            Color::White => to.rank() == Rank::Eighth,
            Color::Black => to.rank() == Rank::First,
        }
}

/// Enumerate every legal move of the current position with its SAN.
///
/// Promoting pawn moves yield one candidate per promotion piece. The oracle
/// is left exactly as it was found; anything else is an invariant violation.
pub fn enumerate_candidates<O: RulesOracle + ?Sized>(
    oracle: &mut O,
) -> Result<Vec<MoveCandidate>, ResolveError> {
    let before = oracle.fen();
    let turn = oracle.turn();
    let legal = oracle.legal_moves_by_origin();
    let mut candidates = Vec::with_capacity(legal.len());

    for (from, targets) in legal.iter() {
        let role = oracle.piece_at(from).map(|p| p.role).ok_or_else(|| {
            ResolveError::OracleInvariantViolation(format!(
                "legal move listed from empty square {from}"
            ))
        })?;

        for &to in targets {
            let promotions: &[Option<Role>] = if is_promotion_square(role, to, turn) {
                &[
                    Some(PROMOTION_ORDER[0]),
                    Some(PROMOTION_ORDER[1]),
                    Some(PROMOTION_ORDER[2]),
                    Some(PROMOTION_ORDER[3]),
                ]
            } else {
                &[None]
            };

            for &promotion in promotions {
                let speculation = Speculation::play(oracle, from, to, promotion)?;
                let san = speculation
                    .applied()
                    .map(|applied| applied.san.clone())
                    .ok_or_else(|| {
                        ResolveError::OracleInvariantViolation(
                            "oracle reported no SAN for an applied move".to_string(),
                        )
                    })?;
                drop(speculation);

                candidates.push(MoveCandidate {
                    from,
                    to,
                    san,
                    role,
                    promotion,
                });
            }
        }
    }

    let after = oracle.fen();
    if after != before {
        return Err(ResolveError::OracleInvariantViolation(format!(
            "position changed during enumeration: {before} -> {after}"
        )));
    }

    tracing::debug!(count = candidates.len(), "Enumerated candidate moves");
    Ok(candidates)
}
