//! Error types for move resolution and session handling

use thiserror::Error;

use crate::oracle::OracleError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("AI is thinking; wait for the current move to finish")]
    Busy,

    #[error("Game is over")]
    GameOver,

    #[error("It is not {0}'s turn to move")]
    NotYourTurn(&'static str),

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No strategy could turn the suggestion into a legal move, retries included.
    #[error("Could not understand AI move '{notation}' after {attempts} attempt(s)")]
    MalformedNotation { notation: String, attempts: u32 },

    /// The oracle refused a move at the applying stage.
    #[error("AI move '{notation}' was rejected: {reason}")]
    IllegalMove { notation: String, reason: String },

    #[error("Rules oracle invariant violated: {0}")]
    OracleInvariantViolation(String),

    #[error("Move suggestion service unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ResolveError {
    /// Rejected because another resolution is already in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, ResolveError::Session(SessionError::Busy))
    }
}
