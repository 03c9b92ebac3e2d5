//! Natural-language chess move resolution.
//!
//! Turns loosely formatted move text (typically from a language model) into a
//! legal move on a [`RulesOracle`], and manages the game session around it.

pub mod enumerator;
pub mod error;
pub mod fallback;
pub mod game_data;
pub mod matcher;
pub mod notation;
pub mod oracle;
pub mod parse;
pub mod pgn;
pub mod resolver;
pub mod session;
pub mod suggest;

pub use error::{ResolveError, SessionError};
pub use game_data::{Difficulty, GameSnapshot, MoveDto, ResolvedMove};
pub use oracle::{RulesOracle, ShakmatyOracle};
pub use resolver::{AiMoveReport, MoveResolver, ResolverConfig};
pub use session::{GameSession, SharedSession, UndoReport};
pub use suggest::{MoveSuggester, PositionAnalyst};
