use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shakmaty::{Color, Role, Square};

use crate::notation::{promotion_char, promotion_role};

/// A move pinned to concrete squares. `promotion` is only ever set for a pawn
/// reaching the last rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
}

impl ResolvedMove {
    pub fn new(from: Square, to: Square, promotion: Option<Role>) -> Self {
        Self { from, to, promotion }
    }

    /// Parse wire-form squares (`"e7"`, `"e8"`, `Some("q")`).
    pub fn from_parts(from: &str, to: &str, promotion: Option<&str>) -> Option<Self> {
        let from = Square::from_str(from.trim()).ok()?;
        let to = Square::from_str(to.trim()).ok()?;
        let promotion = match promotion.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => Some(promotion_role(p.chars().next()?)?),
            None => None,
        };
        Some(Self { from, to, promotion })
    }
}

impl fmt::Display for ResolvedMove {
    /// UCI form, e.g. `e7e8q`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(role) = self.promotion {
            write!(f, "{}", promotion_char(role))?;
        }
        Ok(())
    }
}

/// JSON shape of a resolved move: `{"from": "e7", "to": "e8", "promotion": "q"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveDto {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub promotion: Option<String>,
}

impl From<ResolvedMove> for MoveDto {
    fn from(mv: ResolvedMove) -> Self {
        Self {
            from: mv.from.to_string(),
            to: mv.to.to_string(),
            promotion: mv.promotion.map(|r| promotion_char(r).to_string()),
        }
    }
}

/// Strength the language model is asked to play at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
    Expert,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
            Difficulty::Expert => "expert",
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            "expert" => Ok(Difficulty::Expert),
            other => Err(format!("unknown difficulty '{other}'")),
        }
    }
}

pub fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "white",
        Color::Black => "black",
    }
}

pub fn parse_color(s: &str) -> Option<Color> {
    match s.trim().to_ascii_lowercase().as_str() {
        "white" | "w" => Some(Color::White),
        "black" | "b" => Some(Color::Black),
        _ => None,
    }
}

/// One applied move as recorded in the game history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub from: String,
    pub to: String,
    pub san: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub promotion: Option<String>,
    pub fen_after: String,
}

/// Everything the rules oracle reports about the current position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleState {
    pub fen: String,
    pub turn: String,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_stalemate: bool,
    pub is_draw: bool,
    pub is_game_over: bool,
    pub history: Vec<HistoryEntry>,
    pub legal_moves: BTreeMap<String, Vec<String>>,
}

/// Who currently holds the move-initiating controls of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Controller {
    Human,
    Ai,
}

/// Immutable view of a game session handed to callers and the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    #[serde(flatten)]
    pub position: OracleState,
    pub human_color: String,
    pub difficulty: Difficulty,
    pub controller: Controller,
    pub is_loading: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_error: Option<String>,
}
