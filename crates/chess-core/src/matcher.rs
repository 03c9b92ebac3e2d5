//! Move matcher: maps a normalized token onto one enumerated candidate.
//!
//! Strategies run in a fixed order and the first hit wins:
//!
//! 1. exact SAN
//! 2. case-insensitive SAN
//! 3. SAN with `+`/`#` stripped
//! 4. piece letter + destination (`Nf3`), with
//! 5. file/rank disambiguation (`Nbd2`)
//! 6. castling tokens against the king's fixed squares
//! 7. bare destination for pawns (`e4`)
//! 8. capture by destination (`Bxf7`)
//!
//! When several candidates survive, the first in enumeration order is taken
//! and the outcome is flagged [`Ambiguity::Ambiguous`] so callers can report it.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use shakmaty::{Color, Role, Square};

use crate::enumerator::MoveCandidate;
use crate::game_data::ResolvedMove;
use crate::notation::{
    castle_token, requested_promotion, role_for_letter, strip_check_suffix, CastleToken,
};

static PIECE_DEST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([KQRBN])([a-h1-8])?([a-h][1-8])$").expect("piece pattern is valid")
});

static SQUARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-h][1-8]$").expect("square pattern is valid"));

/// Which rule produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    ExactSan,
    CaseInsensitiveSan,
    SuffixStrippedSan,
    PieceDestination,
    Disambiguated,
    Castling,
    PawnDestination,
    CaptureDestination,
    Coordinate,
    PromotionSuffix,
    PieceBruteForce,
    PawnPush,
    PawnCapture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Ambiguity {
    Unique,
    /// Several legal moves fit; the first in enumeration order was chosen.
    Ambiguous { candidates: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub mv: ResolvedMove,
    /// Oracle SAN when the match came from an enumerated candidate.
    pub san: Option<String>,
    pub strategy: Strategy,
    pub ambiguity: Ambiguity,
}

impl MatchOutcome {
    pub fn is_ambiguous(&self) -> bool {
        matches!(self.ambiguity, Ambiguity::Ambiguous { .. })
    }
}

/// King origin and destination for a castling side.
pub fn castle_squares(side: CastleToken, turn: Color) -> (Square, Square) {
    match (turn, side) {
        (Color::White, CastleToken::Kingside) => (Square::E1, Square::G1),
        (Color::White, CastleToken::Queenside) => (Square::E1, Square::C1),
        (Color::Black, CastleToken::Kingside) => (Square::E8, Square::G8),
        (Color::Black, CastleToken::Queenside) => (Square::E8, Square::C8),
    }
}

/// Match `token` against `candidates`. `None` means no strategy applied,
/// which is an expected outcome, not an error.
pub fn match_notation(
    token: &str,
    candidates: &[MoveCandidate],
    turn: Color,
) -> Option<MatchOutcome> {
    let token = token.trim();
    if token.is_empty() || candidates.is_empty() {
        return None;
    }

    let outcome = exact_san(token, candidates)
        .or_else(|| case_insensitive_san(token, candidates))
        .or_else(|| suffix_stripped_san(token, candidates))
        .or_else(|| piece_destination(token, candidates))
        .or_else(|| castling(token, candidates, turn))
        .or_else(|| pawn_destination(token, candidates))
        .or_else(|| capture_destination(token, candidates))?;

    Some(with_requested_promotion(token, outcome, candidates))
}

/// Outcome for the first of `matches` after collapsing promotion variants.
fn pick(strategy: Strategy, matches: Vec<&MoveCandidate>) -> Option<MatchOutcome> {
    let mut distinct: Vec<&MoveCandidate> = Vec::with_capacity(matches.len());
    for c in matches {
        if !distinct.iter().any(|d| d.from == c.from && d.to == c.to) {
            distinct.push(c);
        }
    }

    let first = distinct.first()?;
    let ambiguity = match distinct.len() {
        1 => Ambiguity::Unique,
        n => Ambiguity::Ambiguous { candidates: n },
    };
    Some(MatchOutcome {
        mv: first.resolved(),
        san: Some(first.san.clone()),
        strategy,
        ambiguity,
    })
}

fn exact_san(token: &str, candidates: &[MoveCandidate]) -> Option<MatchOutcome> {
    let found = candidates.iter().find(|c| c.san == token)?;
    pick(Strategy::ExactSan, vec![found])
}

fn case_insensitive_san(token: &str, candidates: &[MoveCandidate]) -> Option<MatchOutcome> {
    let found = candidates
        .iter()
        .filter(|c| c.san.eq_ignore_ascii_case(token))
        .collect();
    pick(Strategy::CaseInsensitiveSan, found)
}

fn suffix_stripped_san(token: &str, candidates: &[MoveCandidate]) -> Option<MatchOutcome> {
    let bare = strip_check_suffix(token);
    let found = candidates.iter().filter(|c| c.bare_san() == bare).collect();
    pick(Strategy::SuffixStrippedSan, found)
}

fn piece_destination(token: &str, candidates: &[MoveCandidate]) -> Option<MatchOutcome> {
    let caps = PIECE_DEST_RE.captures(strip_check_suffix(token))?;
    let letter = caps.get(1)?.as_str().chars().next()?;
    let role = role_for_letter(letter)?;
    let dest = Square::from_str(caps.get(3)?.as_str()).ok()?;

    let reaching: Vec<&MoveCandidate> = candidates
        .iter()
        .filter(|c| c.role == role && c.san.starts_with(letter) && c.to == dest)
        .collect();
    if reaching.is_empty() {
        return None;
    }

    match caps.get(2).and_then(|m| m.as_str().chars().next()) {
        Some(disambiguator) => {
            let narrowed: Vec<&MoveCandidate> = reaching
                .into_iter()
                .filter(|c| origin_matches(c.from, disambiguator))
                .collect();
            pick(Strategy::Disambiguated, narrowed)
        }
        None => pick(Strategy::PieceDestination, reaching),
    }
}

/// File letters match the origin's file, rank digits its rank.
fn origin_matches(origin: Square, disambiguator: char) -> bool {
    let name = origin.to_string();
    if disambiguator.is_ascii_digit() {
        name.ends_with(disambiguator)
    } else {
        name.starts_with(disambiguator)
    }
}

fn castling(token: &str, candidates: &[MoveCandidate], turn: Color) -> Option<MatchOutcome> {
    let side = castle_token(token)?;
    let (from, to) = castle_squares(side, turn);
    let found = candidates
        .iter()
        .find(|c| c.role == Role::King && c.from == from && c.to == to)?;
    pick(Strategy::Castling, vec![found])
}

fn pawn_destination(token: &str, candidates: &[MoveCandidate]) -> Option<MatchOutcome> {
    let bare = strip_check_suffix(token);
    if !SQUARE_RE.is_match(bare) {
        return None;
    }
    let dest = Square::from_str(bare).ok()?;
    let outcome = pick(
        Strategy::PawnDestination,
        candidates
            .iter()
            .filter(|c| c.role == Role::Pawn && c.to == dest)
            .collect(),
    )?;
    // Only an unambiguous pawn move counts here.
    if outcome.is_ambiguous() {
        None
    } else {
        Some(outcome)
    }
}

fn capture_destination(token: &str, candidates: &[MoveCandidate]) -> Option<MatchOutcome> {
    let (head, tail) = token.split_once('x')?;
    let tail = strip_check_suffix(tail);
    let tail = tail.split_once('=').map_or(tail, |(square, _)| square);
    let dest = Square::from_str(tail).ok()?;

    let landing: Vec<&MoveCandidate> = candidates.iter().filter(|c| c.to == dest).collect();

    // Prefer the piece the token names before the `x`, when it can get there.
    let preferred: Vec<&MoveCandidate> = match head.chars().next() {
        Some(letter) if role_for_letter(letter).is_some() => {
            let role = role_for_letter(letter);
            landing.iter().copied().filter(|c| Some(c.role) == role).collect()
        }
        Some(file) if ('a'..='h').contains(&file) => landing
            .iter()
            .copied()
            .filter(|c| c.role == Role::Pawn && origin_matches(c.from, file))
            .collect(),
        _ => Vec::new(),
    };

    if preferred.is_empty() {
        pick(Strategy::CaptureDestination, landing)
    } else {
        pick(Strategy::CaptureDestination, preferred)
    }
}

/// Honour an explicit `=X` on a promoting move, whatever strategy matched.
fn with_requested_promotion(
    token: &str,
    mut outcome: MatchOutcome,
    candidates: &[MoveCandidate],
) -> MatchOutcome {
    let Some(role) = requested_promotion(token) else {
        return outcome;
    };
    if outcome.mv.promotion.is_none() {
        return outcome;
    }
    if let Some(variant) = candidates.iter().find(|c| {
        c.from == outcome.mv.from && c.to == outcome.mv.to && c.promotion == Some(role)
    }) {
        outcome.mv.promotion = Some(role);
        outcome.san = Some(variant.san.clone());
    }
    outcome
}
