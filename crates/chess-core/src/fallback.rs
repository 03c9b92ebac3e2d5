//! Fallback heuristics for tokens the matcher could not place.
//!
//! These work straight off the oracle's legal-move map and board rather than
//! the enumerated SAN, so they catch notation no SAN string will ever equal:
//! coordinates, `e8Q`, `ed5`, piece names spelled out in prose.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use shakmaty::{Color, Role, Square};

use crate::enumerator::is_promotion_square;
use crate::game_data::ResolvedMove;
use crate::matcher::{castle_squares, Ambiguity, MatchOutcome, Strategy};
use crate::notation::{castle_token, promotion_role, role_for_letter, strip_check_suffix};
use crate::oracle::{LegalMoveMap, RulesOracle};

static COORDINATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[KQRBN]?([a-h][1-8])[-x]?([a-h][1-8])=?([QRBN])?$")
        .expect("coordinate pattern is valid")
});

static PROMOTION_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:([a-h])x?)?([a-h][18])=?([QRBNqrbn])$").expect("promotion pattern is valid")
});

static PIECE_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([KQRBNkqrn])[^a-h]*([a-h][1-8])$").expect("piece token pattern is valid")
});

static PIECE_PROSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(king|queen|rook|bishop|knight)\b[^.]*?\b([a-h][1-8])\b")
        .expect("piece prose pattern is valid")
});

static PAWN_PUSH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-h][1-8])$").expect("pawn push pattern is valid"));

static PAWN_CAPTURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-h])x?([a-h][1-8])(?:\s*e\.?p\.?)?$").expect("pawn capture pattern is valid")
});

/// The slice of oracle state the heuristics read.
struct BoardView<'a, O: RulesOracle + ?Sized> {
    oracle: &'a O,
    legal: LegalMoveMap,
    turn: Color,
}

impl<O: RulesOracle + ?Sized> BoardView<'_, O> {
    fn role_at(&self, square: Square) -> Option<Role> {
        self.oracle
            .piece_at(square)
            .filter(|p| p.color == self.turn)
            .map(|p| p.role)
    }

    /// Origins of the side to move's `role` pieces that can reach `dest`.
    fn origins(&self, role: Role, dest: Square) -> Vec<Square> {
        self.legal
            .iter()
            .filter(|(from, targets)| self.role_at(*from) == Some(role) && targets.contains(&dest))
            .map(|(from, _)| from)
            .collect()
    }

    fn promotion_for(&self, from: Square, to: Square, requested: Option<Role>) -> Option<Role> {
        match self.role_at(from) {
            Some(role) if is_promotion_square(role, to, self.turn) => {
                Some(requested.unwrap_or(Role::Queen))
            }
            _ => None,
        }
    }

    fn outcome(
        &self,
        strategy: Strategy,
        origins: &[Square],
        to: Square,
        requested: Option<Role>,
    ) -> Option<MatchOutcome> {
        let from = *origins.first()?;
        let ambiguity = match origins.len() {
            1 => Ambiguity::Unique,
            n => Ambiguity::Ambiguous { candidates: n },
        };
        Some(MatchOutcome {
            mv: ResolvedMove::new(from, to, self.promotion_for(from, to, requested)),
            san: None,
            strategy,
            ambiguity,
        })
    }
}

/// Try the heuristics in order against the current position. `raw` is the
/// unnormalized suggestion, consulted for piece names written out in words.
pub fn resolve_fallback<O: RulesOracle + ?Sized>(
    token: &str,
    raw: &str,
    oracle: &O,
) -> Option<MatchOutcome> {
    let view = BoardView {
        oracle,
        legal: oracle.legal_moves_by_origin(),
        turn: oracle.turn(),
    };
    if view.legal.is_empty() {
        return None;
    }
    let bare = strip_check_suffix(token.trim());

    coordinate(&view, bare)
        .or_else(|| castling(&view, bare))
        .or_else(|| promotion_suffix(&view, bare))
        .or_else(|| piece_brute_force(&view, bare, raw))
        .or_else(|| pawn_push(&view, bare))
        .or_else(|| pawn_capture(&view, bare))
}

fn parse_square(s: &str) -> Option<Square> {
    Square::from_str(&s.to_ascii_lowercase()).ok()
}

fn coordinate<O: RulesOracle + ?Sized>(view: &BoardView<'_, O>, token: &str) -> Option<MatchOutcome> {
    let caps = COORDINATE_RE.captures(token)?;
    let from = parse_square(caps.get(1)?.as_str())?;
    let to = parse_square(caps.get(2)?.as_str())?;
    if !view.legal.contains(from, to) {
        return None;
    }
    let requested = caps
        .get(3)
        .and_then(|m| m.as_str().chars().next())
        .and_then(promotion_role);
    view.outcome(Strategy::Coordinate, &[from], to, requested)
}

fn castling<O: RulesOracle + ?Sized>(view: &BoardView<'_, O>, token: &str) -> Option<MatchOutcome> {
    let (from, to) = castle_squares(castle_token(token)?, view.turn);
    if view.legal.contains(from, to) && view.role_at(from) == Some(Role::King) {
        view.outcome(Strategy::Castling, &[from], to, None)
    } else {
        None
    }
}

fn promotion_suffix<O: RulesOracle + ?Sized>(
    view: &BoardView<'_, O>,
    token: &str,
) -> Option<MatchOutcome> {
    let caps = PROMOTION_SUFFIX_RE.captures(token)?;
    let to = parse_square(caps.get(2)?.as_str())?;
    let requested = promotion_role(caps.get(3)?.as_str().chars().next()?)?;
    let from_file = caps.get(1).map(|m| m.as_str());
    if !is_promotion_square(Role::Pawn, to, view.turn) {
        return None;
    }

    let pawns: Vec<Square> = view
        .origins(Role::Pawn, to)
        .into_iter()
        .filter(|from| from_file.map_or(true, |file| from.to_string().starts_with(file)))
        .collect();
    let pawns = prefer_same_file(pawns, to);
    view.outcome(Strategy::PromotionSuffix, &pawns, to, Some(requested))
}

fn piece_brute_force<O: RulesOracle + ?Sized>(
    view: &BoardView<'_, O>,
    token: &str,
    raw: &str,
) -> Option<MatchOutcome> {
    let (role, to) = piece_from_token(token).or_else(|| piece_from_prose(raw))?;
    let origins = view.origins(role, to);
    view.outcome(Strategy::PieceBruteForce, &origins, to, None)
}

fn piece_from_token(token: &str) -> Option<(Role, Square)> {
    let caps = PIECE_TOKEN_RE.captures(token)?;
    let letter = caps.get(1)?.as_str().chars().next()?.to_ascii_uppercase();
    Some((role_for_letter(letter)?, parse_square(caps.get(2)?.as_str())?))
}

fn piece_from_prose(raw: &str) -> Option<(Role, Square)> {
    let caps = PIECE_PROSE_RE.captures(raw)?;
    let role = match caps.get(1)?.as_str().to_ascii_lowercase().as_str() {
        "king" => Role::King,
        "queen" => Role::Queen,
        "rook" => Role::Rook,
        "bishop" => Role::Bishop,
        "knight" => Role::Knight,
        _ => return None,
    };
    Some((role, parse_square(caps.get(2)?.as_str())?))
}

fn pawn_push<O: RulesOracle + ?Sized>(view: &BoardView<'_, O>, token: &str) -> Option<MatchOutcome> {
    let caps = PAWN_PUSH_RE.captures(token)?;
    let to = parse_square(caps.get(1)?.as_str())?;
    let pawns = prefer_same_file(view.origins(Role::Pawn, to), to);
    view.outcome(Strategy::PawnPush, &pawns, to, None)
}

fn pawn_capture<O: RulesOracle + ?Sized>(
    view: &BoardView<'_, O>,
    token: &str,
) -> Option<MatchOutcome> {
    let caps = PAWN_CAPTURE_RE.captures(token)?;
    let file = caps.get(1)?.as_str();
    let to = parse_square(caps.get(2)?.as_str())?;
    if to.to_string().starts_with(file) {
        return None;
    }
    let pawns: Vec<Square> = view
        .origins(Role::Pawn, to)
        .into_iter()
        .filter(|from| from.to_string().starts_with(file))
        .collect();
    view.outcome(Strategy::PawnCapture, &pawns, to, None)
}

/// Pushes on the destination's file first; captures only when no push exists.
fn prefer_same_file(origins: Vec<Square>, to: Square) -> Vec<Square> {
    let same_file: Vec<Square> = origins
        .iter()
        .copied()
        .filter(|from| from.file() == to.file())
        .collect();
    if same_file.is_empty() {
        origins
    } else {
        same_file
    }
}
