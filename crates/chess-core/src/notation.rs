//! Notation normalizer: turns language-model move text into a bare move token.
//!
//! The output is best effort. Nothing here ever fails; the worst case is the
//! trimmed input handed back unchanged.

use std::sync::LazyLock;

use regex::Regex;
use shakmaty::Role;

/// First move-shaped substring in free text. Long algebraic / coordinate forms
/// come first so `Ng1-f3` is not cut down to `Ng1`; castling is listed
/// queenside-first so `O-O-O` is not read as `O-O`.
static MOVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\b(?:",
        r"[KQRBN]?[a-h][1-8][-x]?[a-h][1-8](?:=?[QRBNqrbn])?[+#]?",
        r"|[KQRBN]?[a-h]?[1-8]?x?[a-h][1-8](?:=[QRBNqrbn])?[+#]?",
        r"|O-O-O[+#]?|O-O[+#]?|0-0-0[+#]?|0-0[+#]?",
        r")(?:\b|$|[^\w])",
    ))
    .expect("move pattern is valid")
});

/// Castling side named by a token, if the token is a castling token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastleToken {
    Kingside,
    Queenside,
}

/// Normalize a raw suggestion into a bare move token.
///
/// Trims, drops one trailing period and any trailing `!`/`?` annotation run,
/// then takes the first SAN-shaped or castling substring. Without one, the
/// first whitespace-delimited word is returned with all trailing
/// punctuation removed, so the result normalizes to itself.
pub fn normalize(raw: &str) -> String {
    let cleaned = strip_annotations(raw);
    if cleaned.is_empty() {
        return raw.trim().to_string();
    }

    if let Some(token) = extract_move(cleaned) {
        return token;
    }

    cleaned
        .split_whitespace()
        .next()
        .map(|word| word.trim_end_matches(['.', '!', '?']).to_string())
        .filter(|word| !word.is_empty())
        .unwrap_or_else(|| raw.trim().to_string())
}

/// First move-shaped substring of `text`, with any annotation glyphs removed.
pub fn extract_move(text: &str) -> Option<String> {
    let m = MOVE_RE.find(text)?;
    let token = m
        .as_str()
        .trim_end_matches(|c: char| !(c.is_ascii_alphanumeric() || c == '+' || c == '#'));
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn strip_annotations(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
    trimmed.trim_end_matches(['!', '?']).trim()
}

/// Drop trailing check / mate markers.
pub fn strip_check_suffix(token: &str) -> &str {
    token.trim_end_matches(['+', '#'])
}

/// Recognise `O-O`, `O-O-O` and the digit forms. Case-insensitive on the letter.
pub fn castle_token(token: &str) -> Option<CastleToken> {
    let bare = strip_check_suffix(token).to_ascii_uppercase().replace('0', "O");
    match bare.as_str() {
        "O-O" => Some(CastleToken::Kingside),
        "O-O-O" => Some(CastleToken::Queenside),
        _ => None,
    }
}

/// Promotion piece named after `=` in a token (`e8=Q`, `e8=n`).
pub fn requested_promotion(token: &str) -> Option<Role> {
    let (_, after) = token.split_once('=')?;
    after.chars().next().and_then(promotion_role)
}

/// Map a promotion letter (either case) to its role. Kings and pawns are not
/// promotion targets.
pub fn promotion_role(c: char) -> Option<Role> {
    match c.to_ascii_uppercase() {
        'Q' => Some(Role::Queen),
        'R' => Some(Role::Rook),
        'B' => Some(Role::Bishop),
        'N' => Some(Role::Knight),
        _ => None,
    }
}

/// Piece letter used in SAN (uppercase). Pawns have none.
pub fn piece_letter(role: Role) -> Option<char> {
    match role {
        Role::King => Some('K'),
        Role::Queen => Some('Q'),
        Role::Rook => Some('R'),
        Role::Bishop => Some('B'),
        Role::Knight => Some('N'),
        Role::Pawn => None,
    }
}

/// Role for an uppercase SAN piece letter.
pub fn role_for_letter(c: char) -> Option<Role> {
    match c {
        'K' => Some(Role::King),
        'Q' => Some(Role::Queen),
        'R' => Some(Role::Rook),
        'B' => Some(Role::Bishop),
        'N' => Some(Role::Knight),
        _ => None,
    }
}

/// Lowercase promotion suffix as used in UCI strings.
pub fn promotion_char(role: Role) -> char {
    match role {
        Role::Queen => 'q',
        Role::Rook => 'r',
        Role::Bishop => 'b',
        Role::Knight => 'n',
        Role::King => 'k',
        Role::Pawn => 'p',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_tokens_pass_through() {
        assert_eq!(normalize("e4"), "e4");
        assert_eq!(normalize("Nf3"), "Nf3");
        assert_eq!(normalize("e8=Q"), "e8=Q");
        assert_eq!(normalize("O-O-O"), "O-O-O");
        assert_eq!(normalize("0-0"), "0-0");
        assert_eq!(normalize("Qxf7#"), "Qxf7#");
    }

    #[test]
    fn test_strips_annotations() {
        assert_eq!(normalize("  Nf3!  "), "Nf3");
        assert_eq!(normalize("Bxf7+?!"), "Bxf7+");
        assert_eq!(normalize("e4."), "e4");
        assert_eq!(normalize("O-O!!"), "O-O");
    }

    #[test]
    fn test_extracts_move_from_prose() {
        assert_eq!(normalize("I will play Nf3 to develop the knight."), "Nf3");
        assert_eq!(normalize("My move: Bxf7+ winning a pawn"), "Bxf7+");
        assert_eq!(normalize("1. e4"), "e4");
        assert_eq!(normalize("Castle queenside with O-O-O now"), "O-O-O");
        assert_eq!(normalize("Move the knight Ng1-f3 please"), "Ng1-f3");
        assert_eq!(normalize("g1f3"), "g1f3");
    }

    #[test]
    fn test_lowercase_piece_not_truncated_to_pawn_move() {
        // "nf3" must not be read as the pawn move "f3".
        assert_eq!(normalize("nf3"), "nf3");
    }

    #[test]
    fn test_prose_without_move_falls_back_to_first_word() {
        assert_eq!(normalize("I think you should play the knight move"), "I");
        assert_eq!(normalize("Hmm..."), "Hmm");
        assert_eq!(normalize("Wait.! Knight to the center"), "Wait");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in [
            "e4",
            "Nf3!",
            "Let me play exd5 here.",
            "O-O-O",
            "Ng1-f3",
            "I think you should play the knight move",
            "e8=Q+",
            "Hmm...",
            "Wait.!",
            "Well?! Let me see",
            "..",
            "",
        ] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_castle_token() {
        assert_eq!(castle_token("O-O"), Some(CastleToken::Kingside));
        assert_eq!(castle_token("0-0+"), Some(CastleToken::Kingside));
        assert_eq!(castle_token("o-o-o"), Some(CastleToken::Queenside));
        assert_eq!(castle_token("0-0-0"), Some(CastleToken::Queenside));
        assert_eq!(castle_token("O-O-O-O"), None);
        assert_eq!(castle_token("Nf3"), None);
    }

    #[test]
    fn test_requested_promotion() {
        assert_eq!(requested_promotion("e8=Q"), Some(Role::Queen));
        assert_eq!(requested_promotion("exd1=n+"), Some(Role::Knight));
        assert_eq!(requested_promotion("e8"), None);
        assert_eq!(requested_promotion("e8=K"), None);
    }
}
