//! PGN export and import helpers, regex-based.

use std::sync::LazyLock;

use regex::Regex;

use crate::game_data::OracleState;

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("header pattern is valid"));
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^}]*\}").expect("comment pattern is valid"));
static VARIATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("variation pattern is valid"));
static SAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[KQRBN]?[a-h]?[1-8]?x?[a-h][1-8](?:=[QRBN])?[+#]?|O-O-O[+#]?|O-O[+#]?")
        .expect("SAN pattern is valid")
});

/// Seven-tag roster plus the setup tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgnHeaders {
    pub event: String,
    pub site: String,
    pub date: String,
    pub white: String,
    pub black: String,
    pub result: String,
    /// Starting position, when it is not the standard one.
    pub fen: Option<String>,
}

/// Result token for the current state: `1-0`, `0-1`, `1/2-1/2` or `*`.
pub fn game_result(state: &OracleState) -> &'static str {
    if state.is_checkmate {
        // The side to move has been mated.
        if state.turn == "white" {
            "0-1"
        } else {
            "1-0"
        }
    } else if state.is_draw {
        "1/2-1/2"
    } else {
        "*"
    }
}

/// Render headers and SAN movetext as a PGN string.
pub fn format_pgn(headers: &PgnHeaders, sans: &[String]) -> String {
    let mut out = String::new();
    let mut tag = |name: &str, value: &str| {
        out.push_str(&format!("[{name} \"{}\"]\n", value.replace('"', "'")));
    };
    tag("Event", &headers.event);
    tag("Site", &headers.site);
    tag("Date", &headers.date);
    tag("Round", "-");
    tag("White", &headers.white);
    tag("Black", &headers.black);
    tag("Result", &headers.result);
    if let Some(fen) = headers.fen.as_deref().filter(|f| *f != STANDARD_START_FEN) {
        tag("SetUp", "1");
        tag("FEN", fen);
    }
    out.push('\n');

    let (mut black_to_move, mut number) = headers
        .fen
        .as_deref()
        .map(move_counters)
        .unwrap_or((false, 1));

    let mut tokens: Vec<String> = Vec::with_capacity(sans.len() + sans.len() / 2 + 1);
    for (i, san) in sans.iter().enumerate() {
        if !black_to_move {
            tokens.push(format!("{number}."));
        } else if i == 0 {
            tokens.push(format!("{number}..."));
        }
        tokens.push(san.clone());
        if black_to_move {
            number += 1;
        }
        black_to_move = !black_to_move;
    }
    tokens.push(headers.result.clone());
    out.push_str(&tokens.join(" "));
    out.push('\n');
    out
}

/// Side to move and full-move number from a FEN string.
fn move_counters(fen: &str) -> (bool, u32) {
    let fields: Vec<&str> = fen.split_whitespace().collect();
    let black = fields.get(1) == Some(&"b");
    let number = fields
        .get(5)
        .and_then(|n| n.parse().ok())
        .filter(|n| *n > 0)
        .unwrap_or(1);
    (black, number)
}

/// Extract SAN moves from PGN text (after removing headers, comments, variations).
pub fn extract_moves(pgn: &str) -> Vec<String> {
    let no_headers = HEADER_RE.replace_all(pgn, "");
    let no_comments = COMMENT_RE.replace_all(&no_headers, "");
    let no_variations = VARIATION_RE.replace_all(&no_comments, "");

    SAN_RE
        .find_iter(&no_variations)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Extract a string value from a PGN header (e.g. FEN, White).
pub fn extract_header(pgn: &str, header_name: &str) -> Option<String> {
    let pattern = format!(r#"\[{}\s+"([^"]*)"\]"#, regex::escape(header_name));
    let re = Regex::new(&pattern).ok()?;
    let value = re.captures(pgn)?.get(1)?.as_str().to_string();
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(fen: Option<&str>, result: &str) -> PgnHeaders {
        PgnHeaders {
            event: "Casual Game".to_string(),
            site: "LLM Chess".to_string(),
            date: "2025.01.15".to_string(),
            white: "Human".to_string(),
            black: "AI (expert)".to_string(),
            result: result.to_string(),
            fen: fen.map(str::to_string),
        }
    }

    fn sans(moves: &[&str]) -> Vec<String> {
        moves.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_format_standard_game() {
        let pgn = format_pgn(&headers(None, "*"), &sans(&["e4", "e5", "Nf3"]));
        assert!(pgn.starts_with("[Event \"Casual Game\"]\n"));
        assert!(pgn.contains("[Result \"*\"]"));
        assert!(!pgn.contains("[FEN"));
        assert!(pgn.ends_with("1. e4 e5 2. Nf3 *\n"));
    }

    #[test]
    fn test_format_from_black_to_move() {
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
        let pgn = format_pgn(&headers(Some(fen), "*"), &sans(&["c5", "Nf3", "d6"]));
        assert!(pgn.contains("[SetUp \"1\"]"));
        assert!(pgn.contains(&format!("[FEN \"{fen}\"]")));
        assert!(pgn.ends_with("1... c5 2. Nf3 d6 *\n"));
    }

    #[test]
    fn test_standard_fen_header_omitted() {
        let pgn = format_pgn(&headers(Some(STANDARD_START_FEN), "*"), &[]);
        assert!(!pgn.contains("SetUp"));
        assert!(pgn.ends_with("\n*\n"));
    }

    #[test]
    fn test_extract_moves_skips_comments_and_variations() {
        let pgn = r#"[White "Player1"]
[Black "Player2"]
[Result "1-0"]

1. e4 {best by test} e5 (1... c5 2. Nf3) 2. Nf3 Nc6 3. O-O-O exd8=Q+ 1-0"#;

        let moves = extract_moves(pgn);
        assert_eq!(moves, vec!["e4", "e5", "Nf3", "Nc6", "O-O-O", "exd8=Q+"]);
    }

    #[test]
    fn test_format_then_extract_moves() {
        let moves = sans(&["d4", "Nf6", "c4", "e6", "Nc3", "Bb4"]);
        let pgn = format_pgn(&headers(None, "*"), &moves);
        assert_eq!(extract_moves(&pgn), moves);
        assert_eq!(extract_header(&pgn, "White").as_deref(), Some("Human"));
        assert_eq!(extract_header(&pgn, "Annotator"), None);
    }
}
