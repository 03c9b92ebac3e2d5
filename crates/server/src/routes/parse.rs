use axum::{http::StatusCode, Json};
use chess_core::parse::{self, ParseMoveFailure};
use chess_core::MoveDto;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseMoveRequest {
    pub fen: String,
    pub move_text: String,
}

/// POST /api/parse-move
pub async fn parse_move(
    Json(req): Json<ParseMoveRequest>,
) -> Result<Json<MoveDto>, (StatusCode, Json<ParseMoveFailure>)> {
    parse::parse_move(&req.fen, &req.move_text)
        .map(|mv| Json(mv.into()))
        .map_err(|failure| {
            tracing::debug!(move_text = %req.move_text, error = %failure.error, "Move not parsed");
            (StatusCode::UNPROCESSABLE_ENTITY, Json(failure))
        })
}
