use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chess_core::game_data::parse_color;
use chess_core::{AiMoveReport, Difficulty, GameSession, GameSnapshot, ResolvedMove};
use serde::{Deserialize, Serialize};
use shakmaty::Color;

use crate::error::AppError;
use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    pub fen: Option<String>,
    pub pgn: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub human_color: Option<String>,
}

/// Either squares or free-form notation.
#[derive(Debug, Default, Deserialize)]
pub struct MoveRequest {
    pub from: Option<String>,
    pub to: Option<String>,
    pub promotion: Option<String>,
    pub notation: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub id: u64,
    #[serde(flatten)]
    pub snapshot: GameSnapshot,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoView {
    /// SAN of the moves taken back, most recent first.
    pub undone: Vec<String>,
    #[serde(flatten)]
    pub game: GameView,
}

/// POST /api/games
pub async fn create_game(
    Extension(state): Extension<SharedState>,
    Json(req): Json<CreateGameRequest>,
) -> Result<Json<GameView>, AppError> {
    let human_color = match req.human_color.as_deref() {
        Some(c) => parse_color(c)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid humanColor '{c}'")))?,
        None => Color::White,
    };
    let difficulty = req.difficulty.unwrap_or_default();

    let session = match (req.fen.as_deref(), req.pgn.as_deref()) {
        (Some(_), Some(_)) => {
            return Err(AppError::BadRequest("Provide either fen or pgn, not both".to_string()))
        }
        (Some(fen), None) => GameSession::from_fen(fen, human_color, difficulty)?,
        (None, Some(pgn)) => GameSession::from_pgn(pgn, human_color, difficulty)?,
        (None, None) => GameSession::new(human_color, difficulty),
    };

    let snapshot = session.snapshot();
    let (id, _) = state.insert(session).await;
    tracing::info!(game_id = id, human = ?human_color, difficulty = difficulty.as_str(), "Game created");
    Ok(Json(GameView { id, snapshot }))
}

/// GET /api/games/{game_id}
pub async fn get_game(
    Extension(state): Extension<SharedState>,
    Path(game_id): Path<u64>,
) -> Result<Json<GameView>, AppError> {
    let session = state.get(game_id).await?;
    let snapshot = session.lock().await.snapshot();
    Ok(Json(GameView { id: game_id, snapshot }))
}

/// GET /api/games/{game_id}/pgn
pub async fn get_game_pgn(
    Extension(state): Extension<SharedState>,
    Path(game_id): Path<u64>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.get(game_id).await?;
    let pgn = session.lock().await.pgn();
    Ok(([(header::CONTENT_TYPE, "application/x-chess-pgn")], pgn))
}

/// POST /api/games/{game_id}/moves
pub async fn make_move(
    Extension(state): Extension<SharedState>,
    Path(game_id): Path<u64>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<GameView>, AppError> {
    let session = state.get(game_id).await?;
    let mut session = session.lock().await;
    session.ensure_idle()?;

    let mv = match (req.from.as_deref(), req.to.as_deref(), req.notation.as_deref()) {
        (Some(from), Some(to), _) => ResolvedMove::from_parts(from, to, req.promotion.as_deref())
            .ok_or_else(|| AppError::BadRequest(format!("Invalid move {from}-{to}")))?,
        (_, _, Some(text)) => {
            session
                .resolve_notation(text)?
                .ok_or_else(|| AppError::Unprocessable(format!("Could not understand move '{text}'")))?
                .mv
        }
        _ => {
            return Err(AppError::BadRequest(
                "Provide from and to squares or notation".to_string(),
            ))
        }
    };

    session.apply_human_move(mv)?;
    Ok(Json(GameView {
        id: game_id,
        snapshot: session.snapshot(),
    }))
}

/// POST /api/games/{game_id}/ai-move
pub async fn ai_move(
    Extension(state): Extension<SharedState>,
    Path(game_id): Path<u64>,
) -> Result<Json<AiMoveReport>, AppError> {
    let session = state.get(game_id).await?;
    let report = state
        .resolver
        .play_ai_turn(&session, state.suggester.as_ref())
        .await?;
    Ok(Json(report))
}

/// POST /api/games/{game_id}/undo
pub async fn undo_moves(
    Extension(state): Extension<SharedState>,
    Path(game_id): Path<u64>,
) -> Result<Json<UndoView>, AppError> {
    let session = state.get(game_id).await?;
    let mut session = session.lock().await;
    let report = session.undo_pair()?;
    Ok(Json(UndoView {
        undone: report.undone.into_iter().map(|m| m.san).collect(),
        game: GameView {
            id: game_id,
            snapshot: session.snapshot(),
        },
    }))
}

/// POST /api/games/{game_id}/reset
pub async fn reset_game(
    Extension(state): Extension<SharedState>,
    Path(game_id): Path<u64>,
) -> Result<Json<GameView>, AppError> {
    let session = state.get(game_id).await?;
    let mut session = session.lock().await;
    session.reset()?;
    Ok(Json(GameView {
        id: game_id,
        snapshot: session.snapshot(),
    }))
}

/// DELETE /api/games/{game_id}
pub async fn delete_game(
    Extension(state): Extension<SharedState>,
    Path(game_id): Path<u64>,
) -> Result<StatusCode, AppError> {
    state.remove(game_id).await?;
    tracing::info!(game_id, "Game deleted");
    Ok(StatusCode::NO_CONTENT)
}
