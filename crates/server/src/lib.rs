pub mod clients;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

use axum::{routing::{get, post}, Extension, Router};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};

use crate::state::SharedState;

/// Full HTTP surface. Specific routes come before parameterized ones.
pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        // Games
        .route("/api/games", post(routes::games::create_game))
        .route(
            "/api/games/{game_id}",
            get(routes::games::get_game).delete(routes::games::delete_game),
        )
        .route("/api/games/{game_id}/pgn", get(routes::games::get_game_pgn))
        .route("/api/games/{game_id}/moves", post(routes::games::make_move))
        .route("/api/games/{game_id}/ai-move", post(routes::games::ai_move))
        .route("/api/games/{game_id}/undo", post(routes::games::undo_moves))
        .route("/api/games/{game_id}/reset", post(routes::games::reset_game))
        // Stateless helpers
        .route("/api/parse-move", post(routes::parse::parse_move))
        .route("/api/analyze", post(routes::analysis::analyze_position))
        .layer(Extension(state))
        .layer(CompressionLayer::new())
        .layer(cors)
}
