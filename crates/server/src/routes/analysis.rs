use axum::{Extension, Json};
use chess_core::suggest::{AnalysisReply, AnalysisRequest};
use chess_core::ShakmatyOracle;

use crate::error::AppError;
use crate::state::SharedState;

/// POST /api/analyze
pub async fn analyze_position(
    Extension(state): Extension<SharedState>,
    Json(req): Json<AnalysisRequest>,
) -> Result<Json<AnalysisReply>, AppError> {
    ShakmatyOracle::from_fen(&req.fen)?;

    let reply = state.analyst.analyze(req).await.map_err(|e| {
        tracing::warn!(error = %e, "Position analysis failed");
        AppError::ServiceUnavailable(e.to_string())
    })?;
    Ok(Json(reply))
}

#[cfg(test)]
mod tests {
    use chess_core::pgn::STANDARD_START_FEN;

    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn test_analyze_delegates_to_analyst() {
        let state = test_support::state(&[]);
        let reply = analyze_position(
            Extension(state),
            Json(AnalysisRequest {
                fen: STANDARD_START_FEN.to_string(),
                query: Some("What should white play?".to_string()),
            }),
        )
        .await
        .unwrap()
        .0;
        assert!(reply.analysis_text.contains(STANDARD_START_FEN));
        assert_eq!(reply.suggested_move.as_deref(), Some("e4"));
    }

    #[tokio::test]
    async fn test_analyze_rejects_bad_fen() {
        let state = test_support::state(&[]);
        let err = analyze_position(
            Extension(state),
            Json(AnalysisRequest {
                fen: "8/8/8".to_string(),
                query: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
