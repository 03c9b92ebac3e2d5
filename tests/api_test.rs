/// End-to-end tests over HTTP against an in-process server with scripted
/// LLM collaborators.
mod common;

use reqwest::StatusCode;
use serde_json::{json, Value};

async fn create_game(base: &str, body: Value) -> Value {
    let resp = common::client()
        .post(format!("{base}/api/games"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn test_health() {
    let base = common::spawn_server(common::state(&[])).await;
    let body: Value = common::client()
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_full_turn_cycle() {
    let base = common::spawn_server(common::state(&["I'll answer with ...e5!"])).await;
    let client = common::client();

    let game = create_game(&base, json!({"difficulty": "beginner"})).await;
    let id = game["id"].as_u64().unwrap();
    assert_eq!(game["turn"], "white");
    assert_eq!(game["difficulty"], "beginner");

    let resp = client
        .post(format!("{base}/api/games/{id}/moves"))
        .json(&json!({"from": "e2", "to": "e4"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let report: Value = client
        .post(format!("{base}/api/games/{id}/ai-move"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["san"], "e5");
    assert_eq!(report["resolved"], json!({"from": "e7", "to": "e5"}));
    assert_eq!(report["attempts"], 1);
    assert_eq!(report["snapshot"]["isLoading"], false);

    let pgn = client
        .get(format!("{base}/api/games/{id}/pgn"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(pgn.contains("1. e4 e5 *"));

    let undo: Value = client
        .post(format!("{base}/api/games/{id}/undo"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(undo["undone"], json!(["e5", "e4"]));
    assert_eq!(undo["history"], json!([]));
}

#[tokio::test]
async fn test_errors_use_detail_body() {
    let base = common::spawn_server(common::state(&[])).await;
    let client = common::client();

    let resp = client.get(format!("{base}/api/games/42")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("42"));

    let game = create_game(&base, json!({})).await;
    let id = game["id"].as_u64().unwrap();
    let resp = client
        .post(format!("{base}/api/games/{id}/moves"))
        .json(&json!({"notation": "Qh5"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // AI does not move on the human's turn.
    let resp = client
        .post(format!("{base}/api/games/{id}/ai-move"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_ai_failure_hands_turn_back() {
    // The suggester runs dry after one unusable reply.
    let base = common::spawn_server(common::state(&["pass"])).await;
    let client = common::client();

    let game = create_game(&base, json!({"humanColor": "black"})).await;
    let id = game["id"].as_u64().unwrap();

    let resp = client
        .post(format!("{base}/api/games/{id}/ai-move"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let game: Value = client
        .get(format!("{base}/api/games/{id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(game["isLoading"], false);
    assert_eq!(game["controller"], "human");
    assert!(game["lastError"].as_str().unwrap().contains("exhausted"));
    assert_eq!(game["history"], json!([]));
}

#[tokio::test]
async fn test_parse_move_service() {
    let base = common::spawn_server(common::state(&[])).await;
    let client = common::client();
    let fen = "8/4P3/8/8/8/8/k7/4K3 w - - 0 1";

    let body: Value = client
        .post(format!("{base}/api/parse-move"))
        .json(&json!({"fen": fen, "moveText": "e8=N+"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({"from": "e7", "to": "e8", "promotion": "n"}));

    let resp = client
        .post(format!("{base}/api/parse-move"))
        .json(&json!({"fen": fen, "moveText": "Nf3"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
    assert!(body["availableMoves"]
        .as_array()
        .unwrap()
        .contains(&json!("e8=Q")));
}

#[tokio::test]
async fn test_analysis_unavailable() {
    let base = common::spawn_server(common::state(&[])).await;
    let resp = common::client()
        .post(format!("{base}/api/analyze"))
        .json(&json!({"fen": chess_core::pgn::STANDARD_START_FEN}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "analysis offline");
}

#[tokio::test]
async fn test_delete_game() {
    let base = common::spawn_server(common::state(&[])).await;
    let client = common::client();
    let game = create_game(&base, json!({})).await;
    let id = game["id"].as_u64().unwrap();

    let resp = client
        .delete(format!("{base}/api/games/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client.get(format!("{base}/api/games/{id}")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
