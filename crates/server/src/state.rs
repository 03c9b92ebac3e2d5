use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chess_core::{GameSession, MoveResolver, MoveSuggester, PositionAnalyst, SharedSession};
use tokio::sync::RwLock;

use crate::error::AppError;

/// Everything handlers share: live games and the LLM collaborators.
pub struct AppState {
    sessions: RwLock<HashMap<u64, SharedSession>>,
    next_id: AtomicU64,
    pub resolver: MoveResolver,
    pub suggester: Arc<dyn MoveSuggester>,
    pub analyst: Arc<dyn PositionAnalyst>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        resolver: MoveResolver,
        suggester: Arc<dyn MoveSuggester>,
        analyst: Arc<dyn PositionAnalyst>,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            resolver,
            suggester,
            analyst,
        }
    }

    pub async fn insert(&self, session: GameSession) -> (u64, SharedSession) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let shared = session.into_shared();
        self.sessions.write().await.insert(id, shared.clone());
        (id, shared)
    }

    pub async fn get(&self, id: u64) -> Result<SharedSession, AppError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Game {id} not found")))
    }

    /// Drop a game. A game with an AI move in flight is kept.
    pub async fn remove(&self, id: u64) -> Result<(), AppError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Game {id} not found")))?;
        session.lock().await.ensure_idle()?;
        sessions.remove(&id);
        Ok(())
    }

    /// Drop every idle game older than `max_age`. Returns how many went.
    pub async fn evict_older_than(&self, max_age: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| match session.try_lock() {
            Ok(game) => game.is_loading() || game.age() < max_age,
            // Someone is using it right now.
            Err(_) => true,
        });
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
