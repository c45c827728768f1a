use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

use crate::engines::EngineRegistry;
use crate::models::game_type::GameType;
use crate::models::match_state::{MatchGameState, Scores};
use crate::repositories::match_state_repository::MatchStateRepository;
use crate::services::errors::match_state_service_errors::MatchStateServiceError;

/// What an accepted mutation produced: a snapshot of the state after the
/// move, plus final scores when the match just ended.
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub state: MatchGameState,
    pub is_complete: bool,
    pub scores: Option<Scores>,
}

/// Owns the canonical state of every in-flight match. All reads and
/// writes go through the owning rule engine; the persistence
/// collaborator is written best-effort and read back lazily after a
/// restart.
///
/// Locking discipline: the outer map is only ever held long enough to
/// clone an entry handle; per-match mutation happens under that entry's
/// own mutex, so matches never block each other. No task waits on an
/// entry mutex while holding the map.
pub struct MatchStateService {
    engines: EngineRegistry,
    repository: Option<Arc<dyn MatchStateRepository>>,
    matches: RwLock<HashMap<String, Arc<Mutex<MatchGameState>>>>,
}

impl MatchStateService {
    pub fn new(engines: EngineRegistry, repository: Option<Arc<dyn MatchStateRepository>>) -> Self {
        MatchStateService {
            engines,
            repository,
            matches: RwLock::new(HashMap::new()),
        }
    }

    /// Initialize state for a freshly paired match. Idempotent: a retry
    /// for an id that already exists returns the current state untouched.
    pub async fn create_match_state(
        &self,
        match_id: &str,
        game_type: GameType,
        player1_id: &str,
        player2_id: &str,
    ) -> Result<MatchGameState, MatchStateServiceError> {
        let engine = self
            .engines
            .get(game_type)
            .ok_or(MatchStateServiceError::UnknownGameType(game_type))?;

        let existing = {
            let map = self.matches.read().await;
            map.get(match_id).cloned()
        };
        if let Some(entry) = existing {
            return Ok(entry.lock().await.clone());
        }

        let rule_state = engine.initialize();
        let current_turn = engine.current_turn(&rule_state);
        let state = MatchGameState::new(
            match_id,
            game_type,
            rule_state,
            current_turn,
            player1_id,
            player2_id,
        );

        // Racing creates for the same id keep the first initialization.
        let entry = {
            let mut map = self.matches.write().await;
            map.entry(match_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(state)))
                .clone()
        };
        let snapshot = entry.lock().await.clone();
        self.persist(&snapshot).await;

        info!(
            "Created {} match state {} for {} vs {}",
            game_type, match_id, player1_id, player2_id
        );
        Ok(snapshot)
    }

    /// Validate and apply one move. Serialized per match id by the entry
    /// mutex; concurrent moves for different matches proceed
    /// independently.
    pub async fn apply_move(
        &self,
        match_id: &str,
        player_id: &str,
        mv: serde_json::Value,
    ) -> Result<MoveOutcome, MatchStateServiceError> {
        let entry = self
            .load_entry(match_id)
            .await
            .ok_or_else(|| MatchStateServiceError::MatchNotFound(match_id.to_string()))?;
        let mut state = entry.lock().await;

        if state.is_complete {
            return Err(MatchStateServiceError::MatchAlreadyComplete(
                match_id.to_string(),
            ));
        }
        let seat = state.seat_of(player_id).ok_or_else(|| {
            MatchStateServiceError::InvalidMove("Player is not part of this match".to_string())
        })?;
        if state.current_turn != seat {
            return Err(MatchStateServiceError::NotYourTurn);
        }

        let engine = self
            .engines
            .get(state.game_type)
            .ok_or(MatchStateServiceError::UnknownGameType(state.game_type))?;

        engine.validate_move(&state.rule_state, &mv, seat)?;
        let new_rule_state = engine.apply_move(&state.rule_state, &mv, seat)?;
        let completion = engine.check_completion(&new_rule_state);

        state.current_turn = engine.current_turn(&new_rule_state);
        state.rule_state = new_rule_state;
        state.last_move = Some(mv);
        state.updated_at = Utc::now();

        if completion.is_complete {
            state.is_complete = true;
            state.scores = completion.scores;
            let snapshot = state.clone();
            drop(state);
            self.remove(match_id).await;
            info!(
                "Match {} complete with scores {:?}",
                match_id, completion.scores
            );
            return Ok(MoveOutcome {
                state: snapshot,
                is_complete: true,
                scores: completion.scores,
            });
        }

        let snapshot = state.clone();
        // Persist under the entry lock so saves land in move order.
        self.persist(&snapshot).await;
        drop(state);

        Ok(MoveOutcome {
            state: snapshot,
            is_complete: false,
            scores: None,
        })
    }

    /// Immediate forfeit: the resigner scores 0, the opponent 100. The
    /// rule engine is never consulted.
    pub async fn resign(
        &self,
        match_id: &str,
        player_id: &str,
    ) -> Result<MoveOutcome, MatchStateServiceError> {
        let entry = self
            .load_entry(match_id)
            .await
            .ok_or_else(|| MatchStateServiceError::MatchNotFound(match_id.to_string()))?;
        let mut state = entry.lock().await;

        if state.is_complete {
            return Err(MatchStateServiceError::MatchAlreadyComplete(
                match_id.to_string(),
            ));
        }
        let seat = state.seat_of(player_id).ok_or_else(|| {
            MatchStateServiceError::InvalidMove("Player is not part of this match".to_string())
        })?;

        let scores = Scores::for_winner(seat.other(), 100, 0);
        state.is_complete = true;
        state.scores = Some(scores);
        state.updated_at = Utc::now();
        let snapshot = state.clone();
        drop(state);

        self.remove(match_id).await;
        info!("Player {} resigned match {}", player_id, match_id);

        Ok(MoveOutcome {
            state: snapshot,
            is_complete: true,
            scores: Some(scores),
        })
    }

    /// Read-only snapshot for spectators and reconnecting players, with
    /// the same memory-then-persistence fallback as moves.
    pub async fn get_match_state(
        &self,
        match_id: &str,
    ) -> Result<MatchGameState, MatchStateServiceError> {
        let entry = self
            .load_entry(match_id)
            .await
            .ok_or_else(|| MatchStateServiceError::MatchNotFound(match_id.to_string()))?;
        let state = entry.lock().await;
        Ok(state.clone())
    }

    /// Memory first, then the persistence collaborator (crash/restart
    /// recovery). A load failure is logged and treated as absent.
    async fn load_entry(&self, match_id: &str) -> Option<Arc<Mutex<MatchGameState>>> {
        {
            let map = self.matches.read().await;
            if let Some(entry) = map.get(match_id) {
                return Some(entry.clone());
            }
        }

        let repository = self.repository.as_ref()?;
        match repository.load(match_id).await {
            Ok(Some(state)) => {
                info!("Recovered match {} from persistence", match_id);
                let mut map = self.matches.write().await;
                let entry = map
                    .entry(match_id.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(state)));
                Some(entry.clone())
            }
            Ok(None) => None,
            Err(e) => {
                error!("Failed to load match {} from persistence: {}", match_id, e);
                None
            }
        }
    }

    /// Best-effort: a failed save never rolls back the in-memory
    /// mutation, which stays authoritative for the life of the process.
    async fn persist(&self, state: &MatchGameState) {
        if let Some(repository) = &self.repository {
            if let Err(e) = repository.save(state).await {
                error!("Failed to persist match {}: {}", state.match_id, e);
            }
        }
    }

    async fn remove(&self, match_id: &str) {
        {
            let mut map = self.matches.write().await;
            map.remove(match_id);
        }
        if let Some(repository) = &self.repository {
            if let Err(e) = repository.delete(match_id).await {
                error!("Failed to delete match {} from persistence: {}", match_id, e);
            }
        }
    }
}
