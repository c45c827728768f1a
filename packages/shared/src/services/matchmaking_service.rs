use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::models::game_match::{Match, MatchStatus};
use crate::models::game_type::GameType;
use crate::models::queue_entry::QueueEntry;
use crate::repositories::stats_repository::{StatsRepository, DEFAULT_RATING};
use crate::services::errors::matchmaking_service_errors::MatchmakingServiceError;

/// Candidates must wager within this fraction of the searcher's stake.
const STAKE_TOLERANCE: f64 = 0.10;
/// One full score unit per this many rating points of difference.
const ELO_SCALE: f64 = 400.0;
/// Anti-starvation bonus earned per waited second, capped so a stale
/// entry can outrank fresher compatible ones but never more than that.
const WAIT_BONUS_PER_SEC: f64 = 0.01;
const WAIT_BONUS_CAP: f64 = 1.0;

const QUEUE_ENTRY_TIMEOUT_SECS: i64 = 5 * 60;
const FOUND_MATCH_TIMEOUT_SECS: i64 = 30 * 60;

/// How well `entry` suits a searcher with `stake` and `rating`; lower is
/// better. `None` when the stakes are out of tolerance — no amount of
/// waiting makes an incompatible pair.
pub fn pairing_score(
    stake: f64,
    rating: i32,
    entry: &QueueEntry,
    now: DateTime<Utc>,
) -> Option<f64> {
    let stake_delta = (entry.stake - stake).abs();
    if stake_delta > STAKE_TOLERANCE * stake {
        return None;
    }

    let elo_delta = (entry.skill_rating - rating).abs() as f64;
    let wait_bonus =
        (entry.waited_secs(now) as f64 * WAIT_BONUS_PER_SEC).min(WAIT_BONUS_CAP);
    Some(stake_delta / stake + elo_delta / ELO_SCALE - wait_bonus)
}

#[derive(Default)]
struct MatchmakingInner {
    queues: HashMap<GameType, Vec<QueueEntry>>,
    matches: HashMap<String, Match>,
    player_matches: HashMap<String, String>,
}

/// Pairs waiting players by game type, stake band and skill rating.
/// Entirely in-memory; a restart just empties the queue and players
/// search again.
pub struct MatchmakingService {
    stats: Arc<dyn StatsRepository>,
    inner: Mutex<MatchmakingInner>,
}

impl MatchmakingService {
    pub fn new(stats: Arc<dyn StatsRepository>) -> Self {
        MatchmakingService {
            stats,
            inner: Mutex::new(MatchmakingInner::default()),
        }
    }

    /// Find the best waiting opponent or join the queue. Re-entry while
    /// already queued or matched returns the existing record unchanged.
    pub async fn find_or_create_match(
        &self,
        game_type: GameType,
        stake: f64,
        player_id: &str,
        connection_id: &str,
    ) -> Result<Match, MatchmakingServiceError> {
        if player_id.is_empty() {
            return Err(MatchmakingServiceError::ValidationError(
                "Player ID cannot be empty".to_string(),
            ));
        }
        if !stake.is_finite() || stake <= 0.0 {
            return Err(MatchmakingServiceError::ValidationError(
                "Stake must be a positive amount".to_string(),
            ));
        }

        let rating = match self.stats.get_rating(player_id).await {
            Ok(rating) => rating,
            Err(e) => {
                warn!(
                    "Stats lookup failed for {}, using default rating: {}",
                    player_id, e
                );
                DEFAULT_RATING
            }
        };

        let mut inner = self.inner.lock().await;

        if let Some(match_id) = inner.player_matches.get(player_id) {
            if let Some(existing) = inner.matches.get(match_id) {
                return Ok(existing.clone());
            }
        }

        let now = Utc::now();
        let bucket = inner.queues.entry(game_type).or_default();
        let best = bucket
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.player_id != player_id)
            .filter_map(|(index, entry)| {
                pairing_score(stake, rating, entry, now).map(|score| (index, score))
            })
            .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        match best {
            Some((index, score)) => {
                let opponent = bucket.remove(index);
                info!(
                    "Paired {} with {} on {} (score {:.3})",
                    player_id, opponent.player_id, game_type, score
                );

                // The waiting player's searching record is superseded.
                if let Some(old_id) = inner.player_matches.remove(&opponent.player_id) {
                    inner.matches.remove(&old_id);
                }

                let found = Match::found(
                    game_type,
                    opponent.stake,
                    &opponent.player_id,
                    &opponent.connection_id,
                    player_id,
                    connection_id,
                );
                inner
                    .matches
                    .insert(found.match_id.clone(), found.clone());
                inner
                    .player_matches
                    .insert(opponent.player_id.clone(), found.match_id.clone());
                inner
                    .player_matches
                    .insert(player_id.to_string(), found.match_id.clone());
                Ok(found)
            }
            None => {
                let searching = Match::searching(game_type, stake, player_id, connection_id);
                bucket.push(QueueEntry::new(
                    game_type,
                    stake,
                    player_id,
                    connection_id,
                    rating,
                ));
                inner
                    .matches
                    .insert(searching.match_id.clone(), searching.clone());
                inner
                    .player_matches
                    .insert(player_id.to_string(), searching.match_id.clone());
                info!("Queued {} for {} at stake {}", player_id, game_type, stake);
                Ok(searching)
            }
        }
    }

    /// Remove the player's queue entry and searching record. No-op when
    /// the player is not waiting; a found match is never cancelled here.
    pub async fn cancel_search(&self, player_id: &str) {
        let mut inner = self.inner.lock().await;

        for bucket in inner.queues.values_mut() {
            bucket.retain(|entry| entry.player_id != player_id);
        }

        let searching_id = inner
            .player_matches
            .get(player_id)
            .filter(|match_id| {
                inner
                    .matches
                    .get(*match_id)
                    .map(|m| m.status == MatchStatus::Searching)
                    .unwrap_or(false)
            })
            .cloned();
        if let Some(match_id) = searching_id {
            inner.matches.remove(&match_id);
            inner.player_matches.remove(player_id);
            info!("Cancelled search for {}", player_id);
        }
    }

    /// Release the pairing bookkeeping once a match has been played out
    /// (or abandoned), so both players can search again.
    pub async fn clear_match(&self, match_id: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(m) = inner.matches.remove(match_id) {
            inner.player_matches.remove(&m.player1_id);
            if let Some(player2_id) = &m.player2_id {
                inner.player_matches.remove(player2_id);
            }
        }
    }

    pub async fn get_active_match(&self, player_id: &str) -> Option<Match> {
        let inner = self.inner.lock().await;
        inner
            .player_matches
            .get(player_id)
            .and_then(|match_id| inner.matches.get(match_id))
            .cloned()
    }

    /// Periodic tick: evict queue entries and found matches that never
    /// progressed. Runs off the request path.
    pub async fn cleanup_stale_matches(&self) {
        self.cleanup_stale_matches_at(Utc::now()).await;
    }

    pub async fn cleanup_stale_matches_at(&self, now: DateTime<Utc>) {
        let mut inner = self.inner.lock().await;

        let mut evicted_players = Vec::new();
        for bucket in inner.queues.values_mut() {
            bucket.retain(|entry| {
                let stale = entry.waited_secs(now) > QUEUE_ENTRY_TIMEOUT_SECS;
                if stale {
                    evicted_players.push(entry.player_id.clone());
                }
                !stale
            });
        }
        for player_id in &evicted_players {
            if let Some(match_id) = inner.player_matches.remove(player_id) {
                inner.matches.remove(&match_id);
            }
        }

        let stale_matches: Vec<String> = inner
            .matches
            .iter()
            .filter(|(_, m)| {
                m.status == MatchStatus::Found
                    && (now - m.created_at).num_seconds() > FOUND_MATCH_TIMEOUT_SECS
            })
            .map(|(match_id, _)| match_id.clone())
            .collect();
        for match_id in &stale_matches {
            if let Some(m) = inner.matches.remove(match_id) {
                inner.player_matches.remove(&m.player1_id);
                if let Some(player2_id) = &m.player2_id {
                    inner.player_matches.remove(player2_id);
                }
            }
        }

        if !evicted_players.is_empty() || !stale_matches.is_empty() {
            info!(
                "Evicted {} stale queue entries and {} abandoned matches",
                evicted_players.len(),
                stale_matches.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::stats_repository::MockStatsRepository;
    use chrono::Duration;

    fn service_with_ratings(ratings: &[(&str, i32)]) -> MatchmakingService {
        let mut stats = MockStatsRepository::new();
        let ratings: Vec<(String, i32)> = ratings
            .iter()
            .map(|(id, rating)| (id.to_string(), *rating))
            .collect();
        stats.expect_get_rating().returning(move |player_id| {
            Ok(ratings
                .iter()
                .find(|(id, _)| id == player_id)
                .map(|(_, rating)| *rating)
                .unwrap_or(DEFAULT_RATING))
        });
        MatchmakingService::new(Arc::new(stats))
    }

    #[tokio::test]
    async fn test_compatible_stakes_and_ratings_pair() {
        let service = service_with_ratings(&[("alice", 1200), ("bob", 1250)]);

        let first = service
            .find_or_create_match(GameType::Chess, 1.00, "alice", "conn-a")
            .await
            .unwrap();
        assert_eq!(first.status, MatchStatus::Searching);

        let second = service
            .find_or_create_match(GameType::Chess, 1.05, "bob", "conn-b")
            .await
            .unwrap();

        assert_eq!(second.status, MatchStatus::Found);
        assert_eq!(second.player1_id, "alice");
        assert_eq!(second.player2_id.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn test_stakes_out_of_band_never_pair() {
        let service = service_with_ratings(&[]);

        service
            .find_or_create_match(GameType::Chess, 1.00, "alice", "conn-a")
            .await
            .unwrap();
        let second = service
            .find_or_create_match(GameType::Chess, 2.00, "bob", "conn-b")
            .await
            .unwrap();

        assert_eq!(second.status, MatchStatus::Searching);
    }

    #[tokio::test]
    async fn test_different_game_types_never_pair() {
        let service = service_with_ratings(&[]);

        service
            .find_or_create_match(GameType::Chess, 1.00, "alice", "conn-a")
            .await
            .unwrap();
        let second = service
            .find_or_create_match(GameType::Whot, 1.00, "bob", "conn-b")
            .await
            .unwrap();

        assert_eq!(second.status, MatchStatus::Searching);
    }

    #[tokio::test]
    async fn test_reentry_returns_existing_match() {
        let service = service_with_ratings(&[]);

        let first = service
            .find_or_create_match(GameType::Mancala, 1.00, "alice", "conn-a")
            .await
            .unwrap();
        let retry = service
            .find_or_create_match(GameType::Mancala, 1.00, "alice", "conn-a")
            .await
            .unwrap();

        assert_eq!(retry.match_id, first.match_id);
    }

    #[tokio::test]
    async fn test_reentry_after_pairing_returns_found_match() {
        let service = service_with_ratings(&[]);

        service
            .find_or_create_match(GameType::Mancala, 1.00, "alice", "conn-a")
            .await
            .unwrap();
        let found = service
            .find_or_create_match(GameType::Mancala, 1.00, "bob", "conn-b")
            .await
            .unwrap();

        // Both sides retry and land on the same found record.
        for player in ["alice", "bob"] {
            let retry = service
                .find_or_create_match(GameType::Mancala, 1.00, player, "conn-x")
                .await
                .unwrap();
            assert_eq!(retry.match_id, found.match_id);
            assert_eq!(retry.status, MatchStatus::Found);
        }
    }

    #[tokio::test]
    async fn test_closest_rating_wins_among_compatible() {
        let service =
            service_with_ratings(&[("near", 1210), ("far", 1600), ("searcher", 1200)]);

        service
            .find_or_create_match(GameType::Chess, 1.00, "far", "conn-f")
            .await
            .unwrap();
        service
            .find_or_create_match(GameType::Chess, 1.00, "near", "conn-n")
            .await
            .unwrap();

        let found = service
            .find_or_create_match(GameType::Chess, 1.00, "searcher", "conn-s")
            .await
            .unwrap();

        assert_eq!(found.status, MatchStatus::Found);
        assert_eq!(found.player1_id, "near");
    }

    #[tokio::test]
    async fn test_cancel_search_removes_entry() {
        let service = service_with_ratings(&[]);

        service
            .find_or_create_match(GameType::Whot, 1.00, "alice", "conn-a")
            .await
            .unwrap();
        service.cancel_search("alice").await;

        let second = service
            .find_or_create_match(GameType::Whot, 1.00, "bob", "conn-b")
            .await
            .unwrap();
        assert_eq!(second.status, MatchStatus::Searching);
        assert!(service.get_active_match("alice").await.is_none());
    }

    #[tokio::test]
    async fn test_clear_match_frees_both_players() {
        let service = service_with_ratings(&[]);

        service
            .find_or_create_match(GameType::Chess, 1.00, "alice", "conn-a")
            .await
            .unwrap();
        let found = service
            .find_or_create_match(GameType::Chess, 1.00, "bob", "conn-b")
            .await
            .unwrap();

        service.clear_match(&found.match_id).await;

        let fresh = service
            .find_or_create_match(GameType::Chess, 1.00, "alice", "conn-a2")
            .await
            .unwrap();
        assert_ne!(fresh.match_id, found.match_id);
    }

    #[tokio::test]
    async fn test_stale_queue_entries_evicted() {
        let service = service_with_ratings(&[]);

        service
            .find_or_create_match(GameType::Survey, 1.00, "alice", "conn-a")
            .await
            .unwrap();

        let future = Utc::now() + Duration::seconds(QUEUE_ENTRY_TIMEOUT_SECS + 30);
        service.cleanup_stale_matches_at(future).await;

        assert!(service.get_active_match("alice").await.is_none());
        let second = service
            .find_or_create_match(GameType::Survey, 1.00, "bob", "conn-b")
            .await
            .unwrap();
        assert_eq!(second.status, MatchStatus::Searching);
    }

    #[tokio::test]
    async fn test_abandoned_found_matches_evicted() {
        let service = service_with_ratings(&[]);

        service
            .find_or_create_match(GameType::Chess, 1.00, "alice", "conn-a")
            .await
            .unwrap();
        let found = service
            .find_or_create_match(GameType::Chess, 1.00, "bob", "conn-b")
            .await
            .unwrap();

        let future = Utc::now() + Duration::seconds(FOUND_MATCH_TIMEOUT_SECS + 60);
        service.cleanup_stale_matches_at(future).await;

        assert!(service.get_active_match("alice").await.is_none());
        assert!(service.get_active_match("bob").await.is_none());
        assert_ne!(
            service
                .find_or_create_match(GameType::Chess, 1.00, "alice", "conn-a")
                .await
                .unwrap()
                .match_id,
            found.match_id
        );
    }

    #[tokio::test]
    async fn test_invalid_stake_rejected() {
        let service = service_with_ratings(&[]);

        let result = service
            .find_or_create_match(GameType::Chess, 0.0, "alice", "conn-a")
            .await;

        assert!(matches!(
            result,
            Err(MatchmakingServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn test_pairing_score_rejects_out_of_band_stake_regardless_of_wait() {
        let mut entry = QueueEntry::new(GameType::Chess, 2.00, "old", "conn", 1200);
        entry.enqueued_at = Utc::now() - Duration::hours(5);

        assert!(pairing_score(1.00, 1200, &entry, Utc::now()).is_none());
    }

    #[test]
    fn test_pairing_score_wait_bonus_is_capped() {
        let now = Utc::now();
        let mut stale = QueueEntry::new(GameType::Chess, 1.00, "stale", "conn", 1200);
        stale.enqueued_at = now - Duration::hours(10);
        let mut waited = QueueEntry::new(GameType::Chess, 1.00, "waited", "conn", 1200);
        waited.enqueued_at = now - Duration::seconds(200);

        let stale_score = pairing_score(1.00, 1200, &stale, now).unwrap();
        let waited_score = pairing_score(1.00, 1200, &waited, now).unwrap();

        // Both are past the cap: identical bonus, identical score.
        assert!((stale_score - waited_score).abs() < f64::EPSILON);
        assert!((stale_score - (-WAIT_BONUS_CAP)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pairing_score_prefers_longer_wait_below_cap() {
        let now = Utc::now();
        let mut fresh = QueueEntry::new(GameType::Chess, 1.00, "fresh", "conn", 1200);
        fresh.enqueued_at = now;
        let mut waited = QueueEntry::new(GameType::Chess, 1.00, "waited", "conn", 1200);
        waited.enqueued_at = now - Duration::seconds(50);

        let fresh_score = pairing_score(1.00, 1200, &fresh, now).unwrap();
        let waited_score = pairing_score(1.00, 1200, &waited, now).unwrap();

        assert!(waited_score < fresh_score);
    }
}
