use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::game_type::GameType;

/// A waiting player's matchmaking request. Ephemeral: created on search,
/// removed on match, cancel, or staleness eviction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub game_type: GameType,
    pub stake: f64,
    pub player_id: String,
    pub connection_id: String,
    pub enqueued_at: DateTime<Utc>,
    pub skill_rating: i32,
}

impl QueueEntry {
    pub fn new(
        game_type: GameType,
        stake: f64,
        player_id: &str,
        connection_id: &str,
        skill_rating: i32,
    ) -> Self {
        QueueEntry {
            game_type,
            stake,
            player_id: player_id.to_string(),
            connection_id: connection_id.to_string(),
            enqueued_at: Utc::now(),
            skill_rating,
        }
    }

    /// Seconds this entry has been waiting, measured against `now`.
    pub fn waited_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.enqueued_at).num_seconds().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_queue_entry_creation() {
        let entry = QueueEntry::new(GameType::Whot, 1.5, "player-1", "conn-1", 1340);

        assert_eq!(entry.game_type, GameType::Whot);
        assert_eq!(entry.stake, 1.5);
        assert_eq!(entry.player_id, "player-1");
        assert_eq!(entry.connection_id, "conn-1");
        assert_eq!(entry.skill_rating, 1340);
    }

    #[test]
    fn test_waited_secs_never_negative() {
        let entry = QueueEntry::new(GameType::Chess, 1.0, "p", "c", 1200);
        let before_enqueue = entry.enqueued_at - Duration::seconds(30);

        assert_eq!(entry.waited_secs(before_enqueue), 0);
    }

    #[test]
    fn test_waited_secs_counts_elapsed_time() {
        let entry = QueueEntry::new(GameType::Chess, 1.0, "p", "c", 1200);
        let later = entry.enqueued_at + Duration::seconds(120);

        assert_eq!(entry.waited_secs(later), 120);
    }
}
