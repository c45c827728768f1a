use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::game_type::GameType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Searching,
    Found,
}

/// A pairing record produced by the matchmaking queue. Immutable once
/// `Found` apart from bookkeeping. The match id here is the server's
/// temporary id; binding it to an external settlement id is the
/// settlement layer's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub match_id: String,
    pub game_type: GameType,
    pub stake: f64,
    pub player1_id: String,
    pub player2_id: Option<String>,
    pub player1_connection_id: String,
    pub player2_connection_id: Option<String>,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
}

impl Match {
    /// A single-sided record for a player still waiting in the queue.
    pub fn searching(
        game_type: GameType,
        stake: f64,
        player_id: &str,
        connection_id: &str,
    ) -> Self {
        Match {
            match_id: Uuid::new_v4().to_string(),
            game_type,
            stake,
            player1_id: player_id.to_string(),
            player2_id: None,
            player1_connection_id: connection_id.to_string(),
            player2_connection_id: None,
            status: MatchStatus::Searching,
            created_at: Utc::now(),
        }
    }

    /// A paired record. The waiting player keeps the first slot.
    pub fn found(
        game_type: GameType,
        stake: f64,
        player1_id: &str,
        player1_connection_id: &str,
        player2_id: &str,
        player2_connection_id: &str,
    ) -> Self {
        Match {
            match_id: Uuid::new_v4().to_string(),
            game_type,
            stake,
            player1_id: player1_id.to_string(),
            player2_id: Some(player2_id.to_string()),
            player1_connection_id: player1_connection_id.to_string(),
            player2_connection_id: Some(player2_connection_id.to_string()),
            status: MatchStatus::Found,
            created_at: Utc::now(),
        }
    }

    pub fn involves(&self, player_id: &str) -> bool {
        self.player1_id == player_id || self.player2_id.as_deref() == Some(player_id)
    }
}
