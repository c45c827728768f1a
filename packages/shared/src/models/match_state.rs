use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engines::RuleState;
use crate::models::game_type::GameType;

/// Which of the two seats a player occupies. Every game state tracks its
/// own turn in terms of seats, never raw player ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerSlot {
    Player1,
    Player2,
}

impl PlayerSlot {
    pub fn other(self) -> PlayerSlot {
        match self {
            PlayerSlot::Player1 => PlayerSlot::Player2,
            PlayerSlot::Player2 => PlayerSlot::Player1,
        }
    }
}

/// Final relative-performance scores. Not currency: the settlement layer
/// turns these into payouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub player1: u32,
    pub player2: u32,
}

impl Scores {
    pub fn new(player1: u32, player2: u32) -> Self {
        Scores { player1, player2 }
    }

    /// Winner-takes-points scoring keyed by seat.
    pub fn for_winner(winner: PlayerSlot, winner_points: u32, loser_points: u32) -> Self {
        match winner {
            PlayerSlot::Player1 => Scores::new(winner_points, loser_points),
            PlayerSlot::Player2 => Scores::new(loser_points, winner_points),
        }
    }
}

/// The canonical, server-owned truth for one in-flight match.
/// Created when a pairing is found, mutated exactly once per accepted
/// move, deleted everywhere once terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchGameState {
    pub match_id: String,
    pub game_type: GameType,
    pub rule_state: RuleState,
    pub player1_id: String,
    pub player2_id: String,
    pub current_turn: PlayerSlot,
    pub is_complete: bool,
    pub scores: Option<Scores>,
    pub last_move: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MatchGameState {
    pub fn new(
        match_id: &str,
        game_type: GameType,
        rule_state: RuleState,
        current_turn: PlayerSlot,
        player1_id: &str,
        player2_id: &str,
    ) -> Self {
        let now = Utc::now();
        MatchGameState {
            match_id: match_id.to_string(),
            game_type,
            rule_state,
            player1_id: player1_id.to_string(),
            player2_id: player2_id.to_string(),
            current_turn,
            is_complete: false,
            scores: None,
            last_move: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The seat a player id occupies, if they are part of this match.
    pub fn seat_of(&self, player_id: &str) -> Option<PlayerSlot> {
        if self.player1_id == player_id {
            Some(PlayerSlot::Player1)
        } else if self.player2_id == player_id {
            Some(PlayerSlot::Player2)
        } else {
            None
        }
    }
}
