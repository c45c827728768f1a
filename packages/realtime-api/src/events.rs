use serde::{Deserialize, Serialize};
use serde_json::Value;

use shared::models::game_type::GameType;
use shared::models::match_state::{MatchGameState, PlayerSlot, Scores};

/// Client intents, tagged by `action` on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientEvent {
    Authenticate {
        player_id: String,
        token: String,
    },
    Search {
        game_type: GameType,
        stake: f64,
        player_id: String,
    },
    CancelSearch,
    Move {
        match_id: String,
        player_id: String,
        #[serde(rename = "move")]
        mv: Value,
    },
    Resign {
        match_id: String,
        player_id: String,
    },
    Chat {
        match_id: String,
        player_id: String,
        message: String,
    },
    Spectate {
        match_id: String,
    },
}

/// Server pushes, tagged by `event` on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    Authenticated {
        player_id: String,
    },
    Searching {
        match_id: String,
    },
    MatchFound {
        match_id: String,
        opponent_id: String,
        is_first_player: bool,
        initial_state: MatchGameState,
    },
    OpponentMove {
        match_id: String,
        #[serde(rename = "move")]
        mv: Value,
        state: MatchGameState,
    },
    StateUpdate {
        match_id: String,
        state: MatchGameState,
        current_turn: PlayerSlot,
    },
    InvalidMove {
        match_id: String,
        error: String,
    },
    Resigned {
        match_id: String,
        resigned_player: String,
    },
    Complete {
        match_id: String,
        scores: Scores,
    },
    Chat {
        match_id: String,
        player_id: String,
        message: String,
    },
    MatchState {
        match_id: String,
        state: MatchGameState,
    },
    RateLimited {
        message: String,
    },
    Error {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_events_parse_by_action() {
        let event: ClientEvent = serde_json::from_value(json!({
            "action": "search",
            "game_type": "whot",
            "stake": 2.5,
            "player_id": "player-1",
        }))
        .unwrap();

        match event {
            ClientEvent::Search {
                game_type, stake, ..
            } => {
                assert_eq!(game_type, GameType::Whot);
                assert_eq!(stake, 2.5);
            }
            other => panic!("Parsed wrong event: {:?}", other),
        }
    }

    #[test]
    fn test_move_event_carries_raw_move_payload() {
        let event: ClientEvent = serde_json::from_value(json!({
            "action": "move",
            "match_id": "m1",
            "player_id": "player-1",
            "move": { "column": 3 },
        }))
        .unwrap();

        match event {
            ClientEvent::Move { mv, .. } => assert_eq!(mv, json!({ "column": 3 })),
            other => panic!("Parsed wrong event: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let result: Result<ClientEvent, _> =
            serde_json::from_value(json!({ "action": "teleport" }));

        assert!(result.is_err());
    }

    #[test]
    fn test_server_events_tag_with_event() {
        let event = ServerEvent::Complete {
            match_id: "m1".to_string(),
            scores: Scores::new(100, 0),
        };

        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["event"], "complete");
        assert_eq!(value["scores"]["player1"], 100);
    }
}
