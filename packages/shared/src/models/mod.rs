pub mod game_match;
pub mod game_type;
pub mod match_state;
pub mod queue_entry;
