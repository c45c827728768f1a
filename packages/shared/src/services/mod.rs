pub mod errors;
pub mod match_state_service;
pub mod matchmaking_service;
