pub mod match_state_service_errors;
pub mod matchmaking_service_errors;
