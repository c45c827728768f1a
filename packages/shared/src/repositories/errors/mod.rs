pub mod match_state_repository_errors;
pub mod stats_repository_errors;
