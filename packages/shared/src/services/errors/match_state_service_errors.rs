use crate::engines::MoveError;
use crate::models::game_type::GameType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchStateServiceError {
    UnknownGameType(GameType),
    MatchNotFound(String),
    MatchAlreadyComplete(String),
    NotYourTurn,
    InvalidMove(String),
}

impl std::fmt::Display for MatchStateServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchStateServiceError::UnknownGameType(game_type) => {
                write!(f, "No engine registered for game type: {}", game_type)
            }
            MatchStateServiceError::MatchNotFound(match_id) => {
                write!(f, "Match not found: {}", match_id)
            }
            MatchStateServiceError::MatchAlreadyComplete(match_id) => {
                write!(f, "Match already complete: {}", match_id)
            }
            MatchStateServiceError::NotYourTurn => write!(f, "Not your turn"),
            MatchStateServiceError::InvalidMove(msg) => write!(f, "Invalid move: {}", msg),
        }
    }
}

impl std::error::Error for MatchStateServiceError {}

impl From<MoveError> for MatchStateServiceError {
    fn from(err: MoveError) -> Self {
        match err {
            MoveError::NotYourTurn => MatchStateServiceError::NotYourTurn,
            MoveError::Malformed(msg) | MoveError::Illegal(msg) => {
                MatchStateServiceError::InvalidMove(msg)
            }
            MoveError::StateMismatch => {
                MatchStateServiceError::InvalidMove("State does not belong to this game".to_string())
            }
        }
    }
}
