pub mod chess;
pub mod connect_four;
pub mod mancala;
pub mod survey;
pub mod whot;
pub mod wordle;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::game_type::GameType;
use crate::models::match_state::{PlayerSlot, Scores};

/// Per-game state. Each engine owns exactly one variant and is the only
/// component that ever constructs or transforms it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "game", content = "state", rename_all = "snake_case")]
pub enum RuleState {
    Chess(chess::ChessState),
    ConnectFour(connect_four::ConnectFourState),
    Mancala(mancala::MancalaState),
    Whot(whot::WhotState),
    Survey(survey::SurveyState),
    Wordle(wordle::WordleState),
}

/// Why a candidate move was rejected. `Malformed` and `Illegal` carry a
/// reason string surfaced to the offending client only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    NotYourTurn,
    Malformed(String),
    Illegal(String),
    StateMismatch,
}

impl std::fmt::Display for MoveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MoveError::NotYourTurn => write!(f, "Not your turn"),
            MoveError::Malformed(msg) => write!(f, "Malformed move: {}", msg),
            MoveError::Illegal(msg) => write!(f, "Illegal move: {}", msg),
            MoveError::StateMismatch => write!(f, "State does not belong to this game"),
        }
    }
}

impl std::error::Error for MoveError {}

/// Terminal-condition report, decoupled from move application so it can
/// be re-checked idempotently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub is_complete: bool,
    pub scores: Option<Scores>,
}

impl Completion {
    pub fn ongoing() -> Self {
        Completion {
            is_complete: false,
            scores: None,
        }
    }

    pub fn finished(scores: Scores) -> Self {
        Completion {
            is_complete: true,
            scores: Some(scores),
        }
    }
}

/// The uniform contract every game implements. Engines are stateless
/// between calls; all game knowledge lives in the `RuleState` they are
/// handed.
///
/// `apply_move` must only be called after `validate_move` accepted the
/// same (state, move, seat) triple.
pub trait GameEngine: Send + Sync {
    /// Starting position, deck or board for a fresh match.
    fn initialize(&self) -> RuleState;

    fn validate_move(
        &self,
        state: &RuleState,
        mv: &Value,
        seat: PlayerSlot,
    ) -> Result<(), MoveError>;

    /// One turn's full effect, including derived consequences such as
    /// captures, penalties or extra turns. Pure: returns the next state.
    fn apply_move(
        &self,
        state: &RuleState,
        mv: &Value,
        seat: PlayerSlot,
    ) -> Result<RuleState, MoveError>;

    fn check_completion(&self, state: &RuleState) -> Completion;

    /// The engine's own turn indicator, read back by the match store
    /// after every accepted move.
    fn current_turn(&self, state: &RuleState) -> PlayerSlot;
}

/// Engine lookup table, built once and handed to the match state service
/// at construction. Tests can register a single engine in isolation.
#[derive(Clone)]
pub struct EngineRegistry {
    engines: HashMap<GameType, Arc<dyn GameEngine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        EngineRegistry {
            engines: HashMap::new(),
        }
    }

    /// All six production engines.
    pub fn with_builtin_engines() -> Self {
        let mut registry = EngineRegistry::new();
        registry.register(GameType::Chess, Arc::new(chess::ChessEngine));
        registry.register(GameType::ConnectFour, Arc::new(connect_four::ConnectFourEngine));
        registry.register(GameType::Mancala, Arc::new(mancala::MancalaEngine));
        registry.register(GameType::Whot, Arc::new(whot::WhotEngine));
        registry.register(GameType::Survey, Arc::new(survey::SurveyEngine));
        registry.register(GameType::Wordle, Arc::new(wordle::WordleEngine));
        registry
    }

    pub fn register(&mut self, game_type: GameType, engine: Arc<dyn GameEngine>) {
        self.engines.insert(game_type, engine);
    }

    pub fn get(&self, game_type: GameType) -> Option<Arc<dyn GameEngine>> {
        self.engines.get(&game_type).cloned()
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        EngineRegistry::new()
    }
}
