use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engines::{Completion, GameEngine, MoveError, RuleState};
use crate::models::match_state::{PlayerSlot, Scores};

pub const P1_STORE: usize = 6;
pub const P2_STORE: usize = 13;

/// 14-slot board laid out counterclockwise: pits 0-5 and store 6 belong
/// to player1, pits 7-12 and store 13 to player2.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MancalaState {
    pub board: [u8; 14],
    pub turn: PlayerSlot,
}

impl MancalaState {
    pub fn new() -> Self {
        let mut board = [4u8; 14];
        board[P1_STORE] = 0;
        board[P2_STORE] = 0;
        MancalaState {
            board,
            turn: PlayerSlot::Player1,
        }
    }

    fn pits(seat: PlayerSlot) -> std::ops::RangeInclusive<usize> {
        match seat {
            PlayerSlot::Player1 => 0..=5,
            PlayerSlot::Player2 => 7..=12,
        }
    }

    fn store(seat: PlayerSlot) -> usize {
        match seat {
            PlayerSlot::Player1 => P1_STORE,
            PlayerSlot::Player2 => P2_STORE,
        }
    }

    fn side_empty(&self, seat: PlayerSlot) -> bool {
        Self::pits(seat).all(|pit| self.board[pit] == 0)
    }
}

impl Default for MancalaState {
    fn default() -> Self {
        MancalaState::new()
    }
}

#[derive(Debug, Deserialize)]
struct MancalaMoveRequest {
    pit: usize,
}

pub struct MancalaEngine;

impl MancalaEngine {
    fn state<'a>(&self, state: &'a RuleState) -> Result<&'a MancalaState, MoveError> {
        match state {
            RuleState::Mancala(s) => Ok(s),
            _ => Err(MoveError::StateMismatch),
        }
    }

    fn parse_move(&self, mv: &Value) -> Result<MancalaMoveRequest, MoveError> {
        serde_json::from_value(mv.clone())
            .map_err(|e| MoveError::Malformed(format!("Expected {{pit}}: {}", e)))
    }
}

impl GameEngine for MancalaEngine {
    fn initialize(&self) -> RuleState {
        RuleState::Mancala(MancalaState::new())
    }

    fn validate_move(
        &self,
        state: &RuleState,
        mv: &Value,
        seat: PlayerSlot,
    ) -> Result<(), MoveError> {
        let state = self.state(state)?;
        if state.turn != seat {
            return Err(MoveError::NotYourTurn);
        }
        if state.side_empty(PlayerSlot::Player1) && state.side_empty(PlayerSlot::Player2) {
            return Err(MoveError::Illegal("Game is already over".to_string()));
        }

        let request = self.parse_move(mv)?;
        if !MancalaState::pits(seat).contains(&request.pit) {
            return Err(MoveError::Illegal(format!(
                "Pit {} is not on your side",
                request.pit
            )));
        }
        if state.board[request.pit] == 0 {
            return Err(MoveError::Illegal(format!("Pit {} is empty", request.pit)));
        }
        Ok(())
    }

    fn apply_move(
        &self,
        state: &RuleState,
        mv: &Value,
        seat: PlayerSlot,
    ) -> Result<RuleState, MoveError> {
        let state = self.state(state)?;
        let request = self.parse_move(mv)?;
        if !MancalaState::pits(seat).contains(&request.pit) {
            return Err(MoveError::Illegal(format!(
                "Pit {} is not on your side",
                request.pit
            )));
        }
        if state.board[request.pit] == 0 {
            return Err(MoveError::Illegal(format!("Pit {} is empty", request.pit)));
        }

        let mut next = state.clone();
        let own_store = MancalaState::store(seat);
        let opponent_store = MancalaState::store(seat.other());

        // Sow counterclockwise, skipping the opponent's store.
        let mut stones = next.board[request.pit];
        next.board[request.pit] = 0;
        let mut index = request.pit;
        while stones > 0 {
            index = (index + 1) % 14;
            if index == opponent_store {
                continue;
            }
            next.board[index] += 1;
            stones -= 1;
        }

        // Landing with the only stone in an own empty pit captures the
        // opposite pit plus the landed stone.
        if index != own_store
            && MancalaState::pits(seat).contains(&index)
            && next.board[index] == 1
        {
            let opposite = 12 - index;
            let captured = next.board[opposite] + next.board[index];
            next.board[opposite] = 0;
            next.board[index] = 0;
            next.board[own_store] += captured;
        }

        // Landing in the own store grants another turn.
        next.turn = if index == own_store { seat } else { seat.other() };

        // One side running out ends the game; the other side sweeps its
        // remaining stones into its own store.
        if next.side_empty(PlayerSlot::Player1) || next.side_empty(PlayerSlot::Player2) {
            for seat in [PlayerSlot::Player1, PlayerSlot::Player2] {
                let store = MancalaState::store(seat);
                for pit in MancalaState::pits(seat) {
                    next.board[store] += next.board[pit];
                    next.board[pit] = 0;
                }
            }
        }

        Ok(RuleState::Mancala(next))
    }

    fn check_completion(&self, state: &RuleState) -> Completion {
        let state = match state {
            RuleState::Mancala(s) => s,
            _ => return Completion::ongoing(),
        };

        if state.side_empty(PlayerSlot::Player1) && state.side_empty(PlayerSlot::Player2) {
            Completion::finished(Scores::new(
                state.board[P1_STORE] as u32,
                state.board[P2_STORE] as u32,
            ))
        } else {
            Completion::ongoing()
        }
    }

    fn current_turn(&self, state: &RuleState) -> PlayerSlot {
        match state {
            RuleState::Mancala(s) => s.turn,
            _ => PlayerSlot::Player1,
        }
    }
}
