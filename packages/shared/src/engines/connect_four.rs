use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engines::{Completion, GameEngine, MoveError, RuleState};
use crate::models::match_state::{PlayerSlot, Scores};

pub const ROWS: usize = 6;
pub const COLS: usize = 7;

/// 6x7 drop grid. Row 0 is the bottom; a dropped disc settles in the
/// lowest empty row of its column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectFourState {
    pub board: Vec<Vec<Option<PlayerSlot>>>,
    pub turn: PlayerSlot,
}

impl ConnectFourState {
    pub fn new() -> Self {
        ConnectFourState {
            board: vec![vec![None; COLS]; ROWS],
            turn: PlayerSlot::Player1,
        }
    }

    fn drop_row(&self, column: usize) -> Option<usize> {
        (0..ROWS).find(|&row| self.board[row][column].is_none())
    }

    fn is_full(&self) -> bool {
        self.board[ROWS - 1].iter().all(|cell| cell.is_some())
    }

    /// Scan for four in a row in the four line directions.
    fn winner(&self) -> Option<PlayerSlot> {
        const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

        for row in 0..ROWS {
            for col in 0..COLS {
                let Some(seat) = self.board[row][col] else {
                    continue;
                };
                for (dr, dc) in DIRECTIONS {
                    let mut run = 1;
                    let (mut r, mut c) = (row as isize + dr, col as isize + dc);
                    while r >= 0
                        && (r as usize) < ROWS
                        && c >= 0
                        && (c as usize) < COLS
                        && self.board[r as usize][c as usize] == Some(seat)
                    {
                        run += 1;
                        r += dr;
                        c += dc;
                    }
                    if run >= 4 {
                        return Some(seat);
                    }
                }
            }
        }
        None
    }
}

impl Default for ConnectFourState {
    fn default() -> Self {
        ConnectFourState::new()
    }
}

#[derive(Debug, Deserialize)]
struct ConnectFourMoveRequest {
    column: usize,
}

pub struct ConnectFourEngine;

impl ConnectFourEngine {
    fn state<'a>(&self, state: &'a RuleState) -> Result<&'a ConnectFourState, MoveError> {
        match state {
            RuleState::ConnectFour(s) => Ok(s),
            _ => Err(MoveError::StateMismatch),
        }
    }

    fn parse_move(&self, mv: &Value) -> Result<ConnectFourMoveRequest, MoveError> {
        serde_json::from_value(mv.clone())
            .map_err(|e| MoveError::Malformed(format!("Expected {{column}}: {}", e)))
    }
}

impl GameEngine for ConnectFourEngine {
    fn initialize(&self) -> RuleState {
        RuleState::ConnectFour(ConnectFourState::new())
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
        if state.winner().is_some() || state.is_full() {
            return Err(MoveError::Illegal("Game is already over".to_string()));
        }

        let request = self.parse_move(mv)?;
        if request.column >= COLS {
            return Err(MoveError::Malformed(format!(
                "Column must be 0-{}",
                COLS - 1
            )));
        }
        if state.drop_row(request.column).is_none() {
            return Err(MoveError::Illegal(format!(
                "Column {} is full",
                request.column
            )));
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

        let row = state
            .drop_row(request.column)
            .ok_or_else(|| MoveError::Illegal(format!("Column {} is full", request.column)))?;

        let mut next = state.clone();
        next.board[row][request.column] = Some(seat);
        next.turn = seat.other();
        Ok(RuleState::ConnectFour(next))
    }

    fn check_completion(&self, state: &RuleState) -> Completion {
        let state = match state {
            RuleState::ConnectFour(s) => s,
            _ => return Completion::ongoing(),
        };

        if let Some(winner) = state.winner() {
            return Completion::finished(Scores::for_winner(winner, 100, 0));
        }
        if state.is_full() {
            return Completion::finished(Scores::new(50, 50));
        }
        Completion::ongoing()
    }

    fn current_turn(&self, state: &RuleState) -> PlayerSlot {
        match state {
            RuleState::ConnectFour(s) => s.turn,
            _ => PlayerSlot::Player1,
        }
    }
}
