use chess::{Board, BoardStatus, ChessMove, Color, MoveGen, Piece, Square};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::engines::{Completion, GameEngine, MoveError, RuleState};
use crate::models::match_state::{PlayerSlot, Scores};

const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Chess state is the FEN string; the rules library reconstructs the
/// position on every call. Player1 always plays white.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChessState {
    pub fen: String,
}

impl ChessState {
    pub fn new() -> Self {
        ChessState {
            fen: STARTING_FEN.to_string(),
        }
    }
}

impl Default for ChessState {
    fn default() -> Self {
        ChessState::new()
    }
}

#[derive(Debug, Deserialize)]
struct ChessMoveRequest {
    from: String,
    to: String,
    promotion: Option<String>,
}

pub struct ChessEngine;

impl ChessEngine {
    fn state<'a>(&self, state: &'a RuleState) -> Result<&'a ChessState, MoveError> {
        match state {
            RuleState::Chess(s) => Ok(s),
            _ => Err(MoveError::StateMismatch),
        }
    }

    fn seat_of_color(color: Color) -> PlayerSlot {
        match color {
            Color::White => PlayerSlot::Player1,
            Color::Black => PlayerSlot::Player2,
        }
    }

    fn parse_move(&self, mv: &Value) -> Result<ChessMoveRequest, MoveError> {
        serde_json::from_value(mv.clone())
            .map_err(|e| MoveError::Malformed(format!("Expected {{from, to}}: {}", e)))
    }

    fn build_move(&self, board: &Board, request: &ChessMoveRequest) -> Result<ChessMove, MoveError> {
        let from_sq = Square::from_str(&request.from)
            .map_err(|_| MoveError::Malformed("Invalid from square".to_string()))?;
        let to_sq = Square::from_str(&request.to)
            .map_err(|_| MoveError::Malformed("Invalid to square".to_string()))?;

        let promotion = match &request.promotion {
            Some(p) => match p.as_str() {
                "q" => Some(Piece::Queen),
                "r" => Some(Piece::Rook),
                "b" => Some(Piece::Bishop),
                "n" => Some(Piece::Knight),
                _ => return Err(MoveError::Malformed("Invalid promotion piece".to_string())),
            },
            None => None,
        };

        let chess_move = ChessMove::new(from_sq, to_sq, promotion);

        let legal_moves: Vec<ChessMove> = MoveGen::new_legal(board).collect();
        if !legal_moves.contains(&chess_move) {
            return Err(MoveError::Illegal("Move is not legal".to_string()));
        }

        Ok(chess_move)
    }

    fn board(&self, state: &ChessState) -> Result<Board, MoveError> {
        Board::from_str(&state.fen)
            .map_err(|e| MoveError::Illegal(format!("Invalid position: {}", e)))
    }
}

impl GameEngine for ChessEngine {
    fn initialize(&self) -> RuleState {
        RuleState::Chess(ChessState::new())
    }

    fn validate_move(
        &self,
        state: &RuleState,
        mv: &Value,
        seat: PlayerSlot,
    ) -> Result<(), MoveError> {
        let state = self.state(state)?;
        let board = self.board(state)?;

        if board.status() != BoardStatus::Ongoing {
            return Err(MoveError::Illegal("Game is already over".to_string()));
        }
        if Self::seat_of_color(board.side_to_move()) != seat {
            return Err(MoveError::NotYourTurn);
        }

        let request = self.parse_move(mv)?;
        self.build_move(&board, &request)?;
        Ok(())
    }

    fn apply_move(
        &self,
        state: &RuleState,
        mv: &Value,
        seat: PlayerSlot,
    ) -> Result<RuleState, MoveError> {
        let state = self.state(state)?;
        let board = self.board(state)?;

        if Self::seat_of_color(board.side_to_move()) != seat {
            return Err(MoveError::NotYourTurn);
        }

        let request = self.parse_move(mv)?;
        let chess_move = self.build_move(&board, &request)?;

        let mut new_board = board.clone();
        board.make_move(chess_move, &mut new_board);

        Ok(RuleState::Chess(ChessState {
            fen: format!("{}", new_board),
        }))
    }

    fn check_completion(&self, state: &RuleState) -> Completion {
        let state = match state {
            RuleState::Chess(s) => s,
            _ => return Completion::ongoing(),
        };
        let board = match Board::from_str(&state.fen) {
            Ok(b) => b,
            Err(_) => return Completion::ongoing(),
        };

        match board.status() {
            BoardStatus::Ongoing => Completion::ongoing(),
            // The side to move has no legal moves; in checkmate the
            // other seat delivered it.
            BoardStatus::Checkmate => {
                let winner = Self::seat_of_color(board.side_to_move()).other();
                Completion::finished(Scores::for_winner(winner, 100, 0))
            }
            BoardStatus::Stalemate => Completion::finished(Scores::new(50, 50)),
        }
    }

    fn current_turn(&self, state: &RuleState) -> PlayerSlot {
        match state {
            RuleState::Chess(s) => Board::from_str(&s.fen)
                .map(|b| Self::seat_of_color(b.side_to_move()))
                .unwrap_or(PlayerSlot::Player1),
            _ => PlayerSlot::Player1,
        }
    }
}
