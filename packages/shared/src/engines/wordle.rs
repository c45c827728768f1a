use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engines::{Completion, GameEngine, MoveError, RuleState};
use crate::models::match_state::{PlayerSlot, Scores};

pub const WORD_LENGTH: usize = 5;
pub const MAX_GUESSES: usize = 6;

const WORD_LIST: &[&str] = &[
    "arena", "crate", "pride", "stone", "brave", "light", "mango", "river", "sound", "table",
    "water", "youth", "plant", "grape", "house", "flame", "cloud", "spice", "trace", "onion",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LetterMark {
    Correct,
    Present,
    Absent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordleGuess {
    pub word: String,
    pub marks: Vec<LetterMark>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WordleSide {
    pub guesses: Vec<WordleGuess>,
    pub solved: bool,
    pub solve_elapsed_secs: Option<i64>,
}

impl WordleSide {
    pub fn finished(&self) -> bool {
        self.solved || self.guesses.len() >= MAX_GUESSES
    }
}

/// Both players race on the same hidden word, alternating guesses. A
/// player who finishes (solved or out of guesses) cedes the remaining
/// turns to the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordleState {
    pub target: String,
    pub sides: [WordleSide; 2],
    pub turn: PlayerSlot,
    pub started_at: DateTime<Utc>,
}

impl WordleState {
    pub fn with_target(target: &str) -> Self {
        WordleState {
            target: target.to_lowercase(),
            sides: [WordleSide::default(), WordleSide::default()],
            turn: PlayerSlot::Player1,
            started_at: Utc::now(),
        }
    }

    fn side(&self, seat: PlayerSlot) -> &WordleSide {
        match seat {
            PlayerSlot::Player1 => &self.sides[0],
            PlayerSlot::Player2 => &self.sides[1],
        }
    }

    fn side_mut(&mut self, seat: PlayerSlot) -> &mut WordleSide {
        match seat {
            PlayerSlot::Player1 => &mut self.sides[0],
            PlayerSlot::Player2 => &mut self.sides[1],
        }
    }
}

/// Two-pass marking with duplicate-letter accounting: exact hits first,
/// then remaining letters can mark at most as many `Present` cells as
/// the target holds.
pub fn evaluate_guess(target: &str, guess: &str) -> Vec<LetterMark> {
    let target: Vec<char> = target.chars().collect();
    let guess: Vec<char> = guess.chars().collect();
    let mut marks = vec![LetterMark::Absent; guess.len()];
    let mut available: std::collections::HashMap<char, usize> = std::collections::HashMap::new();

    for (i, &t) in target.iter().enumerate() {
        if guess.get(i) == Some(&t) {
            marks[i] = LetterMark::Correct;
        } else {
            *available.entry(t).or_insert(0) += 1;
        }
    }
    for (i, &g) in guess.iter().enumerate() {
        if marks[i] == LetterMark::Correct {
            continue;
        }
        if let Some(count) = available.get_mut(&g) {
            if *count > 0 {
                marks[i] = LetterMark::Present;
                *count -= 1;
            }
        }
    }
    marks
}

fn side_score(side: &WordleSide) -> u32 {
    if !side.solved {
        return 0;
    }
    let guess_count = side.guesses.len() as u32;
    let time_bonus = side
        .solve_elapsed_secs
        .map(|elapsed| (100 - elapsed).max(0) as u32)
        .unwrap_or(0);
    100 + (7 - guess_count.min(6)) * 100 + time_bonus
}

#[derive(Debug, Deserialize)]
struct WordleMoveRequest {
    guess: String,
}

pub struct WordleEngine;

impl WordleEngine {
    fn state<'a>(&self, state: &'a RuleState) -> Result<&'a WordleState, MoveError> {
        match state {
            RuleState::Wordle(s) => Ok(s),
            _ => Err(MoveError::StateMismatch),
        }
    }

    fn parse_move(&self, mv: &Value) -> Result<String, MoveError> {
        let request: WordleMoveRequest = serde_json::from_value(mv.clone())
            .map_err(|e| MoveError::Malformed(format!("Expected {{guess}}: {}", e)))?;
        let guess = request.guess.trim().to_lowercase();
        if guess.len() != WORD_LENGTH || !guess.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(MoveError::Malformed(format!(
                "Guess must be {} letters",
                WORD_LENGTH
            )));
        }
        Ok(guess)
    }
}

impl GameEngine for WordleEngine {
    fn initialize(&self) -> RuleState {
        let target = WORD_LIST
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("arena");
        RuleState::Wordle(WordleState::with_target(target))
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
        if state.side(seat).finished() {
            return Err(MoveError::Illegal("No guesses remaining".to_string()));
        }

        self.parse_move(mv)?;
        Ok(())
    }

    fn apply_move(
        &self,
        state: &RuleState,
        mv: &Value,
        seat: PlayerSlot,
    ) -> Result<RuleState, MoveError> {
        let state = self.state(state)?;
        let guess = self.parse_move(mv)?;

        let mut next = state.clone();
        let marks = evaluate_guess(&next.target, &guess);
        let solved = guess == next.target;
        let elapsed = (Utc::now() - next.started_at).num_seconds();

        let side = next.side_mut(seat);
        side.guesses.push(WordleGuess { word: guess, marks });
        if solved {
            side.solved = true;
            side.solve_elapsed_secs = Some(elapsed);
        }

        // A finished opponent forfeits their turns.
        next.turn = if !next.side(seat.other()).finished() {
            seat.other()
        } else {
            seat
        };

        Ok(RuleState::Wordle(next))
    }

    fn check_completion(&self, state: &RuleState) -> Completion {
        let state = match state {
            RuleState::Wordle(s) => s,
            _ => return Completion::ongoing(),
        };

        if state.sides.iter().all(|side| side.finished()) {
            Completion::finished(Scores::new(
                side_score(&state.sides[0]),
                side_score(&state.sides[1]),
            ))
        } else {
            Completion::ongoing()
        }
    }

    fn current_turn(&self, state: &RuleState) -> PlayerSlot {
        match state {
            RuleState::Wordle(s) => s.turn,
            _ => PlayerSlot::Player1,
        }
    }
}
