use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engines::{Completion, GameEngine, MoveError, RuleState};
use crate::models::match_state::{PlayerSlot, Scores};

const MAX_STRIKES: u8 = 3;
const ELIMINATION_POINTS: u32 = 500;

/// Embedded survey bank: prompt plus ranked answers with point values.
const QUESTION_BANK: &[(&str, &[(&str, u32)])] = &[
    (
        "Name something people do right before going to bed",
        &[
            ("brush teeth", 40),
            ("read", 25),
            ("watch tv", 15),
            ("pray", 10),
            ("set an alarm", 10),
        ],
    ),
    (
        "Name a reason people are late for work",
        &[
            ("traffic", 45),
            ("overslept", 30),
            ("bad weather", 15),
            ("flat tire", 10),
        ],
    ),
    (
        "Name something you would find on a beach",
        &[
            ("sand", 35),
            ("shells", 25),
            ("seaweed", 15),
            ("crabs", 15),
            ("umbrella", 10),
        ],
    ),
    (
        "Name a food people eat with their hands",
        &[
            ("pizza", 35),
            ("burger", 25),
            ("chicken", 20),
            ("sandwich", 10),
            ("fries", 10),
        ],
    ),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyAnswer {
    pub text: String,
    pub points: u32,
    pub revealed: bool,
}

/// Players alternate guesses at the hidden answers. Three strikes
/// eliminates; otherwise revealed points accumulate per player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyState {
    pub question: String,
    pub answers: Vec<SurveyAnswer>,
    pub strikes: [u8; 2],
    pub points: [u32; 2],
    pub turn: PlayerSlot,
    pub eliminated: Option<PlayerSlot>,
}

impl SurveyState {
    pub fn from_bank(index: usize) -> Self {
        let (question, answers) = QUESTION_BANK[index % QUESTION_BANK.len()];
        SurveyState {
            question: question.to_string(),
            answers: answers
                .iter()
                .map(|(text, points)| SurveyAnswer {
                    text: text.to_string(),
                    points: *points,
                    revealed: false,
                })
                .collect(),
            strikes: [0, 0],
            points: [0, 0],
            turn: PlayerSlot::Player1,
            eliminated: None,
        }
    }

    fn all_revealed(&self) -> bool {
        self.answers.iter().all(|answer| answer.revealed)
    }

    fn seat_index(seat: PlayerSlot) -> usize {
        match seat {
            PlayerSlot::Player1 => 0,
            PlayerSlot::Player2 => 1,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SurveyMoveRequest {
    guess: String,
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

pub struct SurveyEngine;

impl SurveyEngine {
    fn state<'a>(&self, state: &'a RuleState) -> Result<&'a SurveyState, MoveError> {
        match state {
            RuleState::Survey(s) => Ok(s),
            _ => Err(MoveError::StateMismatch),
        }
    }

    fn parse_move(&self, mv: &Value) -> Result<SurveyMoveRequest, MoveError> {
        serde_json::from_value(mv.clone())
            .map_err(|e| MoveError::Malformed(format!("Expected {{guess}}: {}", e)))
    }
}

impl GameEngine for SurveyEngine {
    fn initialize(&self) -> RuleState {
        let index = rand::thread_rng().gen_range(0..QUESTION_BANK.len());
        RuleState::Survey(SurveyState::from_bank(index))
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
        if state.eliminated.is_some() || state.all_revealed() {
            return Err(MoveError::Illegal("Game is already over".to_string()));
        }

        let request = self.parse_move(mv)?;
        if normalize(&request.guess).is_empty() {
            return Err(MoveError::Malformed("Guess cannot be empty".to_string()));
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
        let guess = normalize(&request.guess);

        let mut next = state.clone();
        let seat_index = SurveyState::seat_index(seat);

        // A guess only counts against unrevealed answers; repeating a
        // revealed one is a strike like any miss.
        let hit = next
            .answers
            .iter_mut()
            .find(|answer| !answer.revealed && normalize(&answer.text) == guess);

        match hit {
            Some(answer) => {
                answer.revealed = true;
                next.points[seat_index] += answer.points;
            }
            None => {
                next.strikes[seat_index] += 1;
                if next.strikes[seat_index] >= MAX_STRIKES {
                    next.eliminated = Some(seat);
                }
            }
        }

        next.turn = seat.other();
        Ok(RuleState::Survey(next))
    }

    fn check_completion(&self, state: &RuleState) -> Completion {
        let state = match state {
            RuleState::Survey(s) => s,
            _ => return Completion::ongoing(),
        };

        if let Some(struck_out) = state.eliminated {
            return Completion::finished(Scores::for_winner(
                struck_out.other(),
                ELIMINATION_POINTS,
                0,
            ));
        }
        if state.all_revealed() {
            return Completion::finished(Scores::new(state.points[0], state.points[1]));
        }
        Completion::ongoing()
    }

    fn current_turn(&self, state: &RuleState) -> PlayerSlot {
        match state {
            RuleState::Survey(s) => s.turn,
            _ => PlayerSlot::Player1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn guess(text: &str) -> Value {
        json!({ "guess": text })
    }

    #[test]
    fn test_correct_guess_reveals_and_scores() {
        let engine = SurveyEngine;
        let state = RuleState::Survey(SurveyState::from_bank(1));

        let next = engine
            .apply_move(&state, &guess("  TRAFFIC "), PlayerSlot::Player1)
            .unwrap();

        let RuleState::Survey(s) = &next else {
            panic!("Expected survey state");
        };
        assert!(s.answers[0].revealed);
        assert_eq!(s.points[0], 45);
        assert_eq!(s.strikes[0], 0);
        assert_eq!(engine.current_turn(&next), PlayerSlot::Player2);
    }

    #[test]
    fn test_wrong_guess_is_a_strike() {
        let engine = SurveyEngine;
        let state = RuleState::Survey(SurveyState::from_bank(1));

        let next = engine
            .apply_move(&state, &guess("aliens"), PlayerSlot::Player1)
            .unwrap();

        let RuleState::Survey(s) = &next else {
            panic!("Expected survey state");
        };
        assert_eq!(s.strikes[0], 1);
        assert_eq!(s.points[0], 0);
    }

    #[test]
    fn test_repeated_answer_counts_as_strike() {
        let engine = SurveyEngine;
        let mut state = SurveyState::from_bank(1);
        state.answers[0].revealed = true;

        let next = engine
            .apply_move(
                &RuleState::Survey(state),
                &guess("traffic"),
                PlayerSlot::Player1,
            )
            .unwrap();

        let RuleState::Survey(s) = &next else {
            panic!("Expected survey state");
        };
        assert_eq!(s.strikes[0], 1);
    }

    #[test]
    fn test_three_strikes_eliminates_and_opponent_takes_five_hundred() {
        let engine = SurveyEngine;
        let mut state = SurveyState::from_bank(0);
        state.strikes[1] = 2;
        state.turn = PlayerSlot::Player2;

        let next = engine
            .apply_move(
                &RuleState::Survey(state),
                &guess("nonsense"),
                PlayerSlot::Player2,
            )
            .unwrap();

        let completion = engine.check_completion(&next);
        assert!(completion.is_complete);
        assert_eq!(completion.scores, Some(Scores::new(500, 0)));
    }

    #[test]
    fn test_all_revealed_scores_accumulated_points() {
        let engine = SurveyEngine;
        let mut state = SurveyState::from_bank(1);
        // Three of four already revealed and credited to player1.
        for answer in state.answers.iter_mut().take(3) {
            answer.revealed = true;
        }
        state.points = [90, 0];
        state.turn = PlayerSlot::Player2;

        let next = engine
            .apply_move(
                &RuleState::Survey(state),
                &guess("flat tire"),
                PlayerSlot::Player2,
            )
            .unwrap();

        let completion = engine.check_completion(&next);
        assert!(completion.is_complete);
        assert_eq!(completion.scores, Some(Scores::new(90, 10)));
    }

    #[test]
    fn test_empty_guess_rejected() {
        let engine = SurveyEngine;
        let state = RuleState::Survey(SurveyState::from_bank(0));

        let result = engine.validate_move(&state, &guess("   "), PlayerSlot::Player1);

        assert!(matches!(result, Err(MoveError::Malformed(_))));
    }

    #[test]
    fn test_completion_idempotent_after_elimination() {
        let engine = SurveyEngine;
        let mut state = SurveyState::from_bank(0);
        state.eliminated = Some(PlayerSlot::Player1);
        let state = RuleState::Survey(state);

        let first = engine.check_completion(&state);
        let second = engine.check_completion(&state);

        assert_eq!(first, second);
        assert_eq!(first.scores, Some(Scores::new(0, 500)));
    }
}
