use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engines::{Completion, GameEngine, MoveError, RuleState};
use crate::models::match_state::{PlayerSlot, Scores};

const HAND_SIZE: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhotShape {
    Circle,
    Triangle,
    Cross,
    Square,
    Star,
    Whot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhotCard {
    pub shape: WhotShape,
    pub number: u8,
}

impl WhotCard {
    pub fn new(shape: WhotShape, number: u8) -> Self {
        WhotCard { shape, number }
    }
}

/// The standard 54-card Whot deck: not every shape carries every number.
pub fn full_deck() -> Vec<WhotCard> {
    let mut deck = Vec::with_capacity(54);
    let full_run = [1, 2, 3, 4, 5, 7, 8, 10, 11, 12, 13, 14];
    let short_run = [1, 2, 3, 5, 7, 10, 11, 13, 14];
    let star_run = [1, 2, 3, 4, 5, 7, 8];

    for number in full_run {
        deck.push(WhotCard::new(WhotShape::Circle, number));
        deck.push(WhotCard::new(WhotShape::Triangle, number));
    }
    for number in short_run {
        deck.push(WhotCard::new(WhotShape::Cross, number));
        deck.push(WhotCard::new(WhotShape::Square, number));
    }
    for number in star_run {
        deck.push(WhotCard::new(WhotShape::Star, number));
    }
    for _ in 0..5 {
        deck.push(WhotCard::new(WhotShape::Whot, 20));
    }
    deck
}

/// Hands, the face-down market and the played pile (last card is the
/// call card). `pending_pick` accumulates undefended Pick Two penalties;
/// `demanded_shape` is the shape named by the last Whot card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhotState {
    pub hands: [Vec<WhotCard>; 2],
    pub market: Vec<WhotCard>,
    pub pile: Vec<WhotCard>,
    pub turn: PlayerSlot,
    pub pending_pick: u8,
    pub demanded_shape: Option<WhotShape>,
}

impl WhotState {
    fn hand(&self, seat: PlayerSlot) -> &Vec<WhotCard> {
        match seat {
            PlayerSlot::Player1 => &self.hands[0],
            PlayerSlot::Player2 => &self.hands[1],
        }
    }

    fn hand_mut(&mut self, seat: PlayerSlot) -> &mut Vec<WhotCard> {
        match seat {
            PlayerSlot::Player1 => &mut self.hands[0],
            PlayerSlot::Player2 => &mut self.hands[1],
        }
    }

    fn call_card(&self) -> Option<&WhotCard> {
        self.pile.last()
    }

    /// Draw one card for `seat`, reshuffling the played pile under the
    /// call card back into the market when it runs dry.
    fn draw_one(&mut self, seat: PlayerSlot) -> bool {
        if self.market.is_empty() && self.pile.len() > 1 {
            let call = self.pile.pop();
            self.market.append(&mut self.pile);
            self.market.shuffle(&mut rand::thread_rng());
            if let Some(call) = call {
                self.pile.push(call);
            }
        }
        match self.market.pop() {
            Some(card) => {
                self.hand_mut(seat).push(card);
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WhotMoveRequest {
    /// Play a card from the hand; Whot cards must name a demanded shape.
    Play {
        card: WhotCard,
        #[serde(default)]
        demand: Option<WhotShape>,
    },
    /// Draw from the market (or accept the pending penalty).
    Market,
}

pub struct WhotEngine;

impl WhotEngine {
    fn state<'a>(&self, state: &'a RuleState) -> Result<&'a WhotState, MoveError> {
        match state {
            RuleState::Whot(s) => Ok(s),
            _ => Err(MoveError::StateMismatch),
        }
    }

    fn parse_move(&self, mv: &Value) -> Result<WhotMoveRequest, MoveError> {
        serde_json::from_value(mv.clone())
            .map_err(|e| MoveError::Malformed(format!("Expected play or market move: {}", e)))
    }

    fn check_play(
        &self,
        state: &WhotState,
        seat: PlayerSlot,
        card: &WhotCard,
        demand: Option<WhotShape>,
    ) -> Result<(), MoveError> {
        if !state.hand(seat).contains(card) {
            return Err(MoveError::Illegal("Card is not in your hand".to_string()));
        }

        if card.shape == WhotShape::Whot {
            match demand {
                Some(WhotShape::Whot) | None => {
                    return Err(MoveError::Malformed(
                        "A whot card must demand a shape".to_string(),
                    ));
                }
                Some(_) => {}
            }
        }

        // An undefended Pick Two can only be answered with another 2
        // (stacking the penalty) or by drawing the accumulated cards.
        if state.pending_pick > 0 {
            if card.number != 2 {
                return Err(MoveError::Illegal(format!(
                    "Defend with a 2 or pick {} from the market",
                    state.pending_pick
                )));
            }
            return Ok(());
        }

        if card.shape == WhotShape::Whot {
            return Ok(());
        }

        if let Some(demanded) = state.demanded_shape {
            if card.shape != demanded {
                return Err(MoveError::Illegal(format!(
                    "A {:?} was demanded",
                    demanded
                )));
            }
            return Ok(());
        }

        match state.call_card() {
            // Call card is a whot with no demand standing: free play.
            Some(call) if call.shape == WhotShape::Whot => Ok(()),
            Some(call) if card.shape == call.shape || card.number == call.number => Ok(()),
            Some(_) => Err(MoveError::Illegal(
                "Card matches neither shape nor number".to_string(),
            )),
            None => Ok(()),
        }
    }
}

impl GameEngine for WhotEngine {
    fn initialize(&self) -> RuleState {
        let mut market = full_deck();
        market.shuffle(&mut rand::thread_rng());

        let mut hands = [Vec::new(), Vec::new()];
        for _ in 0..HAND_SIZE {
            for hand in hands.iter_mut() {
                if let Some(card) = market.pop() {
                    hand.push(card);
                }
            }
        }

        // Flip the call card; whots go back under the market so the
        // opening call always names a shape.
        let mut pile = Vec::new();
        while let Some(card) = market.pop() {
            if card.shape == WhotShape::Whot {
                market.insert(0, card);
            } else {
                pile.push(card);
                break;
            }
        }

        RuleState::Whot(WhotState {
            hands,
            market,
            pile,
            turn: PlayerSlot::Player1,
            pending_pick: 0,
            demanded_shape: None,
        })
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
        if state.hands.iter().any(|hand| hand.is_empty()) {
            return Err(MoveError::Illegal("Game is already over".to_string()));
        }

        match self.parse_move(mv)? {
            WhotMoveRequest::Play { card, demand } => self.check_play(state, seat, &card, demand),
            WhotMoveRequest::Market => {
                if state.pending_pick == 0 && state.market.is_empty() && state.pile.len() <= 1 {
                    return Err(MoveError::Illegal("Market is exhausted".to_string()));
                }
                Ok(())
            }
        }
    }

    fn apply_move(
        &self,
        state: &RuleState,
        mv: &Value,
        seat: PlayerSlot,
    ) -> Result<RuleState, MoveError> {
        let state = self.state(state)?;
        let request = self.parse_move(mv)?;
        let mut next = state.clone();

        match request {
            WhotMoveRequest::Play { card, demand } => {
                self.check_play(&next, seat, &card, demand)?;

                let hand = next.hand_mut(seat);
                let position = hand
                    .iter()
                    .position(|c| *c == card)
                    .ok_or_else(|| MoveError::Illegal("Card is not in your hand".to_string()))?;
                hand.remove(position);
                next.pile.push(card);
                next.demanded_shape = None;

                match card.number {
                    // Hold On and Suspension both leave the turn with the
                    // player in a two-seat game.
                    1 | 8 => {}
                    2 => {
                        next.pending_pick += 2;
                        next.turn = seat.other();
                    }
                    14 => {
                        // General market: the opponent draws one.
                        next.draw_one(seat.other());
                        next.turn = seat.other();
                    }
                    20 => {
                        next.demanded_shape = demand;
                        next.turn = seat.other();
                    }
                    _ => {
                        next.turn = seat.other();
                    }
                }
            }
            WhotMoveRequest::Market => {
                let count = if next.pending_pick > 0 {
                    next.pending_pick
                } else {
                    1
                };
                for _ in 0..count {
                    if !next.draw_one(seat) {
                        break;
                    }
                }
                next.pending_pick = 0;
                next.turn = seat.other();
            }
        }

        Ok(RuleState::Whot(next))
    }

    fn check_completion(&self, state: &RuleState) -> Completion {
        let state = match state {
            RuleState::Whot(s) => s,
            _ => return Completion::ongoing(),
        };

        for (winner, loser) in [
            (PlayerSlot::Player1, PlayerSlot::Player2),
            (PlayerSlot::Player2, PlayerSlot::Player1),
        ] {
            if state.hand(winner).is_empty() {
                let remaining = state.hand(loser).len() as u32;
                return Completion::finished(Scores::for_winner(winner, 1000, remaining * 10));
            }
        }
        Completion::ongoing()
    }

    fn current_turn(&self, state: &RuleState) -> PlayerSlot {
        match state {
            RuleState::Whot(s) => s.turn,
            _ => PlayerSlot::Player1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn play(card: WhotCard) -> Value {
        json!({ "type": "play", "card": card })
    }

    fn fixed_state(p1: Vec<WhotCard>, p2: Vec<WhotCard>, call: WhotCard) -> WhotState {
        WhotState {
            hands: [p1, p2],
            market: vec![
                WhotCard::new(WhotShape::Star, 7),
                WhotCard::new(WhotShape::Circle, 12),
                WhotCard::new(WhotShape::Square, 10),
            ],
            pile: vec![call],
            turn: PlayerSlot::Player1,
            pending_pick: 0,
            demanded_shape: None,
        }
    }

    #[test]
    fn test_full_deck_has_fifty_four_cards() {
        let deck = full_deck();
        assert_eq!(deck.len(), 54);
        assert_eq!(
            deck.iter()
                .filter(|c| c.shape == WhotShape::Whot)
                .count(),
            5
        );
    }

    #[test]
    fn test_initialize_deals_six_each_and_flips_call_card() {
        let engine = WhotEngine;
        let RuleState::Whot(state) = engine.initialize() else {
            panic!("Expected whot state");
        };

        assert_eq!(state.hands[0].len(), 6);
        assert_eq!(state.hands[1].len(), 6);
        let call = state.call_card().unwrap();
        assert_ne!(call.shape, WhotShape::Whot);
        assert_eq!(
            state.hands[0].len() + state.hands[1].len() + state.market.len() + state.pile.len(),
            54
        );
    }

    #[test]
    fn test_shape_match_accepted_number_mismatch_rejected() {
        let engine = WhotEngine;
        let shape_match = WhotCard::new(WhotShape::Circle, 3);
        let no_match = WhotCard::new(WhotShape::Triangle, 4);
        let state = RuleState::Whot(fixed_state(
            vec![shape_match, no_match],
            vec![WhotCard::new(WhotShape::Star, 1)],
            WhotCard::new(WhotShape::Circle, 7),
        ));

        assert!(engine
            .validate_move(&state, &play(shape_match), PlayerSlot::Player1)
            .is_ok());
        assert!(matches!(
            engine.validate_move(&state, &play(no_match), PlayerSlot::Player1),
            Err(MoveError::Illegal(_))
        ));
    }

    #[test]
    fn test_number_match_accepted() {
        let engine = WhotEngine;
        let number_match = WhotCard::new(WhotShape::Square, 7);
        let state = RuleState::Whot(fixed_state(
            vec![number_match],
            vec![WhotCard::new(WhotShape::Star, 1)],
            WhotCard::new(WhotShape::Circle, 7),
        ));

        assert!(engine
            .validate_move(&state, &play(number_match), PlayerSlot::Player1)
            .is_ok());
    }

    #[test]
    fn test_hold_on_keeps_turn() {
        let engine = WhotEngine;
        let hold_on = WhotCard::new(WhotShape::Circle, 1);
        let state = RuleState::Whot(fixed_state(
            vec![hold_on, WhotCard::new(WhotShape::Star, 4)],
            vec![WhotCard::new(WhotShape::Star, 2)],
            WhotCard::new(WhotShape::Circle, 7),
        ));

        let next = engine
            .apply_move(&state, &play(hold_on), PlayerSlot::Player1)
            .unwrap();

        assert_eq!(engine.current_turn(&next), PlayerSlot::Player1);
    }

    #[test]
    fn test_suspension_keeps_turn() {
        let engine = WhotEngine;
        let suspension = WhotCard::new(WhotShape::Circle, 8);
        let state = RuleState::Whot(fixed_state(
            vec![suspension, WhotCard::new(WhotShape::Star, 4)],
            vec![WhotCard::new(WhotShape::Star, 2)],
            WhotCard::new(WhotShape::Circle, 7),
        ));

        let next = engine
            .apply_move(&state, &play(suspension), PlayerSlot::Player1)
            .unwrap();

        assert_eq!(engine.current_turn(&next), PlayerSlot::Player1);
    }

    #[test]
    fn test_pick_two_must_be_defended_or_drawn() {
        let engine = WhotEngine;
        let pick_two = WhotCard::new(WhotShape::Circle, 2);
        let defending_two = WhotCard::new(WhotShape::Square, 2);
        let plain = WhotCard::new(WhotShape::Circle, 5);
        let mut state = fixed_state(
            vec![pick_two, WhotCard::new(WhotShape::Star, 4)],
            vec![defending_two, plain],
            WhotCard::new(WhotShape::Circle, 7),
        );

        let RuleState::Whot(after_attack) = engine
            .apply_move(&RuleState::Whot(state.clone()), &play(pick_two), PlayerSlot::Player1)
            .unwrap()
        else {
            panic!("Expected whot state");
        };
        assert_eq!(after_attack.pending_pick, 2);
        assert_eq!(after_attack.turn, PlayerSlot::Player2);

        // A non-2 cannot answer the penalty.
        let wrapped = RuleState::Whot(after_attack.clone());
        assert!(matches!(
            engine.validate_move(&wrapped, &play(plain), PlayerSlot::Player2),
            Err(MoveError::Illegal(_))
        ));
        // Another 2 stacks it back.
        assert!(engine
            .validate_move(&wrapped, &play(defending_two), PlayerSlot::Player2)
            .is_ok());

        // Drawing from the market clears the penalty with two cards.
        state = after_attack;
        let hand_before = state.hands[1].len();
        let RuleState::Whot(after_draw) = engine
            .apply_move(
                &RuleState::Whot(state),
                &json!({ "type": "market" }),
                PlayerSlot::Player2,
            )
            .unwrap()
        else {
            panic!("Expected whot state");
        };
        assert_eq!(after_draw.hands[1].len(), hand_before + 2);
        assert_eq!(after_draw.pending_pick, 0);
    }

    #[test]
    fn test_general_market_makes_opponent_draw() {
        let engine = WhotEngine;
        let general_market = WhotCard::new(WhotShape::Circle, 14);
        let state = RuleState::Whot(fixed_state(
            vec![general_market, WhotCard::new(WhotShape::Star, 4)],
            vec![WhotCard::new(WhotShape::Star, 2)],
            WhotCard::new(WhotShape::Circle, 7),
        ));

        let RuleState::Whot(next) = engine
            .apply_move(&state, &play(general_market), PlayerSlot::Player1)
            .unwrap()
        else {
            panic!("Expected whot state");
        };

        assert_eq!(next.hands[1].len(), 2);
        assert_eq!(next.turn, PlayerSlot::Player2);
    }

    #[test]
    fn test_whot_card_demands_shape() {
        let engine = WhotEngine;
        let whot = WhotCard::new(WhotShape::Whot, 20);
        let star = WhotCard::new(WhotShape::Star, 4);
        let circle = WhotCard::new(WhotShape::Circle, 5);
        let state = RuleState::Whot(fixed_state(
            vec![whot, WhotCard::new(WhotShape::Star, 7)],
            vec![star, circle],
            WhotCard::new(WhotShape::Circle, 7),
        ));

        // No demand named: malformed.
        assert!(matches!(
            engine.validate_move(&state, &play(whot), PlayerSlot::Player1),
            Err(MoveError::Malformed(_))
        ));

        let request = json!({ "type": "play", "card": whot, "demand": "star" });
        let next = engine
            .apply_move(&state, &request, PlayerSlot::Player1)
            .unwrap();

        // Only the demanded shape answers.
        assert!(matches!(
            engine.validate_move(&next, &play(circle), PlayerSlot::Player2),
            Err(MoveError::Illegal(_))
        ));
        assert!(engine
            .validate_move(&next, &play(star), PlayerSlot::Player2)
            .is_ok());
    }

    #[test]
    fn test_hand_empty_wins_thousand_to_tens() {
        let engine = WhotEngine;
        let last_card = WhotCard::new(WhotShape::Circle, 5);
        let state = RuleState::Whot(fixed_state(
            vec![last_card],
            vec![
                WhotCard::new(WhotShape::Star, 2),
                WhotCard::new(WhotShape::Star, 3),
                WhotCard::new(WhotShape::Square, 10),
            ],
            WhotCard::new(WhotShape::Circle, 7),
        ));

        let next = engine
            .apply_move(&state, &play(last_card), PlayerSlot::Player1)
            .unwrap();

        let completion = engine.check_completion(&next);
        assert!(completion.is_complete);
        assert_eq!(completion.scores, Some(Scores::new(1000, 30)));
    }

    #[test]
    fn test_card_not_in_hand_rejected() {
        let engine = WhotEngine;
        let state = RuleState::Whot(fixed_state(
            vec![WhotCard::new(WhotShape::Star, 4)],
            vec![WhotCard::new(WhotShape::Star, 2)],
            WhotCard::new(WhotShape::Circle, 7),
        ));

        let ghost = WhotCard::new(WhotShape::Circle, 7);
        assert!(matches!(
            engine.validate_move(&state, &play(ghost), PlayerSlot::Player1),
            Err(MoveError::Illegal(_))
        ));
    }
}
