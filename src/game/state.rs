use std::collections::BTreeSet;

use crate::layout::CardPosition;
use crate::selector::Item;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum GamePhase {
    #[default]
    Idle,
    Shuffling,
    Dealing,
    Waiting,
    Revealing,
    Finished,
}

impl GamePhase {
    pub fn name(self) -> &'static str {
        match self {
            GamePhase::Idle => "idle",
            GamePhase::Shuffling => "shuffling",
            GamePhase::Dealing => "dealing",
            GamePhase::Waiting => "waiting",
            GamePhase::Revealing => "revealing",
            GamePhase::Finished => "finished",
        }
    }

    /// Phases in which `start()` may begin a new round.
    pub fn accepts_start(self) -> bool {
        matches!(self, GamePhase::Idle | GamePhase::Finished)
    }
}

pub type CardId = usize;

#[derive(Clone, Debug, PartialEq)]
pub struct GameCard {
    pub id: CardId,
    /// `None` is a blank, non-winning card.
    pub content: Option<Item>,
    pub position: CardPosition,
    pub is_winner: bool,
    pub revealed: bool,
    /// Set once the deal sequence has brought the card onto the table.
    pub visible: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GameState {
    pub phase: GamePhase,
    pub cards: Vec<GameCard>,
    pub revealed_ids: BTreeSet<CardId>,
    pub winners: Vec<Item>,
}

impl GameState {
    pub fn card(&self, id: CardId) -> Option<&GameCard> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn all_revealed(&self) -> bool {
        !self.cards.is_empty() && self.revealed_ids.len() == self.cards.len()
    }

    pub fn winner_cards(&self) -> usize {
        self.cards.iter().filter(|c| c.is_winner).count()
    }

    pub fn visible_cards(&self) -> usize {
        self.cards.iter().filter(|c| c.visible).count()
    }
}
