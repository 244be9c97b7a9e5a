use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::error::ErrorKind;
use crate::selector::Item;

use super::state::{CardId, GameCard, GamePhase};

/// Notifications from the phase machine to whatever renders the game.
pub trait GameObserver {
    fn on_phase_change(&mut self, phase: GamePhase);
    fn on_complete(&mut self, winners: &[Item]);
    /// Degraded layout; the game carries on.
    fn on_layout_warning(&mut self, message: &str);
    /// Setup failed; the machine is back in `Idle` (or unchanged).
    fn on_error(&mut self, kind: ErrorKind, message: &str);

    fn on_card_dealt(&mut self, _card: &GameCard) {}
    fn on_card_revealed(&mut self, _card: &GameCard) {}
    fn on_positions_changed(&mut self, _cards: &[GameCard]) {}
}

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    PhaseChanged(GamePhase),
    Completed(Vec<Item>),
    LayoutWarning(String),
    Error(ErrorKind, String),
    CardDealt(CardId),
    CardRevealed(CardId),
    PositionsChanged,
}

/// Observer that queues every notification. Clones share the queue, so the
/// host keeps one handle and gives the other to the machine.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<VecDeque<GameEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<GameEvent> {
        self.events.borrow_mut().drain(..).collect()
    }

    pub fn snapshot(&self) -> Vec<GameEvent> {
        self.events.borrow().iter().cloned().collect()
    }

    pub fn count(&self, pred: impl Fn(&GameEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| pred(e)).count()
    }

    fn push(&self, event: GameEvent) {
        self.events.borrow_mut().push_back(event);
    }
}

impl GameObserver for EventLog {
    fn on_phase_change(&mut self, phase: GamePhase) {
        self.push(GameEvent::PhaseChanged(phase));
    }

    fn on_complete(&mut self, winners: &[Item]) {
        self.push(GameEvent::Completed(winners.to_vec()));
    }

    fn on_layout_warning(&mut self, message: &str) {
        self.push(GameEvent::LayoutWarning(message.to_string()));
    }

    fn on_error(&mut self, kind: ErrorKind, message: &str) {
        self.push(GameEvent::Error(kind, message.to_string()));
    }

    fn on_card_dealt(&mut self, card: &GameCard) {
        self.push(GameEvent::CardDealt(card.id));
    }

    fn on_card_revealed(&mut self, card: &GameCard) {
        self.push(GameEvent::CardRevealed(card.id));
    }

    fn on_positions_changed(&mut self, _cards: &[GameCard]) {
        self.push(GameEvent::PositionsChanged);
    }
}
