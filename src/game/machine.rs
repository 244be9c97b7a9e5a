//! All timing goes through the machine's own `Scheduler`; the host calls
//! `tick` from its event loop.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, warn};

use crate::config::{AnimationTiming, GameConfig, LotteryConfig};
use crate::device::Viewport;
use crate::error::ValidationError;
use crate::layout::{CardPosition, LayoutEngine, LayoutRequest, LayoutResult};
use crate::margins::ChromeFlags;
use crate::selector::{self, Item};

use super::events::GameObserver;
use super::resize::ResizeReconciler;
use super::scheduler::{Action, Scheduler};
use super::state::{CardId, GameCard, GamePhase, GameState};

// Winners and table size fixed by `start`, dealt at shuffle completion.
struct PendingDeal {
    winners: Vec<Item>,
    card_count: usize,
}

pub struct GamePhaseMachine {
    timing: AnimationTiming,
    game: GameConfig,
    engine: LayoutEngine,
    observer: Box<dyn GameObserver>,
    rng: StdRng,
    scheduler: Scheduler,
    resize: ResizeReconciler,
    state: GameState,
    viewport: Viewport,
    // what the dealt positions were solved for
    layout_viewport: Viewport,
    layout_chrome: ChromeFlags,
    pending: Option<PendingDeal>,
    generation: u64,
    completed: bool,
    alive: bool,
    last_warning: Option<String>,
}

impl GamePhaseMachine {
    pub fn new(
        config: &LotteryConfig,
        engine: LayoutEngine,
        viewport: Viewport,
        observer: Box<dyn GameObserver>,
    ) -> Self {
        let timing = config.effective_timing();
        GamePhaseMachine {
            timing,
            game: config.game,
            engine,
            observer,
            rng: StdRng::from_os_rng(),
            scheduler: Scheduler::new(),
            resize: ResizeReconciler::new(timing.resize_debounce_ms, config.game.position_tolerance),
            state: GameState::default(),
            viewport,
            layout_viewport: viewport,
            layout_chrome: config.game.chrome,
            pending: None,
            generation: 0,
            completed: false,
            alive: true,
            last_warning: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn cards(&self) -> &[GameCard] {
        &self.state.cards
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn layout_viewport(&self) -> Viewport {
        self.layout_viewport
    }

    pub fn layout_chrome(&self) -> ChromeFlags {
        self.layout_chrome
    }

    pub fn chrome(&self) -> ChromeFlags {
        self.game.chrome
    }

    pub fn engine(&self) -> &LayoutEngine {
        &self.engine
    }

    pub fn timing(&self) -> &AnimationTiming {
        &self.timing
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn next_due_in(&self) -> Option<u64> {
        if !self.alive {
            return None;
        }
        self.scheduler.next_due_in()
    }

    pub fn start(&mut self, items: &[Item], quantity: usize, allow_repeat: bool) -> Result<(), ValidationError> {
        if !self.alive {
            debug!("start refused after destroy");
            return Err(ValidationError::Destroyed);
        }
        if !self.state.phase.accepts_start() {
            let err = ValidationError::GameInProgress {
                phase: self.state.phase,
            };
            self.observer.on_error(err.kind(), &err.to_string());
            return Err(err);
        }

        self.last_warning = None;
        let deal = match self.prepare(items, quantity, allow_repeat) {
            Ok(deal) => deal,
            Err(err) => {
                debug!(error = %err, "start rejected");
                if self.state.phase != GamePhase::Idle {
                    self.discard_round();
                    self.set_phase(GamePhase::Idle);
                }
                self.observer.on_error(err.kind(), &err.to_string());
                return Err(err);
            }
        };

        self.discard_round();
        self.state.winners = deal.winners.clone();
        self.pending = Some(deal);
        self.set_phase(GamePhase::Shuffling);
        if let Some(ms) = self.timing.shuffle_ms {
            self.schedule(ms, Action::ShuffleComplete);
        }
        Ok(())
    }

    pub fn shuffle_complete(&mut self) {
        if !self.alive || self.state.phase != GamePhase::Shuffling {
            return;
        }
        let Some(deal) = self.pending.take() else {
            warn!("shuffling without a pending deal");
            self.set_phase(GamePhase::Idle);
            return;
        };

        let layout = self.solve(deal.card_count, deal.card_count);
        self.layout_viewport = self.viewport;
        self.layout_chrome = self.game.chrome;
        self.report_degradation(&layout);
        let slots = selector::assign_to_slots(&deal.winners, deal.card_count, &mut self.rng);
        let solver = self.engine.solver();
        self.state.cards = (0..deal.card_count)
            .map(|i| {
                let content = slots.get(&i).cloned();
                GameCard {
                    id: i,
                    is_winner: content.is_some(),
                    content,
                    position: layout
                        .positions
                        .get(i)
                        .copied()
                        .unwrap_or_else(|| solver.fallback_position(i, deal.card_count)),
                    revealed: false,
                    visible: false,
                }
            })
            .collect();

        self.set_phase(GamePhase::Dealing);
        self.schedule(self.timing.deal_interval_ms, Action::DealCard(0));
    }

    pub fn flip(&mut self, id: CardId) -> bool {
        if !self.alive || self.state.phase != GamePhase::Waiting {
            return false;
        }
        let Some(card) = self.state.cards.iter_mut().find(|c| c.id == id) else {
            return false;
        };
        if card.revealed {
            return false;
        }
        card.revealed = true;
        self.state.revealed_ids.insert(id);
        self.observer.on_card_revealed(card);
        self.set_phase(GamePhase::Revealing);
        self.schedule(self.timing.flip_ms, Action::FlipSettled(id));
        true
    }

    pub fn on_resize(&mut self, viewport: Viewport) {
        if !self.alive {
            return;
        }
        self.viewport = viewport;
        let token = self.resize.request(viewport);
        self.schedule(self.resize.debounce_ms(), Action::ApplyResize(token));
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    // Reflows through the debounced resize path.
    pub fn set_chrome(&mut self, chrome: ChromeFlags) {
        if self.game.chrome == chrome {
            return;
        }
        self.game.chrome = chrome;
        self.on_resize(self.viewport);
    }

    pub fn tick(&mut self, elapsed_ms: u64) {
        if !self.alive {
            return;
        }
        let until = self.scheduler.now_ms().saturating_add(elapsed_ms);
        while let Some(step) = self.scheduler.pop_due(until) {
            if step.generation != self.generation {
                debug!(?step, "dropping step from an earlier round");
                continue;
            }
            self.run(step.action);
        }
        self.scheduler.advance_to(until);
    }

    pub fn run_until_idle(&mut self) {
        while let Some(delay) = self.next_due_in() {
            self.tick(delay);
        }
    }

    pub fn destroy(&mut self) {
        if !self.alive {
            return;
        }
        self.alive = false;
        self.scheduler.cancel_all();
        self.resize.cancel();
        self.pending = None;
        debug!(phase = self.state.phase.name(), "game destroyed");
    }

    fn prepare(&mut self, items: &[Item], quantity: usize, allow_repeat: bool) -> Result<PendingDeal, ValidationError> {
        let vp = self.viewport;
        if !vp.is_finite() || vp.width <= 0.0 || vp.height <= 0.0 {
            return Err(ValidationError::InvalidViewport {
                width: vp.width,
                height: vp.height,
            });
        }
        selector::validate(items.len(), quantity, allow_repeat)?;

        let card_count = self.game.deck_size.map_or(quantity, |size| size.max(quantity));
        let blanks = card_count - quantity;
        let item_cap = if allow_repeat { card_count } else { items.len() + blanks };
        let layout = self.solve(card_count, item_cap);
        self.report_degradation(&layout);

        let mut winners = selector::select(items, quantity, allow_repeat, &mut self.rng)?;
        let solved = layout.solved();
        if winners.len() > solved {
            self.warn_layout(format!(
                "only {solved} cards fit on screen; drawing {solved} of {quantity} requested winners"
            ));
            winners.truncate(solved);
        }
        Ok(PendingDeal {
            winners,
            card_count: solved,
        })
    }

    fn run(&mut self, action: Action) {
        match action {
            Action::ShuffleComplete => self.shuffle_complete(),
            Action::DealCard(index) => self.deal_card(index),
            Action::DealSettled => {
                if self.state.phase == GamePhase::Dealing {
                    self.set_phase(GamePhase::Waiting);
                }
            }
            Action::FlipSettled(id) => self.flip_settled(id),
            Action::ApplyResize(token) => self.apply_resize(token),
        }
    }

    fn deal_card(&mut self, index: usize) {
        if self.state.phase != GamePhase::Dealing {
            return;
        }
        let total = self.state.cards.len();
        match self.state.cards.get_mut(index) {
            Some(card) => {
                if !card.position.is_finite() {
                    warn!(index, "card has no usable position, placing it on the fallback stack");
                    card.position = self.engine.solver().fallback_position(index, total);
                }
                card.visible = true;
                self.observer.on_card_dealt(card);
            }
            None => warn!(index, total, "deal step for a missing card"),
        }

        if index + 1 < total {
            self.schedule(self.timing.deal_interval_ms, Action::DealCard(index + 1));
        } else {
            self.schedule(self.timing.deal_settle_ms, Action::DealSettled);
        }
    }

    fn flip_settled(&mut self, id: CardId) {
        if self.state.phase != GamePhase::Revealing {
            return;
        }
        debug!(card = id, revealed = self.state.revealed_ids.len(), "flip settled");
        if self.state.all_revealed() {
            self.set_phase(GamePhase::Finished);
            if !self.completed {
                self.completed = true;
                self.observer.on_complete(&self.state.winners);
            }
        } else {
            self.set_phase(GamePhase::Waiting);
        }
    }

    fn apply_resize(&mut self, token: u64) {
        let Some(viewport) = self.resize.take_settled(token) else {
            return;
        };
        self.layout_viewport = viewport;
        self.layout_chrome = self.game.chrome;
        let count = self.state.cards.len();
        if count == 0 {
            return;
        }
        let layout = self.engine.layout(&LayoutRequest::new(viewport, self.game.chrome, count, count));
        self.report_degradation(&layout);
        if self
            .resize
            .reconcile(&mut self.state.cards, &layout, self.engine.solver())
        {
            debug!(count, tier = layout.tier.as_str(), "cards reflowed");
            self.observer.on_positions_changed(&self.state.cards);
        }
    }

    fn solve(&self, card_count: usize, item_count: usize) -> LayoutResult {
        self.engine
            .layout(&LayoutRequest::new(self.viewport, self.game.chrome, card_count, item_count))
    }

    fn report_degradation(&mut self, layout: &LayoutResult) {
        if let Some(degradation) = layout.degradation() {
            self.warn_layout(degradation.to_string());
        }
    }

    // Repeats of the same message back to back are collapsed.
    fn warn_layout(&mut self, message: String) {
        if self.last_warning.as_deref() == Some(message.as_str()) {
            return;
        }
        warn!("{message}");
        self.observer.on_layout_warning(&message);
        self.last_warning = Some(message);
    }

    fn schedule(&mut self, delay_ms: u64, action: Action) {
        self.scheduler.schedule(delay_ms, self.generation, action);
    }

    fn discard_round(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.scheduler.cancel_all();
        self.pending = None;
        self.completed = false;
        let phase = self.state.phase;
        self.state = GameState {
            phase,
            ..GameState::default()
        };
    }

    fn set_phase(&mut self, phase: GamePhase) {
        if self.state.phase == phase {
            return;
        }
        debug!(from = self.state.phase.name(), to = phase.name(), "phase change");
        self.state.phase = phase;
        self.observer.on_phase_change(phase);
    }

    pub fn card_position(&self, id: CardId) -> Option<CardPosition> {
        self.state.card(id).map(|c| c.position)
    }
}

impl Drop for GamePhaseMachine {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Size;
    use crate::error::ErrorKind;
    use crate::game::events::{EventLog, GameEvent};

    fn items(n: usize) -> Vec<Item> {
        (0..n).map(|i| Item::new(format!("{i}"), format!("Item {i}"))).collect()
    }

    fn machine(config: LotteryConfig) -> (GamePhaseMachine, EventLog) {
        let log = EventLog::new();
        let m = GamePhaseMachine::new(
            &config,
            LayoutEngine::with_defaults(),
            Size::new(1024.0, 768.0),
            Box::new(log.clone()),
        )
        .with_seed(11);
        (m, log)
    }

    fn manual_shuffle() -> LotteryConfig {
        let mut config = LotteryConfig::default();
        config.timing.shuffle_ms = None;
        config
    }

    #[test]
    fn rejected_start_stays_idle() {
        let (mut m, log) = machine(LotteryConfig::default());
        assert_eq!(m.start(&[], 1, false), Err(ValidationError::EmptyItems));
        assert_eq!(m.phase(), GamePhase::Idle);
        assert_eq!(log.drain(), vec![GameEvent::Error(ErrorKind::EmptyItems, "no items to draw from".into())]);
        assert!(m.next_due_in().is_none());
    }

    #[test]
    fn invalid_viewport_is_a_validation_error() {
        let (mut m, _) = machine(LotteryConfig::default());
        m.set_viewport(Size::new(0.0, 768.0));
        let err = m.start(&items(3), 1, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidViewport);
    }

    #[test]
    fn shuffle_waits_for_host_when_not_timed() {
        let (mut m, _) = machine(manual_shuffle());
        m.start(&items(5), 3, false).unwrap();
        m.tick(60_000);
        assert_eq!(m.phase(), GamePhase::Shuffling);
        m.shuffle_complete();
        assert_eq!(m.phase(), GamePhase::Dealing);
        assert_eq!(m.cards().len(), 3);
        assert!(m.cards().iter().all(|c| !c.visible && !c.revealed));
    }

    #[test]
    fn timed_shuffle_completes_on_its_own() {
        let (mut m, _) = machine(LotteryConfig::default());
        m.start(&items(5), 2, false).unwrap();
        m.tick(999);
        assert_eq!(m.phase(), GamePhase::Shuffling);
        m.tick(1);
        assert_eq!(m.phase(), GamePhase::Dealing);
        // the late host signal is harmless
        m.shuffle_complete();
        assert_eq!(m.phase(), GamePhase::Dealing);
    }

    #[test]
    fn deal_is_strictly_sequential() {
        let (mut m, log) = machine(manual_shuffle());
        m.start(&items(6), 4, false).unwrap();
        m.shuffle_complete();
        log.drain();

        let interval = m.timing().deal_interval_ms;
        for expected in 1..=4 {
            m.tick(interval);
            assert_eq!(m.state().visible_cards(), expected);
        }
        assert_eq!(m.phase(), GamePhase::Dealing);
        m.tick(m.timing().deal_settle_ms);
        assert_eq!(m.phase(), GamePhase::Waiting);

        let dealt: Vec<_> = log
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::CardDealt(id) => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(dealt, vec![0, 1, 2, 3]);
    }

    #[test]
    fn flips_only_count_once() {
        let (mut m, log) = machine(manual_shuffle());
        m.start(&items(5), 2, false).unwrap();
        m.shuffle_complete();
        m.run_until_idle();
        assert_eq!(m.phase(), GamePhase::Waiting);

        assert!(m.flip(0));
        assert!(!m.flip(0), "no flips while revealing");
        m.tick(m.timing().flip_ms);
        assert_eq!(m.phase(), GamePhase::Waiting);
        assert!(!m.flip(0), "already revealed");
        assert!(!m.flip(99), "unknown card");
        assert_eq!(m.state().revealed_ids.len(), 1);
        assert_eq!(log.count(|e| matches!(e, GameEvent::CardRevealed(0))), 1);
    }

    #[test]
    fn completes_exactly_once() {
        let (mut m, log) = machine(manual_shuffle());
        m.start(&items(5), 3, false).unwrap();
        m.shuffle_complete();
        m.run_until_idle();
        for id in 0..3 {
            assert!(m.flip(id));
            m.run_until_idle();
        }
        assert_eq!(m.phase(), GamePhase::Finished);
        m.tick(10_000);
        let completions: Vec<_> = log
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::Completed(w) => Some(w),
                _ => None,
            })
            .collect();
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].len(), m.state().winner_cards());
        assert_eq!(completions[0], m.state().winners);
    }

    #[test]
    fn start_is_rejected_mid_round() {
        let (mut m, log) = machine(manual_shuffle());
        m.start(&items(5), 2, false).unwrap();
        log.drain();
        let err = m.start(&items(5), 2, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GameInProgress);
        assert_eq!(m.phase(), GamePhase::Shuffling);
    }

    #[test]
    fn restart_from_finished_discards_old_cards() {
        let mut config = manual_shuffle();
        config.game.deck_size = Some(4);
        let (mut m, _) = machine(config);
        m.start(&items(5), 1, false).unwrap();
        m.shuffle_complete();
        m.run_until_idle();
        for id in 0..4 {
            m.flip(id);
            m.run_until_idle();
        }
        assert_eq!(m.phase(), GamePhase::Finished);
        assert_eq!(m.state().winner_cards(), 1);

        m.start(&items(5), 2, false).unwrap();
        assert_eq!(m.phase(), GamePhase::Shuffling);
        assert!(m.cards().is_empty());
        assert!(m.state().revealed_ids.is_empty());
    }

    #[test]
    fn invalid_restart_from_finished_returns_to_idle() {
        let (mut m, _) = machine(manual_shuffle());
        m.start(&items(2), 1, false).unwrap();
        m.shuffle_complete();
        m.run_until_idle();
        m.flip(0);
        m.run_until_idle();
        assert_eq!(m.phase(), GamePhase::Finished);

        assert!(m.start(&items(2), 3, false).is_err());
        assert_eq!(m.phase(), GamePhase::Idle);
        assert!(m.cards().is_empty());
    }

    #[test]
    fn destroy_silences_pending_steps() {
        let (mut m, log) = machine(LotteryConfig::default());
        m.start(&items(5), 3, false).unwrap();
        log.drain();
        m.destroy();
        m.tick(60_000);
        m.shuffle_complete();
        assert!(!m.flip(0));
        assert!(log.drain().is_empty());
        assert_eq!(m.phase(), GamePhase::Shuffling);
        assert_eq!(m.start(&items(5), 3, false), Err(ValidationError::Destroyed));
        assert_eq!(m.phase(), GamePhase::Shuffling);
        assert!(log.drain().is_empty());
    }

    #[test]
    fn degraded_layout_warns_once_per_round() {
        let (mut m, log) = machine(manual_shuffle());
        m.set_viewport(Size::new(300.0, 300.0));
        let emergency = |log: &EventLog| {
            log.count(|e| matches!(e, GameEvent::LayoutWarning(w) if w.contains("emergency")))
        };

        m.start(&items(12), 10, false).unwrap();
        m.shuffle_complete();
        m.run_until_idle();
        assert_eq!(emergency(&log), 1);

        for id in 0..10 {
            m.flip(id);
            m.run_until_idle();
        }
        assert_eq!(m.phase(), GamePhase::Finished);
        m.start(&items(12), 10, false).unwrap();
        m.shuffle_complete();
        m.run_until_idle();
        assert_eq!(emergency(&log), 2);
    }

    #[test]
    fn layout_viewport_follows_the_debounce() {
        let (mut m, _) = machine(manual_shuffle());
        m.start(&items(5), 3, false).unwrap();
        m.shuffle_complete();
        m.run_until_idle();
        assert_eq!(m.layout_viewport(), Size::new(1024.0, 768.0));

        m.on_resize(Size::new(800.0, 600.0));
        assert_eq!(m.viewport(), Size::new(800.0, 600.0));
        m.tick(m.timing().resize_debounce_ms - 1);
        assert_eq!(m.layout_viewport(), Size::new(1024.0, 768.0));
        m.tick(1);
        assert_eq!(m.layout_viewport(), Size::new(800.0, 600.0));

        let chrome = ChromeFlags {
            has_result_panel: true,
            ..ChromeFlags::default()
        };
        m.set_chrome(chrome);
        assert_eq!(m.layout_chrome(), ChromeFlags::default());
        m.run_until_idle();
        assert_eq!(m.layout_chrome(), chrome);
    }

    #[test]
    fn zero_timing_runs_in_a_single_tick() {
        let mut config = LotteryConfig::default();
        config.reduce_motion = true;
        let (mut m, _) = machine(config);
        m.start(&items(5), 3, false).unwrap();
        m.tick(0);
        assert_eq!(m.phase(), GamePhase::Waiting);
        m.flip(1);
        m.tick(0);
        assert_eq!(m.phase(), GamePhase::Waiting);
    }

    #[test]
    fn blank_cards_fill_the_deck() {
        let mut config = manual_shuffle();
        config.game.deck_size = Some(6);
        let (mut m, _) = machine(config);
        m.start(&items(10), 2, false).unwrap();
        m.shuffle_complete();
        assert_eq!(m.cards().len(), 6);
        assert_eq!(m.state().winner_cards(), 2);
        assert_eq!(m.cards().iter().filter(|c| c.content.is_none()).count(), 4);
    }
}
