//! Viewport changes during and after the deal.

mod common;

use common::{deal, items, machine, manual_shuffle};
use lottery::game::GamePhaseMachine;
use lottery::{ChromeFlags, GameEvent, GamePhase, LayoutRequest, LotteryConfig, Size};
use proptest::prelude::*;

fn positions_changed(log: &lottery::EventLog) -> usize {
    log.count(|e| matches!(e, GameEvent::PositionsChanged))
}

fn assert_matches_layout(m: &GamePhaseMachine, viewport: Size) {
    let count = m.cards().len();
    let expected = m
        .engine()
        .layout(&LayoutRequest::new(viewport, m.chrome(), count, count));
    for (card, pos) in m.cards().iter().zip(&expected.positions) {
        assert!(
            card.position.approx_eq(pos, 0.5),
            "card {} at {:?}, expected {:?}",
            card.id,
            card.position,
            pos
        );
    }
}

#[test]
fn burst_of_resizes_applies_once() {
    let (mut m, log) = machine(&manual_shuffle(), 1600.0, 1000.0);
    m.start(&items(6), 4, false).unwrap();
    deal(&mut m);
    log.drain();

    m.on_resize(Size::new(900.0, 1000.0));
    m.tick(100);
    m.on_resize(Size::new(1200.0, 1000.0));
    m.tick(100);
    m.on_resize(Size::new(800.0, 1000.0));
    m.tick(149);
    assert_eq!(positions_changed(&log), 0);

    m.tick(1);
    assert_eq!(positions_changed(&log), 1);
    assert_matches_layout(&m, Size::new(800.0, 1000.0));
    assert!(m.cards().iter().all(|c| c.position.card_width == 100.0));
}

#[test]
fn resize_moves_cards_but_keeps_reveal_state() {
    let (mut m, log) = machine(&manual_shuffle(), 1600.0, 1000.0);
    m.start(&items(6), 4, false).unwrap();
    deal(&mut m);
    m.flip(2);
    assert_eq!(m.phase(), GamePhase::Revealing);

    let before: Vec<_> = m
        .cards()
        .iter()
        .map(|c| (c.id, c.revealed, c.is_winner, c.visible, c.content.clone()))
        .collect();

    m.on_resize(Size::new(800.0, 1000.0));
    m.tick(m.timing().resize_debounce_ms);

    let after: Vec<_> = m
        .cards()
        .iter()
        .map(|c| (c.id, c.revealed, c.is_winner, c.visible, c.content.clone()))
        .collect();
    assert_eq!(before, after);
    assert_eq!(positions_changed(&log), 1);
    assert_eq!(m.state().revealed_ids.len(), 1);

    m.run_until_idle();
    assert_eq!(m.phase(), GamePhase::Waiting);
}

#[test]
fn resize_mid_deal_keeps_every_card() {
    let (mut m, _) = machine(&manual_shuffle(), 1600.0, 1000.0);
    m.start(&items(6), 4, false).unwrap();
    m.shuffle_complete();
    m.tick(m.timing().deal_interval_ms);
    assert_eq!(m.state().visible_cards(), 1);

    m.on_resize(Size::new(800.0, 1000.0));
    m.run_until_idle();

    assert_eq!(m.phase(), GamePhase::Waiting);
    assert_eq!(m.cards().len(), 4);
    assert_eq!(m.state().visible_cards(), 4);
    assert_matches_layout(&m, Size::new(800.0, 1000.0));
}

#[test]
fn resize_while_shuffling_is_used_for_the_deal() {
    let (mut m, log) = machine(&manual_shuffle(), 1600.0, 1000.0);
    m.start(&items(6), 4, false).unwrap();
    m.on_resize(Size::new(800.0, 1000.0));
    deal(&mut m);

    assert!(m.cards().iter().all(|c| c.position.card_width == 100.0));
    // the debounced reflow finds nothing to move
    assert_eq!(positions_changed(&log), 0);
}

#[test]
fn same_size_resize_is_silent() {
    let (mut m, log) = machine(&manual_shuffle(), 1280.0, 900.0);
    m.start(&items(6), 5, false).unwrap();
    deal(&mut m);
    log.drain();

    m.on_resize(Size::new(1280.2, 900.3));
    m.run_until_idle();
    assert_eq!(positions_changed(&log), 0);
}

#[test]
fn shrinking_below_the_device_cap_pads_with_fallbacks() {
    let mut config = manual_shuffle();
    config.game.deck_size = Some(16);
    let (mut m, log) = machine(&config, 1920.0, 1080.0);
    m.start(&items(20), 2, false).unwrap();
    deal(&mut m);
    assert_eq!(m.cards().len(), 16);

    m.on_resize(Size::new(500.0, 2000.0));
    m.run_until_idle();

    assert_eq!(m.cards().len(), 16);
    assert!(m.cards()[..12].iter().all(|c| !c.position.is_fallback));
    assert!(m.cards()[12..].iter().all(|c| c.position.is_fallback));
    assert!(
        log.snapshot()
            .iter()
            .any(|e| matches!(e, GameEvent::LayoutWarning(w) if w.contains("12 of 16")))
    );
}

#[test]
fn chrome_change_reflows_dealt_cards() {
    let (mut m, log) = machine(&manual_shuffle(), 1024.0, 768.0);
    m.start(&items(20), 15, false).unwrap();
    deal(&mut m);
    assert!(m.cards().iter().all(|c| c.position.card_width == 120.0));
    log.drain();

    // three rows no longer fit at full size once every panel is shown
    m.set_chrome(ChromeFlags {
        has_info_panel: true,
        has_warnings: true,
        has_start_button: false,
        has_result_panel: true,
    });
    m.run_until_idle();
    assert_eq!(positions_changed(&log), 1);
    assert!(m.cards().iter().all(|c| c.position.card_width == 90.0));
    assert_matches_layout(&m, Size::new(1024.0, 768.0));
}

#[test]
fn resize_after_finish_keeps_results() {
    let (mut m, log) = machine(&LotteryConfig::default(), 1024.0, 768.0);
    m.start(&items(3), 2, false).unwrap();
    m.run_until_idle();
    for id in 0..2 {
        m.flip(id);
        m.run_until_idle();
    }
    assert_eq!(m.phase(), GamePhase::Finished);

    m.on_resize(Size::new(700.0, 900.0));
    m.run_until_idle();
    assert_eq!(m.phase(), GamePhase::Finished);
    assert_eq!(m.state().revealed_ids.len(), 2);
    assert_eq!(log.count(|e| matches!(e, GameEvent::Completed(_))), 1);
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 32, ..ProptestConfig::default() })]

    #[test]
    fn prop_resizes_never_change_card_count(
        sizes in prop::collection::vec((200.0..2400.0f64, 200.0..1600.0f64), 1..8),
        deck in 1usize..20,
    ) {
        let mut config = manual_shuffle();
        config.game.deck_size = Some(deck);
        let (mut m, _) = machine(&config, 1280.0, 900.0);
        m.start(&items(20), 1, false).unwrap();
        deal(&mut m);
        let dealt = m.cards().len();
        let winners = m.state().winner_cards();

        for (w, h) in sizes {
            m.on_resize(Size::new(w, h));
            m.tick(50);
        }
        m.run_until_idle();

        prop_assert_eq!(m.cards().len(), dealt);
        prop_assert_eq!(m.state().winner_cards(), winners);
        prop_assert!(m.cards().iter().all(|c| c.visible && c.position.is_finite()));
    }
}
