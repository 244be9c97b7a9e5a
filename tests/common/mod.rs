#![allow(dead_code)]

use lottery::layout::LayoutEngine;
use lottery::{EventLog, GameEvent, GamePhaseMachine, Item, LotteryConfig, Size};

pub fn items(n: usize) -> Vec<Item> {
    (0..n)
        .map(|i| Item::new(format!("id-{i}"), format!("Person {i}")))
        .collect()
}

pub fn named(names: &[&str]) -> Vec<Item> {
    names.iter().map(|n| Item::new(n.to_lowercase(), *n)).collect()
}

/// Config whose shuffle waits for an explicit `shuffle_complete`.
pub fn manual_shuffle() -> LotteryConfig {
    let mut config = LotteryConfig::default();
    config.timing.shuffle_ms = None;
    config
}

pub fn machine(config: &LotteryConfig, width: f64, height: f64) -> (GamePhaseMachine, EventLog) {
    machine_with_engine(config, LayoutEngine::with_defaults(), width, height)
}

pub fn machine_with_engine(
    config: &LotteryConfig,
    engine: LayoutEngine,
    width: f64,
    height: f64,
) -> (GamePhaseMachine, EventLog) {
    lottery::logging::init_for_tests();
    let log = EventLog::new();
    let m = GamePhaseMachine::new(config, engine, Size::new(width, height), Box::new(log.clone()))
        .with_seed(7);
    (m, log)
}

/// Shuffle, deal and settle so the machine is waiting for flips.
pub fn deal(m: &mut GamePhaseMachine) {
    m.shuffle_complete();
    m.run_until_idle();
}

pub fn flip_all(m: &mut GamePhaseMachine) {
    let ids: Vec<_> = m.cards().iter().map(|c| c.id).collect();
    for id in ids {
        m.flip(id);
        m.run_until_idle();
    }
}

pub fn completions(log: &EventLog) -> Vec<Vec<Item>> {
    log.snapshot()
        .into_iter()
        .filter_map(|e| match e {
            GameEvent::Completed(w) => Some(w),
            _ => None,
        })
        .collect()
}

pub fn warnings(log: &EventLog) -> Vec<String> {
    log.snapshot()
        .into_iter()
        .filter_map(|e| match e {
            GameEvent::LayoutWarning(m) => Some(m),
            _ => None,
        })
        .collect()
}
