//! Delayed steps for the phase machine, run on a virtual clock.
//!
//! The host advances the clock with `GamePhaseMachine::tick`; nothing here
//! sleeps or spawns. Steps carry the generation of the round that queued
//! them so a leftover step from an abandoned round is recognisable.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::state::CardId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    ShuffleComplete,
    DealCard(usize),
    DealSettled,
    FlipSettled(CardId),
    ApplyResize(u64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step {
    pub due_ms: u64,
    pub generation: u64,
    pub action: Action,
    seq: u64,
}

// Reversed so the BinaryHeap pops the earliest step first; `seq` keeps
// steps with the same deadline in scheduling order.
impl Ord for Step {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.due_ms, other.seq).cmp(&(self.due_ms, self.seq))
    }
}

impl PartialOrd for Step {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now_ms: u64,
    next_seq: u64,
    queue: BinaryHeap<Step>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn schedule(&mut self, delay_ms: u64, generation: u64, action: Action) {
        let step = Step {
            due_ms: self.now_ms.saturating_add(delay_ms),
            generation,
            action,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.queue.push(step);
    }

    /// Pops the earliest step due at or before `until`, moving the clock to
    /// its deadline so anything it schedules is timed from there.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<Step> {
        if self.queue.peek()?.due_ms > until_ms {
            return None;
        }
        let step = self.queue.pop()?;
        self.now_ms = self.now_ms.max(step.due_ms);
        Some(step)
    }

    pub fn advance_to(&mut self, until_ms: u64) {
        self.now_ms = self.now_ms.max(until_ms);
    }

    pub fn next_due_in(&self) -> Option<u64> {
        self.queue
            .peek()
            .map(|step| step.due_ms.saturating_sub(self.now_ms))
    }

    pub fn cancel_all(&mut self) {
        self.queue.clear();
    }
}
