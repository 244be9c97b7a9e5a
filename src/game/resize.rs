//! Keeps dealt cards on screen when the viewport changes.
//!
//! Only `GameCard::position` is ever written here; phase and reveal state
//! belong to the phase machine, which makes resizes and flips commute.

use crate::device::Viewport;
use crate::layout::{GridSolver, LayoutResult};

use super::state::GameCard;

#[derive(Debug)]
pub struct ResizeReconciler {
    debounce_ms: u64,
    tolerance: f64,
    token: u64,
    pending: Option<Viewport>,
}

impl ResizeReconciler {
    pub fn new(debounce_ms: u64, tolerance: f64) -> Self {
        ResizeReconciler {
            debounce_ms,
            tolerance,
            token: 0,
            pending: None,
        }
    }

    pub fn debounce_ms(&self) -> u64 {
        self.debounce_ms
    }

    // Supersedes any step armed earlier in the burst.
    pub fn request(&mut self, viewport: Viewport) -> u64 {
        self.token = self.token.wrapping_add(1);
        self.pending = Some(viewport);
        self.token
    }

    pub fn take_settled(&mut self, token: u64) -> Option<Viewport> {
        if token != self.token {
            return None;
        }
        self.pending.take()
    }

    pub fn cancel(&mut self) {
        self.pending = None;
        self.token = self.token.wrapping_add(1);
    }

    /// Returns whether any card moved.
    pub fn reconcile(&self, cards: &mut [GameCard], layout: &LayoutResult, solver: &GridSolver) -> bool {
        let total = cards.len();
        let mut changed = false;
        for (i, card) in cards.iter_mut().enumerate() {
            let next = layout
                .positions
                .get(i)
                .copied()
                .unwrap_or_else(|| solver.fallback_position(i, total));
            if card.position.is_fallback != next.is_fallback || !card.position.approx_eq(&next, self.tolerance) {
                card.position = next;
                changed = true;
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Size;
    use crate::layout::{LayoutRequest, Tier};
    use crate::margins::ChromeFlags;
    use crate::selector::Item;

    fn cards(layout: &LayoutResult) -> Vec<GameCard> {
        layout
            .positions
            .iter()
            .enumerate()
            .map(|(i, p)| GameCard {
                id: i,
                content: (i == 0).then(|| Item::new("a", "Alice")),
                position: *p,
                is_winner: i == 0,
                revealed: i == 1,
                visible: true,
            })
            .collect()
    }

    fn solve(width: f64, height: f64, count: usize) -> LayoutResult {
        GridSolver::default().solve(&LayoutRequest::new(Size::new(width, height), ChromeFlags::default(), count, count))
    }

    #[test]
    fn only_latest_token_settles() {
        let mut r = ResizeReconciler::new(150, 0.5);
        let first = r.request(Size::new(800.0, 600.0));
        let second = r.request(Size::new(900.0, 600.0));
        assert_eq!(r.take_settled(first), None);
        assert_eq!(r.take_settled(second), Some(Size::new(900.0, 600.0)));
        assert_eq!(r.take_settled(second), None);
    }

    #[test]
    fn cancel_invalidates_armed_step() {
        let mut r = ResizeReconciler::new(150, 0.5);
        let token = r.request(Size::new(800.0, 600.0));
        r.cancel();
        assert_eq!(r.take_settled(token), None);
    }

    #[test]
    fn rewrites_positions_but_not_reveal_state() {
        let r = ResizeReconciler::new(150, 0.5);
        let wide = solve(1600.0, 1000.0, 4);
        let mut dealt = cards(&wide);
        let before: Vec<_> = dealt.iter().map(|c| (c.id, c.revealed, c.is_winner, c.content.clone())).collect();

        let narrow = solve(800.0, 1000.0, 4);
        assert!(r.reconcile(&mut dealt, &narrow, &GridSolver::default()));

        let after: Vec<_> = dealt.iter().map(|c| (c.id, c.revealed, c.is_winner, c.content.clone())).collect();
        assert_eq!(before, after);
        for (card, pos) in dealt.iter().zip(&narrow.positions) {
            assert_eq!(card.position, *pos);
        }
    }

    #[test]
    fn unchanged_layout_reports_no_change() {
        let r = ResizeReconciler::new(150, 0.5);
        let layout = solve(1280.0, 900.0, 5);
        let mut dealt = cards(&layout);
        assert!(!r.reconcile(&mut dealt, &layout, &GridSolver::default()));
    }

    #[test]
    fn short_layout_is_padded_not_truncated() {
        let r = ResizeReconciler::new(150, 0.5);
        let mut dealt = cards(&solve(1920.0, 1080.0, 16));
        // a phone only fits 12
        let small = solve(500.0, 2000.0, 16);
        assert_eq!(small.solved(), 12);
        assert_eq!(small.tier, Tier::Optimal);

        r.reconcile(&mut dealt, &small, &GridSolver::default());
        assert_eq!(dealt.len(), 16);
        assert!(dealt[..12].iter().all(|c| !c.position.is_fallback));
        assert!(dealt[12..].iter().all(|c| c.position.is_fallback));
    }
}
