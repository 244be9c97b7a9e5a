//! Card placement inside the area left over by the safe margins.
//!
//! Positions are card centres measured from the centre of the available
//! area, so a resize only needs to re-solve, never to re-anchor.
//!
//! The solver walks a fixed ladder and stops at the first rung that fits:
//!
//! 1. `Optimal`: device card size and spacing.
//! 2. `Reduced`: both scaled down by `reduce_ratio`, clamped to floors.
//! 3. `Emergency`: every card stacked near the origin and flagged as fallback.
//!
//! It never fails: bad input lands on the emergency rung with a warning.

use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::LayoutTuning;
use crate::device::{DeviceClass, Size, Viewport, classify};
use crate::layout_cache::{LayoutKey, SharedLayoutCache, shared_cache};
use crate::margins::{ChromeFlags, margins};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Optimal,
    Reduced,
    Emergency,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Optimal => "optimal",
            Tier::Reduced => "reduced",
            Tier::Emergency => "emergency",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CardPosition {
    pub x: f64,
    pub y: f64,
    /// Degrees. Cosmetic only, ignored by every geometric check.
    pub rotation: f64,
    pub card_width: f64,
    pub card_height: f64,
    pub row: usize,
    pub col: usize,
    pub is_fallback: bool,
}

impl CardPosition {
    pub fn left(&self) -> f64 {
        self.x - self.card_width / 2.0
    }

    pub fn right(&self) -> f64 {
        self.x + self.card_width / 2.0
    }

    pub fn top(&self) -> f64 {
        self.y - self.card_height / 2.0
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.card_height / 2.0
    }

    // cards that only share an edge do not overlap
    pub fn overlaps(&self, other: &CardPosition) -> bool {
        self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }

    pub fn fits_within(&self, available: Size, epsilon: f64) -> bool {
        let half_w = available.width / 2.0 + epsilon;
        let half_h = available.height / 2.0 + epsilon;
        self.left() >= -half_w && self.right() <= half_w && self.top() >= -half_h && self.bottom() <= half_h
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.rotation.is_finite()
            && self.card_width.is_finite()
            && self.card_height.is_finite()
    }

    pub fn approx_eq(&self, other: &CardPosition, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.card_width - other.card_width).abs() <= tolerance
            && (self.card_height - other.card_height).abs() <= tolerance
    }

    pub fn top_left_in(&self, container: Size) -> (f64, f64) {
        (container.width / 2.0 + self.left(), container.height / 2.0 + self.top())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutResult {
    pub positions: Vec<CardPosition>,
    pub device: DeviceClass,
    pub tier: Tier,
    pub available: Size,
    pub requested: usize,
}

impl LayoutResult {
    pub fn solved(&self) -> usize {
        self.positions.len()
    }

    pub fn degradation(&self) -> Option<LayoutDegradation> {
        if self.tier == Tier::Optimal && self.solved() >= self.requested {
            return None;
        }
        Some(LayoutDegradation {
            tier: self.tier,
            requested: self.requested,
            solved: self.solved(),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutDegradation {
    pub tier: Tier,
    pub requested: usize,
    pub solved: usize,
}

impl fmt::Display for LayoutDegradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tier != Tier::Optimal {
            write!(f, "layout fell back to {} tier", self.tier.as_str())?;
            if self.solved < self.requested {
                f.write_str("; ")?;
            }
        }
        if self.solved < self.requested {
            write!(f, "showing {} of {} requested cards", self.solved, self.requested)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutRequest {
    pub viewport: Viewport,
    pub device: DeviceClass,
    pub chrome: ChromeFlags,
    pub card_count: usize,
    /// Upper bound on cards that can carry distinct content.
    pub item_count: usize,
}

impl LayoutRequest {
    pub fn new(viewport: Viewport, chrome: ChromeFlags, card_count: usize, item_count: usize) -> Self {
        LayoutRequest {
            viewport,
            device: classify(Some(viewport.width)),
            chrome,
            card_count,
            item_count,
        }
    }

    pub fn rounded(&self) -> Self {
        let snap = |v: f64| if v.is_finite() { v.round() } else { 0.0 };
        LayoutRequest {
            viewport: Size::new(snap(self.viewport.width), snap(self.viewport.height)),
            ..*self
        }
    }

    fn seed(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        LayoutKey::from_request(self).hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Clone, Copy, Debug)]
struct GridSpec {
    card: Size,
    spacing: f64,
    columns: usize,
}

#[derive(Clone, Debug, Default)]
pub struct GridSolver {
    tuning: LayoutTuning,
}

impl GridSolver {
    pub fn new(tuning: LayoutTuning) -> Self {
        GridSolver { tuning }
    }

    pub fn tuning(&self) -> &LayoutTuning {
        &self.tuning
    }

    pub fn solve(&self, request: &LayoutRequest) -> LayoutResult {
        let profile = request.device.profile();
        let count = request
            .card_count
            .min(profile.max_cards)
            .min(request.item_count)
            .max(1);

        let viewport = request.viewport;
        if !viewport.is_finite() || viewport.width <= 0.0 || viewport.height <= 0.0 {
            warn!(
                width = viewport.width,
                height = viewport.height,
                "unusable viewport, stacking cards"
            );
            return self.emergency(request, Size::new(0.0, 0.0), count);
        }

        let m = margins(request.device, request.chrome);
        let available = Size::new(
            (viewport.width - m.horizontal()).max(0.0),
            (viewport.height - m.vertical()).max(0.0),
        );

        if available.width < profile.min_available.width || available.height < profile.min_available.height {
            debug!(
                device = request.device.name(),
                available_w = available.width,
                available_h = available.height,
                "available area below device minimum"
            );
            return self.emergency(request, available, count);
        }

        let mut rng = StdRng::seed_from_u64(request.seed());

        let optimal = GridSpec {
            card: profile.card_size,
            spacing: profile.spacing_px,
            columns: profile.columns_per_row,
        };
        if let Some(positions) = self.place(&optimal, available, count, &mut rng) {
            return self.finish(request, available, Tier::Optimal, positions);
        }

        let reduced = self.reduced(&optimal);
        if let Some(positions) = self.place(&reduced, available, count, &mut rng) {
            return self.finish(request, available, Tier::Reduced, positions);
        }

        self.emergency(request, available, count)
    }

    pub fn fallback_position(&self, index: usize, total: usize) -> CardPosition {
        let offset = if self.tuning.emergency_offset.is_finite() {
            self.tuning.emergency_offset
        } else {
            0.0
        };
        let centre = (total.max(1) - 1) as f64 / 2.0;
        CardPosition {
            x: 0.0,
            y: (index as f64 - centre) * offset,
            rotation: 0.0,
            card_width: self.tuning.min_card_width,
            card_height: self.tuning.min_card_height,
            row: index,
            col: 0,
            is_fallback: true,
        }
    }

    fn reduced(&self, grid: &GridSpec) -> GridSpec {
        let ratio = self.tuning.reduce_ratio;
        GridSpec {
            card: Size::new(
                (grid.card.width * ratio).max(self.tuning.min_card_width),
                (grid.card.height * ratio).max(self.tuning.min_card_height),
            ),
            spacing: (grid.spacing * ratio).max(self.tuning.min_spacing),
            columns: grid.columns,
        }
    }

    fn place(&self, grid: &GridSpec, available: Size, count: usize, rng: &mut StdRng) -> Option<Vec<CardPosition>> {
        let GridSpec { card, spacing, columns } = *grid;
        let pitch_x = card.width + spacing;
        let pitch_y = card.height + spacing;
        if !(pitch_x > 0.0 && pitch_y > 0.0) {
            return None;
        }

        let fit = ((available.width + spacing) / pitch_x).floor();
        if !fit.is_finite() || fit < 1.0 {
            return None;
        }
        let cols = columns.min(fit as usize).min(count);
        if cols == 0 {
            return None;
        }
        let rows = count.div_ceil(cols);

        let grid_w = cols as f64 * pitch_x - spacing;
        let grid_h = rows as f64 * pitch_y - spacing;
        let eps = self.tuning.fit_epsilon;
        if grid_w > available.width + eps || grid_h > available.height + eps {
            return None;
        }

        let jitter = self.tuning.rotation_jitter_deg;
        let mut positions = Vec::with_capacity(count);
        for row in 0..rows {
            let in_row = cols.min(count - row * cols);
            let row_w = in_row as f64 * pitch_x - spacing;
            let y = -grid_h / 2.0 + card.height / 2.0 + row as f64 * pitch_y;
            for col in 0..in_row {
                let rotation = if jitter.is_finite() && jitter > 0.0 {
                    rng.random_range(-jitter..=jitter)
                } else {
                    0.0
                };
                positions.push(CardPosition {
                    x: -row_w / 2.0 + card.width / 2.0 + col as f64 * pitch_x,
                    y,
                    rotation,
                    card_width: card.width,
                    card_height: card.height,
                    row,
                    col,
                    is_fallback: false,
                });
            }
        }

        if positions.iter().any(|p| !p.is_finite() || !p.fits_within(available, eps)) {
            warn!(count, "grid placement produced an inconsistent position");
            return None;
        }
        Some(positions)
    }

    fn emergency(&self, request: &LayoutRequest, available: Size, count: usize) -> LayoutResult {
        let positions = (0..count).map(|i| self.fallback_position(i, count)).collect();
        self.finish(request, available, Tier::Emergency, positions)
    }

    fn finish(&self, request: &LayoutRequest, available: Size, tier: Tier, positions: Vec<CardPosition>) -> LayoutResult {
        debug!(
            device = request.device.name(),
            tier = tier.as_str(),
            requested = request.card_count,
            solved = positions.len(),
            "layout solved"
        );
        LayoutResult {
            positions,
            device: request.device,
            tier,
            available,
            requested: request.card_count,
        }
    }
}

#[derive(Clone)]
pub struct LayoutEngine {
    solver: GridSolver,
    cache: SharedLayoutCache,
}

impl LayoutEngine {
    pub fn new(solver: GridSolver, cache: SharedLayoutCache) -> Self {
        LayoutEngine { solver, cache }
    }

    pub fn with_defaults() -> Self {
        LayoutEngine::new(GridSolver::default(), shared_cache(Default::default()))
    }

    pub fn solver(&self) -> &GridSolver {
        &self.solver
    }

    pub fn cache(&self) -> &SharedLayoutCache {
        &self.cache
    }

    pub fn layout(&self, request: &LayoutRequest) -> LayoutResult {
        let request = request.rounded();
        let key = LayoutKey::from_request(&request).with_tuning(self.solver.tuning());
        self.cache
            .borrow_mut()
            .get_or_compute(key, || self.solver.solve(&request))
    }
}
