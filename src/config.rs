//! Tunable constants for layout, caching and animation.
//!
//! Every value has a default, so a config file only needs the keys it changes:
//!
//! ```json
//! { "reduce_motion": true, "timing": { "flip_ms": 400 } }
//! ```

use std::fs;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::margins::ChromeFlags;

pub const REDUCE_MOTION_ENV: &str = "LOTTERY_REDUCE_MOTION";

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutTuning {
    pub reduce_ratio: f64,
    pub min_card_width: f64,
    pub min_card_height: f64,
    pub min_spacing: f64,
    pub rotation_jitter_deg: f64,
    pub emergency_offset: f64,
    pub fit_epsilon: f64,
}

impl Default for LayoutTuning {
    fn default() -> Self {
        LayoutTuning {
            reduce_ratio: 0.75,
            min_card_width: 60.0,
            min_card_height: 80.0,
            min_spacing: 8.0,
            rotation_jitter_deg: 2.0,
            emergency_offset: 6.0,
            fit_epsilon: 0.5,
        }
    }
}

impl LayoutTuning {
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        [
            self.reduce_ratio,
            self.min_card_width,
            self.min_card_height,
            self.min_spacing,
            self.rotation_jitter_deg,
            self.emergency_offset,
            self.fit_epsilon,
        ]
        .map(f64::to_bits)
        .hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
    pub capacity: usize,
    pub slow_calculation_ms: f64,
    pub low_hit_rate: f64,
    pub hit_rate_min_requests: u64,
    pub warning_window_ms: u64,
    pub max_warnings: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: true,
            ttl_secs: 300,
            capacity: 100,
            slow_calculation_ms: 10.0,
            low_hit_rate: 0.3,
            hit_rate_min_requests: 10,
            warning_window_ms: 5_000,
            max_warnings: 20,
        }
    }
}

/// Durations driving the phase machine, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationTiming {
    /// Auto-complete the shuffle after this long; `None` waits for the host.
    pub shuffle_ms: Option<u64>,
    pub deal_interval_ms: u64,
    pub deal_settle_ms: u64,
    pub flip_ms: u64,
    pub resize_debounce_ms: u64,
}

impl Default for AnimationTiming {
    fn default() -> Self {
        AnimationTiming {
            shuffle_ms: Some(1_000),
            deal_interval_ms: 180,
            deal_settle_ms: 300,
            flip_ms: 600,
            resize_debounce_ms: 150,
        }
    }
}

impl AnimationTiming {
    /// Scales every animation duration. The resize debounce is input
    /// filtering, not animation, so it is left alone.
    pub fn scaled(self, factor: f64) -> Self {
        let factor = if factor.is_finite() { factor.max(0.0) } else { 1.0 };
        let scale = |ms: u64| (ms as f64 * factor).round() as u64;
        AnimationTiming {
            shuffle_ms: self.shuffle_ms.map(scale),
            deal_interval_ms: scale(self.deal_interval_ms),
            deal_settle_ms: scale(self.deal_settle_ms),
            flip_ms: scale(self.flip_ms),
            resize_debounce_ms: self.resize_debounce_ms,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Total cards on the table; slots beyond the winners are blanks.
    pub deck_size: Option<usize>,
    pub chrome: ChromeFlags,
    pub position_tolerance: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            deck_size: None,
            chrome: ChromeFlags::default(),
            position_tolerance: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LotteryConfig {
    pub timing: AnimationTiming,
    pub layout: LayoutTuning,
    pub cache: CacheConfig,
    pub game: GameConfig,
    pub reduce_motion: bool,
    pub motion_scale: f64,
}

impl Default for LotteryConfig {
    fn default() -> Self {
        LotteryConfig {
            timing: AnimationTiming::default(),
            layout: LayoutTuning::default(),
            cache: CacheConfig::default(),
            game: GameConfig::default(),
            reduce_motion: false,
            motion_scale: 0.0,
        }
    }
}

impl LotteryConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn apply_env(mut self) -> Self {
        if env_flag(REDUCE_MOTION_ENV) {
            self.reduce_motion = true;
        }
        self
    }

    pub fn effective_timing(&self) -> AnimationTiming {
        if self.reduce_motion {
            self.timing.scaled(self.motion_scale)
        } else {
            self.timing
        }
    }
}

pub fn env_flag(name: &str) -> bool {
    match std::env::var(name) {
        Ok(value) => parse_flag(&value),
        Err(_) => false,
    }
}

fn parse_flag(value: &str) -> bool {
    let v = value.trim().to_ascii_lowercase();
    matches!(v.as_str(), "1" | "true" | "yes" | "on")
}
