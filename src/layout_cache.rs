//! Memoised layout results.
//!
//! Keys are built from the rounded viewport, so repeated renders of a
//! stable window hit while any resize produces a fresh key. Entries expire
//! after `ttl_secs` (purged lazily on access) and, once the map grows past
//! `capacity`, the entry with the fewest hits is dropped (oldest first on ties).
//!
//! The cache is only a speed-up: a disabled cache yields the same results.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::{CacheConfig, LayoutTuning};
use crate::device::DeviceClass;
use crate::layout::{LayoutRequest, LayoutResult};

pub trait Clock {
    /// Time since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-advanced clock. Clones share the same time.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayoutKey {
    pub width: i64,
    pub height: i64,
    pub card_count: usize,
    pub item_count: usize,
    pub chrome: u8,
    pub device: DeviceClass,
    pub tuning: u64,
}

impl LayoutKey {
    pub fn from_request(request: &LayoutRequest) -> Self {
        LayoutKey {
            width: request.viewport.width.round() as i64,
            height: request.viewport.height.round() as i64,
            card_count: request.card_count,
            item_count: request.item_count,
            chrome: request.chrome.signature(),
            device: request.device,
            tuning: 0,
        }
    }

    // Engines with different tuning can share one cache.
    pub fn with_tuning(self, tuning: &LayoutTuning) -> Self {
        LayoutKey {
            tuning: tuning.fingerprint(),
            ..self
        }
    }
}

#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub key: LayoutKey,
    pub result: LayoutResult,
    pub created_at: Duration,
    pub hit_count: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WarningKind {
    SlowCalculation,
    LowHitRate,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CacheWarning {
    pub kind: WarningKind,
    pub message: String,
    pub at: Duration,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub entries: usize,
    pub last_calculation_ms: f64,
    pub average_calculation_ms: f64,
    pub max_calculation_ms: f64,
    pub warnings: Vec<CacheWarning>,
}

pub type SharedLayoutCache = Rc<RefCell<LayoutCache>>;

pub fn shared_cache(config: CacheConfig) -> SharedLayoutCache {
    Rc::new(RefCell::new(LayoutCache::new(config)))
}

pub struct LayoutCache {
    config: CacheConfig,
    clock: Box<dyn Clock>,
    entries: HashMap<LayoutKey, CacheEntry>,
    hits: u64,
    misses: u64,
    calculations: u64,
    last_calculation_ms: f64,
    total_calculation_ms: f64,
    max_calculation_ms: f64,
    warnings: VecDeque<CacheWarning>,
    last_warned: HashMap<WarningKind, Duration>,
}

impl LayoutCache {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Box::new(SystemClock::new()))
    }

    pub fn with_clock(config: CacheConfig, clock: Box<dyn Clock>) -> Self {
        LayoutCache {
            config,
            clock,
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
            calculations: 0,
            last_calculation_ms: 0.0,
            total_calculation_ms: 0.0,
            max_calculation_ms: 0.0,
            warnings: VecDeque::new(),
            last_warned: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&mut self, key: &LayoutKey) -> Option<LayoutResult> {
        if !self.config.enabled {
            return None;
        }
        self.purge_expired();
        let now = self.clock.now();
        let found = self.entries.get_mut(key).map(|entry| {
            entry.hit_count += 1;
            entry.created_at = now;
            entry.result.clone()
        });
        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        self.check_hit_rate();
        found
    }

    pub fn put(&mut self, key: LayoutKey, result: LayoutResult) {
        if !self.config.enabled {
            return;
        }
        self.purge_expired();
        let entry = CacheEntry {
            key,
            result,
            created_at: self.clock.now(),
            hit_count: 0,
        };
        self.entries.insert(key, entry);
        while self.entries.len() > self.config.capacity.max(1) {
            if !self.evict_one(&key) {
                break;
            }
        }
    }

    pub fn get_or_compute(&mut self, key: LayoutKey, compute: impl FnOnce() -> LayoutResult) -> LayoutResult {
        if let Some(result) = self.get(&key) {
            return result;
        }
        let started = self.clock.now();
        let result = compute();
        let elapsed = self.clock.now().saturating_sub(started);
        self.record_calculation(elapsed);
        self.put(key, result.clone());
        result
    }

    pub fn metrics(&self) -> CacheMetrics {
        let requests = self.hits + self.misses;
        CacheMetrics {
            hits: self.hits,
            misses: self.misses,
            hit_rate: if requests == 0 { 0.0 } else { self.hits as f64 / requests as f64 },
            entries: self.entries.len(),
            last_calculation_ms: self.last_calculation_ms,
            average_calculation_ms: if self.calculations == 0 {
                0.0
            } else {
                self.total_calculation_ms / self.calculations as f64
            },
            max_calculation_ms: self.max_calculation_ms,
            warnings: self.warnings.iter().cloned().collect(),
        }
    }

    fn purge_expired(&mut self) {
        let now = self.clock.now();
        let ttl = Duration::from_secs(self.config.ttl_secs);
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_sub(entry.created_at) < ttl);
        let purged = before - self.entries.len();
        if purged > 0 {
            debug!(purged, "expired layout cache entries");
        }
    }

    // Never evicts `keep`, the entry that was just inserted.
    fn evict_one(&mut self, keep: &LayoutKey) -> bool {
        let victim = self
            .entries
            .values()
            .filter(|entry| entry.key != *keep)
            .min_by_key(|entry| (entry.hit_count, entry.created_at))
            .map(|entry| entry.key);
        match victim {
            Some(key) => {
                self.entries.remove(&key);
                debug!(?key, "evicted layout cache entry");
                true
            }
            None => false,
        }
    }

    fn record_calculation(&mut self, elapsed: Duration) {
        let ms = elapsed.as_nanos() as f64 / 1_000_000.0;
        self.calculations += 1;
        self.last_calculation_ms = ms;
        self.total_calculation_ms += ms;
        self.max_calculation_ms = self.max_calculation_ms.max(ms);
        if ms > self.config.slow_calculation_ms {
            let message = format!(
                "layout calculation took {ms:.1}ms (limit {}ms)",
                self.config.slow_calculation_ms
            );
            self.push_warning(WarningKind::SlowCalculation, message);
        }
    }

    fn check_hit_rate(&mut self) {
        let requests = self.hits + self.misses;
        if requests < self.config.hit_rate_min_requests {
            return;
        }
        let rate = self.hits as f64 / requests as f64;
        if rate < self.config.low_hit_rate {
            let message = format!(
                "layout cache hit rate {:.0}% after {requests} requests",
                rate * 100.0
            );
            self.push_warning(WarningKind::LowHitRate, message);
        }
    }

    fn push_warning(&mut self, kind: WarningKind, message: String) {
        let now = self.clock.now();
        let window = Duration::from_millis(self.config.warning_window_ms);
        if let Some(last) = self.last_warned.get(&kind) {
            if now.saturating_sub(*last) < window {
                return;
            }
        }
        warn!(?kind, "{message}");
        self.last_warned.insert(kind, now);
        self.warnings.push_back(CacheWarning { kind, message, at: now });
        while self.warnings.len() > self.config.max_warnings {
            self.warnings.pop_front();
        }
    }
}
