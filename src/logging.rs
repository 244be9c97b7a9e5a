//! `tracing` subscriber setup shared by the binaries and the tests.
//!
//! The filter is read from `LOTTERY_LOG`, then `RUST_LOG`, then defaults
//! to `warn`. Both initialisers are safe to call more than once.

use tracing_subscriber::{EnvFilter, fmt};

pub const LOG_ENV: &str = "LOTTERY_LOG";

fn filter(default: &str) -> EnvFilter {
    std::env::var(LOG_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new(default))
}

pub fn init() {
    init_with_default("warn");
}

pub fn init_with_default(default: &str) {
    fmt().with_env_filter(filter(default)).try_init().ok();
}

pub fn init_for_tests() {
    fmt()
        .with_env_filter(filter("warn"))
        .with_test_writer()
        .without_time()
        .try_init()
        .ok();
}
