//! Headless lottery run: deals one round on a virtual clock, flips every
//! card and prints the winners as JSON.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};

use lottery::game::{EventLog, GameEvent, GamePhase, GamePhaseMachine};
use lottery::layout::{GridSolver, LayoutEngine};
use lottery::{Item, LotteryConfig, Size, logging, shared_cache};

#[derive(Parser)]
#[command(name = "lottery-sim")]
#[command(about = "Run a card-flip lottery round without a window")]
struct Args {
    /// JSON file holding an array of {"id", "name"} items
    #[arg(long)]
    items: Option<PathBuf>,

    /// Generate this many placeholder items when --items is not given
    #[arg(long, default_value = "10")]
    pool: usize,

    /// Number of winners to draw
    #[arg(short, long, default_value = "3")]
    quantity: usize,

    /// Allow the same item to win more than once
    #[arg(long)]
    allow_repeat: bool,

    /// Viewport width in pixels
    #[arg(long, default_value = "1024")]
    width: f64,

    /// Viewport height in pixels
    #[arg(long, default_value = "768")]
    height: f64,

    /// Seed for reproducible draws
    #[arg(long)]
    seed: Option<u64>,

    /// JSON config file with timing/layout/cache overrides
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_items(args: &Args) -> Result<Vec<Item>, Box<dyn std::error::Error>> {
    match &args.items {
        Some(path) => {
            let raw = fs::read_to_string(path)?;
            let items: Vec<Item> = serde_json::from_str(&raw)?;
            Ok(items.into_iter().map(|i| Item::new(i.id, i.name)).collect())
        }
        None => Ok((1..=args.pool)
            .map(|n| Item::new(format!("item-{n}"), format!("Entry {n}")))
            .collect()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init_with_default(if args.verbose { "debug" } else { "warn" });

    let config = match &args.config {
        Some(path) => LotteryConfig::load(path)?,
        None => LotteryConfig::default(),
    }
    .apply_env();
    let items = load_items(&args)?;
    info!(items = items.len(), quantity = args.quantity, "starting round");

    let engine = LayoutEngine::new(GridSolver::new(config.layout), shared_cache(config.cache));
    let log = EventLog::new();
    let mut machine = GamePhaseMachine::new(
        &config,
        engine.clone(),
        Size::new(args.width, args.height),
        Box::new(log.clone()),
    );
    if let Some(seed) = args.seed {
        machine = machine.with_seed(seed);
    }

    machine.start(&items, args.quantity, args.allow_repeat)?;
    machine.shuffle_complete();
    machine.run_until_idle();

    let ids: Vec<_> = machine.cards().iter().map(|c| c.id).collect();
    for id in ids {
        if !machine.flip(id) {
            warn!(card = id, phase = machine.phase().name(), "flip refused");
        }
        machine.run_until_idle();
    }

    for event in log.drain() {
        match event {
            GameEvent::LayoutWarning(message) => warn!("{message}"),
            GameEvent::Completed(winners) => {
                println!("{}", serde_json::to_string_pretty(&winners)?);
            }
            _ => {}
        }
    }

    if machine.phase() != GamePhase::Finished {
        warn!(phase = machine.phase().name(), "round did not finish");
    }
    let metrics = engine.cache().borrow().metrics();
    info!(
        hits = metrics.hits,
        misses = metrics.misses,
        avg_ms = metrics.average_calculation_ms,
        "layout cache"
    );
    Ok(())
}
