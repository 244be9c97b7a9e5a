use std::path::Path;
use std::time::{Duration, Instant};

use gtk4 as gtk;
use gtk4::glib;
use libadwaita as adw;
use tracing::warn;

use lottery::config::{LotteryConfig, env_flag};
use lottery::layout::{GridSolver, LayoutEngine};
use lottery::{ChromeFlags, EventLog, GamePhaseMachine, Item, Size, shared_cache};

pub const CONFIG_ENV: &str = "LOTTERY_CONFIG";
pub const DEBUG_ENV: &str = "LOTTERY_DEBUG";
pub const DEFAULT_QUANTITY: usize = 3;

const INITIAL_VIEWPORT: Size = Size::new(1024.0, 768.0);
const DEFAULT_NAMES: [&str; 12] = [
    "Ada", "Grace", "Linus", "Ken", "Barbara", "Dennis", "Margaret", "Alan", "Edsger", "Frances", "John", "Radia",
];

pub struct AppState {
    pub machine: GamePhaseMachine,
    pub events: EventLog,
    pub items: Vec<Item>,
    pub quantity: usize,
    pub allow_repeat: bool,
    pub debug: bool,

    pub board: Option<gtk::Fixed>,
    pub card_buttons: Vec<gtk::Button>,
    pub status_label: Option<gtk::Label>,
    pub winners_label: Option<gtk::Label>,
    pub start_button: Option<gtk::Button>,
    pub toasts: Option<adw::ToastOverlay>,

    pub frame_handle: Option<glib::SourceId>,
    pub last_frame: Instant,
}

impl AppState {
    pub fn new() -> Self {
        let mut config = load_config();
        config.game.chrome = ChromeFlags {
            has_info_panel: true,
            has_start_button: true,
            ..ChromeFlags::default()
        };
        let engine = LayoutEngine::new(GridSolver::new(config.layout), shared_cache(config.cache));
        let events = EventLog::new();
        let machine = GamePhaseMachine::new(&config, engine, INITIAL_VIEWPORT, Box::new(events.clone()));

        AppState {
            machine,
            events,
            items: DEFAULT_NAMES
                .iter()
                .enumerate()
                .map(|(i, name)| Item::new(format!("p{i}"), *name))
                .collect(),
            quantity: DEFAULT_QUANTITY,
            allow_repeat: false,
            debug: env_flag(DEBUG_ENV),
            board: None,
            card_buttons: Vec::new(),
            status_label: None,
            winners_label: None,
            start_button: None,
            toasts: None,
            frame_handle: None,
            last_frame: Instant::now(),
        }
    }

    /// Whole milliseconds since the previous frame. The sub-millisecond
    /// remainder carries over to the next call.
    pub fn take_elapsed_ms(&mut self) -> u64 {
        let elapsed = self.last_frame.elapsed().as_millis() as u64;
        self.last_frame += Duration::from_millis(elapsed);
        elapsed
    }
}

fn load_config() -> LotteryConfig {
    let Ok(path) = std::env::var(CONFIG_ENV) else {
        return LotteryConfig::default().apply_env();
    };
    match LotteryConfig::load(Path::new(&path)) {
        Ok(config) => config.apply_env(),
        Err(err) => {
            warn!(%path, error = %err, "ignoring unreadable config");
            LotteryConfig::default().apply_env()
        }
    }
}
