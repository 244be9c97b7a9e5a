//! Card-flip lottery core: responsive card layout plus the round state
//! machine that deals and reveals the winners.

pub mod config;
pub mod device;
pub mod error;
pub mod game;
pub mod layout;
pub mod layout_cache;
pub mod logging;
pub mod margins;
pub mod selector;

pub use config::LotteryConfig;
pub use device::{DeviceClass, Size, Viewport, classify};
pub use error::{ConfigError, ErrorKind, ValidationError};
pub use game::{EventLog, GameCard, GameEvent, GameObserver, GamePhase, GamePhaseMachine, GameState};
pub use layout::{CardPosition, GridSolver, LayoutDegradation, LayoutEngine, LayoutRequest, LayoutResult, Tier};
pub use layout_cache::{LayoutCache, SharedLayoutCache, shared_cache};
pub use margins::ChromeFlags;
pub use selector::Item;
