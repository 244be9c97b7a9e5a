pub mod events;
pub mod machine;
pub mod resize;
pub mod scheduler;
pub mod state;

pub use events::{EventLog, GameEvent, GameObserver};
pub use machine::GamePhaseMachine;
pub use resize::ResizeReconciler;
pub use state::{CardId, GameCard, GamePhase, GameState};
