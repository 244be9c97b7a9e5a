use std::path::PathBuf;

use thiserror::Error;

use crate::game::state::GamePhase;

/// Coarse category handed to `GameObserver::on_error` so the host can pick a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    EmptyItems,
    InvalidQuantity,
    QuantityExceedsPool,
    InvalidViewport,
    GameInProgress,
    Destroyed,
}

/// Setup failures reported synchronously from `start()`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("no items to draw from")]
    EmptyItems,
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    #[error("cannot draw {requested} distinct winners from {available} items")]
    QuantityExceedsPool { requested: usize, available: usize },
    #[error("viewport {width}x{height} is not usable")]
    InvalidViewport { width: f64, height: f64 },
    #[error("a game is already running ({phase:?})")]
    GameInProgress { phase: GamePhase },
    #[error("the game has been destroyed")]
    Destroyed,
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::EmptyItems => ErrorKind::EmptyItems,
            ValidationError::InvalidQuantity => ErrorKind::InvalidQuantity,
            ValidationError::QuantityExceedsPool { .. } => ErrorKind::QuantityExceedsPool,
            ValidationError::InvalidViewport { .. } => ErrorKind::InvalidViewport,
            ValidationError::GameInProgress { .. } => ErrorKind::GameInProgress,
            ValidationError::Destroyed => ErrorKind::Destroyed,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
