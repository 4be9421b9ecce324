//! Error types for reel and machine operations

use thiserror::Error;

use crate::reel::ReelState;

/// Configuration errors, raised at construction time
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Machine needs at least one reel
    #[error("Machine must have at least one reel")]
    NoReels,

    /// Reel must hold every visible row
    #[error("Too few cells per reel: {cells}, need at least {min}")]
    TooFewCells { cells: usize, min: usize },

    /// Shuffle assigns each catalog entry to exactly one cell
    #[error("Catalog size {catalog} does not match cells per reel {cells}")]
    CatalogMismatch { catalog: usize, cells: usize },

    /// Out-of-range numeric value
    #[error("Invalid parameter value: {0}")]
    InvalidValue(String),

    /// Config document could not be parsed
    #[error("Config parse error: {0}")]
    Parse(String),

    /// Config file could not be read
    #[error("Config read error: {0}")]
    Io(String),
}

/// Reel errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReelError {
    /// Row layout is only defined once the reel has snapped to rest
    #[error("Reel is not at rest (state: {state:?})")]
    NotAtRest { state: ReelState },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Machine errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MachineError {
    /// A round or cascade is still being sequenced
    #[error("A spin round is already in progress")]
    RoundInProgress,

    #[error("Reel error: {0}")]
    Reel(#[from] ReelError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for reel operations
pub type ReelResult<T> = Result<T, ReelError>;

/// Result type for machine operations
pub type MachineResult<T> = Result<T, MachineError>;
