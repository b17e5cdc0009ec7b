//! Error types for the backtest engine.
//!
//! The engine uses a single error enum covering the full taxonomy: input
//! errors (bad prices, malformed configuration or candle data), state-machine
//! violations (duplicate/missing positions, invalid run transitions), margin
//! violations, strategy failures, and cancellation. All fallible operations
//! return [`EngineResult`]; nothing below the engine boundary panics.

use thiserror::Error;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur during a backtest run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A zero or negative price reached the market simulator. This is a
    /// caller contract violation indicating corrupt input data, and it
    /// aborts the run.
    #[error("invalid price: {0}")]
    InvalidPrice(String),

    /// A zero or negative quantity reached the market simulator.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// The candle sequence failed validation (out of order, gapped, or
    /// internally inconsistent OHLC values).
    #[error("invalid candle data: {0}")]
    InvalidCandleData(String),

    /// A configuration parameter failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An open was attempted while a position already exists. At most one
    /// position per run (isolated margin, single symbol).
    #[error("duplicate position: {0}")]
    DuplicatePosition(String),

    /// A position operation was attempted with no open position.
    #[error("position not found: {0}")]
    PositionNotFound(String),

    /// A margin adjustment would breach the maintenance requirement, or
    /// available cash cannot cover the requested amount. Recoverable: the
    /// caller may close or reduce the position instead.
    #[error("insufficient margin: {0}")]
    InsufficientMargin(String),

    /// A run-state transition was attempted out of order (for example,
    /// completing a run that never started).
    #[error("invalid run-state transition: {0}")]
    InvalidStateTransition(String),

    /// The external strategy returned an error. Recorded as the run's
    /// error message; the run transitions to `Failed`.
    #[error("strategy failure: {0}")]
    StrategyFailure(String),

    /// The run was cancelled through its cancellation token.
    #[error("run cancelled")]
    Cancelled,
}

impl EngineError {
    /// Returns `true` for errors the engine treats as recoverable inside
    /// the per-candle loop (the offending signal is skipped and the run
    /// continues).
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InsufficientMargin(_))
    }
}
