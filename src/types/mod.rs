//! Core data types shared across the engine.
//!
//! This module defines:
//!
//! - **Errors**: [`EngineError`], [`EngineResult`]
//! - **Market data**: [`Candle`], [`Timeframe`], [`CandleSeries`]
//! - **Strategy output**: [`Signal`]

/// Candle data and the validated input series.
pub mod candle;

/// Engine error types.
pub mod error;

/// Strategy signal types.
pub mod signal;

pub use candle::{Candle, CandleSeries, Timeframe};
pub use error::{EngineError, EngineResult};
pub use signal::Signal;
