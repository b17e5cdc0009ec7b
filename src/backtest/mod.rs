//! Backtest configuration, engine, and results.
//!
//! # Overview
//!
//! - [`BacktestConfig`] / [`SizingPolicy`]: validated run parameters
//! - [`BacktestEngine`]: the deterministic per-candle loop, with a
//!   [`RunState`] lifecycle, progress reporting, and cooperative
//!   cancellation through [`CancelToken`]
//! - [`BacktestResult`] / [`EquityCurvePoint`]: the run's output
//!
//! # Example
//!
//! ```rust
//! use perp_backtest_rs::backtest::{BacktestConfig, BacktestEngine, RunState};
//! use perp_backtest_rs::strategy::{MultiTimeframeContext, Strategy};
//! use perp_backtest_rs::types::{Candle, CandleSeries, EngineResult, Signal, Timeframe};
//! use perp_backtest_rs::position::Position;
//! use perp_backtest_rs::dec;
//!
//! struct Idle;
//!
//! impl Strategy for Idle {
//!     fn calculate_signal(
//!         &mut self,
//!         _candle: &Candle,
//!         _index: usize,
//!         _position: Option<&Position>,
//!         _context: &MultiTimeframeContext,
//!     ) -> EngineResult<Option<Signal>> {
//!         Ok(None)
//!     }
//! }
//!
//! let candles: Vec<Candle> = (0..5)
//!     .map(|i| {
//!         let t = i as u64 * 60_000;
//!         Candle::new("BTC-USDT", t, t + 60_000, dec!(100), dec!(101), dec!(99), dec!(100), dec!(1))
//!     })
//!     .collect();
//! let series = CandleSeries::new("BTC-USDT", Timeframe::M1, candles).unwrap();
//! let config = BacktestConfig::new("BTC-USDT", dec!(10000)).unwrap();
//!
//! let mut engine = BacktestEngine::new(config, Box::new(Idle), series).unwrap();
//! let result = engine.run().unwrap();
//! assert_eq!(result.state, RunState::Completed);
//! ```

/// Run configuration.
pub mod config;

/// The engine and run lifecycle.
pub mod engine;

/// Run output types.
pub mod results;

pub use config::{BacktestConfig, SizingPolicy};
pub use engine::{BacktestEngine, CancelToken, RunState};
pub use results::{BacktestResult, EquityCurvePoint};
