//! A deterministic backtest execution engine for leveraged derivatives.
//!
//! This crate replays historical OHLCV candles through a pluggable strategy,
//! fills orders against a synthetic market model (slippage + commission),
//! maintains isolated-margin and liquidation accounting identical to a
//! leveraged exchange, and produces a performance-analytics report.
//!
//! # Overview
//!
//! The engine is a library call, not a service. A run consumes:
//!
//! - a [`types::CandleSeries`]: an ordered, gap-checked candle sequence,
//! - a [`backtest::BacktestConfig`]: capital, leverage, maintenance margin
//!   rate, slippage/commission models, position sizing,
//! - a [`strategy::Strategy`]: the external decision capability,
//!
//! and emits a [`backtest::BacktestResult`] holding the closed trades, the
//! equity curve, and a [`analytics::PerformanceReport`].
//!
//! All money fields (prices, quantities, margin, PnL, equity) use
//! [`Decimal`] fixed-point arithmetic. Performance ratios are `f64`.
//!
//! # Example
//!
//! ```rust
//! use perp_backtest_rs::backtest::{BacktestConfig, BacktestEngine};
//! use perp_backtest_rs::strategy::{MultiTimeframeContext, Strategy};
//! use perp_backtest_rs::types::{Candle, CandleSeries, EngineResult, Signal, Timeframe};
//! use perp_backtest_rs::position::Position;
//! use perp_backtest_rs::dec;
//!
//! // Buy on the first opportunity, then hold.
//! struct BuyOnce;
//!
//! impl Strategy for BuyOnce {
//!     fn calculate_signal(
//!         &mut self,
//!         _candle: &Candle,
//!         index: usize,
//!         position: Option<&Position>,
//!         _context: &MultiTimeframeContext,
//!     ) -> EngineResult<Option<Signal>> {
//!         if index == 0 && position.is_none() {
//!             return Ok(Some(Signal::OpenLong {
//!                 quantity: Some(dec!(1.0)),
//!                 stop_loss: None,
//!                 take_profit: None,
//!             }));
//!         }
//!         Ok(None)
//!     }
//! }
//!
//! let candles: Vec<Candle> = (0..10)
//!     .map(|i| {
//!         let t = i as u64 * 60_000;
//!         Candle::new("BTC-USDT", t, t + 60_000, dec!(100.0), dec!(101.0), dec!(99.0), dec!(100.5), dec!(10.0))
//!     })
//!     .collect();
//! let series = CandleSeries::new("BTC-USDT", Timeframe::M1, candles).unwrap();
//!
//! let config = BacktestConfig::new("BTC-USDT", dec!(10_000.0)).unwrap();
//! let mut engine = BacktestEngine::new(config, Box::new(BuyOnce), series).unwrap();
//! let result = engine.run().unwrap();
//!
//! assert!(result.state.is_terminal());
//! assert_eq!(result.equity_curve.len(), 10);
//! ```

/// Performance analytics computed from a finished run.
pub mod analytics;

/// Backtest configuration, engine, and results.
pub mod backtest;

/// Position lifecycle, isolated margin, and closed trades.
pub mod position;

/// Synthetic market model: slippage, commission, and fills.
pub mod simulation;

/// The strategy capability boundary and multi-timeframe context.
pub mod strategy;

/// Core data types shared across the engine.
pub mod types;

pub use rust_decimal::Decimal;
pub use rust_decimal_macros::dec;
