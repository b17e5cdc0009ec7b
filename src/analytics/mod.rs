//! Performance analytics computed from a finished run.
//!
//! # Overview
//!
//! - [`MetricsCalculator`]: pure function of the trade list and equity
//!   curve: returns, Sharpe/Sortino/Calmar, drawdown statistics, win
//!   rate, profit factor, payoff ratio, streaks, and volatility
//! - [`PerformanceReport`]: the resulting value, embedded into every
//!   [`BacktestResult`](crate::backtest::BacktestResult)
//!
//! # Example
//!
//! ```rust
//! use perp_backtest_rs::analytics::MetricsCalculator;
//! use perp_backtest_rs::dec;
//!
//! let report = MetricsCalculator::new(0.02).calculate(&[], &[], dec!(50000.0), 30.0);
//! assert_eq!(report.total_trades, 0);
//! ```

/// The metrics calculator and performance report.
pub mod performance;

pub use performance::{MetricsCalculator, PerformanceReport};
