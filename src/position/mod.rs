//! Position lifecycle and isolated-margin accounting.
//!
//! This module owns the mutable heart of a run:
//!
//! - [`PositionLedger`]: cash plus at most one open [`Position`], with
//!   entry, scale-in, margin-adjustment, level-update, close, and
//!   liquidation operations
//! - [`ClosedTrade`]: the immutable record of a completed round-trip
//!
//! # Example
//!
//! ```rust
//! use perp_backtest_rs::position::{Direction, PositionLedger, TradeExit};
//! use perp_backtest_rs::simulation::Fill;
//! use perp_backtest_rs::dec;
//!
//! let mut ledger = PositionLedger::new("ETH-USDT", dec!(5000.0), dec!(0.005));
//!
//! let entry = Fill::new(dec!(2000.0), dec!(1.0), dec!(0.8), dec!(0.0), 0);
//! ledger.open(Direction::Long, &entry, dec!(4), None, None).unwrap();
//!
//! let exit = Fill::new(dec!(2100.0), dec!(1.0), dec!(0.84), dec!(0.0), 60_000);
//! let trade = ledger.close(&exit, TradeExit::Signal).unwrap();
//! assert_eq!(trade.gross_pnl, dec!(100.0));
//! ```

/// The position ledger and position state.
pub mod ledger;

/// Completed trades.
pub mod trade;

pub use ledger::{Direction, Position, PositionLedger};
pub use trade::{ClosedTrade, TradeExit};
