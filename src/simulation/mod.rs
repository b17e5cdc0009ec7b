//! Synthetic market model: slippage, commission, and simulated fills.
//!
//! This module converts intended trades into realized fills. It is the
//! only place execution costs are modeled:
//!
//! - **Slippage**: [`SlippageModel`], none, fixed offset, percentage, or
//!   synthetic bid/ask spread, always applied against the trader
//! - **Commission**: [`CommissionModel`], none, flat, fixed-rate, or
//!   tiered bands with monotonically decreasing rates
//! - **Fills**: [`MarketSimulator`] produces [`Fill`] values and answers
//!   limit-fill questions without mutating state
//!
//! # Example
//!
//! ```rust
//! use perp_backtest_rs::simulation::{CommissionModel, MarketSimulator, SlippageModel};
//! use perp_backtest_rs::dec;
//!
//! let simulator = MarketSimulator::new(
//!     SlippageModel::Percentage(dec!(0.05)),
//!     CommissionModel::FixedRate(dec!(0.0004)),
//! );
//!
//! let fill = simulator.simulate_long_entry(dec!(0.5), dec!(40000.0), 0).unwrap();
//! assert!(fill.price > dec!(40000.0));
//! assert!(fill.commission > dec!(0.0));
//! ```

/// Commission models.
pub mod commission;

/// Slippage models.
pub mod slippage;

/// The market simulator and fill type.
pub mod simulator;

pub use commission::{CommissionModel, CommissionTier};
pub use simulator::{Fill, MarketSimulator};
pub use slippage::SlippageModel;
