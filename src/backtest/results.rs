//! Backtest run output.

use crate::Decimal;
use crate::analytics::PerformanceReport;
use crate::backtest::engine::RunState;
use crate::position::ClosedTrade;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One equity snapshot, appended once per processed candle.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EquityCurvePoint {
    /// Candle close timestamp in milliseconds.
    pub timestamp: u64,
    /// Total equity: cash + isolated margin (if open) + unrealized PnL.
    pub equity: Decimal,
    /// Free cash.
    pub cash: Decimal,
    /// Capital tied up in the position: isolated margin + unrealized PnL.
    pub position_value: Decimal,
    /// Unrealized PnL at the candle close.
    pub unrealized_pnl: Decimal,
    /// Distance below the running peak in currency, clamped at zero.
    pub drawdown: Decimal,
    /// Distance below the running peak as a percentage, clamped at zero.
    pub drawdown_pct: f64,
    /// Return over initial capital as a percentage.
    pub return_pct: f64,
}

/// The complete output of one run.
///
/// Failed and cancelled runs still carry the trades and equity curve
/// accumulated before the run stopped, for diagnostics.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BacktestResult {
    /// Trading symbol.
    pub symbol: String,
    /// Terminal run state (`Completed`, `Failed`, or `Cancelled`).
    pub state: RunState,
    /// The strategy error that failed the run, if any.
    pub error_message: Option<String>,
    /// Closed trades in execution order.
    pub trades: Vec<ClosedTrade>,
    /// One point per processed candle.
    pub equity_curve: Vec<EquityCurvePoint>,
    /// Starting capital.
    pub initial_capital: Decimal,
    /// Equity after the last processed candle.
    pub final_equity: Decimal,
    /// Highest equity reached during the run.
    pub peak_equity: Decimal,
    /// Number of candles processed before the run ended.
    pub candles_processed: usize,
    /// Open time of the first candle, in milliseconds.
    pub start_time: u64,
    /// Close time of the last processed candle, in milliseconds.
    pub end_time: u64,
    /// Analytics over the trades and equity curve.
    pub performance: PerformanceReport,
}

impl BacktestResult {
    /// Returns `true` if the run reached `Completed`.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state == RunState::Completed
    }

    /// Returns the summed net PnL across all closed trades.
    #[must_use]
    pub fn total_net_pnl(&self) -> Decimal {
        self.trades.iter().map(|t| t.net_pnl).sum()
    }
}
