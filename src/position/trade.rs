//! Completed round-trip trades.

use crate::Decimal;
use crate::position::ledger::Direction;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TradeExit {
    /// Closed by a strategy signal at the next candle open.
    Signal,
    /// Closed by the stop-loss level.
    StopLoss,
    /// Closed by the take-profit level.
    TakeProfit,
    /// Forcibly closed at the liquidation price with full margin loss.
    Liquidation,
}

/// A completed round-trip. Created only by closing an open position;
/// immutable thereafter.
///
/// # Example
///
/// ```rust
/// use perp_backtest_rs::position::{ClosedTrade, Direction, TradeExit};
/// use perp_backtest_rs::dec;
///
/// let trade = ClosedTrade {
///     symbol: "BTC-USDT".to_string(),
///     direction: Direction::Long,
///     quantity: dec!(1.0),
///     avg_entry_price: dec!(100.0),
///     exit_price: dec!(110.0),
///     entry_time: 0,
///     exit_time: 60_000,
///     gross_pnl: dec!(10.0),
///     net_pnl: dec!(9.8),
///     commission: dec!(0.2),
///     slippage_cost: dec!(0.0),
///     exit_reason: TradeExit::Signal,
/// };
/// assert!(trade.is_win());
/// assert_eq!(trade.holding_period_ms(), 60_000);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClosedTrade {
    /// Trading symbol.
    pub symbol: String,
    /// Position direction.
    pub direction: Direction,
    /// Closed quantity in base units.
    pub quantity: Decimal,
    /// Blended average entry price across entry and scale-ins.
    pub avg_entry_price: Decimal,
    /// Exit fill price (the liquidation price for liquidations).
    pub exit_price: Decimal,
    /// Entry timestamp in milliseconds.
    pub entry_time: u64,
    /// Exit timestamp in milliseconds.
    pub exit_time: u64,
    /// Realized PnL at fill prices, before costs.
    pub gross_pnl: Decimal,
    /// PnL net of all commissions. Liquidations realize exactly the
    /// negated isolated margin here, bypassing the commission model.
    pub net_pnl: Decimal,
    /// Total commission across entry, scale-ins, and exit.
    pub commission: Decimal,
    /// Total adverse price deviation in currency across all fills.
    pub slippage_cost: Decimal,
    /// How the position was closed.
    pub exit_reason: TradeExit,
}

impl ClosedTrade {
    /// Returns `true` if the trade realized a positive net PnL.
    #[must_use]
    pub fn is_win(&self) -> bool {
        self.net_pnl > Decimal::ZERO
    }

    /// Returns the holding period in milliseconds.
    #[must_use]
    pub fn holding_period_ms(&self) -> u64 {
        self.exit_time.saturating_sub(self.entry_time)
    }

    /// Returns `true` if the trade was a forced liquidation.
    #[must_use]
    pub fn is_liquidation(&self) -> bool {
        self.exit_reason == TradeExit::Liquidation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dec;

    fn trade(net_pnl: Decimal, exit_reason: TradeExit) -> ClosedTrade {
        ClosedTrade {
            symbol: "BTC-USDT".to_string(),
            direction: Direction::Short,
            quantity: dec!(2.0),
            avg_entry_price: dec!(100.0),
            exit_price: dec!(95.0),
            entry_time: 1_000,
            exit_time: 4_000,
            gross_pnl: dec!(10.0),
            net_pnl,
            commission: dec!(0.4),
            slippage_cost: dec!(0.1),
            exit_reason,
        }
    }

    #[test]
    fn test_win_flag() {
        assert!(trade(dec!(9.6), TradeExit::Signal).is_win());
        assert!(!trade(dec!(0), TradeExit::Signal).is_win());
        assert!(!trade(dec!(-3), TradeExit::StopLoss).is_win());
    }

    #[test]
    fn test_holding_period() {
        assert_eq!(trade(dec!(1), TradeExit::TakeProfit).holding_period_ms(), 3_000);
    }

    #[test]
    fn test_liquidation_flag() {
        assert!(trade(dec!(-100), TradeExit::Liquidation).is_liquidation());
        assert!(!trade(dec!(-100), TradeExit::StopLoss).is_liquidation());
    }
}
