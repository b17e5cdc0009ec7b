//! The position ledger: one isolated-margin position per run.
//!
//! [`PositionLedger`] owns the run's cash balance and at most one open
//! [`Position`]. Every mutation preserves the monetary invariants: margin
//! and quantity stay positive while open, the liquidation price is
//! recomputed after every margin change and scale-in, and cash only moves
//! through fills and margin transfers.

use std::fmt;

use crate::Decimal;
use crate::position::trade::{ClosedTrade, TradeExit};
use crate::simulation::Fill;
use crate::types::error::{EngineError, EngineResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Position direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Long exposure; profits when price rises.
    Long,
    /// Short exposure; profits when price falls.
    Short,
}

impl Direction {
    /// Returns `true` for long positions.
    #[must_use]
    pub fn is_long(&self) -> bool {
        matches!(self, Self::Long)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

/// The single open exposure of a run.
///
/// Mutated only through [`PositionLedger`] operations; the liquidation
/// price is never stale.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Position {
    /// Trading symbol.
    pub symbol: String,
    /// Position direction.
    pub direction: Direction,
    /// Quantity in base units; always positive while open.
    pub quantity: Decimal,
    /// Notional-weighted average entry price.
    pub avg_entry_price: Decimal,
    /// Leverage applied to the position.
    pub leverage: Decimal,
    /// Collateral allocated to this position; always positive while open.
    pub isolated_margin: Decimal,
    /// Mark price at which losses consume the full isolated margin.
    pub liquidation_price: Decimal,
    /// Stop-loss level, if set.
    pub stop_loss: Option<Decimal>,
    /// Take-profit level, if set.
    pub take_profit: Option<Decimal>,
    /// Step-up ladder stage, incremented on every level update.
    pub tp_stage: u32,
    /// Entry timestamp in milliseconds.
    pub opened_at: u64,
    /// Commission accumulated across entry and scale-ins.
    pub entry_commission: Decimal,
    /// Slippage cost in currency accumulated across entry and scale-ins.
    pub entry_slippage_cost: Decimal,
}

impl Position {
    /// Returns the position notional at the average entry price.
    #[must_use]
    pub fn notional(&self) -> Decimal {
        self.avg_entry_price * self.quantity
    }

    /// Returns unrealized PnL at `mark`.
    #[must_use]
    pub fn unrealized_pnl(&self, mark: Decimal) -> Decimal {
        match self.direction {
            Direction::Long => (mark - self.avg_entry_price) * self.quantity,
            Direction::Short => (self.avg_entry_price - mark) * self.quantity,
        }
    }

    /// Returns the minimum margin required to keep the position open.
    #[must_use]
    pub fn maintenance_margin(&self, maintenance_margin_rate: Decimal) -> Decimal {
        self.avg_entry_price * self.quantity * maintenance_margin_rate
    }

    /// Recomputes the liquidation price from the current entry price,
    /// quantity, and margin. Called after every margin-affecting mutation.
    fn recompute_liquidation_price(&mut self, maintenance_margin_rate: Decimal) {
        let margin_per_unit = self.isolated_margin / self.quantity;
        self.liquidation_price = match self.direction {
            Direction::Long => {
                self.avg_entry_price * (Decimal::ONE + maintenance_margin_rate) - margin_per_unit
            }
            Direction::Short => {
                self.avg_entry_price * (Decimal::ONE - maintenance_margin_rate) + margin_per_unit
            }
        };
    }
}

/// Owns the cash balance and the run's single position.
///
/// State machine: `CLOSED → OPEN → CLOSED`. Scale-ins, margin updates,
/// and level updates are OPEN→OPEN transitions.
///
/// # Example
///
/// ```rust
/// use perp_backtest_rs::position::{Direction, PositionLedger};
/// use perp_backtest_rs::simulation::Fill;
/// use perp_backtest_rs::dec;
///
/// let mut ledger = PositionLedger::new("BTC-USDT", dec!(10000.0), dec!(0.005));
/// let fill = Fill::new(dec!(10000.0), dec!(1.0), dec!(0.0), dec!(0.0), 0);
///
/// ledger.open(Direction::Long, &fill, dec!(10), None, None).unwrap();
/// let position = ledger.position().unwrap();
/// assert_eq!(position.isolated_margin, dec!(1000.0));
/// assert_eq!(position.liquidation_price, dec!(9050.0));
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PositionLedger {
    symbol: String,
    cash: Decimal,
    maintenance_margin_rate: Decimal,
    position: Option<Position>,
}

impl PositionLedger {
    /// Creates a ledger with an initial cash balance.
    #[must_use]
    pub fn new(
        symbol: impl Into<String>,
        initial_cash: Decimal,
        maintenance_margin_rate: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            cash: initial_cash,
            maintenance_margin_rate,
            position: None,
        }
    }

    /// Returns the free cash balance.
    #[must_use]
    pub fn cash(&self) -> Decimal {
        self.cash
    }

    /// Returns the open position, if any.
    #[must_use]
    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// Returns `true` if a position is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.position.is_some()
    }

    /// Returns unrealized PnL at `mark`, zero when no position is open.
    #[must_use]
    pub fn unrealized_pnl(&self, mark: Decimal) -> Decimal {
        self.position
            .as_ref()
            .map_or(Decimal::ZERO, |p| p.unrealized_pnl(mark))
    }

    /// Returns total equity at `mark`: cash + isolated margin (if open)
    /// + unrealized PnL.
    #[must_use]
    pub fn equity(&self, mark: Decimal) -> Decimal {
        match &self.position {
            Some(p) => self.cash + p.isolated_margin + p.unrealized_pnl(mark),
            None => self.cash,
        }
    }

    /// Opens a position from an entry fill.
    ///
    /// Allocates `notional / leverage` as isolated margin, debits cash
    /// margin + commission, and computes the liquidation price:
    ///
    /// - LONG: `entry × (1 + mmr) − margin / qty`
    /// - SHORT: `entry × (1 − mmr) + margin / qty`
    ///
    /// # Errors
    ///
    /// - `EngineError::DuplicatePosition` if a position is already open
    /// - `EngineError::InvalidConfiguration` if `leverage < 1`
    /// - `EngineError::InsufficientMargin` if cash cannot cover margin
    ///   plus commission
    pub fn open(
        &mut self,
        direction: Direction,
        entry_fill: &Fill,
        leverage: Decimal,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
    ) -> EngineResult<&Position> {
        if self.position.is_some() {
            return Err(EngineError::DuplicatePosition(format!(
                "a {} position is already open",
                self.symbol
            )));
        }

        if leverage < Decimal::ONE {
            return Err(EngineError::InvalidConfiguration(format!(
                "leverage must be at least 1, got {}",
                leverage
            )));
        }

        let margin = entry_fill.notional() / leverage;
        let required = margin + entry_fill.commission;
        if required > self.cash {
            return Err(EngineError::InsufficientMargin(format!(
                "opening requires {} but only {} cash is available",
                required, self.cash
            )));
        }

        self.cash -= required;

        let mut position = Position {
            symbol: self.symbol.clone(),
            direction,
            quantity: entry_fill.quantity,
            avg_entry_price: entry_fill.price,
            leverage,
            isolated_margin: margin,
            liquidation_price: Decimal::ZERO,
            stop_loss,
            take_profit,
            tp_stage: 0,
            opened_at: entry_fill.timestamp,
            entry_commission: entry_fill.commission,
            entry_slippage_cost: entry_fill.slippage_cost(),
        };
        position.recompute_liquidation_price(self.maintenance_margin_rate);

        Ok(self.position.insert(position))
    }

    /// Scales into the open position.
    ///
    /// Blends the average entry price by notional weight, grows the
    /// isolated margin by `fill notional / leverage`, and recomputes the
    /// liquidation price from the new blended entry and margin.
    ///
    /// # Errors
    ///
    /// - `EngineError::PositionNotFound` with no open position
    /// - `EngineError::InsufficientMargin` if cash cannot cover the
    ///   margin increase plus commission
    pub fn scale_in(&mut self, fill: &Fill) -> EngineResult<&Position> {
        let mmr = self.maintenance_margin_rate;
        let cash = self.cash;
        let Some(position) = self.position.as_mut() else {
            return Err(EngineError::PositionNotFound(
                "cannot scale in: no open position".to_string(),
            ));
        };

        let margin_delta = fill.notional() / position.leverage;
        let required = margin_delta + fill.commission;
        if required > cash {
            return Err(EngineError::InsufficientMargin(format!(
                "scale-in requires {} but only {} cash is available",
                required, cash
            )));
        }

        let new_quantity = position.quantity + fill.quantity;
        position.avg_entry_price =
            (position.notional() + fill.notional()) / new_quantity;
        position.quantity = new_quantity;
        position.isolated_margin += margin_delta;
        position.entry_commission += fill.commission;
        position.entry_slippage_cost += fill.slippage_cost();
        position.recompute_liquidation_price(mmr);

        self.cash -= required;

        let Some(position) = self.position.as_ref() else {
            return Err(EngineError::PositionNotFound(
                "cannot scale in: no open position".to_string(),
            ));
        };
        Ok(position)
    }

    /// Adjusts the isolated margin by `delta` (negative withdraws back to
    /// cash) and recomputes the liquidation price.
    ///
    /// # Errors
    ///
    /// - `EngineError::PositionNotFound` with no open position
    /// - `EngineError::InsufficientMargin` if a positive delta exceeds
    ///   cash, or the result would drop below the maintenance requirement
    ///   `entry × qty × mmr`; the caller must close or reduce instead
    pub fn update_margin(&mut self, delta: Decimal) -> EngineResult<()> {
        let mmr = self.maintenance_margin_rate;
        let Some(position) = self.position.as_mut() else {
            return Err(EngineError::PositionNotFound(
                "cannot adjust margin: no open position".to_string(),
            ));
        };

        if delta > self.cash {
            return Err(EngineError::InsufficientMargin(format!(
                "margin top-up of {} exceeds available cash {}",
                delta, self.cash
            )));
        }

        let new_margin = position.isolated_margin + delta;
        let maintenance = position.maintenance_margin(mmr);
        if new_margin < maintenance || new_margin <= Decimal::ZERO {
            return Err(EngineError::InsufficientMargin(format!(
                "margin {} would breach the maintenance requirement {}",
                new_margin, maintenance
            )));
        }

        position.isolated_margin = new_margin;
        position.recompute_liquidation_price(mmr);
        self.cash -= delta;

        Ok(())
    }

    /// Moves the stop-loss/take-profit ladder. `None` leaves a level
    /// unchanged. No monetary side effect.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PositionNotFound` with no open position.
    pub fn update_levels(
        &mut self,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
    ) -> EngineResult<()> {
        let Some(position) = self.position.as_mut() else {
            return Err(EngineError::PositionNotFound(
                "cannot update levels: no open position".to_string(),
            ));
        };

        if let Some(sl) = stop_loss {
            position.stop_loss = Some(sl);
        }
        if let Some(tp) = take_profit {
            position.take_profit = Some(tp);
        }
        position.tp_stage += 1;

        Ok(())
    }

    /// Closes the position with an exit fill and returns the completed
    /// trade.
    ///
    /// Gross PnL is `(exit − avg_entry) × qty` for longs and the negation
    /// for shorts. Net PnL subtracts every commission accrued across
    /// entry, scale-ins, and exit. The isolated margin plus gross PnL
    /// (less the exit commission) is released back to cash.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PositionNotFound` with no open position.
    pub fn close(&mut self, exit_fill: &Fill, exit_reason: TradeExit) -> EngineResult<ClosedTrade> {
        let Some(position) = self.position.take() else {
            return Err(EngineError::PositionNotFound(
                "cannot close: no open position".to_string(),
            ));
        };

        let gross_pnl = position.unrealized_pnl(exit_fill.price);
        let commission = position.entry_commission + exit_fill.commission;
        let slippage_cost = position.entry_slippage_cost + exit_fill.slippage_cost();
        let net_pnl = gross_pnl - commission;

        self.cash += position.isolated_margin + gross_pnl - exit_fill.commission;

        Ok(ClosedTrade {
            symbol: position.symbol,
            direction: position.direction,
            quantity: position.quantity,
            avg_entry_price: position.avg_entry_price,
            exit_price: exit_fill.price,
            entry_time: position.opened_at,
            exit_time: exit_fill.timestamp,
            gross_pnl,
            net_pnl,
            commission,
            slippage_cost,
            exit_reason,
        })
    }

    /// Answers whether the candle's extremes touched the liquidation
    /// price: a long is liquidated if `low <= liquidation_price`, a short
    /// if `high >= liquidation_price`.
    #[must_use]
    pub fn check_liquidation(&self, candle_low: Decimal, candle_high: Decimal) -> bool {
        match &self.position {
            Some(p) => match p.direction {
                Direction::Long => candle_low <= p.liquidation_price,
                Direction::Short => candle_high >= p.liquidation_price,
            },
            None => false,
        }
    }

    /// Forcibly closes the position at its liquidation price.
    ///
    /// Bypasses the commission model; the trade realizes exactly the
    /// negated isolated margin as net PnL, and nothing returns to cash.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PositionNotFound` with no open position.
    pub fn liquidate(&mut self, timestamp: u64) -> EngineResult<ClosedTrade> {
        let Some(position) = self.position.take() else {
            return Err(EngineError::PositionNotFound(
                "cannot liquidate: no open position".to_string(),
            ));
        };

        let exit_price = position.liquidation_price;
        let gross_pnl = position.unrealized_pnl(exit_price);

        Ok(ClosedTrade {
            symbol: position.symbol,
            direction: position.direction,
            quantity: position.quantity,
            avg_entry_price: position.avg_entry_price,
            exit_price,
            entry_time: position.opened_at,
            exit_time: timestamp,
            gross_pnl,
            net_pnl: -position.isolated_margin,
            commission: position.entry_commission,
            slippage_cost: position.entry_slippage_cost,
            exit_reason: TradeExit::Liquidation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dec;

    fn fill(price: Decimal, quantity: Decimal, timestamp: u64) -> Fill {
        Fill::new(price, quantity, Decimal::ZERO, Decimal::ZERO, timestamp)
    }

    fn ledger() -> PositionLedger {
        PositionLedger::new("BTC-USDT", dec!(10000.0), dec!(0.005))
    }

    #[test]
    fn test_open_allocates_margin_and_liquidation_price() {
        let mut ledger = ledger();
        ledger
            .open(Direction::Long, &fill(dec!(10000), dec!(1), 0), dec!(10), None, None)
            .unwrap();

        let position = ledger.position().unwrap();
        assert_eq!(position.isolated_margin, dec!(1000));
        // 10000 * 1.005 - 1000/1 = 9050
        assert_eq!(position.liquidation_price, dec!(9050));
        assert_eq!(ledger.cash(), dec!(9000));
    }

    #[test]
    fn test_open_short_liquidation_price() {
        let mut ledger = ledger();
        ledger
            .open(Direction::Short, &fill(dec!(10000), dec!(1), 0), dec!(10), None, None)
            .unwrap();

        // 10000 * 0.995 + 1000/1 = 10950
        assert_eq!(ledger.position().unwrap().liquidation_price, dec!(10950));
    }

    #[test]
    fn test_open_rejects_duplicate() {
        let mut ledger = ledger();
        ledger
            .open(Direction::Long, &fill(dec!(100), dec!(1), 0), dec!(10), None, None)
            .unwrap();
        assert!(matches!(
            ledger.open(Direction::Long, &fill(dec!(100), dec!(1), 1), dec!(10), None, None),
            Err(EngineError::DuplicatePosition(_))
        ));
    }

    #[test]
    fn test_open_rejects_low_leverage() {
        let mut ledger = ledger();
        assert!(matches!(
            ledger.open(Direction::Long, &fill(dec!(100), dec!(1), 0), dec!(0.5), None, None),
            Err(EngineError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_open_rejects_insufficient_cash() {
        let mut ledger = PositionLedger::new("BTC-USDT", dec!(100.0), dec!(0.005));
        // 10000 notional at 10x needs 1000 margin, only 100 cash.
        assert!(matches!(
            ledger.open(Direction::Long, &fill(dec!(10000), dec!(1), 0), dec!(10), None, None),
            Err(EngineError::InsufficientMargin(_))
        ));
        assert!(!ledger.is_open());
        assert_eq!(ledger.cash(), dec!(100));
    }

    #[test]
    fn test_margin_monotonicity_worked_example() {
        // entry=10000, qty=1, leverage=10, mmr=0.005
        let mut ledger = ledger();
        ledger
            .open(Direction::Long, &fill(dec!(10000), dec!(1), 0), dec!(10), None, None)
            .unwrap();
        assert_eq!(ledger.position().unwrap().liquidation_price, dec!(9050));

        ledger.update_margin(dec!(500)).unwrap();
        assert_eq!(ledger.position().unwrap().liquidation_price, dec!(8550));

        ledger.update_margin(dec!(-200)).unwrap();
        assert_eq!(ledger.position().unwrap().liquidation_price, dec!(8750));

        // Cash followed the transfers: 10000 - 1000 - 500 + 200
        assert_eq!(ledger.cash(), dec!(8700));
    }

    #[test]
    fn test_update_margin_rejects_maintenance_breach() {
        let mut ledger = ledger();
        ledger
            .open(Direction::Long, &fill(dec!(10000), dec!(1), 0), dec!(10), None, None)
            .unwrap();

        // Maintenance requirement is 10000 * 1 * 0.005 = 50.
        let result = ledger.update_margin(dec!(-960));
        assert!(matches!(result, Err(EngineError::InsufficientMargin(_))));
        // Rejected update leaves the position untouched.
        assert_eq!(ledger.position().unwrap().isolated_margin, dec!(1000));
        assert_eq!(ledger.position().unwrap().liquidation_price, dec!(9050));
    }

    #[test]
    fn test_update_margin_rejects_topup_beyond_cash() {
        let mut ledger = ledger();
        ledger
            .open(Direction::Long, &fill(dec!(10000), dec!(1), 0), dec!(10), None, None)
            .unwrap();
        assert!(matches!(
            ledger.update_margin(dec!(9001)),
            Err(EngineError::InsufficientMargin(_))
        ));
    }

    #[test]
    fn test_update_margin_requires_position() {
        let mut ledger = ledger();
        assert!(matches!(
            ledger.update_margin(dec!(100)),
            Err(EngineError::PositionNotFound(_))
        ));
    }

    #[test]
    fn test_scale_in_blends_entry_price() {
        let mut ledger = ledger();
        ledger
            .open(Direction::Long, &fill(dec!(100), dec!(1), 0), dec!(10), None, None)
            .unwrap();
        ledger.scale_in(&fill(dec!(110), dec!(1), 1)).unwrap();

        let position = ledger.position().unwrap();
        assert_eq!(position.quantity, dec!(2));
        assert_eq!(position.avg_entry_price, dec!(105));
        assert_eq!(position.isolated_margin, dec!(21));
        // 105 * 1.005 - 21/2 = 105.525 - 10.5 = 95.025
        assert_eq!(position.liquidation_price, dec!(95.025));
    }

    #[test]
    fn test_scale_in_requires_position() {
        let mut ledger = ledger();
        assert!(matches!(
            ledger.scale_in(&fill(dec!(100), dec!(1), 0)),
            Err(EngineError::PositionNotFound(_))
        ));
    }

    #[test]
    fn test_update_levels_bumps_stage() {
        let mut ledger = ledger();
        ledger
            .open(
                Direction::Long,
                &fill(dec!(100), dec!(1), 0),
                dec!(10),
                Some(dec!(95)),
                Some(dec!(110)),
            )
            .unwrap();

        ledger.update_levels(Some(dec!(100)), Some(dec!(120))).unwrap();
        let position = ledger.position().unwrap();
        assert_eq!(position.stop_loss, Some(dec!(100)));
        assert_eq!(position.take_profit, Some(dec!(120)));
        assert_eq!(position.tp_stage, 1);

        // None leaves a level unchanged.
        ledger.update_levels(None, Some(dec!(130))).unwrap();
        let position = ledger.position().unwrap();
        assert_eq!(position.stop_loss, Some(dec!(100)));
        assert_eq!(position.take_profit, Some(dec!(130)));
        assert_eq!(position.tp_stage, 2);
    }

    #[test]
    fn test_close_long_releases_margin_and_pnl() {
        let mut ledger = ledger();
        let entry = Fill::new(dec!(100), dec!(2), dec!(0.2), dec!(0.1), 0);
        ledger.open(Direction::Long, &entry, dec!(10), None, None).unwrap();
        // cash = 10000 - 20 - 0.2 = 9979.8

        let exit = Fill::new(dec!(110), dec!(2), dec!(0.22), dec!(0.1), 60_000);
        let trade = ledger.close(&exit, TradeExit::Signal).unwrap();

        assert_eq!(trade.gross_pnl, dec!(20));
        assert_eq!(trade.commission, dec!(0.42));
        assert_eq!(trade.net_pnl, dec!(19.58));
        assert_eq!(trade.slippage_cost, dec!(0.4));
        assert_eq!(trade.exit_reason, TradeExit::Signal);
        assert!(!ledger.is_open());
        // 9979.8 + 20 margin + 20 gross - 0.22 exit commission
        assert_eq!(ledger.cash(), dec!(10019.58));
    }

    #[test]
    fn test_close_short_pnl_sign() {
        let mut ledger = ledger();
        ledger
            .open(Direction::Short, &fill(dec!(100), dec!(1), 0), dec!(5), None, None)
            .unwrap();
        let trade = ledger.close(&fill(dec!(90), dec!(1), 1), TradeExit::Signal).unwrap();
        assert_eq!(trade.gross_pnl, dec!(10));

        ledger
            .open(Direction::Short, &fill(dec!(100), dec!(1), 2), dec!(5), None, None)
            .unwrap();
        let trade = ledger.close(&fill(dec!(105), dec!(1), 3), TradeExit::Signal).unwrap();
        assert_eq!(trade.gross_pnl, dec!(-5));
    }

    #[test]
    fn test_close_requires_position() {
        let mut ledger = ledger();
        assert!(matches!(
            ledger.close(&fill(dec!(100), dec!(1), 0), TradeExit::Signal),
            Err(EngineError::PositionNotFound(_))
        ));
    }

    #[test]
    fn test_check_liquidation_sides() {
        let mut ledger = ledger();
        ledger
            .open(Direction::Long, &fill(dec!(10000), dec!(1), 0), dec!(10), None, None)
            .unwrap();
        // Liquidation price is 9050.
        assert!(!ledger.check_liquidation(dec!(9100), dec!(10100)));
        assert!(ledger.check_liquidation(dec!(9050), dec!(10100)));
        assert!(ledger.check_liquidation(dec!(9000), dec!(10100)));
    }

    #[test]
    fn test_check_liquidation_short_side() {
        let mut ledger = ledger();
        ledger
            .open(Direction::Short, &fill(dec!(10000), dec!(1), 0), dec!(10), None, None)
            .unwrap();
        // Liquidation price is 10950.
        assert!(!ledger.check_liquidation(dec!(9900), dec!(10900)));
        assert!(ledger.check_liquidation(dec!(9900), dec!(10950)));
    }

    #[test]
    fn test_check_liquidation_closed_is_false() {
        assert!(!ledger().check_liquidation(dec!(1), dec!(1000000)));
    }

    #[test]
    fn test_liquidate_realizes_full_margin_loss() {
        let mut ledger = ledger();
        ledger
            .open(Direction::Long, &fill(dec!(10000), dec!(1), 0), dec!(10), None, None)
            .unwrap();
        let cash_before = ledger.cash();

        let trade = ledger.liquidate(120_000).unwrap();
        assert_eq!(trade.net_pnl, dec!(-1000));
        assert_eq!(trade.exit_price, dec!(9050));
        assert_eq!(trade.exit_reason, TradeExit::Liquidation);
        assert_eq!(trade.exit_time, 120_000);
        // Margin is gone; cash is untouched by the liquidation itself.
        assert_eq!(ledger.cash(), cash_before);
        assert!(!ledger.is_open());
    }

    #[test]
    fn test_equity_accounting() {
        let mut ledger = ledger();
        assert_eq!(ledger.equity(dec!(123)), dec!(10000));

        ledger
            .open(Direction::Long, &fill(dec!(100), dec!(10), 0), dec!(10), None, None)
            .unwrap();
        // cash 9900 + margin 100 + unrealized (105-100)*10
        assert_eq!(ledger.equity(dec!(105)), dec!(10050));
        assert_eq!(ledger.unrealized_pnl(dec!(105)), dec!(50));
    }

    #[test]
    fn test_position_invariants_hold_through_lifecycle() {
        let mut ledger = ledger();
        ledger
            .open(Direction::Long, &fill(dec!(100), dec!(1), 0), dec!(10), None, None)
            .unwrap();
        ledger.scale_in(&fill(dec!(102), dec!(0.5), 1)).unwrap();
        ledger.update_margin(dec!(25)).unwrap();

        let position = ledger.position().unwrap();
        assert!(position.quantity > Decimal::ZERO);
        assert!(position.isolated_margin > Decimal::ZERO);
    }
}
