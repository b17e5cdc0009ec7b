//! The synthetic market model.
//!
//! [`MarketSimulator`] converts an intended trade (side, quantity,
//! reference price) into a realized [`Fill`] by applying the configured
//! slippage and commission models. It holds no mutable state: the same
//! inputs always produce the same fill, which is what makes whole runs
//! deterministic.

use crate::Decimal;
use crate::simulation::commission::CommissionModel;
use crate::simulation::slippage::SlippageModel;
use crate::types::error::{EngineError, EngineResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Result of simulating one order.
///
/// # Example
///
/// ```rust
/// use perp_backtest_rs::simulation::Fill;
/// use perp_backtest_rs::dec;
///
/// let fill = Fill::new(dec!(100.5), dec!(2.0), dec!(0.08), dec!(0.5), 1_000);
/// assert_eq!(fill.notional(), dec!(201.0));
/// assert_eq!(fill.slippage_cost(), dec!(1.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Fill {
    /// Realized fill price, slippage included.
    pub price: Decimal,
    /// Filled quantity in base units.
    pub quantity: Decimal,
    /// Commission charged on the filled notional.
    pub commission: Decimal,
    /// Absolute per-unit price deviation applied by the slippage model.
    pub slippage: Decimal,
    /// Fill timestamp in milliseconds.
    pub timestamp: u64,
}

impl Fill {
    /// Creates a new fill.
    #[must_use]
    pub fn new(
        price: Decimal,
        quantity: Decimal,
        commission: Decimal,
        slippage: Decimal,
        timestamp: u64,
    ) -> Self {
        Self {
            price,
            quantity,
            commission,
            slippage,
            timestamp,
        }
    }

    /// Returns the filled notional (price × quantity).
    #[must_use]
    pub fn notional(&self) -> Decimal {
        self.price * self.quantity
    }

    /// Returns the total slippage cost in currency (deviation × quantity).
    #[must_use]
    pub fn slippage_cost(&self) -> Decimal {
        self.slippage * self.quantity
    }
}

/// Simulates fills for intended trades against a synthetic market.
///
/// # Example
///
/// ```rust
/// use perp_backtest_rs::simulation::{CommissionModel, MarketSimulator, SlippageModel};
/// use perp_backtest_rs::dec;
///
/// let simulator = MarketSimulator::new(
///     SlippageModel::Fixed(dec!(0.5)),
///     CommissionModel::FixedRate(dec!(0.001)),
/// );
///
/// let fill = simulator.simulate_long_entry(dec!(1.0), dec!(100.0), 1_000).unwrap();
/// assert_eq!(fill.price, dec!(100.5));
/// assert_eq!(fill.commission, dec!(0.1005));
/// assert_eq!(fill.slippage, dec!(0.5));
/// ```
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MarketSimulator {
    slippage: SlippageModel,
    commission: CommissionModel,
}

impl MarketSimulator {
    /// Creates a simulator from slippage and commission models.
    #[must_use]
    pub fn new(slippage: SlippageModel, commission: CommissionModel) -> Self {
        Self {
            slippage,
            commission,
        }
    }

    /// Returns the slippage model.
    #[must_use]
    pub fn slippage_model(&self) -> &SlippageModel {
        &self.slippage
    }

    /// Returns the commission model.
    #[must_use]
    pub fn commission_model(&self) -> &CommissionModel {
        &self.commission
    }

    /// Simulates a long entry (buy) at `current_price`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidPrice` / `InvalidQuantity` on
    /// non-positive inputs; these indicate corrupt input data and abort
    /// the run.
    pub fn simulate_long_entry(
        &self,
        quantity: Decimal,
        current_price: Decimal,
        timestamp: u64,
    ) -> EngineResult<Fill> {
        self.market_fill(quantity, current_price, timestamp, true)
    }

    /// Simulates a short entry (sell) at `current_price`.
    ///
    /// # Errors
    ///
    /// See [`simulate_long_entry`](Self::simulate_long_entry).
    pub fn simulate_short_entry(
        &self,
        quantity: Decimal,
        current_price: Decimal,
        timestamp: u64,
    ) -> EngineResult<Fill> {
        self.market_fill(quantity, current_price, timestamp, false)
    }

    /// Simulates a market-style long exit (sell) at `current_price`.
    ///
    /// # Errors
    ///
    /// See [`simulate_long_entry`](Self::simulate_long_entry).
    pub fn simulate_long_exit(
        &self,
        quantity: Decimal,
        current_price: Decimal,
        timestamp: u64,
    ) -> EngineResult<Fill> {
        self.market_fill(quantity, current_price, timestamp, false)
    }

    /// Simulates a market-style short exit (buy back) at `current_price`.
    ///
    /// # Errors
    ///
    /// See [`simulate_long_entry`](Self::simulate_long_entry).
    pub fn simulate_short_exit(
        &self,
        quantity: Decimal,
        current_price: Decimal,
        timestamp: u64,
    ) -> EngineResult<Fill> {
        self.market_fill(quantity, current_price, timestamp, true)
    }

    /// Simulates a limit-style fill exactly at a triggered level.
    ///
    /// Used for take-profit exits: the resting order fills at its level,
    /// so no slippage applies; commission is still charged on the
    /// notional.
    ///
    /// # Errors
    ///
    /// See [`simulate_long_entry`](Self::simulate_long_entry).
    pub fn fill_at_level(
        &self,
        quantity: Decimal,
        level_price: Decimal,
        timestamp: u64,
    ) -> EngineResult<Fill> {
        Self::check_inputs(quantity, level_price)?;

        let commission = self.commission.commission(level_price * quantity);
        Ok(Fill::new(
            level_price,
            quantity,
            commission,
            Decimal::ZERO,
            timestamp,
        ))
    }

    /// Answers whether an order would have filled at `current_price`.
    ///
    /// Market orders always fill. A long limit fills iff
    /// `current_price <= order_price`; a short limit fills iff
    /// `current_price >= order_price`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use perp_backtest_rs::simulation::MarketSimulator;
    /// use perp_backtest_rs::dec;
    ///
    /// let simulator = MarketSimulator::default();
    /// assert!(simulator.can_fill_order(dec!(100), dec!(150), true, false));
    /// assert!(simulator.can_fill_order(dec!(100), dec!(99), true, true));
    /// assert!(!simulator.can_fill_order(dec!(100), dec!(101), true, true));
    /// assert!(simulator.can_fill_order(dec!(100), dec!(101), false, true));
    /// ```
    #[must_use]
    pub fn can_fill_order(
        &self,
        order_price: Decimal,
        current_price: Decimal,
        is_long: bool,
        is_limit: bool,
    ) -> bool {
        if !is_limit {
            return true;
        }

        if is_long {
            current_price <= order_price
        } else {
            current_price >= order_price
        }
    }

    /// Returns a pre-trade fill-price estimate for sizing checks, without
    /// simulating a fill.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidPrice` on a non-positive price.
    pub fn estimate_fill_price(
        &self,
        current_price: Decimal,
        is_long: bool,
    ) -> EngineResult<Decimal> {
        if current_price <= Decimal::ZERO {
            return Err(EngineError::InvalidPrice(format!(
                "current price must be positive, got {}",
                current_price
            )));
        }

        Ok(self.slippage.apply(current_price, is_long))
    }

    fn market_fill(
        &self,
        quantity: Decimal,
        current_price: Decimal,
        timestamp: u64,
        is_buy: bool,
    ) -> EngineResult<Fill> {
        Self::check_inputs(quantity, current_price)?;

        let price = self.slippage.apply(current_price, is_buy);
        let slippage = self.slippage.offset(current_price);
        let commission = self.commission.commission(price * quantity);

        Ok(Fill::new(price, quantity, commission, slippage, timestamp))
    }

    fn check_inputs(quantity: Decimal, price: Decimal) -> EngineResult<()> {
        if price <= Decimal::ZERO {
            return Err(EngineError::InvalidPrice(format!(
                "current price must be positive, got {}",
                price
            )));
        }

        if quantity <= Decimal::ZERO {
            return Err(EngineError::InvalidQuantity(format!(
                "quantity must be positive, got {}",
                quantity
            )));
        }

        Ok(())
    }
}
