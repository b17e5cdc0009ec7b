//! Slippage models for simulating execution costs.

use crate::Decimal;
use crate::types::error::{EngineError, EngineResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Slippage model applied to every simulated fill.
///
/// Slippage always moves the price against the trader: buys fill higher,
/// sells fill lower.
///
/// # Example
///
/// ```rust
/// use perp_backtest_rs::simulation::SlippageModel;
/// use perp_backtest_rs::dec;
///
/// let model = SlippageModel::Percentage(dec!(0.1)); // 0.1%
/// assert_eq!(model.offset(dec!(10000.0)), dec!(10.0));
///
/// // Buys pay up, sells give up.
/// assert_eq!(model.apply(dec!(10000.0), true), dec!(10010.0));
/// assert_eq!(model.apply(dec!(10000.0), false), dec!(9990.0));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SlippageModel {
    /// No slippage; fills at the reference price.
    #[default]
    None,
    /// Fixed currency offset per unit, applied against the trader.
    Fixed(Decimal),
    /// Percentage of the reference price (e.g. `0.1` for 0.1%).
    Percentage(Decimal),
    /// Synthetic bid/ask spread as a fraction of price (e.g. `0.001` for
    /// 10 bps). Buys fill at the ask `price * (1 + spread/2)`, sells at
    /// the bid `price * (1 - spread/2)`.
    BidAskSpread(Decimal),
}

impl SlippageModel {
    /// Returns the absolute per-unit price deviation for a fill at
    /// `price`.
    #[must_use]
    pub fn offset(&self, price: Decimal) -> Decimal {
        match self {
            Self::None => Decimal::ZERO,
            Self::Fixed(amount) => *amount,
            Self::Percentage(pct) => price * *pct / Decimal::ONE_HUNDRED,
            Self::BidAskSpread(spread) => price * *spread / Decimal::TWO,
        }
    }

    /// Applies the model to `price` for the given side.
    ///
    /// `is_buy` is `true` when the simulated order lifts the market (long
    /// entries and short exits).
    #[must_use]
    pub fn apply(&self, price: Decimal, is_buy: bool) -> Decimal {
        let offset = self.offset(price);
        if is_buy { price + offset } else { price - offset }
    }

    /// Validates model parameters.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidConfiguration` for negative offsets,
    /// percentages, or spreads.
    pub fn validate(&self) -> EngineResult<()> {
        let negative = match self {
            Self::None => false,
            Self::Fixed(amount) => *amount < Decimal::ZERO,
            Self::Percentage(pct) => *pct < Decimal::ZERO,
            Self::BidAskSpread(spread) => *spread < Decimal::ZERO,
        };

        if negative {
            return Err(EngineError::InvalidConfiguration(
                "slippage parameters must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}
