//! Backtest run configuration.

use crate::Decimal;
use crate::dec;
use crate::simulation::{CommissionModel, SlippageModel};
use crate::types::error::{EngineError, EngineResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How the engine sizes entries whose signal carries no explicit
/// quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SizingPolicy {
    /// Always trade a fixed quantity in base units.
    FixedQuantity(Decimal),
    /// Always trade a fixed notional; quantity = notional / price.
    FixedNotional(Decimal),
    /// Deploy a fraction of current equity, levered:
    /// quantity = equity × fraction × leverage / price.
    EquityFraction(Decimal),
}

impl SizingPolicy {
    /// Validates policy parameters.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidConfiguration` for non-positive
    /// quantities/notionals or an equity fraction outside `(0, 1]`.
    pub fn validate(&self) -> EngineResult<()> {
        match self {
            Self::FixedQuantity(quantity) => {
                if *quantity <= Decimal::ZERO {
                    return Err(EngineError::InvalidConfiguration(
                        "sizing quantity must be positive".to_string(),
                    ));
                }
            }
            Self::FixedNotional(notional) => {
                if *notional <= Decimal::ZERO {
                    return Err(EngineError::InvalidConfiguration(
                        "sizing notional must be positive".to_string(),
                    ));
                }
            }
            Self::EquityFraction(fraction) => {
                if *fraction <= Decimal::ZERO || *fraction > Decimal::ONE {
                    return Err(EngineError::InvalidConfiguration(
                        "equity fraction must be in (0, 1]".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Resolves a quantity for an entry at `price` with the given
    /// `equity` and `leverage`.
    #[must_use]
    pub fn quantity(&self, price: Decimal, equity: Decimal, leverage: Decimal) -> Decimal {
        match self {
            Self::FixedQuantity(quantity) => *quantity,
            Self::FixedNotional(notional) => *notional / price,
            Self::EquityFraction(fraction) => equity * *fraction * leverage / price,
        }
    }
}

impl Default for SizingPolicy {
    fn default() -> Self {
        Self::EquityFraction(dec!(0.1))
    }
}

/// Parameters of one backtest run. Created once per run, immutable.
///
/// # Example
///
/// ```rust
/// use perp_backtest_rs::backtest::{BacktestConfig, SizingPolicy};
/// use perp_backtest_rs::simulation::{CommissionModel, SlippageModel};
/// use perp_backtest_rs::dec;
///
/// let config = BacktestConfig::new("BTC-USDT", dec!(100000.0))
///     .unwrap()
///     .with_leverage(dec!(10))
///     .with_slippage(SlippageModel::Percentage(dec!(0.05)))
///     .with_commission(CommissionModel::FixedRate(dec!(0.0004)))
///     .with_sizing(SizingPolicy::FixedQuantity(dec!(0.5)));
///
/// config.validate().unwrap();
/// assert_eq!(config.maintenance_margin_rate, dec!(0.005));
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BacktestConfig {
    /// Trading symbol; must match the candle series.
    pub symbol: String,
    /// Starting cash in quote currency.
    pub initial_capital: Decimal,
    /// Leverage applied to every entry (>= 1).
    pub leverage: Decimal,
    /// Maintenance margin rate. An explicit, required field: every margin
    /// and liquidation computation reads it from here.
    pub maintenance_margin_rate: Decimal,
    /// Slippage model for simulated fills.
    pub slippage: SlippageModel,
    /// Commission model for simulated fills.
    pub commission: CommissionModel,
    /// Sizing policy for entries without an explicit quantity.
    pub sizing: SizingPolicy,
    /// Annual risk-free rate used by the Sharpe/Sortino denominators.
    pub risk_free_rate: f64,
    /// Candles between progress callbacks.
    pub progress_interval: usize,
}

impl BacktestConfig {
    /// Creates a configuration with defaults: leverage 1, maintenance
    /// margin rate 0.005, no slippage, no commission, 10% equity sizing.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidConfiguration` if `initial_capital`
    /// is not positive or the symbol is empty.
    pub fn new(symbol: impl Into<String>, initial_capital: Decimal) -> EngineResult<Self> {
        let symbol = symbol.into();

        if symbol.is_empty() {
            return Err(EngineError::InvalidConfiguration(
                "symbol must not be empty".to_string(),
            ));
        }

        if initial_capital <= Decimal::ZERO {
            return Err(EngineError::InvalidConfiguration(
                "initial_capital must be positive".to_string(),
            ));
        }

        Ok(Self {
            symbol,
            initial_capital,
            leverage: Decimal::ONE,
            maintenance_margin_rate: dec!(0.005),
            slippage: SlippageModel::None,
            commission: CommissionModel::None,
            sizing: SizingPolicy::default(),
            risk_free_rate: 0.0,
            progress_interval: 1_000,
        })
    }

    /// Sets the leverage.
    #[must_use]
    pub fn with_leverage(mut self, leverage: Decimal) -> Self {
        self.leverage = leverage;
        self
    }

    /// Sets the maintenance margin rate.
    #[must_use]
    pub fn with_maintenance_margin_rate(mut self, rate: Decimal) -> Self {
        self.maintenance_margin_rate = rate;
        self
    }

    /// Sets the slippage model.
    #[must_use]
    pub fn with_slippage(mut self, slippage: SlippageModel) -> Self {
        self.slippage = slippage;
        self
    }

    /// Sets the commission model.
    #[must_use]
    pub fn with_commission(mut self, commission: CommissionModel) -> Self {
        self.commission = commission;
        self
    }

    /// Sets the sizing policy.
    #[must_use]
    pub fn with_sizing(mut self, sizing: SizingPolicy) -> Self {
        self.sizing = sizing;
        self
    }

    /// Sets the annual risk-free rate.
    #[must_use]
    pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    /// Sets the progress callback interval in candles.
    #[must_use]
    pub fn with_progress_interval(mut self, candles: usize) -> Self {
        self.progress_interval = candles;
        self
    }

    /// Validates the full configuration, including the embedded slippage,
    /// commission, and sizing models.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidConfiguration` describing the first
    /// invalid parameter.
    pub fn validate(&self) -> EngineResult<()> {
        if self.initial_capital <= Decimal::ZERO {
            return Err(EngineError::InvalidConfiguration(
                "initial_capital must be positive".to_string(),
            ));
        }

        if self.leverage < Decimal::ONE {
            return Err(EngineError::InvalidConfiguration(format!(
                "leverage must be at least 1, got {}",
                self.leverage
            )));
        }

        if self.maintenance_margin_rate < Decimal::ZERO
            || self.maintenance_margin_rate >= Decimal::ONE
        {
            return Err(EngineError::InvalidConfiguration(format!(
                "maintenance_margin_rate must be in [0, 1), got {}",
                self.maintenance_margin_rate
            )));
        }

        if self.progress_interval == 0 {
            return Err(EngineError::InvalidConfiguration(
                "progress_interval must be at least 1".to_string(),
            ));
        }

        self.slippage.validate()?;
        self.commission.validate()?;
        self.sizing.validate()?;

        Ok(())
    }
}
