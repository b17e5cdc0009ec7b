//! Commission models for simulated fills.

use crate::Decimal;
use crate::types::error::{EngineError, EngineResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single tier in a tiered commission schedule.
///
/// Orders whose notional reaches `min_notional` pay `rate` on the whole
/// notional. Tiers must be supplied in ascending `min_notional` order with
/// strictly decreasing rates, so larger orders always pay a lower
/// effective rate.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CommissionTier {
    /// Minimum notional for this tier, inclusive.
    pub min_notional: Decimal,
    /// Commission rate as a fraction of notional (e.g. `0.0004`).
    pub rate: Decimal,
}

impl CommissionTier {
    /// Creates a new tier.
    #[must_use]
    pub fn new(min_notional: Decimal, rate: Decimal) -> Self {
        Self { min_notional, rate }
    }
}

/// Commission model applied to the filled notional of every order.
///
/// # Example
///
/// ```rust
/// use perp_backtest_rs::simulation::{CommissionModel, CommissionTier};
/// use perp_backtest_rs::dec;
///
/// let model = CommissionModel::FixedRate(dec!(0.0004));
/// assert_eq!(model.commission(dec!(10000.0)), dec!(4.0));
///
/// let tiered = CommissionModel::Tiered(vec![
///     CommissionTier::new(dec!(0), dec!(0.0005)),
///     CommissionTier::new(dec!(100000), dec!(0.0003)),
/// ]);
/// tiered.validate().unwrap();
/// assert_eq!(tiered.commission(dec!(10000.0)), dec!(5.0));
/// assert_eq!(tiered.commission(dec!(200000.0)), dec!(60.0));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CommissionModel {
    /// No commission.
    #[default]
    None,
    /// Flat fee per order, regardless of size.
    Fixed(Decimal),
    /// Fraction of the filled notional.
    FixedRate(Decimal),
    /// Rate bands keyed on total notional; larger orders pay a strictly
    /// lower effective rate.
    Tiered(Vec<CommissionTier>),
}

impl CommissionModel {
    /// Returns the commission charged on `notional`.
    #[must_use]
    pub fn commission(&self, notional: Decimal) -> Decimal {
        match self {
            Self::None => Decimal::ZERO,
            Self::Fixed(fee) => *fee,
            Self::FixedRate(rate) => notional * *rate,
            Self::Tiered(tiers) => {
                let rate = tiers
                    .iter()
                    .rev()
                    .find(|tier| notional >= tier.min_notional)
                    .map_or(Decimal::ZERO, |tier| tier.rate);
                notional * rate
            }
        }
    }

    /// Validates model parameters.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidConfiguration` for negative fees or
    /// rates, an empty tier table, a tier table whose first band does not
    /// start at zero, or bands that are not ascending-notional with
    /// strictly decreasing rates.
    pub fn validate(&self) -> EngineResult<()> {
        match self {
            Self::None => Ok(()),
            Self::Fixed(fee) => {
                if *fee < Decimal::ZERO {
                    return Err(EngineError::InvalidConfiguration(
                        "fixed commission must be non-negative".to_string(),
                    ));
                }
                Ok(())
            }
            Self::FixedRate(rate) => {
                if *rate < Decimal::ZERO {
                    return Err(EngineError::InvalidConfiguration(
                        "commission rate must be non-negative".to_string(),
                    ));
                }
                Ok(())
            }
            Self::Tiered(tiers) => {
                if tiers.is_empty() {
                    return Err(EngineError::InvalidConfiguration(
                        "tiered commission requires at least one tier".to_string(),
                    ));
                }

                if tiers[0].min_notional != Decimal::ZERO {
                    return Err(EngineError::InvalidConfiguration(
                        "first commission tier must start at zero notional".to_string(),
                    ));
                }

                for tier in tiers {
                    if tier.rate < Decimal::ZERO {
                        return Err(EngineError::InvalidConfiguration(
                            "commission tier rates must be non-negative".to_string(),
                        ));
                    }
                }

                for pair in tiers.windows(2) {
                    if pair[1].min_notional <= pair[0].min_notional {
                        return Err(EngineError::InvalidConfiguration(
                            "commission tiers must have ascending notional thresholds"
                                .to_string(),
                        ));
                    }
                    if pair[1].rate >= pair[0].rate {
                        return Err(EngineError::InvalidConfiguration(
                            "commission tier rates must strictly decrease".to_string(),
                        ));
                    }
                }

                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dec;

    fn tiered() -> CommissionModel {
        CommissionModel::Tiered(vec![
            CommissionTier::new(dec!(0), dec!(0.0005)),
            CommissionTier::new(dec!(50000), dec!(0.0004)),
            CommissionTier::new(dec!(250000), dec!(0.0002)),
        ])
    }

    #[test]
    fn test_none_is_free() {
        assert_eq!(CommissionModel::None.commission(dec!(10000)), Decimal::ZERO);
    }

    #[test]
    fn test_fixed_ignores_size() {
        let model = CommissionModel::Fixed(dec!(1.5));
        assert_eq!(model.commission(dec!(100)), dec!(1.5));
        assert_eq!(model.commission(dec!(1000000)), dec!(1.5));
    }

    #[test]
    fn test_fixed_rate_on_notional() {
        let model = CommissionModel::FixedRate(dec!(0.001));
        assert_eq!(model.commission(dec!(25000)), dec!(25));
    }

    #[test]
    fn test_tiered_band_selection() {
        let model = tiered();
        assert_eq!(model.commission(dec!(10000)), dec!(5.0));
        // Exactly at a threshold uses the cheaper band.
        assert_eq!(model.commission(dec!(50000)), dec!(20.0));
        assert_eq!(model.commission(dec!(500000)), dec!(100.0));
    }

    #[test]
    fn test_tiered_effective_rate_monotonicity() {
        let model = tiered();
        let mut last_rate = Decimal::MAX;
        for notional in [
            dec!(1000),
            dec!(49999),
            dec!(50000),
            dec!(100000),
            dec!(250000),
            dec!(1000000),
        ] {
            let rate = model.commission(notional) / notional;
            assert!(
                rate <= last_rate,
                "effective rate increased at notional {}",
                notional
            );
            last_rate = rate;
        }
    }

    #[test]
    fn test_validate_accepts_good_tiers() {
        assert!(tiered().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_tiers() {
        assert!(CommissionModel::Tiered(vec![]).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_nonzero_first_tier() {
        let model = CommissionModel::Tiered(vec![CommissionTier::new(dec!(100), dec!(0.001))]);
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_decreasing_rates() {
        let model = CommissionModel::Tiered(vec![
            CommissionTier::new(dec!(0), dec!(0.0004)),
            CommissionTier::new(dec!(50000), dec!(0.0004)),
        ]);
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_parameters() {
        assert!(CommissionModel::Fixed(dec!(-1)).validate().is_err());
        assert!(CommissionModel::FixedRate(dec!(-0.001)).validate().is_err());
    }
}
