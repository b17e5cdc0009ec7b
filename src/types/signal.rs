//! Strategy signals.
//!
//! A [`Signal`] is the instruction a strategy hands back to the engine for
//! one candle. "No signal" is expressed as `None` at the trait boundary,
//! not as a variant, so the engine's match is exhaustive over real
//! instructions only.

use crate::Decimal;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An instruction from the strategy, applied at the next candle open.
///
/// Quantities on `OpenLong`/`OpenShort` are optional: when absent, the
/// engine resolves the size from the configured
/// [`SizingPolicy`](crate::backtest::SizingPolicy).
///
/// # Example
///
/// ```rust
/// use perp_backtest_rs::types::Signal;
/// use perp_backtest_rs::dec;
///
/// let signal = Signal::OpenLong {
///     quantity: Some(dec!(0.5)),
///     stop_loss: Some(dec!(95.0)),
///     take_profit: Some(dec!(120.0)),
/// };
/// assert!(signal.is_entry());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Signal {
    /// Open a long position.
    OpenLong {
        /// Quantity in base units; `None` defers to the sizing policy.
        quantity: Option<Decimal>,
        /// Initial stop-loss level.
        stop_loss: Option<Decimal>,
        /// Initial take-profit level.
        take_profit: Option<Decimal>,
    },
    /// Open a short position.
    OpenShort {
        /// Quantity in base units; `None` defers to the sizing policy.
        quantity: Option<Decimal>,
        /// Initial stop-loss level.
        stop_loss: Option<Decimal>,
        /// Initial take-profit level.
        take_profit: Option<Decimal>,
    },
    /// Scale into an existing long position.
    AddLong {
        /// Additional quantity in base units.
        quantity: Decimal,
    },
    /// Scale into an existing short position.
    AddShort {
        /// Additional quantity in base units.
        quantity: Decimal,
    },
    /// Adjust isolated margin. Positive tops up from cash, negative
    /// withdraws back to cash.
    UpdateMargin {
        /// Margin delta in quote currency.
        amount: Decimal,
    },
    /// Move the stop-loss/take-profit ladder. `None` leaves a level
    /// unchanged.
    UpdateLevels {
        /// New stop-loss level.
        stop_loss: Option<Decimal>,
        /// New take-profit level.
        take_profit: Option<Decimal>,
    },
    /// Close the open position at the next candle open.
    Close,
}

impl Signal {
    /// Returns `true` for signals that open a new position.
    #[must_use]
    pub fn is_entry(&self) -> bool {
        matches!(self, Self::OpenLong { .. } | Self::OpenShort { .. })
    }

    /// Returns `true` for signals that require an open position.
    #[must_use]
    pub fn requires_position(&self) -> bool {
        matches!(
            self,
            Self::AddLong { .. }
                | Self::AddShort { .. }
                | Self::UpdateMargin { .. }
                | Self::UpdateLevels { .. }
                | Self::Close
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dec;

    #[test]
    fn test_entry_classification() {
        let open = Signal::OpenShort {
            quantity: None,
            stop_loss: None,
            take_profit: None,
        };
        assert!(open.is_entry());
        assert!(!open.requires_position());
    }

    #[test]
    fn test_position_required_classification() {
        for signal in [
            Signal::AddLong { quantity: dec!(1) },
            Signal::AddShort { quantity: dec!(1) },
            Signal::UpdateMargin { amount: dec!(100) },
            Signal::UpdateLevels {
                stop_loss: Some(dec!(90)),
                take_profit: None,
            },
            Signal::Close,
        ] {
            assert!(signal.requires_position());
            assert!(!signal.is_entry());
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serialization() {
        let signal = Signal::OpenShort {
            quantity: Some(dec!(2.5)),
            stop_loss: Some(dec!(110)),
            take_profit: Some(dec!(80)),
        };

        let json = serde_json::to_string(&signal).unwrap();
        let deserialized: Signal = serde_json::from_str(&json).unwrap();

        assert_eq!(signal, deserialized);
    }
}
