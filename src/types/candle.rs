//! Candle data types and the validated input series.
//!
//! The engine consumes an ordered, gap-checked sequence of OHLCV candles.
//! Validation happens once, at [`CandleSeries`] construction: nothing runs
//! on malformed data, and the per-candle loop can assume a clean stream.

use std::fmt;
use std::str::FromStr;

use crate::Decimal;
use crate::types::error::{EngineError, EngineResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Candle timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Timeframe {
    /// One minute.
    M1,
    /// Five minutes.
    M5,
    /// Fifteen minutes.
    M15,
    /// Thirty minutes.
    M30,
    /// One hour.
    H1,
    /// Four hours.
    H4,
    /// One day.
    D1,
}

impl Timeframe {
    /// Returns the duration of one candle in milliseconds.
    ///
    /// # Example
    ///
    /// ```rust
    /// use perp_backtest_rs::types::Timeframe;
    ///
    /// assert_eq!(Timeframe::M1.duration_ms(), 60_000);
    /// assert_eq!(Timeframe::H1.duration_ms(), 3_600_000);
    /// ```
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        match self {
            Self::M1 => 60_000,
            Self::M5 => 300_000,
            Self::M15 => 900_000,
            Self::M30 => 1_800_000,
            Self::H1 => 3_600_000,
            Self::H4 => 14_400_000,
            Self::D1 => 86_400_000,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::D1 => "1d",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Timeframe {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Self::M1),
            "5m" => Ok(Self::M5),
            "15m" => Ok(Self::M15),
            "30m" => Ok(Self::M30),
            "1h" => Ok(Self::H1),
            "4h" => Ok(Self::H4),
            "1d" => Ok(Self::D1),
            other => Err(EngineError::InvalidConfiguration(format!(
                "unknown timeframe: {}",
                other
            ))),
        }
    }
}

/// One OHLCV bar.
///
/// Timestamps are epoch milliseconds. A candle covers
/// `[open_time, close_time)`; fills executed "at the open" carry
/// `open_time` as their timestamp.
///
/// # Example
///
/// ```rust
/// use perp_backtest_rs::types::Candle;
/// use perp_backtest_rs::dec;
///
/// let candle = Candle::new(
///     "BTC-USDT",
///     0,
///     60_000,
///     dec!(100.0),
///     dec!(102.0),
///     dec!(99.0),
///     dec!(101.0),
///     dec!(12.5),
/// );
/// assert_eq!(candle.range(), dec!(3.0));
/// assert!(candle.is_bullish());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Candle {
    /// Trading symbol.
    pub symbol: String,
    /// Bar open timestamp in milliseconds.
    pub open_time: u64,
    /// Bar close timestamp in milliseconds.
    pub close_time: u64,
    /// Open price.
    pub open: Decimal,
    /// High price.
    pub high: Decimal,
    /// Low price.
    pub low: Decimal,
    /// Close price.
    pub close: Decimal,
    /// Traded volume in base units.
    pub volume: Decimal,
}

impl Candle {
    /// Creates a new candle.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: impl Into<String>,
        open_time: u64,
        close_time: u64,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            open_time,
            close_time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns the high-to-low range.
    #[must_use]
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// Returns `true` if the candle closed above its open.
    #[must_use]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Validates internal consistency of a single candle.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidCandleData` if any price is
    /// non-positive, `high < low`, the high/low do not envelop the
    /// open/close, or `close_time <= open_time`.
    pub fn validate(&self) -> EngineResult<()> {
        if self.open <= Decimal::ZERO
            || self.high <= Decimal::ZERO
            || self.low <= Decimal::ZERO
            || self.close <= Decimal::ZERO
        {
            return Err(EngineError::InvalidCandleData(format!(
                "non-positive price in candle at {}",
                self.open_time
            )));
        }

        if self.high < self.low {
            return Err(EngineError::InvalidCandleData(format!(
                "high {} below low {} at {}",
                self.high, self.low, self.open_time
            )));
        }

        if self.open > self.high
            || self.open < self.low
            || self.close > self.high
            || self.close < self.low
        {
            return Err(EngineError::InvalidCandleData(format!(
                "open/close outside high-low range at {}",
                self.open_time
            )));
        }

        if self.close_time <= self.open_time {
            return Err(EngineError::InvalidCandleData(format!(
                "close_time {} not after open_time {}",
                self.close_time, self.open_time
            )));
        }

        if self.volume < Decimal::ZERO {
            return Err(EngineError::InvalidCandleData(format!(
                "negative volume at {}",
                self.open_time
            )));
        }

        Ok(())
    }
}

/// An ordered, gap-checked candle sequence for one symbol and timeframe.
///
/// Construction validates every candle and the relationships between
/// consecutive candles, so the engine's loop never re-checks the stream.
///
/// # Example
///
/// ```rust
/// use perp_backtest_rs::types::{Candle, CandleSeries, Timeframe};
/// use perp_backtest_rs::dec;
///
/// let candles: Vec<Candle> = (0..3)
///     .map(|i| {
///         let t = i as u64 * 60_000;
///         Candle::new("ETH-USDT", t, t + 60_000, dec!(2000), dec!(2010), dec!(1990), dec!(2005), dec!(1.0))
///     })
///     .collect();
///
/// let series = CandleSeries::new("ETH-USDT", Timeframe::M1, candles).unwrap();
/// assert_eq!(series.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CandleSeries {
    symbol: String,
    timeframe: Timeframe,
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Creates a validated series.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidCandleData` if the series is empty,
    /// any candle fails [`Candle::validate`], a candle's symbol does not
    /// match the series symbol, timestamps are not strictly increasing, or
    /// consecutive candles are not exactly one timeframe apart.
    pub fn new(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        candles: Vec<Candle>,
    ) -> EngineResult<Self> {
        let symbol = symbol.into();

        if candles.is_empty() {
            return Err(EngineError::InvalidCandleData(format!(
                "empty candle series for {}",
                symbol
            )));
        }

        let step = timeframe.duration_ms();
        for (i, candle) in candles.iter().enumerate() {
            candle.validate()?;

            if candle.symbol != symbol {
                return Err(EngineError::InvalidCandleData(format!(
                    "candle symbol {} does not match series symbol {}",
                    candle.symbol, symbol
                )));
            }

            if i > 0 {
                let prev = &candles[i - 1];
                if candle.open_time <= prev.open_time {
                    return Err(EngineError::InvalidCandleData(format!(
                        "candles out of order at {}",
                        candle.open_time
                    )));
                }
                if candle.open_time - prev.open_time != step {
                    return Err(EngineError::InvalidCandleData(format!(
                        "gap between {} and {} (expected {} ms)",
                        prev.open_time, candle.open_time, step
                    )));
                }
            }
        }

        Ok(Self {
            symbol,
            timeframe,
            candles,
        })
    }

    /// Returns the series symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Returns the series timeframe.
    #[must_use]
    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Returns the number of candles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Returns `true` if the series holds no candles. Construction rejects
    /// empty input, so this is only `false` on a live series.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Returns the candle at `index`.
    #[must_use]
    pub fn candle(&self, index: usize) -> &Candle {
        &self.candles[index]
    }

    /// Returns the full candle slice.
    #[must_use]
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// Returns the covered span in fractional days.
    #[must_use]
    pub fn duration_days(&self) -> f64 {
        let first = self.candles[0].open_time;
        let last = self.candles[self.candles.len() - 1].close_time;
        (last - first) as f64 / 86_400_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dec;

    fn candle(open_time: u64, open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Candle {
        Candle::new(
            "BTC-USDT",
            open_time,
            open_time + 60_000,
            open,
            high,
            low,
            close,
            dec!(1.0),
        )
    }

    fn flat_series(n: u64) -> Vec<Candle> {
        (0..n)
            .map(|i| candle(i * 60_000, dec!(100), dec!(101), dec!(99), dec!(100)))
            .collect()
    }

    #[test]
    fn test_timeframe_durations() {
        assert_eq!(Timeframe::M1.duration_ms(), 60_000);
        assert_eq!(Timeframe::M5.duration_ms(), 300_000);
        assert_eq!(Timeframe::H4.duration_ms(), 14_400_000);
        assert_eq!(Timeframe::D1.duration_ms(), 86_400_000);
    }

    #[test]
    fn test_timeframe_roundtrip() {
        for tf in [
            Timeframe::M1,
            Timeframe::M5,
            Timeframe::M15,
            Timeframe::M30,
            Timeframe::H1,
            Timeframe::H4,
            Timeframe::D1,
        ] {
            assert_eq!(tf.to_string().parse::<Timeframe>().unwrap(), tf);
        }
    }

    #[test]
    fn test_timeframe_parse_unknown() {
        assert!(matches!(
            "2w".parse::<Timeframe>(),
            Err(EngineError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_candle_range_and_direction() {
        let c = candle(0, dec!(100), dec!(105), dec!(98), dec!(104));
        assert_eq!(c.range(), dec!(7));
        assert!(c.is_bullish());

        let c = candle(0, dec!(104), dec!(105), dec!(98), dec!(100));
        assert!(!c.is_bullish());
    }

    #[test]
    fn test_candle_validate_ok() {
        assert!(candle(0, dec!(100), dec!(101), dec!(99), dec!(100)).validate().is_ok());
    }

    #[test]
    fn test_candle_validate_negative_price() {
        let c = candle(0, dec!(-1), dec!(101), dec!(99), dec!(100));
        assert!(matches!(
            c.validate(),
            Err(EngineError::InvalidCandleData(_))
        ));
    }

    #[test]
    fn test_candle_validate_high_below_low() {
        let mut c = candle(0, dec!(100), dec!(101), dec!(99), dec!(100));
        c.high = dec!(98);
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_candle_validate_close_outside_range() {
        let mut c = candle(0, dec!(100), dec!(101), dec!(99), dec!(100));
        c.close = dec!(102);
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_candle_validate_bad_times() {
        let mut c = candle(60_000, dec!(100), dec!(101), dec!(99), dec!(100));
        c.close_time = c.open_time;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_series_valid() {
        let series = CandleSeries::new("BTC-USDT", Timeframe::M1, flat_series(5)).unwrap();
        assert_eq!(series.len(), 5);
        assert_eq!(series.symbol(), "BTC-USDT");
        assert_eq!(series.timeframe(), Timeframe::M1);
        assert!(!series.is_empty());
    }

    #[test]
    fn test_series_rejects_empty() {
        assert!(matches!(
            CandleSeries::new("BTC-USDT", Timeframe::M1, vec![]),
            Err(EngineError::InvalidCandleData(_))
        ));
    }

    #[test]
    fn test_series_rejects_gap() {
        let mut candles = flat_series(3);
        // Drop the middle candle: a one-minute series now jumps two minutes.
        candles.remove(1);
        assert!(matches!(
            CandleSeries::new("BTC-USDT", Timeframe::M1, candles),
            Err(EngineError::InvalidCandleData(_))
        ));
    }

    #[test]
    fn test_series_rejects_out_of_order() {
        let mut candles = flat_series(3);
        candles.swap(0, 2);
        assert!(CandleSeries::new("BTC-USDT", Timeframe::M1, candles).is_err());
    }

    #[test]
    fn test_series_rejects_symbol_mismatch() {
        let mut candles = flat_series(3);
        candles[1].symbol = "ETH-USDT".to_string();
        assert!(CandleSeries::new("BTC-USDT", Timeframe::M1, candles).is_err());
    }

    #[test]
    fn test_series_duration_days() {
        // 1440 one-minute candles = exactly one day.
        let series = CandleSeries::new("BTC-USDT", Timeframe::M1, flat_series(1440)).unwrap();
        assert!((series.duration_days() - 1.0).abs() < 1e-9);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serialization() {
        let candle = candle(0, dec!(100), dec!(101), dec!(99), dec!(100));

        let json = serde_json::to_string(&candle).unwrap();
        let deserialized: Candle = serde_json::from_str(&json).unwrap();

        assert_eq!(candle, deserialized);
    }
}
