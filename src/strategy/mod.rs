//! The strategy capability boundary.
//!
//! Strategies are external plugins: given a candle, its index, and the
//! current position, they return a [`Signal`] or nothing. The engine
//! depends only on the [`Strategy`] trait, never on concrete strategy
//! types, and consumes strategies as `Box<dyn Strategy>`. Each run must
//! construct a fresh strategy instance; any state a strategy carries
//! across calls (counters, flags) lives on the instance itself.
//!
//! [`MultiTimeframeContext`] gives strategies O(1) access to
//! higher-timeframe candles, aligned once per run so that a base candle
//! only ever sees higher-timeframe bars that had already closed at its
//! open, so the alignment itself cannot introduce lookahead bias.

use crate::position::Position;
use crate::types::candle::{Candle, CandleSeries, Timeframe};
use crate::types::error::{EngineError, EngineResult};
use crate::types::signal::Signal;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One higher timeframe aligned against the base series.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct AlignedTimeframe {
    timeframe: Timeframe,
    candles: Vec<Candle>,
    /// For each base candle, the index of the last higher-timeframe
    /// candle that closed at or before the base candle's open.
    index_by_base: Vec<Option<usize>>,
}

/// Precomputed higher-timeframe lookup for strategies.
///
/// Built once per run; lookups are O(1) per base candle instead of a
/// rolling-window scan per tick, which is what keeps multi-year
/// one-minute backtests feasible.
///
/// # Example
///
/// ```rust
/// use perp_backtest_rs::strategy::MultiTimeframeContext;
///
/// let context = MultiTimeframeContext::empty();
/// assert!(context.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MultiTimeframeContext {
    frames: Vec<AlignedTimeframe>,
}

impl MultiTimeframeContext {
    /// Creates a context with no higher timeframes.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Aligns higher-timeframe series against the base series.
    ///
    /// For every base candle the context records the last candle of each
    /// higher timeframe whose `close_time` is at or before the base
    /// candle's `open_time`: data that existed when the base candle
    /// opened, and nothing newer.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidConfiguration` if a higher-timeframe
    /// series does not cover a longer duration than the base timeframe or
    /// its symbol differs from the base symbol.
    pub fn align(base: &CandleSeries, higher: &[CandleSeries]) -> EngineResult<Self> {
        let mut frames = Vec::with_capacity(higher.len());

        for series in higher {
            if series.timeframe().duration_ms() <= base.timeframe().duration_ms() {
                return Err(EngineError::InvalidConfiguration(format!(
                    "higher timeframe {} is not above base timeframe {}",
                    series.timeframe(),
                    base.timeframe()
                )));
            }

            if series.symbol() != base.symbol() {
                return Err(EngineError::InvalidConfiguration(format!(
                    "higher timeframe symbol {} does not match base symbol {}",
                    series.symbol(),
                    base.symbol()
                )));
            }

            let htf = series.candles();
            let mut index_by_base = Vec::with_capacity(base.len());
            let mut last_closed: Option<usize> = None;
            let mut next = 0;

            for candle in base.candles() {
                while next < htf.len() && htf[next].close_time <= candle.open_time {
                    last_closed = Some(next);
                    next += 1;
                }
                index_by_base.push(last_closed);
            }

            frames.push(AlignedTimeframe {
                timeframe: series.timeframe(),
                candles: htf.to_vec(),
                index_by_base,
            });
        }

        Ok(Self { frames })
    }

    /// Returns the last closed higher-timeframe candle visible at
    /// `base_index`, or `None` if that timeframe has no closed candle yet
    /// (or was never supplied).
    #[must_use]
    pub fn candle(&self, timeframe: Timeframe, base_index: usize) -> Option<&Candle> {
        let frame = self.frames.iter().find(|f| f.timeframe == timeframe)?;
        let index = (*frame.index_by_base.get(base_index)?)?;
        frame.candles.get(index)
    }

    /// Returns the aligned timeframes.
    #[must_use]
    pub fn timeframes(&self) -> Vec<Timeframe> {
        self.frames.iter().map(|f| f.timeframe).collect()
    }

    /// Returns `true` when no higher timeframes were supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// The external decision capability driven by the engine.
///
/// Implementations must not block on I/O: they are invoked synchronously
/// inside the per-candle loop. Errors are never swallowed below the
/// engine boundary; an `Err` from either method fails the run and is
/// recorded as its error message.
pub trait Strategy {
    /// Optional precomputation over the full candle set before the run
    /// starts (indicator warm-up, lookup tables). The default does
    /// nothing.
    ///
    /// # Errors
    ///
    /// Any error fails the run before the first candle is processed.
    fn pre_calculate(
        &mut self,
        candles: &[Candle],
        context: &MultiTimeframeContext,
    ) -> EngineResult<()> {
        let _ = (candles, context);
        Ok(())
    }

    /// Produces the signal for one candle, or `None` for no action.
    ///
    /// The engine always passes the candle at `index` together with the
    /// position state as of that candle's close; any resulting order is
    /// filled at the *next* candle's open.
    ///
    /// # Errors
    ///
    /// Any error transitions the run to `Failed` with the message
    /// recorded; no further candles are processed.
    fn calculate_signal(
        &mut self,
        candle: &Candle,
        index: usize,
        position: Option<&Position>,
        context: &MultiTimeframeContext,
    ) -> EngineResult<Option<Signal>>;
}
