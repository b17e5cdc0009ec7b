//! The backtest engine: a deterministic, event-driven candle replay.
//!
//! Each run is single-threaded and strictly sequential; the same config
//! and candles always produce the same trade list and equity curve. The
//! per-candle ordering is fixed:
//!
//! 1. liquidation check (forced close ends the candle),
//! 2. stop-loss / take-profit ladder,
//! 3. strategy evaluation on the *previous* candle (one-candle execution
//!    delay against lookahead bias),
//! 4. signal application at the current candle's open,
//! 5. equity curve point,
//! 6. periodic progress + per-candle cancellation poll.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::Decimal;
use crate::analytics::MetricsCalculator;
use crate::backtest::config::BacktestConfig;
use crate::backtest::results::{BacktestResult, EquityCurvePoint};
use crate::position::{ClosedTrade, Direction, PositionLedger, TradeExit};
use crate::simulation::{Fill, MarketSimulator};
use crate::strategy::{MultiTimeframeContext, Strategy};
use crate::types::candle::{Candle, CandleSeries};
use crate::types::error::{EngineError, EngineResult};
use crate::types::signal::Signal;

use rust_decimal::prelude::ToPrimitive;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lifecycle of one run: `Pending → Running → {Completed | Failed |
/// Cancelled}`. Terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RunState {
    /// Created, not yet started.
    Pending,
    /// The candle loop is executing.
    Running,
    /// The loop processed every candle.
    Completed,
    /// A strategy error stopped the loop; the message is recorded.
    Failed,
    /// The cancellation token stopped the loop at a candle boundary.
    Cancelled,
}

impl RunState {
    /// Returns `true` for `Completed`, `Failed`, and `Cancelled`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

/// Cooperative cancellation handle for a run.
///
/// The engine polls the token once per candle boundary, so cancellation
/// latency is bounded by the cost of one candle. Clones share the flag.
///
/// # Example
///
/// ```rust
/// use perp_backtest_rs::backtest::CancelToken;
///
/// let token = CancelToken::new();
/// let shared = token.clone();
/// assert!(!token.is_cancelled());
/// shared.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates an un-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation at the next candle boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Drives the per-candle loop for one run.
///
/// The engine owns its candle series, ledger, and strategy; concurrent
/// runs share nothing. See the crate-level example for typical usage.
pub struct BacktestEngine {
    config: BacktestConfig,
    strategy: Box<dyn Strategy>,
    series: CandleSeries,
    higher_timeframes: Vec<CandleSeries>,
    simulator: MarketSimulator,
    ledger: PositionLedger,
    state: RunState,
    cancel: CancelToken,
    trades: Vec<ClosedTrade>,
    equity_curve: Vec<EquityCurvePoint>,
    peak_equity: Decimal,
    error_message: Option<String>,
}

impl BacktestEngine {
    /// Creates an engine in the `Pending` state.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidConfiguration` if the configuration
    /// fails validation or its symbol does not match the series symbol.
    pub fn new(
        config: BacktestConfig,
        strategy: Box<dyn Strategy>,
        series: CandleSeries,
    ) -> EngineResult<Self> {
        config.validate()?;

        if config.symbol != series.symbol() {
            return Err(EngineError::InvalidConfiguration(format!(
                "config symbol {} does not match series symbol {}",
                config.symbol,
                series.symbol()
            )));
        }

        let simulator = MarketSimulator::new(config.slippage.clone(), config.commission.clone());
        let ledger = PositionLedger::new(
            config.symbol.clone(),
            config.initial_capital,
            config.maintenance_margin_rate,
        );
        let peak_equity = config.initial_capital;

        Ok(Self {
            config,
            strategy,
            series,
            higher_timeframes: Vec::new(),
            simulator,
            ledger,
            state: RunState::Pending,
            cancel: CancelToken::new(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
            peak_equity,
            error_message: None,
        })
    }

    /// Supplies higher-timeframe series for the strategy's
    /// multi-timeframe context. Alignment happens once, at run start.
    #[must_use]
    pub fn with_higher_timeframes(mut self, series: Vec<CandleSeries>) -> Self {
        self.higher_timeframes = series;
        self
    }

    /// Returns the current run state.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Returns a cancellation handle for this run. The host may cancel
    /// from another thread; the engine polls between candles.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Runs the backtest to a terminal state.
    ///
    /// # Errors
    ///
    /// Input and configuration errors (including running twice) return
    /// `Err` before any candle is processed. Strategy failures and
    /// cancellation do *not* return `Err`: they are reported through
    /// `state` and `error_message` on the result, with partially
    /// accumulated trades and equity retained for diagnostics.
    pub fn run(&mut self) -> EngineResult<BacktestResult> {
        self.run_with_progress(|_| {})
    }

    /// Runs the backtest, invoking `progress` with the completed
    /// percentage every `progress_interval` candles.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn run_with_progress<F: FnMut(f64)>(
        &mut self,
        mut progress: F,
    ) -> EngineResult<BacktestResult> {
        let context = MultiTimeframeContext::align(&self.series, &self.higher_timeframes)?;
        self.start()?;

        if let Err(error) = self.strategy.pre_calculate(self.series.candles(), &context) {
            self.fail(error.to_string())?;
            return Ok(self.build_result());
        }

        let total = self.series.len();
        for i in 0..total {
            // Cancellation is polled once per candle boundary.
            if self.cancel.is_cancelled() {
                self.state = RunState::Cancelled;
                break;
            }

            let candle = self.series.candle(i).clone();

            // 1. Liquidation takes precedence over everything else in
            // the candle, including strategy close signals.
            if self.ledger.is_open() && self.ledger.check_liquidation(candle.low, candle.high) {
                let trade = self.ledger.liquidate(candle.close_time)?;
                self.trades.push(trade);
                self.record_equity(&candle);
                self.report_progress(i + 1, total, &mut progress);
                continue;
            }

            // 2. Stop-loss / take-profit ladder.
            if self.ledger.is_open() {
                self.check_protective_levels(&candle)?;
            }

            // 3 + 4. The strategy sees data as of the previous candle's
            // close; its signal fills at this candle's open.
            if i > 0 {
                let prev = self.series.candle(i - 1).clone();
                match self
                    .strategy
                    .calculate_signal(&prev, i - 1, self.ledger.position(), &context)
                {
                    Ok(Some(signal)) => self.apply_signal(signal, &candle)?,
                    Ok(None) => {}
                    Err(error) => {
                        self.fail(error.to_string())?;
                        break;
                    }
                }
            }

            // 5. Equity snapshot at the candle close.
            self.record_equity(&candle);

            // 6. Progress.
            self.report_progress(i + 1, total, &mut progress);
        }

        if self.state == RunState::Running {
            self.complete()?;
        }

        Ok(self.build_result())
    }

    /// Transitions `Pending → Running`.
    fn start(&mut self) -> EngineResult<()> {
        if self.state != RunState::Pending {
            return Err(EngineError::InvalidStateTransition(format!(
                "cannot start a {} run",
                self.state
            )));
        }
        self.state = RunState::Running;
        Ok(())
    }

    /// Transitions `Running → Completed`.
    fn complete(&mut self) -> EngineResult<()> {
        if self.state != RunState::Running {
            return Err(EngineError::InvalidStateTransition(format!(
                "cannot complete a {} run",
                self.state
            )));
        }
        self.state = RunState::Completed;
        Ok(())
    }

    /// Transitions `Running → Failed`, recording the message.
    fn fail(&mut self, message: String) -> EngineResult<()> {
        if self.state != RunState::Running {
            return Err(EngineError::InvalidStateTransition(format!(
                "cannot fail a {} run",
                self.state
            )));
        }
        self.error_message = Some(message);
        self.state = RunState::Failed;
        Ok(())
    }

    /// Applies a signal at the candle open. Recoverable ledger
    /// rejections (insufficient cash or margin) skip the signal; state
    /// mismatches between the signal and the position are no-ops.
    fn apply_signal(&mut self, signal: Signal, candle: &Candle) -> EngineResult<()> {
        let price = candle.open;
        let timestamp = candle.open_time;

        match signal {
            Signal::OpenLong {
                quantity,
                stop_loss,
                take_profit,
            } => self.open_position(
                Direction::Long,
                quantity,
                stop_loss,
                take_profit,
                price,
                timestamp,
            ),
            Signal::OpenShort {
                quantity,
                stop_loss,
                take_profit,
            } => self.open_position(
                Direction::Short,
                quantity,
                stop_loss,
                take_profit,
                price,
                timestamp,
            ),
            Signal::AddLong { quantity } => {
                self.scale_into(Direction::Long, quantity, price, timestamp)
            }
            Signal::AddShort { quantity } => {
                self.scale_into(Direction::Short, quantity, price, timestamp)
            }
            Signal::UpdateMargin { amount } => {
                if !self.ledger.is_open() {
                    return Ok(());
                }
                match self.ledger.update_margin(amount) {
                    Ok(()) => Ok(()),
                    Err(error) if error.is_recoverable() => Ok(()),
                    Err(error) => Err(error),
                }
            }
            Signal::UpdateLevels {
                stop_loss,
                take_profit,
            } => {
                if !self.ledger.is_open() {
                    return Ok(());
                }
                self.ledger.update_levels(stop_loss, take_profit)
            }
            Signal::Close => {
                if !self.ledger.is_open() {
                    return Ok(());
                }
                self.close_position(price, timestamp)
            }
        }
    }

    fn open_position(
        &mut self,
        direction: Direction,
        quantity: Option<Decimal>,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
        price: Decimal,
        timestamp: u64,
    ) -> EngineResult<()> {
        if self.ledger.is_open() {
            return Ok(());
        }

        let estimate = self
            .simulator
            .estimate_fill_price(price, direction.is_long())?;
        let equity = self.ledger.equity(price);
        let quantity = match quantity {
            Some(quantity) => quantity,
            None => self
                .config
                .sizing
                .quantity(estimate, equity, self.config.leverage),
        };
        if quantity <= Decimal::ZERO {
            return Ok(());
        }

        // Pre-flight sizing check at the estimated fill price: skip
        // entries the cash balance cannot carry.
        let estimated_notional = estimate * quantity;
        let estimated_margin = estimated_notional / self.config.leverage;
        let estimated_commission = self
            .simulator
            .commission_model()
            .commission(estimated_notional);
        if estimated_margin + estimated_commission > self.ledger.cash() {
            return Ok(());
        }

        let fill = match direction {
            Direction::Long => self
                .simulator
                .simulate_long_entry(quantity, price, timestamp)?,
            Direction::Short => self
                .simulator
                .simulate_short_entry(quantity, price, timestamp)?,
        };

        match self
            .ledger
            .open(direction, &fill, self.config.leverage, stop_loss, take_profit)
        {
            Ok(_) => Ok(()),
            Err(error) if error.is_recoverable() => Ok(()),
            Err(error) => Err(error),
        }
    }

    fn scale_into(
        &mut self,
        direction: Direction,
        quantity: Decimal,
        price: Decimal,
        timestamp: u64,
    ) -> EngineResult<()> {
        let Some(position) = self.ledger.position() else {
            return Ok(());
        };
        if position.direction != direction || quantity <= Decimal::ZERO {
            return Ok(());
        }

        let fill = match direction {
            Direction::Long => self
                .simulator
                .simulate_long_entry(quantity, price, timestamp)?,
            Direction::Short => self
                .simulator
                .simulate_short_entry(quantity, price, timestamp)?,
        };

        match self.ledger.scale_in(&fill) {
            Ok(_) => Ok(()),
            Err(error) if error.is_recoverable() => Ok(()),
            Err(error) => Err(error),
        }
    }

    fn close_position(&mut self, price: Decimal, timestamp: u64) -> EngineResult<()> {
        let Some(position) = self.ledger.position() else {
            return Ok(());
        };
        let quantity = position.quantity;
        let direction = position.direction;

        let fill = self.exit_fill(direction, quantity, price, timestamp)?;
        let trade = self.ledger.close(&fill, TradeExit::Signal)?;
        self.trades.push(trade);
        Ok(())
    }

    /// Checks the stop/target ladder against the candle extremes. When
    /// both levels lie inside one candle the stop-loss wins (pessimistic
    /// tie-break). Stops exit market-style at the level; targets fill
    /// limit-style exactly at the level.
    fn check_protective_levels(&mut self, candle: &Candle) -> EngineResult<()> {
        let Some(position) = self.ledger.position() else {
            return Ok(());
        };
        let direction = position.direction;
        let quantity = position.quantity;
        let stop_loss = position.stop_loss;
        let take_profit = position.take_profit;

        let stop_hit = stop_loss.is_some_and(|sl| match direction {
            Direction::Long => candle.low <= sl,
            Direction::Short => candle.high >= sl,
        });
        if stop_hit {
            if let Some(sl) = stop_loss {
                let fill = self.exit_fill(direction, quantity, sl, candle.close_time)?;
                let trade = self.ledger.close(&fill, TradeExit::StopLoss)?;
                self.trades.push(trade);
            }
            return Ok(());
        }

        let target_hit = take_profit.is_some_and(|tp| match direction {
            Direction::Long => candle.high >= tp,
            Direction::Short => candle.low <= tp,
        });
        if target_hit {
            if let Some(tp) = take_profit {
                let fill = self
                    .simulator
                    .fill_at_level(quantity, tp, candle.close_time)?;
                let trade = self.ledger.close(&fill, TradeExit::TakeProfit)?;
                self.trades.push(trade);
            }
        }

        Ok(())
    }

    fn exit_fill(
        &self,
        direction: Direction,
        quantity: Decimal,
        price: Decimal,
        timestamp: u64,
    ) -> EngineResult<Fill> {
        match direction {
            Direction::Long => self.simulator.simulate_long_exit(quantity, price, timestamp),
            Direction::Short => self
                .simulator
                .simulate_short_exit(quantity, price, timestamp),
        }
    }

    fn record_equity(&mut self, candle: &Candle) {
        let mark = candle.close;
        let equity = self.ledger.equity(mark);

        if equity > self.peak_equity {
            self.peak_equity = equity;
        }

        let drawdown = (self.peak_equity - equity).max(Decimal::ZERO);
        let drawdown_pct = if self.peak_equity > Decimal::ZERO {
            decimal_to_f64(drawdown / self.peak_equity * Decimal::ONE_HUNDRED).max(0.0)
        } else {
            0.0
        };
        let return_pct = decimal_to_f64(
            (equity - self.config.initial_capital) / self.config.initial_capital
                * Decimal::ONE_HUNDRED,
        );

        let unrealized_pnl = self.ledger.unrealized_pnl(mark);
        let position_value = self
            .ledger
            .position()
            .map_or(Decimal::ZERO, |p| p.isolated_margin + unrealized_pnl);

        self.equity_curve.push(EquityCurvePoint {
            timestamp: candle.close_time,
            equity,
            cash: self.ledger.cash(),
            position_value,
            unrealized_pnl,
            drawdown,
            drawdown_pct,
            return_pct,
        });
    }

    fn report_progress<F: FnMut(f64)>(&self, processed: usize, total: usize, progress: &mut F) {
        if processed % self.config.progress_interval == 0 || processed == total {
            progress(processed as f64 / total as f64 * 100.0);
        }
    }

    fn build_result(&self) -> BacktestResult {
        let final_equity = self
            .equity_curve
            .last()
            .map_or(self.config.initial_capital, |point| point.equity);

        let start_time = self.series.candle(0).open_time;
        let end_time = self
            .equity_curve
            .last()
            .map_or(start_time, |point| point.timestamp);
        let duration_days = (end_time - start_time) as f64 / 86_400_000.0;

        let performance = MetricsCalculator::new(self.config.risk_free_rate).calculate(
            &self.trades,
            &self.equity_curve,
            self.config.initial_capital,
            duration_days,
        );

        BacktestResult {
            symbol: self.config.symbol.clone(),
            state: self.state,
            error_message: self.error_message.clone(),
            trades: self.trades.clone(),
            equity_curve: self.equity_curve.clone(),
            initial_capital: self.config.initial_capital,
            final_equity,
            peak_equity: self.peak_equity,
            candles_processed: self.equity_curve.len(),
            start_time,
            end_time,
            performance,
        }
    }
}

fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}
