//! End-to-end engine tests over synthetic price walks.

use std::sync::{Arc, Mutex};

use perp_backtest_rs::Decimal;
use perp_backtest_rs::analytics::PerformanceReport;
use perp_backtest_rs::backtest::{BacktestConfig, BacktestEngine, RunState, SizingPolicy};
use perp_backtest_rs::dec;
use perp_backtest_rs::position::Position;
use perp_backtest_rs::simulation::{CommissionModel, CommissionTier, SlippageModel};
use perp_backtest_rs::strategy::{MultiTimeframeContext, Strategy};
use perp_backtest_rs::types::{Candle, CandleSeries, EngineResult, Signal, Timeframe};

const STEP: u64 = 60_000;

/// Deterministic pseudo-random price walk in cents.
fn walk_prices(seed: u64, count: usize) -> Vec<i64> {
    let mut state = seed;
    let mut price = 1_000_00i64;
    let mut prices = Vec::with_capacity(count + 1);
    prices.push(price);

    for _ in 0..count {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let step = (state >> 33) as i64 % 201 - 100;
        price = (price + step).max(100_00);
        prices.push(price);
    }

    prices
}

fn walk_series(seed: u64, count: usize) -> CandleSeries {
    let prices = walk_prices(seed, count);
    let candles = prices
        .windows(2)
        .enumerate()
        .map(|(i, pair)| {
            let open = Decimal::new(pair[0], 2);
            let close = Decimal::new(pair[1], 2);
            let high = open.max(close) + dec!(0.75);
            let low = open.min(close) - dec!(0.75);
            Candle::new(
                "BTC-USDT",
                i as u64 * STEP,
                (i as u64 + 1) * STEP,
                open,
                high,
                low,
                close,
                dec!(3.0),
            )
        })
        .collect();
    CandleSeries::new("BTC-USDT", Timeframe::M1, candles).unwrap()
}

fn config() -> BacktestConfig {
    BacktestConfig::new("BTC-USDT", dec!(50000))
        .unwrap()
        .with_leverage(dec!(5))
        .with_slippage(SlippageModel::Percentage(dec!(0.02)))
        .with_commission(CommissionModel::Tiered(vec![
            CommissionTier::new(dec!(0), dec!(0.0006)),
            CommissionTier::new(dec!(25000), dec!(0.0004)),
        ]))
        .with_sizing(SizingPolicy::EquityFraction(dec!(0.2)))
        .with_progress_interval(64)
}

/// Opens on bullish candles at a fixed cadence, exits after a holding
/// period; carries its own state across calls.
struct Momentum {
    entered_at: Option<usize>,
}

impl Momentum {
    fn new() -> Self {
        Self { entered_at: None }
    }
}

impl Strategy for Momentum {
    fn calculate_signal(
        &mut self,
        candle: &Candle,
        index: usize,
        position: Option<&Position>,
        _context: &MultiTimeframeContext,
    ) -> EngineResult<Option<Signal>> {
        match position {
            None => {
                if candle.is_bullish() && index % 7 == 3 {
                    self.entered_at = Some(index);
                    return Ok(Some(Signal::OpenLong {
                        quantity: None,
                        stop_loss: Some(candle.close * dec!(0.97)),
                        take_profit: Some(candle.close * dec!(1.05)),
                    }));
                }
            }
            Some(_) => {
                if let Some(entered) = self.entered_at
                    && index - entered >= 12
                {
                    self.entered_at = None;
                    return Ok(Some(Signal::Close));
                }
            }
        }
        Ok(None)
    }
}

#[test]
fn identical_inputs_produce_identical_runs() {
    let run = || {
        let mut engine = BacktestEngine::new(
            config(),
            Box::new(Momentum::new()),
            walk_series(42, 500),
        )
        .unwrap();
        engine.run().unwrap()
    };

    let first = run();
    let second = run();

    assert_eq!(first.state, RunState::Completed);
    assert_eq!(first.trades, second.trades);
    assert_eq!(first.equity_curve, second.equity_curve);
    assert_eq!(first.final_equity, second.final_equity);
    assert_eq!(first.peak_equity, second.peak_equity);
    assert!(!first.trades.is_empty(), "walk should produce trades");
}

/// Records the close time of every candle it signals an entry on, so the
/// test can compare fill times against signal-data times.
struct LoggingEntries {
    cadence: usize,
    signal_closes: Arc<Mutex<Vec<u64>>>,
}

impl Strategy for LoggingEntries {
    fn calculate_signal(
        &mut self,
        candle: &Candle,
        index: usize,
        position: Option<&Position>,
        _context: &MultiTimeframeContext,
    ) -> EngineResult<Option<Signal>> {
        if position.is_none() && index % self.cadence == 0 {
            self.signal_closes.lock().unwrap().push(candle.close_time);
            return Ok(Some(Signal::OpenLong {
                quantity: Some(dec!(0.5)),
                stop_loss: None,
                take_profit: None,
            }));
        }
        if position.is_some() && index % self.cadence == self.cadence / 2 {
            return Ok(Some(Signal::Close));
        }
        Ok(None)
    }
}

#[test]
fn fills_never_precede_the_signal_candle_close() {
    let signal_closes = Arc::new(Mutex::new(Vec::new()));
    let strategy = LoggingEntries {
        cadence: 8,
        signal_closes: Arc::clone(&signal_closes),
    };

    let mut engine =
        BacktestEngine::new(config(), Box::new(strategy), walk_series(7, 200)).unwrap();
    let result = engine.run().unwrap();
    assert!(!result.trades.is_empty());

    let closes = signal_closes.lock().unwrap();
    assert_eq!(result.trades.len(), closes.len());
    for (trade, signal_close) in result.trades.iter().zip(closes.iter()) {
        assert!(
            trade.entry_time >= *signal_close,
            "fill at {} precedes signal data close {}",
            trade.entry_time,
            signal_close
        );
    }
}

#[test]
fn equity_points_satisfy_the_accounting_identity() {
    let mut engine = BacktestEngine::new(
        config(),
        Box::new(Momentum::new()),
        walk_series(99, 400),
    )
    .unwrap();
    let result = engine.run().unwrap();

    for point in &result.equity_curve {
        // equity = cash + (isolated margin + unrealized), drawdown >= 0.
        assert_eq!(point.equity, point.cash + point.position_value);
        assert!(point.drawdown >= Decimal::ZERO);
        assert!(point.drawdown_pct >= 0.0);
    }
}

#[test]
fn report_is_consistent_with_the_trade_list() {
    let mut engine = BacktestEngine::new(
        config(),
        Box::new(Momentum::new()),
        walk_series(314, 600),
    )
    .unwrap();
    let result = engine.run().unwrap();
    let report: &PerformanceReport = &result.performance;

    assert_eq!(report.total_trades, result.trades.len());
    assert_eq!(
        report.winning_trades + report.losing_trades,
        report.total_trades
    );

    let wins = result.trades.iter().filter(|t| t.is_win()).count();
    assert_eq!(report.winning_trades, wins);

    let gross_profit: Decimal = result
        .trades
        .iter()
        .filter(|t| t.is_win())
        .map(|t| t.net_pnl)
        .sum();
    assert_eq!(report.gross_profit, gross_profit);

    let expected_win_rate = wins as f64 / report.total_trades as f64 * 100.0;
    assert!((report.win_rate - expected_win_rate).abs() < 1e-9);

    assert_eq!(report.total_return, result.final_equity - result.initial_capital);
}

/// Trades only when an hourly candle is visible in the context.
struct NeedsHourly {
    entered_at: Option<usize>,
    traded: bool,
}

impl Strategy for NeedsHourly {
    fn calculate_signal(
        &mut self,
        _candle: &Candle,
        index: usize,
        position: Option<&Position>,
        context: &MultiTimeframeContext,
    ) -> EngineResult<Option<Signal>> {
        if let (Some(entered), Some(_)) = (self.entered_at, position) {
            if index - entered >= 5 {
                self.entered_at = None;
                return Ok(Some(Signal::Close));
            }
            return Ok(None);
        }

        let Some(hourly) = context.candle(Timeframe::H1, index) else {
            return Ok(None);
        };
        if position.is_none() && !self.traded && hourly.is_bullish() {
            self.traded = true;
            self.entered_at = Some(index);
            return Ok(Some(Signal::OpenLong {
                quantity: Some(dec!(0.5)),
                stop_loss: None,
                take_profit: None,
            }));
        }
        Ok(None)
    }
}

#[test]
fn higher_timeframe_context_gates_trading() {
    let base = walk_series(5, 300);
    // Build a bullish hourly series covering the same span.
    let hourly_candles: Vec<Candle> = (0..5u64)
        .map(|i| {
            Candle::new(
                "BTC-USDT",
                i * 3_600_000,
                (i + 1) * 3_600_000,
                dec!(995),
                dec!(1020),
                dec!(990),
                dec!(1010),
                dec!(100),
            )
        })
        .collect();
    let hourly = CandleSeries::new("BTC-USDT", Timeframe::H1, hourly_candles).unwrap();

    let mut engine = BacktestEngine::new(
        config(),
        Box::new(NeedsHourly {
            entered_at: None,
            traded: false,
        }),
        base,
    )
    .unwrap()
    .with_higher_timeframes(vec![hourly]);
    let result = engine.run().unwrap();

    assert_eq!(result.state, RunState::Completed);
    assert_eq!(result.trades.len(), 1);
    // The first hourly candle closes at minute 60; no entry can exist
    // before candle 61's open.
    assert!(result.trades[0].entry_time >= 61 * STEP);
}

#[test]
fn cancellation_from_the_progress_callback_stops_the_run() {
    let mut engine = BacktestEngine::new(
        config().with_progress_interval(50),
        Box::new(Momentum::new()),
        walk_series(11, 400),
    )
    .unwrap();
    let token = engine.cancel_token();

    let result = engine
        .run_with_progress(|pct| {
            if pct >= 25.0 {
                token.cancel();
            }
        })
        .unwrap();

    assert_eq!(result.state, RunState::Cancelled);
    assert!(result.candles_processed < 400);
    assert!(result.candles_processed >= 100);
    // Partial equity curve is retained for diagnostics.
    assert_eq!(result.equity_curve.len(), result.candles_processed);
}

#[test]
fn leveraged_crash_ends_in_liquidation() {
    // A 20x long through a 10% gap down cannot survive.
    let mut candles = vec![
        Candle::new("BTC-USDT", 0, STEP, dec!(1000), dec!(1005), dec!(995), dec!(1000), dec!(1)),
        Candle::new("BTC-USDT", STEP, 2 * STEP, dec!(1000), dec!(1005), dec!(995), dec!(1000), dec!(1)),
    ];
    candles.push(Candle::new(
        "BTC-USDT",
        2 * STEP,
        3 * STEP,
        dec!(980),
        dec!(985),
        dec!(900),
        dec!(905),
        dec!(1),
    ));
    candles.push(Candle::new(
        "BTC-USDT",
        3 * STEP,
        4 * STEP,
        dec!(905),
        dec!(910),
        dec!(900),
        dec!(905),
        dec!(1),
    ));
    let series = CandleSeries::new("BTC-USDT", Timeframe::M1, candles).unwrap();

    struct OpenOnce;
    impl Strategy for OpenOnce {
        fn calculate_signal(
            &mut self,
            _candle: &Candle,
            index: usize,
            position: Option<&Position>,
            _context: &MultiTimeframeContext,
        ) -> EngineResult<Option<Signal>> {
            if index == 0 && position.is_none() {
                return Ok(Some(Signal::OpenLong {
                    quantity: Some(dec!(1)),
                    stop_loss: None,
                    take_profit: None,
                }));
            }
            Ok(None)
        }
    }

    let config = BacktestConfig::new("BTC-USDT", dec!(10000))
        .unwrap()
        .with_leverage(dec!(20));
    let mut engine = BacktestEngine::new(config, Box::new(OpenOnce), series).unwrap();
    let result = engine.run().unwrap();

    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert!(trade.is_liquidation());
    // 1000 * 1.005 - 50 = 955: inside candle 2's range.
    assert_eq!(trade.exit_price, dec!(955));
    assert_eq!(trade.net_pnl, dec!(-50));
    // The margin is gone but the rest of the balance survives.
    assert_eq!(result.final_equity, dec!(9950));
}
