//! Simple Backtest Example
//!
//! Runs a small momentum strategy over a synthetic one-minute candle
//! series and prints the resulting trades and performance report.
//!
//! Demonstrates:
//! - Building a validated `CandleSeries`
//! - Configuring leverage, slippage, commission, and sizing
//! - Implementing the `Strategy` trait with instance-owned state
//! - Progress reporting and reading the `PerformanceReport`
//!
//! Run with: `cargo run --example simple_backtest`

use perp_backtest_rs::Decimal;
use perp_backtest_rs::backtest::{BacktestConfig, BacktestEngine, SizingPolicy};
use perp_backtest_rs::dec;
use perp_backtest_rs::position::Position;
use perp_backtest_rs::simulation::{CommissionModel, CommissionTier, SlippageModel};
use perp_backtest_rs::strategy::{MultiTimeframeContext, Strategy};
use perp_backtest_rs::types::{Candle, CandleSeries, EngineResult, Signal, Timeframe};

const STEP: u64 = 60_000;

/// Buys pullbacks in an uptrend, exits on a fixed profit ladder.
struct PullbackBuyer {
    entered_at: Option<usize>,
}

impl Strategy for PullbackBuyer {
    fn calculate_signal(
        &mut self,
        candle: &Candle,
        index: usize,
        position: Option<&Position>,
        _context: &MultiTimeframeContext,
    ) -> EngineResult<Option<Signal>> {
        if position.is_none() {
            // Enter on a red candle every 20 minutes.
            if !candle.is_bullish() && index % 20 == 10 {
                self.entered_at = Some(index);
                return Ok(Some(Signal::OpenLong {
                    quantity: None,
                    stop_loss: Some(candle.close * dec!(0.98)),
                    take_profit: Some(candle.close * dec!(1.03)),
                }));
            }
            return Ok(None);
        }

        // Time-based exit if neither level was hit.
        if let Some(entered) = self.entered_at {
            if index - entered >= 40 {
                self.entered_at = None;
                return Ok(Some(Signal::Close));
            }
        }
        Ok(None)
    }
}

/// A gently rising price path with a repeating intraday wave.
fn demo_series() -> CandleSeries {
    let mut candles = Vec::new();
    let mut last_close = 30_000_00i64;

    for i in 0..1_440u64 {
        // Drift up one tick per candle, wave +/- 40 ticks over 2 hours.
        let wave = [
            0, 8, 15, 21, 25, 27, 27, 25, 21, 15, 8, 0, -8, -15, -21, -25, -27, -27, -25, -21,
            -15, -8, 0, 4,
        ][(i % 24) as usize];
        let open = last_close;
        let close = 30_000_00 + i as i64 + wave * 40;
        last_close = close;

        let open = Decimal::new(open, 2);
        let close = Decimal::new(close, 2);
        candles.push(Candle::new(
            "BTC-USDT",
            i * STEP,
            (i + 1) * STEP,
            open,
            open.max(close) + dec!(6),
            open.min(close) - dec!(6),
            close,
            dec!(10),
        ));
    }

    CandleSeries::new("BTC-USDT", Timeframe::M1, candles).expect("demo series is valid")
}

fn main() {
    println!("=== Simple Backtest Example ===\n");

    let config = BacktestConfig::new("BTC-USDT", dec!(100_000))
        .expect("valid config")
        .with_leverage(dec!(5))
        .with_slippage(SlippageModel::Percentage(dec!(0.02)))
        .with_commission(CommissionModel::Tiered(vec![
            CommissionTier::new(dec!(0), dec!(0.0005)),
            CommissionTier::new(dec!(50_000), dec!(0.0004)),
        ]))
        .with_sizing(SizingPolicy::EquityFraction(dec!(0.1)))
        .with_progress_interval(360);

    let strategy = PullbackBuyer { entered_at: None };
    let mut engine = BacktestEngine::new(config, Box::new(strategy), demo_series())
        .expect("engine construction");

    let result = engine
        .run_with_progress(|pct| println!("  progress: {:.0}%", pct))
        .expect("run");

    println!("\nRun state: {}", result.state);
    println!("Candles processed: {}", result.candles_processed);
    println!("Trades: {}", result.trades.len());
    for trade in result.trades.iter().take(5) {
        println!(
            "  {} {} @ {} -> {} net {} ({:?})",
            trade.direction,
            trade.quantity,
            trade.avg_entry_price,
            trade.exit_price,
            trade.net_pnl,
            trade.exit_reason,
        );
    }

    let report = &result.performance;
    println!("\n--- Performance ---");
    println!("Final equity:    {}", result.final_equity);
    println!("Total return:    {:.2}%", report.total_return_pct);
    println!("Win rate:        {:.1}%", report.win_rate);
    println!("Profit factor:   {:.2}", report.profit_factor);
    println!("Payoff ratio:    {:.2}", report.payoff_ratio);
    println!("Sharpe ratio:    {:.2}", report.sharpe_ratio);
    println!("Sortino ratio:   {:.2}", report.sortino_ratio);
    println!("Max drawdown:    {:.2}%", report.max_drawdown_pct);
    println!("Commission paid: {}", report.total_commission);

    println!("\n=== Example Complete ===");
}
