//! Liquidation Example
//!
//! Opens a 25x long into a crash and walks through the forced close:
//! the liquidation price, the full-margin loss, and how the equity curve
//! records the event.
//!
//! Run with: `cargo run --example liquidation_run`

use perp_backtest_rs::Decimal;
use perp_backtest_rs::backtest::{BacktestConfig, BacktestEngine};
use perp_backtest_rs::dec;
use perp_backtest_rs::position::Position;
use perp_backtest_rs::strategy::{MultiTimeframeContext, Strategy};
use perp_backtest_rs::types::{Candle, CandleSeries, EngineResult, Signal, Timeframe};

const STEP: u64 = 60_000;

/// Opens one highly levered long on the first candle and tops up margin
/// once the position moves against it.
struct Overleveraged {
    topped_up: bool,
}

impl Strategy for Overleveraged {
    fn calculate_signal(
        &mut self,
        candle: &Candle,
        index: usize,
        position: Option<&Position>,
        _context: &MultiTimeframeContext,
    ) -> EngineResult<Option<Signal>> {
        if index == 0 && position.is_none() {
            return Ok(Some(Signal::OpenLong {
                quantity: Some(dec!(2)),
                stop_loss: None,
                take_profit: None,
            }));
        }

        // One margin top-up when under water buys a little more room.
        if let Some(p) = position {
            if !self.topped_up && candle.close < p.avg_entry_price * dec!(0.985) {
                self.topped_up = true;
                return Ok(Some(Signal::UpdateMargin { amount: dec!(500) }));
            }
        }
        Ok(None)
    }
}

/// A slow bleed into a gap down.
fn crash_series() -> CandleSeries {
    let closes: [i64; 12] = [
        10_000_00, 9_990_00, 9_950_00, 9_900_00, 9_850_00, 9_820_00, 9_700_00, 9_500_00,
        9_100_00, 8_900_00, 8_850_00, 8_800_00,
    ];

    let mut candles = Vec::new();
    let mut open = 10_000_00i64;
    for (i, close) in closes.iter().enumerate() {
        let open_d = Decimal::new(open, 2);
        let close_d = Decimal::new(*close, 2);
        candles.push(Candle::new(
            "ETH-USDT",
            i as u64 * STEP,
            (i as u64 + 1) * STEP,
            open_d,
            open_d.max(close_d) + dec!(5),
            open_d.min(close_d) - dec!(5),
            close_d,
            dec!(25),
        ));
        open = *close;
    }

    CandleSeries::new("ETH-USDT", Timeframe::M1, candles).expect("demo series is valid")
}

fn main() {
    println!("=== Liquidation Example ===\n");

    let config = BacktestConfig::new("ETH-USDT", dec!(5_000))
        .expect("valid config")
        .with_leverage(dec!(25))
        .with_maintenance_margin_rate(dec!(0.005));

    let strategy = Overleveraged { topped_up: false };
    let mut engine = BacktestEngine::new(config, Box::new(strategy), crash_series())
        .expect("engine construction");
    let result = engine.run().expect("run");

    println!("Run state: {}", result.state);
    println!("Initial capital: {}", result.initial_capital);
    println!("Final equity:    {}", result.final_equity);

    for trade in &result.trades {
        println!("\n--- Trade ---");
        println!("Direction:   {}", trade.direction);
        println!("Entry:       {} @ {}", trade.quantity, trade.avg_entry_price);
        println!("Exit:        {} ({:?})", trade.exit_price, trade.exit_reason);
        println!("Gross PnL:   {}", trade.gross_pnl);
        println!("Net PnL:     {}  (full margin loss)", trade.net_pnl);
    }

    println!("\n--- Equity curve tail ---");
    for point in result.equity_curve.iter().rev().take(4).rev() {
        println!(
            "  t={:>7}  equity={}  drawdown={:.2}%",
            point.timestamp, point.equity, point.drawdown_pct
        );
    }

    println!("\nMax drawdown: {:.2}%", result.performance.max_drawdown_pct);
    println!("\n=== Example Complete ===");
}
