//! Performance analytics for finished runs.
//!
//! [`MetricsCalculator`] is a pure function of the closed trade list and
//! the equity curve: it never touches engine state, and a run with no
//! trades produces an all-zero report rather than an error.
//!
//! Money aggregates are [`Decimal`]; ratios and percentages are `f64`
//! because `+∞` is a required representable value (profit factor with no
//! losses, Sortino with no downside).

use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;

use crate::Decimal;
use crate::backtest::results::EquityCurvePoint;
use crate::position::ClosedTrade;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const MS_PER_DAY: u64 = 86_400_000;
const TRADING_DAYS_PER_YEAR: f64 = 365.0;

/// Final analytics of one run.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PerformanceReport {
    /// Number of closed trades.
    pub total_trades: usize,
    /// Trades with positive net PnL.
    pub winning_trades: usize,
    /// Trades with non-positive net PnL.
    pub losing_trades: usize,
    /// Winning trades / total trades × 100.
    pub win_rate: f64,
    /// Gross profit / gross loss; `+∞` with profits and no losses.
    pub profit_factor: f64,
    /// Average win / |average loss|; `+∞` with wins and no losses.
    pub payoff_ratio: f64,
    /// Mean net PnL per trade.
    pub expectancy: f64,
    /// Sum of winning trades' net PnL.
    pub gross_profit: Decimal,
    /// Magnitude of losing trades' summed net PnL.
    pub gross_loss: Decimal,
    /// Mean winning trade net PnL.
    pub average_win: Decimal,
    /// Mean losing trade net PnL magnitude.
    pub average_loss: Decimal,
    /// Best single trade net PnL.
    pub largest_win: Decimal,
    /// Worst single trade net PnL (as a magnitude).
    pub largest_loss: Decimal,
    /// Final equity minus initial capital.
    pub total_return: Decimal,
    /// Total return as a percentage of initial capital.
    pub total_return_pct: f64,
    /// Compound annualized return percentage.
    pub annualized_return_pct: f64,
    /// Annualized excess return over total volatility.
    pub sharpe_ratio: f64,
    /// Annualized excess return over downside volatility; `+∞` with
    /// positive mean return and no negative days.
    pub sortino_ratio: f64,
    /// Annualized return over max drawdown.
    pub calmar_ratio: f64,
    /// Largest peak-to-trough equity decline, percent.
    pub max_drawdown_pct: f64,
    /// Longest span the curve stayed below a prior peak, in days.
    pub max_drawdown_duration_days: f64,
    /// Population standard deviation of daily returns.
    pub volatility: f64,
    /// Longest run of consecutive winning trades.
    pub max_consecutive_wins: u32,
    /// Longest run of consecutive losing trades.
    pub max_consecutive_losses: u32,
    /// Commission paid across all trades.
    pub total_commission: Decimal,
    /// Slippage cost accrued across all trades.
    pub total_slippage_cost: Decimal,
}

/// Computes a [`PerformanceReport`] from a finished run.
///
/// # Example
///
/// ```rust
/// use perp_backtest_rs::analytics::MetricsCalculator;
/// use perp_backtest_rs::dec;
///
/// let calculator = MetricsCalculator::new(0.0);
/// let report = calculator.calculate(&[], &[], dec!(10000.0), 0.0);
/// assert_eq!(report.total_trades, 0);
/// assert_eq!(report.win_rate, 0.0);
/// assert_eq!(report.profit_factor, 0.0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsCalculator {
    risk_free_rate: f64,
}

impl MetricsCalculator {
    /// Creates a calculator with an annual risk-free rate.
    #[must_use]
    pub fn new(risk_free_rate: f64) -> Self {
        Self { risk_free_rate }
    }

    /// Computes the report. Every degenerate input (no trades, flat
    /// equity, single-day run) yields zeros or `+∞` per the formula
    /// definitions, never an error.
    #[must_use]
    pub fn calculate(
        &self,
        trades: &[ClosedTrade],
        equity_curve: &[EquityCurvePoint],
        initial_capital: Decimal,
        duration_days: f64,
    ) -> PerformanceReport {
        let mut report = PerformanceReport::default();

        self.trade_metrics(trades, &mut report);
        self.equity_metrics(equity_curve, initial_capital, duration_days, &mut report);

        report
    }

    fn trade_metrics(&self, trades: &[ClosedTrade], report: &mut PerformanceReport) {
        report.total_trades = trades.len();
        if trades.is_empty() {
            return;
        }

        let mut net_total = Decimal::ZERO;
        let mut win_streak = 0u32;
        let mut loss_streak = 0u32;

        for trade in trades {
            net_total += trade.net_pnl;
            report.total_commission += trade.commission;
            report.total_slippage_cost += trade.slippage_cost;

            if trade.is_win() {
                report.winning_trades += 1;
                report.gross_profit += trade.net_pnl;
                report.largest_win = report.largest_win.max(trade.net_pnl);
                win_streak += 1;
                loss_streak = 0;
            } else {
                report.losing_trades += 1;
                report.gross_loss += -trade.net_pnl;
                report.largest_loss = report.largest_loss.max(-trade.net_pnl);
                loss_streak += 1;
                win_streak = 0;
            }

            report.max_consecutive_wins = report.max_consecutive_wins.max(win_streak);
            report.max_consecutive_losses = report.max_consecutive_losses.max(loss_streak);
        }

        let total = report.total_trades as f64;
        report.win_rate = report.winning_trades as f64 / total * 100.0;
        report.expectancy = decimal_to_f64(net_total) / total;

        if report.winning_trades > 0 {
            report.average_win = report.gross_profit / Decimal::from(report.winning_trades as u64);
        }
        if report.losing_trades > 0 {
            report.average_loss = report.gross_loss / Decimal::from(report.losing_trades as u64);
        }

        let gross_profit = decimal_to_f64(report.gross_profit);
        let gross_loss = decimal_to_f64(report.gross_loss);
        report.profit_factor = if gross_profit == 0.0 {
            0.0
        } else if gross_loss == 0.0 {
            f64::INFINITY
        } else {
            gross_profit / gross_loss
        };

        let average_win = decimal_to_f64(report.average_win);
        let average_loss = decimal_to_f64(report.average_loss);
        report.payoff_ratio = if average_win == 0.0 {
            0.0
        } else if average_loss == 0.0 {
            f64::INFINITY
        } else {
            average_win / average_loss
        };
    }

    fn equity_metrics(
        &self,
        equity_curve: &[EquityCurvePoint],
        initial_capital: Decimal,
        duration_days: f64,
        report: &mut PerformanceReport,
    ) {
        let final_equity = equity_curve
            .last()
            .map_or(initial_capital, |point| point.equity);
        report.total_return = final_equity - initial_capital;

        let initial = decimal_to_f64(initial_capital);
        let final_f = decimal_to_f64(final_equity);
        if initial > 0.0 {
            report.total_return_pct = (final_f - initial) / initial * 100.0;
        }

        if duration_days > 0.0 && initial > 0.0 && final_f > 0.0 {
            let growth = final_f / initial;
            report.annualized_return_pct =
                (growth.powf(TRADING_DAYS_PER_YEAR / duration_days) - 1.0) * 100.0;
        }

        let (max_dd_pct, max_dd_duration_ms) = drawdown_stats(equity_curve);
        report.max_drawdown_pct = max_dd_pct;
        report.max_drawdown_duration_days = max_dd_duration_ms as f64 / MS_PER_DAY as f64;

        let returns = daily_returns(equity_curve);
        let mean_return = mean(&returns);
        let std = population_std(&returns, mean_return);
        report.volatility = std;

        let daily_risk_free = self.risk_free_rate / TRADING_DAYS_PER_YEAR;
        let annualizer = TRADING_DAYS_PER_YEAR.sqrt();

        report.sharpe_ratio = if std == 0.0 {
            0.0
        } else {
            (mean_return - daily_risk_free) / std * annualizer
        };

        let negative: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
        report.sortino_ratio = if negative.is_empty() {
            if mean_return > 0.0 { f64::INFINITY } else { 0.0 }
        } else {
            let downside_mean = mean(&negative);
            let downside_std = population_std(&negative, downside_mean);
            if downside_std == 0.0 {
                0.0
            } else {
                (mean_return - daily_risk_free) / downside_std * annualizer
            }
        };

        report.calmar_ratio = if report.max_drawdown_pct == 0.0 {
            0.0
        } else {
            report.annualized_return_pct / report.max_drawdown_pct
        };
    }
}

/// Largest peak-to-trough decline (percent) and the longest time the
/// curve stayed below a prior peak (milliseconds).
fn drawdown_stats(equity_curve: &[EquityCurvePoint]) -> (f64, u64) {
    let mut max_dd_pct = 0.0f64;
    let mut max_duration = 0u64;

    let mut peak = f64::MIN;
    let mut peak_time = 0u64;

    for point in equity_curve {
        let equity = decimal_to_f64(point.equity);
        if equity >= peak {
            peak = equity;
            peak_time = point.timestamp;
            continue;
        }

        if peak > 0.0 {
            let dd = (peak - equity) / peak * 100.0;
            max_dd_pct = max_dd_pct.max(dd);
        }
        max_duration = max_duration.max(point.timestamp - peak_time);
    }

    (max_dd_pct, max_duration)
}

/// Daily returns from the equity curve: points are bucketed into UTC
/// days, each day is represented by its last equity value, and returns
/// are taken between consecutive represented days.
fn daily_returns(equity_curve: &[EquityCurvePoint]) -> Vec<f64> {
    let mut by_day: BTreeMap<u64, f64> = BTreeMap::new();
    for point in equity_curve {
        by_day.insert(point.timestamp / MS_PER_DAY, decimal_to_f64(point.equity));
    }

    by_day
        .values()
        .collect::<Vec<_>>()
        .windows(2)
        .filter_map(|pair| {
            let (prev, next) = (*pair[0], *pair[1]);
            if prev > 0.0 { Some((next - prev) / prev) } else { None }
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divide by n, not n − 1).
fn population_std(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values
        .iter()
        .map(|value| {
            let diff = value - mean;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}
