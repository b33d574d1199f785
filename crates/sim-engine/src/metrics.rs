//! Risk and performance metrics over a realized return series.
//!
//! Degenerate inputs never produce NaN or infinity: zero variance maps to
//! a zero Sharpe/volatility, an empty trade log to a zero win rate.

use sim_core::math::{mean, sample_std_dev};

use crate::models::{RunSummary, SimConfig, SimulationContext, TradeAction, TradeRecord};

const ANNUAL_RISK_FREE_RATE: f64 = 0.05;

/// Annualized Sharpe ratio against a 5% annual risk-free rate, prorated to
/// the sample frequency. 0.0 when the series has no variance.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 || periods_per_year <= 0.0 {
        return 0.0;
    }
    let rf_per_period = ANNUAL_RISK_FREE_RATE / periods_per_year;
    let excess: Vec<f64> = returns.iter().map(|r| r - rf_per_period).collect();
    // A constant series leaves rounding dust in the deviations, so the
    // zero-variance sentinel has to catch sub-epsilon spread too.
    let sd = sample_std_dev(&excess);
    if sd < 1e-12 {
        return 0.0;
    }
    mean(&excess) / sd * periods_per_year.sqrt()
}

/// Largest peak-to-trough decline of the compounded value series, as a
/// positive percentage.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst: f64 = 0.0;
    for &value in values {
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            worst = worst.max((peak - value) / peak);
        }
    }
    worst * 100.0
}

/// Annualized volatility of the return series, in percent.
pub fn volatility(returns: &[f64], periods_per_year: f64) -> f64 {
    if periods_per_year <= 0.0 {
        return 0.0;
    }
    sample_std_dev(returns) * periods_per_year.sqrt() * 100.0
}

pub fn total_return(initial_capital: f64, final_value: f64) -> f64 {
    if initial_capital <= 0.0 {
        return 0.0;
    }
    (final_value - initial_capital) / initial_capital * 100.0
}

/// Fraction of sells that realized a gain; 0.0 when nothing was sold.
pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    let mut sells = 0usize;
    let mut wins = 0usize;
    for trade in trades {
        if trade.action == TradeAction::Sell {
            sells += 1;
            if trade.realized_gain.is_some_and(|g| g > 0.0) {
                wins += 1;
            }
        }
    }
    if sells == 0 {
        0.0
    } else {
        wins as f64 / sells as f64
    }
}

pub fn summarize(ctx: &SimulationContext, config: &SimConfig) -> RunSummary {
    let final_value = ctx
        .history
        .last()
        .map(|p| p.total_value)
        .unwrap_or(config.initial_capital);
    let values: Vec<f64> = ctx.history.iter().map(|p| p.total_value).collect();
    RunSummary {
        total_return: total_return(config.initial_capital, final_value),
        sharpe: sharpe_ratio(&ctx.returns, config.periods_per_year),
        max_drawdown: max_drawdown(&values),
        volatility: volatility(&ctx.returns, config.periods_per_year),
        win_rate: win_rate(&ctx.trades),
        total_trades: ctx.trades.len(),
    }
}
