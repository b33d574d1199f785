use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sim_core::{DailyWeights, RegimeWeightTable, SignalSnapshot, SimError};

/// Which strategy family and rule set the simulation runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimMode {
    /// Daily swing family with fixed global weights.
    Daily,
    /// Intraday family with regime-dependent group weights.
    Regime,
}

/// Configuration for a simulation run. All knobs are validated by range
/// before a run starts; nothing is checked mid-run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub mode: SimMode,
    pub initial_capital: f64,
    /// Maximum fraction of total value in one position, (0, 1].
    pub max_position_size: f64,
    pub max_positions: usize,
    pub min_trade_value: f64,
    /// Combined score above which a symbol is a buy candidate.
    pub buy_threshold: f64,
    /// Daily mode: full exit when gain/loss percent falls to this level (< 0).
    pub stop_loss: f64,
    /// Daily mode: half exit when gain/loss percent reaches this level (> 0).
    pub profit_take: f64,
    /// Daily mode: full exit when `combined` (signed, not absolute) falls
    /// below this level. A positive-but-weak signal can still trigger the
    /// exit; anything not clearly bullish gets sold.
    pub weak_signal_sell: f64,
    /// Flat fee in basis points applied to every buy and sell.
    pub transaction_cost_bps: f64,
    /// Ticks a position must be held before non-stop sells apply.
    pub min_hold_bars: u32,
    /// Regime mode: fraction of total value risked per trade.
    pub risk_per_trade: f64,
    /// Regime mode: trailing-stop distance in entry-ATR multiples.
    pub atr_stop_multiplier: f64,
    /// Regime mode: first profit tier in entry-ATR multiples (sells 25%).
    pub atr_profit1_multiplier: f64,
    /// Regime mode: second profit tier in entry-ATR multiples (sells 50%).
    pub atr_profit2_multiplier: f64,
    /// Regime mode: cap on new positions opened per tick.
    pub max_new_positions_per_cycle: usize,
    /// Sample frequency used to annualize Sharpe/volatility.
    pub periods_per_year: f64,
    pub daily_weights: DailyWeights,
    pub regime_weights: RegimeWeightTable,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            mode: SimMode::Daily,
            initial_capital: 100_000.0,
            max_position_size: 0.1,
            max_positions: 10,
            min_trade_value: 100.0,
            buy_threshold: 0.15,
            stop_loss: -5.0,
            profit_take: 10.0,
            weak_signal_sell: 0.05,
            transaction_cost_bps: 5.0,
            min_hold_bars: 0,
            risk_per_trade: 0.01,
            atr_stop_multiplier: 2.0,
            atr_profit1_multiplier: 1.5,
            atr_profit2_multiplier: 3.0,
            max_new_positions_per_cycle: 3,
            periods_per_year: 252.0,
            daily_weights: DailyWeights::default(),
            regime_weights: RegimeWeightTable::default(),
        }
    }
}

impl SimConfig {
    /// Fail-fast range validation. Called before any simulation starts so an
    /// invalid configuration can never surface a partially mutated portfolio.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.initial_capital <= 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "initial_capital must be > 0, got {}",
                self.initial_capital
            )));
        }
        if self.max_position_size <= 0.0 || self.max_position_size > 1.0 {
            return Err(SimError::InvalidConfig(format!(
                "max_position_size must be in (0, 1], got {}",
                self.max_position_size
            )));
        }
        if self.max_positions < 1 {
            return Err(SimError::InvalidConfig(
                "max_positions must be >= 1".to_string(),
            ));
        }
        if self.min_trade_value < 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "min_trade_value must be >= 0, got {}",
                self.min_trade_value
            )));
        }
        if self.stop_loss >= 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "stop_loss must be < 0, got {}",
                self.stop_loss
            )));
        }
        if self.profit_take <= 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "profit_take must be > 0, got {}",
                self.profit_take
            )));
        }
        if self.transaction_cost_bps < 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "transaction_cost_bps must be >= 0, got {}",
                self.transaction_cost_bps
            )));
        }
        if self.periods_per_year <= 0.0 {
            return Err(SimError::InvalidConfig(
                "periods_per_year must be > 0".to_string(),
            ));
        }

        validate_weights("daily_weights", &self.daily_weights.as_array())?;

        if self.mode == SimMode::Regime {
            if self.risk_per_trade <= 0.0 || self.risk_per_trade > 1.0 {
                return Err(SimError::InvalidConfig(format!(
                    "risk_per_trade must be in (0, 1], got {}",
                    self.risk_per_trade
                )));
            }
            for (name, value) in [
                ("atr_stop_multiplier", self.atr_stop_multiplier),
                ("atr_profit1_multiplier", self.atr_profit1_multiplier),
                ("atr_profit2_multiplier", self.atr_profit2_multiplier),
            ] {
                if value <= 0.0 {
                    return Err(SimError::InvalidConfig(format!(
                        "{name} must be > 0, got {value}"
                    )));
                }
            }
            if self.max_new_positions_per_cycle < 1 {
                return Err(SimError::InvalidConfig(
                    "max_new_positions_per_cycle must be >= 1".to_string(),
                ));
            }
            for (regime, row) in [
                ("trending_up", self.regime_weights.trending_up),
                ("trending_down", self.regime_weights.trending_down),
                ("range_bound", self.regime_weights.range_bound),
                ("unknown", self.regime_weights.unknown),
            ] {
                validate_weights(regime, &[row.trend, row.reversion])?;
            }
        }

        Ok(())
    }
}

fn validate_weights(name: &str, weights: &[f64]) -> Result<(), SimError> {
    for &w in weights {
        if !(0.0..=1.0).contains(&w) {
            return Err(SimError::InvalidConfig(format!(
                "{name}: weight {w} outside [0, 1]"
            )));
        }
    }
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > 1e-6 {
        return Err(SimError::InvalidConfig(format!(
            "{name}: weights sum to {sum}, expected 1.0"
        )));
    }
    Ok(())
}

/// Everything the simulator needs for one evaluation tick: pre-computed
/// signal snapshots, current prices, and (regime mode) current ATRs.
#[derive(Debug, Clone)]
pub struct TickData {
    pub timestamp: DateTime<Utc>,
    pub snapshots: HashMap<String, SignalSnapshot>,
    pub prices: HashMap<String, f64>,
    pub atrs: HashMap<String, f64>,
}

/// One open position. Owned exclusively by the portfolio; created on buy,
/// mutated in place every tick, removed on full liquidation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    /// Fractional shares at 4-decimal precision; always > 0 while held.
    pub shares: f64,
    pub avg_cost: f64,
    pub current_price: f64,
    pub market_value: f64,
    pub gain_loss: f64,
    pub gain_loss_percent: f64,
    pub high_water_mark: f64,
    /// ATR at entry; set only in regime mode, drives stops and profit tiers.
    pub entry_atr: Option<f64>,
    pub bars_held: u32,
}

/// Cash plus holdings, unique by symbol.
/// `total_value == cash + Σ market_value` is re-established every tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub cash: f64,
    pub holdings: Vec<Holding>,
    pub total_value: f64,
}

impl Portfolio {
    pub fn new(cash: f64) -> Self {
        Self {
            cash,
            holdings: Vec::new(),
            total_value: cash,
        }
    }

    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.holdings.iter().find(|h| h.symbol == symbol)
    }

    pub fn holdings_value(&self) -> f64 {
        self.holdings.iter().map(|h| h.market_value).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAction {
    Buy,
    Sell,
}

/// Immutable record of one executed buy or sell. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub action: TradeAction,
    pub shares: f64,
    pub price: f64,
    pub total: f64,
    pub reason: String,
    /// Realized gain/loss versus average cost; sells only.
    pub realized_gain: Option<f64>,
}

/// Portfolio valuation at the end of one tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationPoint {
    pub timestamp: DateTime<Utc>,
    pub total_value: f64,
}

/// Explicitly passed, owned simulation state: portfolio, trade log, and
/// return series. No ambient or static state anywhere.
#[derive(Debug, Clone)]
pub struct SimulationContext {
    pub portfolio: Portfolio,
    pub trades: Vec<TradeRecord>,
    pub returns: Vec<f64>,
    pub history: Vec<ValuationPoint>,
    /// Disabled for optimizer scoring passes, which only need the return
    /// series.
    pub record_trades: bool,
}

impl SimulationContext {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            portfolio: Portfolio::new(initial_capital),
            trades: Vec::new(),
            returns: Vec::new(),
            history: Vec::new(),
            record_trades: true,
        }
    }

    /// Context for a scoring-only pass: no trade-log bookkeeping.
    pub fn new_light(initial_capital: f64) -> Self {
        Self {
            record_trades: false,
            ..Self::new(initial_capital)
        }
    }

    pub fn record(&mut self, trade: TradeRecord) {
        if self.record_trades {
            self.trades.push(trade);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Headline statistics for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_return: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub volatility: f64,
    pub win_rate: f64,
    pub total_trades: usize,
}

/// Structured result of a completed run. Callers persist this (e.g. to
/// JSON); the engine itself does no I/O.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub date_range: DateRange,
    pub final_portfolio_history: Vec<ValuationPoint>,
    pub benchmark_series: Vec<ValuationPoint>,
    pub trades: Vec<TradeRecord>,
    pub summary: RunSummary,
}
