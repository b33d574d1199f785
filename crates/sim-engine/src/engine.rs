//! Tick-phase portfolio simulator.
//!
//! Every tick runs the same fixed pipeline over pre-computed signal
//! snapshots: mark-to-market, sells, rotation, buys, revalue. Phase order
//! is a contract; sells always free cash before buys see it.

use sim_core::math::{floor4, round4};
use sim_core::{Recommendation, SignalSnapshot, SimError};
use tracing::{debug, info};

use crate::models::{
    DateRange, Holding, RunResult, SimConfig, SimMode, SimulationContext, TickData, TradeAction,
    TradeRecord, ValuationPoint,
};

/// Daily mode evaluates a broad universe; cap the buy list per tick.
const MAX_DAILY_CANDIDATES: usize = 50;
/// At most this many weak holdings are rotated out per tick.
const MAX_ROTATIONS_PER_TICK: usize = 3;

pub struct Simulator {
    config: SimConfig,
}

impl Simulator {
    /// Validates the configuration up front; an invalid config never gets
    /// as far as a portfolio mutation.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Run the full pipeline over a tick series and package the result
    /// with metrics and an equal-weight buy-and-hold benchmark.
    pub fn run(&self, ticks: &[TickData]) -> Result<RunResult, SimError> {
        let (first, last) = match (ticks.first(), ticks.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => {
                return Err(SimError::InsufficientData(
                    "empty tick series".to_string(),
                ))
            }
        };
        info!(ticks = ticks.len(), mode = ?self.config.mode, "starting simulation");

        let mut ctx = SimulationContext::new(self.config.initial_capital);
        for tick in ticks {
            self.step(&mut ctx, tick);
        }

        let summary = crate::metrics::summarize(&ctx, &self.config);
        info!(
            total_return = summary.total_return,
            sharpe = summary.sharpe,
            trades = summary.total_trades,
            "simulation finished"
        );
        Ok(RunResult {
            date_range: DateRange {
                start: first.timestamp,
                end: last.timestamp,
            },
            final_portfolio_history: ctx.history,
            benchmark_series: benchmark_series(ticks, self.config.initial_capital),
            trades: ctx.trades,
            summary,
        })
    }

    /// Scoring-only pass for the optimizer grid: same pipeline, no trade
    /// log, no benchmark.
    pub fn run_light(&self, ticks: &[TickData]) -> SimulationContext {
        let mut ctx = SimulationContext::new_light(self.config.initial_capital);
        for tick in ticks {
            self.step(&mut ctx, tick);
        }
        ctx
    }

    /// One evaluation tick. A tick with no snapshots is skipped entirely;
    /// it contributes neither a return nor a valuation point.
    pub fn step(&self, ctx: &mut SimulationContext, tick: &TickData) {
        if tick.snapshots.is_empty() {
            debug!(timestamp = %tick.timestamp, "no snapshots, skipping tick");
            return;
        }
        self.mark_to_market(ctx, tick);
        self.sell_phase(ctx, tick);
        self.rotation_phase(ctx, tick);
        self.buy_phase(ctx, tick);
        self.revalue(ctx, tick);
    }

    /// Refresh every holding against current prices. A holding whose
    /// symbol has no price this tick keeps its last valuation but still
    /// ages by one bar.
    fn mark_to_market(&self, ctx: &mut SimulationContext, tick: &TickData) {
        for holding in &mut ctx.portfolio.holdings {
            holding.bars_held += 1;
            let Some(&price) = tick.prices.get(&holding.symbol) else {
                continue;
            };
            holding.current_price = price;
            holding.market_value = holding.shares * price;
            holding.gain_loss = (price - holding.avg_cost) * holding.shares;
            holding.gain_loss_percent = if holding.avg_cost > 0.0 {
                (price - holding.avg_cost) / holding.avg_cost * 100.0
            } else {
                0.0
            };
            if price > holding.high_water_mark {
                holding.high_water_mark = price;
            }
        }
    }

    fn sell_phase(&self, ctx: &mut SimulationContext, tick: &TickData) {
        let mut orders: Vec<(String, f64, String)> = Vec::new();
        for holding in &ctx.portfolio.holdings {
            let Some(&price) = tick.prices.get(&holding.symbol) else {
                continue;
            };
            let snapshot = tick.snapshots.get(&holding.symbol);
            if let Some((percent, reason)) = self.sell_decision(holding, snapshot, price) {
                orders.push((holding.symbol.clone(), percent, reason));
            }
        }
        for (symbol, percent, reason) in orders {
            self.execute_sell(ctx, tick, &symbol, percent, &reason);
        }
    }

    /// Ordered exit ladder. The ATR trailing stop bypasses the minimum
    /// hold; everything else waits out `min_hold_bars`.
    fn sell_decision(
        &self,
        holding: &Holding,
        snapshot: Option<&SignalSnapshot>,
        price: f64,
    ) -> Option<(f64, String)> {
        if let Some(entry_atr) = holding.entry_atr {
            let stop = holding.high_water_mark - self.config.atr_stop_multiplier * entry_atr;
            if price <= stop {
                return Some((1.0, format!("ATR trailing stop at {stop:.2}")));
            }
        }
        if holding.bars_held < self.config.min_hold_bars {
            return None;
        }
        let snapshot = match snapshot {
            Some(s) => s,
            None => return Some((1.0, "no signal this tick".to_string())),
        };
        if snapshot.recommendation == Recommendation::StrongSell {
            return Some((1.0, "strong sell signal".to_string()));
        }
        match self.config.mode {
            SimMode::Daily => {
                if holding.gain_loss_percent <= self.config.stop_loss {
                    return Some((
                        1.0,
                        format!("stop loss at {:.2}%", holding.gain_loss_percent),
                    ));
                }
                // Signed comparison: a weakly positive signal still exits.
                if snapshot.combined < self.config.weak_signal_sell {
                    return Some((1.0, format!("weak signal {:.2}", snapshot.combined)));
                }
                if holding.gain_loss_percent >= self.config.profit_take {
                    return Some((
                        0.5,
                        format!("profit taking at {:.2}%", holding.gain_loss_percent),
                    ));
                }
                if snapshot.recommendation == Recommendation::Sell {
                    return Some((0.75, "sell signal".to_string()));
                }
            }
            SimMode::Regime => {
                if let Some(entry_atr) = holding.entry_atr {
                    let gain = price - holding.avg_cost;
                    if gain >= self.config.atr_profit2_multiplier * entry_atr {
                        return Some((0.5, "second ATR profit target".to_string()));
                    }
                    if gain >= self.config.atr_profit1_multiplier * entry_atr {
                        return Some((0.25, "first ATR profit target".to_string()));
                    }
                }
            }
        }
        None
    }

    /// Sell `percent` of the position at the tick price, net of the flat
    /// per-trade fee. Rounding that lands on the whole lot closes it.
    fn execute_sell(
        &self,
        ctx: &mut SimulationContext,
        tick: &TickData,
        symbol: &str,
        percent: f64,
        reason: &str,
    ) {
        let Some(idx) = ctx
            .portfolio
            .holdings
            .iter()
            .position(|h| h.symbol == symbol)
        else {
            return;
        };
        let Some(&price) = tick.prices.get(symbol) else {
            return;
        };

        let (shares, proceeds, fee, realized, remaining) = {
            let holding = &ctx.portfolio.holdings[idx];
            let mut shares = round4(holding.shares * percent);
            if percent >= 1.0 || shares >= holding.shares {
                shares = holding.shares;
            }
            if shares <= 0.0 {
                return;
            }
            let proceeds = shares * price;
            let fee = proceeds * self.config.transaction_cost_bps / 10_000.0;
            let realized = (price - holding.avg_cost) * shares - fee;
            let remaining = round4(holding.shares - shares);
            (shares, proceeds, fee, realized, remaining)
        };

        ctx.portfolio.cash += proceeds - fee;
        if remaining > 0.0 {
            let holding = &mut ctx.portfolio.holdings[idx];
            holding.shares = remaining;
            holding.market_value = remaining * price;
            holding.gain_loss = (price - holding.avg_cost) * remaining;
        } else {
            ctx.portfolio.holdings.remove(idx);
        }

        debug!(symbol, shares, price, reason, "sell");
        ctx.record(TradeRecord {
            timestamp: tick.timestamp,
            symbol: symbol.to_string(),
            action: TradeAction::Sell,
            shares,
            price,
            total: proceeds,
            reason: reason.to_string(),
            realized_gain: Some(realized),
        });
    }

    /// When the book is constrained (slots full or cash short) and
    /// stronger candidates exist, liquidate up to three of the weakest
    /// holdings to make room.
    fn rotation_phase(&self, ctx: &mut SimulationContext, tick: &TickData) {
        let slots_full = ctx.portfolio.holdings.len() >= self.config.max_positions;
        let cash_short = ctx.portfolio.cash < self.config.min_trade_value;
        if !slots_full && !cash_short {
            return;
        }
        let has_candidates = tick.snapshots.iter().any(|(symbol, snap)| {
            snap.combined > self.config.buy_threshold
                && tick.prices.contains_key(symbol.as_str())
                && ctx.portfolio.holding(symbol).is_none()
        });
        if !has_candidates {
            return;
        }

        let mut weakest: Vec<(String, f64)> = ctx
            .portfolio
            .holdings
            .iter()
            .filter(|h| {
                h.bars_held >= self.config.min_hold_bars
                    && tick.prices.contains_key(h.symbol.as_str())
            })
            .filter_map(|h| {
                tick.snapshots
                    .get(&h.symbol)
                    .map(|s| (h.symbol.clone(), s.combined))
            })
            .filter(|(_, combined)| *combined < self.config.buy_threshold)
            .collect();
        weakest.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        for (symbol, combined) in weakest.into_iter().take(MAX_ROTATIONS_PER_TICK) {
            debug!(symbol = symbol.as_str(), combined, "rotating out");
            self.execute_sell(
                ctx,
                tick,
                &symbol,
                1.0,
                &format!("rotation, combined {combined:.2}"),
            );
        }
    }

    /// Open new positions in descending signal strength, ties broken by
    /// symbol for determinism.
    fn buy_phase(&self, ctx: &mut SimulationContext, tick: &TickData) {
        let total_value = ctx.portfolio.cash + ctx.portfolio.holdings_value();
        let fee_rate = self.config.transaction_cost_bps / 10_000.0;

        let mut candidates: Vec<(&String, &SignalSnapshot)> = tick
            .snapshots
            .iter()
            .filter(|(symbol, snap)| {
                snap.combined > self.config.buy_threshold
                    && tick.prices.contains_key(symbol.as_str())
                    && ctx.portfolio.holding(symbol.as_str()).is_none()
            })
            .collect();
        candidates.sort_by(|a, b| b.1.combined.total_cmp(&a.1.combined).then_with(|| a.0.cmp(b.0)));
        let cap = match self.config.mode {
            SimMode::Daily => MAX_DAILY_CANDIDATES,
            SimMode::Regime => self.config.max_new_positions_per_cycle,
        };
        candidates.truncate(cap);

        for (symbol, snapshot) in candidates {
            if ctx.portfolio.holdings.len() >= self.config.max_positions {
                break;
            }
            let Some(&price) = tick.prices.get(symbol.as_str()) else {
                continue;
            };
            if price <= 0.0 {
                continue;
            }

            let cash = ctx.portfolio.cash;
            let cash_cap_shares = floor4(cash / (price * (1.0 + fee_rate)));
            let (shares, entry_atr) = match self.config.mode {
                SimMode::Daily => {
                    // Conviction sizing capped by the position limit.
                    let desired = (cash * snapshot.combined.abs())
                        .min(total_value * self.config.max_position_size);
                    (round4(desired / price).min(cash_cap_shares), None)
                }
                SimMode::Regime => {
                    // ATR risk sizing: risk budget divided by stop distance.
                    let Some(&atr) = tick.atrs.get(symbol.as_str()) else {
                        continue;
                    };
                    if atr <= 0.0 {
                        continue;
                    }
                    let risk_shares = (total_value * self.config.risk_per_trade)
                        / (self.config.atr_stop_multiplier * atr);
                    let size_cap = total_value * self.config.max_position_size / price;
                    (
                        round4(risk_shares.min(size_cap)).min(cash_cap_shares),
                        Some(atr),
                    )
                }
            };

            let value = shares * price;
            if shares <= 0.0 || value < self.config.min_trade_value {
                continue;
            }
            let fee = value * fee_rate;
            ctx.portfolio.cash -= value + fee;
            ctx.portfolio.holdings.push(Holding {
                symbol: symbol.clone(),
                shares,
                avg_cost: price,
                current_price: price,
                market_value: value,
                gain_loss: 0.0,
                gain_loss_percent: 0.0,
                high_water_mark: price,
                entry_atr,
                bars_held: 0,
            });
            debug!(
                symbol = symbol.as_str(),
                shares,
                price,
                combined = snapshot.combined,
                "buy"
            );
            ctx.record(TradeRecord {
                timestamp: tick.timestamp,
                symbol: symbol.clone(),
                action: TradeAction::Buy,
                shares,
                price,
                total: value,
                reason: format!(
                    "combined {:.2} ({})",
                    snapshot.combined,
                    snapshot.recommendation.label()
                ),
                realized_gain: None,
            });
        }
    }

    /// Close the tick: re-establish `total_value == cash + Σ market_value`
    /// and append the tick return against the previous valuation.
    fn revalue(&self, ctx: &mut SimulationContext, tick: &TickData) {
        let total = ctx.portfolio.cash + ctx.portfolio.holdings_value();
        let previous = ctx
            .history
            .last()
            .map(|p| p.total_value)
            .unwrap_or(self.config.initial_capital);
        let tick_return = if previous > 0.0 {
            (total - previous) / previous
        } else {
            0.0
        };
        ctx.portfolio.total_value = total;
        ctx.returns.push(tick_return);
        ctx.history.push(ValuationPoint {
            timestamp: tick.timestamp,
            total_value: total,
        });
    }
}

/// Equal-weight buy-and-hold over every symbol priced on the first tick.
/// Lots are valued at the last known price when a later tick misses one.
pub fn benchmark_series(ticks: &[TickData], initial_capital: f64) -> Vec<ValuationPoint> {
    let Some(first) = ticks.first() else {
        return Vec::new();
    };
    let mut symbols: Vec<&String> = first
        .prices
        .iter()
        .filter(|(_, &p)| p > 0.0)
        .map(|(s, _)| s)
        .collect();
    symbols.sort();
    if symbols.is_empty() {
        return Vec::new();
    }

    let per_symbol = initial_capital / symbols.len() as f64;
    let mut lots: Vec<(String, f64, f64)> = symbols
        .into_iter()
        .map(|symbol| {
            let price = first.prices[symbol];
            (symbol.clone(), per_symbol / price, price)
        })
        .collect();

    let mut series = Vec::with_capacity(ticks.len());
    for tick in ticks {
        let mut value = 0.0;
        for (symbol, shares, last_price) in &mut lots {
            if let Some(&p) = tick.prices.get(symbol.as_str()) {
                *last_price = p;
            }
            value += *shares * *last_price;
        }
        series.push(ValuationPoint {
            timestamp: tick.timestamp,
            total_value: value,
        });
    }
    series
}
