//! Walk-forward weight optimization for the daily family.
//!
//! A grid search over the weight simplex runs an independent lightweight
//! simulation per candidate (parallelized with rayon), ranks the results
//! deterministically, and smooths the top set into a single vector that is
//! then evaluated out of sample.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sim_core::math::round2;
use sim_core::{DailyWeights, SimError};
use strategy_signals::{daily_recommendation, MEAN_REVERSION, MOMENTUM, SENTIMENT, TECHNICAL};
use tracing::info;

use crate::engine::Simulator;
use crate::metrics;
use crate::models::{RunResult, SimConfig, SimMode, TickData};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Grid step over each free weight.
    pub step: f64,
    /// Upper bound on any single weight.
    pub max_weight: f64,
    /// How many top-ranked candidates feed the smoothing average.
    pub top_n: usize,
    /// Absolute tolerance on total return inside which ranking falls back
    /// to Sharpe. Kept as a knob; the historical value is 0.01.
    pub return_tolerance: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            step: 0.05,
            max_weight: 0.70,
            top_n: 10,
            return_tolerance: 0.01,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.step <= 0.0 || self.step > 1.0 {
            return Err(SimError::InvalidConfig(format!(
                "step must be in (0, 1], got {}",
                self.step
            )));
        }
        if self.max_weight <= 0.0 || self.max_weight > 1.0 {
            return Err(SimError::InvalidConfig(format!(
                "max_weight must be in (0, 1], got {}",
                self.max_weight
            )));
        }
        if self.top_n < 1 {
            return Err(SimError::InvalidConfig("top_n must be >= 1".to_string()));
        }
        if self.return_tolerance < 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "return_tolerance must be >= 0, got {}",
                self.return_tolerance
            )));
        }
        Ok(())
    }
}

/// One scored candidate from the training window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridPoint {
    pub weights: DailyWeights,
    pub total_return: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
}

/// Full optimizer output: the scored top set, the smoothed vector, and its
/// out-of-sample run.
#[derive(Debug, Clone)]
pub struct OptimizationReport {
    pub grid_size: usize,
    pub top: Vec<GridPoint>,
    pub smoothed: DailyWeights,
    pub out_of_sample: RunResult,
}

pub struct WalkForwardOptimizer {
    base_config: SimConfig,
    opt: OptimizerConfig,
}

impl WalkForwardOptimizer {
    pub fn new(base_config: SimConfig, opt: OptimizerConfig) -> Result<Self, SimError> {
        if base_config.mode != SimMode::Daily {
            return Err(SimError::InvalidConfig(
                "weight optimization applies to daily mode only".to_string(),
            ));
        }
        base_config.validate()?;
        opt.validate()?;
        Ok(Self { base_config, opt })
    }

    /// Grid-search the training window, smooth the top candidates, and
    /// evaluate the smoothed vector on the held-out test window.
    pub fn optimize(
        &self,
        train: &[TickData],
        test: &[TickData],
    ) -> Result<OptimizationReport, SimError> {
        if train.is_empty() || test.is_empty() {
            return Err(SimError::InsufficientData(
                "training and test windows must both be non-empty".to_string(),
            ));
        }
        validate_no_overlap(train, test)?;

        let grid = enumerate_weight_grid(self.opt.step, self.opt.max_weight);
        info!(
            grid = grid.len(),
            train_ticks = train.len(),
            test_ticks = test.len(),
            "starting grid search"
        );

        // Candidates are independent; collect preserves grid order, so the
        // ranking below is deterministic regardless of completion order.
        let mut scored = grid
            .par_iter()
            .map(|&weights| self.score_candidate(train, weights))
            .collect::<Result<Vec<GridPoint>, SimError>>()?;

        rank(&mut scored, self.opt.return_tolerance);
        scored.truncate(self.opt.top_n);
        let smoothed = smooth_weights(&scored.iter().map(|p| p.weights).collect::<Vec<_>>());
        info!(?smoothed, "smoothed top candidates");

        let mut config = self.base_config.clone();
        config.daily_weights = smoothed;
        let simulator = Simulator::new(config)?;
        let out_of_sample = simulator.run(&recombine_ticks(test, smoothed))?;

        Ok(OptimizationReport {
            grid_size: grid.len(),
            top: scored,
            smoothed,
            out_of_sample,
        })
    }

    fn score_candidate(&self, train: &[TickData], weights: DailyWeights) -> Result<GridPoint, SimError> {
        let mut config = self.base_config.clone();
        config.daily_weights = weights;
        let simulator = Simulator::new(config.clone())?;
        let ctx = simulator.run_light(&recombine_ticks(train, weights));
        let values: Vec<f64> = ctx.history.iter().map(|p| p.total_value).collect();
        let final_value = values.last().copied().unwrap_or(config.initial_capital);
        Ok(GridPoint {
            weights,
            total_return: metrics::total_return(config.initial_capital, final_value),
            sharpe: metrics::sharpe_ratio(&ctx.returns, config.periods_per_year),
            max_drawdown: metrics::max_drawdown(&values),
        })
    }
}

/// Enumerate the weight simplex with integer stepping so the grid is
/// identical across platforms. Momentum, mean reversion, and sentiment are
/// free; technical is derived as the remainder and must stay on the grid.
pub fn enumerate_weight_grid(step: f64, max_weight: f64) -> Vec<DailyWeights> {
    let max_steps = (max_weight / step).round() as i64;
    let total_steps = (1.0 / step).round() as i64;
    let mut grid = Vec::new();
    for m in 0..=max_steps {
        for r in 0..=max_steps {
            for s in 0..=max_steps {
                let t = total_steps - m - r - s;
                if (0..=max_steps).contains(&t) {
                    grid.push(DailyWeights {
                        momentum: m as f64 * step,
                        mean_reversion: r as f64 * step,
                        technical: t as f64 * step,
                        sentiment: s as f64 * step,
                    });
                }
            }
        }
    }
    grid
}

/// Total return descending, with Sharpe descending inside the tolerance
/// band. The band is what makes the top set reproducible when many
/// candidates land within noise of each other.
///
/// The band cannot live inside a single comparator (tolerance is not
/// transitive, and `sort_by` rejects non-total orders), so this sorts
/// strictly by return first and then reorders each run anchored at its
/// best remaining return.
fn rank(scored: &mut [GridPoint], tolerance: f64) {
    scored.sort_by(|a, b| b.total_return.total_cmp(&a.total_return));

    let mut start = 0;
    while start < scored.len() {
        let anchor = scored[start].total_return;
        let mut end = start + 1;
        while end < scored.len() && anchor - scored[end].total_return <= tolerance {
            end += 1;
        }
        scored[start..end].sort_by(|a, b| b.sharpe.total_cmp(&a.sharpe));
        start = end;
    }
}

/// Average each component across the top set, round to 2 decimals, then
/// nudge the largest-magnitude weight so the vector re-sums to exactly 1.0.
pub fn smooth_weights(top: &[DailyWeights]) -> DailyWeights {
    if top.is_empty() {
        return DailyWeights::default();
    }
    let n = top.len() as f64;
    let mut sums = [0.0f64; 4];
    for weights in top {
        for (slot, value) in sums.iter_mut().zip(weights.as_array()) {
            *slot += value;
        }
    }
    let mut rounded = [0.0f64; 4];
    for (slot, sum) in rounded.iter_mut().zip(sums) {
        *slot = round2(sum / n);
    }

    let drift = 1.0 - rounded.iter().sum::<f64>();
    if drift.abs() > 1e-9 {
        let mut largest = 0;
        for (i, value) in rounded.iter().enumerate() {
            if value.abs() > rounded[largest].abs() {
                largest = i;
            }
        }
        rounded[largest] += drift;
    }
    DailyWeights::from_array(rounded)
}

/// Apply a candidate weight vector to pre-computed snapshots: the combined
/// score and recommendation are recomputed from the per-strategy scores.
pub fn recombine_ticks(ticks: &[TickData], weights: DailyWeights) -> Vec<TickData> {
    ticks
        .iter()
        .map(|tick| {
            let mut tick = tick.clone();
            for snapshot in tick.snapshots.values_mut() {
                let mut combined = 0.0;
                for signal in &snapshot.signals {
                    let weight = match signal.name.as_str() {
                        MOMENTUM => weights.momentum,
                        MEAN_REVERSION => weights.mean_reversion,
                        TECHNICAL => weights.technical,
                        SENTIMENT => weights.sentiment,
                        _ => 0.0,
                    };
                    combined += signal.score * weight;
                }
                snapshot.combined = combined;
                snapshot.recommendation = daily_recommendation(combined);
            }
            tick
        })
        .collect()
}

fn validate_no_overlap(train: &[TickData], test: &[TickData]) -> Result<(), SimError> {
    let (Some(train_start), Some(train_end)) = (train.first(), train.last()) else {
        return Ok(());
    };
    let (Some(test_start), Some(test_end)) = (test.first(), test.last()) else {
        return Ok(());
    };
    if train_start.timestamp <= test_end.timestamp && test_start.timestamp <= train_end.timestamp {
        return Err(SimError::InvalidConfig(format!(
            "training window {} .. {} overlaps test window {} .. {}",
            train_start.timestamp, train_end.timestamp, test_start.timestamp, test_end.timestamp
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(total_return: f64, sharpe: f64) -> GridPoint {
        GridPoint {
            weights: DailyWeights::default(),
            total_return,
            sharpe,
            max_drawdown: 0.0,
        }
    }

    #[test]
    fn test_rank_survives_dense_tolerance_chains() {
        // Returns spaced inside the tolerance band with alternating
        // Sharpes: band membership is not transitive across the chain, so
        // the ranking must not hinge on a single pairwise comparator.
        let mut scored: Vec<GridPoint> = (0..400)
            .map(|i| point(i as f64 * 0.009, if i % 2 == 0 { 5.0 } else { -5.0 }))
            .collect();
        rank(&mut scored, 0.01);

        assert_eq!(scored.len(), 400);
        // Outside the band the order is strictly by return: no element
        // sits more than one band below a later one.
        for pair in scored.windows(2) {
            assert!(pair[0].total_return >= pair[1].total_return - 0.01 - 1e-9);
        }
        // The first band run is the two best returns (spaced 0.009),
        // reordered so the higher Sharpe leads.
        assert!((scored[0].total_return - 398.0 * 0.009).abs() < 1e-9);
        assert_eq!(scored[0].sharpe, 5.0);
        assert!((scored[1].total_return - 399.0 * 0.009).abs() < 1e-9);
        assert_eq!(scored[1].sharpe, -5.0);
    }

    #[test]
    fn test_rank_prefers_sharpe_only_inside_band() {
        let mut scored = vec![point(10.0, 0.5), point(10.005, 0.1), point(9.0, 9.9)];
        rank(&mut scored, 0.01);
        // 10.005 and 10.0 share a band: Sharpe decides. 9.0 is far below
        // and its huge Sharpe must not pull it up.
        assert_eq!(scored[0].sharpe, 0.5);
        assert_eq!(scored[1].sharpe, 0.1);
        assert_eq!(scored[2].sharpe, 9.9);
    }
}
