//! Signal aggregation: fixed global weights for the daily family, and
//! confidence-weighted group scores with regime-dependent weights for the
//! intraday family.

use sim_core::{DailyWeights, Recommendation, RegimeWeights, StrategySignal};

/// The four daily swing signals for one (symbol, date) pair.
#[derive(Debug, Clone)]
pub struct DailySignalSet {
    pub momentum: StrategySignal,
    pub mean_reversion: StrategySignal,
    pub technical: StrategySignal,
    pub sentiment: StrategySignal,
}

impl DailySignalSet {
    pub fn into_vec(self) -> Vec<StrategySignal> {
        vec![
            self.momentum,
            self.mean_reversion,
            self.technical,
            self.sentiment,
        ]
    }
}

/// The four intraday regime signals for one (symbol, timestamp) pair.
#[derive(Debug, Clone)]
pub struct RegimeSignalSet {
    pub trend_momentum: StrategySignal,
    pub macd_trend: StrategySignal,
    pub bb_rsi_reversion: StrategySignal,
    pub vwap_reversion: StrategySignal,
}

impl RegimeSignalSet {
    pub fn into_vec(self) -> Vec<StrategySignal> {
        vec![
            self.trend_momentum,
            self.macd_trend,
            self.bb_rsi_reversion,
            self.vwap_reversion,
        ]
    }
}

/// Fixed-weight combination: `combined = Σ score · weight`.
///
/// Weights are not renormalized here; the optimizer enforces the sum
/// constraint at search time.
pub fn combine_daily(set: &DailySignalSet, weights: &DailyWeights) -> f64 {
    set.momentum.score * weights.momentum
        + set.mean_reversion.score * weights.mean_reversion
        + set.technical.score * weights.technical
        + set.sentiment.score * weights.sentiment
}

/// Confidence-weighted mean over one group, excluding zero-confidence
/// (insufficient-data) signals. 0.0 when no signal has an opinion.
pub fn group_score(signals: &[&StrategySignal]) -> f64 {
    let mut weighted = 0.0;
    let mut total_confidence = 0.0;
    for signal in signals {
        if signal.confidence > 0.0 {
            weighted += signal.score * signal.confidence;
            total_confidence += signal.confidence;
        }
    }
    if total_confidence > 0.0 {
        weighted / total_confidence
    } else {
        0.0
    }
}

/// Regime-weighted group combination:
/// `combined = trend_group · w.trend + reversion_group · w.reversion`.
pub fn combine_regime(set: &RegimeSignalSet, weights: RegimeWeights) -> f64 {
    let trend = group_score(&[&set.trend_momentum, &set.macd_trend]);
    let reversion = group_score(&[&set.bb_rsi_reversion, &set.vwap_reversion]);
    trend * weights.trend + reversion * weights.reversion
}

/// Daily-mode recommendation thresholds.
pub fn daily_recommendation(combined: f64) -> Recommendation {
    if combined > 0.5 {
        Recommendation::StrongBuy
    } else if combined > 0.15 {
        Recommendation::Buy
    } else if combined < -0.5 {
        Recommendation::StrongSell
    } else if combined < -0.15 {
        Recommendation::Sell
    } else {
        Recommendation::Hold
    }
}

/// Regime-mode recommendation thresholds (wider than daily mode).
pub fn regime_recommendation(combined: f64) -> Recommendation {
    if combined > 0.55 {
        Recommendation::StrongBuy
    } else if combined > 0.35 {
        Recommendation::Buy
    } else if combined < -0.55 {
        Recommendation::StrongSell
    } else if combined < -0.35 {
        Recommendation::Sell
    } else {
        Recommendation::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::{MarketRegime, RegimeWeightTable};

    fn signal(name: &str, score: f64, confidence: f64) -> StrategySignal {
        StrategySignal::new(name, score, confidence, "test")
    }

    fn daily_set(m: f64, r: f64, t: f64, s: f64) -> DailySignalSet {
        DailySignalSet {
            momentum: signal("momentum", m, 0.7),
            mean_reversion: signal("mean_reversion", r, 0.6),
            technical: signal("technical", t, 0.65),
            sentiment: signal("sentiment", s, 0.3),
        }
    }

    #[test]
    fn test_combine_daily_weighted_sum() {
        let set = daily_set(1.0, 0.5, -0.5, 0.0);
        let weights = DailyWeights {
            momentum: 0.4,
            mean_reversion: 0.3,
            technical: 0.2,
            sentiment: 0.1,
        };
        let combined = combine_daily(&set, &weights);
        assert!((combined - (0.4 + 0.15 - 0.1)).abs() < 1e-12);
    }

    #[test]
    fn test_combine_daily_idempotent() {
        let set = daily_set(0.37, -0.21, 0.08, 0.13);
        let weights = DailyWeights::default();
        let a = combine_daily(&set, &weights);
        let b = combine_daily(&set, &weights);
        assert_eq!(a.to_bits(), b.to_bits());
        assert_eq!(daily_recommendation(a), daily_recommendation(b));
    }

    #[test]
    fn test_group_score_excludes_zero_confidence() {
        let strong = signal("a", 1.0, 0.8);
        let silent = signal("b", -1.0, 0.0);
        assert!((group_score(&[&strong, &silent]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_group_score_empty_group() {
        let silent_a = signal("a", 0.5, 0.0);
        let silent_b = signal("b", -0.5, 0.0);
        assert_eq!(group_score(&[&silent_a, &silent_b]), 0.0);
    }

    #[test]
    fn test_combine_regime_uses_table_row() {
        let set = RegimeSignalSet {
            trend_momentum: signal("trend_momentum", 1.0, 0.7),
            macd_trend: signal("macd_trend", 1.0, 0.6),
            bb_rsi_reversion: signal("bb_rsi_reversion", -1.0, 0.7),
            vwap_reversion: signal("vwap_reversion", -1.0, 0.8),
        };
        let table = RegimeWeightTable::default();

        // Trending markets lean on the trend group (0.8/0.2)
        let trending = combine_regime(&set, table.for_regime(MarketRegime::TrendingUp));
        assert!((trending - (0.8 - 0.2)).abs() < 1e-12);

        // Range-bound markets lean on reversion (0.2/0.8)
        let ranging = combine_regime(&set, table.for_regime(MarketRegime::RangeBound));
        assert!((ranging - (0.2 - 0.8)).abs() < 1e-12);
    }

    #[test]
    fn test_daily_recommendation_thresholds() {
        assert_eq!(daily_recommendation(0.51), Recommendation::StrongBuy);
        assert_eq!(daily_recommendation(0.5), Recommendation::Buy);
        assert_eq!(daily_recommendation(0.16), Recommendation::Buy);
        assert_eq!(daily_recommendation(0.15), Recommendation::Hold);
        assert_eq!(daily_recommendation(-0.15), Recommendation::Hold);
        assert_eq!(daily_recommendation(-0.16), Recommendation::Sell);
        assert_eq!(daily_recommendation(-0.51), Recommendation::StrongSell);
    }

    #[test]
    fn test_regime_recommendation_thresholds() {
        assert_eq!(regime_recommendation(0.56), Recommendation::StrongBuy);
        assert_eq!(regime_recommendation(0.36), Recommendation::Buy);
        assert_eq!(regime_recommendation(0.0), Recommendation::Hold);
        assert_eq!(regime_recommendation(-0.36), Recommendation::Sell);
        assert_eq!(regime_recommendation(-0.56), Recommendation::StrongSell);
    }
}
