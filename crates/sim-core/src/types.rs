use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default)]
    pub vwap: Option<f64>,
}

/// Output of one strategy evaluation.
///
/// `confidence == 0.0` means the strategy had insufficient history to form
/// an opinion; such signals are excluded from confidence-weighted averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySignal {
    pub name: String,
    /// -1.0 (max bearish) to 1.0 (max bullish)
    pub score: f64,
    /// 0.0 to 1.0
    pub confidence: f64,
    pub reason: String,
}

impl StrategySignal {
    pub fn new(name: &str, score: f64, confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            score,
            confidence,
            reason: reason.into(),
        }
    }

    /// Zero-confidence signal for strategies that lack lookback data.
    pub fn insufficient(name: &str) -> Self {
        Self::new(name, 0.0, 0.0, "insufficient data")
    }
}

/// Which strategy family produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalFamily {
    /// Daily swing strategies combined with fixed global weights.
    Daily,
    /// Intraday strategies combined with regime-dependent group weights.
    Regime,
}

/// Discrete trade recommendation derived from the combined score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl Recommendation {
    pub fn label(&self) -> &'static str {
        match self {
            Recommendation::StrongBuy => "Strong Buy",
            Recommendation::Buy => "Buy",
            Recommendation::Hold => "Hold",
            Recommendation::Sell => "Sell",
            Recommendation::StrongSell => "Strong Sell",
        }
    }
}

/// One symbol's signals at one timestamp, combined into a single score.
///
/// Produced once per (symbol, timestamp) pair during pre-computation and
/// read-only thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub family: SignalFamily,
    pub signals: Vec<StrategySignal>,
    pub combined: f64,
    pub recommendation: Recommendation,
}

/// Discrete market regime, recomputed per symbol per tick (no hysteresis).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketRegime {
    TrendingUp,
    TrendingDown,
    RangeBound,
    Unknown,
}

impl MarketRegime {
    pub fn name(&self) -> &'static str {
        match self {
            MarketRegime::TrendingUp => "Trending Up",
            MarketRegime::TrendingDown => "Trending Down",
            MarketRegime::RangeBound => "Range Bound",
            MarketRegime::Unknown => "Unknown",
        }
    }
}

/// Fixed per-strategy weights for the daily swing family.
///
/// Non-negative; the optimizer enforces sum ≈ 1.0 at search time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyWeights {
    pub momentum: f64,
    pub mean_reversion: f64,
    pub technical: f64,
    pub sentiment: f64,
}

impl DailyWeights {
    pub fn sum(&self) -> f64 {
        self.momentum + self.mean_reversion + self.technical + self.sentiment
    }

    pub fn as_array(&self) -> [f64; 4] {
        [
            self.momentum,
            self.mean_reversion,
            self.technical,
            self.sentiment,
        ]
    }

    pub fn from_array(w: [f64; 4]) -> Self {
        Self {
            momentum: w[0],
            mean_reversion: w[1],
            technical: w[2],
            sentiment: w[3],
        }
    }
}

impl Default for DailyWeights {
    fn default() -> Self {
        Self {
            momentum: 0.35,
            mean_reversion: 0.25,
            technical: 0.25,
            sentiment: 0.15,
        }
    }
}

/// Trend-vs-reversion group weights for one regime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeWeights {
    pub trend: f64,
    pub reversion: f64,
}

/// Group-weight lookup table, one row per regime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeWeightTable {
    pub trending_up: RegimeWeights,
    pub trending_down: RegimeWeights,
    pub range_bound: RegimeWeights,
    pub unknown: RegimeWeights,
}

impl RegimeWeightTable {
    pub fn for_regime(&self, regime: MarketRegime) -> RegimeWeights {
        match regime {
            MarketRegime::TrendingUp => self.trending_up,
            MarketRegime::TrendingDown => self.trending_down,
            MarketRegime::RangeBound => self.range_bound,
            MarketRegime::Unknown => self.unknown,
        }
    }
}

impl Default for RegimeWeightTable {
    fn default() -> Self {
        Self {
            trending_up: RegimeWeights {
                trend: 0.8,
                reversion: 0.2,
            },
            trending_down: RegimeWeights {
                trend: 0.8,
                reversion: 0.2,
            },
            range_bound: RegimeWeights {
                trend: 0.2,
                reversion: 0.8,
            },
            unknown: RegimeWeights {
                trend: 0.5,
                reversion: 0.5,
            },
        }
    }
}
