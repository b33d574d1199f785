//! Daily swing family: four strategies combined with fixed global weights.
//!
//! Every generator is pure and total. Insufficient history yields a
//! zero-score, zero-confidence signal, never an error.

use chrono::NaiveDate;
use sim_core::math::{mean, std_dev};
use sim_core::{Bar, StrategySignal};
use technical_indicators::{macd, rate_of_change, rsi, sma};

pub const MOMENTUM: &str = "momentum";
pub const MEAN_REVERSION: &str = "mean_reversion";
pub const TECHNICAL: &str = "technical";
pub const SENTIMENT: &str = "sentiment";

const MOMENTUM_MIN_BARS: usize = 50;
/// Even the hash-based sentiment proxy stays silent without a minimal history.
pub const SENTIMENT_MIN_BARS: usize = 5;
const MEAN_REVERSION_MIN_BARS: usize = 60;
const MEAN_REVERSION_LONG_WINDOW: usize = 200;
const TECHNICAL_MIN_BARS: usize = 21;

/// Momentum: graded SMA-20/50 distance, golden/death cross, MACD histogram
/// sign, and 5/20-day rate-of-change, clamped to [-1, 1].
pub fn momentum_signal(bars: &[Bar]) -> StrategySignal {
    if bars.len() < MOMENTUM_MIN_BARS {
        return StrategySignal::insufficient(MOMENTUM);
    }
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let (sma20, sma50) = match (sma(&closes, 20), sma(&closes, 50)) {
        (Some(a), Some(b)) => (a, b),
        _ => return StrategySignal::insufficient(MOMENTUM),
    };

    let mut score = 0.0;
    let mut parts: Vec<String> = Vec::new();

    // Graded trend distance
    let distance = (sma20 - sma50) / sma50 * 100.0;
    let trend_component: f64 = if distance.abs() >= 3.0 {
        0.4
    } else if distance.abs() >= 1.0 {
        0.25
    } else if distance.abs() > 0.0 {
        0.1
    } else {
        0.0
    };
    score += trend_component.copysign(distance);
    parts.push(format!("SMA20/50 spread {distance:.2}%"));

    // Golden/death cross over the last 5 bars
    let prior = &closes[..closes.len() - 5];
    if let (Some(p20), Some(p50)) = (sma(prior, 20), sma(prior, 50)) {
        if p20 <= p50 && sma20 > sma50 {
            score += 0.2;
            parts.push("golden cross".to_string());
        } else if p20 >= p50 && sma20 < sma50 {
            score -= 0.2;
            parts.push("death cross".to_string());
        }
    }

    // MACD histogram sign
    if let Some(out) = macd(&closes) {
        if out.histogram > 0.0 {
            score += 0.15;
            parts.push("MACD positive".to_string());
        } else if out.histogram < 0.0 {
            score -= 0.15;
            parts.push("MACD negative".to_string());
        }
    }

    // Short- and medium-term rate of change, proportionally graded
    if let Some(roc5) = rate_of_change(&closes, 5) {
        score += (roc5 / 10.0).clamp(-0.15, 0.15);
        parts.push(format!("ROC5 {roc5:.2}%"));
    }
    if let Some(roc20) = rate_of_change(&closes, 20) {
        score += (roc20 / 20.0).clamp(-0.15, 0.15);
        parts.push(format!("ROC20 {roc20:.2}%"));
    }

    StrategySignal::new(MOMENTUM, score.clamp(-1.0, 1.0), 0.7, parts.join("; "))
}

/// Map a deviation z-score into one of nine discrete buckets.
///
/// Negative z (price below its mean) reads bullish for a mean-reversion
/// strategy; the extremes saturate at ±0.8. Shared with the intraday
/// VWAP-reversion strategy, which buckets its session z-score identically.
pub fn z_score_bucket(z: f64) -> (f64, &'static str) {
    if z <= -2.5 {
        (0.8, "Extremely oversold")
    } else if z <= -2.0 {
        (0.6, "Strongly oversold")
    } else if z <= -1.5 {
        (0.4, "Oversold")
    } else if z <= -1.0 {
        (0.2, "Mildly oversold")
    } else if z < 1.0 {
        (0.0, "Neutral")
    } else if z < 1.5 {
        (-0.2, "Mildly overbought")
    } else if z < 2.0 {
        (-0.4, "Overbought")
    } else if z < 2.5 {
        (-0.6, "Strongly overbought")
    } else {
        (-0.8, "Extremely overbought")
    }
}

/// Mean-reversion: blended z-score `0.7·z_long + 0.3·z_short` against the
/// trailing 200-bar and 20-bar means, discretized into nine buckets.
pub fn mean_reversion_signal(bars: &[Bar]) -> StrategySignal {
    if bars.len() < MEAN_REVERSION_MIN_BARS {
        return StrategySignal::insufficient(MEAN_REVERSION);
    }
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let price = *closes.last().unwrap();

    let long_window = &closes[closes.len().saturating_sub(MEAN_REVERSION_LONG_WINDOW)..];
    let short_window = &closes[closes.len() - 20..];

    let z_long = z_score(price, long_window);
    let z_short = z_score(price, short_window);
    let blended = 0.7 * z_long + 0.3 * z_short;

    let (score, label) = z_score_bucket(blended);
    StrategySignal::new(
        MEAN_REVERSION,
        score,
        0.6,
        format!("{label} (z={blended:.2}, long={z_long:.2}, short={z_short:.2})"),
    )
}

fn z_score(value: f64, window: &[f64]) -> f64 {
    let sd = std_dev(window);
    if sd <= f64::EPSILON {
        return 0.0;
    }
    (value - mean(window)) / sd
}

/// Technical: RSI bucket score with volume-surge confirmation.
pub fn technical_signal(bars: &[Bar]) -> StrategySignal {
    if bars.len() < TECHNICAL_MIN_BARS {
        return StrategySignal::insufficient(TECHNICAL);
    }
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let rsi_value = rsi(&closes, 14);

    let (mut score, label) = if rsi_value < 25.0 {
        (0.6, "RSI deeply oversold")
    } else if rsi_value < 35.0 {
        (0.3, "RSI oversold")
    } else if rsi_value > 75.0 {
        (-0.6, "RSI deeply overbought")
    } else if rsi_value > 65.0 {
        (-0.3, "RSI overbought")
    } else {
        (0.0, "RSI neutral")
    };

    let mut parts = vec![format!("{label} ({rsi_value:.1})")];

    // Volume surge confirms the RSI reading in its own direction
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    let avg_volume = mean(&volumes[volumes.len() - 21..volumes.len() - 1]);
    let last_volume = *volumes.last().unwrap();
    if score != 0.0 && avg_volume > 0.0 && last_volume > 1.5 * avg_volume {
        score += 0.2_f64.copysign(score);
        parts.push("volume surge".to_string());
    }

    StrategySignal::new(TECHNICAL, score.clamp(-1.0, 1.0), 0.65, parts.join("; "))
}

/// Sentiment stand-in: a deterministic FNV-1a hash of `symbol + date` mapped
/// into [-0.2, 0.2].
///
/// An explicit pure function of its inputs, not a seeded PRNG, so the same
/// (symbol, date) pair always reproduces the same score.
pub fn sentiment_signal(symbol: &str, date: NaiveDate) -> StrategySignal {
    let key = format!("{symbol}{date}");
    let hash = fnv1a(key.as_bytes());
    let score = ((hash % 401) as i64 - 200) as f64 / 1000.0;
    StrategySignal::new(
        SENTIMENT,
        score,
        0.3,
        format!("Deterministic sentiment proxy ({score:+.3})"),
    )
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bars(count: usize, step: f64) -> Vec<Bar> {
        (0..count)
            .map(|i| {
                let close = 100.0 + i as f64 * step;
                Bar {
                    timestamp: Utc::now() - chrono::Duration::days((count - i) as i64),
                    open: close - 0.2,
                    high: close + 0.5,
                    low: close - 0.5,
                    close,
                    volume: 1_000_000.0,
                    vwap: None,
                }
            })
            .collect()
    }

    #[test]
    fn test_momentum_bullish_in_uptrend() {
        let signal = momentum_signal(&bars(120, 0.8));
        assert!(signal.score > 0.3, "got {}", signal.score);
        assert_eq!(signal.confidence, 0.7);
        assert!((-1.0..=1.0).contains(&signal.score));
    }

    #[test]
    fn test_momentum_bearish_in_downtrend() {
        let signal = momentum_signal(&bars(120, -0.8));
        assert!(signal.score < -0.3, "got {}", signal.score);
    }

    #[test]
    fn test_momentum_insufficient_data() {
        let signal = momentum_signal(&bars(30, 1.0));
        assert_eq!(signal.score, 0.0);
        assert_eq!(signal.confidence, 0.0);
        assert_eq!(signal.reason, "insufficient data");
    }

    #[test]
    fn test_z_score_bucket_extremes() {
        // z = -2.5 lands exactly on the extreme oversold bucket
        let (score, label) = z_score_bucket(-2.5);
        assert_eq!(score, 0.8);
        assert!(label.contains("Extremely oversold"));

        let (score, label) = z_score_bucket(3.1);
        assert_eq!(score, -0.8);
        assert!(label.contains("Extremely overbought"));

        assert_eq!(z_score_bucket(0.0).0, 0.0);
        assert_eq!(z_score_bucket(-1.2).0, 0.2);
        assert_eq!(z_score_bucket(1.7).0, -0.4);
    }

    #[test]
    fn test_mean_reversion_flags_dislocation() {
        // Flat series with a sharp final drop: price far below both means.
        let mut series = bars(100, 0.0);
        let n = series.len();
        series[n - 1].close = 80.0;
        let signal = mean_reversion_signal(&series);
        assert!(signal.score > 0.0, "drop should read oversold, got {}", signal.score);
        assert_eq!(signal.confidence, 0.6);
    }

    #[test]
    fn test_mean_reversion_constant_prices_neutral() {
        let signal = mean_reversion_signal(&bars(100, 0.0));
        assert_eq!(signal.score, 0.0);
        assert!(signal.reason.contains("Neutral"));
    }

    #[test]
    fn test_technical_oversold_with_volume_surge() {
        let mut series = bars(40, -1.0);
        series.last_mut().unwrap().volume = 5_000_000.0;
        let signal = technical_signal(&series);
        assert!(signal.score >= 0.5, "got {}", signal.score);
        assert!(signal.reason.contains("volume surge"));
        assert_eq!(signal.confidence, 0.65);
    }

    #[test]
    fn test_sentiment_deterministic_and_bounded() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let a = sentiment_signal("AAPL", date);
        let b = sentiment_signal("AAPL", date);
        assert_eq!(a.score, b.score);
        assert!((-0.2..=0.2).contains(&a.score));
        assert_eq!(a.confidence, 0.3);

        // Different symbol or date moves the hash
        let c = sentiment_signal("MSFT", date);
        let d = sentiment_signal("AAPL", date.succ_opt().unwrap());
        assert!(a.score != c.score || a.score != d.score);
    }
}
