//! Intraday regime family: two trend strategies and two reversion
//! strategies, combined with regime-dependent group weights.

use crate::daily::z_score_bucket;
use sim_core::{Bar, StrategySignal};
use technical_indicators::{bollinger, macd, rate_of_change, rsi, session_vwap, sma};

pub const TREND_MOMENTUM: &str = "trend_momentum";
pub const MACD_TREND: &str = "macd_trend";
pub const BB_RSI_REVERSION: &str = "bb_rsi_reversion";
pub const VWAP_REVERSION: &str = "vwap_reversion";

const TREND_MOMENTUM_MIN_BARS: usize = 50;
const MACD_TREND_MIN_BARS: usize = 36;
const BB_RSI_MIN_BARS: usize = 21;
/// Session-relative strategies need at least this many intraday bars.
pub const VWAP_MIN_SESSION_BARS: usize = 12;

/// Group A: SMA-10/20/50 alignment, 20-bar rate-of-change, 50-bar breakout
/// proximity, and SMA-20 slope.
pub fn trend_momentum_signal(bars: &[Bar]) -> StrategySignal {
    if bars.len() < TREND_MOMENTUM_MIN_BARS {
        return StrategySignal::insufficient(TREND_MOMENTUM);
    }
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let price = *closes.last().unwrap();

    let (sma10, sma20, sma50) = match (sma(&closes, 10), sma(&closes, 20), sma(&closes, 50)) {
        (Some(a), Some(b), Some(c)) => (a, b, c),
        _ => return StrategySignal::insufficient(TREND_MOMENTUM),
    };

    let mut score = 0.0;
    let mut parts: Vec<String> = Vec::new();

    if sma10 > sma20 && sma20 > sma50 {
        score += 0.35;
        parts.push("bullish SMA alignment".to_string());
    } else if sma10 < sma20 && sma20 < sma50 {
        score -= 0.35;
        parts.push("bearish SMA alignment".to_string());
    } else if sma10 > sma20 {
        score += 0.15;
        parts.push("short-term strength".to_string());
    } else if sma10 < sma20 {
        score -= 0.15;
        parts.push("short-term weakness".to_string());
    }

    if let Some(roc20) = rate_of_change(&closes, 20) {
        score += (roc20 / 20.0).clamp(-0.25, 0.25);
        parts.push(format!("ROC20 {roc20:.2}%"));
    }

    // Breakout proximity against the trailing 50-bar range
    let window = &bars[bars.len() - 50..];
    let high50 = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let low50 = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    if price >= high50 * 0.995 {
        score += 0.25;
        parts.push("near 50-bar high".to_string());
    } else if price <= low50 * 1.005 {
        score -= 0.25;
        parts.push("near 50-bar low".to_string());
    }

    // SMA-20 slope over the last 5 bars
    if let Some(prev_sma20) = sma(&closes[..closes.len() - 5], 20) {
        if sma20 > prev_sma20 {
            score += 0.15;
            parts.push("rising SMA20".to_string());
        } else if sma20 < prev_sma20 {
            score -= 0.15;
            parts.push("falling SMA20".to_string());
        }
    }

    StrategySignal::new(TREND_MOMENTUM, score.clamp(-1.0, 1.0), 0.7, parts.join("; "))
}

/// Group A: MACD histogram sign, slope, and zero-line crossover.
pub fn macd_trend_signal(bars: &[Bar]) -> StrategySignal {
    if bars.len() < MACD_TREND_MIN_BARS {
        return StrategySignal::insufficient(MACD_TREND);
    }
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let out = match macd(&closes) {
        Some(o) => o,
        None => return StrategySignal::insufficient(MACD_TREND),
    };

    let mut score: f64 = 0.0;
    let mut parts: Vec<String> = Vec::new();

    if out.histogram > 0.0 {
        score += 0.3;
        parts.push("histogram positive".to_string());
    } else if out.histogram < 0.0 {
        score -= 0.3;
        parts.push("histogram negative".to_string());
    }

    if out.histogram > out.prev_histogram {
        score += 0.2;
        parts.push("histogram rising".to_string());
    } else if out.histogram < out.prev_histogram {
        score -= 0.2;
        parts.push("histogram falling".to_string());
    }

    if out.prev_histogram <= 0.0 && out.histogram > 0.0 {
        score += 0.3;
        parts.push("bullish crossover".to_string());
    } else if out.prev_histogram >= 0.0 && out.histogram < 0.0 {
        score -= 0.3;
        parts.push("bearish crossover".to_string());
    }

    StrategySignal::new(MACD_TREND, score.clamp(-1.0, 1.0), 0.6, parts.join("; "))
}

/// Group B: Bollinger band breach graded by RSI extremity.
///
/// A band breach alone is worth ±0.2; an extreme RSI in agreement grades it
/// up to ±0.8. Bandwidth under 1% is too narrow to trade and the strategy
/// abstains (zero confidence).
pub fn bb_rsi_reversion_signal(bars: &[Bar]) -> StrategySignal {
    if bars.len() < BB_RSI_MIN_BARS {
        return StrategySignal::insufficient(BB_RSI_REVERSION);
    }
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let price = *closes.last().unwrap();

    let bands = match bollinger(&closes, 20, 2.0) {
        Some(b) => b,
        None => return StrategySignal::insufficient(BB_RSI_REVERSION),
    };
    if bands.bandwidth < 0.01 {
        return StrategySignal::new(
            BB_RSI_REVERSION,
            0.0,
            0.0,
            format!("bandwidth {:.2}% too narrow to trade", bands.bandwidth * 100.0),
        );
    }

    let rsi_value = rsi(&closes, 14);
    let (score, reason) = if price < bands.lower {
        let graded = if rsi_value < 20.0 {
            0.8
        } else if rsi_value < 30.0 {
            0.6
        } else if rsi_value < 40.0 {
            0.4
        } else {
            0.2
        };
        (graded, format!("below lower band, RSI {rsi_value:.1}"))
    } else if price > bands.upper {
        let graded = if rsi_value > 80.0 {
            -0.8
        } else if rsi_value > 70.0 {
            -0.6
        } else if rsi_value > 60.0 {
            -0.4
        } else {
            -0.2
        };
        (graded, format!("above upper band, RSI {rsi_value:.1}"))
    } else {
        (0.0, "within bands".to_string())
    };

    StrategySignal::new(BB_RSI_REVERSION, score, 0.7, reason)
}

/// Group B: session VWAP z-score through the shared nine-bucket map.
///
/// Confidence grows with session depth, capped at 0.8.
pub fn vwap_reversion_signal(session_bars: &[Bar]) -> StrategySignal {
    if session_bars.len() < VWAP_MIN_SESSION_BARS {
        return StrategySignal::insufficient(VWAP_REVERSION);
    }
    let out = match session_vwap(session_bars) {
        Some(o) => o,
        None => return StrategySignal::insufficient(VWAP_REVERSION),
    };

    let (score, label) = z_score_bucket(out.z_score);
    let confidence = (0.2 + 0.01 * out.bar_count as f64).min(0.8);

    StrategySignal::new(
        VWAP_REVERSION,
        score,
        confidence,
        format!("{label} vs VWAP (z={:.2})", out.z_score),
    )
}
