use sim_core::{Bar, MarketRegime};
use technical_indicators::{adx, sma};

/// Minimum daily bars before a classification is attempted.
pub const MIN_BARS: usize = 60;

/// ADX level separating trending from range-bound markets.
const ADX_TREND_THRESHOLD: f64 = 25.0;

/// Classify the current market regime from trailing daily bars.
///
/// Intentionally stateless: recomputed every evaluation tick with no
/// hysteresis, so two calls with the same bars always agree.
///
/// Decision rule: `ADX > 25` and SMA-20 above SMA-50 is a confirmed uptrend,
/// below is a confirmed downtrend; `ADX <= 25` is range-bound. Fewer than 60
/// bars, or any indicator unavailable, yields `Unknown`.
pub fn classify(bars: &[Bar]) -> MarketRegime {
    if bars.len() < MIN_BARS {
        return MarketRegime::Unknown;
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let (adx_value, sma20, sma50) = match (adx(bars, 14), sma(&closes, 20), sma(&closes, 50)) {
        (Some(a), Some(s20), Some(s50)) => (a, s20, s50),
        _ => return MarketRegime::Unknown,
    };

    if adx_value > ADX_TREND_THRESHOLD {
        if sma20 > sma50 {
            MarketRegime::TrendingUp
        } else {
            MarketRegime::TrendingDown
        }
    } else {
        MarketRegime::RangeBound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn trend_bars(count: usize, step: f64) -> Vec<Bar> {
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

    fn choppy_bars(count: usize) -> Vec<Bar> {
        (0..count)
            .map(|i| {
                let close = 100.0 + if i % 2 == 0 { 1.0 } else { -1.0 };
                Bar {
                    timestamp: Utc::now() - chrono::Duration::days((count - i) as i64),
                    open: 100.0,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000_000.0,
                    vwap: None,
                }
            })
            .collect()
    }

    #[test]
    fn test_uptrend_classification() {
        assert_eq!(classify(&trend_bars(90, 1.0)), MarketRegime::TrendingUp);
    }

    #[test]
    fn test_downtrend_classification() {
        assert_eq!(classify(&trend_bars(90, -1.0)), MarketRegime::TrendingDown);
    }

    #[test]
    fn test_range_bound_classification() {
        assert_eq!(classify(&choppy_bars(90)), MarketRegime::RangeBound);
    }

    #[test]
    fn test_insufficient_bars_is_unknown() {
        assert_eq!(classify(&trend_bars(59, 1.0)), MarketRegime::Unknown);
        assert_eq!(classify(&[]), MarketRegime::Unknown);
    }

    #[test]
    fn test_stateless_and_repeatable() {
        let bars = trend_bars(90, 0.8);
        assert_eq!(classify(&bars), classify(&bars));
    }
}
