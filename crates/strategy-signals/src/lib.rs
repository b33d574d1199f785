pub mod combiner;
pub mod daily;
pub mod intraday;

pub use combiner::*;
pub use daily::*;
pub use intraday::*;

use chrono::{DateTime, NaiveDate, Utc};
use sim_core::{Bar, DailyWeights, RegimeWeightTable, SignalFamily, SignalSnapshot};

/// Evaluate the daily swing family for one symbol at one date and combine
/// with fixed weights. The pre-computation entry point for daily mode.
pub fn evaluate_daily(
    symbol: &str,
    date: NaiveDate,
    timestamp: DateTime<Utc>,
    bars: &[Bar],
    weights: &DailyWeights,
) -> SignalSnapshot {
    let sentiment = if bars.len() < SENTIMENT_MIN_BARS {
        sim_core::StrategySignal::insufficient(SENTIMENT)
    } else {
        sentiment_signal(symbol, date)
    };
    let set = DailySignalSet {
        momentum: momentum_signal(bars),
        mean_reversion: mean_reversion_signal(bars),
        technical: technical_signal(bars),
        sentiment,
    };
    let combined = combine_daily(&set, weights);
    SignalSnapshot {
        symbol: symbol.to_string(),
        timestamp,
        family: SignalFamily::Daily,
        signals: set.into_vec(),
        combined,
        recommendation: daily_recommendation(combined),
    }
}

/// Evaluate the intraday regime family for one symbol. The regime is
/// classified from trailing daily bars, the four strategies run over the
/// intraday history, and the groups are combined with regime-dependent
/// weights.
pub fn evaluate_regime(
    symbol: &str,
    timestamp: DateTime<Utc>,
    daily_bars: &[Bar],
    intraday_bars: &[Bar],
    session_bars: &[Bar],
    table: &RegimeWeightTable,
) -> SignalSnapshot {
    let regime = regime_detector::classify(daily_bars);
    let set = RegimeSignalSet {
        trend_momentum: trend_momentum_signal(intraday_bars),
        macd_trend: macd_trend_signal(intraday_bars),
        bb_rsi_reversion: bb_rsi_reversion_signal(intraday_bars),
        vwap_reversion: vwap_reversion_signal(session_bars),
    };
    let combined = combine_regime(&set, table.for_regime(regime));
    SignalSnapshot {
        symbol: symbol.to_string(),
        timestamp,
        family: SignalFamily::Regime,
        signals: set.into_vec(),
        combined,
        recommendation: regime_recommendation(combined),
    }
}
