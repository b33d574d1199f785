use sim_core::math::{mean, std_dev};
use sim_core::Bar;

/// Simple Moving Average over the trailing `period` values.
///
/// Returns `None` when the input is shorter than the lookback — callers treat
/// this as "no opinion," never as an error.
pub fn sma(data: &[f64], period: usize) -> Option<f64> {
    if period == 0 || data.len() < period {
        return None;
    }
    let window = &data[data.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Exponential Moving Average, seeded with the simple average of the first
/// `period` values, then the standard recursion with multiplier `2/(period+1)`.
pub fn ema(data: &[f64], period: usize) -> Option<f64> {
    ema_series(data, period).and_then(|s| s.last().copied())
}

fn ema_series(data: &[f64], period: usize) -> Option<Vec<f64>> {
    if period == 0 || data.len() < period {
        return None;
    }
    let multiplier = 2.0 / (period as f64 + 1.0);
    let seed = data[..period].iter().sum::<f64>() / period as f64;

    let mut result = Vec::with_capacity(data.len() - period + 1);
    result.push(seed);
    for &value in &data[period..] {
        let prev = *result.last().unwrap();
        result.push((value - prev) * multiplier + prev);
    }
    Some(result)
}

/// Relative Strength Index over the trailing window (simple averages).
///
/// Returns the neutral value 50.0 when there is insufficient history,
/// exactly 100.0 when the average loss is zero, and 0.0 when the average
/// gain is zero while losses exist. Never divides by zero.
pub fn rsi(data: &[f64], period: usize) -> f64 {
    if period == 0 || data.len() < period + 1 {
        return 50.0;
    }

    let window = &data[data.len() - period - 1..];
    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;
    for pair in window.windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            gain_sum += change;
        } else {
            loss_sum += change.abs();
        }
    }

    let avg_gain = gain_sum / period as f64;
    let avg_loss = loss_sum / period as f64;

    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// MACD (12/26/9) evaluated at the latest bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdOutput {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
    /// Previous bar's histogram value, for slope and crossover detection.
    pub prev_histogram: f64,
}

pub fn macd(data: &[f64]) -> Option<MacdOutput> {
    macd_with(data, 12, 26, 9)
}

pub fn macd_with(
    data: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> Option<MacdOutput> {
    if fast_period == 0 || slow_period <= fast_period || signal_period == 0 {
        return None;
    }
    if data.len() < slow_period + signal_period {
        return None;
    }

    let ema_fast = ema_series(data, fast_period)?;
    let ema_slow = ema_series(data, slow_period)?;

    // Fast series starts earlier; align on the slow series' first index.
    let offset = slow_period - fast_period;
    let macd_line: Vec<f64> = ema_slow
        .iter()
        .enumerate()
        .map(|(i, slow)| ema_fast[i + offset] - slow)
        .collect();

    let signal_line = ema_series(&macd_line, signal_period)?;
    let hist_offset = macd_line.len() - signal_line.len();
    let histogram: Vec<f64> = signal_line
        .iter()
        .enumerate()
        .map(|(i, sig)| macd_line[i + hist_offset] - sig)
        .collect();

    let last = *histogram.last()?;
    let prev = if histogram.len() >= 2 {
        histogram[histogram.len() - 2]
    } else {
        last
    };

    Some(MacdOutput {
        macd: *macd_line.last()?,
        signal: *signal_line.last()?,
        histogram: last,
        prev_histogram: prev,
    })
}

/// Bollinger Bands over the trailing window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerOutput {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    /// `2 * mult * sigma / mean`. Below 0.01 the band is too narrow to trade.
    pub bandwidth: f64,
}

pub fn bollinger(data: &[f64], period: usize, mult: f64) -> Option<BollingerOutput> {
    if period == 0 || data.len() < period {
        return None;
    }
    let window = &data[data.len() - period..];
    let middle = mean(window);
    if middle <= 0.0 {
        return None;
    }
    let sigma = std_dev(window);
    Some(BollingerOutput {
        upper: middle + mult * sigma,
        middle,
        lower: middle - mult * sigma,
        bandwidth: 2.0 * mult * sigma / middle,
    })
}

/// Average True Range: mean of `max(high-low, |high-prevClose|, |low-prevClose|)`
/// over the trailing `period` true ranges. Needs `period + 1` bars.
pub fn atr(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }
    let window = &bars[bars.len() - period - 1..];
    let sum: f64 = window
        .windows(2)
        .map(|pair| true_range(&pair[1], &pair[0]))
        .sum();
    Some(sum / period as f64)
}

fn true_range(bar: &Bar, prev: &Bar) -> f64 {
    let high_low = bar.high - bar.low;
    let high_close = (bar.high - prev.close).abs();
    let low_close = (bar.low - prev.close).abs();
    high_low.max(high_close).max(low_close)
}

/// Average Directional Index with Wilder smoothing.
///
/// Requires at least `2 * period + 1` bars; used only for regime classification.
pub fn adx(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period * 2 + 1 {
        return None;
    }

    let mut plus_dm = Vec::with_capacity(bars.len() - 1);
    let mut minus_dm = Vec::with_capacity(bars.len() - 1);
    let mut tr = Vec::with_capacity(bars.len() - 1);

    for pair in bars.windows(2) {
        let (prev, bar) = (&pair[0], &pair[1]);
        let up_move = bar.high - prev.high;
        let down_move = prev.low - bar.low;

        plus_dm.push(if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        });
        minus_dm.push(if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        });
        tr.push(true_range(bar, prev));
    }

    let mut smoothed_plus = plus_dm[..period].iter().sum::<f64>();
    let mut smoothed_minus = minus_dm[..period].iter().sum::<f64>();
    let mut smoothed_tr = tr[..period].iter().sum::<f64>();

    let mut dx_values = Vec::new();
    for i in period..plus_dm.len() {
        smoothed_plus = smoothed_plus - smoothed_plus / period as f64 + plus_dm[i];
        smoothed_minus = smoothed_minus - smoothed_minus / period as f64 + minus_dm[i];
        smoothed_tr = smoothed_tr - smoothed_tr / period as f64 + tr[i];

        let pdi = if smoothed_tr > 0.0 {
            100.0 * smoothed_plus / smoothed_tr
        } else {
            0.0
        };
        let mdi = if smoothed_tr > 0.0 {
            100.0 * smoothed_minus / smoothed_tr
        } else {
            0.0
        };

        let di_sum = pdi + mdi;
        dx_values.push(if di_sum > 0.0 {
            100.0 * (pdi - mdi).abs() / di_sum
        } else {
            0.0
        });
    }

    if dx_values.len() < period {
        return None;
    }

    let mut adx_val = dx_values[..period].iter().sum::<f64>() / period as f64;
    for &dx in &dx_values[period..] {
        adx_val = (adx_val * (period - 1) as f64 + dx) / period as f64;
    }
    Some(adx_val)
}

/// Rate of change: `(price[t] - price[t-n]) / price[t-n] * 100`.
pub fn rate_of_change(data: &[f64], period: usize) -> Option<f64> {
    if period == 0 || data.len() < period + 1 {
        return None;
    }
    let current = data[data.len() - 1];
    let past = data[data.len() - 1 - period];
    if past == 0.0 {
        return None;
    }
    Some((current - past) / past * 100.0)
}

/// Session VWAP plus the z-score of the latest typical price around it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VwapOutput {
    pub vwap: f64,
    /// Deviation of the latest typical price from VWAP, in standard
    /// deviations of the session's typical prices. 0.0 on zero volume or
    /// zero variance (neutral, never NaN).
    pub z_score: f64,
    pub bar_count: usize,
}

pub fn session_vwap(bars: &[Bar]) -> Option<VwapOutput> {
    if bars.is_empty() {
        return None;
    }

    let typical: Vec<f64> = bars.iter().map(|b| (b.high + b.low + b.close) / 3.0).collect();
    let cumulative_volume: f64 = bars.iter().map(|b| b.volume).sum();
    let last_typical = *typical.last().unwrap();

    if cumulative_volume <= 0.0 {
        return Some(VwapOutput {
            vwap: last_typical,
            z_score: 0.0,
            bar_count: bars.len(),
        });
    }

    let cumulative_tpv: f64 = bars
        .iter()
        .zip(&typical)
        .map(|(b, tp)| tp * b.volume)
        .sum();
    let vwap = cumulative_tpv / cumulative_volume;

    let variance =
        typical.iter().map(|tp| (tp - vwap).powi(2)).sum::<f64>() / typical.len() as f64;
    let sigma = variance.sqrt();

    let z_score = if sigma > 0.0 {
        (last_typical - vwap) / sigma
    } else {
        0.0
    };

    Some(VwapOutput {
        vwap,
        z_score,
        bar_count: bars.len(),
    })
}
