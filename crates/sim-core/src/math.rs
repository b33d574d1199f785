/// Shared numeric helpers used by indicators, strategies, and metrics.

/// Mean of a slice; 0.0 for empty input.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation; 0.0 when fewer than two values.
pub fn std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64;
    variance.sqrt()
}

/// Sample standard deviation (Bessel's correction); 0.0 when fewer than two values.
pub fn sample_std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    variance.sqrt()
}

/// Round to 4 decimal places (fractional share precision).
pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Round to 2 decimal places (weight smoothing precision).
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Round down to 4 decimal places. Used when sizing against a hard cash
/// cap, where rounding to nearest could overdraw.
pub fn floor4(x: f64) -> f64 {
    (x * 10_000.0).floor() / 10_000.0
}
