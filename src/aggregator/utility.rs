/// `part / total` as a percentage. Returns 0.0 when `total` is zero.
pub fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Rounds half away from zero to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// [`pct`] rounded to two decimals, the form every rate is reported in.
pub fn rate_percent(part: usize, total: usize) -> f64 {
    round2(pct(part, total))
}
