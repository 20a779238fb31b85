//! Slice arithmetic shared by the detectors

use crate::Candle;

/// Highest high and lowest low over a slice.
///
/// NaN prices are skipped. Returns `None` for an empty slice or when no finite extreme
/// exists.
#[inline]
pub fn window_extremes(candles: &[Candle]) -> Option<(f64, f64)> {
    let (high, low) = candles
        .iter()
        .fold((f64::NEG_INFINITY, f64::INFINITY), |(h, l), c| {
            (h.max(c.high), l.min(c.low))
        });
    (high.is_finite() && low.is_finite()).then_some((high, low))
}

/// Percentage change from `from` to `to`. `None` when `from` is zero or the result is
/// not finite.
#[inline]
pub fn pct_change(from: f64, to: f64) -> Option<f64> {
    if from == 0.0 {
        return None;
    }
    let change = (to - from) / from * 100.0;
    change.is_finite().then_some(change)
}

/// Mean of the precomputed body ratios, zero for an empty slice
#[inline]
pub fn mean_body_ratio(candles: &[Candle]) -> f64 {
    if candles.is_empty() {
        return 0.0;
    }
    candles.iter().map(|c| c.metrics.body_ratio).sum::<f64>() / candles.len() as f64
}
