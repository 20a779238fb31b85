//! Consolidation range detection
//!
//! Sliding-window search for the most recent support/resistance box. Windows are tried from
//! the one ending at the latest candle backward; the first window passing every check wins.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::helpers::window_extremes;
use crate::{
    params::{get_percent, get_period, ParamMeta, ParameterizedDetector},
    AnalysisError, Candle, Detector, Percent, Period, Result,
};

/// A detected consolidation box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeWindow {
    pub high: f64,
    pub low: f64,
    /// (high - low) / midpoint * 100
    pub width_pct: f64,
    /// First candle of the window (inclusive)
    pub start_index: usize,
    /// Last candle of the window (inclusive)
    pub end_index: usize,
}

impl RangeWindow {
    #[inline]
    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    #[inline]
    pub fn len(&self) -> usize {
        (self.end_index + 1).saturating_sub(self.start_index)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end_index < self.start_index
    }
}

/// Range detector parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeDetector {
    /// Window length in candles
    pub min_candles: Period,
    /// Touches required on each side
    pub min_touches: Period,
    pub width_min_pct: Percent,
    pub width_max_pct: Percent,
    /// Distance from an extreme, as percent of that extreme, that still counts as a touch
    pub touch_tolerance_pct: Percent,
    /// Central share of the box that is not an entry zone
    pub midrange_pct: Percent,
}

impl Default for RangeDetector {
    fn default() -> Self {
        Self {
            min_candles: Period::new_const(15),
            min_touches: Period::new_const(2),
            width_min_pct: Percent::new_const(0.7),
            width_max_pct: Percent::new_const(3.0),
            touch_tolerance_pct: Percent::new_const(1.0),
            midrange_pct: Percent::new_const(30.0),
        }
    }
}

impl RangeDetector {
    /// Evaluate the window of `min_candles` starting at `start`
    pub fn window_at(&self, candles: &[Candle], start: usize) -> Option<RangeWindow> {
        let len = self.min_candles.get();
        let window = candles.get(start..start.checked_add(len)?)?;

        let (high, low) = window_extremes(window)?;
        if high <= low {
            return None;
        }

        let tol = self.touch_tolerance_pct.fraction();
        let high_tol = high * tol;
        let low_tol = low * tol;

        let resistance_touches = window.iter().filter(|c| c.high >= high - high_tol).count();
        let support_touches = window.iter().filter(|c| c.low <= low + low_tol).count();
        let min_touches = self.min_touches.get();
        if resistance_touches < min_touches || support_touches < min_touches {
            tracing::trace!(
                start,
                resistance_touches,
                support_touches,
                "range window rejected: touches"
            );
            return None;
        }

        let midpoint = (high + low) / 2.0;
        if midpoint == 0.0 {
            return None;
        }
        let width_pct = (high - low) / midpoint * 100.0;
        if width_pct < self.width_min_pct.get() || width_pct > self.width_max_pct.get() {
            tracing::trace!(start, width_pct, "range window rejected: width");
            return None;
        }

        // The box must still hold at the window's end
        let last_close = window[len - 1].close;
        let upper = high * (1.0 + tol);
        let lower = low * (1.0 - tol);
        if !(lower..=upper).contains(&last_close) {
            tracing::trace!(start, last_close, "range window rejected: closed outside");
            return None;
        }

        Some(RangeWindow {
            high,
            low,
            width_pct,
            start_index: start,
            end_index: start + len - 1,
        })
    }

    /// Whether `price` sits in one of the outer bands of `window`
    pub fn in_entry_zone(&self, window: &RangeWindow, price: f64) -> bool {
        let width = window.width();
        if width <= 0.0 {
            return false;
        }
        let band = width * (100.0 - self.midrange_pct.get()) / 2.0 / 100.0;
        price < window.low + band || price > window.high - band
    }
}

impl Detector for RangeDetector {
    type Output = Option<RangeWindow>;

    fn min_bars(&self) -> usize {
        self.min_candles.get()
    }

    fn detect(&self, candles: &[Candle]) -> Option<RangeWindow> {
        let len = self.min_bars();
        if candles.len() < len {
            return None;
        }

        let found = (0..=candles.len() - len)
            .rev()
            .find_map(|start| self.window_at(candles, start));

        if let Some(w) = &found {
            tracing::debug!(
                high = w.high,
                low = w.low,
                width_pct = w.width_pct,
                start = w.start_index,
                end = w.end_index,
                "range detected"
            );
        }
        found
    }

    fn validate_config(&self) -> Result<()> {
        if self.width_min_pct > self.width_max_pct {
            return Err(AnalysisError::InvalidConfig(format!(
                "width_min_pct ({}) exceeds width_max_pct ({})",
                self.width_min_pct.get(),
                self.width_max_pct.get()
            )));
        }
        if self.min_touches > self.min_candles {
            return Err(AnalysisError::InvalidConfig(format!(
                "min_touches ({}) exceeds min_candles ({})",
                self.min_touches.get(),
                self.min_candles.get()
            )));
        }
        Ok(())
    }
}

impl ParameterizedDetector for RangeDetector {
    fn param_meta() -> &'static [ParamMeta] {
        static PARAMS: [ParamMeta; 6] = [
            ParamMeta::period("min_candles", 15.0, (10.0, 30.0, 5.0), "Window length in candles"),
            ParamMeta::period("min_touches", 2.0, (1.0, 4.0, 1.0), "Touches required per side"),
            ParamMeta::percent("width_min_pct", 0.7, (0.3, 1.5, 0.1), "Narrowest accepted box"),
            ParamMeta::percent("width_max_pct", 3.0, (2.0, 6.0, 0.5), "Widest accepted box"),
            ParamMeta::percent(
                "touch_tolerance_pct",
                1.0,
                (0.25, 2.0, 0.25),
                "Touch distance as percent of the extreme",
            ),
            ParamMeta::percent("midrange_pct", 30.0, (10.0, 60.0, 10.0), "Central no-entry share"),
        ];
        &PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let detector = Self {
            min_candles: get_period(params, "min_candles", 15)?,
            min_touches: get_period(params, "min_touches", 2)?,
            width_min_pct: get_percent(params, "width_min_pct", 0.7)?,
            width_max_pct: get_percent(params, "width_max_pct", 3.0)?,
            touch_tolerance_pct: get_percent(params, "touch_tolerance_pct", 1.0)?,
            midrange_pct: get_percent(params, "midrange_pct", 30.0)?,
        };
        detector.validate_config()?;
        Ok(detector)
    }
}
