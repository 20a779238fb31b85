//! Impulse detection
//!
//! An impulse is a run of two or three candles ending at the last candle of the slice
//! whose net move is large, whose bodies dominate their wicks, and which all point the same
//! way. Run lengths are tried shortest first; the first qualifying length is reported.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::helpers::{mean_body_ratio, pct_change};
use crate::{
    params::{get_percent, get_period, ParamMeta, ParameterizedDetector},
    AnalysisError, Candle, Detector, OhlcExt, Percent, Period, Result,
};

/// Direction of a move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    fn of(net_move: f64) -> Self {
        if net_move > 0.0 {
            Direction::Bullish
        } else if net_move < 0.0 {
            Direction::Bearish
        } else {
            Direction::Neutral
        }
    }

    #[inline]
    fn sign(self) -> f64 {
        match self {
            Direction::Bullish => 1.0,
            Direction::Neutral => 0.0,
            Direction::Bearish => -1.0,
        }
    }
}

/// The run that qualified as an impulse
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpulseRun {
    pub direction: Direction,
    /// Number of candles in the run
    pub len: usize,
    pub start_index: usize,
    pub end_index: usize,
    /// Signed change from the first open to the last close
    pub change_pct: f64,
    pub mean_body_ratio: f64,
}

/// Impulse detector parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpulseDetector {
    /// Shortest run tried
    pub min_candles_consecutive: Period,
    /// Longest run tried
    pub max_candles_total: Period,
    /// Minimum absolute move from first open to last close
    pub min_total_pct_change: Percent,
    /// Minimum mean body ratio across the run
    pub min_body_pct: Percent,
}

impl Default for ImpulseDetector {
    fn default() -> Self {
        Self {
            min_candles_consecutive: Period::new_const(2),
            max_candles_total: Period::new_const(3),
            min_total_pct_change: Percent::new_const(1.5),
            min_body_pct: Percent::new_const(60.0),
        }
    }
}

impl ImpulseDetector {
    /// True if any run length qualifies
    #[inline]
    pub fn is_impulse(&self, candles: &[Candle]) -> bool {
        self.detect(candles).is_some()
    }

    /// Check the trailing `n` candles as a single run
    fn run_of(&self, candles: &[Candle], n: usize) -> Option<ImpulseRun> {
        let start = candles.len().checked_sub(n)?;
        let run = &candles[start..];

        let first_open = run[0].open;
        let last_close = run[n - 1].close;

        // zero first open skips this length
        let change_pct = pct_change(first_open, last_close)?;
        if change_pct.abs() < self.min_total_pct_change.get() {
            return None;
        }

        let mean_body_ratio = mean_body_ratio(run);
        if mean_body_ratio < self.min_body_pct.get() {
            return None;
        }

        let direction = Direction::of(last_close - first_open);
        let sign = direction.sign();
        if !run.iter().all(|c| c.net_move() * sign >= 0.0) {
            return None;
        }

        Some(ImpulseRun {
            direction,
            len: n,
            start_index: start,
            end_index: candles.len() - 1,
            change_pct,
            mean_body_ratio,
        })
    }
}

impl Detector for ImpulseDetector {
    type Output = Option<ImpulseRun>;

    fn min_bars(&self) -> usize {
        self.min_candles_consecutive.get()
    }

    fn detect(&self, candles: &[Candle]) -> Option<ImpulseRun> {
        if candles.len() < self.min_bars() {
            return None;
        }
        let found = (self.min_candles_consecutive.get()..=self.max_candles_total.get())
            .find_map(|n| self.run_of(candles, n));

        if let Some(run) = &found {
            tracing::debug!(
                direction = ?run.direction,
                len = run.len,
                change_pct = run.change_pct,
                mean_body_ratio = run.mean_body_ratio,
                "impulse detected"
            );
        }
        found
    }

    fn validate_config(&self) -> Result<()> {
        if self.min_candles_consecutive > self.max_candles_total {
            return Err(AnalysisError::InvalidConfig(format!(
                "min_candles_consecutive ({}) exceeds max_candles_total ({})",
                self.min_candles_consecutive.get(),
                self.max_candles_total.get()
            )));
        }
        Ok(())
    }
}

impl ParameterizedDetector for ImpulseDetector {
    fn param_meta() -> &'static [ParamMeta] {
        static PARAMS: [ParamMeta; 4] = [
            ParamMeta::period(
                "min_candles_consecutive",
                2.0,
                (1.0, 3.0, 1.0),
                "Shortest run length tried",
            ),
            ParamMeta::period("max_candles_total", 3.0, (2.0, 6.0, 1.0), "Longest run length tried"),
            ParamMeta::percent(
                "min_total_pct_change",
                1.5,
                (0.5, 3.0, 0.25),
                "Net move from first open to last close",
            ),
            ParamMeta::percent("min_body_pct", 60.0, (40.0, 90.0, 5.0), "Mean body share of range"),
        ];
        &PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let detector = Self {
            min_candles_consecutive: get_period(params, "min_candles_consecutive", 2)?,
            max_candles_total: get_period(params, "max_candles_total", 3)?,
            min_total_pct_change: get_percent(params, "min_total_pct_change", 1.5)?,
            min_body_pct: get_percent(params, "min_body_pct", 60.0)?,
        };
        detector.validate_config()?;
        Ok(detector)
    }
}
