//! Short-lookback trend and break-of-structure detection

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::helpers::pct_change;
use crate::{
    params::{get_percent, get_period, ParamMeta, ParameterizedDetector},
    Candle, Detector, Percent, Period, Result,
};

/// Trend classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Uptrend,
    Downtrend,
    /// No directional bias; displayed as `none`
    #[default]
    #[serde(rename = "none")]
    Sideways,
}

impl Trend {
    #[inline]
    pub fn is_directional(self) -> bool {
        !matches!(self, Trend::Sideways)
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trend::Uptrend => "uptrend",
            Trend::Downtrend => "downtrend",
            Trend::Sideways => "none",
        })
    }
}

/// Trend state at the latest candle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendReading {
    pub trend: Trend,
    /// Latest candle took out the prior window's extreme in the trend direction
    pub break_of_structure: bool,
    /// Close-to-close change over the lookback, when it could be computed
    pub change_pct: Option<f64>,
}

/// Trend/BoS detector parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendDetector {
    pub lookback: Period,
    /// Minimum absolute change over the lookback to call a trend
    pub threshold_pct: Percent,
}

impl Default for TrendDetector {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(10),
            threshold_pct: Percent::new_const(0.1),
        }
    }
}

impl TrendDetector {
    fn classify(&self, change_pct: f64) -> Trend {
        let threshold = self.threshold_pct.get();
        if change_pct > threshold {
            Trend::Uptrend
        } else if change_pct < -threshold {
            Trend::Downtrend
        } else {
            Trend::Sideways
        }
    }
}

impl Detector for TrendDetector {
    type Output = TrendReading;

    fn min_bars(&self) -> usize {
        self.lookback.get() + 1
    }

    fn detect(&self, candles: &[Candle]) -> TrendReading {
        if candles.len() < self.min_bars() {
            return TrendReading::default();
        }
        let lookback = self.lookback.get();

        let tail = &candles[candles.len() - lookback - 1..];
        let prior = &tail[..lookback];
        let latest = &tail[lookback];

        let Some(change_pct) = pct_change(prior[0].close, latest.close) else {
            tracing::debug!("trend skipped: reference close is zero");
            return TrendReading::default();
        };
        let trend = self.classify(change_pct);

        let break_of_structure = match trend {
            Trend::Uptrend => {
                let prior_high = prior.iter().fold(f64::NEG_INFINITY, |m, c| m.max(c.high));
                latest.high > prior_high
            }
            Trend::Downtrend => {
                let prior_low = prior.iter().fold(f64::INFINITY, |m, c| m.min(c.low));
                latest.low < prior_low
            }
            Trend::Sideways => false,
        };

        tracing::debug!(%trend, break_of_structure, change_pct, "trend evaluated");

        TrendReading {
            trend,
            break_of_structure,
            change_pct: Some(change_pct),
        }
    }
}

impl ParameterizedDetector for TrendDetector {
    fn param_meta() -> &'static [ParamMeta] {
        static PARAMS: [ParamMeta; 2] = [
            ParamMeta::period("lookback", 10.0, (5.0, 30.0, 5.0), "Candles in the trend window"),
            ParamMeta::percent(
                "threshold_pct",
                0.1,
                (0.05, 0.5, 0.05),
                "Change needed to call a trend",
            ),
        ];
        &PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            lookback: get_period(params, "lookback", 10)?,
            threshold_pct: get_percent(params, "threshold_pct", 0.1)?,
        })
    }
}
