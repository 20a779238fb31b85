//! Decision engine
//!
//! Runs the detectors in a fixed priority order and records which facts were observed:
//!
//! 1. A live range with the latest close in an outer band and no impulse right before the
//!    range started: **Limit Catch Entry**.
//! 2. Otherwise a directional trend whose latest candle breaks structure without a current
//!    impulse: **In-Price Entry**.
//! 3. Otherwise **No Entry**.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    detectors::{ImpulseDetector, RangeDetector, RangeWindow, Trend, TrendDetector, TrendReading},
    AnalysisError, Candle, CandleSeries, DataError, Detector, RawCandle, Result,
};

// ============================================================
// CONFIGURATION
// ============================================================

/// Every threshold the analyzer uses. Immutable once bound into an [`Analyzer`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub range: RangeDetector,
    pub impulse: ImpulseDetector,
    pub trend: TrendDetector,
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<()> {
        self.range.validate_config()?;
        self.impulse.validate_config()?;
        self.trend.validate_config()?;
        Ok(())
    }

    /// Smallest series a caller should submit
    #[inline]
    pub fn min_candles(&self) -> usize {
        self.range.min_candles.get()
    }
}

// ============================================================
// RESULT TYPES
// ============================================================

/// Final classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntrySignal {
    #[serde(rename = "Limit Catch Entry")]
    LimitCatch,
    #[serde(rename = "In-Price Entry")]
    InPrice,
    #[serde(rename = "No Entry")]
    NoEntry,
}

impl EntrySignal {
    pub fn label(self) -> &'static str {
        match self {
            EntrySignal::LimitCatch => "Limit Catch Entry",
            EntrySignal::InPrice => "In-Price Entry",
            EntrySignal::NoEntry => "No Entry",
        }
    }
}

impl fmt::Display for EntrySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One observation made while classifying
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "fact", rename_all = "snake_case")]
pub enum Fact {
    RangeDetected { low: f64, high: f64, width_pct: f64 },
    EntryZoneWithoutPriorImpulse,
    Conditions {
        trend: Trend,
        break_of_structure: bool,
        impulse: bool,
    },
    TrendBreakWithoutImpulse,
}

/// Booleans rendered the way downstream displays expect them
fn title_bool(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fact::RangeDetected {
                low,
                high,
                width_pct,
            } => write!(
                f,
                "Range detected ({low:.2}-{high:.2}, Width: {width_pct:.2}%)"
            ),
            Fact::EntryZoneWithoutPriorImpulse => {
                f.write_str("Price in entry zone with no prior impulse")
            }
            Fact::Conditions {
                trend,
                break_of_structure,
                impulse,
            } => write!(
                f,
                "Trend: {trend}, BoS: {}, Impulse: {}",
                title_bool(*break_of_structure),
                title_bool(*impulse)
            ),
            Fact::TrendBreakWithoutImpulse => f.write_str("Trend with BoS and no current impulse"),
        }
    }
}

/// Ordered list of facts; renders as the facts joined by ". "
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reason(Vec<Fact>);

impl Reason {
    #[inline]
    pub fn facts(&self) -> &[Fact] {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, fact: Fact) {
        self.0.push(fact);
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("No patterns detected");
        }
        for (i, fact) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(". ")?;
            }
            write!(f, "{fact}")?;
        }
        Ok(())
    }
}

/// Outcome of one analysis call.
///
/// Detector readings that were short-circuited by an earlier decision are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub signal: EntrySignal,
    pub reason: Reason,
    pub range: Option<RangeWindow>,
    /// Whether the candles before the range's start end in an impulse
    pub pre_range_impulse: Option<bool>,
    pub trend: Option<TrendReading>,
    /// Whether the full series ends in an impulse
    pub impulse: Option<bool>,
}

// ============================================================
// ANALYZER
// ============================================================

/// Stateless classifier bound to one configuration
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[inline]
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Parse, order and classify raw caller input
    pub fn analyze_raw(&self, raw: &[RawCandle]) -> Result<Analysis> {
        let series = CandleSeries::from_raw(raw)?;
        self.analyze(&series)
    }

    pub fn analyze(&self, series: &CandleSeries) -> Result<Analysis> {
        self.analyze_candles(series.candles())
    }

    /// Classify an already ordered candle slice
    pub fn analyze_candles(&self, candles: &[Candle]) -> Result<Analysis> {
        let last = candles.last().ok_or(DataError::Empty)?;
        let last_close = last.close;
        if !last_close.is_finite() {
            return Err(AnalysisError::Computation(
                "latest close is not a finite number".to_string(),
            ));
        }

        let cfg = &self.config;
        let mut reason = Reason::default();
        let mut pre_range_impulse = None;

        // 1. Limit Catch
        let range = cfg.range.detect(candles);
        if let Some(window) = &range {
            reason.push(Fact::RangeDetected {
                low: window.low,
                high: window.high,
                width_pct: window.width_pct,
            });

            if cfg.range.in_entry_zone(window, last_close) {
                let prior = cfg.impulse.is_impulse(&candles[..window.start_index]);
                pre_range_impulse = Some(prior);

                if !prior {
                    reason.push(Fact::EntryZoneWithoutPriorImpulse);
                    return Ok(self.finish(Analysis {
                        signal: EntrySignal::LimitCatch,
                        reason,
                        range,
                        pre_range_impulse,
                        trend: None,
                        impulse: None,
                    }));
                }
            }
        }

        // 2. In-Price
        let trend = cfg.trend.detect(candles);
        let impulse = cfg.impulse.is_impulse(candles);
        reason.push(Fact::Conditions {
            trend: trend.trend,
            break_of_structure: trend.break_of_structure,
            impulse,
        });

        let signal = if trend.trend.is_directional() && trend.break_of_structure && !impulse {
            reason.push(Fact::TrendBreakWithoutImpulse);
            EntrySignal::InPrice
        } else {
            // 3. Nothing qualifies
            EntrySignal::NoEntry
        };

        Ok(self.finish(Analysis {
            signal,
            reason,
            range,
            pre_range_impulse,
            trend: Some(trend),
            impulse: Some(impulse),
        }))
    }

    fn finish(&self, analysis: Analysis) -> Analysis {
        tracing::debug!(
            signal = %analysis.signal,
            reason = %analysis.reason,
            "series classified"
        );
        analysis
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for [`Analyzer`]; starts from the default thresholds
#[derive(Debug, Clone, Default)]
pub struct AnalyzerBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn range(mut self, detector: RangeDetector) -> Self {
        self.config.range = detector;
        self
    }

    pub fn impulse(mut self, detector: ImpulseDetector) -> Self {
        self.config.impulse = detector;
        self
    }

    pub fn trend(mut self, detector: TrendDetector) -> Self {
        self.config.trend = detector;
        self
    }

    /// Validate and build
    pub fn build(self) -> Result<Analyzer> {
        Analyzer::new(self.config)
    }
}

// ============================================================
// TESTS
// ============================================================
