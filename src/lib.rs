//! # entryscan - price-action entry setup classifier
//!
//! Classifies a short window of OHLC candles as a mean-reversion **Limit Catch** entry,
//! a trend-continuation **In-Price** entry, or **No Entry** by running range, trend/BoS
//! and impulse detectors over the series.
//!
//! ## Quick Start
//!
//! ```rust
//! use entryscan::prelude::*;
//!
//! let raw: Vec<RawCandle> = (0..20)
//!     .map(|i| RawCandle {
//!         timestamp: format!("2024-01-01T00:{:02}:00Z", i),
//!         open: 100.0,
//!         high: 100.0,
//!         low: 100.0,
//!         close: 100.0,
//!     })
//!     .collect();
//!
//! let analyzer = AnalyzerBuilder::new().build().unwrap();
//! let series = CandleSeries::from_raw(&raw).unwrap();
//! let analysis = analyzer.analyze(&series).unwrap();
//! assert_eq!(analysis.signal, EntrySignal::NoEntry);
//! ```

pub mod api;
pub mod detectors;
pub mod engine;
pub mod params;
pub mod series;

pub use engine::{
    Analysis, Analyzer, AnalyzerBuilder, AnalyzerConfig, EntrySignal, Fact, Reason,
};
pub use series::{Candle, CandleMetrics, CandleSeries, RawCandle};

pub mod prelude {
    pub use crate::{
        // Transport boundary
        api::{handle_request, AnalysisRequest, AnalysisResult, ApiError},
        // Detectors
        detectors::*,
        // Engine
        engine::{Analysis, Analyzer, AnalyzerBuilder, AnalyzerConfig, EntrySignal, Fact, Reason},
        // Parameters
        params::{get_percent, get_period, ParamMeta, ParamType, ParameterizedDetector},
        // Series
        series::{Candle, CandleMetrics, CandleSeries, RawCandle},
        // Parallel
        analyze_parallel,
        // Errors
        AnalysisError,
        DataError,
        // Core traits
        Detector,
        InstrumentAnalysis,
        InstrumentError,
        Ohlc,
        OhlcExt,
        // Types
        Percent,
        Period,
        Result,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Malformed or insufficient input. Always the caller's fault.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    #[error("no candles supplied")]
    Empty,

    #[error("insufficient data: need {need} candles, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("invalid timestamp {value:?} at index {index}")]
    InvalidTimestamp { index: usize, value: String },

    #[error("missing timestamp at index {index}")]
    MissingTimestamp { index: usize },

    #[error("duplicate timestamp {timestamp} at index {index}")]
    DuplicateTimestamp { index: usize, timestamp: String },

    #[error("invalid {field} price at index {index}: not a finite number")]
    InvalidPrice { index: usize, field: &'static str },
}

/// Errors that can occur while preparing or analyzing a candle series
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("computation failed: {0}")]
    Computation(String),
}

impl AnalysisError {
    /// True for errors caused by the input or parameters rather than by the analyzer itself.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AnalysisError::Data(_)
                | AnalysisError::InvalidValue(_)
                | AnalysisError::OutOfRange { .. }
        )
    }
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Percentage in range 0.0..=100.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percent(f64);

impl Percent {
    /// Create a new Percent, validating the value is in [0.0, 100.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(AnalysisError::InvalidValue(
                "Percent cannot be NaN or infinite",
            ));
        }
        if !(0.0..=100.0).contains(&value) {
            return Err(AnalysisError::OutOfRange {
                field: "Percent",
                value,
                min: 0.0,
                max: 100.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Percent from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }

    /// The percentage as a fraction (1.5% -> 0.015)
    #[inline]
    pub fn fraction(self) -> f64 {
        self.0 / 100.0
    }
}

impl serde::Serialize for Percent {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Percent {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Percent::new(value).map_err(serde::de::Error::custom)
    }
}

/// Period (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(AnalysisError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLC TRAITS
// ============================================================

/// Core OHLC data trait
pub trait Ohlc {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;

    /// Bar open time in epoch milliseconds
    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Extension trait with computed properties for OHLC data
pub trait OhlcExt: Ohlc {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    /// Signed body: positive for bullish bars, negative for bearish ones
    #[inline]
    fn net_move(&self) -> f64 {
        self.close() - self.open()
    }

    /// Body as percentage of range. A flat bar (range == 0) reports 0.
    #[inline]
    fn body_ratio_pct(&self) -> f64 {
        let range = self.range();
        if range == 0.0 {
            0.0
        } else {
            self.body() / range * 100.0
        }
    }

    /// Reject prices that cannot take part in arithmetic; `index` locates the bar in its input
    fn validate(&self, index: usize) -> std::result::Result<(), DataError> {
        let fields = [
            ("open", self.open()),
            ("high", self.high()),
            ("low", self.low()),
            ("close", self.close()),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(DataError::InvalidPrice { index, field });
            }
        }
        Ok(())
    }
}

impl<T: Ohlc> OhlcExt for T {}

// ============================================================
// DETECTOR TRAIT
// ============================================================

/// A pure function from a candle slice to a reading
pub trait Detector: Send + Sync {
    type Output;

    /// Fewest candles the detector can produce a positive reading from; shorter input
    /// yields the empty reading
    fn min_bars(&self) -> usize;

    fn detect(&self, candles: &[Candle]) -> Self::Output;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================
// PARALLEL ANALYSIS
// ============================================================

use rayon::prelude::*;

/// Classification of a single instrument
#[derive(Debug)]
pub struct InstrumentAnalysis {
    pub symbol: String,
    pub analysis: Analysis,
}

/// Error from analyzing a single instrument
#[derive(Debug)]
pub struct InstrumentError {
    pub symbol: String,
    pub error: AnalysisError,
}

/// Classify several instruments at once. Each analysis is independent.
pub fn analyze_parallel<'a, I>(
    analyzer: &Analyzer,
    instruments: I,
) -> (Vec<InstrumentAnalysis>, Vec<InstrumentError>)
where
    I: IntoParallelIterator<Item = (&'a str, &'a [RawCandle])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, raw)| {
            analyzer
                .analyze_raw(raw)
                .map(|analysis| InstrumentAnalysis {
                    symbol: symbol.to_string(),
                    analysis,
                })
                .map_err(|error| InstrumentError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    tracing::debug!(
        ok = successes.len(),
        failed = errors.len(),
        "parallel analysis finished"
    );

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct Bar {
        o: f64,
        h: f64,
        l: f64,
        c: f64,
    }

    impl Ohlc for Bar {
        fn open(&self) -> f64 {
            self.o
        }

        fn high(&self) -> f64 {
            self.h
        }

        fn low(&self) -> f64 {
            self.l
        }

        fn close(&self) -> f64 {
            self.c
        }
    }

    fn raw_series(prefix: &str, n: usize, price: f64) -> Vec<RawCandle> {
        (0..n)
            .map(|i| RawCandle {
                timestamp: format!("{prefix}T{:02}:00:00Z", i),
                open: price,
                high: price,
                low: price,
                close: price,
            })
            .collect()
    }

    #[test]
    fn test_percent_validation() {
        assert!(Percent::new(0.0).is_ok());
        assert!(Percent::new(100.0).is_ok());
        assert!(Percent::new(1.5).is_ok());
        assert!(Percent::new(-0.1).is_err());
        assert!(Percent::new(100.1).is_err());
        assert!(Percent::new(f64::NAN).is_err());
        assert!(Percent::new(f64::INFINITY).is_err());
        assert!((Percent::new(1.5).unwrap().fraction() - 0.015).abs() < 1e-12);
    }

    #[test]
    fn test_period_validation() {
        assert!(Period::new(1).is_ok());
        assert!(Period::new(15).is_ok());
        assert!(Period::new(0).is_err());
    }

    #[test]
    fn test_percent_deserialize_rejects_out_of_range() {
        let ok: Percent = serde_json::from_str("30").unwrap();
        assert_eq!(ok.get(), 30.0);
        assert!(serde_json::from_str::<Percent>("130").is_err());
        assert!(serde_json::from_str::<Period>("0").is_err());
    }

    #[test]
    fn test_ohlc_ext() {
        let bar = Bar {
            o: 100.0,
            h: 110.0,
            l: 90.0,
            c: 105.0,
        };
        assert_eq!(bar.body(), 5.0);
        assert_eq!(bar.range(), 20.0);
        assert_eq!(bar.net_move(), 5.0);
        assert!((bar.body_ratio_pct() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_bar_body_ratio_is_zero() {
        let bar = Bar {
            o: 100.0,
            h: 100.0,
            l: 100.0,
            c: 100.0,
        };
        assert_eq!(bar.body_ratio_pct(), 0.0);
    }

    #[test]
    fn test_validate_rejects_nan() {
        let bar = Bar {
            o: 100.0,
            h: f64::NAN,
            l: 99.0,
            c: 100.0,
        };
        assert_eq!(
            bar.validate(7),
            Err(DataError::InvalidPrice {
                index: 7,
                field: "high"
            })
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(AnalysisError::from(DataError::Empty).is_client_error());
        assert!(!AnalysisError::Computation("boom".into()).is_client_error());
        assert!(!AnalysisError::InvalidConfig("bad".into()).is_client_error());
    }

    #[test]
    fn test_parallel_analysis() {
        let analyzer = AnalyzerBuilder::new().build().unwrap();

        let flat = raw_series("2024-01-01", 20, 100.0);
        let broken = vec![RawCandle {
            timestamp: "not a time".to_string(),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
        }];

        let instruments: Vec<(&str, &[RawCandle])> =
            vec![("BTCUSDT", &flat), ("ETHUSDT", &flat), ("BAD", &broken)];

        let (results, errors) = analyze_parallel(&analyzer, instruments);
        assert_eq!(results.len(), 2);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].symbol, "BAD");
        assert!(results
            .iter()
            .all(|r| r.analysis.signal == EntrySignal::NoEntry));
    }
}
