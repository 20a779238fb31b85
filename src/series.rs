//! Candle series preprocessing
//!
//! Turns raw caller input into an immutable, time-ordered series with per-candle metrics
//! computed once.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DataError, Ohlc, OhlcExt};

/// Candle as supplied by an external caller: timestamp still unparsed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCandle {
    pub timestamp: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Metrics derived from a single candle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandleMetrics {
    /// |close - open|
    pub body: f64,
    /// high - low
    pub range: f64,
    /// body / range * 100, zero for a flat candle
    pub body_ratio: f64,
}

impl CandleMetrics {
    pub fn of<T: Ohlc>(bar: &T) -> Self {
        Self {
            body: bar.body(),
            range: OhlcExt::range(bar),
            body_ratio: bar.body_ratio_pct(),
        }
    }
}

/// A preprocessed candle with its metrics attached.
///
/// Deserializing ignores any `metrics` in the input and recomputes them from the prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CandlePrices")]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub metrics: CandleMetrics,
}

impl Candle {
    pub fn new(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        let mut candle = Self {
            timestamp,
            open,
            high,
            low,
            close,
            metrics: CandleMetrics {
                body: 0.0,
                range: 0.0,
                body_ratio: 0.0,
            },
        };
        candle.metrics = CandleMetrics::of(&candle);
        candle
    }
}

#[derive(Deserialize)]
struct CandlePrices {
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

impl From<CandlePrices> for Candle {
    fn from(p: CandlePrices) -> Self {
        Candle::new(p.timestamp, p.open, p.high, p.low, p.close)
    }
}

impl Ohlc for Candle {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn timestamp(&self) -> Option<i64> {
        Some(self.timestamp.timestamp_millis())
    }
}

/// Ordered, non-empty candle series, strictly increasing by timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Parse and order raw caller input.
    ///
    /// Fails on an empty input, an unparsable timestamp, a non-finite price or two candles
    /// sharing an instant. Out-of-order input is sorted.
    pub fn from_raw(raw: &[RawCandle]) -> Result<Self, DataError> {
        if raw.is_empty() {
            return Err(DataError::Empty);
        }

        let mut candles = Vec::with_capacity(raw.len());
        for (index, r) in raw.iter().enumerate() {
            let timestamp = parse_timestamp(&r.timestamp).ok_or_else(|| {
                DataError::InvalidTimestamp {
                    index,
                    value: r.timestamp.clone(),
                }
            })?;
            let candle = Candle::new(timestamp, r.open, r.high, r.low, r.close);
            candle.validate(index)?;
            candles.push(candle);
        }

        Self::from_candles(candles)
    }

    /// Build a series from any OHLC type carrying epoch-millisecond timestamps
    pub fn from_bars<T: Ohlc>(bars: &[T]) -> Result<Self, DataError> {
        if bars.is_empty() {
            return Err(DataError::Empty);
        }

        let mut candles = Vec::with_capacity(bars.len());
        for (index, bar) in bars.iter().enumerate() {
            bar.validate(index)?;
            let millis = bar
                .timestamp()
                .ok_or(DataError::MissingTimestamp { index })?;
            let timestamp = DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
                DataError::InvalidTimestamp {
                    index,
                    value: millis.to_string(),
                }
            })?;
            candles.push(Candle::new(
                timestamp,
                bar.open(),
                bar.high(),
                bar.low(),
                bar.close(),
            ));
        }

        Self::from_candles(candles)
    }

    fn from_candles(mut candles: Vec<Candle>) -> Result<Self, DataError> {
        candles.sort_by_key(|c| c.timestamp);

        if let Some(pos) = candles
            .windows(2)
            .position(|w| w[0].timestamp == w[1].timestamp)
        {
            return Err(DataError::DuplicateTimestamp {
                index: pos + 1,
                timestamp: candles[pos + 1].timestamp.to_rfc3339(),
            });
        }

        tracing::trace!(len = candles.len(), "candle series prepared");
        Ok(Self { candles })
    }

    #[inline]
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Always false: construction rejects empty input
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    #[inline]
    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a timestamp string. Naive date-times are taken as UTC; a bare date is midnight.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc));
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
}
