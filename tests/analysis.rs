//! Integration tests for the entry classifier.
//!
//! These exercise the public API end to end: caller bar types, raw JSON-shaped input,
//! the decision priority and the reason text.

use entryscan::prelude::*;

/// Simple test bar with a minute timestamp
#[derive(Debug, Clone, Copy)]
struct TestBar {
    t: i64,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
}

impl Ohlc for TestBar {
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

    fn timestamp(&self) -> Option<i64> {
        Some(self.t)
    }
}

const ORIGIN_MS: i64 = 1_704_067_200_000; // 2024-01-01T00:00:00Z

fn bars(ohlc: &[(f64, f64, f64, f64)]) -> Vec<TestBar> {
    ohlc.iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| TestBar {
            t: ORIGIN_MS + i as i64 * 60_000,
            o,
            h,
            l,
            c,
        })
        .collect()
}

fn series(ohlc: &[(f64, f64, f64, f64)]) -> CandleSeries {
    CandleSeries::from_bars(&bars(ohlc)).unwrap()
}

/// 15 candles oscillating inside 99..101; two resistance touches near 101,
/// two support touches near 99
fn make_box(last_close: f64) -> Vec<(f64, f64, f64, f64)> {
    let mut ohlc = Vec::with_capacity(15);
    for i in 0..15 {
        let bar = match i % 4 {
            0 => (100.0, 100.4, 99.6, 100.2),
            1 => (100.2, 100.5, 99.8, 99.9),
            2 => (99.9, 100.3, 99.5, 100.1),
            _ => (100.1, 100.6, 99.7, 100.0),
        };
        ohlc.push(bar);
    }
    ohlc[3] = (100.1, 101.0, 99.9, 100.5);
    ohlc[10] = (100.3, 100.9, 100.0, 100.4);
    ohlc[5] = (99.9, 100.1, 99.0, 99.4);
    ohlc[12] = (99.6, 99.9, 99.1, 99.5);
    ohlc[14] = (99.9, last_close.max(100.2), 99.7, last_close);
    ohlc
}

fn make_rising(n: usize, step_pct: f64) -> Vec<(f64, f64, f64, f64)> {
    let mut ohlc = Vec::with_capacity(n);
    let mut prev = 100.0;
    for _ in 0..n {
        let close = prev * (1.0 + step_pct / 100.0);
        ohlc.push((prev, close + 0.05, prev - 0.05, close));
        prev = close;
    }
    ohlc
}

fn make_falling(n: usize, step_pct: f64) -> Vec<(f64, f64, f64, f64)> {
    let mut ohlc = Vec::with_capacity(n);
    let mut prev = 100.0;
    for _ in 0..n {
        let close = prev * (1.0 - step_pct / 100.0);
        ohlc.push((prev, prev + 0.05, close - 0.05, close));
        prev = close;
    }
    ohlc
}

fn analyzer() -> Analyzer {
    AnalyzerBuilder::new().build().unwrap()
}

// ============================================================
// RANGE
// ============================================================

#[test]
fn test_box_is_detected_as_range() {
    let s = series(&make_box(100.0));
    let window = RangeDetector::default().detect(s.candles()).unwrap();

    assert_eq!(window.high, 101.0);
    assert_eq!(window.low, 99.0);
    assert!((window.width_pct - 2.0).abs() < 1e-9);
    assert_eq!((window.start_index, window.end_index), (0, 14));
}

#[test]
fn test_limit_catch_entry() {
    let analysis = analyzer().analyze(&series(&make_box(100.7))).unwrap();

    assert_eq!(analysis.signal, EntrySignal::LimitCatch);
    assert_eq!(
        analysis.reason.to_string(),
        "Range detected (99.00-101.00, Width: 2.00%). Price in entry zone with no prior impulse"
    );
    assert_eq!(
        analysis.reason.facts(),
        &[
            Fact::RangeDetected {
                low: 99.0,
                high: 101.0,
                width_pct: analysis.range.unwrap().width_pct,
            },
            Fact::EntryZoneWithoutPriorImpulse,
        ]
    );
}

#[test]
fn test_range_in_mid_zone_is_not_limit_catch() {
    let analysis = analyzer().analyze(&series(&make_box(100.0))).unwrap();
    assert!(analysis.range.is_some());
    assert_ne!(analysis.signal, EntrySignal::LimitCatch);
    assert_eq!(analysis.reason.facts().len(), 2);
}

#[test]
fn test_range_after_impulse_is_not_limit_catch() {
    let mut ohlc = vec![
        (100.0, 100.1, 99.9, 100.0),
        (96.5, 98.1, 96.45, 98.0),
        (98.0, 99.6, 97.95, 99.5),
    ];
    ohlc.extend(make_box(100.7));
    let analysis = analyzer().analyze(&series(&ohlc)).unwrap();

    let range = analysis.range.unwrap();
    assert_eq!(range.start_index, 3);
    assert_eq!(analysis.pre_range_impulse, Some(true));
    assert_ne!(analysis.signal, EntrySignal::LimitCatch);
}

// ============================================================
// TREND / IN-PRICE
// ============================================================

#[test]
fn test_in_price_entry_uptrend() {
    let analysis = analyzer().analyze(&series(&make_rising(11, 0.2))).unwrap();

    assert_eq!(analysis.signal, EntrySignal::InPrice);
    let trend = analysis.trend.unwrap();
    assert_eq!(trend.trend, Trend::Uptrend);
    assert!(trend.break_of_structure);
    assert!(analysis
        .reason
        .to_string()
        .contains("Trend: uptrend, BoS: True, Impulse: False"));
}

#[test]
fn test_in_price_entry_downtrend() {
    let analysis = analyzer().analyze(&series(&make_falling(12, 0.2))).unwrap();

    assert_eq!(analysis.signal, EntrySignal::InPrice);
    assert_eq!(analysis.trend.map(|t| t.trend), Some(Trend::Downtrend));
}

#[test]
fn test_exhausted_trend_is_no_entry() {
    let mut ohlc = make_rising(10, 0.2);
    let prev = ohlc[9].3;
    let close = prev * 1.02;
    ohlc.push((prev, close + 0.05, prev - 0.05, close));

    let analysis = analyzer().analyze(&series(&ohlc)).unwrap();
    assert_eq!(analysis.impulse, Some(true));
    assert_eq!(analysis.signal, EntrySignal::NoEntry);
}

#[test]
fn test_flat_series_no_entry() {
    let analysis = analyzer()
        .analyze(&series(&vec![(100.0, 100.0, 100.0, 100.0); 20]))
        .unwrap();

    assert_eq!(analysis.signal, EntrySignal::NoEntry);
    assert!(analysis
        .reason
        .to_string()
        .contains("Trend: none, BoS: False, Impulse: False"));
}

// ============================================================
// INPUT HANDLING
// ============================================================

#[test]
fn test_raw_input_out_of_order_matches_sorted() {
    let ohlc = make_rising(11, 0.2);
    let mut raw: Vec<RawCandle> = ohlc
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| RawCandle {
            timestamp: format!("2024-01-01 00:{:02}:00", i),
            open: o,
            high: h,
            low: l,
            close: c,
        })
        .collect();
    raw.reverse();

    let from_raw = analyzer().analyze_raw(&raw).unwrap();
    let from_bars = analyzer().analyze(&series(&ohlc)).unwrap();
    assert_eq!(from_raw, from_bars);
}

#[test]
fn test_handle_request_roundtrip() {
    let ohlc = make_box(100.7);
    let request = AnalysisRequest {
        ohlc_data: ohlc
            .iter()
            .enumerate()
            .map(|(i, &(o, h, l, c))| RawCandle {
                timestamp: format!("2024-01-01T{:02}:00:00Z", i),
                open: o,
                high: h,
                low: l,
                close: c,
            })
            .collect(),
    };
    let json = serde_json::to_string(&request).unwrap();
    let request: AnalysisRequest = serde_json::from_str(&json).unwrap();

    let result = handle_request(&analyzer(), &request).unwrap();
    assert_eq!(result.strategy_suggestion, EntrySignal::LimitCatch);

    let out = serde_json::to_value(&result).unwrap();
    assert_eq!(out["strategy_suggestion"], "Limit Catch Entry");
    assert!(out["reason"].as_str().unwrap().starts_with("Range detected"));
}

#[test]
fn test_duplicate_timestamps_rejected() {
    let mut b = bars(&make_rising(15, 0.1));
    b[7].t = b[6].t;
    let err = CandleSeries::from_bars(&b).unwrap_err();
    assert!(matches!(err, DataError::DuplicateTimestamp { .. }));
}

#[test]
fn test_config_json_changes_outcome() {
    // a 3% threshold no longer calls the 2% rise a trend
    let config: AnalyzerConfig =
        serde_json::from_str(r#"{"trend": {"threshold_pct": 3.0}}"#).unwrap();
    let strict = AnalyzerBuilder::new().config(config).build().unwrap();

    let analysis = strict.analyze(&series(&make_rising(11, 0.2))).unwrap();
    assert_eq!(analysis.signal, EntrySignal::NoEntry);
}

#[test]
fn test_parallel_matches_sequential() {
    let a: Vec<RawCandle> = make_rising(11, 0.2)
        .into_iter()
        .enumerate()
        .map(|(i, (o, h, l, c))| RawCandle {
            timestamp: format!("2024-02-01 00:{:02}", i),
            open: o,
            high: h,
            low: l,
            close: c,
        })
        .collect();
    let b: Vec<RawCandle> = make_box(100.7)
        .into_iter()
        .enumerate()
        .map(|(i, (o, h, l, c))| RawCandle {
            timestamp: format!("2024-02-01 01:{:02}", i),
            open: o,
            high: h,
            low: l,
            close: c,
        })
        .collect();

    let analyzer = analyzer();
    let instruments: Vec<(&str, &[RawCandle])> = vec![("A", a.as_slice()), ("B", b.as_slice())];
    let (mut results, errors) = analyze_parallel(&analyzer, instruments);
    assert!(errors.is_empty());

    results.sort_by(|x, y| x.symbol.cmp(&y.symbol));
    assert_eq!(results[0].analysis, analyzer.analyze_raw(&a).unwrap());
    assert_eq!(results[1].analysis.signal, EntrySignal::LimitCatch);
}

#[test]
fn test_param_metadata_round_trips_through_with_params() {
    use std::collections::HashMap;

    let defaults: HashMap<&str, f64> = ImpulseDetector::param_meta()
        .iter()
        .map(|p| (p.name, p.default))
        .collect();
    assert_eq!(
        ImpulseDetector::with_params(&defaults).unwrap(),
        ImpulseDetector::default()
    );

    let defaults: HashMap<&str, f64> = TrendDetector::param_meta()
        .iter()
        .map(|p| (p.name, p.default))
        .collect();
    assert_eq!(
        TrendDetector::with_params(&defaults).unwrap(),
        TrendDetector::default()
    );
}
