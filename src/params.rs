//! Parameter metadata for detectors
//!
//! Describes each detector's tunable parameters so that sweeps and configuration
//! front-ends can enumerate them without hard-coding names.
//!
//! # Example
//!
//! ```rust
//! use entryscan::params::ParameterizedDetector;
//! use entryscan::prelude::*;
//!
//! for param in ImpulseDetector::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//! ```

use std::collections::HashMap;

use crate::{AnalysisError, Percent, Period, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Percentage (0.0..=100.0)
    Percent,
    /// Candle count (positive integer)
    Period,
}

/// Metadata for a single detector parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
    /// Parameter name, identical to the config field name
    pub name: &'static str,
    pub param_type: ParamType,
    pub default: f64,
    /// Range for sweeps: (min, max, step)
    pub range: (f64, f64, f64),
    pub description: &'static str,
}

impl ParamMeta {
    pub const fn percent(
        name: &'static str,
        default: f64,
        range: (f64, f64, f64),
        description: &'static str,
    ) -> Self {
        Self {
            name,
            param_type: ParamType::Percent,
            default,
            range,
            description,
        }
    }

    pub const fn period(
        name: &'static str,
        default: f64,
        range: (f64, f64, f64),
        description: &'static str,
    ) -> Self {
        Self {
            name,
            param_type: ParamType::Period,
            default,
            range,
            description,
        }
    }

    /// All values of the sweep range, inclusive of both ends
    pub fn generate_grid(&self) -> Vec<f64> {
        let (min, max, step) = self.range;
        if step <= 0.0 {
            return vec![min];
        }
        let steps = ((max - min) / step + 1e-9).floor() as usize;
        (0..=steps).map(|i| min + step * i as f64).collect()
    }

    /// Validate a value for this parameter
    pub fn validate(&self, value: f64) -> Result<()> {
        let (min, max, _) = self.range;
        if value < min || value > max {
            return Err(AnalysisError::OutOfRange {
                field: self.name,
                value,
                min,
                max,
            });
        }
        match self.param_type {
            ParamType::Percent => Ok(()),
            ParamType::Period => {
                if value < 1.0 || value.fract() != 0.0 {
                    return Err(AnalysisError::InvalidValue(
                        "Period must be a positive integer",
                    ));
                }
                Ok(())
            }
        }
    }
}

// ============================================================
// PARAMETERIZED DETECTOR TRAIT
// ============================================================

/// Detectors whose parameters can be enumerated and set by name
pub trait ParameterizedDetector: Sized {
    fn param_meta() -> &'static [ParamMeta];

    /// Build a detector from named values. Missing names fall back to defaults.
    fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Fetch a Percent from params with default fallback
pub fn get_percent(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Percent> {
    let value = params.get(key).copied().unwrap_or(default);
    Percent::new(value)
}

/// Fetch a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
    match params.get(key).copied() {
        Some(v) if v < 0.0 || v.fract() != 0.0 || !v.is_finite() => Err(
            AnalysisError::InvalidValue("Period must be a positive integer"),
        ),
        Some(v) => Period::new(v as usize),
        None => Period::new(default),
    }
}

// ============================================================
// TESTS
// ============================================================
