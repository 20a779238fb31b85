//! Price-action detectors
//!
//! Each detector is a pure function of a candle slice and its own parameters.
//!
//! - **Range**: most recent consolidation box with confirmed support/resistance touches
//! - **Trend/BoS**: short-lookback trend direction and break of the prior extreme
//! - **Impulse**: a short run of large, same-direction bodies ending at the last candle

pub mod helpers;

pub mod impulse;
pub mod range;
pub mod trend;

pub use helpers::*;
pub use impulse::*;
pub use range::*;
pub use trend::*;
