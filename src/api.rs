//! Request/response boundary
//!
//! JSON-shaped types for callers that expose the analyzer over a transport, and the mapping
//! from analysis failures to client or server errors.

use serde::{Deserialize, Serialize};

use crate::{AnalysisError, Analyzer, DataError, EntrySignal, RawCandle};

/// Incoming analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub ohlc_data: Vec<RawCandle>,
}

/// Outgoing analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub strategy_suggestion: EntrySignal,
    pub reason: Option<String>,
}

/// A failure shaped for a transport: HTTP-style status plus a display message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{status}: {detail}")]
pub struct ApiError {
    pub status: u16,
    pub detail: String,
}

impl ApiError {
    pub const BAD_REQUEST: u16 = 400;
    pub const INTERNAL: u16 = 500;

    #[inline]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        if err.is_client_error() {
            ApiError {
                status: Self::BAD_REQUEST,
                detail: format!("Data processing error: {err}"),
            }
        } else {
            tracing::error!(error = %err, "analysis failed");
            ApiError {
                status: Self::INTERNAL,
                detail: format!("Analysis error: {err}"),
            }
        }
    }
}

/// Validate, preprocess and classify one request
pub fn handle_request(
    analyzer: &Analyzer,
    request: &AnalysisRequest,
) -> Result<AnalysisResult, ApiError> {
    let need = analyzer.config().min_candles();
    let got = request.ohlc_data.len();
    if got < need {
        return Err(AnalysisError::from(DataError::InsufficientData { need, got }).into());
    }

    let analysis = analyzer.analyze_raw(&request.ohlc_data)?;
    Ok(AnalysisResult {
        strategy_suggestion: analysis.signal,
        reason: Some(analysis.reason.to_string()),
    })
}
