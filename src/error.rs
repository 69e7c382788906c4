//! Error types for data loading and the analysis API.

use thiserror::Error;

/// Errors raised while loading or querying trade data.
#[derive(Error, Debug)]
pub enum TradeDataError {
    #[error("Trade data not initialized. Call init() first.")]
    NotInitialized,

    #[error("Failed to fetch {path}: {reason}")]
    Fetch { path: String, reason: String },

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid month format: {0}")]
    InvalidMonth(String),

    #[error("Missing required fields in CSV row")]
    MissingFields,

    #[error("Trade data missing required fields")]
    InvalidData,

    #[error("No trade data available")]
    NoData,

    #[error("Failed to initialize trade data: {0}")]
    Init(Box<TradeDataError>),
}

/// Errors raised by the analysis API client and chat session.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Cannot connect to analysis API at {0}")]
    Connect(String),

    #[error("Failed to send request: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Analysis Error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("{0}")]
    Failed(String),

    #[error("Backend is not connected.")]
    NotConnected,
}
