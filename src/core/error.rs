//! Error types for the holdings engine.

use chrono::NaiveDate;
use thiserror::Error;

/// Raised when a domain value fails validation at construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Invalid ticker '{0}': must be 6 digits")]
    InvalidTicker(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid weight {0}: must be between 0 and 100")]
    InvalidWeight(f64),

    #[error("Invalid amount {0}: must be non-negative")]
    InvalidAmount(f64),

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}

/// Failure of a façade query, translated for the presentation layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Fund not found: {0}")]
    FundNotFound(String),

    #[error("No data available: {0}")]
    NoData(String),

    #[error(transparent)]
    Invalid(#[from] ModelError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type QueryResult<T> = std::result::Result<T, QueryError>;

impl QueryError {
    pub fn no_data(msg: impl Into<String>) -> Self {
        QueryError::NoData(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        QueryError::InvalidInput(msg.into())
    }
}
