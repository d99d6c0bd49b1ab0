use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("No data: {0}")]
    NoData(String),

    #[error("Insufficient history: need at least {needed} points, got {got}")]
    InsufficientHistory { needed: usize, got: usize },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported symbol: {0}")]
    UnsupportedSymbol(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Cache error: {0}")]
    Cache(String),
}

impl MarketError {
    /// Errors the caller caused; these are shown to the user and never retried.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            MarketError::NoData(_)
                | MarketError::InsufficientHistory { .. }
                | MarketError::Validation(_)
                | MarketError::UnsupportedSymbol(_)
        )
    }

    /// Errors caused by a third-party API.
    pub fn is_upstream_error(&self) -> bool {
        matches!(
            self,
            MarketError::UpstreamUnavailable(_) | MarketError::MalformedResponse(_)
        )
    }
}

pub type MarketResult<T> = Result<T, MarketError>;
