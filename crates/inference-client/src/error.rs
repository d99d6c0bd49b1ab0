use market_core::MarketError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Model not loaded")]
    ModelNotLoaded,

    #[error("Not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type InferenceResult<T> = Result<T, InferenceError>;

impl From<InferenceError> for MarketError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::InvalidResponse(_) | InferenceError::Serialization(_) => {
                MarketError::MalformedResponse(err.to_string())
            }
            InferenceError::ModelNotLoaded => MarketError::Model(err.to_string()),
            _ => MarketError::UpstreamUnavailable(err.to_string()),
        }
    }
}
