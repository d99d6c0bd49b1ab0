use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use forecast_engine::{ForecastConfig, LinearWindowModel};
use inference_client::RemotePriceModel;
use market_core::{MarketResult, PriceModel};
use tracing::{info, warn};

/// Where the pretrained price model comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    /// Model-serving HTTP endpoint (`MODEL_SERVICE_URL`).
    Remote(String),
    /// Linear-window weights on disk (`MODEL_PATH`).
    File(PathBuf),
    /// Repeat the last close.
    Naive,
}

impl ModelSource {
    pub fn from_env() -> Self {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("MODEL_SERVICE_URL") {
            ModelSource::Remote(url)
        } else if let Some(path) = non_empty("MODEL_PATH") {
            ModelSource::File(PathBuf::from(path))
        } else {
            ModelSource::Naive
        }
    }
}

/// Load the model once at startup. The handle is shared by every forecast.
pub fn build_price_model(
    source: &ModelSource,
    config: &ForecastConfig,
    timeout: Duration,
) -> MarketResult<Arc<dyn PriceModel>> {
    match source {
        ModelSource::Remote(url) => {
            info!("Using remote price model at {}", url);
            Ok(Arc::new(RemotePriceModel::new(url.clone(), config.window, timeout)))
        }
        ModelSource::File(path) => {
            let model = LinearWindowModel::from_path(path)?;
            info!("Loaded price model '{}' from {}", model.name(), path.display());
            Ok(Arc::new(model))
        }
        ModelSource::Naive => {
            warn!("No MODEL_SERVICE_URL or MODEL_PATH set; forecasting with the naive last-value model");
            Ok(Arc::new(LinearWindowModel::naive(config.window)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naive_model_matches_window() {
        let config = ForecastConfig { window: 30 };
        let model = build_price_model(&ModelSource::Naive, &config, Duration::from_secs(1)).unwrap();
        assert_eq!(model.window_size(), 30);
    }

    #[test]
    fn test_missing_weights_file_fails() {
        let source = ModelSource::File(PathBuf::from("/nonexistent/weights.json"));
        let config = ForecastConfig::default();
        assert!(build_price_model(&source, &config, Duration::from_secs(1)).is_err());
    }
}
