use async_trait::async_trait;
use market_core::{MarketError, MarketResult, PriceModel};
use serde::Deserialize;
use std::path::Path;

/// A linear autoregressive model over the trailing window:
/// `next = bias + Σ coefficients[i] * window[i]`.
///
/// Weights are trained offline and shipped as JSON:
/// `{"window": 100, "bias": 0.0, "coefficients": [...]}`.
#[derive(Debug, Clone)]
pub struct LinearWindowModel {
    name: String,
    bias: f64,
    coefficients: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct WeightsFile {
    #[serde(default)]
    name: Option<String>,
    window: usize,
    #[serde(default)]
    bias: f64,
    coefficients: Vec<f64>,
}

impl LinearWindowModel {
    pub fn new(name: impl Into<String>, bias: f64, coefficients: Vec<f64>) -> MarketResult<Self> {
        if coefficients.is_empty() {
            return Err(MarketError::Model("model has no coefficients".to_string()));
        }
        if !bias.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(MarketError::Model("model weights must be finite".to_string()));
        }
        Ok(Self {
            name: name.into(),
            bias,
            coefficients,
        })
    }

    /// Persistence baseline: predicts the last value of the window.
    pub fn naive(window: usize) -> MarketResult<Self> {
        let mut coefficients = vec![0.0; window];
        if let Some(last) = coefficients.last_mut() {
            *last = 1.0;
        }
        Self::new("naive-last-value", 0.0, coefficients)
    }

    pub fn from_json(raw: &str) -> MarketResult<Self> {
        let file: WeightsFile = serde_json::from_str(raw)
            .map_err(|e| MarketError::Model(format!("invalid weights file: {}", e)))?;

        if file.coefficients.len() != file.window {
            return Err(MarketError::Model(format!(
                "weights declare window {} but carry {} coefficients",
                file.window,
                file.coefficients.len()
            )));
        }

        Self::new(
            file.name.unwrap_or_else(|| "linear-window".to_string()),
            file.bias,
            file.coefficients,
        )
    }

    pub fn from_path(path: impl AsRef<Path>) -> MarketResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| MarketError::Model(format!("cannot read {}: {}", path.display(), e)))?;
        let model = Self::from_json(&raw)?;
        tracing::info!(
            "Loaded price model '{}' from {} (window {})",
            model.name,
            path.display(),
            model.coefficients.len()
        );
        Ok(model)
    }
}

#[async_trait]
impl PriceModel for LinearWindowModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn window_size(&self) -> usize {
        self.coefficients.len()
    }

    async fn predict(&self, window: &[f64]) -> MarketResult<f64> {
        if window.len() != self.coefficients.len() {
            return Err(MarketError::Model(format!(
                "expected window of {}, got {}",
                self.coefficients.len(),
                window.len()
            )));
        }

        let dot: f64 = window
            .iter()
            .zip(&self.coefficients)
            .map(|(x, w)| x * w)
            .sum();
        Ok(self.bias + dot)
    }
}
