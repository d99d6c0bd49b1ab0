use async_trait::async_trait;
use market_core::{MarketError, MarketResult, PriceModel};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{InferenceError, InferenceResult};

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    window: &'a [f64],
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    prediction: f64,
}

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    windows: &'a [Vec<f64>],
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    predictions: Vec<f64>,
}

/// Price model served over HTTP (`POST /predict`, `POST /predict_batch`).
#[derive(Clone)]
pub struct RemotePriceModel {
    client: reqwest::Client,
    base_url: String,
    window: usize,
}

impl RemotePriceModel {
    pub fn new(base_url: String, window: usize, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            window,
        }
    }

    async fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &Req,
    ) -> InferenceResult<Resp> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
                return Err(InferenceError::ModelNotLoaded);
            }
            return Err(InferenceError::ServiceUnavailable(format!("Status: {}", status)));
        }

        Ok(response.json::<Resp>().await?)
    }

    /// Check service health
    pub async fn health(&self) -> InferenceResult<bool> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;

        Ok(response.status().is_success())
    }
}

#[async_trait]
impl PriceModel for RemotePriceModel {
    fn name(&self) -> &str {
        "remote"
    }

    fn window_size(&self) -> usize {
        self.window
    }

    async fn predict(&self, window: &[f64]) -> MarketResult<f64> {
        let out: PredictResponse = self.post("/predict", &PredictRequest { window }).await?;
        Ok(out.prediction)
    }

    async fn predict_batch(&self, windows: &[Vec<f64>]) -> MarketResult<Vec<f64>> {
        let out: BatchResponse = self.post("/predict_batch", &BatchRequest { windows }).await?;
        if out.predictions.len() != windows.len() {
            return Err(MarketError::Model(format!(
                "model service returned {} predictions for {} windows",
                out.predictions.len(),
                windows.len()
            )));
        }
        Ok(out.predictions)
    }
}
