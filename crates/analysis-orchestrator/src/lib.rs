//! Forecasting and analysis wired together: model loading, narrative
//! generation with fallbacks, article classification and the prediction
//! pipeline shared by the API and the batch job.

use std::sync::Arc;

use anyhow::Context;
use forecast_engine::{ForecastConfig, ForecastEngine};
use inference_client::InferenceConfig;
use market_client::MarketClient;
use response_cache::ResponseCache;

pub mod analysis;
pub mod classify;
pub mod history;
pub mod model;
pub mod pipeline;

pub use analysis::{parse_price_analysis, AnalysisService, ForecastAnalysis};
pub use classify::{classify_insight, classify_news, parse_news_classification, NewsClassification};
pub use history::{ExchangeHistory, HistorySource};
pub use model::{build_price_model, ModelSource};
pub use pipeline::{PredictionPipeline, BATCH_HORIZON, ON_DEMAND_FIT_FRACTION};

/// Token limit for narrative generation; a 14-day analysis needs room.
const ANALYSIS_MAX_TOKENS: u32 = 1500;
const ANALYSIS_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub forecast: ForecastConfig,
    pub inference: InferenceConfig,
    pub model: ModelSource,
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self {
            forecast: ForecastConfig::from_env(),
            inference: InferenceConfig::default(),
            model: ModelSource::from_env(),
        }
    }
}

/// Build the pipeline from configuration. Fails if the model cannot be loaded
/// or does not match the configured window.
pub fn build_pipeline(
    config: &PipelineConfig,
    market: &MarketClient,
    cache: ResponseCache,
) -> anyhow::Result<PredictionPipeline> {
    let model = build_price_model(&config.model, &config.forecast, config.inference.timeout)
        .context("loading price model")?;
    let engine = ForecastEngine::new(model, &config.forecast).context("building forecast engine")?;

    let generator = config
        .inference
        .chat_client()
        .with_params(ANALYSIS_MAX_TOKENS, ANALYSIS_TEMPERATURE);
    let analysis = AnalysisService::new(Arc::new(generator), Arc::new(market.news.clone()), cache.clone());

    Ok(PredictionPipeline::new(engine, analysis, cache))
}
