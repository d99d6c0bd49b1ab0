//! Shared router fixtures: in-memory store and cache, a naive model and
//! offline text generation.

use std::sync::Arc;

use analysis_orchestrator::{AnalysisService, HistorySource, PredictionPipeline};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use coin_store::CoinStore;
use forecast_engine::{ForecastConfig, ForecastEngine, LinearWindowModel};
use market_client::{MarketClient, MarketClientConfig};
use market_core::{
    Headline, MarketError, MarketResult, NewsSource, PricePoint, SymbolRegistry, TextGenerator, TrackedSymbol,
};
use response_cache::ResponseCache;
use serde_json::Value;
use tower::ServiceExt;

use crate::AppState;

const WINDOW: usize = 5;

struct Offline;

#[async_trait]
impl TextGenerator for Offline {
    async fn complete(&self, _system: Option<&str>, _prompt: &str) -> MarketResult<String> {
        Err(MarketError::UpstreamUnavailable("offline".to_string()))
    }
}

#[async_trait]
impl NewsSource for Offline {
    async fn headlines(&self, _query: &str, _limit: usize) -> MarketResult<Vec<Headline>> {
        Ok(Vec::new())
    }
}

struct FixedHistory;

#[async_trait]
impl HistorySource for FixedHistory {
    async fn daily_closes(&self, _symbol: TrackedSymbol) -> MarketResult<Vec<PricePoint>> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Ok((0..60)
            .map(|i| PricePoint {
                timestamp: start + Duration::days(i),
                close: 2000.0 + (i as f64 * 0.5).sin() * 50.0 + i as f64,
            })
            .collect())
    }
}

pub async fn test_state() -> AppState {
    let store = CoinStore::connect("sqlite::memory:").await.unwrap();
    let cache = ResponseCache::in_memory();

    let model = Arc::new(LinearWindowModel::naive(WINDOW).unwrap());
    let engine = ForecastEngine::new(model, &ForecastConfig { window: WINDOW }).unwrap();
    let analysis = AnalysisService::new(Arc::new(Offline), Arc::new(Offline), cache.clone());
    let pipeline = PredictionPipeline::new(engine, analysis, cache.clone());

    AppState {
        store,
        cache,
        market: MarketClient::new(MarketClientConfig::default()),
        pipeline: Arc::new(pipeline),
        history: Arc::new(FixedHistory),
        registry: Arc::new(SymbolRegistry::default()),
    }
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read_json(response).await
}

pub async fn send_json(app: Router, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    read_json(app.oneshot(request).await.unwrap()).await
}
