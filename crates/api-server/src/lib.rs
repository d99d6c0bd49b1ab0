//! REST API over the coin store, the live market clients and the
//! prediction pipeline.

use std::net::SocketAddr;
use std::sync::Arc;

use analysis_orchestrator::{build_pipeline, ExchangeHistory, HistorySource, PipelineConfig, PredictionPipeline};
use axum::{
    http::{HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    Json, Router,
};
use coin_store::{CoinStore, StoreError};
use market_client::MarketClient;
use market_core::{MarketError, SymbolRegistry};
use response_cache::{CacheConfig, ResponseCache};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod coin_routes;
pub mod feedback_routes;
pub mod health;
pub mod market_routes;
pub mod news_routes;
pub mod prediction_routes;
pub mod request_id;
pub mod security_headers;

#[cfg(test)]
mod test_support;

/// Live history reaches back this far for on-demand forecasts.
const ON_DEMAND_LOOKBACK_DAYS: i64 = 10 * 365;

#[derive(Clone)]
pub struct AppState {
    pub store: CoinStore,
    pub cache: ResponseCache,
    pub market: MarketClient,
    pub pipeline: Arc<PredictionPipeline>,
    pub history: Arc<dyn HistorySource>,
    pub registry: Arc<SymbolRegistry>,
}

/// JSON envelope for every response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Handler error: a status plus the underlying cause.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, anyhow::anyhow!(message.into()))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, anyhow::anyhow!(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// Status for a domain error found anywhere in the chain.
fn classify(error: &anyhow::Error) -> StatusCode {
    if let Some(market) = error.downcast_ref::<MarketError>() {
        return match market {
            MarketError::NoData(_) => StatusCode::NOT_FOUND,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            e if e.is_upstream_error() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
    }
    if let Some(StoreError::Validation(_)) = error.downcast_ref::<StoreError>() {
        return StatusCode::BAD_REQUEST;
    }
    StatusCode::INTERNAL_SERVER_ERROR
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let error = err.into();
        Self {
            status: classify(&error),
            error,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.status.is_server_error() {
            tracing::error!("Request failed ({}): {:#}", self.status, self.error);
            match self.status {
                StatusCode::BAD_GATEWAY => "Upstream service unavailable".to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            self.error.to_string()
        };

        (self.status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

fn cors_layer() -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let origins: Vec<HeaderValue> = std::env::var("CORS_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    if origins.is_empty() {
        base.allow_origin(Any)
    } else {
        base.allow_origin(origins)
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::health_routes())
        .merge(market_routes::market_routes())
        .merge(prediction_routes::prediction_routes())
        .merge(news_routes::news_routes())
        .merge(coin_routes::coin_routes())
        .merge(feedback_routes::feedback_routes())
        .with_state(state)
        .layer(middleware::from_fn(security_headers::security_headers_middleware))
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .layer(cors_layer())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "api_server=info,analysis_orchestrator=info,tower_http=info,market_client=warn".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let registry = SymbolRegistry::from_env()?;
    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:coins.db".to_string());
    let store = CoinStore::connect(&database_url).await?;
    let cache = ResponseCache::from_config(&CacheConfig::from_env()).await;
    let market = MarketClient::from_env();

    let pipeline = build_pipeline(&PipelineConfig::from_env(), &market, cache.clone())?;
    let history = ExchangeHistory::new(
        market.binance.clone(),
        chrono::Duration::days(ON_DEMAND_LOOKBACK_DAYS),
    );

    let state = AppState {
        store,
        cache,
        market,
        pipeline: Arc::new(pipeline),
        history: Arc::new(history),
        registry: Arc::new(registry),
    };

    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Could not listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
