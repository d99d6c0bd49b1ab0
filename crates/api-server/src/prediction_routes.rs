//! On-demand forecasts and the stored batch forecasts.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use market_core::{ForecastHorizon, ForecastReport, MarketError, StoredForecast};
use response_cache::{ttl, CacheKey};
use serde::Deserialize;

use crate::{ApiResponse, AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct ForecastRequest {
    pub coin: String,
    pub no_of_days: u32,
}

#[derive(Debug, Deserialize)]
pub struct StoredQuery {
    pub days: Option<String>,
}

pub fn prediction_routes() -> Router<AppState> {
    Router::new()
        .route("/api/predictions/forecast", post(forecast))
        .route("/api/predictions/:symbol", get(stored_predictions))
}

fn parse_days(raw: Option<&str>) -> Result<ForecastHorizon, MarketError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(ForecastHorizon::default()),
        Some(s) => {
            let days: u32 = s
                .parse()
                .map_err(|_| MarketError::Validation("Days must be 2, 7, or 14.".to_string()))?;
            ForecastHorizon::try_from(days)
        }
    }
}

async fn forecast(
    State(state): State<AppState>,
    Json(req): Json<ForecastRequest>,
) -> Result<Json<ApiResponse<ForecastReport>>, AppError> {
    let horizon = ForecastHorizon::try_from(req.no_of_days)?;
    let symbol = state.registry.resolve(&req.coin)?;

    tracing::info!("On-demand {}-day forecast for {}", horizon.days(), symbol);
    let report = state
        .pipeline
        .forecast_on_demand(state.history.as_ref(), symbol, horizon)
        .await?;

    Ok(Json(ApiResponse::success(report)))
}

async fn stored_predictions(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<StoredQuery>,
) -> Result<Json<ApiResponse<Vec<StoredForecast>>>, AppError> {
    let horizon = parse_days(query.days.as_deref())?;
    let symbol = state.registry.resolve(&symbol)?;
    let key = CacheKey::new("stored_predictions")
        .part(symbol)
        .part(horizon.days());

    let forecasts = state
        .cache
        .get_or_compute(&key, ttl::PREDICTION, || async {
            Ok::<_, AppError>(state.store.latest_forecasts(symbol, horizon.days()).await?)
        })
        .await?;

    Ok(Json(ApiResponse::success(forecasts)))
}
