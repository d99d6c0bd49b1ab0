//! Live market data proxied from CoinGecko and cached per operation.

use axum::{extract::State, routing::{get, post}, Json, Router};
use coin_store::CryptoSymbol;
use market_client::{CoinSnapshot, MarketOrder, TrendingCoin};
use market_core::{MarketError, TrackedSymbol};
use response_cache::{ttl, CacheKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ApiResponse, AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct CoinRequest {
    pub coin: String,
}

#[derive(Debug, Deserialize)]
pub struct ChartRequest {
    pub coin: String,
    pub period: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PriceChart {
    pub chart: Vec<[f64; 2]>,
}

pub fn market_routes() -> Router<AppState> {
    Router::new()
        .route("/api/market/snapshot", post(coin_snapshot))
        .route("/api/market/chart", post(price_chart))
        .route("/api/market/top-volume", get(top_volume))
        .route("/api/market/trending", get(trending))
        .route("/api/market/market-cap", get(market_cap))
        .route("/api/market/exchanges", get(exchanges))
        .route("/api/symbols", get(symbols))
}

/// Map user input to a CoinGecko id: a tracked ticker or pair, or a raw id.
pub(crate) fn coin_id(raw: &str) -> Result<String, AppError> {
    if let Ok(symbol) = raw.parse::<TrackedSymbol>() {
        return Ok(symbol.coingecko_id().to_string());
    }

    let id = raw.trim().to_lowercase();
    let valid = !id.is_empty()
        && id.len() <= 64
        && id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(id)
    } else {
        Err(AppError::bad_request(format!("Invalid coin: {}", raw.trim())))
    }
}

fn period_days(period: &str) -> Result<u32, AppError> {
    match period.trim().to_lowercase().as_str() {
        "week" => Ok(7),
        "month" => Ok(30),
        other => Err(AppError::bad_request(format!(
            "Invalid period '{}': use week or month",
            other
        ))),
    }
}

async fn coin_snapshot(
    State(state): State<AppState>,
    Json(req): Json<CoinRequest>,
) -> Result<Json<ApiResponse<CoinSnapshot>>, AppError> {
    let id = coin_id(&req.coin)?;
    let key = CacheKey::new("market_snapshot").part(&id);

    let snapshot = state
        .cache
        .get_or_compute(&key, ttl::LIVE_SNAPSHOT, || state.market.coingecko.coin_snapshot(&id))
        .await?;

    Ok(Json(ApiResponse::success(snapshot)))
}

async fn price_chart(
    State(state): State<AppState>,
    Json(req): Json<ChartRequest>,
) -> Result<Json<ApiResponse<PriceChart>>, AppError> {
    let id = coin_id(&req.coin)?;
    let days = period_days(&req.period)?;
    let key = CacheKey::new("market_chart").part(&id).part(days);

    let chart = state
        .cache
        .get_or_compute(&key, ttl::PRICE_CHART, || async {
            let chart = state.market.coingecko.market_chart(&id, days).await?;
            Ok::<_, MarketError>(PriceChart { chart })
        })
        .await?;

    Ok(Json(ApiResponse::success(chart)))
}

async fn markets(state: &AppState, order: MarketOrder, operation: &str) -> Result<Vec<Value>, AppError> {
    let key = CacheKey::new(operation);
    let list = state
        .cache
        .get_or_compute(&key, ttl::MARKET_LIST, || state.market.coingecko.markets(order))
        .await?;
    Ok(list)
}

async fn top_volume(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Value>>>, AppError> {
    let list = markets(&state, MarketOrder::VolumeDesc, "top_volume").await?;
    Ok(Json(ApiResponse::success(list)))
}

async fn market_cap(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Value>>>, AppError> {
    let list = markets(&state, MarketOrder::MarketCapDesc, "top_market_cap").await?;
    Ok(Json(ApiResponse::success(list)))
}

async fn trending(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<TrendingCoin>>>, AppError> {
    let key = CacheKey::new("trending");
    let coins = state
        .cache
        .get_or_compute(&key, ttl::MARKET_LIST, || state.market.coingecko.trending())
        .await?;
    Ok(Json(ApiResponse::success(coins)))
}

async fn exchanges(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Value>>>, AppError> {
    let key = CacheKey::new("top_exchanges");
    let list = state
        .cache
        .get_or_compute(&key, ttl::MARKET_LIST, || state.market.coingecko.top_exchanges())
        .await?;
    Ok(Json(ApiResponse::success(list)))
}

/// Trading pairs imported by the symbol job.
async fn symbols(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<CryptoSymbol>>>, AppError> {
    let key = CacheKey::new("symbol_list");
    let list = state
        .cache
        .get_or_compute(&key, ttl::SYMBOL_LIST, || async {
            Ok::<_, AppError>(state.store.list_symbols().await?)
        })
        .await?;
    Ok(Json(ApiResponse::success(list)))
}
