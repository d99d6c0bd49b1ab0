//! Hourly coin details collected by the fetcher.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use market_core::{CoinDetail, TrackedSymbol};
use response_cache::{ttl, CacheKey};
use serde::{Deserialize, Serialize};

use crate::{ApiResponse, AppError, AppState};

const DEFAULT_CHART_HOURS: i64 = 24;

/// One row of the coin overview table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinSummary {
    pub coin: TrackedSymbol,
    pub image_url: Option<String>,
    pub current_price: Option<f64>,
    pub high_price: Option<f64>,
    pub low_price: Option<f64>,
    pub volume_to: Option<f64>,
    pub percent_change_24h: Option<f64>,
    pub percent_change_7d: Option<f64>,
    pub market_cap: Option<f64>,
}

impl CoinSummary {
    fn from_detail(coin: TrackedSymbol, detail: CoinDetail) -> Self {
        Self {
            coin,
            image_url: detail.image_url,
            current_price: detail.close_price,
            high_price: detail.high_price,
            low_price: detail.low_price,
            volume_to: detail.volume_to,
            percent_change_24h: detail.percent_change_24h,
            percent_change_7d: detail.percent_change_7d,
            market_cap: detail.market_cap,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartPoint {
    pub time: String,
    pub close_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    pub hours: Option<String>,
}

pub fn coin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/coins", get(list_coins))
        .route("/api/coins/:symbol", get(coin_detail))
        .route("/api/coins/:symbol/chart", get(coin_chart))
}

/// Positive hour count, or the default for anything unparseable.
fn chart_hours(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|h| *h > 0)
        .unwrap_or(DEFAULT_CHART_HOURS)
}

/// Start of the chart window; spans past the representable range use the default.
fn chart_since(now: DateTime<Utc>, raw: Option<&str>) -> DateTime<Utc> {
    let back = |hours: i64| Duration::try_hours(hours).and_then(|d| now.checked_sub_signed(d));
    back(chart_hours(raw))
        .or_else(|| back(DEFAULT_CHART_HOURS))
        .unwrap_or(now)
}

async fn list_coins(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<CoinSummary>>>, AppError> {
    // details land hourly, so the listing is keyed by the current hour
    let key = CacheKey::new("coin_details").part(Utc::now().format("%Y%m%d%H"));

    let coins = state
        .cache
        .get_or_compute(&key, ttl::COIN_DETAILS, || async {
            let mut coins = Vec::with_capacity(state.registry.len());
            for &symbol in state.registry.symbols() {
                if let Some(detail) = state.store.latest_coin_detail(symbol).await? {
                    coins.push(CoinSummary::from_detail(symbol, detail));
                }
            }
            Ok::<_, AppError>(coins)
        })
        .await?;

    Ok(Json(ApiResponse::success(coins)))
}

async fn coin_detail(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<CoinDetail>>, AppError> {
    let symbol = state.registry.resolve(&symbol)?;
    let detail = state
        .store
        .latest_coin_detail(symbol)
        .await?
        .ok_or_else(|| AppError::not_found(format!("No details stored for {}", symbol)))?;

    Ok(Json(ApiResponse::success(detail)))
}

async fn coin_chart(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<ChartQuery>,
) -> Result<Json<ApiResponse<Vec<ChartPoint>>>, AppError> {
    let symbol = state.registry.resolve(&symbol)?;
    let since = chart_since(Utc::now(), query.hours.as_deref());

    let points = state
        .store
        .hourly_closes(symbol, since)
        .await?
        .into_iter()
        .map(|row| ChartPoint {
            time: row.time.format("%Y-%m-%d %H:%M").to_string(),
            close_price: row.close_price,
        })
        .collect();

    Ok(Json(ApiResponse::success(points)))
}
