use axum::{extract::State, routing::get, Json, Router};
use market_core::{InsightArticle, NewsArticle};
use response_cache::{ttl, CacheKey};

use crate::{ApiResponse, AppError, AppState};

const LIST_LIMIT: i64 = 200;

pub fn news_routes() -> Router<AppState> {
    Router::new()
        .route("/api/news", get(list_news))
        .route("/api/insights", get(list_insights))
}

async fn list_news(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<NewsArticle>>>, AppError> {
    let key = CacheKey::new("news_list").part(LIST_LIMIT);
    let articles = state
        .cache
        .get_or_compute(&key, ttl::NEWS_LIST, || async {
            Ok::<_, AppError>(state.store.recent_news(LIST_LIMIT).await?)
        })
        .await?;
    Ok(Json(ApiResponse::success(articles)))
}

async fn list_insights(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<InsightArticle>>>, AppError> {
    let key = CacheKey::new("insight_list").part(LIST_LIMIT);
    let insights = state
        .cache
        .get_or_compute(&key, ttl::NEWS_LIST, || async {
            Ok::<_, AppError>(state.store.recent_insights(LIST_LIMIT).await?)
        })
        .await?;
    Ok(Json(ApiResponse::success(insights)))
}
