use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use coin_store::{Feedback, FeedbackInput};

use crate::{ApiResponse, AppError, AppState};

pub fn feedback_routes() -> Router<AppState> {
    Router::new()
        .route("/api/feedback", get(list_feedback).post(create_feedback))
        .route("/api/feedback/:id", put(update_feedback).delete(delete_feedback))
}

fn missing(id: i64) -> AppError {
    AppError::not_found(format!("Feedback {} not found", id))
}

async fn list_feedback(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Feedback>>>, AppError> {
    let items = state.store.list_feedback().await?;
    Ok(Json(ApiResponse::success(items)))
}

async fn create_feedback(
    State(state): State<AppState>,
    Json(input): Json<FeedbackInput>,
) -> Result<(StatusCode, Json<ApiResponse<Feedback>>), AppError> {
    let created = state.store.create_feedback(&input).await?;
    tracing::info!("Feedback {} created", created.id);
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

async fn update_feedback(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<FeedbackInput>,
) -> Result<Json<ApiResponse<Feedback>>, AppError> {
    let updated = state
        .store
        .update_feedback(id, &input)
        .await?
        .ok_or_else(|| missing(id))?;
    Ok(Json(ApiResponse::success(updated)))
}

async fn delete_feedback(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<i64>>, AppError> {
    if !state.store.delete_feedback(id).await? {
        return Err(missing(id));
    }
    Ok(Json(ApiResponse::success(id)))
}
