use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::{ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub api: &'static str,
    pub database: &'static str,
    pub cache: &'static str,
    pub status: &'static str,
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    let database = match state.store.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!("Database health check failed: {}", e);
            "unavailable"
        }
    };

    Json(ApiResponse::success(HealthStatus {
        api: "ok",
        database,
        cache: state.cache.backend_name(),
        status: if database == "ok" { "healthy" } else { "degraded" },
    }))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{get_json, test_state};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_health_reports_database_and_cache() {
        let app = crate::build_router(test_state().await);
        let (status, body) = get_json(app, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["api"], "ok");
        assert_eq!(body["data"]["database"], "ok");
        assert_eq!(body["data"]["status"], "healthy");
        assert_eq!(body["data"]["cache"], "memory");
    }
}
