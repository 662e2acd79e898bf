use axum::{
    Json,
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, HealthDto};

/// GET /health — unauthenticated; reports store connectivity without
/// failing the request, so load balancers always get an answer.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthDto>> {
    let db_up = state.shared.db_health.is_up();

    Json(ApiResponse::success(HealthDto {
        status: if db_up { "ok" } else { "degraded" }.to_string(),
        database: if db_up { "connected" } else { "unreachable" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    }))
}

/// Rejects mutating requests while the store is unreachable. Reads are
/// allowed through; they fail on their own if the pool is truly gone.
pub async fn guard_writes(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let method = request.method();
    let mutating = method == Method::POST
        || method == Method::PUT
        || method == Method::PATCH
        || method == Method::DELETE;

    if mutating && !state.shared.db_health.is_up() {
        return Err(ApiError::ServiceUnavailable(
            "Store is unreachable, retry shortly".to_string(),
        ));
    }

    Ok(next.run(request).await)
}
