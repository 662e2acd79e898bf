use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, patch, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::SharedState;

pub mod auth;
mod error;
pub mod events;
mod habits;
mod health;
mod observability;
mod progress;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn notifier(&self) -> &crate::services::Notifier {
        &self.shared.notifier
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().read().await.server.cors_allowed_origins.clone();

    let protected_routes = create_protected_router(state.clone());

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/health", get(health::health))
        .merge(events::router())
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/me", get(auth::get_current_user))
        .route("/habits", get(habits::list_habits))
        .route("/habits", post(habits::create_habit))
        .route("/habits/stats/overview", get(habits::stats_overview))
        .route("/habits/{id}", get(habits::get_habit))
        .route("/habits/{id}", put(habits::update_habit))
        .route("/habits/{id}", delete(habits::delete_habit))
        .route("/habits/{id}/toggle-status", patch(habits::toggle_status))
        .route("/progress", get(progress::list_progress))
        .route("/progress", post(progress::upsert_progress))
        .route("/progress/stats/overview", get(progress::stats_overview))
        .route("/progress/date/{date}", get(progress::list_progress_for_date))
        .route(
            "/progress/habit/{habit_id}",
            get(progress::list_progress_for_habit),
        )
        .route("/progress/{id}", put(progress::update_progress))
        .route("/progress/{id}", delete(progress::delete_progress))
        .route(
            "/progress/{id}/toggle-completion",
            patch(progress::toggle_completion),
        )
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            health::guard_writes,
        ))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
