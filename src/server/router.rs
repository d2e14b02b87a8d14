use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::config::ServerSettings;
use crate::server::handlers::{config, health, rewrite, stats};
use crate::state::AppState;

/// Creates the application router.
///
/// - `POST /rewrite` and `POST /api/rewrite`
/// - `GET /health`, `GET /`
/// - `GET /api/stats`, `GET /api/config`
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.settings.server);
    Router::new()
        .route("/", get(health::index))
        .route("/health", get(health::health))
        .route("/rewrite", post(rewrite::rewrite))
        .route("/api/rewrite", post(rewrite::rewrite))
        .route("/api/stats", get(stats::sample_stats))
        .route("/api/config", get(config::get_config))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(server: &ServerSettings) -> CorsLayer {
    let allowed_origins = resolve_allowed_origins(server)
        .into_iter()
        .filter_map(|origin| HeaderValue::from_str(&origin).ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

fn resolve_allowed_origins(server: &ServerSettings) -> Vec<String> {
    let origins = server
        .cors_allowed_origins
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.to_string())
        .collect::<Vec<_>>();

    if origins.is_empty() {
        return default_local_origins();
    }

    origins
}

fn default_local_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
        "http://127.0.0.1".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ]
}
