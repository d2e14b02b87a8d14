use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::state::AppState;

pub const SERVICE_NAME: &str = "rewriter-backend";

#[derive(Debug, Default, Deserialize)]
pub struct HealthQuery {
    /// Also ping the LLM endpoint.
    #[serde(default)]
    pub probe: bool,
}

pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "started_at": state.started_at,
        "endpoints": ["POST /rewrite", "GET /health", "GET /api/stats", "GET /api/config"]
    }))
}

pub async fn health(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HealthQuery>,
) -> impl IntoResponse {
    let llm = state.rewriter.llm();
    let reachable = if query.probe {
        Some(llm.health_check().await)
    } else {
        None
    };
    let mode = if llm.embeddings_enabled() {
        "hybrid_embedding"
    } else {
        "hybrid_concept"
    };

    Json(json!({
        "ok": reachable.unwrap_or(true),
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "mode": mode,
        "components": {
            "llm": {
                "provider": llm.provider_name(),
                "model": llm.model(),
                "embeddings": llm.embeddings_enabled(),
                "reachable": reachable,
            },
            "retrieval": {
                "vocabulary": state.rewriter.retriever().vocabulary_size(),
                "top_k": state.settings.retrieval.top_k,
            },
        },
        "samples": state.samples.len(),
    }))
}
