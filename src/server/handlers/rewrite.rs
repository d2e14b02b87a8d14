use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::pipeline::RewriteRequest;
use crate::state::AppState;

/// Wire shape of `POST /rewrite`. `genre`, `style` and `genres` are all
/// accepted column hints; the single-value fields take precedence.
#[derive(Debug, Deserialize)]
pub struct RewritePayload {
    pub text: String,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub strict_mode: bool,
}

impl From<RewritePayload> for RewriteRequest {
    fn from(payload: RewritePayload) -> Self {
        let columns = payload
            .genre
            .into_iter()
            .chain(payload.style)
            .chain(payload.genres)
            .collect();
        RewriteRequest {
            text: payload.text,
            columns,
            strict_mode: payload.strict_mode,
        }
    }
}

pub async fn rewrite(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RewritePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.rewriter.rewrite(payload.into()).await?;
    Ok(Json(result))
}
