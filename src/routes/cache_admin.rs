//! Cache administration (admin only).

use crate::error::Result;
use crate::extract::RequireAdmin;
use crate::state::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct ClearBody {
    /// Clear one logical key; omit to flush everything
    pub key: Option<String>,
}

pub async fn clear_cache(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    body: Option<Json<ClearBody>>,
) -> Result<impl IntoResponse> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let cleared = match &body.key {
        // revision- and parameter-qualified entries live under "{key}:...",
        // so a logical key clears its whole family
        Some(key) => {
            usize::from(state.cache.delete(key))
                + state.cache.delete_pattern(&format!("{key}:"))
        }
        None => {
            state.schema.invalidate();
            state.cache.flush_all()
        }
    };
    tracing::info!(cleared, key = body.key.as_deref(), "cache cleared");
    Ok(Json(json!({ "cleared": cleared })))
}
