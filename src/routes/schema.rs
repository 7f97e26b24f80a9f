//! Field schema endpoints, cached for an hour.

use crate::error::Result;
use crate::extract::AuthIdentity;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const SCHEMA_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Schema for every visible content type.
///
/// The provider revision is part of the cache key, so a definition change
/// upstream stops stale bodies being served for the rest of their TTL.
pub async fn full_schema(
    State(state): State<Arc<AppState>>,
    AuthIdentity(_identity): AuthIdentity,
) -> Result<impl IntoResponse> {
    let key = format!("schema:{}", state.schema.revision().await);
    if let Some(hit) = state.cache.get(&key) {
        return Ok(Json(hit));
    }
    let mut schemas: Vec<Value> = Vec::new();
    for record in state.store.list_types().await {
        if super::lookup::type_hidden(&state.config, &record.slug) {
            continue;
        }
        schemas.push(state.schema.schema_response(&record.slug).await?);
    }
    let body = json!({ "schemas": schemas });
    state.cache.set(&key, body.clone(), Some(SCHEMA_CACHE_TTL));
    Ok(Json(body))
}

/// Schema for one content type: `{postType, fields, fieldOrder}`
pub async fn fields_for_type(
    State(state): State<Arc<AppState>>,
    AuthIdentity(_identity): AuthIdentity,
    Path(post_type): Path<String>,
) -> Result<impl IntoResponse> {
    let key = format!("fields:{}:{post_type}", state.schema.revision().await);
    if let Some(hit) = state.cache.get(&key) {
        return Ok(Json(hit));
    }
    let body = state.schema.schema_response(&post_type).await?;
    state.cache.set(&key, body.clone(), Some(SCHEMA_CACHE_TTL));
    Ok(Json(body))
}
