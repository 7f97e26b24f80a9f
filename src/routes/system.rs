//! Public system endpoints plus /me.

use crate::error::Result;
use crate::extract::AuthIdentity;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

/// Capability manifest for client feature detection
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "capabilities": {
            "batch_operations": true,
            "media_upload": true,
            "image_optimization": true,
            "cursor_pagination": true,
            "selective_fields": true,
            "field_validation": true,
            "audit_log": state.audit.enabled(),
            "caching": state.cache.enabled(),
        },
        "endpoints": [
            "/version", "/health", "/me", "/dashboard",
            "/types", "/hidden-types",
            "/posts/{type}", "/post/{id}", "/batch",
            "/media", "/media/upload", "/media/{id}", "/media/{id}/optimized",
            "/schema", "/fields/{type}",
            "/search/{type}", "/terms/{taxonomy}", "/users",
            "/audit-log", "/apps", "/cache/clear",
        ],
    }))
}

/// Liveness of each collaborator; 503 as soon as any check fails
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = state.store.available().await;
    let schema_provider = state.schema.available().await;
    let uploads = state.store.uploads_writable().await;
    // a deliberately disabled cache is healthy; only probe when enabled
    let cache = !state.cache.enabled() || {
        state.cache.set("health:probe", json!(1), None);
        state.cache.get("health:probe").is_some()
    };

    let all_ok = database && schema_provider && uploads && cache;
    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(json!({
            "status": if all_ok { "ok" } else { "degraded" },
            "uptime_secs": state.uptime_secs(),
            "checks": {
                "database": database,
                "schemaProvider": schema_provider,
                "cache": cache,
                "uploads": uploads,
            },
        })),
    )
}

/// The caller's identity and effective capabilities
pub async fn me(
    State(_state): State<Arc<AppState>>,
    AuthIdentity(identity): AuthIdentity,
) -> Result<impl IntoResponse> {
    let admin = identity.is_admin();
    let edit = admin || identity.has_capability("edit_content");
    Ok(Json(json!({
        "id": identity.user_id,
        "name": identity.name,
        "email": identity.email,
        "roles": identity.roles,
        "is_admin": admin,
        "capabilities": identity.capabilities(),
        "can_edit": edit,
        "can_publish": admin || identity.has_capability("publish_content"),
        "can_delete": edit,
        "can_upload": edit,
        "can_manage": admin || identity.has_capability("manage_site"),
        "app_id": identity.app_id,
    })))
}
