//! Connected-application listing and revocation (admin only).

use crate::error::Result;
use crate::extract::RequireAdmin;
use crate::state::AppState;
use crate::tracker::{AppListQuery, AppOrderBy};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct AppsParams {
    pub user_id: Option<u64>,
    pub orderby: Option<String>,
    pub order: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

pub async fn list_apps(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<AppsParams>,
) -> Result<impl IntoResponse> {
    let per_page = params.per_page.unwrap_or(50).clamp(1, 200);
    let page = params.page.unwrap_or(1).max(1);
    let (apps, total) = state.tracker.list(&AppListQuery {
        user_id: params.user_id,
        order_by: params
            .orderby
            .as_deref()
            .map(AppOrderBy::parse)
            .unwrap_or_default(),
        ascending: matches!(params.order.as_deref(), Some("asc") | Some("ASC")),
        offset: (page - 1) * per_page,
        limit: Some(per_page),
    });
    Ok(Json(json!({ "apps": apps, "total": total, "page": page })))
}

pub async fn remove_app(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    Path((user_id, app_id)): Path<(u64, String)>,
) -> Result<impl IntoResponse> {
    let removed = state.tracker.remove(user_id, &app_id);
    tracing::info!(user_id, app_id = %app_id, removed, "app revoked");
    Ok(Json(json!({ "removed": removed })))
}
