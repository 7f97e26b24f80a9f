//! Audit trail endpoint (admin only).

use crate::audit::AuditQuery;
use crate::error::Result;
use crate::extract::RequireAdmin;
use crate::fields::codec::parse_datetime;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct AuditLogParams {
    pub user_id: Option<u64>,
    pub action: Option<String>,
    pub object_type: Option<String>,
    pub object_id: Option<u64>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub order: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

fn parse_bound(input: Option<&str>) -> Option<DateTime<Utc>> {
    input
        .and_then(parse_datetime)
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

pub async fn list_audit_log(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<AuditLogParams>,
) -> Result<impl IntoResponse> {
    let per_page = params.per_page.unwrap_or(50).clamp(1, 200);
    let page = params.page.unwrap_or(1).max(1);
    let query = AuditQuery {
        user_id: params.user_id,
        action: params.action,
        object_type: params.object_type,
        object_id: params.object_id,
        from: parse_bound(params.from.as_deref()),
        to: parse_bound(params.to.as_deref()),
        ascending: matches!(params.order.as_deref(), Some("asc") | Some("ASC")),
        offset: (page - 1) * per_page,
        limit: Some(per_page),
    };
    let (entries, total) = state.audit.query(&query);
    Ok(Json(json!({
        "entries": entries,
        "total": total,
        "pages": total.div_ceil(per_page as u64),
        "page": page,
    })))
}
