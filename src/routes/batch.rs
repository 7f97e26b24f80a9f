//! Batch endpoint

use crate::audit::{AuditAction, AuditEvent};
use crate::batch::{self, BatchRequest};
use crate::error::Result;
use crate::extract::{AuthIdentity, ClientMeta};
use crate::state::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

pub async fn execute_batch(
    State(state): State<Arc<AppState>>,
    AuthIdentity(identity): AuthIdentity,
    meta: ClientMeta,
    Json(request): Json<BatchRequest>,
) -> Result<impl IntoResponse> {
    let response = batch::execute(&state, &identity, &request).await?;

    // one audit entry for the whole batch, never per sub-operation
    state.audit.log(AuditEvent {
        user_id: identity.user_id,
        user_name: identity.name.clone(),
        action: AuditAction::Batch,
        object_type: "batch".to_string(),
        object_id: None,
        object_title: None,
        changes: json!({ "count": response.summary.total }),
        ip: meta.ip,
        user_agent: meta.user_agent,
    });
    tracing::info!(
        total = response.summary.total,
        errors = response.summary.errors,
        "batch executed"
    );
    Ok(Json(response))
}
