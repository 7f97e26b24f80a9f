//! Media library endpoints.
//!
//! Upload takes a JSON body with base64 content; multipart parsing is
//! left to the upstream proxy layer.

use crate::audit::{AuditAction, AuditEvent};
use crate::error::{ApiError, Result};
use crate::extract::{AuthIdentity, ClientMeta};
use crate::policy::Action;
use crate::query::{decode_cursor, encode_cursor};
use crate::state::AppState;
use crate::store::{MediaRecord, MediaUpload};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

fn media_json(record: &MediaRecord) -> Value {
    json!({
        "id": record.id,
        "url": record.url,
        "filename": record.filename,
        "filesize": record.filesize,
        "mime_type": record.mime_type,
        "alt": record.alt,
        "title": record.title,
        "sizes": record.sizes,
        "uploaded": record.uploaded.format("%Y-%m-%d %H:%M:%S").to_string(),
    })
}

#[derive(Debug, Deserialize)]
pub struct MediaListParams {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub media_type: Option<String>,
    pub cursor: Option<String>,
}

/// Page and cursor modes, same contract as the post listings: a present
/// `cursor` wins over `page`, and any full page offers a follow-up cursor.
pub async fn list_media(
    State(state): State<Arc<AppState>>,
    AuthIdentity(_identity): AuthIdentity,
    Query(params): Query<MediaListParams>,
) -> Result<impl IntoResponse> {
    let per_page = params.per_page.unwrap_or(20).clamp(1, 100);
    let cursor_mode = params.cursor.is_some();
    let after = params.cursor.as_deref().and_then(decode_cursor);
    let page = if cursor_mode {
        1
    } else {
        params.page.unwrap_or(1).max(1)
    };
    let offset = if cursor_mode { 0 } else { (page - 1) * per_page };
    let (records, total) = state
        .store
        .list_media(params.media_type.as_deref(), after, offset, per_page)
        .await;

    let mut body = serde_json::Map::new();
    body.insert(
        "media".to_string(),
        json!(records.iter().map(media_json).collect::<Vec<_>>()),
    );
    body.insert("total".to_string(), json!(total));
    if !cursor_mode {
        body.insert("pages".to_string(), json!(total.div_ceil(per_page as u64)));
        body.insert("page".to_string(), json!(page));
    }
    if records.len() == per_page {
        if let Some(last) = records.last() {
            body.insert(
                "next_cursor".to_string(),
                json!(encode_cursor(last.id, last.uploaded)),
            );
        }
    }
    Ok(Json(Value::Object(body)))
}

#[derive(Debug, Deserialize)]
pub struct UploadBody {
    pub filename: String,
    pub content_base64: String,
    pub mime_type: String,
    pub alt: Option<String>,
    pub title: Option<String>,
}

pub async fn upload_media(
    State(state): State<Arc<AppState>>,
    AuthIdentity(identity): AuthIdentity,
    meta: ClientMeta,
    Json(body): Json<UploadBody>,
) -> Result<impl IntoResponse> {
    if !state.policy.can_perform(&identity, Action::Upload) {
        return Err(ApiError::forbidden("You cannot upload media"));
    }
    if body.filename.trim().is_empty() {
        return Err(ApiError::UploadError("No filename provided".to_string()));
    }
    let bytes = BASE64
        .decode(body.content_base64.as_bytes())
        .map_err(|_| ApiError::UploadError("Content is not valid base64".to_string()))?;
    if bytes.is_empty() {
        return Err(ApiError::UploadError("Empty upload".to_string()));
    }
    if bytes.len() > state.config.upload_max_bytes {
        return Err(ApiError::UploadError(format!(
            "Upload exceeds the {} byte limit",
            state.config.upload_max_bytes
        )));
    }

    let record = state
        .store
        .store_media(MediaUpload {
            filename: body.filename,
            mime_type: body.mime_type,
            bytes,
            alt: body.alt,
            title: body.title,
        })
        .await
        .map_err(|e| ApiError::UploadFailed(e.to_string()))?;

    state.audit.log(AuditEvent {
        user_id: identity.user_id,
        user_name: identity.name.clone(),
        action: AuditAction::Upload,
        object_type: "media".to_string(),
        object_id: Some(record.id),
        object_title: Some(record.filename.clone()),
        changes: json!({ "filesize": record.filesize, "mime_type": record.mime_type }),
        ip: meta.ip,
        user_agent: meta.user_agent,
    });
    tracing::info!(media_id = record.id, "media uploaded");
    Ok((StatusCode::CREATED, Json(media_json(&record))))
}

pub async fn get_media(
    State(state): State<Arc<AppState>>,
    AuthIdentity(_identity): AuthIdentity,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse> {
    let record = state
        .store
        .get_media(id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Media {id} not found")))?;
    Ok(Json(media_json(&record)))
}

pub async fn delete_media(
    State(state): State<Arc<AppState>>,
    AuthIdentity(identity): AuthIdentity,
    meta: ClientMeta,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse> {
    if !state.policy.can_perform(&identity, Action::Upload) {
        return Err(ApiError::forbidden("You cannot delete media"));
    }
    let record = state
        .store
        .get_media(id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Media {id} not found")))?;
    state
        .store
        .delete_media(id)
        .await
        .map_err(|e| ApiError::DeleteFailed(e.to_string()))?;

    state.audit.log(AuditEvent {
        user_id: identity.user_id,
        user_name: identity.name.clone(),
        action: AuditAction::Delete,
        object_type: "media".to_string(),
        object_id: Some(id),
        object_title: Some(record.filename),
        changes: Value::Null,
        ip: meta.ip,
        user_agent: meta.user_agent,
    });
    Ok(Json(json!({ "deleted": true, "id": id })))
}

/// Best delivery variant for constrained clients: the medium size when
/// one was derived, otherwise the original.
pub async fn optimized_media(
    State(state): State<Arc<AppState>>,
    AuthIdentity(_identity): AuthIdentity,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse> {
    let record = state
        .store
        .get_media(id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Media {id} not found")))?;
    let (url, optimized) = match record.sizes.get("medium") {
        Some(medium) => (medium.clone(), true),
        None => (record.url.clone(), false),
    };
    Ok(Json(json!({
        "id": record.id,
        "url": url,
        "optimized": optimized,
        "mime_type": record.mime_type,
    })))
}
