//! Post CRUD endpoints.
//!
//! The get/update/delete pipelines are shared with the batch executor;
//! audit recording stays at the endpoint level so a batch is recorded
//! once, not per sub-operation.

use crate::audit::{AuditAction, AuditEvent};
use crate::error::{ApiError, Result};
use crate::extract::{AuthIdentity, ClientMeta};
use crate::policy::{Action, Identity};
use crate::query::ListParams;
use crate::state::AppState;
use crate::store::{NewPost, PostPatch, PostRecord, PostStatus};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

fn list_cache_key(post_type: &str, params: &ListParams) -> String {
    format!(
        "posts:{post_type}:p{}:pp{}:st{}:q{}:c{}:ob{}:o{}:f{}",
        params.page.unwrap_or(0),
        params.per_page.unwrap_or(0),
        params.status.as_deref().unwrap_or(""),
        params.search.as_deref().unwrap_or(""),
        params.cursor.as_deref().unwrap_or(""),
        params.orderby.as_deref().unwrap_or(""),
        params.order.as_deref().unwrap_or(""),
        params.fields.as_deref().unwrap_or(""),
    )
}

async fn require_visible_type(
    state: &AppState,
    identity: &Identity,
    post_type: &str,
) -> Result<()> {
    if !state.store.type_exists(post_type).await {
        return Err(ApiError::InvalidType(post_type.to_string()));
    }
    if !state.policy.can_access_content_type(identity, post_type) {
        return Err(ApiError::forbidden(format!(
            "You do not have access to the {post_type} content type"
        )));
    }
    Ok(())
}

/// Shared single-post read: not-found covers tombstoned posts, and the
/// caller must be able to see the post's content type.
pub(crate) async fn fetch_post(
    state: &AppState,
    identity: &Identity,
    id: u64,
) -> Result<PostRecord> {
    let post = state
        .store
        .get_post(id)
        .await
        .filter(|p| p.status != PostStatus::Trashed)
        .ok_or_else(|| ApiError::not_found(format!("Post {id} not found")))?;
    if !state.policy.can_access_content_type(identity, &post.post_type) {
        return Err(ApiError::forbidden(format!(
            "You do not have access to the {} content type",
            post.post_type
        )));
    }
    Ok(post)
}

/// Hidden definitions never surface in responses, so writes to them are
/// dropped rather than validated.
async fn drop_hidden(
    state: &AppState,
    post_type: &str,
    supplied: Map<String, Value>,
) -> Result<Map<String, Value>> {
    let hidden = match state.schema.hidden_names(post_type).await {
        Ok(names) => names,
        Err(ApiError::SchemaUnavailable) => Vec::new(),
        Err(e) => return Err(e),
    };
    Ok(supplied
        .into_iter()
        .filter(|(name, _)| !hidden.contains(name))
        .collect())
}

/// Body accepted by update; everything is optional
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBody {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub status: Option<String>,
    pub thumbnail_id: Option<u64>,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// Shared update pipeline: capability, validation, persist, invalidate.
/// Returns the updated post's wire form plus the touched field names.
pub(crate) async fn apply_update(
    state: &AppState,
    identity: &Identity,
    id: u64,
    body: UpdateBody,
) -> Result<(Value, Vec<String>)> {
    let post = fetch_post(state, identity, id).await?;
    if !state.policy.can_perform(
        identity,
        Action::Update {
            author_id: post.author_id,
        },
    ) {
        return Err(ApiError::forbidden("You cannot edit this post"));
    }

    let status = match body.status.as_deref() {
        Some(s) => Some(
            PostStatus::parse(s)
                .ok_or_else(|| ApiError::bad_request(format!("Unknown status: {s}")))?,
        ),
        None => None,
    };

    let defs = match state.schema.resolve(&post.post_type).await {
        Ok(defs) => defs,
        Err(ApiError::SchemaUnavailable) => Vec::new(),
        Err(e) => return Err(e),
    };
    let supplied = drop_hidden(&state, &post.post_type, body.fields).await?;
    if !supplied.is_empty() {
        let errors = state.validator.validate_supplied(&defs, &supplied).await;
        if !errors.is_empty() {
            return Err(ApiError::ValidationFailed(errors));
        }
    }
    let fields = state.validator.sanitize(&defs, &supplied);

    let mut changed: Vec<String> = Vec::new();
    for name in ["title", "content", "excerpt", "status", "thumbnail_id"] {
        let touched = match name {
            "title" => body.title.is_some(),
            "content" => body.content.is_some(),
            "excerpt" => body.excerpt.is_some(),
            "status" => status.is_some(),
            _ => body.thumbnail_id.is_some(),
        };
        if touched {
            changed.push(name.to_string());
        }
    }
    changed.extend(fields.keys().cloned());

    let patch = PostPatch {
        title: body.title,
        content: body.content,
        excerpt: body.excerpt,
        status,
        thumbnail_id: body.thumbnail_id,
        fields,
    };
    let updated = state
        .store
        .update_post(id, patch)
        .await
        .map_err(|e| ApiError::UpdateFailed(e.to_string()))?;

    state.invalidate_post_caches(&updated.post_type, id);
    let full = state.engine.full_post(&updated).await?;
    Ok((full, changed))
}

/// Shared delete pipeline; `hard` skips the tombstone
pub(crate) async fn apply_delete(
    state: &AppState,
    identity: &Identity,
    id: u64,
    hard: bool,
) -> Result<Value> {
    let post = fetch_post(state, identity, id).await?;
    if !state.policy.can_perform(
        identity,
        Action::Delete {
            author_id: post.author_id,
        },
    ) {
        return Err(ApiError::forbidden("You cannot delete this post"));
    }
    state
        .store
        .delete_post(id, hard)
        .await
        .map_err(|e| ApiError::DeleteFailed(e.to_string()))?;
    state.invalidate_post_caches(&post.post_type, id);
    Ok(json!({
        "deleted": true,
        "id": id,
        "force": hard,
        "title": post.title,
        "type": post.post_type,
    }))
}

// === Handlers ===

pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    AuthIdentity(identity): AuthIdentity,
    Path(post_type): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse> {
    require_visible_type(&state, &identity, &post_type).await?;
    let key = list_cache_key(&post_type, &params);
    if let Some(hit) = state.cache.get(&key) {
        return Ok(Json(hit));
    }
    let response = state.engine.list(&post_type, &params).await?;
    let value = serde_json::to_value(&response)?;
    state.cache.set(&key, value.clone(), None);
    Ok(Json(value))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    pub status: Option<String>,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

pub async fn create_post(
    State(state): State<Arc<AppState>>,
    AuthIdentity(identity): AuthIdentity,
    meta: ClientMeta,
    Path(post_type): Path<String>,
    Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse> {
    require_visible_type(&state, &identity, &post_type).await?;
    if !state.policy.can_perform(&identity, Action::Create) {
        return Err(ApiError::forbidden("You cannot create posts"));
    }
    if body.title.trim().is_empty() {
        return Err(ApiError::bad_request("Title is required"));
    }
    let status = match body.status.as_deref() {
        Some(s) => Some(
            PostStatus::parse(s)
                .ok_or_else(|| ApiError::bad_request(format!("Unknown status: {s}")))?,
        ),
        None => None,
    };

    let defs = match state.schema.resolve(&post_type).await {
        Ok(defs) => defs,
        Err(ApiError::SchemaUnavailable) => Vec::new(),
        Err(e) => return Err(e),
    };
    let supplied = drop_hidden(&state, &post_type, body.fields).await?;
    let errors = state.validator.validate(&defs, &supplied).await;
    if !errors.is_empty() {
        return Err(ApiError::ValidationFailed(errors));
    }
    let fields = state.validator.sanitize(&defs, &supplied);

    let created = state
        .store
        .create_post(NewPost {
            post_type: post_type.clone(),
            title: body.title,
            content: body.content,
            excerpt: body.excerpt,
            status,
            author_id: identity.user_id,
            fields,
        })
        .await
        .map_err(|e| ApiError::CreateFailed(e.to_string()))?;

    state.audit.log(AuditEvent {
        user_id: identity.user_id,
        user_name: identity.name.clone(),
        action: AuditAction::Create,
        object_type: post_type.clone(),
        object_id: Some(created.id),
        object_title: Some(created.title.clone()),
        changes: json!(created.fields.keys().collect::<Vec<_>>()),
        ip: meta.ip,
        user_agent: meta.user_agent,
    });
    state.invalidate_post_caches(&post_type, created.id);

    tracing::info!(post_id = created.id, post_type, "post created");
    let full = state.engine.full_post(&created).await?;
    Ok((StatusCode::CREATED, Json(full)))
}

pub async fn get_post(
    State(state): State<Arc<AppState>>,
    AuthIdentity(identity): AuthIdentity,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse> {
    // visibility is checked before the cache read, so a shared cached
    // payload never leaks across roles
    let post = fetch_post(&state, &identity, id).await?;
    let key = format!("post:{id}");
    if let Some(hit) = state.cache.get(&key) {
        return Ok(Json(hit));
    }
    let full = state.engine.full_post(&post).await?;
    state.cache.set(&key, full.clone(), None);
    Ok(Json(full))
}

pub async fn update_post(
    State(state): State<Arc<AppState>>,
    AuthIdentity(identity): AuthIdentity,
    meta: ClientMeta,
    Path(id): Path<u64>,
    Json(body): Json<UpdateBody>,
) -> Result<impl IntoResponse> {
    let (full, changed) = apply_update(&state, &identity, id, body).await?;
    state.audit.log(AuditEvent {
        user_id: identity.user_id,
        user_name: identity.name.clone(),
        action: AuditAction::Update,
        object_type: full["type"].as_str().unwrap_or_default().to_string(),
        object_id: Some(id),
        object_title: full["title"].as_str().map(str::to_string),
        changes: json!(changed),
        ip: meta.ip,
        user_agent: meta.user_agent,
    });
    tracing::info!(post_id = id, "post updated");
    Ok(Json(full))
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub force: bool,
}

pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    AuthIdentity(identity): AuthIdentity,
    meta: ClientMeta,
    Path(id): Path<u64>,
    Query(params): Query<DeleteParams>,
) -> Result<impl IntoResponse> {
    let result = apply_delete(&state, &identity, id, params.force).await?;
    state.audit.log(AuditEvent {
        user_id: identity.user_id,
        user_name: identity.name.clone(),
        action: AuditAction::Delete,
        object_type: result["type"].as_str().unwrap_or_default().to_string(),
        object_id: Some(id),
        object_title: result["title"].as_str().map(str::to_string),
        changes: json!({ "force": params.force }),
        ip: meta.ip,
        user_agent: meta.user_agent,
    });
    tracing::info!(post_id = id, force = params.force, "post deleted");
    Ok(Json(result))
}
