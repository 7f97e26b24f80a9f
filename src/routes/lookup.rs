//! Type, term, and user lookups backing reference-field editing.

use crate::config::GatewayConfig;
use crate::error::Result;
use crate::extract::AuthIdentity;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Internal-only content type suffixes, never exposed
const HIDDEN_SUFFIXES: &[&str] = &["_template", "-layout", "_library"];

/// Whether a content type is held back from the API, by explicit config
/// or by internal naming convention.
pub(crate) fn type_hidden(config: &GatewayConfig, slug: &str) -> bool {
    config.hidden_types.iter().any(|h| h == slug)
        || HIDDEN_SUFFIXES.iter().any(|suffix| slug.ends_with(suffix))
}

async fn type_listing(state: &AppState, hidden: bool) -> Vec<Value> {
    let mut records = state.store.list_types().await;
    records.retain(|r| type_hidden(&state.config, &r.slug) == hidden);
    records.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    let mut out = Vec::with_capacity(records.len());
    for record in records {
        let count = state.store.count_posts(&record.slug).await;
        out.push(json!({
            "slug": record.slug,
            "name": record.name,
            "singular": record.singular,
            "rest_base": record.rest_base,
            "count": count,
            "hierarchical": record.hierarchical,
        }));
    }
    out
}

pub async fn types(
    State(state): State<Arc<AppState>>,
    AuthIdentity(identity): AuthIdentity,
) -> Result<impl IntoResponse> {
    let body = state
        .cache
        .remember("types", None, || async {
            json!({ "types": type_listing(&state, false).await })
        })
        .await;
    let mut types = body["types"].as_array().cloned().unwrap_or_default();
    types.retain(|t| {
        t["slug"]
            .as_str()
            .map(|slug| state.policy.can_access_content_type(&identity, slug))
            .unwrap_or(false)
    });
    Ok(Json(json!({ "types": types })))
}

pub async fn hidden_types(
    State(state): State<Arc<AppState>>,
    AuthIdentity(_identity): AuthIdentity,
) -> Result<impl IntoResponse> {
    let body = state
        .cache
        .remember("hidden_types", None, || async {
            json!({ "types": type_listing(&state, true).await })
        })
        .await;
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    AuthIdentity(identity): AuthIdentity,
    Path(post_type): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse> {
    // unknown types come back empty rather than erroring, so client
    // pickers degrade gracefully
    if !state.policy.can_access_content_type(&identity, &post_type) {
        return Ok(Json(json!({ "posts": [], "total": 0 })));
    }
    let response = state
        .engine
        .search(&post_type, &params.q, params.limit.unwrap_or(20))
        .await?;
    Ok(Json(serde_json::to_value(&response)?))
}

pub async fn terms(
    State(state): State<Arc<AppState>>,
    AuthIdentity(_identity): AuthIdentity,
    Path(taxonomy): Path<String>,
) -> Result<impl IntoResponse> {
    // unknown taxonomy is an empty set, same contract as search
    let terms = state.store.list_terms(&taxonomy).await.unwrap_or_default();
    let body = json!({
        "terms": terms.iter().map(|t| json!({
            "id": t.id,
            "name": t.name,
            "slug": t.slug,
            "taxonomy": t.taxonomy,
            "count": t.count,
        })).collect::<Vec<_>>(),
        "total": terms.len(),
    });
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
pub struct UsersParams {
    pub search: Option<String>,
    pub role: Option<String>,
}

pub async fn users(
    State(state): State<Arc<AppState>>,
    AuthIdentity(_identity): AuthIdentity,
    Query(params): Query<UsersParams>,
) -> Result<impl IntoResponse> {
    let mut users = state.store.list_users().await;
    if let Some(search) = params.search.as_deref().map(str::to_lowercase) {
        users.retain(|u| {
            u.name.to_lowercase().contains(&search) || u.email.to_lowercase().contains(&search)
        });
    }
    if let Some(role) = &params.role {
        users.retain(|u| u.roles.iter().any(|r| r == role));
    }
    users.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(Json(json!({
        "users": users.iter().map(|u| json!({
            "id": u.id,
            "name": u.name,
            "email": u.email,
        })).collect::<Vec<_>>(),
    })))
}
