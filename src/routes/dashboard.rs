//! Dashboard aggregate: per-type counts and recent activity.

use crate::error::Result;
use crate::extract::AuthIdentity;
use crate::state::AppState;
use crate::store::{PostListSpec, PostOrderBy};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

const RECENT_LIMIT: usize = 10;

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    AuthIdentity(identity): AuthIdentity,
) -> Result<impl IntoResponse> {
    // cached per role set, since visible types differ by role
    let key = format!(
        "dashboard:{}",
        identity
            .roles
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(",")
    );
    if let Some(hit) = state.cache.get(&key) {
        return Ok(Json(hit));
    }

    let mut types = Vec::new();
    let mut total = 0u64;
    let mut recent: Vec<Value> = Vec::new();

    for record in state.store.list_types().await {
        if super::lookup::type_hidden(&state.config, &record.slug)
            || !state.policy.can_access_content_type(&identity, &record.slug)
        {
            continue;
        }
        let count = state.store.count_posts(&record.slug).await;
        total += count;
        types.push(json!({
            "slug": record.slug,
            "name": record.name,
            "count": count,
        }));

        let page = state
            .store
            .list_posts(&PostListSpec {
                post_type: record.slug.clone(),
                order_by: PostOrderBy::Modified,
                descending: true,
                limit: RECENT_LIMIT,
                ..Default::default()
            })
            .await
            .map_err(|e| crate::error::ApiError::internal(e.to_string()))?;
        for post in page.posts {
            recent.push(json!({
                "id": post.id,
                "title": post.title,
                "type": post.post_type,
                "status": post.status.as_str(),
                "modified": post.modified_or_date().format("%Y-%m-%d %H:%M:%S").to_string(),
                "sort_key": post.modified_or_date().timestamp(),
            }));
        }
    }

    recent.sort_by_key(|item| -item["sort_key"].as_i64().unwrap_or(0));
    recent.truncate(RECENT_LIMIT);
    for item in &mut recent {
        if let Some(obj) = item.as_object_mut() {
            obj.remove("sort_key");
        }
    }

    let body = json!({
        "types": types,
        "total": total,
        "recent": recent,
    });
    state.cache.set(&key, body.clone(), None);
    Ok(Json(body))
}
