//! Content query engine: listing, pagination, and post formatting.
//!
//! Listings run in one of two mutually exclusive modes. Page mode takes
//! an explicit page number; cursor mode takes an opaque token encoding
//! the last-seen row and pages with an exclusive bound. List summaries
//! carry a bounded scalar-only field subset; single-post reads go through
//! the codec at full fidelity in resolved schema order.

use crate::error::{ApiError, Result};
use crate::fields::{FieldCodec, FieldDefinition, SchemaResolver};
use crate::store::{ContentStore, CursorBound, PostListSpec, PostOrderBy, PostRecord, PostStatus};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub const DEFAULT_PER_PAGE: usize = 20;
pub const MAX_PER_PAGE: usize = 100;
/// Scalar field values carried per list item, unless fields are named
pub const DEFAULT_LIST_FIELDS: usize = 5;
/// Upper bound on explicitly selected fields
pub const MAX_SELECTED_FIELDS: usize = 100;

const WIRE_DATE: &str = "%Y-%m-%d %H:%M:%S";

/// Query-string parameters accepted by list endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub cursor: Option<String>,
    pub orderby: Option<String>,
    pub order: Option<String>,
    /// Comma-separated field selection
    pub fields: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct Cursor {
    id: u64,
    date: DateTime<Utc>,
}

/// Opaque cursor for a row: url-safe base64 of `{id, date}`, so tokens
/// survive query strings unescaped
pub fn encode_cursor(id: u64, date: DateTime<Utc>) -> String {
    let payload = serde_json::to_vec(&Cursor { id, date }).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(payload)
}

/// Decode a cursor; malformed input reads as "no cursor" (first page).
/// Standard-alphabet tokens from older clients still decode.
pub fn decode_cursor(token: &str) -> Option<CursorBound> {
    let token = token.trim();
    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .or_else(|_| STANDARD.decode(token))
        .ok()?;
    let cursor: Cursor = serde_json::from_slice(&bytes).ok()?;
    Some(CursorBound {
        id: cursor.id,
        date: cursor.date,
    })
}

/// List response body; `page`/`pages` appear in page mode,
/// `next_cursor` in cursor mode on a full page.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub posts: Vec<Value>,
    pub total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

fn parse_order_by(s: Option<&str>) -> PostOrderBy {
    match s {
        Some("modified") => PostOrderBy::Modified,
        Some("title") => PostOrderBy::Title,
        Some("id") => PostOrderBy::Id,
        _ => PostOrderBy::Date,
    }
}

/// Values worth carrying in a list summary
fn summary_worthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

pub struct QueryEngine {
    store: Arc<dyn ContentStore>,
    codec: FieldCodec,
    resolver: Arc<SchemaResolver>,
}

impl QueryEngine {
    pub fn new(
        store: Arc<dyn ContentStore>,
        codec: FieldCodec,
        resolver: Arc<SchemaResolver>,
    ) -> Self {
        Self {
            store,
            codec,
            resolver,
        }
    }

    /// Resolved schema, or no fields at all when no provider is configured.
    /// Content endpoints keep working without a schema authority.
    async fn defs_or_empty(&self, content_type: &str) -> Result<Vec<FieldDefinition>> {
        match self.resolver.resolve(content_type).await {
            Ok(defs) => Ok(defs),
            Err(ApiError::SchemaUnavailable) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// List posts of one type under the given parameters
    pub async fn list(&self, post_type: &str, params: &ListParams) -> Result<ListResponse> {
        let per_page = params
            .per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);
        let descending = !matches!(params.order.as_deref(), Some("asc") | Some("ASC"));
        let order_by = parse_order_by(params.orderby.as_deref());

        let cursor_mode = params.cursor.is_some();
        let after = params.cursor.as_deref().and_then(decode_cursor);
        let page = if cursor_mode {
            1
        } else {
            params.page.unwrap_or(1).max(1)
        };

        let spec = PostListSpec {
            post_type: post_type.to_string(),
            status: params.status.as_deref().and_then(PostStatus::parse),
            search: params.search.clone(),
            order_by,
            descending,
            after,
            offset: if cursor_mode { 0 } else { (page - 1) * per_page },
            limit: per_page,
        };

        let result = self
            .store
            .list_posts(&spec)
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?;

        let defs = self.defs_or_empty(post_type).await?;
        let selected = selected_fields(params.fields.as_deref());
        let mut posts = Vec::with_capacity(result.posts.len());
        for post in &result.posts {
            posts.push(self.list_item(post, &defs, selected.as_deref()).await);
        }

        // a full page always carries a follow-up cursor, so page-mode
        // callers can switch to cursor paging; a short page ends the stream
        let next_cursor = if result.posts.len() == per_page {
            result
                .posts
                .last()
                .map(|last| encode_cursor(last.id, last.date))
        } else {
            None
        };

        Ok(ListResponse {
            posts,
            total: result.total,
            pages: (!cursor_mode).then(|| result.total.div_ceil(per_page as u64)),
            page: (!cursor_mode).then_some(page),
            next_cursor,
        })
    }

    /// Reference-lookup search; unknown types yield an empty set
    pub async fn search(&self, post_type: &str, term: &str, limit: usize) -> Result<ListResponse> {
        if !self.store.type_exists(post_type).await {
            return Ok(ListResponse {
                posts: Vec::new(),
                total: 0,
                pages: None,
                page: None,
                next_cursor: None,
            });
        }
        let spec = PostListSpec {
            post_type: post_type.to_string(),
            search: Some(term.to_string()),
            descending: true,
            limit: limit.clamp(1, MAX_PER_PAGE),
            ..Default::default()
        };
        let result = self
            .store
            .list_posts(&spec)
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?;
        let posts = result
            .posts
            .iter()
            .map(|p| {
                json!({
                    "id": p.id,
                    "title": p.title,
                    "slug": p.slug,
                    "status": p.status.as_str(),
                    "type": p.post_type,
                    "date": p.date.format(WIRE_DATE).to_string(),
                })
            })
            .collect();
        Ok(ListResponse {
            posts,
            total: result.total,
            pages: None,
            page: None,
            next_cursor: None,
        })
    }

    /// Bounded scalar-only summary for list views
    async fn list_item(
        &self,
        post: &PostRecord,
        defs: &[FieldDefinition],
        selected: Option<&[String]>,
    ) -> Value {
        let cap = if selected.is_some() {
            MAX_SELECTED_FIELDS
        } else {
            DEFAULT_LIST_FIELDS
        };

        let mut fields = Map::new();
        let ordered: Vec<&FieldDefinition> = match selected {
            Some(names) => names
                .iter()
                .filter_map(|n| defs.iter().find(|d| d.name == *n))
                .collect(),
            None => defs.iter().collect(),
        };
        for def in ordered {
            if fields.len() >= cap {
                break;
            }
            if !def.field_type.is_scalar() {
                continue;
            }
            let raw = post.fields.get(&def.name).unwrap_or(&Value::Null);
            let encoded = self.codec.encode(def, raw).await;
            if summary_worthy(&encoded) {
                fields.insert(def.name.clone(), encoded);
            }
        }

        json!({
            "id": post.id,
            "title": post.title,
            "slug": post.slug,
            "status": post.status.as_str(),
            "type": post.post_type,
            "date": post.date.format(WIRE_DATE).to_string(),
            "modified": post.modified_or_date().format(WIRE_DATE).to_string(),
            "fields": fields,
        })
    }

    /// Full-fidelity single post: every visible field encoded in resolved
    /// schema order, extras appended after, plus `field_order`.
    pub async fn full_post(&self, post: &PostRecord) -> Result<Value> {
        let defs = self.defs_or_empty(&post.post_type).await?;
        let hidden = match self.resolver.hidden_names(&post.post_type).await {
            Ok(names) => names,
            Err(ApiError::SchemaUnavailable) => Vec::new(),
            Err(e) => return Err(e),
        };

        let mut fields = Map::new();
        let mut field_order = Vec::new();
        for def in &defs {
            let raw = post.fields.get(&def.name).unwrap_or(&Value::Null);
            let value = self.codec.encode(def, raw).await;
            let mut entry = Map::new();
            entry.insert("name".into(), json!(def.name));
            entry.insert(
                "label".into(),
                json!(if def.label.is_empty() {
                    &def.name
                } else {
                    &def.label
                }),
            );
            entry.insert("type".into(), json!(def.field_type.as_tag()));
            entry.insert("value".into(), value);
            entry.insert("required".into(), json!(def.required));
            entry.insert("instructions".into(), json!(def.clean_instructions()));
            if let Some(choices) = &def.choices {
                if !choices.is_empty() {
                    entry.insert("choices".into(), Value::Object(choices.clone()));
                }
            }
            fields.insert(def.name.clone(), Value::Object(entry));
            field_order.push(def.name.clone());
        }
        // values stored on the post but absent from the resolved schema
        // are appended raw, never dropped; hidden definitions are the one
        // exception and stay out of the payload entirely
        for (name, raw) in &post.fields {
            if fields.contains_key(name) || hidden.contains(name) {
                continue;
            }
            fields.insert(
                name.clone(),
                json!({
                    "name": name,
                    "label": name,
                    "type": "unknown",
                    "value": raw,
                    "required": false,
                    "instructions": null,
                }),
            );
            field_order.push(name.clone());
        }

        let author_name = self
            .store
            .get_user(post.author_id)
            .await
            .map(|u| u.name)
            .unwrap_or_default();

        let thumbnail = match post.thumbnail_id {
            Some(id) => match self.store.get_media(id).await {
                Some(media) => {
                    let mut sizes = Map::new();
                    sizes.insert("full".into(), json!(media.url));
                    for (name, url) in &media.sizes {
                        sizes.insert(name.clone(), json!(url));
                    }
                    json!({ "id": media.id, "url": media.url, "sizes": sizes })
                }
                None => Value::Null,
            },
            None => Value::Null,
        };

        Ok(json!({
            "id": post.id,
            "title": post.title,
            "slug": post.slug,
            "status": post.status.as_str(),
            "type": post.post_type,
            "content": post.content,
            "excerpt": post.excerpt,
            "date": post.date.format(WIRE_DATE).to_string(),
            "modified": post.modified_or_date().format(WIRE_DATE).to_string(),
            "author": post.author_id,
            "author_name": author_name,
            "thumbnail": thumbnail,
            "fields": fields,
            "field_order": field_order,
        }))
    }
}

fn selected_fields(param: Option<&str>) -> Option<Vec<String>> {
    let param = param?;
    let names: Vec<String> = param
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(MAX_SELECTED_FIELDS)
        .map(str::to_string)
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldType;
    use crate::store::{MemoryStore, StaticSchemaProvider, TypeRecord};
    use chrono::TimeZone;

    fn engine_with_posts(count: u64) -> QueryEngine {
        let store = Arc::new(MemoryStore::new());
        store.insert_type(TypeRecord {
            slug: "article".to_string(),
            name: "Articles".to_string(),
            singular: "Article".to_string(),
            rest_base: "articles".to_string(),
            hierarchical: false,
        });
        for id in 1..=count {
            store.insert_post(PostRecord {
                id,
                post_type: "article".to_string(),
                title: format!("Post {id}"),
                slug: format!("post-{id}"),
                status: PostStatus::Published,
                content: String::new(),
                excerpt: String::new(),
                date: Utc
                    .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
                    .single()
                    .unwrap()
                    + chrono::Duration::hours(id as i64),
                modified: None,
                author_id: 1,
                thumbnail_id: None,
                fields: Default::default(),
            });
        }
        let resolver = Arc::new(SchemaResolver::new(Arc::new(StaticSchemaProvider::new())));
        QueryEngine::new(store.clone(), FieldCodec::new(store), resolver)
    }

    #[test]
    fn test_malformed_cursor_reads_as_first_page() {
        assert!(decode_cursor("!!not-base64!!").is_none());
        assert!(decode_cursor(&STANDARD.encode(b"{\"nope\":1}")).is_none());
    }

    #[test]
    fn test_cursor_round_trip() {
        let date = Utc.with_ymd_and_hms(2026, 5, 1, 9, 30, 0).single().unwrap();
        let bound = decode_cursor(&encode_cursor(42, date)).unwrap();
        assert_eq!(bound.id, 42);
        assert_eq!(bound.date, date);
    }

    #[tokio::test]
    async fn test_page_mode_reports_pages() {
        let engine = engine_with_posts(5);
        let response = engine
            .list(
                "article",
                &ListParams {
                    per_page: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(response.total, 5);
        assert_eq!(response.pages, Some(3));
        assert_eq!(response.page, Some(1));
        // full page: a cursor is offered even in page mode
        assert!(response.next_cursor.is_some());
    }

    #[tokio::test]
    async fn test_cursor_walk_covers_everything_once() {
        let engine = engine_with_posts(5);
        let mut seen = Vec::new();
        let mut cursor: Option<String> = Some(String::new());
        while let Some(token) = cursor {
            let response = engine
                .list(
                    "article",
                    &ListParams {
                        per_page: Some(2),
                        cursor: Some(token),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            assert!(response.page.is_none());
            assert!(response.pages.is_none());
            for post in &response.posts {
                seen.push(post["id"].as_u64().unwrap());
            }
            cursor = response.next_cursor;
        }
        // newest first, no gaps, no duplicates
        assert_eq!(seen, vec![5, 4, 3, 2, 1]);
    }

    #[tokio::test]
    async fn test_short_page_ends_stream() {
        let engine = engine_with_posts(2);
        let response = engine
            .list(
                "article",
                &ListParams {
                    per_page: Some(5),
                    cursor: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(response.posts.len(), 2);
        assert!(response.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_search_unknown_type_is_empty() {
        let engine = engine_with_posts(3);
        let response = engine.search("ghost", "post", 10).await.unwrap();
        assert!(response.posts.is_empty());
        assert_eq!(response.total, 0);
    }

    #[tokio::test]
    async fn test_full_post_appends_extra_fields() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(StaticSchemaProvider::new());
        provider.set_definitions(
            "article",
            vec![FieldDefinition {
                name: "subtitle".to_string(),
                field_type: FieldType::Text,
                ..Default::default()
            }],
        );
        let resolver = Arc::new(SchemaResolver::new(provider));
        let engine = QueryEngine::new(store.clone(), FieldCodec::new(store), resolver);

        let mut fields = Map::new();
        fields.insert("subtitle".to_string(), json!("A subtitle"));
        fields.insert("legacy_extra".to_string(), json!("kept"));
        let post = PostRecord {
            id: 1,
            post_type: "article".to_string(),
            title: "T".to_string(),
            slug: "t".to_string(),
            status: PostStatus::Published,
            content: String::new(),
            excerpt: String::new(),
            date: Utc::now(),
            modified: None,
            author_id: 1,
            thumbnail_id: None,
            fields,
        };
        let full = engine.full_post(&post).await.unwrap();
        assert_eq!(
            full["field_order"],
            json!(["subtitle", "legacy_extra"])
        );
        assert_eq!(full["fields"]["legacy_extra"]["value"], "kept");
        assert_eq!(full["fields"]["subtitle"]["value"], "A subtitle");
    }
}
