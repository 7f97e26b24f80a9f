//! Storage seams: the content repository and the schema authority.
//!
//! Both are external collaborators. The gateway only talks to them through
//! these traits; the in-memory implementations in [`memory`] back tests and
//! single-process deployments.

pub mod memory;

pub use memory::{MemoryStore, StaticSchemaProvider};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Publication status of a content item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Published,
    Draft,
    Pending,
    Private,
    Scheduled,
    /// Soft-delete tombstone
    Trashed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Published => "published",
            PostStatus::Draft => "draft",
            PostStatus::Pending => "pending",
            PostStatus::Private => "private",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Trashed => "trashed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "published" => Some(PostStatus::Published),
            "draft" => Some(PostStatus::Draft),
            "pending" => Some(PostStatus::Pending),
            "private" => Some(PostStatus::Private),
            "scheduled" => Some(PostStatus::Scheduled),
            "trashed" => Some(PostStatus::Trashed),
            _ => None,
        }
    }
}

/// A stored content item with its raw (un-encoded) field values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: u64,
    pub post_type: String,
    pub title: String,
    pub slug: String,
    pub status: PostStatus,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
    pub author_id: u64,
    /// Cover asset, when set
    #[serde(default)]
    pub thumbnail_id: Option<u64>,
    /// Raw field values keyed by field name, order preserved
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl PostRecord {
    /// Modified timestamp, falling back to the creation date
    pub fn modified_or_date(&self) -> DateTime<Utc> {
        self.modified.unwrap_or(self.date)
    }
}

/// A registered content type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeRecord {
    pub slug: String,
    pub name: String,
    pub singular: String,
    pub rest_base: String,
    pub hierarchical: bool,
}

/// A taxonomy term
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermRecord {
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub taxonomy: String,
    #[serde(default)]
    pub count: u64,
}

/// A user known to the content repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// A stored media asset with its derived size variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: u64,
    pub url: String,
    pub filename: String,
    pub filesize: u64,
    pub mime_type: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub title: String,
    /// Size-variant name -> URL (thumbnail, medium, ...)
    #[serde(default)]
    pub sizes: BTreeMap<String, String>,
    pub uploaded: DateTime<Utc>,
}

/// Exclusive lower/upper bound for cursor pagination
#[derive(Debug, Clone, Copy)]
pub struct CursorBound {
    pub id: u64,
    pub date: DateTime<Utc>,
}

/// Sort key for post listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PostOrderBy {
    #[default]
    Date,
    Modified,
    Title,
    Id,
}

/// Listing request pushed down to the content repository
#[derive(Debug, Clone, Default)]
pub struct PostListSpec {
    pub post_type: String,
    /// None = any non-trashed status
    pub status: Option<PostStatus>,
    /// Substring match on title/content
    pub search: Option<String>,
    pub order_by: PostOrderBy,
    pub descending: bool,
    /// Exclusive cursor bound; applied in the sort direction
    pub after: Option<CursorBound>,
    /// Page-mode offset; ignored when `after` is set
    pub offset: usize,
    pub limit: usize,
}

/// Result of a listing request
#[derive(Debug, Clone)]
pub struct PostPage {
    pub posts: Vec<PostRecord>,
    /// Total matching items ignoring offset/limit/cursor
    pub total: u64,
}

/// Fields accepted by a create call
#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    pub post_type: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub status: Option<PostStatus>,
    pub author_id: u64,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// Partial update; None fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub status: Option<PostStatus>,
    #[serde(default)]
    pub thumbnail_id: Option<u64>,
    /// Field values to merge into the stored set
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// Payload for a media upload, already transport-decoded
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub alt: Option<String>,
    pub title: Option<String>,
}

/// Storage-level failure, sanitized for the wire by callers
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(msg: impl Into<String>) -> Self {
        StoreError(msg.into())
    }
}

/// The content repository: posts, media, terms, users.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Liveness probe for the health endpoint
    async fn available(&self) -> bool;

    // === Content types ===
    async fn list_types(&self) -> Vec<TypeRecord>;
    async fn type_exists(&self, slug: &str) -> bool;
    async fn count_posts(&self, post_type: &str) -> u64;

    // === Posts ===
    async fn list_posts(&self, spec: &PostListSpec) -> Result<PostPage, StoreError>;
    async fn get_post(&self, id: u64) -> Option<PostRecord>;
    async fn create_post(&self, new: NewPost) -> Result<PostRecord, StoreError>;
    async fn update_post(&self, id: u64, patch: PostPatch) -> Result<PostRecord, StoreError>;
    /// Hard delete removes the row; soft delete tombstones it
    async fn delete_post(&self, id: u64, hard: bool) -> Result<(), StoreError>;

    // === Media ===
    /// `media_type` filters by the major mime type ("image", "video", ...);
    /// `after` is an exclusive bound on the newest-first upload order
    async fn list_media(
        &self,
        media_type: Option<&str>,
        after: Option<CursorBound>,
        offset: usize,
        limit: usize,
    ) -> (Vec<MediaRecord>, u64);
    async fn get_media(&self, id: u64) -> Option<MediaRecord>;
    async fn store_media(&self, upload: MediaUpload) -> Result<MediaRecord, StoreError>;
    async fn delete_media(&self, id: u64) -> Result<(), StoreError>;
    /// Whether the upload directory is writable (health probe)
    async fn uploads_writable(&self) -> bool;

    // === Terms ===
    /// None when the taxonomy is not registered
    async fn list_terms(&self, taxonomy: &str) -> Option<Vec<TermRecord>>;
    async fn get_term(&self, id: u64) -> Option<TermRecord>;

    // === Users ===
    async fn list_users(&self) -> Vec<UserRecord>;
    async fn get_user(&self, id: u64) -> Option<UserRecord>;
}

/// The external schema authority for custom field definitions.
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    /// Whether a schema authority is configured and reachable
    async fn available(&self) -> bool;

    /// Declared field definitions for a content type, in upstream order.
    /// Hidden-field filtering happens in the resolver, not here.
    async fn definitions(&self, content_type: &str) -> Result<Vec<crate::fields::FieldDefinition>, StoreError>;

    /// Monotonic revision counter, bumped on any definition change.
    /// The resolver drops its cached schema when this moves.
    async fn revision(&self) -> u64;
}
