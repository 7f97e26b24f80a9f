//! In-memory content store and static schema provider.
//!
//! Backs tests and single-process deployments. Production deployments
//! implement [`ContentStore`] / [`SchemaProvider`] over a real repository.

use super::{
    ContentStore, CursorBound, MediaRecord, MediaUpload, NewPost, PostListSpec, PostOrderBy,
    PostPage, PostPatch, PostRecord, PostStatus, SchemaProvider, StoreError, TermRecord,
    TypeRecord, UserRecord,
};
use crate::fields::FieldDefinition;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
struct StoreInner {
    types: BTreeMap<String, TypeRecord>,
    posts: BTreeMap<u64, PostRecord>,
    media: BTreeMap<u64, MediaRecord>,
    taxonomies: BTreeSet<String>,
    terms: BTreeMap<u64, TermRecord>,
    users: BTreeMap<u64, UserRecord>,
    next_id: u64,
}

/// In-memory [`ContentStore`]
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(inner: &mut StoreInner) -> u64 {
        inner.next_id += 1;
        inner.next_id
    }

    // === Seeding ===

    pub fn insert_type(&self, record: TypeRecord) {
        self.inner.write().types.insert(record.slug.clone(), record);
    }

    pub fn insert_post(&self, record: PostRecord) {
        let mut inner = self.inner.write();
        inner.next_id = inner.next_id.max(record.id);
        inner.posts.insert(record.id, record);
    }

    pub fn insert_media(&self, record: MediaRecord) {
        let mut inner = self.inner.write();
        inner.next_id = inner.next_id.max(record.id);
        inner.media.insert(record.id, record);
    }

    pub fn register_taxonomy(&self, slug: impl Into<String>) {
        self.inner.write().taxonomies.insert(slug.into());
    }

    pub fn insert_term(&self, record: TermRecord) {
        let mut inner = self.inner.write();
        inner.taxonomies.insert(record.taxonomy.clone());
        inner.next_id = inner.next_id.max(record.id);
        inner.terms.insert(record.id, record);
    }

    pub fn insert_user(&self, record: UserRecord) {
        self.inner.write().users.insert(record.id, record);
    }
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_matches('-').to_string()
}

fn matches_search(post: &PostRecord, term: &str) -> bool {
    let term = term.to_lowercase();
    post.title.to_lowercase().contains(&term) || post.content.to_lowercase().contains(&term)
}

fn sort_key(post: &PostRecord, order_by: PostOrderBy) -> SortKey {
    match order_by {
        PostOrderBy::Date => SortKey::Time(post.date),
        PostOrderBy::Modified => SortKey::Time(post.modified_or_date()),
        PostOrderBy::Title => SortKey::Text(post.title.to_lowercase()),
        PostOrderBy::Id => SortKey::Num(post.id),
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Time(chrono::DateTime<chrono::Utc>),
    Text(String),
    Num(u64),
}

fn passes_cursor(post: &PostRecord, bound: &CursorBound, descending: bool) -> bool {
    if post.id == bound.id {
        return false;
    }
    if descending {
        post.date < bound.date
    } else {
        post.date > bound.date
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn available(&self) -> bool {
        true
    }

    async fn list_types(&self) -> Vec<TypeRecord> {
        self.inner.read().types.values().cloned().collect()
    }

    async fn type_exists(&self, slug: &str) -> bool {
        self.inner.read().types.contains_key(slug)
    }

    async fn count_posts(&self, post_type: &str) -> u64 {
        self.inner
            .read()
            .posts
            .values()
            .filter(|p| p.post_type == post_type && p.status != PostStatus::Trashed)
            .count() as u64
    }

    async fn list_posts(&self, spec: &PostListSpec) -> Result<PostPage, StoreError> {
        let inner = self.inner.read();
        let mut matching: Vec<PostRecord> = inner
            .posts
            .values()
            .filter(|p| p.post_type == spec.post_type)
            .filter(|p| match spec.status {
                Some(status) => p.status == status,
                None => p.status != PostStatus::Trashed,
            })
            .filter(|p| match &spec.search {
                Some(term) => matches_search(p, term),
                None => true,
            })
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            let ord = sort_key(a, spec.order_by)
                .cmp(&sort_key(b, spec.order_by))
                .then(a.id.cmp(&b.id));
            if spec.descending {
                ord.reverse()
            } else {
                ord
            }
        });

        let total = matching.len() as u64;

        let posts: Vec<PostRecord> = match spec.after {
            Some(bound) => matching
                .into_iter()
                .filter(|p| passes_cursor(p, &bound, spec.descending))
                .take(spec.limit)
                .collect(),
            None => matching
                .into_iter()
                .skip(spec.offset)
                .take(spec.limit)
                .collect(),
        };

        Ok(PostPage { posts, total })
    }

    async fn get_post(&self, id: u64) -> Option<PostRecord> {
        self.inner.read().posts.get(&id).cloned()
    }

    async fn create_post(&self, new: NewPost) -> Result<PostRecord, StoreError> {
        let mut inner = self.inner.write();
        if !inner.types.contains_key(&new.post_type) {
            return Err(StoreError::new(format!(
                "unknown content type: {}",
                new.post_type
            )));
        }
        let id = Self::next_id(&mut inner);
        let record = PostRecord {
            id,
            post_type: new.post_type,
            slug: slugify(&new.title),
            title: new.title,
            status: new.status.unwrap_or(PostStatus::Draft),
            content: new.content,
            excerpt: new.excerpt,
            date: Utc::now(),
            modified: None,
            author_id: new.author_id,
            thumbnail_id: None,
            fields: new.fields,
        };
        inner.posts.insert(id, record.clone());
        Ok(record)
    }

    async fn update_post(&self, id: u64, patch: PostPatch) -> Result<PostRecord, StoreError> {
        let mut inner = self.inner.write();
        let post = inner
            .posts
            .get_mut(&id)
            .ok_or_else(|| StoreError::new(format!("post {id} not found")))?;
        if let Some(title) = patch.title {
            post.title = title;
        }
        if let Some(content) = patch.content {
            post.content = content;
        }
        if let Some(excerpt) = patch.excerpt {
            post.excerpt = excerpt;
        }
        if let Some(status) = patch.status {
            post.status = status;
        }
        if let Some(thumbnail_id) = patch.thumbnail_id {
            post.thumbnail_id = Some(thumbnail_id);
        }
        for (name, value) in patch.fields {
            post.fields.insert(name, value);
        }
        post.modified = Some(Utc::now());
        Ok(post.clone())
    }

    async fn delete_post(&self, id: u64, hard: bool) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if hard {
            inner
                .posts
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| StoreError::new(format!("post {id} not found")))
        } else {
            let post = inner
                .posts
                .get_mut(&id)
                .ok_or_else(|| StoreError::new(format!("post {id} not found")))?;
            post.status = PostStatus::Trashed;
            post.modified = Some(Utc::now());
            Ok(())
        }
    }

    async fn list_media(
        &self,
        media_type: Option<&str>,
        after: Option<CursorBound>,
        offset: usize,
        limit: usize,
    ) -> (Vec<MediaRecord>, u64) {
        let inner = self.inner.read();
        let mut all: Vec<MediaRecord> = inner
            .media
            .values()
            .filter(|m| match media_type {
                Some(major) => {
                    m.mime_type.split('/').next().unwrap_or_default() == major
                }
                None => true,
            })
            .cloned()
            .collect();
        all.sort_by(|a, b| b.uploaded.cmp(&a.uploaded).then(b.id.cmp(&a.id)));
        let total = all.len() as u64;
        let page = all
            .into_iter()
            .filter(|m| match &after {
                // strictly past the bound in newest-first order; equal
                // timestamps fall back to the id tiebreak
                Some(bound) => {
                    m.id != bound.id
                        && (m.uploaded < bound.date
                            || (m.uploaded == bound.date && m.id < bound.id))
                }
                None => true,
            })
            .skip(offset)
            .take(limit)
            .collect();
        (page, total)
    }

    async fn get_media(&self, id: u64) -> Option<MediaRecord> {
        self.inner.read().media.get(&id).cloned()
    }

    async fn store_media(&self, upload: MediaUpload) -> Result<MediaRecord, StoreError> {
        let mut inner = self.inner.write();
        let id = Self::next_id(&mut inner);
        let url = format!("/media/{id}/{}", upload.filename);
        let mut sizes = BTreeMap::new();
        if upload.mime_type.starts_with("image/") {
            sizes.insert("thumbnail".to_string(), format!("{url}?size=thumbnail"));
            sizes.insert("medium".to_string(), format!("{url}?size=medium"));
        }
        let record = MediaRecord {
            id,
            url,
            filename: upload.filename,
            filesize: upload.bytes.len() as u64,
            mime_type: upload.mime_type,
            alt: upload.alt.unwrap_or_default(),
            title: upload.title.unwrap_or_default(),
            sizes,
            uploaded: Utc::now(),
        };
        inner.media.insert(id, record.clone());
        Ok(record)
    }

    async fn delete_media(&self, id: u64) -> Result<(), StoreError> {
        self.inner
            .write()
            .media
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::new(format!("media {id} not found")))
    }

    async fn uploads_writable(&self) -> bool {
        true
    }

    async fn list_terms(&self, taxonomy: &str) -> Option<Vec<TermRecord>> {
        let inner = self.inner.read();
        if !inner.taxonomies.contains(taxonomy) {
            return None;
        }
        let mut terms: Vec<TermRecord> = inner
            .terms
            .values()
            .filter(|t| t.taxonomy == taxonomy)
            .cloned()
            .collect();
        terms.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Some(terms)
    }

    async fn get_term(&self, id: u64) -> Option<TermRecord> {
        self.inner.read().terms.get(&id).cloned()
    }

    async fn list_users(&self) -> Vec<UserRecord> {
        self.inner.read().users.values().cloned().collect()
    }

    async fn get_user(&self, id: u64) -> Option<UserRecord> {
        self.inner.read().users.get(&id).cloned()
    }
}

/// Static [`SchemaProvider`] over a fixed definition map.
///
/// `set_definitions` bumps the revision so resolvers drop stale schema.
pub struct StaticSchemaProvider {
    definitions: RwLock<BTreeMap<String, Vec<FieldDefinition>>>,
    revision: AtomicU64,
    available: bool,
}

impl Default for StaticSchemaProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticSchemaProvider {
    pub fn new() -> Self {
        Self {
            definitions: RwLock::new(BTreeMap::new()),
            revision: AtomicU64::new(1),
            available: true,
        }
    }

    /// A provider that reports itself unconfigured
    pub fn unavailable() -> Self {
        Self {
            definitions: RwLock::new(BTreeMap::new()),
            revision: AtomicU64::new(1),
            available: false,
        }
    }

    pub fn set_definitions(&self, content_type: impl Into<String>, defs: Vec<FieldDefinition>) {
        self.definitions.write().insert(content_type.into(), defs);
        self.revision.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SchemaProvider for StaticSchemaProvider {
    async fn available(&self) -> bool {
        self.available
    }

    async fn definitions(&self, content_type: &str) -> Result<Vec<FieldDefinition>, StoreError> {
        Ok(self
            .definitions
            .read()
            .get(content_type)
            .cloned()
            .unwrap_or_default())
    }

    async fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn article_type() -> TypeRecord {
        TypeRecord {
            slug: "article".to_string(),
            name: "Articles".to_string(),
            singular: "Article".to_string(),
            rest_base: "articles".to_string(),
            hierarchical: false,
        }
    }

    fn post(id: u64, day: u32) -> PostRecord {
        PostRecord {
            id,
            post_type: "article".to_string(),
            title: format!("Post {id}"),
            slug: format!("post-{id}"),
            status: PostStatus::Published,
            content: String::new(),
            excerpt: String::new(),
            date: Utc.with_ymd_and_hms(2026, 1, day, 12, 0, 0).single().unwrap(),
            modified: None,
            author_id: 1,
            thumbnail_id: None,
            fields: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_cursor_bound_is_exclusive() {
        let store = MemoryStore::new();
        store.insert_type(article_type());
        for (id, day) in [(1, 1), (2, 2), (3, 3), (4, 4)] {
            store.insert_post(post(id, day));
        }
        let spec = PostListSpec {
            post_type: "article".to_string(),
            descending: true,
            limit: 2,
            after: Some(CursorBound {
                id: 3,
                date: Utc.with_ymd_and_hms(2026, 1, 3, 12, 0, 0).single().unwrap(),
            }),
            ..Default::default()
        };
        let page = store.list_posts(&spec).await.unwrap();
        let ids: Vec<u64> = page.posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(page.total, 4);
    }

    #[tokio::test]
    async fn test_soft_delete_tombstones() {
        let store = MemoryStore::new();
        store.insert_type(article_type());
        store.insert_post(post(1, 1));
        store.delete_post(1, false).await.unwrap();
        let p = store.get_post(1).await.unwrap();
        assert_eq!(p.status, PostStatus::Trashed);
        assert_eq!(store.count_posts("article").await, 0);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_type() {
        let store = MemoryStore::new();
        let result = store
            .create_post(NewPost {
                post_type: "ghost".to_string(),
                title: "x".to_string(),
                content: String::new(),
                excerpt: String::new(),
                status: None,
                author_id: 1,
                fields: Default::default(),
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unknown_taxonomy_is_none() {
        let store = MemoryStore::new();
        assert!(store.list_terms("nope").await.is_none());
        store.register_taxonomy("topic");
        assert_eq!(store.list_terms("topic").await.unwrap().len(), 0);
    }
}
