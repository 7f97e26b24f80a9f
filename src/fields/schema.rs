//! Schema resolver: ordered, visible field definitions per content type.
//!
//! Definitions come from the external schema authority and are cached for
//! an hour per content type. The provider's revision counter is checked on
//! every hit so upstream definition changes invalidate immediately.

use crate::error::{ApiError, Result};
use crate::fields::FieldDefinition;
use crate::store::SchemaProvider;
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

const SCHEMA_TTL: Duration = Duration::from_secs(3600);

struct CachedSchema {
    defs: Vec<FieldDefinition>,
    hidden: Vec<String>,
    revision: u64,
    expires: Instant,
}

pub struct SchemaResolver {
    provider: Arc<dyn SchemaProvider>,
    cache: RwLock<BTreeMap<String, CachedSchema>>,
}

impl SchemaResolver {
    pub fn new(provider: Arc<dyn SchemaProvider>) -> Self {
        Self {
            provider,
            cache: RwLock::new(BTreeMap::new()),
        }
    }

    /// Whether a schema authority is configured and reachable
    pub async fn available(&self) -> bool {
        self.provider.available().await
    }

    /// The provider's current definition revision. Response caches key on
    /// this so a definition change upstream is visible immediately.
    pub async fn revision(&self) -> u64 {
        self.provider.revision().await
    }

    /// Ordered visible definitions for a content type.
    ///
    /// Upstream declaration order is preserved exactly; hidden definitions
    /// are filtered out here and never reach callers.
    pub async fn resolve(&self, content_type: &str) -> Result<Vec<FieldDefinition>> {
        Ok(self.load(content_type).await?.0)
    }

    /// Names of hidden definitions for a content type. Stored values under
    /// these names must never surface in responses, even as extras.
    pub async fn hidden_names(&self, content_type: &str) -> Result<Vec<String>> {
        Ok(self.load(content_type).await?.1)
    }

    async fn load(&self, content_type: &str) -> Result<(Vec<FieldDefinition>, Vec<String>)> {
        if !self.provider.available().await {
            return Err(ApiError::SchemaUnavailable);
        }
        let revision = self.provider.revision().await;
        {
            let cache = self.cache.read();
            if let Some(cached) = cache.get(content_type) {
                if cached.revision == revision && cached.expires > Instant::now() {
                    return Ok((cached.defs.clone(), cached.hidden.clone()));
                }
            }
        }

        let (hidden, defs): (Vec<FieldDefinition>, Vec<FieldDefinition>) = self
            .provider
            .definitions(content_type)
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?
            .into_iter()
            .partition(|d| d.is_hidden());
        let hidden: Vec<String> = hidden.into_iter().map(|d| d.name).collect();

        self.cache.write().insert(
            content_type.to_string(),
            CachedSchema {
                defs: defs.clone(),
                hidden: hidden.clone(),
                revision,
                expires: Instant::now() + SCHEMA_TTL,
            },
        );
        Ok((defs, hidden))
    }

    /// Drop every cached schema
    pub fn invalidate(&self) {
        self.cache.write().clear();
    }

    /// Wire schema body for one content type:
    /// `{postType, fields, fieldOrder}` with fields keyed by name.
    pub async fn schema_response(&self, content_type: &str) -> Result<Value> {
        let defs = self.resolve(content_type).await?;
        let field_order: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        let fields: Map<String, Value> = defs
            .iter()
            .map(|d| (d.name.clone(), d.schema_json()))
            .collect();
        Ok(json!({
            "postType": content_type,
            "fields": fields,
            "fieldOrder": field_order,
        }))
    }
}
