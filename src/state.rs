//! Shared application state

use crate::audit::AuditRecorder;
use crate::cache::CacheLayer;
use crate::config::{ContentVisibility, GatewayConfig};
use crate::fields::{FieldCodec, FieldValidator, SchemaResolver};
use crate::policy::AccessPolicy;
use crate::query::QueryEngine;
use crate::store::{ContentStore, SchemaProvider};
use crate::tracker::AppAccessTracker;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything a request handler needs, wired once at startup and shared
/// behind an `Arc`.
pub struct AppState {
    pub config: GatewayConfig,
    pub store: Arc<dyn ContentStore>,
    pub schema: Arc<SchemaResolver>,
    pub validator: FieldValidator,
    pub engine: QueryEngine,
    pub policy: AccessPolicy,
    pub cache: CacheLayer,
    pub audit: AuditRecorder,
    pub tracker: AppAccessTracker,
    started: Instant,
}

impl AppState {
    pub fn new(
        config: GatewayConfig,
        store: Arc<dyn ContentStore>,
        provider: Arc<dyn SchemaProvider>,
        visibility: ContentVisibility,
    ) -> Self {
        let schema = Arc::new(SchemaResolver::new(provider));
        let validator = FieldValidator::new(store.clone());
        let engine = QueryEngine::new(store.clone(), FieldCodec::new(store.clone()), schema.clone());
        let policy = AccessPolicy::new(
            config.resolved_allowed_roles(),
            config.required_capability,
            visibility,
        );
        let cache = CacheLayer::new(
            config.cache_enabled,
            Duration::from_secs(config.effective_cache_ttl_secs()),
        );
        let audit = AuditRecorder::new(config.audit_enabled, config.audit_retention_days);
        Self {
            config,
            store,
            schema,
            validator,
            engine,
            policy,
            cache,
            audit,
            tracker: AppAccessTracker::new(),
            started: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// Drop every cache entry a post write may have made stale: the
    /// single-post entry, list caches for its type, and the dashboard.
    pub fn invalidate_post_caches(&self, post_type: &str, id: u64) {
        self.cache.delete(&format!("post:{id}"));
        self.cache.delete_pattern(&format!("posts:{post_type}:"));
        self.cache.delete_pattern("dashboard");
    }
}
