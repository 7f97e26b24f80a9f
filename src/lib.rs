//! Content Gateway
//!
//! A REST API gateway exposing a CMS content repository's structured
//! content to external client applications.
//!
//! # Features
//!
//! - Typed custom-field codec with reference and asset resolution
//! - Schema-driven validation with aggregate per-field errors
//! - Role and capability based access control
//! - Page- and cursor-based pagination
//! - Cache-aside response caching with pattern invalidation
//! - Append-only audit trail with retention sweeping
//! - Batch operations and connected-application tracking
//!
//! # Example
//!
//! ```ignore
//! use content_gateway::{GatewayConfig, GatewayServer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = GatewayServer::builder(GatewayConfig::default()).build();
//!     server.run().await.unwrap();
//! }
//! ```

pub mod audit;
pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod fields;
pub mod policy;
pub mod query;
pub mod routes;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod tracker;

pub use config::{ContentVisibility, GatewayConfig};
pub use error::{ApiError, Result};
pub use state::AppState;

use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use store::{ContentStore, MemoryStore, SchemaProvider, StaticSchemaProvider};
use tokio::net::TcpListener;
use tracing::info;

/// How often the retention sweeps run
const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Connected-application records idle past this are dropped
const APP_IDLE_RETENTION_DAYS: i64 = 180;

/// The gateway server: wired state plus its router.
pub struct GatewayServer {
    state: Arc<AppState>,
    router: Router,
}

impl GatewayServer {
    /// Builder with the in-memory store and schema provider as defaults
    pub fn builder(config: GatewayConfig) -> GatewayServerBuilder {
        GatewayServerBuilder {
            config,
            store: None,
            provider: None,
            visibility: ContentVisibility::default(),
        }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// The router, for in-process testing
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Bind and serve until the process is stopped
    pub async fn run(self) -> std::io::Result<()> {
        let addr = self.state.config.listen_addr;
        let listener = TcpListener::bind(addr).await?;

        let sweep_task = self.spawn_housekeeping();

        info!(
            addr = %addr,
            cache = self.state.cache.enabled(),
            audit = self.state.audit.enabled(),
            "content gateway starting"
        );

        let result = axum::serve(listener, self.router).await;
        sweep_task.abort();
        result
    }

    /// Periodic retention sweeps; advisory housekeeping only
    fn spawn_housekeeping(&self) -> tokio::task::JoinHandle<()> {
        let state = self.state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                let removed = state.audit.sweep();
                if removed > 0 {
                    info!(removed, "audit entries swept");
                }
                let cutoff = chrono::Utc::now() - chrono::Duration::days(APP_IDLE_RETENTION_DAYS);
                let stale = state.tracker.sweep(cutoff);
                if stale > 0 {
                    info!(stale, "idle application records swept");
                }
            }
        })
    }
}

/// Builder for [`GatewayServer`] with pluggable collaborators.
pub struct GatewayServerBuilder {
    config: GatewayConfig,
    store: Option<Arc<dyn ContentStore>>,
    provider: Option<Arc<dyn SchemaProvider>>,
    visibility: ContentVisibility,
}

impl GatewayServerBuilder {
    pub fn store(mut self, store: Arc<dyn ContentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn schema_provider(mut self, provider: Arc<dyn SchemaProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn visibility(mut self, visibility: ContentVisibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn build(self) -> GatewayServer {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn ContentStore>);
        let provider = self
            .provider
            .unwrap_or_else(|| Arc::new(StaticSchemaProvider::new()) as Arc<dyn SchemaProvider>);
        let state = Arc::new(AppState::new(self.config, store, provider, self.visibility));
        let router = routes::build_router(state.clone());
        GatewayServer { state, router }
    }
}
