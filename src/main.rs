//! Content Gateway CLI
//!
//! Run with: `cargo run -- --help`

use content_gateway::{telemetry, GatewayConfig, GatewayServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = GatewayConfig::from_args();
    config.validate().map_err(|e| format!("invalid configuration: {e}"))?;

    telemetry::init_logging(&config.log_level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.listen_addr,
        cors = config.cors_enabled,
        cache = config.cache_enabled,
        cache_ttl_secs = config.effective_cache_ttl_secs(),
        audit = config.audit_enabled,
        "starting content gateway"
    );

    let server = GatewayServer::builder(config).build();
    server.run().await.map_err(Into::into)
}
