//! Gateway configuration

use clap::{Parser, ValueEnum};
use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;

/// Role that is always permitted API access and can never be removed
/// from the allowed set.
pub const ADMIN_ROLE: &str = "administrator";

/// Minimum capability required for API access.
///
/// A closed set; config input outside it falls back to the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum RequiredCapability {
    /// Edit own content (contributor and up)
    #[default]
    EditContent,
    /// Publish content (author and up)
    PublishContent,
    /// Edit others' content (editor and up)
    EditOthersContent,
    /// Manage site settings (administrator)
    ManageSite,
}

impl RequiredCapability {
    /// Stable slug used in capability sets carried by identity assertions
    pub fn as_slug(&self) -> &'static str {
        match self {
            RequiredCapability::EditContent => "edit_content",
            RequiredCapability::PublishContent => "publish_content",
            RequiredCapability::EditOthersContent => "edit_others_content",
            RequiredCapability::ManageSite => "manage_site",
        }
    }
}

/// Content Gateway configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "content-gateway")]
#[command(about = "REST API gateway for structured CMS content")]
pub struct GatewayConfig {
    /// Address to listen on
    #[arg(long, env = "GATEWAY_LISTEN_ADDR", default_value = "0.0.0.0:8090")]
    pub listen_addr: SocketAddr,

    /// Enable CORS (Cross-Origin Resource Sharing)
    #[arg(long, env = "GATEWAY_CORS_ENABLED", default_value = "true")]
    pub cors_enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "GATEWAY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    // === Caching ===
    /// Enable response caching
    #[arg(long, env = "GATEWAY_CACHE_ENABLED", default_value = "true")]
    pub cache_enabled: bool,

    /// Default cache TTL in seconds (clamped to 60-3600)
    #[arg(long, env = "GATEWAY_CACHE_TTL_SECS", default_value = "300")]
    pub cache_ttl_secs: u64,

    // === Audit log ===
    /// Enable the audit log
    #[arg(long, env = "GATEWAY_AUDIT_ENABLED", default_value = "true")]
    pub audit_enabled: bool,

    /// Audit log retention in days (entries older than this are swept)
    #[arg(long, env = "GATEWAY_AUDIT_RETENTION_DAYS", default_value = "90")]
    pub audit_retention_days: u32,

    // === Access policy ===
    /// Roles allowed to access the API (repeatable). The administrator
    /// role is always included regardless of this list.
    #[arg(long = "allowed-role", env = "GATEWAY_ALLOWED_ROLES", default_value = "editor")]
    pub allowed_roles: Vec<String>,

    /// Minimum capability required for API access
    #[arg(
        long,
        env = "GATEWAY_REQUIRED_CAPABILITY",
        default_value = "edit-content",
        value_enum
    )]
    pub required_capability: RequiredCapability,

    /// Content types hidden from the API (repeatable)
    #[arg(long = "hidden-type", env = "GATEWAY_HIDDEN_TYPES")]
    pub hidden_types: Vec<String>,

    /// Maximum upload size in bytes (default 50MB)
    #[arg(long, env = "GATEWAY_UPLOAD_MAX_BYTES", default_value = "52428800")]
    pub upload_max_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8090".parse().expect("static addr"),
            cors_enabled: true,
            log_level: "info".to_string(),
            cache_enabled: true,
            cache_ttl_secs: 300,
            audit_enabled: true,
            audit_retention_days: 90,
            allowed_roles: vec![ADMIN_ROLE.to_string(), "editor".to_string()],
            required_capability: RequiredCapability::EditContent,
            hidden_types: Vec::new(),
            upload_max_bytes: 50 * 1024 * 1024,
        }
    }
}

impl GatewayConfig {
    /// Create config from CLI args
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Resolve the allowed-roles set, pinning the administrator role.
    ///
    /// The administrator role cannot be excluded by configuration; it is
    /// re-inserted here so every consumer sees it present.
    pub fn resolved_allowed_roles(&self) -> BTreeSet<String> {
        let mut roles: BTreeSet<String> = self.allowed_roles.iter().cloned().collect();
        roles.insert(ADMIN_ROLE.to_string());
        roles
    }

    /// Effective cache TTL, clamped to the supported 60-3600s range
    pub fn effective_cache_ttl_secs(&self) -> u64 {
        self.cache_ttl_secs.clamp(60, 3600)
    }

    /// Validate configuration at startup
    pub fn validate(&self) -> Result<(), String> {
        if self.audit_retention_days == 0 {
            return Err("audit_retention_days must be > 0".to_string());
        }
        if self.upload_max_bytes == 0 {
            return Err("upload_max_bytes must be > 0".to_string());
        }
        Ok(())
    }
}

/// Per-content-type visibility rules: type slug -> roles permitted to see it.
///
/// Absence of an entry means the type is visible to every role that has API
/// access. Administrators bypass these rules entirely.
#[derive(Debug, Clone, Default)]
pub struct ContentVisibility {
    rules: BTreeMap<String, BTreeSet<String>>,
}

impl ContentVisibility {
    /// Build from (type, roles) pairs
    pub fn new(rules: BTreeMap<String, BTreeSet<String>>) -> Self {
        Self { rules }
    }

    /// Roles configured for a content type, if any rule exists
    pub fn roles_for(&self, content_type: &str) -> Option<&BTreeSet<String>> {
        self.rules.get(content_type)
    }

    /// Replace the rule set for a content type
    pub fn set_rule(&mut self, content_type: impl Into<String>, roles: BTreeSet<String>) {
        self.rules.insert(content_type.into(), roles);
    }
}
