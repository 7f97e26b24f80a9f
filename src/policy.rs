//! Access policy: who may reach the API and what they may do once in.
//!
//! Two coarse gates guard every authenticated call: the identity's roles
//! must intersect the configured allowlist (administrators always pass),
//! and the identity must hold the configured minimum capability. Content
//! type visibility and per-action checks layer on top.

use crate::config::{ContentVisibility, RequiredCapability, ADMIN_ROLE};
use std::collections::BTreeSet;

/// Authenticated caller, built from the upstream identity assertion
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: u64,
    pub name: String,
    pub email: String,
    pub roles: BTreeSet<String>,
    /// Stable id of the client application credential, when presented
    pub app_id: Option<String>,
    pub app_name: Option<String>,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(ADMIN_ROLE)
    }

    /// Capability slugs granted by the identity's roles
    pub fn capabilities(&self) -> BTreeSet<&'static str> {
        let mut caps = BTreeSet::new();
        for role in &self.roles {
            for cap in capabilities_for_role(role) {
                caps.insert(*cap);
            }
        }
        caps
    }

    pub fn has_capability(&self, slug: &str) -> bool {
        self.capabilities().contains(slug)
    }
}

/// Built-in role -> capability grants
fn capabilities_for_role(role: &str) -> &'static [&'static str] {
    match role {
        ADMIN_ROLE => &[
            "edit_content",
            "publish_content",
            "edit_others_content",
            "manage_site",
        ],
        "editor" => &["edit_content", "publish_content", "edit_others_content"],
        "author" => &["edit_content", "publish_content"],
        "contributor" => &["edit_content"],
        _ => &[],
    }
}

/// A concrete thing a caller wants to do, checked per call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    /// Mutating an existing object owned by `author_id`
    Update { author_id: u64 },
    Delete { author_id: u64 },
    Upload,
}

pub struct AccessPolicy {
    allowed_roles: BTreeSet<String>,
    required_capability: RequiredCapability,
    visibility: ContentVisibility,
}

impl AccessPolicy {
    pub fn new(
        allowed_roles: BTreeSet<String>,
        required_capability: RequiredCapability,
        visibility: ContentVisibility,
    ) -> Self {
        Self {
            allowed_roles,
            required_capability,
            visibility,
        }
    }

    /// Coarse API gate: role allowlist plus minimum capability.
    /// Both must pass; administrators pass the role check unconditionally.
    pub fn can_access_api(&self, identity: &Identity) -> bool {
        let role_ok = identity.is_admin()
            || identity.roles.iter().any(|r| self.allowed_roles.contains(r));
        role_ok && identity.has_capability(self.required_capability.as_slug())
    }

    /// Per-type visibility. Administrators bypass; an unconfigured type
    /// is visible to every role that has API access.
    pub fn can_access_content_type(&self, identity: &Identity, content_type: &str) -> bool {
        if identity.is_admin() {
            return true;
        }
        match self.visibility.roles_for(content_type) {
            Some(roles) => identity.roles.iter().any(|r| roles.contains(r)),
            None => true,
        }
    }

    /// Fine-grained per-action check, independent of the coarse gates
    pub fn can_perform(&self, identity: &Identity, action: Action) -> bool {
        if identity.is_admin() {
            return true;
        }
        match action {
            Action::Read => true,
            Action::Create | Action::Upload => identity.has_capability("edit_content"),
            Action::Update { author_id } | Action::Delete { author_id } => {
                if !identity.has_capability("edit_content") {
                    return false;
                }
                author_id == identity.user_id || identity.has_capability("edit_others_content")
            }
        }
    }
}
