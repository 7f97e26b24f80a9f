//! Authenticated-identity extraction.
//!
//! Credential verification happens upstream; the gateway trusts the
//! identity assertion headers the proxy injects (`x-auth-user-id`,
//! `x-auth-user-name`, `x-auth-user-email`, `x-auth-roles`,
//! `x-auth-app-id`, `x-auth-app-name`). Extraction runs the coarse
//! access-policy gates and records application access as a side effect,
//! so any handler taking [`AuthIdentity`] is already authorized at the
//! API level.

use crate::error::ApiError;
use crate::extract::ClientMeta;
use crate::policy::Identity;
use crate::state::AppState;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::collections::BTreeSet;
use std::sync::Arc;

pub const USER_ID_HEADER: &str = "x-auth-user-id";
pub const USER_NAME_HEADER: &str = "x-auth-user-name";
pub const USER_EMAIL_HEADER: &str = "x-auth-user-email";
pub const ROLES_HEADER: &str = "x-auth-roles";
pub const APP_ID_HEADER: &str = "x-auth-app-id";
pub const APP_NAME_HEADER: &str = "x-auth-app-name";

/// An authenticated caller that passed the API access gates
#[derive(Debug, Clone)]
pub struct AuthIdentity(pub Identity);

impl std::ops::Deref for AuthIdentity {
    type Target = Identity;

    fn deref(&self) -> &Identity {
        &self.0
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user_id: u64 = header(parts, USER_ID_HEADER)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?
            .parse()
            .map_err(|_| ApiError::unauthorized("Malformed identity assertion"))?;

        let roles: BTreeSet<String> = header(parts, ROLES_HEADER)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let identity = Identity {
            user_id,
            name: header(parts, USER_NAME_HEADER).unwrap_or("").to_string(),
            email: header(parts, USER_EMAIL_HEADER).unwrap_or("").to_string(),
            roles,
            app_id: header(parts, APP_ID_HEADER).map(str::to_string),
            app_name: header(parts, APP_NAME_HEADER).map(str::to_string),
        };

        if !state.policy.can_access_api(&identity) {
            tracing::debug!(user_id, "api access denied by policy");
            return Err(ApiError::forbidden("API access not permitted for your role"));
        }

        if let Some(app_id) = &identity.app_id {
            let meta = ClientMeta::from_headers(&parts.headers);
            let app_name = identity.app_name.as_deref().unwrap_or(app_id);
            state
                .tracker
                .record_access(user_id, app_id, app_name, meta.ip, meta.user_agent);
        }

        Ok(AuthIdentity(identity))
    }
}

/// An authenticated administrator; non-admin callers are rejected
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub Identity);

impl std::ops::Deref for RequireAdmin {
    type Target = Identity;

    fn deref(&self) -> &Identity {
        &self.0
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthIdentity(identity) = AuthIdentity::from_request_parts(parts, state).await?;
        if !identity.is_admin() {
            return Err(ApiError::forbidden("Administrator access required"));
        }
        Ok(RequireAdmin(identity))
    }
}
