//! Client IP and user-agent extraction.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, HeaderMap};
use std::convert::Infallible;

/// Where the request came from, for audit and access-tracking records.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientMeta {
    /// Proxy-aware client IP: CF-Connecting-IP, then the first hop of
    /// X-Forwarded-For, then X-Real-IP.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| -> Option<String> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let ip = header("cf-connecting-ip")
            .or_else(|| {
                header("x-forwarded-for")
                    .and_then(|chain| chain.split(',').next().map(|s| s.trim().to_string()))
                    .filter(|s| !s.is_empty())
            })
            .or_else(|| header("x-real-ip"));

        Self {
            ip,
            user_agent: header("user-agent"),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientMeta::from_headers(&parts.headers))
    }
}
