//! Request extractors

pub mod client_meta;
pub mod identity;

pub use client_meta::ClientMeta;
pub use identity::{AuthIdentity, RequireAdmin};
