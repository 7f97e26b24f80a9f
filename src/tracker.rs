//! Connected-application tracking.
//!
//! Every authenticated call that presents an application credential
//! upserts one record per (user, application) pair: counters increment,
//! last-seen metadata is overwritten. Explicit revoke removes the record.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct AppAccessRecord {
    pub user_id: u64,
    pub app_id: String,
    pub app_name: String,
    pub access_count: u64,
    pub last_access: DateTime<Utc>,
    pub last_ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Sort key allowlist for listings; anything else falls back to LastAccess
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AppOrderBy {
    #[default]
    LastAccess,
    CreatedAt,
    AccessCount,
    AppName,
}

impl AppOrderBy {
    pub fn parse(s: &str) -> Self {
        match s {
            "created_at" => AppOrderBy::CreatedAt,
            "access_count" => AppOrderBy::AccessCount,
            "app_name" => AppOrderBy::AppName,
            _ => AppOrderBy::LastAccess,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppListQuery {
    pub user_id: Option<u64>,
    pub order_by: AppOrderBy,
    pub ascending: bool,
    pub offset: usize,
    pub limit: Option<usize>,
}

#[derive(Default)]
pub struct AppAccessTracker {
    records: RwLock<BTreeMap<(u64, String), AppAccessRecord>>,
}

impl AppAccessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert the record for (user, application): bump the counter and
    /// overwrite last-seen metadata, or insert fresh with counter = 1.
    pub fn record_access(
        &self,
        user_id: u64,
        app_id: &str,
        app_name: &str,
        ip: Option<String>,
        user_agent: Option<String>,
    ) {
        let now = Utc::now();
        let mut records = self.records.write();
        match records.get_mut(&(user_id, app_id.to_string())) {
            Some(record) => {
                record.access_count += 1;
                record.app_name = app_name.to_string();
                record.last_access = now;
                record.last_ip = ip;
                record.user_agent = user_agent;
            }
            None => {
                records.insert(
                    (user_id, app_id.to_string()),
                    AppAccessRecord {
                        user_id,
                        app_id: app_id.to_string(),
                        app_name: app_name.to_string(),
                        access_count: 1,
                        last_access: now,
                        last_ip: ip,
                        user_agent,
                        created_at: now,
                    },
                );
            }
        }
    }

    /// Filtered, sorted listing; returns (page, total matching)
    pub fn list(&self, query: &AppListQuery) -> (Vec<AppAccessRecord>, u64) {
        let records = self.records.read();
        let mut matching: Vec<AppAccessRecord> = records
            .values()
            .filter(|r| query.user_id.map_or(true, |id| r.user_id == id))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            let ord = match query.order_by {
                AppOrderBy::LastAccess => a.last_access.cmp(&b.last_access),
                AppOrderBy::CreatedAt => a.created_at.cmp(&b.created_at),
                AppOrderBy::AccessCount => a.access_count.cmp(&b.access_count),
                AppOrderBy::AppName => {
                    a.app_name.to_lowercase().cmp(&b.app_name.to_lowercase())
                }
            }
            .then_with(|| a.app_id.cmp(&b.app_id));
            if query.ascending {
                ord
            } else {
                ord.reverse()
            }
        });

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();
        (page, total)
    }

    /// Revoke one (user, application) record; true when it existed
    pub fn remove(&self, user_id: u64, app_id: &str) -> bool {
        self.records
            .write()
            .remove(&(user_id, app_id.to_string()))
            .is_some()
    }

    /// Drop records not seen since `cutoff`; returns how many were removed
    pub fn sweep(&self, cutoff: DateTime<Utc>) -> usize {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, r| r.last_access >= cutoff);
        before - records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_increments_and_overwrites() {
        let tracker = AppAccessTracker::new();
        tracker.record_access(1, "app-a", "Phone", Some("10.0.0.1".into()), None);
        tracker.record_access(1, "app-a", "Phone (renamed)", Some("10.0.0.2".into()), None);
        let (records, total) = tracker.list(&AppListQuery::default());
        assert_eq!(total, 1);
        assert_eq!(records[0].access_count, 2);
        assert_eq!(records[0].app_name, "Phone (renamed)");
        assert_eq!(records[0].last_ip.as_deref(), Some("10.0.0.2"));
    }

    #[test]
    fn test_distinct_pairs_are_distinct_records() {
        let tracker = AppAccessTracker::new();
        tracker.record_access(1, "app-a", "Phone", None, None);
        tracker.record_access(1, "app-b", "Tablet", None, None);
        tracker.record_access(2, "app-a", "Phone", None, None);
        let (_, total) = tracker.list(&AppListQuery::default());
        assert_eq!(total, 3);
        let (mine, _) = tracker.list(&AppListQuery {
            user_id: Some(1),
            ..Default::default()
        });
        assert_eq!(mine.len(), 2);
    }

    #[test]
    fn test_order_by_access_count() {
        let tracker = AppAccessTracker::new();
        tracker.record_access(1, "light", "Light", None, None);
        for _ in 0..3 {
            tracker.record_access(1, "heavy", "Heavy", None, None);
        }
        let (records, _) = tracker.list(&AppListQuery {
            order_by: AppOrderBy::parse("access_count"),
            ..Default::default()
        });
        assert_eq!(records[0].app_id, "heavy");
    }

    #[test]
    fn test_unknown_orderby_falls_back() {
        assert_eq!(AppOrderBy::parse("; drop table"), AppOrderBy::LastAccess);
    }

    #[test]
    fn test_sweep_removes_only_idle_records() {
        let tracker = AppAccessTracker::new();
        tracker.record_access(1, "app-a", "Phone", None, None);
        assert_eq!(tracker.sweep(Utc::now() - chrono::Duration::days(1)), 0);
        assert_eq!(tracker.sweep(Utc::now() + chrono::Duration::days(1)), 1);
        let (_, total) = tracker.list(&AppListQuery::default());
        assert_eq!(total, 0);
    }

    #[test]
    fn test_remove() {
        let tracker = AppAccessTracker::new();
        tracker.record_access(1, "app-a", "Phone", None, None);
        assert!(tracker.remove(1, "app-a"));
        assert!(!tracker.remove(1, "app-a"));
    }
}
