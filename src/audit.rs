//! Append-only audit trail for mutations.
//!
//! Recording is unconditional at call sites; when auditing is disabled
//! the recorder absorbs the call and returns nothing. Entries are never
//! mutated after insert. A periodic sweep prunes entries past the
//! configured retention; it is housekeeping, not a correctness need.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

const MAX_TITLE_LEN: usize = 200;
const MAX_USER_AGENT_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Upload,
    Batch,
}

impl AuditAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(AuditAction::Create),
            "update" => Some(AuditAction::Update),
            "delete" => Some(AuditAction::Delete),
            "upload" => Some(AuditAction::Upload),
            "batch" => Some(AuditAction::Batch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: u64,
    pub user_id: u64,
    pub user_name: String,
    pub action: AuditAction,
    pub object_type: String,
    pub object_id: Option<u64>,
    pub object_title: Option<String>,
    /// Opaque change summary (e.g. list of touched field names)
    pub changes: Value,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One mutation to record
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub user_id: u64,
    pub user_name: String,
    pub action: AuditAction,
    pub object_type: String,
    pub object_id: Option<u64>,
    pub object_title: Option<String>,
    pub changes: Value,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Filters for reading the trail back; created_at ordering, newest first
/// unless `ascending` is set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub user_id: Option<u64>,
    pub action: Option<String>,
    pub object_type: Option<String>,
    pub object_id: Option<u64>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ascending: bool,
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
}

fn truncate_chars(s: String, max: usize) -> String {
    if s.chars().count() <= max {
        s
    } else {
        s.chars().take(max).collect()
    }
}

pub struct AuditRecorder {
    enabled: bool,
    retention: Duration,
    entries: RwLock<Vec<AuditEntry>>,
    next_id: AtomicU64,
}

impl AuditRecorder {
    pub fn new(enabled: bool, retention_days: u32) -> Self {
        Self {
            enabled,
            retention: Duration::days(retention_days as i64),
            entries: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Append one entry; returns its id, or None when auditing is off
    pub fn log(&self, event: AuditEvent) -> Option<u64> {
        if !self.enabled {
            return None;
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let entry = AuditEntry {
            id,
            user_id: event.user_id,
            user_name: event.user_name,
            action: event.action,
            object_type: event.object_type,
            object_id: event.object_id,
            object_title: event
                .object_title
                .map(|t| truncate_chars(t, MAX_TITLE_LEN)),
            changes: event.changes,
            ip: event.ip,
            user_agent: event
                .user_agent
                .map(|ua| truncate_chars(ua, MAX_USER_AGENT_LEN)),
            created_at: Utc::now(),
        };
        self.entries.write().push(entry);
        Some(id)
    }

    /// Filtered read of the trail; returns (page, total matching)
    pub fn query(&self, query: &AuditQuery) -> (Vec<AuditEntry>, u64) {
        let action = query.action.as_deref().and_then(AuditAction::parse);
        let entries = self.entries.read();
        let mut matching: Vec<AuditEntry> = entries
            .iter()
            .filter(|e| query.user_id.map_or(true, |id| e.user_id == id))
            .filter(|e| action.map_or(true, |a| e.action == a))
            .filter(|e| {
                query
                    .object_type
                    .as_deref()
                    .map_or(true, |t| e.object_type == t)
            })
            .filter(|e| query.object_id.map_or(true, |id| e.object_id == Some(id)))
            .filter(|e| query.from.map_or(true, |from| e.created_at >= from))
            .filter(|e| query.to.map_or(true, |to| e.created_at <= to))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            let ord = a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id));
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

    /// Drop entries older than the retention window; returns count removed
    pub fn sweep(&self) -> usize {
        let cutoff = Utc::now() - self.retention;
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.created_at >= cutoff);
        before - entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(action: AuditAction, object_type: &str) -> AuditEvent {
        AuditEvent {
            user_id: 1,
            user_name: "tester".to_string(),
            action,
            object_type: object_type.to_string(),
            object_id: Some(5),
            object_title: Some("Title".to_string()),
            changes: json!(["title"]),
            ip: Some("10.0.0.1".to_string()),
            user_agent: Some("test-agent".to_string()),
        }
    }

    #[test]
    fn test_disabled_recorder_returns_none() {
        let recorder = AuditRecorder::new(false, 90);
        assert_eq!(recorder.log(event(AuditAction::Create, "article")), None);
        let (entries, total) = recorder.query(&AuditQuery::default());
        assert!(entries.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn test_log_and_filter_by_action() {
        let recorder = AuditRecorder::new(true, 90);
        recorder.log(event(AuditAction::Create, "article"));
        recorder.log(event(AuditAction::Delete, "article"));
        recorder.log(event(AuditAction::Create, "page"));
        let (entries, total) = recorder.query(&AuditQuery {
            action: Some("create".to_string()),
            ..Default::default()
        });
        assert_eq!(total, 2);
        assert!(entries.iter().all(|e| e.action == AuditAction::Create));
    }

    #[test]
    fn test_default_order_is_newest_first() {
        let recorder = AuditRecorder::new(true, 90);
        let first = recorder.log(event(AuditAction::Create, "article")).unwrap();
        let second = recorder.log(event(AuditAction::Update, "article")).unwrap();
        let (entries, _) = recorder.query(&AuditQuery::default());
        assert_eq!(entries[0].id, second);
        assert_eq!(entries[1].id, first);
    }

    #[test]
    fn test_long_fields_truncated() {
        let recorder = AuditRecorder::new(true, 90);
        let mut ev = event(AuditAction::Upload, "media");
        ev.object_title = Some("x".repeat(500));
        ev.user_agent = Some("y".repeat(500));
        recorder.log(ev);
        let (entries, _) = recorder.query(&AuditQuery::default());
        assert_eq!(entries[0].object_title.as_ref().unwrap().len(), 200);
        assert_eq!(entries[0].user_agent.as_ref().unwrap().len(), 255);
    }

    #[test]
    fn test_sweep_keeps_recent() {
        let recorder = AuditRecorder::new(true, 90);
        recorder.log(event(AuditAction::Create, "article"));
        assert_eq!(recorder.sweep(), 0);
        let (_, total) = recorder.query(&AuditQuery::default());
        assert_eq!(total, 1);
    }
}
