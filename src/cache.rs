//! Cache-aside response cache.
//!
//! Logical keys are hashed to physical keys; a bounded registry of
//! logical->physical mappings exists solely to support prefix
//! invalidation. Failures here are invisible to callers: a disabled
//! cache reads as permanent misses and absorbs writes as no-ops.

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

/// Registry cap; overflow truncates to the most recent half
const REGISTRY_MAX: usize = 1000;
const REGISTRY_KEEP: usize = 500;

struct Entry {
    payload: Value,
    expires: Instant,
}

/// In-process cache with prefix invalidation and a global enable switch.
pub struct CacheLayer {
    enabled: bool,
    default_ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
    /// (logical, physical) pairs in insertion order, bounded.
    /// Prefix deletion can miss keys evicted from here; that staleness
    /// is documented behavior, bounded by entry TTLs.
    registry: Mutex<Vec<(String, String)>>,
}

fn physical_key(logical: &str) -> String {
    use std::fmt::Write;
    let mut hasher = Sha256::new();
    hasher.update(logical.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Values worth caching: anything except null and false
fn cacheable(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

impl CacheLayer {
    pub fn new(enabled: bool, default_ttl: Duration) -> Self {
        Self {
            enabled,
            default_ttl,
            entries: RwLock::new(HashMap::new()),
            registry: Mutex::new(Vec::new()),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Cached value for a logical key; expired entries read as misses
    pub fn get(&self, key: &str) -> Option<Value> {
        if !self.enabled {
            return None;
        }
        let physical = physical_key(key);
        {
            let entries = self.entries.read();
            match entries.get(&physical) {
                Some(entry) if entry.expires > Instant::now() => {
                    return Some(entry.payload.clone())
                }
                Some(_) => {}
                None => return None,
            }
        }
        // lazily drop the expired entry
        self.entries.write().remove(&physical);
        None
    }

    /// Store a value; no-op when caching is disabled
    pub fn set(&self, key: &str, value: Value, ttl: Option<Duration>) {
        if !self.enabled {
            return;
        }
        let physical = physical_key(key);
        self.register(key, &physical);
        self.entries.write().insert(
            physical,
            Entry {
                payload: value,
                expires: Instant::now() + ttl.unwrap_or(self.default_ttl),
            },
        );
    }

    fn register(&self, logical: &str, physical: &str) {
        let mut registry = self.registry.lock();
        registry.retain(|(l, _)| l != logical);
        registry.push((logical.to_string(), physical.to_string()));
        if registry.len() > REGISTRY_MAX {
            let excess = registry.len() - REGISTRY_KEEP;
            registry.drain(..excess);
        }
    }

    /// Remove one logical key; true when an entry existed
    pub fn delete(&self, key: &str) -> bool {
        let physical = physical_key(key);
        self.registry.lock().retain(|(_, p)| p != &physical);
        self.entries.write().remove(&physical).is_some()
    }

    /// Remove every registered key with the given logical prefix,
    /// returning how many entries were dropped.
    pub fn delete_pattern(&self, prefix: &str) -> usize {
        let matching: Vec<String> = {
            let mut registry = self.registry.lock();
            let mut matched = Vec::new();
            registry.retain(|(logical, physical)| {
                if logical.starts_with(prefix) {
                    matched.push(physical.clone());
                    false
                } else {
                    true
                }
            });
            matched
        };
        let mut entries = self.entries.write();
        matching
            .into_iter()
            .filter(|physical| entries.remove(physical).is_some())
            .count()
    }

    /// Drop everything, returning the number of live entries removed
    pub fn flush_all(&self) -> usize {
        self.registry.lock().clear();
        let mut entries = self.entries.write();
        let count = entries.len();
        entries.clear();
        count
    }

    /// Cache-aside compute: return the cached value on a hit, otherwise
    /// run the producer and store its result when non-null/non-false.
    ///
    /// Concurrent misses for the same key may each run the producer;
    /// single-flight is deliberately not provided.
    pub async fn remember<F, Fut>(&self, key: &str, ttl: Option<Duration>, producer: F) -> Value
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Value>,
    {
        if let Some(hit) = self.get(key) {
            return hit;
        }
        let value = producer().await;
        if cacheable(&value) {
            self.set(key, value.clone(), ttl);
        }
        value
    }
}
