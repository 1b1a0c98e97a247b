// ── Endpoint capability cache ──
//
// Remembers which data endpoints a device class actually supports on the
// platform. The cascade resolver reads a record before every request and
// overwrites it after each definitive answer; nothing removes records except
// an explicit `clear()`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use loggamera_api::{DeviceClass, Endpoint};
use serde::Serialize;
use strum::Display;

/// What is known about one `(device class, endpoint)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
pub enum CapabilityStatus {
    Unknown,
    Available,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapabilityRecord {
    pub status: CapabilityStatus,
    pub checked_at: DateTime<Utc>,
}

/// One row of [`CapabilityStore::snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityEntry {
    pub class: DeviceClass,
    pub endpoint: Endpoint,
    pub record: CapabilityRecord,
}

/// Storage for capability records.
///
/// Injected into the resolver so tests and embedders can observe or
/// pre-seed it. Implementations must tolerate concurrent callers.
pub trait CapabilityStore: Send + Sync {
    /// Current status; [`CapabilityStatus::Unknown`] when never recorded
    /// (or when a policy expired the record).
    fn lookup(&self, class: &DeviceClass, endpoint: Endpoint) -> CapabilityStatus;

    /// Overwrite the record for the pair.
    fn record(&self, class: &DeviceClass, endpoint: Endpoint, status: CapabilityStatus);

    /// All records, sorted by class then endpoint.
    fn snapshot(&self) -> Vec<CapabilityEntry>;

    /// Forget everything; every pair is probed again on next use.
    fn clear(&self);
}

/// Default [`CapabilityStore`], backed by a `DashMap`.
#[derive(Debug, Default)]
pub struct CapabilityCache {
    records: DashMap<(DeviceClass, Endpoint), CapabilityRecord>,
    unavailable_ttl: Option<Duration>,
}

impl CapabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache whose `Unavailable` records expire after `ttl`.
    pub fn with_unavailable_ttl(ttl: Option<Duration>) -> Self {
        Self {
            records: DashMap::new(),
            unavailable_ttl: ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn lookup_at(
        &self,
        class: &DeviceClass,
        endpoint: Endpoint,
        now: DateTime<Utc>,
    ) -> CapabilityStatus {
        let Some(record) = self.records.get(&(class.clone(), endpoint)).map(|r| *r) else {
            return CapabilityStatus::Unknown;
        };
        if record.status == CapabilityStatus::Unavailable && self.expired(record.checked_at, now) {
            return CapabilityStatus::Unknown;
        }
        record.status
    }

    pub(crate) fn record_at(
        &self,
        class: &DeviceClass,
        endpoint: Endpoint,
        status: CapabilityStatus,
        now: DateTime<Utc>,
    ) {
        self.records.insert(
            (class.clone(), endpoint),
            CapabilityRecord {
                status,
                checked_at: now,
            },
        );
    }

    fn expired(&self, checked_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let Some(ttl) = self.unavailable_ttl else {
            return false;
        };
        // A TTL beyond chrono's range never expires.
        chrono::Duration::from_std(ttl).is_ok_and(|ttl| now - checked_at > ttl)
    }
}

impl CapabilityStore for CapabilityCache {
    fn lookup(&self, class: &DeviceClass, endpoint: Endpoint) -> CapabilityStatus {
        self.lookup_at(class, endpoint, Utc::now())
    }

    fn record(&self, class: &DeviceClass, endpoint: Endpoint, status: CapabilityStatus) {
        self.record_at(class, endpoint, status, Utc::now());
    }

    fn snapshot(&self) -> Vec<CapabilityEntry> {
        let mut entries: Vec<CapabilityEntry> = self
            .records
            .iter()
            .map(|entry| {
                let (class, endpoint) = entry.key();
                CapabilityEntry {
                    class: class.clone(),
                    endpoint: *endpoint,
                    record: *entry.value(),
                }
            })
            .collect();
        entries.sort_by(|a, b| {
            a.class
                .as_str()
                .cmp(b.class.as_str())
                .then(a.endpoint.cmp(&b.endpoint))
        });
        entries
    }

    fn clear(&self) {
        self.records.clear();
    }
}
