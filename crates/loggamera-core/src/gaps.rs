// ── Data-gap tracking ──
//
// Per-device record of failed reads. A gap opens on the first failure after
// a success (or on the first failure ever) and closes on the next success.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use loggamera_api::{DeviceId, Endpoint};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::ErrorKind;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceGap {
    pub consecutive_failures: u32,
    /// Set while a gap is open.
    pub gap_started: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    /// Endpoint of the last successful read.
    pub last_endpoint: Option<Endpoint>,
    pub last_error: Option<String>,
    /// Gaps opened since tracking began, including the current one.
    pub total_gaps: u32,
}

impl DeviceGap {
    pub fn has_active_gap(&self) -> bool {
        self.gap_started.is_some()
    }

    /// Whole minutes the current gap has lasted at `now`.
    pub fn gap_minutes(&self, now: DateTime<Utc>) -> Option<i64> {
        self.gap_started.map(|start| (now - start).num_minutes().max(0))
    }
}

/// Summary across all tracked devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GapReport {
    pub total_devices_tracked: usize,
    pub devices_with_gaps: usize,
    pub total_gaps: u64,
    pub longest_active_gap_minutes: Option<i64>,
    /// Devices with an open gap, longest first.
    pub active: Vec<(DeviceId, DeviceGap)>,
}

#[derive(Debug, Default)]
pub struct DataGapTracker {
    devices: DashMap<DeviceId, DeviceGap>,
}

impl DataGapTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, device: DeviceId, endpoint: Endpoint, now: DateTime<Utc>) {
        let mut gap = self.devices.entry(device).or_default();
        if let Some(minutes) = gap.gap_minutes(now) {
            info!(
                %device,
                %endpoint,
                gap_minutes = minutes,
                failures = gap.consecutive_failures,
                "data gap closed"
            );
        }
        gap.consecutive_failures = 0;
        gap.gap_started = None;
        gap.last_success = Some(now);
        gap.last_endpoint = Some(endpoint);
        gap.last_error = None;
    }

    pub fn record_failure(&self, device: DeviceId, kind: ErrorKind, now: DateTime<Utc>) {
        let mut gap = self.devices.entry(device).or_default();
        gap.consecutive_failures = gap.consecutive_failures.saturating_add(1);
        gap.last_error = Some(kind.to_string());
        if gap.gap_started.is_none() {
            gap.gap_started = Some(now);
            gap.total_gaps = gap.total_gaps.saturating_add(1);
            warn!(%device, error = %kind, "data gap opened");
        }
    }

    pub fn device(&self, device: DeviceId) -> Option<DeviceGap> {
        self.devices.get(&device).map(|g| g.clone())
    }

    pub fn report(&self, now: DateTime<Utc>) -> GapReport {
        let mut active: Vec<(DeviceId, DeviceGap)> = Vec::new();
        let mut total_gaps = 0_u64;
        for entry in &self.devices {
            total_gaps += u64::from(entry.total_gaps);
            if entry.has_active_gap() {
                active.push((*entry.key(), entry.value().clone()));
            }
        }
        active.sort_by(|(a_id, a), (b_id, b)| {
            b.gap_minutes(now)
                .cmp(&a.gap_minutes(now))
                .then(a_id.cmp(b_id))
        });

        GapReport {
            total_devices_tracked: self.devices.len(),
            devices_with_gaps: active.len(),
            total_gaps,
            longest_active_gap_minutes: active.first().and_then(|(_, g)| g.gap_minutes(now)),
            active,
        }
    }

    pub fn clear(&self) {
        self.devices.clear();
    }
}
