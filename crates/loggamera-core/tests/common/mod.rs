// Shared fixtures for loggamera-core integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;

use loggamera_api::{
    DeviceClass, DeviceId, Endpoint, OrganizationId, RawResponse, RetryConfig, Transport,
    TransportError, TransportErrorKind,
};
use loggamera_core::{
    CapabilityCache, CapabilityStore, Controller, ControllerConfig, DeviceDirectory,
};

// ── Fake transport ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Reply {
    Json(u16, Value),
    Raw(u16, &'static str),
    Fail,
    Hang,
    /// A 200 JSON reply delivered after a delay.
    After(Duration, Value),
}

/// Per-endpoint scripted replies. The last reply for an endpoint repeats;
/// unscripted endpoints answer "invalid endpoint".
#[derive(Debug, Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<Endpoint, VecDeque<Reply>>>,
    log: Mutex<Vec<(Endpoint, Value)>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, endpoint: Endpoint, reply: Reply) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry(endpoint)
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls_to(&self, endpoint: Endpoint) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, _)| *e == endpoint)
            .count()
    }

    /// Request bodies sent to `endpoint`, oldest first.
    pub fn bodies(&self, endpoint: Endpoint) -> Vec<Value> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, _)| *e == endpoint)
            .map(|(_, body)| body.clone())
            .collect()
    }

    fn next_reply(&self, endpoint: Endpoint) -> Reply {
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&endpoint) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap(),
            None => Reply::Json(200, invalid_endpoint()),
        }
    }
}

impl Transport for FakeTransport {
    async fn send(&self, endpoint: Endpoint, body: &Value) -> Result<RawResponse, TransportError> {
        self.log.lock().unwrap().push((endpoint, body.clone()));
        match self.next_reply(endpoint) {
            Reply::Json(status, value) => Ok(RawResponse::new(status, value.to_string())),
            Reply::Raw(status, body) => Ok(RawResponse::new(status, body)),
            Reply::Fail => Err(TransportError::new(
                TransportErrorKind::Connect,
                "connection refused",
            )),
            Reply::Hang => std::future::pending().await,
            Reply::After(delay, value) => {
                tokio::time::sleep(delay).await;
                Ok(RawResponse::new(200, value.to_string()))
            }
        }
    }
}

// ── Payloads ────────────────────────────────────────────────────────

/// A device-data response stamped "now".
pub fn values(values: Value) -> Value {
    json!({
        "Data": {
            "LogDateTimeUtc": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            "Values": values
        },
        "Error": null
    })
}

pub fn invalid_endpoint() -> Value {
    json!({ "Data": null, "Error": "invalid endpoint" })
}

pub fn invalid_endpoint_object() -> Value {
    json!({ "Data": null, "Error": { "Message": "Invalid endpoint" } })
}

pub fn organizations(orgs: Value) -> Value {
    json!({ "Data": { "Organizations": orgs }, "Error": null })
}

pub fn devices(devices: Value) -> Value {
    json!({ "Data": { "Devices": devices }, "Error": null })
}

// ── Controller setup ────────────────────────────────────────────────

pub fn config(base_org: Option<u64>) -> ControllerConfig {
    let mut config = ControllerConfig::new(
        Url::parse("https://platform.test/api/v2").unwrap(),
        SecretString::from("test-key"),
    );
    config.organization_id = base_org.map(OrganizationId);
    config.retry = RetryConfig::disabled();
    config
}

pub fn device(id: i64) -> DeviceId {
    DeviceId::new(id).unwrap()
}

/// Fixed ownership table.
#[derive(Debug, Default)]
pub struct StaticDirectory(pub HashMap<DeviceId, (OrganizationId, DeviceClass)>);

impl StaticDirectory {
    pub fn with(mut self, id: i64, org: u64, class: DeviceClass) -> Self {
        self.0.insert(device(id), (OrganizationId(org), class));
        self
    }
}

impl DeviceDirectory for StaticDirectory {
    fn owner_of(&self, device: DeviceId) -> Option<OrganizationId> {
        self.0.get(&device).map(|(org, _)| *org)
    }

    fn class_of(&self, device: DeviceId) -> Option<DeviceClass> {
        self.0.get(&device).map(|(_, class)| class.clone())
    }
}

/// A controller over `transport` using a fixed directory. The returned
/// cache is the one the controller writes to.
pub fn controller(
    transport: FakeTransport,
    directory: StaticDirectory,
) -> (Controller<FakeTransport>, Arc<CapabilityCache>) {
    let cache = Arc::new(CapabilityCache::new());
    let store: Arc<dyn CapabilityStore> = cache.clone();
    let controller = Controller::with_components(
        config(Some(1)),
        transport,
        store,
        Some(Arc::new(directory)),
    );
    (controller, cache)
}
