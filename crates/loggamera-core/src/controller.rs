// ── Controller ──
//
// Facade for presentation layers. Composes the API client, capability
// store, cascade resolver, device inventory and gap tracker, and handles
// organization scoping so callers only pass device ids.

use std::sync::Arc;

use chrono::Utc;
use loggamera_api::models::Scenario;
use loggamera_api::{
    CircuitState, DeviceClass, DeviceId, Endpoint, HttpTransport, LoggameraClient, OrganizationId,
    Outcome, Transport,
};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::capability::{CapabilityCache, CapabilityEntry, CapabilityStore};
use crate::cascade::{CascadeResolver, Intent, Resolved};
use crate::config::ControllerConfig;
use crate::error::CoreError;
use crate::gaps::{DataGapTracker, DeviceGap, GapReport};
use crate::inventory::{DeviceDirectory, Inventory};
use crate::model::{CanonicalSensorValue, Capabilities, OrganizationTree};
use crate::normalize::SensorNormalizer;
use crate::scope::RequestContext;

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Clones share the capability
/// store, circuit breakers, inventory and gap tracker.
pub struct Controller<T = HttpTransport> {
    inner: Arc<ControllerInner<T>>,
}

struct ControllerInner<T> {
    config: ControllerConfig,
    resolver: CascadeResolver<T>,
    /// External ownership source; the loaded inventory is used when absent.
    directory: Option<Arc<dyn DeviceDirectory>>,
    inventory: RwLock<Option<Arc<Inventory>>>,
    gaps: DataGapTracker,
    /// Parent of every request context's token.
    cancel: CancellationToken,
}

impl<T> Clone for Controller<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Controller<HttpTransport> {
    /// A controller over HTTPS.
    pub fn new(config: ControllerConfig) -> Result<Self, CoreError> {
        let transport = HttpTransport::new(config.base_url.clone(), &config.transport())?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> Controller<T> {
    /// A controller over any transport, with a fresh capability cache.
    pub fn with_transport(config: ControllerConfig, transport: T) -> Self {
        let store = Arc::new(CapabilityCache::with_unavailable_ttl(
            config.capability.unavailable_ttl,
        ));
        Self::with_components(config, transport, store, None)
    }

    /// Full control over the injected collaborators.
    pub fn with_components(
        config: ControllerConfig,
        transport: T,
        store: Arc<dyn CapabilityStore>,
        directory: Option<Arc<dyn DeviceDirectory>>,
    ) -> Self {
        let client = LoggameraClient::with_transport(
            transport,
            config.api_key.clone(),
            config.retry.clone(),
            config.circuit.clone(),
        );
        let normalizer = SensorNormalizer::new(config.normalizer.clone());
        Self {
            inner: Arc::new(ControllerInner {
                resolver: CascadeResolver::new(client, store, normalizer),
                directory,
                inventory: RwLock::new(None),
                gaps: DataGapTracker::new(),
                cancel: CancellationToken::new(),
                config,
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &LoggameraClient<T> {
        self.inner.resolver.client()
    }

    /// A new call chain: its own scope stack (based at the configured
    /// organization) and a child of the controller's cancellation token.
    pub fn context(&self) -> RequestContext {
        RequestContext::new(
            self.inner.config.organization_id,
            self.inner.cancel.child_token(),
        )
    }

    // ── Device values ────────────────────────────────────────────────

    /// Current canonical values of a device.
    pub async fn canonical_values(
        &self,
        device_id: DeviceId,
        class: &DeviceClass,
    ) -> Result<Vec<CanonicalSensorValue>, CoreError> {
        let ctx = self.context();
        Ok(self
            .read(&ctx, device_id, class, Intent::Readings)
            .await?
            .values)
    }

    /// Alarm flags, alarm texts and status indicators of a device.
    pub async fn alarm_status(
        &self,
        device_id: DeviceId,
        class: &DeviceClass,
    ) -> Result<Vec<CanonicalSensorValue>, CoreError> {
        let ctx = self.context();
        Ok(self
            .read(&ctx, device_id, class, Intent::AlarmStatus)
            .await?
            .values)
    }

    /// Resolve `intent` for a device inside `ctx`. The read runs under a
    /// child context scoped to the owning organization; `ctx` itself is
    /// never changed.
    pub async fn read(
        &self,
        ctx: &RequestContext,
        device_id: DeviceId,
        class: &DeviceClass,
        intent: Intent,
    ) -> Result<Resolved, CoreError> {
        let result = async {
            let path = self.scope_path(ctx, device_id).await?;
            let scoped = ctx.enter_path(path);
            self.inner
                .resolver
                .resolve(&scoped, class, device_id, intent)
                .await
        }
        .await;

        let now = Utc::now();
        match &result {
            Ok(resolved) => self.inner.gaps.record_success(device_id, resolved.source, now),
            Err(CoreError::Cancelled) => {}
            Err(e) => self.inner.gaps.record_failure(device_id, e.kind(), now),
        }
        result
    }

    /// Read and write capabilities of a known device. Empty when the
    /// platform has no capabilities endpoint for the device's class.
    pub async fn capabilities(&self, device_id: DeviceId) -> Result<Capabilities, CoreError> {
        let ctx = self.context();
        let class = self
            .class_of(&ctx, device_id)
            .await?
            .ok_or(CoreError::DeviceNotFound { device_id })?;
        let path = self.scope_path(&ctx, device_id).await?;
        let scoped = ctx.enter_path(path);
        self.inner
            .resolver
            .capabilities(&scoped, &class, device_id)
            .await
    }

    // ── Organizations and inventory ──────────────────────────────────

    pub async fn organization_hierarchy(&self) -> Result<OrganizationTree, CoreError> {
        let ctx = self.context();
        Ok(self.load_inventory(ctx.cancel()).await?.organizations().clone())
    }

    /// The device inventory, loaded on first use.
    pub async fn inventory(&self) -> Result<Arc<Inventory>, CoreError> {
        let ctx = self.context();
        self.load_inventory(ctx.cancel()).await
    }

    /// Reload organizations and devices.
    pub async fn refresh_inventory(&self) -> Result<Arc<Inventory>, CoreError> {
        let ctx = self.context();
        let mut slot = self.inner.inventory.write().await;
        let fresh = Arc::new(self.fetch_inventory(ctx.cancel()).await?);
        *slot = Some(Arc::clone(&fresh));
        Ok(fresh)
    }

    async fn load_inventory(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Arc<Inventory>, CoreError> {
        if let Some(inventory) = self.inner.inventory.read().await.as_ref() {
            return Ok(Arc::clone(inventory));
        }
        let mut slot = self.inner.inventory.write().await;
        if let Some(inventory) = slot.as_ref() {
            return Ok(Arc::clone(inventory));
        }
        let loaded = Arc::new(self.fetch_inventory(cancel).await?);
        *slot = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    async fn fetch_inventory(&self, cancel: &CancellationToken) -> Result<Inventory, CoreError> {
        Inventory::load(self.client(), self.inner.config.organization_id, cancel).await
    }

    async fn owner_of(
        &self,
        ctx: &RequestContext,
        device_id: DeviceId,
    ) -> Result<Option<OrganizationId>, CoreError> {
        if let Some(directory) = &self.inner.directory {
            return Ok(directory.owner_of(device_id));
        }
        Ok(self.load_inventory(ctx.cancel()).await?.owner_of(device_id))
    }

    async fn class_of(
        &self,
        ctx: &RequestContext,
        device_id: DeviceId,
    ) -> Result<Option<DeviceClass>, CoreError> {
        if let Some(directory) = &self.inner.directory {
            return Ok(directory.class_of(device_id));
        }
        Ok(self.load_inventory(ctx.cancel()).await?.class_of(device_id))
    }

    /// Organizations to push so requests for `device_id` run in its owner's
    /// scope: the owner's ancestry below the configured organization.
    async fn scope_path(
        &self,
        ctx: &RequestContext,
        device_id: DeviceId,
    ) -> Result<Vec<OrganizationId>, CoreError> {
        let owner = self
            .owner_of(ctx, device_id)
            .await?
            .ok_or(CoreError::DeviceNotFound { device_id })?;
        let base = self.inner.config.organization_id;
        if Some(owner) == ctx.organization() || Some(owner) == base {
            return Ok(Vec::new());
        }

        let tree_path = self
            .inner
            .inventory
            .read()
            .await
            .as_ref()
            .and_then(|inventory| inventory.organizations().path_to(owner));
        let path = tree_path.unwrap_or_else(|| vec![owner]);
        let start = base
            .and_then(|b| path.iter().position(|&id| id == b))
            .map_or(0, |i| i + 1);
        let path = path.get(start..).map(<[_]>::to_vec).unwrap_or_default();
        debug!(
            %device_id,
            organization = %owner,
            depth = path.len(),
            "switching organization scope"
        );
        Ok(path)
    }

    // ── Scenarios ────────────────────────────────────────────────────

    /// Scenarios of `organization` (default: the configured organization).
    /// Empty when the account has no scenario support.
    pub async fn scenarios(
        &self,
        organization: Option<OrganizationId>,
    ) -> Result<Vec<Scenario>, CoreError> {
        let org = self.organization_or_default(organization)?;
        let ctx = self.context();
        Ok(self.client().scenarios(org, ctx.cancel()).await?)
    }

    /// Trigger a scenario, optionally for a limited number of minutes.
    pub async fn execute_scenario(
        &self,
        scenario_id: u64,
        duration_minutes: Option<u32>,
        organization: Option<OrganizationId>,
    ) -> Result<(), CoreError> {
        let org = organization.or(self.inner.config.organization_id);
        let ctx = self.context();
        match self
            .client()
            .execute_scenario(scenario_id, duration_minutes, org, ctx.cancel())
            .await?
        {
            Outcome::Success(()) => {
                info!(scenario_id, ?duration_minutes, "scenario started");
                Ok(())
            }
            Outcome::Unsupported { message } => Err(CoreError::Rejected {
                endpoint: Endpoint::ExecuteScenarioAsync,
                message,
                status: None,
            }),
        }
    }

    fn organization_or_default(
        &self,
        organization: Option<OrganizationId>,
    ) -> Result<OrganizationId, CoreError> {
        organization
            .or(self.inner.config.organization_id)
            .ok_or_else(|| CoreError::InvalidInput {
                message: "an organization id is required".into(),
            })
    }

    // ── Diagnostics ──────────────────────────────────────────────────

    pub fn capability_snapshot(&self) -> Vec<CapabilityEntry> {
        self.inner.resolver.store().snapshot()
    }

    /// Forget every capability record so all endpoints are probed again.
    pub fn revalidate_capabilities(&self) {
        info!("capability cache cleared");
        self.inner.resolver.store().clear();
    }

    pub fn circuit_state(&self, endpoint: Endpoint) -> CircuitState {
        self.client().circuit_state(endpoint)
    }

    pub fn gap_report(&self) -> GapReport {
        self.inner.gaps.report(Utc::now())
    }

    pub fn device_gap(&self, device_id: DeviceId) -> Option<DeviceGap> {
        self.inner.gaps.device(device_id)
    }

    /// Cancel every in-flight and future request of this controller.
    pub fn shutdown(&self) {
        debug!("controller shutdown requested");
        self.inner.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }
}
