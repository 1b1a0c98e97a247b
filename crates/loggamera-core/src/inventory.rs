// ── Device inventory ──
//
// Which devices exist, what class they are, and which organization owns
// them. The controller needs ownership to pick the organization scope for a
// device-data request.

use std::collections::BTreeMap;

use loggamera_api::{DeviceClass, DeviceId, LoggameraClient, OrganizationId, Transport};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::model::OrganizationTree;

/// Device ownership lookups.
pub trait DeviceDirectory: Send + Sync {
    /// The organization that owns `device`, if known.
    fn owner_of(&self, device: DeviceId) -> Option<OrganizationId>;

    fn class_of(&self, device: DeviceId) -> Option<DeviceClass>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryDevice {
    pub id: DeviceId,
    pub class: DeviceClass,
    pub title: Option<String>,
    pub organization: OrganizationId,
}

/// Snapshot of the organization tree and every device in it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Inventory {
    organizations: OrganizationTree,
    devices: BTreeMap<DeviceId, InventoryDevice>,
}

impl Inventory {
    /// Later entries for the same device id replace earlier ones.
    pub fn new(
        organizations: OrganizationTree,
        devices: impl IntoIterator<Item = InventoryDevice>,
    ) -> Self {
        Self {
            organizations,
            devices: devices.into_iter().map(|d| (d.id, d)).collect(),
        }
    }

    /// Fetch the organization tree, then the devices of every organization.
    ///
    /// A device listed under both a parent and a child organization is
    /// attributed to the child. When the key cannot list organizations,
    /// `fallback` (the key's own organization) is used alone.
    pub async fn load<T: Transport>(
        client: &LoggameraClient<T>,
        fallback: Option<OrganizationId>,
        cancel: &CancellationToken,
    ) -> Result<Self, CoreError> {
        let organizations = OrganizationTree::build(client.organizations(cancel).await?);

        let mut order = organizations.walk();
        if order.is_empty() {
            order.extend(fallback);
        }

        let mut devices = Vec::new();
        for org in order {
            let listed = client.devices(org, cancel).await?;
            debug!(organization = %org, count = listed.len(), "listed devices");
            devices.extend(listed.into_iter().map(|d| InventoryDevice {
                id: d.id,
                class: d.class,
                title: d.title,
                organization: org,
            }));
        }

        let inventory = Self::new(organizations, devices);
        info!(
            organizations = inventory.organizations.len(),
            devices = inventory.devices.len(),
            "inventory loaded"
        );
        Ok(inventory)
    }

    pub fn organizations(&self) -> &OrganizationTree {
        &self.organizations
    }

    pub fn device(&self, id: DeviceId) -> Option<&InventoryDevice> {
        self.devices.get(&id)
    }

    pub fn devices(&self) -> impl Iterator<Item = &InventoryDevice> {
        self.devices.values()
    }

    /// Devices owned by `org` (not its descendants).
    pub fn devices_of(&self, org: OrganizationId) -> impl Iterator<Item = &InventoryDevice> {
        self.devices.values().filter(move |d| d.organization == org)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl DeviceDirectory for Inventory {
    fn owner_of(&self, device: DeviceId) -> Option<OrganizationId> {
        self.device(device).map(|d| d.organization)
    }

    fn class_of(&self, device: DeviceId) -> Option<DeviceClass> {
        self.device(device).map(|d| d.class.clone())
    }
}
