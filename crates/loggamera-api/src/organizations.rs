// Organization and device inventory endpoints
//
// `Organizations` lists every organization the key can see (children
// included); `Devices` lists the devices owned by one organization.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::{ApiRequest, LoggameraClient, Outcome};
use crate::endpoint::Endpoint;
use crate::error::Error;
use crate::models::{
    Device, DevicesData, Organization, OrganizationId, OrganizationsData, parse_data,
};
use crate::transport::Transport;

impl<T: Transport> LoggameraClient<T> {
    /// List all organizations visible to the API key.
    ///
    /// `POST /Organizations`
    pub async fn organizations(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<Organization>, Error> {
        debug!("listing organizations");
        let outcome = self
            .call(ApiRequest::new(Endpoint::Organizations), cancel)
            .await?;
        let data: OrganizationsData = required(Endpoint::Organizations, outcome)?;
        Ok(data.organizations)
    }

    /// List devices owned by an organization.
    ///
    /// `POST /Devices` with `{"OrganizationId": id}`
    pub async fn devices(
        &self,
        organization: OrganizationId,
        cancel: &CancellationToken,
    ) -> Result<Vec<Device>, Error> {
        debug!(%organization, "listing devices");
        let request = ApiRequest::new(Endpoint::Devices).scoped(Some(organization));
        let outcome = self.call(request, cancel).await?;
        let data: DevicesData = required(Endpoint::Devices, outcome)?;
        Ok(data.devices)
    }
}

/// Inventory endpoints always exist; "unsupported" here is a contract breach.
fn required<D>(endpoint: Endpoint, outcome: Outcome) -> Result<D, Error>
where
    D: serde::de::DeserializeOwned + Default,
{
    match outcome {
        Outcome::Success(payload) => parse_data(endpoint, &payload),
        Outcome::Unsupported { message } => Err(Error::MalformedResponse {
            endpoint,
            message: format!("inventory endpoint reported unsupported: {message}"),
            body: String::new(),
        }),
    }
}
