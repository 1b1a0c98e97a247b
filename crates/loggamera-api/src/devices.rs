// Device data and capability endpoints
//
// Dedicated class endpoints, `RawData` and `GenericDevice` all take a
// `DeviceId` and answer with the same `{ LogDateTimeUtc, Values }` shape.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::{ApiRequest, LoggameraClient, Outcome};
use crate::endpoint::Endpoint;
use crate::error::Error;
use crate::models::{CapabilitiesData, DeviceData, DeviceId, OrganizationId, parse_data};
use crate::transport::Transport;

impl<T: Transport> LoggameraClient<T> {
    /// Read current values from a device-data endpoint.
    ///
    /// `POST /{endpoint}` with `{"DeviceId": id}`. Returns
    /// [`Outcome::Unsupported`] when the endpoint does not exist for the
    /// device; the caller picks the next candidate.
    pub async fn device_data(
        &self,
        endpoint: Endpoint,
        device_id: DeviceId,
        scope: Option<OrganizationId>,
        cancel: &CancellationToken,
    ) -> Result<Outcome<DeviceData>, Error> {
        if !endpoint.is_device_data() {
            return Err(Error::InvalidInput {
                field: "endpoint",
                reason: format!("{endpoint} does not return device values"),
            });
        }
        debug!(%endpoint, %device_id, "reading device data");
        let request = ApiRequest::for_device(endpoint, device_id).scoped(scope);
        match self.call(request, cancel).await? {
            Outcome::Success(payload) => Ok(Outcome::Success(parse_data(endpoint, &payload)?)),
            Outcome::Unsupported { message } => Ok(Outcome::Unsupported { message }),
        }
    }

    /// Read and write capabilities of a device.
    ///
    /// `POST /GetCapabilities` with `{"DeviceId": id}`
    pub async fn capabilities(
        &self,
        device_id: DeviceId,
        scope: Option<OrganizationId>,
        cancel: &CancellationToken,
    ) -> Result<Outcome<CapabilitiesData>, Error> {
        debug!(%device_id, "reading capabilities");
        let request = ApiRequest::for_device(Endpoint::GetCapabilities, device_id).scoped(scope);
        match self.call(request, cancel).await? {
            Outcome::Success(payload) => Ok(Outcome::Success(parse_data(
                Endpoint::GetCapabilities,
                &payload,
            )?)),
            Outcome::Unsupported { message } => Ok(Outcome::Unsupported { message }),
        }
    }
}
