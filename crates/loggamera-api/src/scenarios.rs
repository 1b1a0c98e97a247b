// Scenario endpoints
//
// Scenarios are organization-level automations. Listing is not available
// on every account, so an unsupported endpoint yields an empty list.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::{ApiRequest, LoggameraClient, Outcome};
use crate::endpoint::Endpoint;
use crate::error::Error;
use crate::models::{OrganizationId, Scenario, ScenariosData, parse_data};
use crate::transport::Transport;

impl<T: Transport> LoggameraClient<T> {
    /// List scenarios of an organization.
    ///
    /// `POST /Scenarios` with `{"OrganizationId": id}`
    pub async fn scenarios(
        &self,
        organization: OrganizationId,
        cancel: &CancellationToken,
    ) -> Result<Vec<Scenario>, Error> {
        debug!(%organization, "listing scenarios");
        let request = ApiRequest::new(Endpoint::Scenarios).scoped(Some(organization));
        match self.call(request, cancel).await? {
            Outcome::Success(payload) => {
                let data: ScenariosData = parse_data(Endpoint::Scenarios, &payload)?;
                Ok(data.scenarios)
            }
            Outcome::Unsupported { message } => {
                warn!(%organization, reason = %message, "scenarios not available");
                Ok(Vec::new())
            }
        }
    }

    /// Trigger a scenario. The platform acknowledges without waiting for it
    /// to finish.
    ///
    /// `POST /ExecuteScenarioAsync` with `{"ScenarioId": id, "DurationMinutes"?: n}`
    pub async fn execute_scenario(
        &self,
        scenario_id: u64,
        duration_minutes: Option<u32>,
        scope: Option<OrganizationId>,
        cancel: &CancellationToken,
    ) -> Result<Outcome<()>, Error> {
        debug!(scenario_id, ?duration_minutes, "executing scenario");
        let mut request = ApiRequest::new(Endpoint::ExecuteScenarioAsync)
            .with("ScenarioId", scenario_id)
            .scoped(scope);
        if let Some(minutes) = duration_minutes {
            request = request.with("DurationMinutes", minutes);
        }
        Ok(self.call(request, cancel).await?.map(|_| ()))
    }
}
