use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use snafu::ResultExt;

use crate::{
    models::{candidate::AppointmentCandidate, location::LocationId},
    providers::{
        ClientBuildSnafu, RejectedSnafu, ScheduleSource, SourceError, StatusSnafu, TransportSnafu,
        ttp_rest::response::parse_slots,
    },
};

/// Slots endpoint; `{location_id}` is substituted per request.
pub const DEFAULT_URL_TEMPLATE: &str = "https://ttp.cbp.dhs.gov/schedulerapi/slots?orderBy=soonest&limit=500&locationId={location_id}&minimum=1";

/// Per-request timeout. A request exceeding it is a transport failure.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const LOCATION_PLACEHOLDER: &str = "{location_id}";

pub struct TtpRestSource {
    client: Client,
    url_template: String,
}

impl TtpRestSource {
    /// Creates a source against the public scheduler API.
    pub fn new() -> Result<Self, SourceError> {
        Self::with_url_template(DEFAULT_URL_TEMPLATE)
    }

    /// Creates a source against a custom endpoint. The template should contain
    /// `{location_id}`; a template without it is requested verbatim.
    pub fn with_url_template(template: impl Into<String>) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("appointment-watch/", env!("CARGO_PKG_VERSION")))
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            url_template: template.into(),
        })
    }

    /// The concrete URL requested for `location_id`.
    pub fn url_for(&self, location_id: LocationId) -> String {
        self.url_template
            .replace(LOCATION_PLACEHOLDER, &location_id.to_string())
    }
}

#[async_trait]
impl ScheduleSource for TtpRestSource {
    async fn fetch_slots(
        &self,
        location_id: LocationId,
    ) -> Result<Vec<AppointmentCandidate>, SourceError> {
        let url = self.url_for(location_id);
        let response = self.client.get(&url).send().await.context(TransportSnafu)?;

        let status = response.status();
        if status.is_client_error() {
            return RejectedSnafu {
                status: status.as_u16(),
            }
            .fail();
        }
        if !status.is_success() {
            return StatusSnafu {
                status: status.as_u16(),
            }
            .fail();
        }

        let body = response.text().await.context(TransportSnafu)?;
        let slots = parse_slots(location_id, &body)?;
        tracing::debug!(%location_id, count = slots.len(), "total appointments");
        Ok(slots)
    }
}
