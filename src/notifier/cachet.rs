//! Opens incidents on a Cachet status page when a service's status changes.

use super::{Delivery, Notifier, NotifierError, SkipReason};
use crate::{config::CachetSettings, service::Service, Status};
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

const INCIDENT_NAME: &str = "Status changed";
const TOKEN_HEADER: &str = "X-Cachet-Token";

/// Cachet's component status scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachetStatus {
    Ok = 1,
    Minor = 2,
    Major = 3,
    Critical = 4,
}

impl CachetStatus {
    /// Unknown statuses count as critical.
    pub fn from_status(status: Option<Status>) -> Self {
        match status {
            Some(Status::Ok) => Self::Ok,
            Some(Status::Maintenance | Status::Minor) => Self::Minor,
            Some(Status::Major) => Self::Major,
            Some(Status::Critical | Status::Unavailable) | None => Self::Critical,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Minor => "Minor",
            Self::Major => "Major",
            Self::Critical => "Critical",
        }
    }

    /// Cachet incident status: 4 is "Fixed", 1 is "Investigating".
    pub fn incident_status(self) -> u8 {
        match self {
            Self::Ok => 4,
            _ => 1,
        }
    }

    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

/// Body of `POST /api/v1/incidents`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct IncidentPayload {
    pub name: String,
    pub message: String,
    pub status: u8,
    pub visible: u8,
    pub component_id: u64,
    pub component_status: u8,
    pub notify: bool,
}

#[derive(Debug, Clone)]
pub struct Cachet {
    settings: CachetSettings,
    client: reqwest::Client,
}

impl Cachet {
    pub fn new(settings: CachetSettings, client: reqwest::Client) -> Self {
        Self { settings, client }
    }

    fn component_id(&self, service: &dyn Service) -> Option<u64> {
        self.settings.components.get(service.id()).copied()
    }

    pub fn incidents_url(base_url: &str) -> String {
        format!("{}/api/v1/incidents", base_url.trim_end_matches('/'))
    }

    pub fn build_payload(
        service: &dyn Service,
        component_id: u64,
        old: CachetStatus,
        new: CachetStatus,
    ) -> IncidentPayload {
        let name = service.name().unwrap_or_else(|| service.id().to_string());
        IncidentPayload {
            name: INCIDENT_NAME.to_string(),
            message: format!(
                "Service **{}** changed from *{}* to *{}*",
                name,
                old.display_name(),
                new.display_name()
            ),
            status: new.incident_status(),
            visible: 1,
            component_id,
            component_status: new.ordinal(),
            notify: true,
        }
    }
}

#[async_trait]
impl Notifier for Cachet {
    fn type_name(&self) -> &str {
        "Cachet"
    }

    async fn notify(
        &self,
        service: &dyn Service,
        old: Option<Status>,
        new: Option<Status>,
    ) -> Result<Delivery, NotifierError> {
        let old = CachetStatus::from_status(old);
        let new = CachetStatus::from_status(new);

        let (Some(base_url), Some(token)) = (&self.settings.url, &self.settings.token) else {
            return Ok(Delivery::Skipped(SkipReason::NotConfigured));
        };
        if self.settings.components.is_empty() {
            return Ok(Delivery::Skipped(SkipReason::NotConfigured));
        }
        let Some(component_id) = self.component_id(service) else {
            return Ok(Delivery::Skipped(SkipReason::NoComponent));
        };
        if old == new {
            return Ok(Delivery::Skipped(SkipReason::Unchanged));
        }

        let url = Self::incidents_url(base_url);
        let payload = Self::build_payload(service, component_id, old, new);
        info!("Notifying {} with {:?}", url, payload);
        self.client
            .post(&url)
            .header(TOKEN_HEADER, token)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(Delivery::Sent)
    }
}
