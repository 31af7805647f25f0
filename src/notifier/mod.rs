//! Propagation of status changes to external systems.

use crate::{config::Settings, service::Service, Status};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};
use thiserror::Error;
use tracing::{debug, info, warn};

mod cachet;

pub use cachet::{Cachet, CachetStatus, IncidentPayload};

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The notifier is missing required settings.
    NotConfigured,
    /// The service has no counterpart in the external system.
    NoComponent,
    /// The change is not visible at the external system's resolution.
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Skipped(SkipReason),
}

#[async_trait]
pub trait Notifier: Send + Sync + Debug {
    fn type_name(&self) -> &str;

    /// Reports that `service` went from `old` to `new`. `None` is an unknown status.
    async fn notify(
        &self,
        service: &dyn Service,
        old: Option<Status>,
        new: Option<Status>,
    ) -> Result<Delivery, NotifierError>;
}

/// One entry of the notifier registration table.
#[derive(Clone, Copy)]
pub struct NotifierDescriptor {
    pub name: &'static str,
    pub build: fn(&Settings, &reqwest::Client) -> Arc<dyn Notifier>,
}

impl Debug for NotifierDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

pub fn builtin_notifiers() -> Vec<NotifierDescriptor> {
    vec![NotifierDescriptor {
        name: "Cachet",
        build: |settings: &Settings, client: &reqwest::Client| -> Arc<dyn Notifier> {
            Arc::new(Cachet::new(settings.cachet.clone(), client.clone()))
        },
    }]
}

/// Builds the notifiers named in `NOTIFIERS`, or all of them when it is unset.
pub fn load_notifiers(
    descriptors: &[NotifierDescriptor],
    settings: &Settings,
    client: &reqwest::Client,
) -> Vec<Arc<dyn Notifier>> {
    if let Some(names) = &settings.notifiers {
        for name in names {
            if !descriptors.iter().any(|d| d.name == name) {
                warn!("Unknown notifier \"{}\"", name);
            }
        }
    }

    let notifiers: Vec<_> = descriptors
        .iter()
        .filter(|d| {
            settings
                .notifiers
                .as_ref()
                .map_or(true, |names| names.iter().any(|name| name == d.name))
        })
        .map(|d| (d.build)(settings, client))
        .collect();
    info!("Loaded {} notifiers", notifiers.len());
    notifiers
}

/// Sends one transition to every notifier. Failures are logged, not retried.
pub async fn dispatch(
    notifiers: &[Arc<dyn Notifier>],
    service: &dyn Service,
    old: Option<Status>,
    new: Option<Status>,
) {
    for notifier in notifiers {
        match notifier.notify(service, old, new).await {
            Ok(delivery) => debug!(
                "{} notifier: {:?} for {}",
                notifier.type_name(),
                delivery,
                service.id()
            ),
            Err(e) => warn!(
                "{} notifier failed for {}: {}",
                notifier.type_name(),
                service.id(),
                e
            ),
        }
    }
}
