use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

pub mod config;
pub mod notifier;
pub mod registry;
pub mod service;

pub use config::{ConfigError, ConfigSource, ServiceSelector, Settings};
pub use notifier::{Delivery, Notifier, NotifierError};
pub use registry::{load_services, RegistryError, ServiceMap};
pub use service::{Service, ServiceContext};

/// The health of a watched service, from best to worst.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Maintenance,
    Minor,
    Major,
    Critical,
    Unavailable,
}

impl Status {
    pub const ALL: [Self; 6] = [
        Self::Ok,
        Self::Maintenance,
        Self::Minor,
        Self::Major,
        Self::Critical,
        Self::Unavailable,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Maintenance => "maintenance",
            Self::Minor => "minor",
            Self::Major => "major",
            Self::Critical => "critical",
            Self::Unavailable => "unavailable",
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown status \"{0}\"")]
pub struct UnknownStatusError(pub String);

impl FromStr for Status {
    type Err = UnknownStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatusError(s.to_string()))
    }
}

/// A `Status` together with the moment it was observed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TimedStatus {
    pub time: DateTime<Utc>,
    pub inner: Status,
}

impl TimedStatus {
    pub fn now(inner: Status) -> Self {
        Self {
            time: Utc::now(),
            inner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_names_round_trip_through_from_str() {
        for status in Status::ALL {
            assert_eq!(status.to_string().parse::<Status>(), Ok(status));
        }
        assert!("down".parse::<Status>().is_err());
    }

    #[test]
    fn severity_order_follows_declaration() {
        assert!(Status::Ok < Status::Maintenance);
        assert!(Status::Major < Status::Critical);
        assert_eq!(Status::ALL.iter().max(), Some(&Status::Unavailable));
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&Status::Maintenance).unwrap();
        assert_eq!(json, "\"maintenance\"");
    }
}
