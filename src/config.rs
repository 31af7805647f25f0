//! Startup configuration.
//!
//! Everything is read once from a [`ConfigSource`] snapshot and validated into
//! [`Settings`]. Multi-instance services read their own keys straight from the
//! snapshot through [`crate::service::AliasConfig`].

use std::{collections::BTreeMap, ffi::OsString};
use thiserror::Error;
use tracing::debug;

pub const SERVICES: &str = "SERVICES";
pub const NOTIFIERS: &str = "NOTIFIERS";
pub const CACHET_URL: &str = "CACHET_URL";
pub const CACHET_TOKEN: &str = "CACHET_TOKEN";
pub const CACHET_COMPONENTS: &str = "CACHET_COMPONENTS";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Service selector \"{0}\" has an empty alias")]
    EmptyAlias(String),
    #[error("Malformed CACHET_COMPONENTS entry \"{0}\", expected `service_id:component_id`")]
    MalformedComponent(String),
    #[error("Invalid value \"{value}\" for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Read-only key/value snapshot of the process configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    values: BTreeMap<String, String>,
}

impl ConfigSource {
    /// Snapshots the current process environment.
    pub fn from_env() -> Self {
        Self::from_os_pairs(std::env::vars_os())
    }

    /// Builds a snapshot from raw OS pairs, skipping entries that are not UTF-8.
    pub fn from_os_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let values: BTreeMap<_, _> = pairs
            .into_iter()
            .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => Some((key, value)),
                (Ok(key), Err(_)) => {
                    debug!("Skipping {}: value is not UTF-8", key);
                    None
                }
                (Err(key), _) => {
                    debug!("Skipping non UTF-8 variable {:?}", key);
                    None
                }
            })
            .collect();
        debug!("Loaded {} configuration values", values.len());
        Self { values }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the value for `key`. Blank values count as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Reads `key` and converts it with `FromStr`. Unset keys yield `Ok(None)`.
    pub fn parse<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|value| {
                value.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    fn list(&self, key: &str) -> Option<Vec<&str>> {
        // SERVICES= (set but empty) is an empty allow-list, not an absent one.
        self.values.get(key).map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .collect()
        })
    }
}

/// One entry of the `SERVICES` allow-list: `TypeName` or `TypeName:Alias`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSelector {
    pub type_name: String,
    pub alias: Option<String>,
}

impl ServiceSelector {
    /// Splits on colons. Only the second segment becomes the alias; anything
    /// after a second colon is dropped.
    pub fn parse(token: &str) -> Result<Self, ConfigError> {
        let mut segments = token.split(':');
        let type_name = segments.next().unwrap_or_default().trim().to_string();
        let alias = match segments.next().map(str::trim) {
            Some("") => return Err(ConfigError::EmptyAlias(token.to_string())),
            Some(alias) => Some(alias.to_string()),
            None => None,
        };
        Ok(Self { type_name, alias })
    }
}

#[derive(Debug, Clone, Default)]
pub struct CachetSettings {
    pub url: Option<String>,
    pub token: Option<String>,
    /// Service id to Cachet component id.
    pub components: BTreeMap<String, u64>,
}

impl CachetSettings {
    fn from_config(config: &ConfigSource) -> Result<Self, ConfigError> {
        Ok(Self {
            url: config.get(CACHET_URL).map(str::to_string),
            token: config.get(CACHET_TOKEN).map(str::to_string),
            components: config
                .get(CACHET_COMPONENTS)
                .map(parse_components)
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

/// Parses `Docker:1,GitHub:4` into a component map.
pub fn parse_components(raw: &str) -> Result<BTreeMap<String, u64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let malformed = || ConfigError::MalformedComponent(entry.to_string());
            let sides: Vec<&str> = entry.split(':').map(str::trim).collect();
            match sides.as_slice() {
                [service, component] if !service.is_empty() => component
                    .parse()
                    .map(|id| (service.to_string(), id))
                    .map_err(|_| malformed()),
                _ => Err(malformed()),
            }
        })
        .collect()
}

/// Typed view of the configuration, validated once at startup.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// `None` when `SERVICES` is unset.
    pub services: Option<Vec<ServiceSelector>>,
    /// `None` when `NOTIFIERS` is unset.
    pub notifiers: Option<Vec<String>>,
    pub cachet: CachetSettings,
}

impl Settings {
    pub fn from_config(config: &ConfigSource) -> Result<Self, ConfigError> {
        let services = config
            .list(SERVICES)
            .map(|tokens| {
                tokens
                    .into_iter()
                    .map(ServiceSelector::parse)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;
        let notifiers = config
            .list(NOTIFIERS)
            .map(|tokens| tokens.into_iter().map(str::to_string).collect());

        Ok(Self {
            services,
            notifiers,
            cachet: CachetSettings::from_config(config)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_keeps_only_the_first_alias_segment() {
        let selector = ServiceSelector::parse("SimpleRequest:Blog:ignored:too").unwrap();
        assert_eq!(selector.type_name, "SimpleRequest");
        assert_eq!(selector.alias.as_deref(), Some("Blog"));

        let bare = ServiceSelector::parse("GitHub").unwrap();
        assert_eq!(bare.alias, None);
    }

    #[test]
    fn selector_rejects_empty_alias() {
        assert_eq!(
            ServiceSelector::parse("SimpleRequest:"),
            Err(ConfigError::EmptyAlias("SimpleRequest:".to_string()))
        );
    }

    #[test]
    fn services_unset_differs_from_services_empty() {
        let unset = Settings::from_config(&ConfigSource::default()).unwrap();
        assert!(unset.services.is_none());

        let empty = Settings::from_config(&ConfigSource::from_pairs([(SERVICES, "")])).unwrap();
        assert_eq!(empty.services, Some(vec![]));
    }

    #[test]
    fn services_tokens_are_trimmed() {
        let config = ConfigSource::from_pairs([(SERVICES, " GitHub , SimpleRequest:blog ,")]);
        let services = Settings::from_config(&config).unwrap().services.unwrap();
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].type_name, "GitHub");
        assert_eq!(services[1].alias.as_deref(), Some("blog"));
    }

    #[test]
    fn components_parse_into_map() {
        let components = parse_components("Docker:1, GitHub : 4").unwrap();
        assert_eq!(components.get("Docker"), Some(&1));
        assert_eq!(components.get("GitHub"), Some(&4));
    }

    #[test]
    fn malformed_components_fail_validation() {
        for raw in ["Docker", "Docker:1:2", "Docker:one", ":3"] {
            assert!(
                matches!(parse_components(raw), Err(ConfigError::MalformedComponent(_))),
                "{raw} should be rejected"
            );
        }

        let config = ConfigSource::from_pairs([(CACHET_COMPONENTS, "GitHub=4")]);
        assert!(Settings::from_config(&config).is_err());
    }

    #[test]
    fn blank_values_are_unset() {
        let config = ConfigSource::from_pairs([(CACHET_URL, "  "), (CACHET_TOKEN, "secret")]);
        assert_eq!(config.get(CACHET_URL), None);
        assert_eq!(config.get_or(CACHET_URL, "fallback"), "fallback");
        assert_eq!(config.get(CACHET_TOKEN), Some("secret"));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_environment_entries_are_skipped() {
        use std::os::unix::ffi::OsStringExt;

        let config = ConfigSource::from_os_pairs([
            (
                OsString::from("ISUP_TEST_BINARY"),
                OsString::from_vec(b"\xff\xfe".to_vec()),
            ),
            (OsString::from_vec(b"\xffKEY".to_vec()), OsString::from("value")),
            (OsString::from(CACHET_TOKEN), OsString::from("secret")),
        ]);
        assert_eq!(config.get("ISUP_TEST_BINARY"), None);
        assert_eq!(config.get(CACHET_TOKEN), Some("secret"));

        std::env::set_var("ISUP_TEST_BINARY_ENV", OsString::from_vec(b"\xff\xfe".to_vec()));
        std::env::set_var("ISUP_TEST_PLAIN_ENV", "plain");
        let config = ConfigSource::from_env();
        assert_eq!(config.get("ISUP_TEST_BINARY_ENV"), None);
        assert_eq!(config.get("ISUP_TEST_PLAIN_ENV"), Some("plain"));
    }

    #[test]
    fn parse_reports_invalid_values() {
        let config = ConfigSource::from_pairs([("PORT", "eighty")]);
        assert!(matches!(
            config.parse::<u16>("PORT"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(config.parse::<u16>("MISSING"), Ok(None));
    }
}
