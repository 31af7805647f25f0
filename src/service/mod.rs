//! Status checkers.
//!
//! A [`Service`] is polled for its [`Status`]. Single-instance services exist
//! at most once per type; [`MultiInstance`] services are created once per
//! alias and read their configuration from an alias-suffixed namespace.

use crate::{
    config::{ConfigError, ConfigSource},
    Status,
};
use async_trait::async_trait;
use std::{fmt::Debug, str::FromStr, sync::Arc};

mod simple_request;
mod statuspage;

pub use simple_request::SimpleRequest;
pub use statuspage::{Cloudflare, GitHub, StatusPage};

/// A watched third-party service.
#[async_trait]
pub trait Service: Send + Sync + Debug {
    /// Stable identifier, also the key in the service map.
    fn id(&self) -> &str;

    /// Display name. `None` means the service is not configured.
    fn name(&self) -> Option<String>;

    fn status_url(&self) -> Option<String>;

    fn icon_url(&self) -> Option<String> {
        None
    }

    /// Checks the service. Failures are reported as a bad status, never as an error.
    async fn get_status(&self) -> Status;
}

/// A service constructed without arguments, keyed by its type name.
pub trait SingleInstance: Service + Sized + 'static {
    const TYPE_NAME: &'static str;

    fn new(ctx: &ServiceContext) -> Self;
}

/// A service that may be configured several times under distinct aliases.
pub trait MultiInstance: Service + Sized + 'static {
    const TYPE_NAME: &'static str;
    /// Namespaces this type's configuration keys, e.g. `SR` for `SR_URL_<ALIAS>`.
    const PREFIX: &'static str;

    fn new(config: AliasConfig, ctx: &ServiceContext) -> Self;
}

/// Everything a service needs at construction time.
#[derive(Debug, Clone)]
pub struct ServiceContext {
    pub config: Arc<ConfigSource>,
    pub client: reqwest::Client,
}

impl ServiceContext {
    pub fn new(config: Arc<ConfigSource>, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

/// The configuration namespace of one multi-instance service.
#[derive(Debug, Clone)]
pub struct AliasConfig {
    prefix: &'static str,
    alias: String,
    config: Arc<ConfigSource>,
}

impl AliasConfig {
    pub fn new(prefix: &'static str, alias: impl Into<String>, config: Arc<ConfigSource>) -> Self {
        Self {
            prefix,
            alias: alias.into(),
            config,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    /// The configuration key `option` resolves to for this alias.
    pub fn key(&self, option: &str) -> String {
        format!("{option}_{}", self.alias.to_uppercase())
    }

    pub fn get(&self, option: &str) -> Option<String> {
        self.config.get(&self.key(option)).map(str::to_string)
    }

    pub fn get_or(&self, option: &str, default: &str) -> String {
        self.get(option).unwrap_or_else(|| default.to_string())
    }

    /// Reads `option` and converts it. Unset options yield `Ok(None)`.
    pub fn parse<T>(&self, option: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.config.parse(&self.key(option))
    }

    fn prefixed(&self, option: &str) -> Option<String> {
        self.get(&format!("{}_{option}", self.prefix))
    }

    pub fn name(&self) -> Option<String> {
        self.prefixed("SERVICE_NAME")
    }

    pub fn status_url(&self) -> Option<String> {
        self.prefixed("URL")
    }

    pub fn icon_url(&self) -> Option<String> {
        self.prefixed("ICON")
    }
}
