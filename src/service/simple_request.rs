use super::{AliasConfig, MultiInstance, Service, ServiceContext};
use crate::Status;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Checks that a URL answers with a success status code.
///
/// Configured per alias with `SR_SERVICE_NAME_<ALIAS>`, `SR_URL_<ALIAS>` and
/// `SR_ICON_<ALIAS>`.
#[derive(Debug)]
pub struct SimpleRequest {
    config: AliasConfig,
    client: reqwest::Client,
}

impl MultiInstance for SimpleRequest {
    const TYPE_NAME: &'static str = "SimpleRequest";
    const PREFIX: &'static str = "SR";

    fn new(config: AliasConfig, ctx: &ServiceContext) -> Self {
        Self {
            config,
            client: ctx.client.clone(),
        }
    }
}

impl SimpleRequest {
    async fn check_http(&self, url: &str) -> Result<bool, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        debug!("{} answered {}", url, response.status());
        Ok(response.status().is_success())
    }
}

#[async_trait]
impl Service for SimpleRequest {
    fn id(&self) -> &str {
        self.config.alias()
    }

    fn name(&self) -> Option<String> {
        self.config.name()
    }

    fn status_url(&self) -> Option<String> {
        self.config.status_url()
    }

    fn icon_url(&self) -> Option<String> {
        self.config.icon_url()
    }

    async fn get_status(&self) -> Status {
        let Some(url) = self.status_url() else {
            warn!(
                "No {} configured for {}",
                self.config.key(&format!("{}_URL", Self::PREFIX)),
                self.id()
            );
            return Status::Critical;
        };
        match self.check_http(&url).await {
            Ok(true) => Status::Ok,
            Ok(false) => Status::Critical,
            Err(e) => {
                warn!("Request to {} failed: {}", url, e);
                Status::Critical
            }
        }
    }
}
