//! Services hosted on Statuspage, which all expose `/api/v2/status.json`.

use super::{Service, ServiceContext, SingleInstance};
use crate::Status;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

#[derive(Deserialize, Debug)]
struct Summary {
    status: Indicator,
}

#[derive(Deserialize, Debug)]
struct Indicator {
    indicator: String,
}

fn indicator_status(indicator: &str) -> Option<Status> {
    match indicator {
        "none" => Some(Status::Ok),
        "maintenance" => Some(Status::Maintenance),
        "minor" => Some(Status::Minor),
        "major" => Some(Status::Major),
        "critical" => Some(Status::Critical),
        _ => None,
    }
}

/// A page on a Statuspage instance.
#[derive(Debug, Clone)]
pub struct StatusPage {
    name: &'static str,
    page_url: String,
    client: reqwest::Client,
}

impl StatusPage {
    pub fn new(name: &'static str, page_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            name,
            page_url: page_url.into(),
            client,
        }
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    async fn fetch(&self) -> Result<Summary, reqwest::Error> {
        let url = format!("{}/api/v2/status.json", self.page_url.trim_end_matches('/'));
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn get_status(&self) -> Status {
        match self.fetch().await {
            Ok(summary) => indicator_status(&summary.status.indicator).unwrap_or_else(|| {
                warn!(
                    "{} reported unknown indicator \"{}\"",
                    self.name, summary.status.indicator
                );
                Status::Critical
            }),
            Err(e) => {
                warn!("Could not fetch {} status: {}", self.name, e);
                Status::Critical
            }
        }
    }
}

macro_rules! statuspage_service {
    ($ty:ident, $name:literal, $url:literal, $icon:literal) => {
        #[derive(Debug)]
        pub struct $ty {
            page: StatusPage,
        }

        impl SingleInstance for $ty {
            const TYPE_NAME: &'static str = stringify!($ty);

            fn new(ctx: &ServiceContext) -> Self {
                Self {
                    page: StatusPage::new($name, $url, ctx.client.clone()),
                }
            }
        }

        #[async_trait]
        impl Service for $ty {
            fn id(&self) -> &str {
                Self::TYPE_NAME
            }

            fn name(&self) -> Option<String> {
                Some($name.to_string())
            }

            fn status_url(&self) -> Option<String> {
                Some(self.page.page_url().to_string())
            }

            fn icon_url(&self) -> Option<String> {
                Some($icon.to_string())
            }

            async fn get_status(&self) -> Status {
                self.page.get_status().await
            }
        }
    };
}

statuspage_service!(
    GitHub,
    "GitHub",
    "https://www.githubstatus.com",
    "/images/icons/github.png"
);
statuspage_service!(
    Cloudflare,
    "Cloudflare",
    "https://www.cloudflarestatus.com",
    "/images/icons/cloudflare.png"
);
