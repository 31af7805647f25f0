mod api_util;
mod poller;
mod state_actor;

use anyhow::Context;
use api_util::ApiError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use clap::Parser;
use isup::{
    notifier::{builtin_notifiers, load_notifiers},
    registry::{builtin_services, load_services},
    ConfigSource, ServiceContext, Settings,
};
use state_actor::{ServiceView, StateActorHandle};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::spawn;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            dotenv::from_path(path).with_context(|| format!("Couldn't read {}", path.display()))?
        }
        // A missing .env is fine, the environment may already be set.
        None => {
            dotenv::dotenv().ok();
        }
    }

    let config = Arc::new(ConfigSource::from_env());
    let settings = Settings::from_config(&config).context("Invalid configuration")?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(cli.timeout))
        .build()
        .context("Couldn't create HTTP client")?;

    let ctx = ServiceContext::new(config, client.clone());
    let services = load_services(&builtin_services(), settings.services.as_deref(), &ctx)
        .context("Couldn't load services")?;
    let notifiers = load_notifiers(&builtin_notifiers(), &settings, &client);

    let state_actor_handle = StateActorHandle::new(services.clone());

    info!("Polling {} services every {}s", services.len(), cli.interval);
    spawn(poller::run(
        services,
        notifiers,
        state_actor_handle.clone(),
        Duration::from_secs(cli.interval),
    ));

    let app = Router::new()
        .route("/services", get(get_services))
        .route("/services/:id", get(get_service))
        .layer(TraceLayer::new_for_http())
        .with_state(state_actor_handle);

    info!("Binding to {}", cli.address);
    let listener = tokio::net::TcpListener::bind(&cli.address)
        .await
        .context("Couldn't create TCP listener")?;
    info!("Starting API server");
    axum::serve(listener, app)
        .await
        .context("Couldn't start API server")?;
    Ok(())
}

async fn get_services(
    State(state_actor_handle): State<StateActorHandle>,
) -> (StatusCode, Json<Vec<ServiceView>>) {
    (StatusCode::OK, Json(state_actor_handle.list().await))
}

async fn get_service(
    State(state_actor_handle): State<StateActorHandle>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ServiceView>), ApiError> {
    let service = state_actor_handle.get(id).await?;
    Ok((StatusCode::OK, Json(service)))
}

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Listening address for the status API
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    address: String,
    /// Seconds between two polls of every service
    #[arg(short, long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,
    /// Timeout in seconds for each outbound HTTP request
    #[arg(short, long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,
    /// Load configuration from this file instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,
}
