use crate::state_actor::StateActorHandle;
use futures::future::join_all;
use isup::{notifier, Notifier, ServiceMap, TimedStatus};
use std::{sync::Arc, time::Duration};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Checks every service, records the results and reports changes.
pub async fn poll_once(
    services: &ServiceMap,
    notifiers: &[Arc<dyn Notifier>],
    state: &StateActorHandle,
) {
    let checks = services.iter().map(|(id, service)| async move {
        let status = service.get_status().await;
        (id, service, status)
    });

    for (id, service, status) in join_all(checks).await {
        debug!("{} is {}", id, status);
        let previous = match state.record(id.clone(), TimedStatus::now(status)).await {
            Ok(previous) => previous,
            Err(e) => {
                warn!("Could not record status of {}: {}", id, e);
                continue;
            }
        };
        // The first observation only establishes a baseline.
        if let Some(previous) = previous.filter(|previous| *previous != status) {
            info!("{} changed from {} to {}", id, previous, status);
            notifier::dispatch(notifiers, service.as_ref(), Some(previous), Some(status)).await;
        }
    }
}

pub async fn run(
    services: ServiceMap,
    notifiers: Vec<Arc<dyn Notifier>>,
    state: StateActorHandle,
    period: Duration,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        poll_once(&services, &notifiers, &state).await;
    }
}
