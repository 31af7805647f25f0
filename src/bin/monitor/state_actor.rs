use isup::{Service, ServiceMap, Status, TimedStatus};
use serde::Serialize;
use std::{collections::BTreeMap, fmt::Display, sync::Arc};
use tokio::sync::{mpsc, oneshot};

struct TrackedService {
    service: Arc<dyn Service>,
    last: Option<TimedStatus>,
}

/// What the API shows for one service.
#[derive(Serialize, Debug, Clone)]
pub struct ServiceView {
    pub id: String,
    pub name: Option<String>,
    pub status_url: Option<String>,
    pub icon_url: Option<String>,
    pub status: Option<TimedStatus>,
}

impl TrackedService {
    fn view(&self) -> ServiceView {
        ServiceView {
            id: self.service.id().to_string(),
            name: self.service.name(),
            status_url: self.service.status_url(),
            icon_url: self.service.icon_url(),
            status: self.last.clone(),
        }
    }
}

enum Message {
    Record {
        id: String,
        status: TimedStatus,
        respond_to: oneshot::Sender<Result<Option<Status>, ServiceNotFoundError>>,
    },
    Get {
        id: String,
        respond_to: oneshot::Sender<Result<ServiceView, ServiceNotFoundError>>,
    },
    List {
        respond_to: oneshot::Sender<Vec<ServiceView>>,
    },
}

struct StateActor {
    receiver: mpsc::UnboundedReceiver<Message>,
    services: BTreeMap<String, TrackedService>,
}

impl StateActor {
    fn new(receiver: mpsc::UnboundedReceiver<Message>, services: ServiceMap) -> Self {
        let services = services
            .into_iter()
            .map(|(id, service)| (id, TrackedService { service, last: None }))
            .collect();
        Self { receiver, services }
    }

    fn handle_message(&mut self, msg: Message) {
        // Errors when sending happen if the requester stopped waiting. We can safely ignore these.
        match msg {
            Message::Record {
                id,
                status,
                respond_to,
            } => {
                let result = match self.services.get_mut(&id) {
                    Some(tracked) => Ok(tracked.last.replace(status).map(|last| last.inner)),
                    None => Err(ServiceNotFoundError),
                };
                let _ = respond_to.send(result);
            }
            Message::Get { id, respond_to } => {
                let result = self
                    .services
                    .get(&id)
                    .map(TrackedService::view)
                    .ok_or(ServiceNotFoundError);
                let _ = respond_to.send(result);
            }
            Message::List { respond_to } => {
                let _ = respond_to.send(self.services.values().map(TrackedService::view).collect());
            }
        }
    }

    async fn run(&mut self) {
        while let Some(msg) = self.receiver.recv().await {
            self.handle_message(msg);
        }
    }
}

#[derive(Clone)]
pub struct StateActorHandle {
    sender: mpsc::UnboundedSender<Message>,
}

impl StateActorHandle {
    pub fn new(services: ServiceMap) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut actor = StateActor::new(receiver, services);
        tokio::spawn(async move { actor.run().await });

        Self { sender }
    }

    /// Stores a new status and returns the one it replaces.
    pub async fn record(
        &self,
        id: String,
        status: TimedStatus,
    ) -> Result<Option<Status>, ServiceNotFoundError> {
        let (send, recv) = oneshot::channel();
        // If this send fails, so does the recv.await below.
        let _ = self.sender.send(Message::Record {
            id,
            status,
            respond_to: send,
        });
        recv.await.expect("Actor task has been killed")
    }

    pub async fn get(&self, id: String) -> Result<ServiceView, ServiceNotFoundError> {
        let (send, recv) = oneshot::channel();
        let _ = self.sender.send(Message::Get {
            id,
            respond_to: send,
        });
        recv.await.expect("Actor task has been killed")
    }

    pub async fn list(&self) -> Vec<ServiceView> {
        let (send, recv) = oneshot::channel();
        let _ = self.sender.send(Message::List { respond_to: send });
        recv.await.expect("Actor task has been killed")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceNotFoundError;

impl Display for ServiceNotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Service not found")
    }
}

impl std::error::Error for ServiceNotFoundError {}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct Fixed;

    #[async_trait]
    impl Service for Fixed {
        fn id(&self) -> &str {
            "fixed"
        }

        fn name(&self) -> Option<String> {
            Some("Fixed".to_string())
        }

        fn status_url(&self) -> Option<String> {
            None
        }

        async fn get_status(&self) -> Status {
            Status::Ok
        }
    }

    fn handle() -> StateActorHandle {
        let mut services = ServiceMap::new();
        services.insert("fixed".to_string(), Arc::new(Fixed) as Arc<dyn Service>);
        StateActorHandle::new(services)
    }

    #[tokio::test]
    async fn record_returns_previous_status() {
        let handle = handle();
        let first = handle
            .record("fixed".to_string(), TimedStatus::now(Status::Ok))
            .await;
        assert_eq!(first, Ok(None));

        let second = handle
            .record("fixed".to_string(), TimedStatus::now(Status::Major))
            .await;
        assert_eq!(second, Ok(Some(Status::Ok)));

        let view = handle.get("fixed".to_string()).await.unwrap();
        assert_eq!(view.status.map(|s| s.inner), Some(Status::Major));
        assert_eq!(view.name.as_deref(), Some("Fixed"));
    }

    #[tokio::test]
    async fn unknown_service_is_not_found() {
        let handle = handle();
        assert_eq!(
            handle.get("missing".to_string()).await.unwrap_err(),
            ServiceNotFoundError
        );
        assert_eq!(
            handle
                .record("missing".to_string(), TimedStatus::now(Status::Ok))
                .await,
            Err(ServiceNotFoundError)
        );
        assert_eq!(handle.list().await.len(), 1);
    }
}
