use async_trait::async_trait;
use isup::{
    config::CachetSettings,
    notifier::{dispatch, Cachet, CachetStatus, SkipReason},
    Delivery, Notifier, Service, Status,
};
use serde_json::json;
use std::{collections::BTreeMap, sync::Arc};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug)]
struct Docker;

#[async_trait]
impl Service for Docker {
    fn id(&self) -> &str {
        "Docker"
    }

    fn name(&self) -> Option<String> {
        Some("Docker Hub".to_string())
    }

    fn status_url(&self) -> Option<String> {
        None
    }

    async fn get_status(&self) -> Status {
        Status::Ok
    }
}

fn settings(url: &str, components: &[(&str, u64)]) -> CachetSettings {
    CachetSettings {
        url: Some(url.to_string()),
        token: Some("secret-token".to_string()),
        components: components
            .iter()
            .map(|(id, component)| (id.to_string(), *component))
            .collect::<BTreeMap<_, _>>(),
    }
}

fn cachet(settings: CachetSettings) -> Cachet {
    Cachet::new(settings, reqwest::Client::new())
}

#[tokio::test]
async fn recovery_solves_an_incident() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/incidents"))
        .and(header("X-Cachet-Token", "secret-token"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({
            "name": "Status changed",
            "message": "Service **Docker Hub** changed from *Critical* to *OK*",
            "status": 4,
            "visible": 1,
            "component_id": 7,
            "component_status": 1,
            "notify": true,
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = cachet(settings(&format!("{}/", server.uri()), &[("Docker", 7)]));
    let delivery = notifier
        .notify(&Docker, Some(Status::Unavailable), Some(Status::Ok))
        .await
        .unwrap();
    assert_eq!(delivery, Delivery::Sent);
}

#[tokio::test]
async fn degradation_opens_an_investigation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/incidents"))
        .and(body_json(json!({
            "name": "Status changed",
            "message": "Service **Docker Hub** changed from *OK* to *Major*",
            "status": 1,
            "visible": 1,
            "component_id": 7,
            "component_status": 3,
            "notify": true,
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = cachet(settings(&server.uri(), &[("Docker", 7)]));
    let delivery = notifier
        .notify(&Docker, Some(Status::Ok), Some(Status::Major))
        .await
        .unwrap();
    assert_eq!(delivery, Delivery::Sent);
}

#[tokio::test]
async fn same_cachet_severity_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let notifier = cachet(settings(&server.uri(), &[("Docker", 7)]));
    let delivery = notifier
        .notify(&Docker, Some(Status::Minor), Some(Status::Maintenance))
        .await
        .unwrap();
    assert_eq!(delivery, Delivery::Skipped(SkipReason::Unchanged));
}

#[tokio::test]
async fn unmapped_service_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let notifier = cachet(settings(&server.uri(), &[("GitHub", 4)]));
    let delivery = notifier
        .notify(&Docker, Some(Status::Ok), Some(Status::Critical))
        .await
        .unwrap();
    assert_eq!(delivery, Delivery::Skipped(SkipReason::NoComponent));

    let notifier = cachet(settings(&server.uri(), &[]));
    let delivery = notifier
        .notify(&Docker, Some(Status::Ok), Some(Status::Critical))
        .await
        .unwrap();
    assert_eq!(delivery, Delivery::Skipped(SkipReason::NotConfigured));
}

#[tokio::test]
async fn missing_credentials_send_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut without_token = settings(&server.uri(), &[("Docker", 7)]);
    without_token.token = None;
    let delivery = cachet(without_token)
        .notify(&Docker, Some(Status::Ok), Some(Status::Critical))
        .await
        .unwrap();
    assert_eq!(delivery, Delivery::Skipped(SkipReason::NotConfigured));

    let delivery = cachet(CachetSettings::default())
        .notify(&Docker, Some(Status::Ok), Some(Status::Critical))
        .await
        .unwrap();
    assert_eq!(delivery, Delivery::Skipped(SkipReason::NotConfigured));
}

#[tokio::test]
async fn unknown_old_status_counts_as_critical() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let notifier = cachet(settings(&server.uri(), &[("Docker", 7)]));
    let delivery = notifier
        .notify(&Docker, None, Some(Status::Critical))
        .await
        .unwrap();
    assert_eq!(delivery, Delivery::Skipped(SkipReason::Unchanged));
}

#[tokio::test]
async fn api_failure_is_reported_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/incidents"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let notifier = cachet(settings(&server.uri(), &[("Docker", 7)]));
    let result = notifier
        .notify(&Docker, Some(Status::Ok), Some(Status::Critical))
        .await;
    assert!(result.is_err());

    // dispatch logs the failure and returns.
    let notifiers: Vec<Arc<dyn Notifier>> = vec![Arc::new(notifier) as Arc<dyn Notifier>];
    dispatch(&notifiers, &Docker, Some(Status::Ok), Some(Status::Critical)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[test]
fn payload_reports_new_ordinal() {
    let payload = Cachet::build_payload(&Docker, 3, CachetStatus::Critical, CachetStatus::Ok);
    assert_eq!(payload.component_status, 1);
    assert_eq!(payload.status, 4);
    assert_eq!(payload.component_id, 3);
    assert!(payload.notify);
}
