//! The agent over the real adapters: reqwest against a mock backend and
//! partitions on disk.

use satchel_agent::{AgentConfig, HostPorts, LifecycleState, OfflineAgent};
use satchel_cache::FilesystemCacheStorage;
use satchel_core::ControlMessage;
use satchel_core::ports::CacheStorage;
use satchel_net::{HttpNetwork, HttpNetworkConfig};
use satchel_tests::*;
use std::path::Path;
use std::sync::Arc;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer, version: &str) -> AgentConfig {
    let origin = Url::parse(&server.uri()).unwrap();
    let mut config = small_manifest_config()
        .with_app_name("e2e")
        .with_version(version)
        .with_origin(origin.clone())
        .with_api(origin, "/api");
    // The mock backend listens on loopback.
    config.dev_hosts = vec![];
    config
}

fn agent_on_disk(host: &TestHost, root: &Path, config: AgentConfig) -> OfflineAgent {
    let network = HttpNetwork::new(&HttpNetworkConfig {
        timeout_secs: Some(5),
        ..HttpNetworkConfig::default()
    })
    .unwrap();
    let ports = HostPorts {
        storage: Arc::new(FilesystemCacheStorage::new(root)),
        network: Arc::new(network),
        ..host.ports()
    };
    OfflineAgent::new(config, ports).unwrap()
}

async fn mount_shell(server: &MockServer) {
    for (route, body) in [
        ("/", "<html>shell</html>"),
        ("/index.html", "<html>index</html>"),
        ("/manifest.json", "{\"name\":\"Satchel\"}"),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn test_documents_survive_backend_outage() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let host = TestHost::new();
    let server = MockServer::start().await;
    mount_shell(&server).await;
    Mock::given(method("GET"))
        .and(path("/students"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>students</html>"))
        .mount(&server)
        .await;

    let config = config_for(&server, "1.0.0");
    let students = Url::parse(&format!("{}/students", server.uri())).unwrap();
    let elsewhere = Url::parse(&format!("{}/timetable", server.uri())).unwrap();

    let agent = agent_on_disk(&host, dir.path(), config.clone());
    agent.install().await.unwrap();
    agent.activate().await.unwrap();
    assert_eq!(agent.state(), LifecycleState::Active);

    let online = agent.fetch(&satchel_core::Request::navigate(students.clone())).await;
    assert_eq!(online.source(), "network");

    // A fresh agent over the same directory, as after a restart, with the
    // unscripted test network standing in for a dead backend.
    let ports = HostPorts {
        storage: Arc::new(FilesystemCacheStorage::new(dir.path())),
        ..host.ports()
    };
    let restarted = OfflineAgent::new(config, ports).unwrap();
    let offline = restarted
        .fetch(&satchel_core::Request::navigate(students))
        .await;
    assert_eq!(offline.source(), "cache");
    assert_eq!(offline.response().unwrap().text(), "<html>students</html>");

    let shell = restarted
        .fetch(&satchel_core::Request::navigate(elsewhere))
        .await;
    assert_eq!(shell.response().unwrap().text(), "<html>shell</html>");
}

#[tokio::test]
async fn test_upgrade_removes_previous_version_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let host = TestHost::new();
    let server = MockServer::start().await;
    mount_shell(&server).await;

    let old = agent_on_disk(&host, dir.path(), config_for(&server, "1.0.0"));
    old.install().await.unwrap();
    old.activate().await.unwrap();

    let new = agent_on_disk(&host, dir.path(), config_for(&server, "1.1.0"));
    new.install().await.unwrap();
    new.activate().await.unwrap();

    let storage = FilesystemCacheStorage::new(dir.path());
    let names = storage.keys().await.unwrap();
    assert_eq!(names, vec!["e2e-static-v1.1.0".to_string()]);
    assert!(!storage.has("e2e-static-v1.0.0").await.unwrap());
}

#[tokio::test]
async fn test_notifications_fetched_with_bearer_token() {
    let dir = tempfile::tempdir().unwrap();
    let host = TestHost::new();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events/my-notifications"))
        .and(header("authorization", "Bearer live-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(notifications_body(&[false, false, true]), "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let window = host.clients.open(&format!("{}/students", server.uri()));
    let agent = agent_on_disk(&host, dir.path(), config_for(&server, "1.0.0"));
    agent
        .handle_message(ControlMessage::FetchNotifications {
            user_id: satchel_core::UserRef::Id(5),
            token: "live-token".to_string(),
        })
        .await;

    assert_eq!(host.badge.calls(), vec![BadgeCall::Set(2)]);
    assert_eq!(host.clients.posted().len(), 1);
    assert_eq!(host.clients.posted()[0].0, window);
}

#[tokio::test]
async fn test_api_calls_are_not_stored() {
    let dir = tempfile::tempdir().unwrap();
    let host = TestHost::new();
    let server = MockServer::start().await;

    let agent = agent_on_disk(&host, dir.path(), config_for(&server, "1.0.0"));
    let request =
        satchel_core::Request::parse_get(&format!("{}/api/students", server.uri())).unwrap();
    assert_eq!(
        agent.fetch(&request).await,
        satchel_agent::FetchOutcome::PassThrough
    );

    let storage = FilesystemCacheStorage::new(dir.path());
    assert!(storage.keys().await.unwrap().is_empty());
}
