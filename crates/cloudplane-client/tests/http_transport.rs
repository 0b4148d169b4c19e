//! Integration tests for the HTTP transport against a mock control plane

use cloudplane_client::session::password_digest;
use cloudplane_client::{
    ClientConfig, ControlPlaneClient, ControlPlaneError, DeleteMode, JobPolicy, TransportError,
};
use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> ClientConfig {
    let mut config = ClientConfig::new(format!("{}/zstack", server.uri()), "admin", "password");
    config.job_policy = JobPolicy {
        poll_interval: Duration::from_millis(20),
        timeout: Duration::from_secs(5),
    };
    config
}

async fn mount_login(server: &MockServer, uuid: &str) {
    Mock::given(method("PUT"))
        .and(path("/zstack/v1/accounts/login"))
        .and(body_json(json!({
            "logInByAccount": {
                "accountName": "admin",
                "password": password_digest("password"),
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "inventory": {"uuid": uuid, "accountUuid": "36c27e8ff05c4780bf6d2fa65700f22e"}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_connect_logs_in_with_digest() {
    let server = MockServer::start().await;
    mount_login(&server, "sess-1").await;

    let client = ControlPlaneClient::connect(config(&server)).await.unwrap();

    assert_eq!(client.session().token().unwrap().as_str(), "sess-1");
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(!received[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_rejected_login() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/zstack/v1/accounts/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": "ID.1001", "description": "wrong account name or password"}
        })))
        .mount(&server)
        .await;

    let err = ControlPlaneClient::connect(config(&server)).await.unwrap_err();
    assert!(matches!(err, ControlPlaneError::Authentication(_)));
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_paged_read_with_session_header() {
    let server = MockServer::start().await;
    mount_login(&server, "sess-1").await;

    Mock::given(method("GET"))
        .and(path("/zstack/v1/zones"))
        .and(header("Authorization", "OAuth sess-1"))
        .and(header("Content-Type", "application/json"))
        .and(query_param("replyWithCount", "true"))
        .and(query_param("start", "0"))
        .and(query_param("limit", "2"))
        .and(query_param("q", "state=Enabled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "inventories": [{"uuid": "zone-1"}, {"uuid": "zone-2"}],
            "total": 3
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/zstack/v1/zones"))
        .and(header("Authorization", "OAuth sess-1"))
        .and(query_param("start", "2"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "inventories": [{"uuid": "zone-3"}],
            "total": 3
        })))
        .mount(&server)
        .await;

    let client = ControlPlaneClient::connect(config(&server))
        .await
        .unwrap()
        .with_page_size(2);
    let zones: Vec<Value> = client
        .list_all("zones", &[("q", "state=Enabled")])
        .await
        .unwrap();

    let uuids: Vec<_> = zones.iter().map(|z| z["uuid"].as_str().unwrap()).collect();
    assert_eq!(uuids, ["zone-1", "zone-2", "zone-3"]);
}

#[tokio::test]
async fn test_create_polls_job_location() {
    let server = MockServer::start().await;
    mount_login(&server, "sess-1").await;
    let location = format!("{}/zstack/v1/api-jobs/5f6e", server.uri());

    Mock::given(method("POST"))
        .and(path("/zstack/v1/vm-instances"))
        .and(header("Authorization", "OAuth sess-1"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"location": location})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/zstack/v1/api-jobs/5f6e"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"location": location})))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/zstack/v1/api-jobs/5f6e"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "inventory": {"uuid": "vm-1", "state": "Running"}
        })))
        .mount(&server)
        .await;

    let client = ControlPlaneClient::connect(config(&server)).await.unwrap();
    let envelope = client
        .create("vm-instances", json!({"params": {"name": "vm-1"}}))
        .await
        .unwrap();

    assert_eq!(envelope.str_at(&["inventory", "state"]), Some("Running"));
    let polls = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path().ends_with("/api-jobs/5f6e"))
        .count();
    assert_eq!(polls, 3);
}

#[tokio::test]
async fn test_plain_text_pending_status_keeps_polling() {
    let server = MockServer::start().await;
    mount_login(&server, "sess-1").await;
    let location = format!("{}/zstack/v1/api-jobs/1", server.uri());

    Mock::given(method("POST"))
        .and(path("/zstack/v1/vm-instances"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"location": location})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/zstack/v1/api-jobs/1"))
        .respond_with(ResponseTemplate::new(202).set_body_string("Accepted"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/zstack/v1/api-jobs/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "inventory": {"uuid": "vm-1"}
        })))
        .mount(&server)
        .await;

    let client = ControlPlaneClient::connect(config(&server)).await.unwrap();
    let envelope = client
        .create("vm-instances", json!({"params": {"name": "vm-1"}}))
        .await
        .unwrap();

    assert_eq!(envelope.status(), 200);
    assert_eq!(envelope.str_at(&["inventory", "uuid"]), Some("vm-1"));
}

#[tokio::test]
async fn test_job_that_never_completes() {
    let server = MockServer::start().await;
    mount_login(&server, "sess-1").await;
    let location = format!("{}/zstack/v1/api-jobs/dead", server.uri());

    Mock::given(method("DELETE"))
        .and(path("/zstack/v1/vm-instances/vm-1"))
        .and(query_param("deleteMode", "Permissive"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"location": location})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/zstack/v1/api-jobs/dead"))
        .respond_with(ResponseTemplate::new(404).set_body_string("job not found"))
        .mount(&server)
        .await;

    let client = ControlPlaneClient::connect(config(&server))
        .await
        .unwrap()
        .with_job_policy(JobPolicy {
            poll_interval: Duration::from_millis(20),
            timeout: Duration::from_millis(150),
        });
    let err = client
        .delete("vm-instances", "vm-1", DeleteMode::Permissive)
        .await
        .unwrap_err();

    match err {
        ControlPlaneError::JobTimeout { method, url, .. } => {
            assert_eq!(method, "DELETE");
            assert_eq!(url, "vm-instances/vm-1");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_expired_session_then_reauthenticate() {
    let server = MockServer::start().await;
    mount_login(&server, "sess-1").await;

    Mock::given(method("GET"))
        .and(path("/zstack/v1/vm-instances/vm-1"))
        .and(header("Authorization", "OAuth sess-1"))
        .respond_with(ResponseTemplate::new(401).set_body_string("session expired"))
        .mount(&server)
        .await;

    let client = ControlPlaneClient::connect(config(&server)).await.unwrap();
    let err = client.get("vm-instances", "vm-1", "").await.unwrap_err();

    assert!(err.is_unauthorized());
    match err {
        ControlPlaneError::Transport(TransportError::Status { status, body, .. }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "session expired");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    server.reset().await;
    mount_login(&server, "sess-2").await;
    Mock::given(method("GET"))
        .and(path("/zstack/v1/vm-instances/vm-1"))
        .and(header("Authorization", "OAuth sess-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "inventory": {"uuid": "vm-1"}
        })))
        .mount(&server)
        .await;

    client.reauthenticate().await.unwrap();
    let envelope = client.get("vm-instances", "vm-1", "").await.unwrap();
    assert_eq!(envelope.str_at(&["inventory", "uuid"]), Some("vm-1"));
}

#[tokio::test]
async fn test_application_backends_over_http() {
    let server = MockServer::start().await;
    mount_login(&server, "sess-1").await;

    Mock::given(method("GET"))
        .and(path("/zstack/v1/load-balancers/lb-1/targets"))
        .and(query_param("listenerId", "lbl-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "inventories": [{
                "ListenerId": "lbl-1",
                "Protocol": "HTTP",
                "Port": 80,
                "Rules": [{
                    "LocationId": "loc-1",
                    "Url": "/",
                    "Targets": [{
                        "InstanceId": "ins-1",
                        "Type": "CVM",
                        "Port": 8080,
                        "Weight": 10,
                        "PrivateIpAddresses": ["10.0.0.4"]
                    }]
                }]
            }]
        })))
        .mount(&server)
        .await;

    let client = ControlPlaneClient::connect(config(&server)).await.unwrap();

    let backends = client
        .list_backends("application", "lb-1", Some("lbl-1"), Some("loc-1"))
        .await
        .unwrap();
    assert_eq!(backends.len(), 1);
    assert_eq!(backends[0].display_name(), "loc-1/ins-1");
    assert_eq!(backends[0].private_ip_addresses, ["10.0.0.4"]);

    let err = client
        .list_backends("application", "lb-1", Some("lbl-1"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ControlPlaneError::MissingRuleId { .. }));
}
