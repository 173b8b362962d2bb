#![allow(clippy::unwrap_used)]
// Integration tests for `MachinesClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bayview_api::{Error, MachinesClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, MachinesClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = MachinesClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

// ── Happy path ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_machines() {
    let (server, client) = setup().await;

    let body = json!({
        "data": {
            "machines": [
                {
                    "name": "PRESS-01",
                    "section": "North",
                    "bay": "A",
                    "column": "3",
                    "source_switch": "B12-24",
                    "ip": "10.0.0.11",
                    "uplink": "U-7",
                    "results": {
                        "ip": { "ip": "10.0.0.11", "alive": true, "ping": 2, "color": "green" }
                    }
                },
                {
                    "name": "LATHE-02",
                    "machine_row": "C",
                    "machine_column": 5
                }
            ]
        }
    });

    Mock::given(method("GET"))
        .and(path("/api/machines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let machines = client.list_machines().await.unwrap();

    assert_eq!(machines.len(), 2);
    assert_eq!(machines[0].name, "PRESS-01");
    assert_eq!(machines[0].source_switch.as_deref(), Some("B12-24"));
    let probe = machines[0].results.ip.as_ref().unwrap();
    assert!(probe.alive);
    assert_eq!(probe.ping, Some(2.0));
    assert_eq!(machines[1].section, None);
    assert_eq!(machines[1].machine_column.as_deref(), Some("5"));
}

#[tokio::test]
async fn test_list_machines_missing_data_is_empty() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/machines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let machines = client.list_machines().await.unwrap();
    assert!(machines.is_empty());
}

#[tokio::test]
async fn test_new_with_default_transport() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/machines"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "machines": [] } })),
        )
        .mount(&server)
        .await;

    let client = MachinesClient::new(
        Url::parse(&server.uri()).unwrap(),
        &TransportConfig::default(),
    )
    .unwrap();
    assert!(client.list_machines().await.unwrap().is_empty());
}

// ── Error paths ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_machines_http_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/machines"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let err = client.list_machines().await.unwrap_err();
    assert!(err.is_transient());
    match err {
        Error::Http { status, body } => {
            assert_eq!(status, 502);
            assert_eq!(body, "Bad Gateway");
        }
        other => panic!("expected Http error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_list_machines_invalid_json() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/machines"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = client.list_machines().await;
    assert!(
        matches!(result, Err(Error::Deserialization { ref body, .. }) if body.contains("oops")),
        "expected Deserialization error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_list_machines_connection_refused() {
    // Port 9 (discard) on localhost is essentially never listening.
    let client = MachinesClient::with_client(
        reqwest::Client::new(),
        Url::parse("http://127.0.0.1:9").unwrap(),
    );

    let result = client.list_machines().await;
    assert!(
        matches!(result, Err(Error::Transport(_))),
        "expected Transport error, got: {result:?}"
    );
}
