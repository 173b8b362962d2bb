#![allow(clippy::unwrap_used)]
// Controller lifecycle tests against a wiremock status server.
// The push channel is disabled; these cover the REST path only.

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bayview_core::{
    ConnectionState, Controller, ControllerConfig, Grid, StatusColor, infer_switches,
    overall_color,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn rest_only(server: &MockServer) -> ControllerConfig {
    let mut config = ControllerConfig::new(server.uri().parse().unwrap());
    config.websocket_enabled = false;
    config
}

fn snapshot_body() -> serde_json::Value {
    json!({
        "data": {
            "machines": [
                {
                    "name": "PRESS-01",
                    "section": "North",
                    "machine_row": "B",
                    "machine_column": 4,
                    "source_switch": "B2-8",
                    "results": {
                        "ip": { "ip": "10.0.0.11", "alive": true, "ping": 2, "color": "green" }
                    }
                },
                {
                    "name": "LATHE-02",
                    "section": "North",
                    "bay": "C",
                    "column": "7",
                    "results": {
                        "gateway": { "ip": "10.0.0.1", "alive": true, "ping": 9, "color": "orange" }
                    }
                },
                { "name": "ORPHAN" }
            ]
        }
    })
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_fetches_initial_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/machines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot_body()))
        .expect(1)
        .mount(&server)
        .await;

    let controller = Controller::new(rest_only(&server));
    controller.connect().await.unwrap();

    assert_eq!(*controller.connection_state().borrow(), ConnectionState::Connected);
    let snapshot = controller.snapshot();
    let names: Vec<_> = snapshot.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["PRESS-01", "LATHE-02", "ORPHAN"]);
    assert!(controller.last_snapshot().is_some());

    assert_eq!(overall_color(&snapshot[0]), StatusColor::Green);
    assert_eq!(overall_color(&snapshot[1]), StatusColor::Orange);
    assert_eq!(overall_color(&snapshot[2]), StatusColor::Red);

    controller.disconnect().await;
}

#[tokio::test]
async fn test_failed_initial_fetch_is_swallowed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/machines"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let controller = Controller::new(rest_only(&server));
    controller.connect().await.unwrap();

    assert_eq!(*controller.connection_state().borrow(), ConnectionState::Connected);
    assert!(controller.snapshot().is_empty());
    assert!(controller.last_snapshot().is_none());

    // An explicit refresh surfaces the error.
    let err = controller.refresh().await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_disconnect_resets_and_allows_reconnect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/machines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot_body()))
        .expect(2)
        .mount(&server)
        .await;

    let controller = Controller::new(rest_only(&server));
    controller.connect().await.unwrap();
    assert_eq!(controller.snapshot().len(), 3);

    controller.disconnect().await;
    assert_eq!(*controller.connection_state().borrow(), ConnectionState::Disconnected);
    assert!(controller.snapshot().is_empty());

    controller.connect().await.unwrap();
    assert_eq!(controller.snapshot().len(), 3);
    controller.disconnect().await;
}

#[tokio::test]
async fn test_subscribers_see_refreshes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/machines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/machines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot_body()))
        .mount(&server)
        .await;

    let controller = Controller::new(rest_only(&server));
    let mut stream = controller.machines();
    controller.connect().await.unwrap();
    assert!(controller.snapshot().is_empty());

    assert_eq!(controller.refresh().await.unwrap(), 3);
    let snap = stream.changed().await.unwrap();
    assert_eq!(snap.len(), 3);

    // Same content again: no new notification.
    controller.refresh().await.unwrap();
    assert!(!stream.has_changed());
}

// ── Derivations over a fetched snapshot ─────────────────────────────

#[tokio::test]
async fn test_snapshot_feeds_grid_and_topology() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/machines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot_body()))
        .mount(&server)
        .await;

    let controller = Controller::new(rest_only(&server));
    controller.connect().await.unwrap();
    let snapshot = controller.snapshot();

    let grid = Grid::build(&snapshot);
    let switches = infer_switches(&snapshot);

    let north = grid.section("North").unwrap();
    assert_eq!(north.cell("B", 4)[0].name, "PRESS-01");
    assert_eq!(north.cell("C", 7)[0].name, "LATHE-02");
    assert_eq!(north.bays(), vec!["A", "B", "C"]);
    assert!(north.switch_at("A", 1, &switches).unwrap().is_main());
    assert!(north.switch_at("B", 2, &switches).is_some());

    let unknown = grid.section("Unknown").unwrap();
    assert_eq!(unknown.off_grid().len(), 1);

    controller.disconnect().await;
}
