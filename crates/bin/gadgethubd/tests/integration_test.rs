//! End-to-end smoke tests for the full gadgethubd stack.
//!
//! Each test wires the real registries, codec, applier, hub service, virtual
//! driver and axum router, and exercises the HTTP layer via
//! `tower::ServiceExt::oneshot` — no TCP port is bound.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use gadgethub_adapter_http_axum::router;
use gadgethub_adapter_http_axum::state::AppState;
use gadgethub_adapter_virtual::{VirtualConfig, VirtualDriver};
use gadgethub_app::api::{ApiBroadcaster, ApiHandler};
use gadgethub_app::applier::UpdateApplier;
use gadgethub_app::client_registry::ClientRegistry;
use gadgethub_app::codec::GadgetCodec;
use gadgethub_app::event_bus::InProcessBus;
use gadgethub_app::gadget_registry::GadgetRegistry;
use gadgethub_app::ports::{LocalDriver, OutboundMessage};
use gadgethub_app::services::hub_service::HubService;
use gadgethub_domain::gadget::Rgb;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tower::ServiceExt;

struct Harness {
    app: axum::Router,
    gadgets: Arc<GadgetRegistry>,
    messages: broadcast::Receiver<OutboundMessage>,
    driver: VirtualDriver,
}

/// Build a fully-wired router with the virtual driver set up.
fn harness() -> Harness {
    let clients = Arc::new(ClientRegistry::new(Duration::from_secs(60)));
    let gadgets = GadgetRegistry::new();
    let codec = Arc::new(GadgetCodec::standard(Arc::clone(&clients)).unwrap());
    let applier = Arc::new(UpdateApplier::standard(Arc::clone(&gadgets)).unwrap());
    let bus = Arc::new(InProcessBus::new(64));
    gadgets.subscribe(Arc::new(ApiBroadcaster::new(
        Arc::clone(&codec),
        Arc::clone(&bus),
    )));
    let service = HubService::new(clients, Arc::clone(&gadgets), codec, Arc::clone(&bus))
        .with_ack_timeout(Duration::from_secs(2));

    let mut driver = VirtualDriver::new(VirtualConfig::default());
    driver.setup(&gadgets).unwrap();

    let messages = bus.subscribe();
    let state = AppState::new(ApiHandler::new(Arc::new(service), applier), bus);

    Harness {
        app: router::build(state),
        gadgets,
        messages,
        driver,
    }
}

async fn call(app: &axum::Router, path: &str, payload: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/{path}"))
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn sync_payload(gadgets: Value) -> Value {
    json!({
        "id": "c1",
        "runtime_id": 7,
        "boot_mode": 1,
        "api_version": "1.2.3",
        "software": {
            "commit": "abc123",
            "branch": "main",
            "uploaded": "2024-05-01 10:00:00"
        },
        "port_mapping": {"4": 17, "led": 4},
        "gadgets": gadgets,
    })
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_return_ok_when_health_check_called() {
    let resp = harness()
        .app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Local gadgets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_list_virtual_gadgets() {
    let harness = harness();

    let (status, body) = call(&harness.app, "gadget/list", json!({})).await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["gadgets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|gadget| gadget["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["virtual_fan", "virtual_lamp", "virtual_receiver"]);
    assert!(
        body["gadgets"]
            .as_array()
            .unwrap()
            .iter()
            .all(|gadget| gadget["is_local"] == true)
    );
}

#[tokio::test]
async fn should_broadcast_only_the_changed_channel_group() {
    let mut harness = harness();

    let (_, body) = call(
        &harness.app,
        "gadget/update",
        json!({"id": "virtual_lamp", "attributes": {"red": 10}}),
    )
    .await;
    assert_eq!(body, json!({"ack": true}));

    let message = harness.messages.recv().await.unwrap();
    assert_eq!(message.path, "gadget/update");
    assert_eq!(
        message.payload,
        json!({"id": "virtual_lamp", "attributes": {"red": 10, "green": 0, "blue": 0}})
    );
    assert_eq!(
        harness.gadgets.get("virtual_lamp").unwrap().rgb(),
        Some(Rgb::new(10, 0, 0))
    );
}

#[tokio::test]
async fn should_not_broadcast_when_value_is_unchanged() {
    let mut harness = harness();

    let (_, body) = call(
        &harness.app,
        "gadget/update",
        json!({"id": "virtual_fan", "attributes": {"speed": 0}}),
    )
    .await;

    assert_eq!(body["ack"], true);
    assert!(matches!(
        harness.messages.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn should_reject_out_of_range_fan_speed() {
    let harness = harness();

    let (_, body) = call(
        &harness.app,
        "gadget/update",
        json!({"id": "virtual_fan", "attributes": {"speed": 9}}),
    )
    .await;

    assert_eq!(body["ack"], false);
    assert_eq!(body["error_type"], "GadgetUpdateApplyError");
    assert_eq!(harness.gadgets.get("virtual_fan").unwrap().speed(), Some(0));
}

#[tokio::test]
async fn should_broadcast_receiver_panel_changes() {
    let mut harness = harness();
    harness.driver.start_background().await.unwrap();

    harness.driver.panel().press_power();
    let message = tokio::time::timeout(Duration::from_secs(2), harness.messages.recv())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        message.payload,
        json!({"id": "virtual_receiver", "attributes": {"status": true}})
    );
    harness.driver.teardown().await.unwrap();
}

// ---------------------------------------------------------------------------
// Remote clients
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_sync_client_and_expose_its_gadgets() {
    let harness = harness();

    let (_, body) = call(
        &harness.app,
        "client/sync",
        sync_payload(json!([
            {"id": "desk_lamp", "type": "rgb_lamp", "name": "Desk", "attributes": {"red": 1, "green": 2, "blue": 3}},
            {"id": "plug", "type": "switch", "attributes": {"status": true}},
        ])),
    )
    .await;
    assert_eq!(body["ack"], true);
    assert_eq!(
        body["message"],
        "Synced client 'c1': 2 added, 0 updated, 0 moved, 0 replaced, 0 removed, 0 failed"
    );

    let (_, body) = call(&harness.app, "client/get", json!({"id": "c1"})).await;
    let client = &body["client"];
    assert_eq!(client["runtime_id"], 7);
    assert_eq!(client["is_active"], true);
    assert_eq!(client["api_version"], "1.2.3");
    assert_eq!(client["software"]["branch"], "main");
    assert_eq!(client["port_mapping"], json!({"4": 17}));

    let (_, body) = call(&harness.app, "gadget/get", json!({"id": "desk_lamp"})).await;
    let gadget = &body["gadget"];
    assert_eq!(gadget["is_local"], false);
    assert_eq!(gadget["class"], "rgb_lamp");
    assert_eq!(gadget["host_client"], json!({"id": "c1", "is_active": true}));
    assert_eq!(gadget["attributes"], json!({"red": 1, "green": 2, "blue": 3}));
}

#[tokio::test]
async fn should_drop_gadgets_a_resync_no_longer_announces() {
    let harness = harness();
    call(
        &harness.app,
        "client/sync",
        sync_payload(json!([
            {"id": "plug", "type": "switch", "attributes": {"status": true}},
            {"id": "heater", "type": "switch", "attributes": {"status": false}},
        ])),
    )
    .await;

    let (_, body) = call(
        &harness.app,
        "client/sync",
        sync_payload(json!([
            {"id": "plug", "type": "switch", "attributes": {"status": false}},
        ])),
    )
    .await;

    assert_eq!(
        body["message"],
        "Synced client 'c1': 0 added, 1 updated, 0 moved, 0 replaced, 1 removed, 0 failed"
    );
    assert!(!harness.gadgets.contains("heater"));
    assert_eq!(harness.gadgets.get("plug").unwrap().status(), Some(false));
}

#[tokio::test]
async fn should_cascade_client_removal() {
    let harness = harness();
    call(
        &harness.app,
        "client/sync",
        sync_payload(json!([
            {"id": "plug", "type": "switch", "attributes": {"status": true}},
        ])),
    )
    .await;

    let (_, body) = call(&harness.app, "client/remove", json!({"id": "c1"})).await;
    assert_eq!(body["message"], "Removed client 'c1' and 1 gadgets");

    let (_, body) = call(&harness.app, "client/list", json!({})).await;
    assert_eq!(body["clients"], json!([]));
    assert!(!harness.gadgets.contains("plug"));
    assert!(harness.gadgets.contains("virtual_lamp"));
}

#[tokio::test]
async fn should_report_reboot_on_heartbeat_with_new_runtime_id() {
    let harness = harness();
    call(
        &harness.app,
        "client/heartbeat",
        json!({"id": "c1", "runtime_id": 1}),
    )
    .await;

    let (_, body) = call(
        &harness.app,
        "client/heartbeat",
        json!({"id": "c1", "runtime_id": 2}),
    )
    .await;

    assert_eq!(body["ack"], true);
    assert_eq!(body["message"], "Client 'c1' rebooted, full sync required");
}

#[tokio::test]
async fn should_return_not_found_for_unrouted_path() {
    let harness = harness();

    let (status, body) = call(&harness.app, "gadget/destroy", json!({})).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["ack"], false);
}
