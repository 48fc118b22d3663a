#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use hmip_api::{ApiRequest, Transport};
use hmip_core::{
    Command, CommandResult, ConnectionState, CoreError, DeviceKind, Home, HomeConfig,
    PushEventType, SecurityEventKind, StreamEnd,
};

// ── In-memory transport ─────────────────────────────────────────────

type Events = ReceiverStream<Result<String, hmip_api::Error>>;

#[derive(Debug, Clone)]
struct Recorded {
    path: String,
    body: Option<Value>,
    pin: Option<String>,
}

#[derive(Default)]
struct FakeTransport {
    responses: Mutex<HashMap<String, Value>>,
    requests: Mutex<Vec<Recorded>>,
    events: Mutex<Option<Events>>,
}

impl FakeTransport {
    fn respond(&self, path: &str, body: Value) {
        self.responses.lock().unwrap().insert(path.to_owned(), body);
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn event_channel(&self) -> mpsc::Sender<Result<String, hmip_api::Error>> {
        let (tx, rx) = mpsc::channel(8);
        *self.events.lock().unwrap() = Some(ReceiverStream::new(rx));
        tx
    }
}

impl Transport for FakeTransport {
    type Events = Events;

    async fn call(&self, request: ApiRequest) -> Result<Value, hmip_api::Error> {
        self.requests.lock().unwrap().push(Recorded {
            path: request.path.clone(),
            body: request.body.clone(),
            pin: request.pin.as_ref().map(|p| p.expose_secret().to_owned()),
        });
        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(&request.path)
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn open_event_stream(&self) -> Result<Events, hmip_api::Error> {
        self.events
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| hmip_api::Error::WebSocketConnect("connection refused".into()))
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

const AP: &str = "3014-F711-A000-0000-0000-0001";

fn state_document() -> Value {
    json!({
        "home": { "id": "home-1", "connected": true, "timeZoneId": "Europe/Berlin" },
        "devices": {
            "A": { "id": "A", "type": "HEATING_THERMOSTAT", "label": "living room" },
            "B": { "id": "B", "type": "SHUTTER_CONTACT" }
        },
        "groups": {
            "G": { "id": "G", "type": "HEATING", "channels": [{ "deviceId": "A" }, { "deviceId": "B" }] }
        },
        "clients": {
            "K": { "id": "K", "label": "phone", "homeId": "home-1" }
        }
    })
}

fn home() -> Home<FakeTransport> {
    let config = HomeConfig::new(AP, SecretString::from("auth"), SecretString::from("client"));
    Home::new(config, FakeTransport::default())
}

async fn loaded_home() -> Home<FakeTransport> {
    let home = home();
    home.transport()
        .respond("home/getCurrentState", state_document());
    home.get_current_state().await.unwrap();
    home
}

fn push(events: &[Value]) -> String {
    let map: serde_json::Map<String, Value> = events
        .iter()
        .enumerate()
        .map(|(i, e)| (i.to_string(), e.clone()))
        .collect();
    json!({ "events": map }).to_string()
}

// ── Snapshot ────────────────────────────────────────────────────────

#[tokio::test]
async fn current_state_populates_graph() {
    let home = loaded_home().await;

    let requests = home.transport().requests();
    assert_eq!(requests[0].path, "home/getCurrentState");
    let body = requests[0].body.as_ref().unwrap();
    assert_eq!(body["id"], "3014F711A00000000000000001");
    assert_eq!(body["clientCharacteristics"]["apiVersion"], "10");

    let graph = home.graph();
    assert!(graph.is_ready());
    assert_eq!(graph.device_count(), 2);
    assert_eq!(
        home.home_state().unwrap().time_zone_id.as_deref(),
        Some("Europe/Berlin")
    );
    assert!(matches!(
        home.search_device_by_id("A").unwrap().kind,
        DeviceKind::HeatingThermostat(_)
    ));
    assert_eq!(home.search_group_by_id("G").unwrap().device_ids, vec!["A", "B"]);
    assert_eq!(home.search_client_by_id("K").unwrap().label, "phone");
    assert!(home.store().last_full_refresh().is_some());
}

#[tokio::test]
async fn error_code_leaves_graph_untouched() {
    let home = loaded_home().await;
    let before = home.graph();

    home.transport().respond(
        "home/getCurrentState",
        json!({ "errorCode": "INVALID_AUTHORIZATION" }),
    );
    let err = home.get_current_state().await.unwrap_err();

    assert_eq!(err.api_error_code(), Some("INVALID_AUTHORIZATION"));
    assert!(Arc::ptr_eq(&before, &home.graph()));
}

// ── Requests ────────────────────────────────────────────────────────

#[tokio::test]
async fn security_journal_resolves_entries() {
    let home = home();
    home.transport().respond(
        "home/security/getSecurityJournal",
        json!({
            "entries": [
                {
                    "eventType": "ACTIVATION_CHANGED",
                    "label": "armed",
                    "eventTimestamp": 1_700_000_000_000_i64,
                    "securityZoneValues": { "EXTERNAL": true, "INTERNAL": false }
                },
                { "eventType": "SOMETHING_NEW", "eventTimestamp": 1_700_000_100_000_i64 }
            ]
        }),
    );

    let journal = home.get_security_journal().await.unwrap();

    assert_eq!(journal.len(), 2);
    match &journal[0].kind {
        SecurityEventKind::ActivationChanged(zones) => {
            assert_eq!(zones.external, Some(true));
            assert_eq!(zones.internal, Some(false));
        }
        other => panic!("unexpected kind {other:?}"),
    }
    assert!(journal[0].timestamp.is_some());
    assert!(matches!(journal[1].kind, SecurityEventKind::Generic));
}

#[tokio::test]
async fn security_journal_error_code_is_an_error() {
    let home = home();
    home.transport().respond(
        "home/security/getSecurityJournal",
        json!({ "errorCode": "ACCESS_DENIED" }),
    );

    let err = home.get_security_journal().await.unwrap_err();
    assert!(matches!(err, CoreError::Api { ref code } if code == "ACCESS_DENIED"));
}

#[tokio::test]
async fn oauth_otk_is_decoded() {
    let home = home();
    home.transport().respond(
        "home/getOAuthOTK",
        json!({ "authToken": "otk-123", "expirationTimestamp": 0 }),
    );

    let otk = home.get_oauth_otk().await.unwrap();
    assert_eq!(otk.auth_token.expose_secret(), "otk-123");
    assert!(otk.expires_at.is_none());
}

#[tokio::test]
async fn commands_report_acceptance_and_rejection() {
    let home = loaded_home().await;
    home.transport().respond(
        "home/setTimezone",
        json!({ "errorCode": "INVALID_TIMEZONE" }),
    );

    let accepted = home
        .execute(Command::ActivateAbsenceWithPeriod {
            end_time: NaiveDate::from_ymd_opt(2025, 1, 2)
                .unwrap()
                .and_hms_opt(7, 5, 0)
                .unwrap(),
        })
        .await
        .unwrap();
    let rejected = home
        .execute(Command::SetTimezone {
            timezone_id: "Mars/Olympus".into(),
        })
        .await
        .unwrap();

    assert_eq!(accepted, CommandResult::Ok);
    assert_eq!(
        rejected,
        CommandResult::Rejected {
            error_code: "INVALID_TIMEZONE".into()
        }
    );

    let requests = home.transport().requests();
    let absence = &requests[1];
    assert_eq!(absence.path, "home/heating/activateAbsenceWithPeriod");
    assert_eq!(absence.body, Some(json!({ "endTime": "2025_01_02 07:05" })));

    // commands never touch the mirror directly
    assert_eq!(
        home.home_state().unwrap().time_zone_id.as_deref(),
        Some("Europe/Berlin")
    );
}

#[tokio::test]
async fn set_pin_sends_old_pin_header() {
    let home = home();

    home.execute(Command::SetPin {
        new_pin: Some(SecretString::from("9999")),
        old_pin: Some(SecretString::from("1234")),
    })
    .await
    .unwrap();

    let request = &home.transport().requests()[0];
    assert_eq!(request.path, "home/setPin");
    assert_eq!(request.body, Some(json!({ "pin": "9999" })));
    assert_eq!(request.pin.as_deref(), Some("1234"));
}

// ── Push events ─────────────────────────────────────────────────────

#[tokio::test]
async fn events_flow_from_stream_to_graph_and_hook() {
    let home = loaded_home().await;
    let tx = home.transport().event_channel();
    let fired = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&fired);
    home.on_event(move |batch| {
        seen.lock().unwrap().push(batch.applied.len());
        Ok(())
    });
    let mut batches = home.batches();

    home.enable_events().await.unwrap();
    assert_eq!(*home.connection_state().borrow(), ConnectionState::Connected);

    tx.send(Ok(push(&[json!({ "pushEventType": "DEVICE_REMOVED", "id": "B" })])))
        .await
        .unwrap();
    let batch = tokio::time::timeout(Duration::from_secs(5), batches.recv())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(batch.applied[0].event_type, PushEventType::DeviceRemoved);
    assert!(home.search_device_by_id("B").is_none());
    assert_eq!(home.search_group_by_id("G").unwrap().device_ids, vec!["A"]);
    assert_eq!(*fired.lock().unwrap(), vec![1]);

    let end = home.disable_events().await;
    assert!(matches!(end, Some(StreamEnd::Cancelled)));
    assert_eq!(*home.connection_state().borrow(), ConnectionState::Disconnected);
    assert!(home.disable_events().await.is_none());
}

#[tokio::test]
async fn remote_close_is_reported() {
    let home = loaded_home().await;
    let tx = home.transport().event_channel();
    let mut state = home.connection_state();

    home.enable_events().await.unwrap();
    drop(tx);

    tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| *s == ConnectionState::Closed),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(matches!(home.disable_events().await, Some(StreamEnd::Closed)));
}

#[tokio::test]
async fn failed_stream_open_is_reported() {
    let home = loaded_home().await;

    let err = home.enable_events().await.unwrap_err();

    assert!(matches!(err, CoreError::EventStream { .. }));
    assert!(matches!(
        *home.connection_state().borrow(),
        ConnectionState::Failed { .. }
    ));
}

#[tokio::test]
async fn entity_watch_follows_push_events() {
    let home = loaded_home().await;
    let tx = home.transport().event_channel();
    let mut watch = home.watch_entity("A");
    assert!(watch.borrow_and_update().is_some());

    home.enable_events().await.unwrap();
    tx.send(Ok(push(&[json!({
        "pushEventType": "DEVICE_CHANGED",
        "device": { "id": "A", "type": "HEATING_THERMOSTAT", "label": "kitchen" }
    })])))
    .await
    .unwrap();

    tokio::time::timeout(Duration::from_secs(5), watch.changed())
        .await
        .unwrap()
        .unwrap();
    let label = match watch.borrow().as_ref().unwrap() {
        hmip_core::Entity::Device(d) => d.label.clone(),
        other => panic!("unexpected entity {other:?}"),
    };
    assert_eq!(label.as_deref(), Some("kitchen"));
    home.disable_events().await;
}
