use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use ulid::Ulid;

use dockslot::api::{build_router, AppState};
use dockslot::auth::StaticTokens;
use dockslot::calendar::FixedClock;
use dockslot::config::TerminalConfig;
use dockslot::engine::Engine;
use dockslot::notify::LogNotifier;
use dockslot::store::WalStore;

const ADMIN: &str = "admin-token";
const USER: &str = "user-token";

const USERS: &str = r#"[
    {"token": "admin-token", "id": "a1", "role": "ADMIN", "email": "admin@terminal.no"},
    {"token": "user-token", "id": "u1", "role": "USER", "email": "ops@frakt.no"}
]"#;

async fn spawn_app() -> SocketAddr {
    let dir = std::env::temp_dir().join("dockslot_test_http");
    std::fs::create_dir_all(&dir).expect("create temp dir");
    let store = Arc::new(WalStore::open(&dir.join(format!("{}.wal", Ulid::new()))).expect("open store"));

    let config = TerminalConfig::default();
    // Monday 2025-03-03 12:00 UTC, a week before the day under test
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 3, 3, 12, 0, 0).unwrap());
    let notifier = Arc::new(LogNotifier::new(config.calendar, None));
    let engine = Arc::new(Engine::new(config, store, notifier, Arc::new(clock)));
    let identities = Arc::new(StaticTokens::from_json(USERS).expect("users json"));

    let app = build_router(AppState { engine, identities });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
    addr
}

async fn send_raw(
    addr: SocketAddr,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (u16, Value) {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    if let Some(token) = token {
        req.push_str(&format!("Authorization: Bearer {token}\r\n"));
    }
    let payload = body.map(|b| b.to_string()).unwrap_or_default();
    if !payload.is_empty() {
        req.push_str("Content-Type: application/json\r\n");
    }
    req.push_str(&format!("Content-Length: {}\r\n\r\n{payload}", payload.len()));
    stream.write_all(req.as_bytes()).await.expect("write request");

    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("status");
    let json = serde_json::from_str(body).unwrap_or(Value::String(body.to_string()));
    (status, json)
}

fn booking_body(ramp: u32, start: &str) -> Value {
    json!({
        "type": "LOADING",
        "rampNumber": ramp,
        "start": start,
        "regNr": "AB12345",
        "company": "Frakt AS",
        "email": "ops@frakt.no",
        "phone": "12345678",
        "goodsType": "IFCO",
    })
}

#[tokio::test]
async fn health_needs_no_auth() {
    let addr = spawn_app().await;
    let (status, body) = send_raw(addr, "GET", "/health", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body, Value::String("OK".into()));
}

#[tokio::test]
async fn availability_requires_auth_and_date() {
    let addr = spawn_app().await;

    let (status, body) = send_raw(addr, "GET", "/availability?date=2025-03-10", None, None).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "unauthenticated");
    assert_eq!(body["message"], "Ikke innlogget");

    let (status, _) = send_raw(addr, "GET", "/availability?date=2025-03-10", Some("bogus"), None).await;
    assert_eq!(status, 401);

    let (status, body) = send_raw(addr, "GET", "/availability", Some(USER), None).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "missing-field");

    let (status, body) = send_raw(addr, "GET", "/availability?date=10.03.2025", Some(USER), None).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "invalid-input");

    let (status, body) = send_raw(addr, "GET", "/availability?date=2025-03-10&type=BOTH", Some(USER), None).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "invalid-type");
}

#[tokio::test]
async fn availability_returns_slot_grid() {
    let addr = spawn_app().await;
    let (status, body) = send_raw(addr, "GET", "/availability?date=2025-03-10&type=LOADING", Some(USER), None).await;
    assert_eq!(status, 200);
    let slots = body.as_array().expect("slot array");
    assert_eq!(slots.len(), 27);
    assert_eq!(slots[0]["rampNumber"], 8);
    assert_eq!(slots[0]["start"], "2025-03-10T07:00:00Z");
    assert_eq!(slots[0]["status"], "FREE");
    assert_eq!(slots[0]["expired"], false);

    let (_, body) = send_raw(addr, "GET", "/availability?date=2025-03-10&type=UNLOADING", Some(USER), None).await;
    assert_eq!(body.as_array().unwrap().len(), 26);

    let (_, body) = send_raw(addr, "GET", "/availability?date=2025-03-08", Some(USER), None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn booking_lifecycle() {
    let addr = spawn_app().await;

    let (status, created) = send_raw(
        addr,
        "POST",
        "/bookings",
        Some(USER),
        Some(booking_body(9, "2025-03-10T10:00:00+01:00")),
    )
    .await;
    assert_eq!(status, 200, "{created}");
    assert_eq!(created["type"], "LOADING");
    assert_eq!(created["rampNumber"], 9);
    assert_eq!(created["end"], "2025-03-10T10:00:00Z");
    assert_eq!(created["userId"], "u1");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, conflict) = send_raw(
        addr,
        "POST",
        "/bookings",
        Some(ADMIN),
        Some(booking_body(9, "2025-03-10T09:00:00Z")),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(conflict["error"], "already-booked");
    assert_eq!(conflict["message"], "Slot allerede booket");

    let (_, slots) = send_raw(addr, "GET", "/availability?date=2025-03-10", Some(USER), None).await;
    let booked: Vec<_> = slots
        .as_array()
        .unwrap()
        .iter()
        .filter(|s| s["status"] == "BOOKED")
        .collect();
    assert_eq!(booked.len(), 1);
    assert_eq!(booked[0]["bookingId"], id.as_str());

    let (status, list) = send_raw(addr, "GET", "/bookings?date=2025-03-10", Some(USER), None).await;
    assert_eq!(status, 200);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let path = format!("/bookings?id={id}");
    let (status, body) = send_raw(addr, "DELETE", &path, Some(USER), None).await;
    assert_eq!(status, 403);
    assert_eq!(body["message"], "Ingen tilgang");

    let (status, body) = send_raw(addr, "DELETE", &path, Some(ADMIN), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Slettet");

    let (status, body) = send_raw(addr, "DELETE", &path, Some(ADMIN), None).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "not-found");
}

#[tokio::test]
async fn booking_rejections_carry_reasons() {
    let addr = spawn_app().await;
    let cases = [
        (booking_body(5, "2025-03-10T10:00:00+01:00"), "invalid-slot", "Ugyldig slot"),
        (booking_body(9, "2025-03-08T10:00:00+01:00"), "weekend", "Kan ikke booke i helg"),
        (booking_body(9, "2025-03-03T13:00:00+01:00"), "too-late", "For sent å booke denne tiden (må være >= 1 time før)"),
        (booking_body(9, "2025-03-10T10:30:00+01:00"), "invalid-slot", "Ugyldig slot"),
    ];
    for (body, reason, message) in cases {
        let (status, resp) = send_raw(addr, "POST", "/bookings", Some(USER), Some(body)).await;
        assert_eq!(status, 400, "{resp}");
        assert_eq!(resp["error"], reason);
        assert_eq!(resp["message"], message);
    }

    let mut missing = booking_body(9, "2025-03-10T10:00:00+01:00");
    missing.as_object_mut().unwrap().remove("phone");
    let (status, resp) = send_raw(addr, "POST", "/bookings", Some(USER), Some(missing)).await;
    assert_eq!(status, 400);
    assert_eq!(resp["error"], "missing-field");

    let mut wrong_shape = booking_body(9, "2025-03-10T10:00:00+01:00");
    wrong_shape["rampNumber"] = json!("nine");
    let (status, resp) = send_raw(addr, "POST", "/bookings", Some(USER), Some(wrong_shape)).await;
    assert_eq!(status, 400);
    assert_eq!(resp["error"], "invalid-input");
}

#[tokio::test]
async fn closures_are_admin_only_and_close_cells() {
    let addr = spawn_app().await;
    let closure = json!({
        "date": "2025-03-10",
        "type": "BOTH",
        "rampNumber": 9,
        "startTime": "12:00",
        "endTime": "14:00",
        "reason": "Vedlikehold",
    });

    let (status, _) = send_raw(addr, "POST", "/closed", Some(USER), Some(closure.clone())).await;
    assert_eq!(status, 403);
    let (status, _) = send_raw(addr, "GET", "/closed", None, None).await;
    assert_eq!(status, 401);

    let (status, created) = send_raw(addr, "POST", "/closed", Some(ADMIN), Some(closure)).await;
    assert_eq!(status, 200, "{created}");
    assert_eq!(created["startMinute"], 720);
    assert_eq!(created["durationMinutes"], 120);
    let id = created["id"].as_str().unwrap().to_string();

    let (_, slots) = send_raw(addr, "GET", "/availability?date=2025-03-10", Some(USER), None).await;
    let closed: Vec<_> = slots
        .as_array()
        .unwrap()
        .iter()
        .filter(|s| s["status"] == "CLOSED")
        .collect();
    assert_eq!(closed.len(), 2);
    assert!(closed.iter().all(|s| s["closedReason"] == "Vedlikehold" && s["expired"] == true));

    let (status, resp) = send_raw(
        addr,
        "POST",
        "/bookings",
        Some(USER),
        Some(booking_body(9, "2025-03-10T12:00:00+01:00")),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(resp["error"], "closed");

    let (status, listed) = send_raw(addr, "GET", "/closed?start=2025-03-01&end=2025-03-31", Some(ADMIN), None).await;
    assert_eq!(status, 200);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = send_raw(addr, "DELETE", &format!("/closed?id={id}"), Some(ADMIN), None).await;
    assert_eq!(status, 200);
    let (_, listed) = send_raw(addr, "GET", "/closed?start=2025-03-01&end=2025-03-31", Some(ADMIN), None).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn closure_validation_errors() {
    let addr = spawn_app().await;
    let cases = [
        (json!({"date": "2025-03-10", "type": "ALL"}), "invalid-type"),
        (json!({"type": "BOTH"}), "missing-field"),
        (
            json!({"date": "2025-03-10", "type": "BOTH", "startTime": "14:00", "endTime": "13:00"}),
            "invalid-time-range",
        ),
        (
            json!({"date": "2025-03-10", "type": "BOTH", "startMinute": 600, "startTime": "10:00"}),
            "invalid-input",
        ),
        (json!({"date": "2025-03-10", "type": "BOTH", "rampNumber": 42}), "invalid-input"),
    ];
    for (body, reason) in cases {
        let (status, resp) = send_raw(addr, "POST", "/closed", Some(ADMIN), Some(body)).await;
        assert_eq!(status, 400, "{resp}");
        assert_eq!(resp["error"], reason);
    }
}

#[tokio::test]
async fn range_listing_clamps_days() {
    let addr = spawn_app().await;
    for (ramp, start) in [(8, "2025-03-10T08:00:00+01:00"), (8, "2025-03-14T08:00:00+01:00")] {
        let (status, _) = send_raw(addr, "POST", "/bookings", Some(USER), Some(booking_body(ramp, start))).await;
        assert_eq!(status, 200);
    }

    let (status, _) = send_raw(addr, "GET", "/bookings/range?start=2025-03-10", Some(USER), None).await;
    assert_eq!(status, 403);

    let (status, body) = send_raw(addr, "GET", "/bookings/range?start=2025-03-10", Some(ADMIN), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["days"], 7);
    assert_eq!(body["start"], "2025-03-10");
    assert_eq!(body["bookings"].as_array().unwrap().len(), 2);

    let (_, body) = send_raw(addr, "GET", "/bookings/range?start=2025-03-10&days=2", Some(ADMIN), None).await;
    assert_eq!(body["bookings"].as_array().unwrap().len(), 1);

    let (_, body) = send_raw(addr, "GET", "/bookings/range?start=2025-03-10&days=400", Some(ADMIN), None).await;
    assert_eq!(body["days"], 31);
}

#[tokio::test]
async fn ramps_and_me() {
    let addr = spawn_app().await;
    let (status, body) = send_raw(addr, "GET", "/ramps", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["loading"]["ramps"], json!([8, 9, 10]));
    assert_eq!(body["unloading"]["slotMinutes"], 45);
    assert_eq!(body["timezone"], "Europe/Oslo");

    let (status, body) = send_raw(addr, "GET", "/me", Some(ADMIN), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["user"]["role"], "ADMIN");
    assert_eq!(body["user"]["email"], "admin@terminal.no");

    let (status, _) = send_raw(addr, "GET", "/me", None, None).await;
    assert_eq!(status, 401);
}
