use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_postgres::{Config, NoTls};
use ulid::Ulid;

use loobook::engine::Engine;
use loobook::wire;

// ── Test infrastructure ──────────────────────────────────────

const H: i64 = 3_600_000;

async fn start_test_server() -> (SocketAddr, Arc<Engine>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let dir = std::env::temp_dir().join(format!("loobook_int_test_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();
    let engine = Arc::new(Engine::new(dir.join("bookings.wal")).unwrap());

    let engine2 = engine.clone();
    tokio::spawn(async move {
        loop {
            let (socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let engine = engine2.clone();
            tokio::spawn(async move {
                let _ =
                    wire::process_connection(socket, engine, 0, "loobook".to_string(), None).await;
            });
        }
    });

    (addr, engine)
}

async fn connect(addr: SocketAddr) -> tokio_postgres::Client {
    let mut config = Config::new();
    config
        .host(addr.ip().to_string())
        .port(addr.port())
        .dbname("loobook")
        .user("loobook")
        .password("loobook");

    let (client, connection) = config.connect(NoTls).await.unwrap();
    tokio::spawn(async move {
        let _ = connection.await;
    });
    client
}

async fn insert_returning_id(
    client: &tokio_postgres::Client,
    user: &str,
    start: i64,
    end: i64,
    purpose: &str,
) -> String {
    let rows = client
        .simple_query(&format!(
            "INSERT INTO bookings (user_id, start_time, end_time, purpose) \
             VALUES ('{user}', {start}, {end}, '{purpose}') RETURNING *"
        ))
        .await
        .unwrap();
    rows.iter()
        .find_map(|msg| match msg {
            tokio_postgres::SimpleQueryMessage::Row(row) => Some(row.get(0).unwrap().to_string()),
            _ => None,
        })
        .expect("RETURNING row")
}

// ── Tests ────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn insert_returning_and_select_roundtrip() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;

    let id = insert_returning_id(&client, "alice", H, 2 * H, "shower").await;
    assert!(Ulid::from_string(&id).is_ok());

    let rows = client.simple_query("SELECT * FROM bookings").await.unwrap();
    let row = rows
        .iter()
        .find_map(|msg| match msg {
            tokio_postgres::SimpleQueryMessage::Row(row) => Some(row),
            _ => None,
        })
        .unwrap();

    assert_eq!(row.get(0).unwrap(), id);
    assert_eq!(row.get(1).unwrap(), "alice");
    assert_eq!(row.get(2).unwrap(), H.to_string());
    assert_eq!(row.get(3).unwrap(), (2 * H).to_string());
    assert_eq!(row.get(4).unwrap(), "shower");
    assert_eq!(row.get(5).unwrap(), "f");
}

#[tokio::test(flavor = "multi_thread")]
async fn overlapping_insert_is_rejected() {
    let (addr, engine) = start_test_server().await;
    let client = connect(addr).await;

    insert_returning_id(&client, "alice", H, 2 * H, "shower").await;

    let err = client
        .simple_query(&format!(
            "INSERT INTO bookings VALUES ('bob', {}, {}, 'bath')",
            H + 30 * 60_000,
            3 * H
        ))
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("overlaps with an existing booking"),
        "unexpected error: {msg}"
    );

    assert_eq!(engine.booking_count().await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn adjacent_bookings_both_succeed() {
    let (addr, engine) = start_test_server().await;
    let client = connect(addr).await;

    insert_returning_id(&client, "alice", H, 2 * H, "shower").await;
    insert_returning_id(&client, "bob", 2 * H, 3 * H, "bath").await;

    assert_eq!(engine.booking_count().await, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn same_start_insert_is_rejected() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;

    insert_returning_id(&client, "alice", H, 2 * H, "shower").await;

    // shares only the start instant with the existing booking
    let err = client
        .simple_query(&format!(
            "INSERT INTO bookings VALUES ('bob', {H}, {}, 'bath')",
            2 * H + 1
        ))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("overlaps"), "{err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn update_own_slot_succeeds() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;

    let id = insert_returning_id(&client, "alice", H, 2 * H, "shower").await;

    // identical slot: the conflict check must skip the booking being updated
    client
        .simple_query(&format!(
            "UPDATE bookings SET start_time = {H}, end_time = {}, purpose = 'bath' \
             WHERE id = '{id}'",
            2 * H
        ))
        .await
        .unwrap();

    let rows = client
        .simple_query(&format!(
            "UPDATE bookings SET start_time = {H}, end_time = {}, purpose = 'bath' \
             WHERE id = '{id}' RETURNING *",
            3 * H
        ))
        .await
        .unwrap();
    let row = rows
        .iter()
        .find_map(|msg| match msg {
            tokio_postgres::SimpleQueryMessage::Row(row) => Some(row),
            _ => None,
        })
        .unwrap();
    assert_eq!(row.get(3).unwrap(), (3 * H).to_string());
    assert_eq!(row.get(4).unwrap(), "bath");
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_removes_booking() {
    let (addr, engine) = start_test_server().await;
    let client = connect(addr).await;

    let id = insert_returning_id(&client, "alice", H, 2 * H, "shower").await;
    client
        .simple_query(&format!("DELETE FROM bookings WHERE id = '{id}'"))
        .await
        .unwrap();
    assert_eq!(engine.booking_count().await, 0);

    // a second delete reports the missing id
    let err = client
        .simple_query(&format!("DELETE FROM bookings WHERE id = '{id}'"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not found"), "{err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn select_filters_by_user_and_day() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;

    // 2026-08-29 UTC starts at 1_787_961_600_000 ms
    let day_start: i64 = 1_787_961_600_000;
    insert_returning_id(&client, "alice", day_start + 8 * H, day_start + 9 * H, "shower").await;
    insert_returning_id(&client, "bob", day_start + 9 * H, day_start + 10 * H, "bath").await;
    // previous day
    insert_returning_id(&client, "alice", day_start - 3 * H, day_start - 2 * H, "toilet").await;

    let count_rows = |rows: &[tokio_postgres::SimpleQueryMessage]| {
        rows.iter()
            .filter(|msg| matches!(msg, tokio_postgres::SimpleQueryMessage::Row(_)))
            .count()
    };

    let alice = client
        .simple_query("SELECT * FROM bookings WHERE user_id = 'alice'")
        .await
        .unwrap();
    assert_eq!(count_rows(&alice), 2);

    let day = client
        .simple_query("SELECT * FROM bookings WHERE day = '2026-08-29'")
        .await
        .unwrap();
    assert_eq!(count_rows(&day), 2);

    let empty = client
        .simple_query("SELECT * FROM bookings WHERE user_id = 'nobody'")
        .await
        .unwrap();
    assert_eq!(count_rows(&empty), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn mark_reminder_sent_via_update() {
    let (addr, engine) = start_test_server().await;
    let client = connect(addr).await;

    let id = insert_returning_id(&client, "alice", H, 2 * H, "shower").await;
    client
        .simple_query(&format!(
            "UPDATE bookings SET reminder_sent = true WHERE id = '{id}'"
        ))
        .await
        .unwrap();

    let booking = engine
        .get_booking(&Ulid::from_string(&id).unwrap())
        .await
        .unwrap();
    assert!(booking.reminder_sent);
}

#[tokio::test(flavor = "multi_thread")]
async fn extended_protocol_with_parameters() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;

    client
        .execute(
            "INSERT INTO bookings VALUES ($1, $2, $3, $4)",
            &[&"alice", &H.to_string(), &(2 * H).to_string(), &"shower"],
        )
        .await
        .unwrap();

    let rows = client
        .query("SELECT * FROM bookings WHERE user_id = $1", &[&"alice"])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    let user: &str = rows[0].get(1);
    assert_eq!(user, "alice");
}
