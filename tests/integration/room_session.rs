//! Room session scenarios: roster snapshots, message delivery,
//! placeholder contacts, teardown.

use std::time::Duration;

use tokio::sync::mpsc;

use ningchat::account::{AccountEvent, NingClient};
use ningchat::auth::REDIRECTOR_HOST;
use ningchat::config::ClientConfig;
use ningchat::contacts::NING_TEMP_GROUP;
use ningchat::http::scripted::ScriptedTransport;

const HOST: &str = "myhost.ning.com";
const CHAT: &str = "d1.chat.example.com";

const HOMEPAGE: &str = "<html><script>\nning = {\"CurrentProfile\":{\"id\":\"u1\",\
                        \"fullName\":\"Alice\",\"photoUrl\":\"http://x/p.jpg\"}};\n\
                        </script><script>xg.token = 'TOK1';</script></html>";

fn config(roster_ms: u64, poll_ms: u64) -> ClientConfig {
    ClientConfig {
        host: Some(HOST.to_string()),
        email: Some("alice@example.com".to_string()),
        password: Some("pw".to_string()),
        roster_refresh: Duration::from_millis(roster_ms),
        message_poll: Duration::from_millis(poll_ms),
        ..Default::default()
    }
}

/// Scripts the login sequence; room traffic is added per test.
fn scripted_login() -> ScriptedTransport {
    let t = ScriptedTransport::new();
    t.respond_with(
        HOST,
        "/main/authorization/doSignIn",
        302,
        &["xn_id_myapp=abc123; Path=/"],
        Vec::new(),
    );
    t.respond(HOST, "/", HOMEPAGE.as_bytes().to_vec());
    t.respond(
        REDIRECTOR_HOST,
        "/xn/redirector/redirect",
        br#"{"domain":"d1.chat.example.com"}"#.to_vec(),
    );
    t.respond(
        CHAT,
        "/xn/presence/login",
        br#"{"result":"ok","roomId":"room1","token":"CHATTOK"}"#.to_vec(),
    );
    t
}

fn drain(rx: &mut mpsc::Receiver<AccountEvent>) -> Vec<AccountEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

#[tokio::test]
async fn roster_snapshot_replaces_previous_membership() {
    let transport = scripted_login();
    // First roster: u2 and u3. Second: only u4 — a full snapshot that
    // must replace the membership entirely.
    transport.respond(
        CHAT,
        "/xn/presence/list",
        br#"{"hash":"h1","expired":[],"users":[
            {"ningId":"u2","name":"Bob","isAdmin":false},
            {"ningId":"u3","name":"Carol","isAdmin":true}]}"#
            .to_vec(),
    );
    transport.respond(
        CHAT,
        "/xn/presence/list",
        br#"{"hash":"h2","expired":[],"users":[
            {"ningId":"u4","name":"Dave","isAdmin":false}]}"#
            .to_vec(),
    );
    transport.respond(CHAT, "/xn/groupchat/list", br#"{"messages":[]}"#.to_vec());
    let recording = transport.clone();

    let (client, mut rx) = NingClient::new(config(40, 60_000), transport);
    client.connect().await.unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;

    let events = drain(&mut rx);
    assert!(events.contains(&AccountEvent::RosterUserUpdated {
        room_id: "room1".to_string(),
        ning_id: "u3".to_string(),
        name: "Carol".to_string(),
        is_admin: true,
    }));
    assert!(events.contains(&AccountEvent::RosterUserUpdated {
        room_id: "room1".to_string(),
        ning_id: "u4".to_string(),
        name: "Dave".to_string(),
        is_admin: false,
    }));
    // The second snapshot removed the members it did not list.
    assert!(events.contains(&AccountEvent::RosterUserRemoved {
        room_id: "room1".to_string(),
        ning_id: "u2".to_string(),
    }));
    assert!(events.contains(&AccountEvent::RosterUserRemoved {
        room_id: "room1".to_string(),
        ning_id: "u3".to_string(),
    }));

    // The second fetch replayed the hash the first one issued.
    let fetches = recording.requests_to("/xn/presence/list");
    assert!(fetches[0].path.contains("h=null"));
    assert!(fetches[1].path.contains("h=h1"));
}

#[tokio::test]
async fn poll_delivers_broadcasts_and_whispers_and_drops_unknown_types() {
    let transport = scripted_login();
    transport.respond(CHAT, "/xn/presence/list", br#"{"users":[]}"#.to_vec());
    transport.respond(CHAT, "/xn/groupchat/list", br#"{"messages":[]}"#.to_vec());
    transport.respond(
        CHAT,
        "/xn/groupchat/poll",
        br#"{"hash":"h3","messages":[
            {"type":"message","body":"hi all","date":1000,"roomId":"room1",
             "targetId":null,"sender":{"ningId":"u2","name":"Bob"}},
            {"type":"private","body":"psst","date":1001,"roomId":"room1",
             "targetId":"u1","sender":{"ningId":"u2","name":"Bob"}},
            {"type":"announcement","body":"ignored","date":1002,"roomId":"room1",
             "targetId":null,"sender":{"ningId":"u2","name":"Bob"}}]}"#
            .to_vec(),
    );

    let (client, mut rx) = NingClient::new(config(60_000, 40), transport);
    client.connect().await.unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;

    let deliveries: Vec<(String, bool)> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            AccountEvent::MessageReceived { body, whisper, .. } => Some((body, whisper)),
            _ => None,
        })
        .collect();

    // Broadcast, then whisper, in array order; the unknown type
    // produced no delivery.
    assert!(deliveries.len() >= 2);
    assert_eq!(deliveries[0], ("hi all".to_string(), false));
    assert_eq!(deliveries[1], ("psst".to_string(), true));
    assert!(deliveries.iter().all(|(body, _)| body != "ignored"));
}

#[tokio::test]
async fn unknown_sender_synthesizes_a_placeholder_contact() {
    let transport = scripted_login();
    transport.respond(CHAT, "/xn/presence/list", br#"{"users":[]}"#.to_vec());
    transport.respond(
        CHAT,
        "/xn/groupchat/list",
        br#"{"messages":[
            {"type":"message","body":"hello","date":1000,"roomId":"room1",
             "targetId":null,"sender":{"ningId":"u9","name":"Stranger"}}]}"#
            .to_vec(),
    );

    let (client, mut rx) = NingClient::new(config(60_000, 60_000), transport);
    client.connect().await.unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;

    let events = drain(&mut rx);
    let contact = events
        .iter()
        .find_map(|e| match e {
            AccountEvent::ContactSynthesized { contact } => Some(contact.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(contact.ning_id, "u9");
    assert_eq!(contact.display_name, "Stranger");
    assert_eq!(contact.group, NING_TEMP_GROUP);
    assert!(contact.ephemeral);

    // The placeholder never reaches the persistable set.
    assert!(client.contacts().persistable().is_empty());
    // And a second message from the same sender synthesizes nothing.
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, AccountEvent::ContactSynthesized { .. }))
            .count(),
        1
    );
}

#[tokio::test]
async fn leaving_a_room_stops_its_timers() {
    let transport = scripted_login();
    transport.respond(CHAT, "/xn/presence/list", br#"{"users":[]}"#.to_vec());
    transport.respond(CHAT, "/xn/groupchat/list", br#"{"messages":[]}"#.to_vec());
    let recording = transport.clone();

    let (client, mut rx) = NingClient::new(config(30, 60_000), transport);
    client.connect().await.unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;

    client.leave_room("room1");
    assert!(client.rooms().is_empty());
    let fetches_at_leave = recording.requests_to("/xn/presence/list").len();

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(
        recording.requests_to("/xn/presence/list").len(),
        fetches_at_leave
    );
    assert!(drain(&mut rx).contains(&AccountEvent::RoomLeft {
        room_id: "room1".to_string()
    }));
}

#[tokio::test]
async fn failed_ticks_are_skipped_silently_and_polling_continues() {
    let transport = scripted_login();
    transport.respond(CHAT, "/xn/groupchat/list", br#"{"messages":[]}"#.to_vec());
    // First roster fetch fails at the HTTP level, second succeeds.
    transport.respond_with(CHAT, "/xn/presence/list", 503, &[], Vec::new());
    transport.respond(
        CHAT,
        "/xn/presence/list",
        br#"{"users":[{"ningId":"u2","name":"Bob","isAdmin":false}]}"#.to_vec(),
    );

    let (client, mut rx) = NingClient::new(config(40, 60_000), transport);
    client.connect().await.unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;

    let events = drain(&mut rx);
    assert!(!events
        .iter()
        .any(|e| matches!(e, AccountEvent::ConnectionError(_))));
    assert!(events.contains(&AccountEvent::RosterUserUpdated {
        room_id: "room1".to_string(),
        ning_id: "u2".to_string(),
        name: "Bob".to_string(),
        is_admin: false,
    }));
}
