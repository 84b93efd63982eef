//! End-to-end login scenarios against a scripted transport.

use std::time::Duration;

use tokio::sync::mpsc;

use ningchat::account::{AccountError, AccountEvent, NingClient};
use ningchat::auth::{AuthError, AuthStage, REDIRECTOR_HOST};
use ningchat::config::ClientConfig;
use ningchat::http::HttpError;
use ningchat::http::scripted::ScriptedTransport;

const HOST: &str = "myhost.ning.com";
const CHAT: &str = "d1.chat.example.com";

const HOMEPAGE: &str = "<html><script>\nning = {\"CurrentProfile\":{\"id\":\"u1\",\
                        \"fullName\":\"Alice\",\"photoUrl\":\"http://x/p.jpg\"}};\n\
                        </script><script>xg.token = 'TOK1';</script></html>";

fn config() -> ClientConfig {
    ClientConfig {
        host: Some(HOST.to_string()),
        email: Some("alice@example.com".to_string()),
        password: Some("pw".to_string()),
        ..Default::default()
    }
}

fn scripted_success() -> ScriptedTransport {
    let t = ScriptedTransport::new();
    t.respond_with(
        HOST,
        "/main/authorization/doSignIn",
        302,
        &["xn_id_myapp=abc123; Path=/; HttpOnly"],
        br#"{"result":"ok"}"#.to_vec(),
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
        br#"{"command":"login","result":"ok","roomId":"room1","count":2,"token":"CHATTOK"}"#
            .to_vec(),
    );
    t.respond(CHAT, "/xn/presence/list", br#"{"users":[]}"#.to_vec());
    t.respond(CHAT, "/xn/groupchat/list", br#"{"messages":[]}"#.to_vec());
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
async fn successful_login_reaches_connected_and_joins_the_room() {
    let (client, mut rx) = NingClient::new(config(), scripted_success());
    client.connect().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(client.is_connected());
    assert_eq!(client.rooms(), vec!["room1".to_string()]);

    let events = drain(&mut rx);
    let connected_at = events
        .iter()
        .position(|e| *e == AccountEvent::Connected)
        .unwrap();
    let joined_at = events
        .iter()
        .position(|e| {
            *e == AccountEvent::RoomJoined {
                room_id: "room1".to_string(),
            }
        })
        .unwrap();
    assert!(connected_at < joined_at);
}

#[tokio::test]
async fn stages_fire_in_order_exactly_once() {
    let (client, mut rx) = NingClient::new(config(), scripted_success());
    client.connect().await.unwrap();

    let stages: Vec<(AuthStage, u8)> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            AccountEvent::Progress { stage, step, total } => {
                assert_eq!(total, AuthStage::TOTAL_STEPS);
                Some((stage, step))
            }
            _ => None,
        })
        .collect();

    assert_eq!(
        stages,
        vec![
            (AuthStage::CredentialSubmit, 1),
            (AuthStage::CookieScan, 2),
            (AuthStage::ProfileScrape, 3),
            (AuthStage::ChatServerRedirect, 4),
            (AuthStage::ChatLogin, 5),
        ]
    );
}

#[tokio::test]
async fn missing_xg_token_stops_the_sequence() {
    let transport = ScriptedTransport::new();
    transport.respond_with(
        HOST,
        "/main/authorization/doSignIn",
        302,
        &["xn_id_myapp=abc123"],
        Vec::new(),
    );
    // Homepage carries the profile block but no token marker.
    transport.respond(
        HOST,
        "/",
        b"<html>\nning = {\"CurrentProfile\":{\"id\":\"u1\",\"fullName\":\"Alice\",\
          \"photoUrl\":\"http://x/p.jpg\"}};\n</html>"
            .to_vec(),
    );
    // Register the redirector route so a stray request would be
    // answered and recorded rather than erroring out.
    transport.respond(
        REDIRECTOR_HOST,
        "/xn/redirector/redirect",
        br#"{"domain":"d1.chat.example.com"}"#.to_vec(),
    );
    let recording = transport.clone();
    let (client, mut rx) = NingClient::new(config(), transport);

    let result = client.connect().await;
    assert!(matches!(result, Err(AccountError::Auth(AuthError::Scrape(_)))));
    assert!(!client.is_connected());

    let events = drain(&mut rx);
    assert!(events.contains(&AccountEvent::ConnectionError("xgToken not found".to_string())));

    // Only the sign-in POST and the homepage GET went out.
    assert_eq!(recording.requests().len(), 2);
    assert!(recording.requests_to("/xn/redirector/redirect").is_empty());
}

#[tokio::test]
async fn credential_rejection_renders_as_could_not_log_on() {
    let transport = ScriptedTransport::new();
    transport.fail(
        HOST,
        "/main/authorization/doSignIn",
        HttpError::Status(403),
    );
    let (client, mut rx) = NingClient::new(config(), transport);

    let result = client.connect().await;
    assert_eq!(result, Err(AccountError::Auth(AuthError::CouldNotLogOn)));

    let events = drain(&mut rx);
    assert!(events.contains(&AccountEvent::ConnectionError("Could not log on".to_string())));
}

#[tokio::test]
async fn disconnect_during_login_cancels_the_pending_stage() {
    let transport = ScriptedTransport::new();
    transport.respond_with(
        HOST,
        "/main/authorization/doSignIn",
        302,
        &["xn_id_myapp=abc123"],
        Vec::new(),
    );
    // The homepage fetch never completes.
    transport.hang(HOST, "/");

    let (client, mut rx) = NingClient::new(config(), transport);
    let connecting = {
        let client = client.clone();
        tokio::spawn(async move { client.connect().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    client.disconnect().await;
    let result = connecting.await.unwrap();
    assert_eq!(
        result,
        Err(AccountError::Auth(AuthError::Http(HttpError::Cancelled)))
    );
    assert!(!client.is_connected());

    let events = drain(&mut rx);
    assert!(events.contains(&AccountEvent::ConnectionError("request cancelled".to_string())));
}
