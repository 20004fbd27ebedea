//! End-to-end runs against a local stand-in for the Gmail REST API.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread;

use mailhub::Error;
use mailhub::app::MailHub;
use mailhub::config::Config;
use mailhub::domain::Sender;
use mailhub::store::SqliteStore;
use tiny_http::{Response, Server};
use url::Url;

type Seen = Arc<Mutex<Vec<(String, Option<String>)>>>;

fn message_json(id: &str, from: &str, subject: &str) -> String {
    serde_json::json!({
        "id": id,
        "threadId": format!("t{id}"),
        "labelIds": ["INBOX"],
        "snippet": format!("snippet {id}"),
        "internalDate": "1700000000000",
        "payload": {
            "headers": [
                {"name": "From", "value": from},
                {"name": "Subject", "value": subject},
                {"name": "Date", "value": "Tue, 14 Nov 2023 22:13:20 +0000"}
            ]
        }
    })
    .to_string()
}

fn list_json(ids: &[&str]) -> String {
    let messages: Vec<_> = ids
        .iter()
        .map(|id| serde_json::json!({"id": id, "threadId": format!("t{id}")}))
        .collect();
    serde_json::json!({"messages": messages, "resultSizeEstimate": ids.len()}).to_string()
}

fn route(path: &str, query: &HashMap<String, String>) -> (u16, String) {
    if path == "/gmail/v1/users/me/messages" {
        let body = match query.get("q").map(String::as_str) {
            None => list_json(&["1", "2", "3", "4"]),
            Some("from:a@x.com") => list_json(&["1", "2"]),
            Some("from:bad@z.com") => list_json(&["1", "4"]),
            Some("from:broken@z.com") => r#"{"messages": [{"threadId": "x"}]}"#.to_string(),
            Some(_) => r#"{"resultSizeEstimate": 0}"#.to_string(),
        };
        return (200, body);
    }

    match path.rsplit('/').next() {
        Some("1") => (200, message_json("1", "\"Alice\" <a@x.com>", "First")),
        Some("2") => (200, message_json("2", "Alice <A@X.com>", "Second")),
        Some("3") => (200, message_json("3", "bob@y.com", "Third")),
        _ => (
            500,
            r#"{"error": {"code": 500, "message": "Backend Error"}}"#.to_string(),
        ),
    }
}

/// Serves Gmail-shaped responses until the test process exits.
fn fake_gmail() -> (String, Seen) {
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let server = Server::http(SocketAddr::from((Ipv4Addr::LOCALHOST, port))).unwrap();
    let seen: Seen = Arc::new(Mutex::new(vec![]));
    let log = seen.clone();

    thread::spawn(move || {
        for request in server.incoming_requests() {
            let auth = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("Authorization"))
                .map(|h| h.value.as_str().to_string());
            log.lock().unwrap().push((request.url().to_string(), auth));

            let url = Url::parse(&format!("http://localhost{}", request.url())).unwrap();
            let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
            let (status, body) = route(url.path(), &query);
            let _ = request.respond(Response::from_string(body).with_status_code(status));
        }
    });

    (format!("http://127.0.0.1:{port}/gmail/v1"), seen)
}

fn open_hub(base: &str, db: &std::path::Path) -> MailHub {
    let cfg = Config {
        api_base_url: Some(base.to_string()),
        ..Config::default()
    };
    MailHub::with_store(cfg, Arc::new(SqliteStore::open(db).unwrap()))
}

fn query_of(url: &str) -> Vec<(String, String)> {
    Url::parse(&format!("http://localhost{url}"))
        .unwrap()
        .query_pairs()
        .into_owned()
        .collect()
}

#[test]
fn login_then_rank_senders() {
    let (base, seen) = fake_gmail();
    let dir = tempfile::tempdir().unwrap();
    let mut hub = open_hub(&base, &dir.path().join("mailhub.db"));

    assert!(!hub.is_authenticated());
    assert!(matches!(hub.senders(20), Err(Error::NotAuthenticated)));
    assert!(seen.lock().unwrap().is_empty());

    hub.complete_login("#access_token=tok123&token_type=Bearer&expires_in=3599")
        .unwrap();
    assert!(hub.is_authenticated());

    let senders = hub.senders(100).unwrap();
    assert_eq!(
        senders,
        vec![
            Sender {
                address: "a@x.com".into(),
                name: "Alice".into(),
                count: 2
            },
            Sender {
                address: "bob@y.com".into(),
                name: "bob@y.com".into(),
                count: 1
            },
        ]
    );

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 5, "one listing plus four detail fetches");
    assert!(
        seen.iter()
            .all(|(_, auth)| auth.as_deref() == Some("Bearer tok123"))
    );

    let list_q = query_of(&seen[0].0);
    assert!(list_q.contains(&("labelIds".into(), "INBOX".into())));
    assert!(list_q.contains(&("maxResults".into(), "100".into())));

    let detail_q = query_of(&seen[1].0);
    assert!(detail_q.contains(&("format".into(), "metadata".into())));
    for h in ["From", "Subject", "Date", "To"] {
        assert!(detail_q.contains(&("metadataHeaders".into(), h.into())));
    }
}

#[test]
fn messages_from_one_sender() {
    let (base, seen) = fake_gmail();
    let dir = tempfile::tempdir().unwrap();
    let mut hub = open_hub(&base, &dir.path().join("mailhub.db"));
    hub.complete_login("access_token=tok").unwrap();

    let msgs = hub.messages_from("a@x.com", 50).unwrap();
    let subjects: Vec<_> = msgs.iter().map(|m| m.subject().unwrap()).collect();
    assert_eq!(subjects, vec!["First", "Second"]);
    assert_eq!(msgs[0].internal_date, 1_700_000_000_000);

    let list_q = query_of(&seen.lock().unwrap()[0].0);
    assert!(list_q.contains(&("q".into(), "from:a@x.com".into())));
}

#[test]
fn one_failing_detail_fails_the_sender_view() {
    let (base, _) = fake_gmail();
    let dir = tempfile::tempdir().unwrap();
    let mut hub = open_hub(&base, &dir.path().join("mailhub.db"));
    hub.complete_login("access_token=tok").unwrap();

    match hub.messages_from("bad@z.com", 50) {
        Err(Error::Provider(msg)) => assert!(msg.contains("Backend Error"), "{msg}"),
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[test]
fn malformed_listing_is_rejected() {
    let (base, _) = fake_gmail();
    let dir = tempfile::tempdir().unwrap();
    let mut hub = open_hub(&base, &dir.path().join("mailhub.db"));
    hub.complete_login("access_token=tok").unwrap();

    assert!(matches!(
        hub.messages_from("broken@z.com", 50),
        Err(Error::Provider(_))
    ));
}

#[test]
fn unknown_sender_has_no_messages() {
    let (base, _) = fake_gmail();
    let dir = tempfile::tempdir().unwrap();
    let mut hub = open_hub(&base, &dir.path().join("mailhub.db"));
    hub.complete_login("access_token=tok").unwrap();

    assert!(hub.messages_from("nobody@z.com", 50).unwrap().is_empty());
}

#[test]
fn session_and_favorites_survive_reopen_until_logout() {
    let (base, _) = fake_gmail();
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("mailhub.db");

    {
        let mut hub = open_hub(&base, &db);
        hub.complete_login("access_token=tok").unwrap();
        assert!(hub.toggle_favorite("a@x.com"));
    }

    let mut hub = open_hub(&base, &db);
    assert!(hub.is_authenticated());
    assert!(hub.favorites().contains("a@x.com"));

    hub.logout();
    assert!(!hub.is_authenticated());

    let hub = open_hub(&base, &db);
    assert!(!hub.is_authenticated());
    assert!(hub.favorites().is_empty());
}

#[test]
fn unopenable_database_still_reaches_login() {
    let (base, _) = fake_gmail();
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, "x").unwrap();

    let cfg = Config {
        api_base_url: Some(base),
        db_path: Some(blocker.join("mailhub.db").display().to_string()),
        ..Config::default()
    };
    let mut hub = MailHub::open(cfg);
    assert!(!hub.is_authenticated());

    hub.complete_login("access_token=tok").unwrap();
    assert_eq!(hub.messages_from("a@x.com", 50).unwrap().len(), 2);
}

#[test]
fn provider_error_redirect_is_surfaced() {
    let (base, _) = fake_gmail();
    let dir = tempfile::tempdir().unwrap();
    let mut hub = open_hub(&base, &dir.path().join("mailhub.db"));

    match hub.complete_login("#error=access_denied") {
        Err(Error::Authorization(raw)) => assert_eq!(raw, "access_denied"),
        other => panic!("expected authorization error, got {other:?}"),
    }
    assert!(!hub.is_authenticated());
}
