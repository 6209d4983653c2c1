//! Tests for ApiClient against a local one-shot HTTP responder.

use super::*;
use crate::api::types::Visibility;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use tempfile::TempDir;

/// A request captured by the responder.
struct CapturedRequest {
    request_line: String,
    headers: Vec<String>,
    body: String,
}

/// Serves exactly one HTTP response on a random local port.
///
/// Returns the base URL and a receiver for the captured request.
fn serve_once(status: u16, body: &'static str) -> (String, mpsc::Receiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();

    std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();

        let mut headers = Vec::new();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end().to_string();
            if line.is_empty() {
                break;
            }
            if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = value.trim().parse().unwrap();
            }
            headers.push(line);
        }

        let mut body_bytes = vec![0u8; content_length];
        reader.read_exact(&mut body_bytes).unwrap();

        let reason = if status == 200 { "OK" } else { "Error" };
        let response = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            reason,
            body.len(),
            body
        );
        let mut stream = stream;
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();

        let _ = tx.send(CapturedRequest {
            request_line: request_line.trim_end().to_string(),
            headers,
            body: String::from_utf8(body_bytes).unwrap(),
        });
    });

    (format!("http://{}", addr), rx)
}

fn logged_in(instance: &str) -> ApiClient {
    ApiClient::new(
        Credentials {
            instance: Some(instance.to_string()),
            access_token: Some("test-token".to_string()),
            account_id: None,
        },
        Duration::from_secs(5),
    )
}

const ACCOUNT_JSON: &str = r#"{"id":"7","username":"alice","acct":"alice","display_name":"Alice","url":"https://example.social/@alice","followers_count":1,"following_count":2,"statuses_count":3}"#;

#[tokio::test]
async fn test_calls_without_login_fail() {
    let client = ApiClient::new(Credentials::default(), Duration::from_secs(5));

    assert_eq!(
        client.verify_credentials().await.unwrap_err(),
        ServiceError::NotAuthenticated
    );
    assert_eq!(
        client.get_account("1".to_string()).await.unwrap_err(),
        ServiceError::NotAuthenticated
    );
    assert_eq!(
        client
            .create_status(StatusDraft::new("hi"))
            .await
            .unwrap_err(),
        ServiceError::NotAuthenticated
    );
}

#[tokio::test]
async fn test_verify_credentials_sends_bearer_token() {
    let (base, rx) = serve_once(200, ACCOUNT_JSON);
    let client = logged_in(&base);

    let account = client.verify_credentials().await.unwrap();
    assert_eq!(account.id, "7");
    assert_eq!(account.username, "alice");

    let request = rx.recv().unwrap();
    assert_eq!(
        request.request_line,
        "GET /api/v1/accounts/verify_credentials HTTP/1.1"
    );
    assert!(request
        .headers
        .iter()
        .any(|h| h.eq_ignore_ascii_case("authorization: Bearer test-token")));
}

#[tokio::test]
async fn test_get_account_maps_http_status() {
    let (base, _rx) = serve_once(404, r#"{"error":"Record not found"}"#);
    let client = logged_in(&base);

    let err = client.get_account("999".to_string()).await.unwrap_err();
    assert_eq!(err, ServiceError::Http { status: 404 });
}

#[tokio::test]
async fn test_create_status_posts_json_body() {
    let (base, rx) = serve_once(
        200,
        r#"{"id":"55","url":null,"content":"<p>hello</p>","created_at":"2026-01-01T00:00:00Z","visibility":"unlisted"}"#,
    );
    let client = logged_in(&base);

    let mut draft = StatusDraft::new("hello");
    draft.visibility = Visibility::Unlisted;
    let status = client.create_status(draft).await.unwrap();
    assert_eq!(status.id, "55");
    assert_eq!(status.visibility, Visibility::Unlisted);
    assert_eq!(status.url, None);

    let request = rx.recv().unwrap();
    assert_eq!(request.request_line, "POST /api/v1/statuses HTTP/1.1");
    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["status"], "hello");
    assert_eq!(body["visibility"], "unlisted");
}

#[tokio::test]
async fn test_undecodable_response_is_decode_error() {
    let (base, _rx) = serve_once(200, r#"{"unexpected":true}"#);
    let client = logged_in(&base);

    let err = client.verify_credentials().await.unwrap_err();
    assert!(matches!(err, ServiceError::Decode { .. }));
}

#[tokio::test]
async fn test_update_authentication_persists_and_clears_account() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("credentials.json");
    let client = ApiClient::new(
        Credentials {
            instance: Some("https://old.example".to_string()),
            access_token: Some("old".to_string()),
            account_id: Some("1".to_string()),
        },
        Duration::from_secs(5),
    )
    .with_credentials_path(path.clone());

    client
        .update_authentication("new.example/".to_string(), "new-token".to_string())
        .await
        .unwrap();

    let info = client.auth_info().await;
    assert_eq!(info.instance.as_deref(), Some("https://new.example"));
    assert_eq!(info.account_id, None);
    assert!(info.has_token);

    client
        .update_current_account_id("42".to_string())
        .await
        .unwrap();

    let saved = Credentials::load(&path).unwrap();
    assert_eq!(saved.instance.as_deref(), Some("https://new.example"));
    assert_eq!(saved.access_token.as_deref(), Some("new-token"));
    assert_eq!(saved.account_id.as_deref(), Some("42"));
}

#[tokio::test]
async fn test_failed_persist_leaves_auth_state_unchanged() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not-a-dir");
    std::fs::write(&blocker, "").unwrap();
    let client = ApiClient::new(
        Credentials {
            instance: Some("https://old.example".to_string()),
            access_token: Some("old".to_string()),
            account_id: Some("1".to_string()),
        },
        Duration::from_secs(5),
    )
    .with_credentials_path(blocker.join("credentials.json"));

    let err = client
        .update_authentication("example.social".to_string(), "tok".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Io { .. }));

    let err = client
        .update_current_account_id("42".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Io { .. }));

    let info = client.auth_info().await;
    assert_eq!(info.instance.as_deref(), Some("https://old.example"));
    assert_eq!(info.account_id.as_deref(), Some("1"));
    assert!(info.has_token);
    assert_eq!(
        client.authorized().await.unwrap(),
        ("https://old.example".to_string(), "old".to_string())
    );
}

#[tokio::test]
async fn test_get_account_encodes_id_into_one_segment() {
    let (base, rx) = serve_once(200, ACCOUNT_JSON);
    let client = logged_in(&base);

    client.get_account("../statuses".to_string()).await.unwrap();

    let request = rx.recv().unwrap();
    assert_eq!(
        request.request_line,
        "GET /api/v1/accounts/..%2Fstatuses HTTP/1.1"
    );
}

#[tokio::test]
async fn test_concurrent_readers_see_consistent_state() {
    let client = std::sync::Arc::new(logged_in("https://example.social"));

    let mut handles = Vec::new();
    for i in 0..10 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            if i % 5 == 0 {
                client
                    .update_current_account_id(format!("acct-{}", i))
                    .await
                    .unwrap();
            }
            client.auth_info().await
        }));
    }

    for handle in handles {
        let info = handle.await.unwrap();
        assert_eq!(info.instance.as_deref(), Some("https://example.social"));
        assert!(info.has_token);
    }
}

#[test]
fn test_normalize_instance() {
    assert_eq!(normalize_instance("example.social"), "https://example.social");
    assert_eq!(
        normalize_instance("http://localhost:3000/"),
        "http://localhost:3000"
    );
    assert_eq!(
        normalize_instance(" https://example.social "),
        "https://example.social"
    );
}
