//! REST client tests against a one-shot local HTTP responder, plus history
//! seeding through the controller.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use docchat::api::ApiClient;
use docchat::chat::ChatController;
use docchat::history::HistoryOutcome;
use docchat::ChatError;

/// Serve exactly one request with `status` and a JSON `body`. The request
/// head (request line and headers) is handed back for inspection.
async fn serve_once(status: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (head_tx, head_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let _ = head_tx.send(String::from_utf8_lossy(&buf).into_owned());
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        let _ = stream.shutdown().await;
    });

    (format!("http://{}", addr), head_rx)
}

const TWO_TURNS: &str = r#"[
  {"id": 7, "session_id": "abc", "user_query": "first?", "model_response": [{"type": "paragraph", "content": "one"}], "model": "m", "created_at": "2024-05-01T10:00:00"},
  {"id": 8, "session_id": "abc", "user_query": "second?", "model_response": [{"type": "heading", "content": "T"}, {"type": "bullet", "content": "two"}], "model": "m", "created_at": "2024-05-01T10:01:00"}
]"#;

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_list_collections_parses_names() {
    let (base, head) = serve_once("200 OK", r#"["handbook","manuals"]"#).await;
    let names = ApiClient::new(base).list_collections().await.unwrap();
    assert_eq!(names, vec!["handbook".to_string(), "manuals".to_string()]);
    assert!(head.await.unwrap().starts_with("GET /list-collections "));
}

#[tokio::test]
async fn test_application_logs_query_is_encoded() {
    let (base, head) = serve_once("200 OK", "[]").await;
    let logs = ApiClient::new(base).application_logs_for("a b &c").await.unwrap();
    assert!(logs.is_empty());
    assert!(head
        .await
        .unwrap()
        .starts_with("GET /get-application-logs?session_id=a+b+%26c "));
}

#[tokio::test]
async fn test_delete_application_logs_uses_post() {
    let (base, head) = serve_once("200 OK", "[]").await;
    ApiClient::new(base).delete_application_logs("abc").await.unwrap();
    assert!(head
        .await
        .unwrap()
        .starts_with("POST /delete-application-logs?session_id=abc "));
}

#[tokio::test]
async fn test_empty_session_id_sends_no_query() {
    let (base, head) = serve_once("200 OK", "[]").await;
    ApiClient::new(base).application_logs_for("").await.unwrap();
    assert!(head.await.unwrap().starts_with("GET /get-application-logs "));
}

#[tokio::test]
async fn test_non_success_status_is_http_error() {
    let (base, _head) = serve_once("500 Internal Server Error", r#"{"detail":"boom"}"#).await;
    let err = ApiClient::new(base.clone()).list_documents().await.unwrap_err();
    match err {
        ChatError::Http { status, url } => {
            assert_eq!(status, 500);
            assert_eq!(url, format!("{}/list-docs", base));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body_is_protocol_error() {
    let (base, _head) = serve_once("200 OK", r#"{"not":"a list"}"#).await;
    let err = ApiClient::new(base).list_collections().await.unwrap_err();
    assert!(matches!(err, ChatError::Protocol(_)));
}

// ---------------------------------------------------------------------------
// History seeding through the controller
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_resumed_session_is_seeded_from_logs() {
    let (base, _head) = serve_once("200 OK", TWO_TURNS).await;
    let api = ApiClient::new(base);
    let (mut chat, _events) = ChatController::new(None, None, Some("abc".into()));

    assert!(chat.mount());
    let outcome = chat.load_history(&api).await;
    assert_eq!(outcome, Some(HistoryOutcome::Seeded(4)));

    let messages = chat.messages();
    assert_eq!(messages.len(), 4);
    assert!(messages[0].is_user);
    assert_eq!(messages[0].plain_text(), "first?");
    assert_eq!(messages[1].id, "7-response-completed");
    assert_eq!(messages[3].content.len(), 2);
    assert!(!chat.is_streaming());
    assert_eq!(chat.session_id(), Some("abc"));
}

#[tokio::test]
async fn test_resumed_session_without_logs_starts_fresh() {
    let (base, _head) = serve_once("200 OK", "[]").await;
    let api = ApiClient::new(base);
    let (mut chat, _events) = ChatController::new(None, None, Some("gone".into()));

    chat.mount();
    assert_eq!(chat.load_history(&api).await, Some(HistoryOutcome::StaleSession));
    assert!(chat.messages().is_empty());
    assert_ne!(chat.session_id(), Some("gone"));
}

#[tokio::test]
async fn test_history_failure_leaves_one_error_message() {
    let (base, _head) = serve_once("404 Not Found", r#"{"detail":"nope"}"#).await;
    let api = ApiClient::new(base);
    let (mut chat, _events) = ChatController::new(None, None, Some("abc".into()));

    chat.mount();
    let outcome = chat.load_history(&api).await;
    assert!(matches!(outcome, Some(HistoryOutcome::Failed(_))));
    assert_eq!(chat.messages().len(), 1);
    assert!(chat.messages()[0]
        .plain_text()
        .starts_with("Failed to load chat history"));
    assert_eq!(chat.session_id(), Some("abc"));
}
