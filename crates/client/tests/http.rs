use convoq_client::{
    AnalysisService, AuthToken, ChatUpload, ClientConfig, ClientError, HttpAnalysisService,
};
use convoq_protocol::{AnalysisId, DateFormat, DeepAnalysisRequest};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        let Some(head_end) = text.find("\r\n\r\n") else {
            continue;
        };
        let head = text[..head_end].to_ascii_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok());
        match content_length {
            Some(len) if buf.len() - head_end - 4 >= len => break,
            Some(_) => continue,
            None if head.contains("transfer-encoding: chunked") => {
                if text.ends_with("0\r\n\r\n") {
                    break;
                }
            }
            None => break,
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Accepts one connection, answers it with `status` and `body`, and yields
/// the raw request text.
async fn one_shot(
    status: &'static str,
    content_type: &'static str,
    body: String,
) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_request(&mut stream).await;
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
        request
    });
    (format!("http://{addr}"), handle)
}

async fn json_reply(status: &'static str, body: Value) -> (String, JoinHandle<String>) {
    one_shot(status, "application/json", body.to_string()).await
}

fn service(base_url: &str, token: Option<&str>) -> HttpAnalysisService {
    let config = ClientConfig::default()
        .with_base_url(base_url)
        .with_auth_token(AuthToken::parse(token).unwrap())
        .with_timeout(Duration::from_secs(10));
    HttpAnalysisService::new(config).unwrap()
}

#[tokio::test]
async fn fast_upload_is_multipart_with_bearer_token() {
    let (base_url, server) = json_reply(
        "200 OK",
        json!({"total_messages": 3, "participants": ["Alex"], "cache_key": "abc123", "analysis_id": 41}),
    )
    .await;

    let upload = ChatUpload::new("export.txt", "1/2/24, 9:00 PM - Alex: hi");
    let fast = service(&base_url, Some("tok"))
        .analyze_fast(&upload, DateFormat::DayMonthLongYear)
        .await
        .unwrap();
    assert_eq!(fast.cache_key.as_deref(), Some("abc123"));
    assert_eq!(fast.analysis_id, Some(AnalysisId::new("41")));

    let request = server.await.unwrap();
    let lower = request.to_ascii_lowercase();
    assert!(request.starts_with("POST /analyze/fast HTTP/1.1\r\n"), "{request}");
    assert!(lower.contains("authorization: bearer tok\r\n"), "{request}");
    assert!(lower.contains("content-type: multipart/form-data; boundary="));
    assert!(request.contains("name=\"file\"; filename=\"export.txt\""));
    assert!(request.contains("9:00 PM - Alex: hi"));
    assert!(request.contains("name=\"date_format\"\r\n\r\ndd/mm/yyyy\r\n"));
}

#[tokio::test]
async fn deep_request_posts_correlation_keys_as_json() {
    let (base_url, server) = json_reply(
        "200 OK",
        json!({"coach_summary": "steady", "trend_analysis": {"decision": "Stable"}}),
    )
    .await;

    let request = DeepAnalysisRequest {
        cache_key: "abc123".to_string(),
        analysis_id: AnalysisId::new("41"),
    };
    let deep = service(&base_url, None).analyze_deep(&request).await.unwrap();
    assert_eq!(deep.coach_summary.as_deref(), Some("steady"));

    let raw = server.await.unwrap();
    assert!(raw.starts_with("POST /analyze/deep HTTP/1.1\r\n"), "{raw}");
    assert!(!raw.to_ascii_lowercase().contains("authorization:"));
    let body = &raw[raw.find("\r\n\r\n").unwrap() + 4..];
    assert_eq!(
        serde_json::from_str::<Value>(body).unwrap(),
        json!({"cache_key": "abc123", "analysis_id": "41"})
    );
}

#[tokio::test]
async fn history_and_usage_are_plain_gets() {
    let (base_url, server) = json_reply(
        "200 OK",
        json!([{"id": 7, "total_messages": 88, "created_at": "2024-03-30T12:00:00"}]),
    )
    .await;
    let history = service(&base_url, Some("tok")).history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].total_messages, Some(88));
    let raw = server.await.unwrap();
    assert!(raw.starts_with("GET /history HTTP/1.1\r\n"), "{raw}");
    assert!(raw.to_ascii_lowercase().contains("authorization: bearer tok\r\n"));

    let (base_url, server) = json_reply(
        "200 OK",
        json!({
            "rate_limiting": {"requests_this_minute": 1, "minute_limit": 5, "requests_today": 9, "daily_limit": 100},
            "token_counting": {"tokens_used_today": 10, "daily_limit": 1000, "usage_percentage": 1.0}
        }),
    )
    .await;
    let usage = service(&base_url, None).usage().await.unwrap();
    assert_eq!(usage.rate_limiting.requests_today, 9);
    assert!(server.await.unwrap().starts_with("GET /usage HTTP/1.1\r\n"));
}

#[tokio::test]
async fn error_detail_comes_from_json_body() {
    let (base_url, server) =
        json_reply("429 Too Many Requests", json!({"detail": "Rate limit exceeded"})).await;
    let err = service(&base_url, Some("tok")).history().await.unwrap_err();
    server.await.unwrap();
    match err {
        ClientError::Status { status, detail } => {
            assert_eq!(status, 429);
            assert_eq!(detail, "Rate limit exceeded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn error_detail_falls_back_to_raw_body() {
    let (base_url, server) =
        one_shot("502 Bad Gateway", "text/plain", "upstream down\n".to_string()).await;
    let err = service(&base_url, None).usage().await.unwrap_err();
    server.await.unwrap();
    assert!(
        matches!(&err, ClientError::Status { status: 502, detail } if detail == "upstream down"),
        "{err:?}"
    );
}

#[tokio::test]
async fn malformed_success_body_is_a_decode_error() {
    let (base_url, server) = json_reply("200 OK", json!({"rate_limiting": "nope"})).await;
    let err = service(&base_url, None).usage().await.unwrap_err();
    server.await.unwrap();
    assert!(matches!(err, ClientError::Decode(_)), "{err:?}");
}
