//! Integration tests for the Gemini provider using wiremock.

use std::time::Duration;

use futures::StreamExt;
use murmur_provider_gemini::Gemini;
use murmur_types::{ChatError, ChatProvider, ChatRequest, Content, StreamEvent, StreamErrorKind};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STREAM_PATH: &str = "/models/gemini-2.0-flash:streamGenerateContent";

fn chunk(text: &str) -> String {
    serde_json::json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
    })
    .to_string()
}

/// A body framed the way the endpoint frames it: a JSON array, one element
/// per line.
fn array_body(chunks: &[String]) -> String {
    format!("[{}]", chunks.join(",\r\n"))
}

fn client(server: &MockServer) -> Gemini {
    Gemini::new("test-key").base_url(server.uri())
}

async fn collect(client: &Gemini, request: ChatRequest) -> Vec<StreamEvent> {
    let handle = client.stream_chat(request).await.expect("should succeed");
    handle.receiver.collect().await
}

fn deltas(events: &[StreamEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::TextDelta(t) => Some(t.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn stream_sends_to_correct_endpoint_with_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .and(query_param("key", "test-key"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(array_body(&[chunk("hi")])))
        .expect(1)
        .mount(&server)
        .await;

    let events = collect(&client(&server), ChatRequest::new("Hello")).await;
    assert_eq!(deltas(&events), vec!["hi"]);
}

#[tokio::test]
async fn stream_request_body_has_user_turn() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .and(body_json(serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": "Hello" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&server)
        .await;

    collect(&client(&server), ChatRequest::new("Hello")).await;
}

#[tokio::test]
async fn stream_request_body_includes_history() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .and(body_json(serde_json::json!({
            "contents": [
                { "role": "user", "parts": [{ "text": "What is Rust?" }] },
                { "role": "model", "parts": [{ "text": "A language." }] },
                { "role": "user", "parts": [{ "text": "Who made it?" }] }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&server)
        .await;

    let request = ChatRequest::new("Who made it?").with_history(vec![
        Content::user("What is Rust?"),
        Content::model("A language."),
    ]);
    collect(&client(&server), request).await;
}

#[tokio::test]
async fn stream_returns_text_deltas_in_order() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(array_body(&[chunk("Hel"), chunk("lo")])),
        )
        .mount(&server)
        .await;

    let events = collect(&client(&server), ChatRequest::new("Hello")).await;

    assert_eq!(deltas(&events), vec!["Hel", "lo"]);
    assert_eq!(
        events.last(),
        Some(&StreamEvent::MessageComplete("Hello".into()))
    );
}

#[tokio::test]
async fn stream_skips_chunk_without_text() {
    let server = MockServer::start().await;

    let finish = serde_json::json!({
        "candidates": [{ "finishReason": "STOP" }]
    })
    .to_string();
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(array_body(&[
            chunk("a"),
            finish,
            chunk("b"),
        ])))
        .mount(&server)
        .await;

    let events = collect(&client(&server), ChatRequest::new("Hello")).await;
    assert_eq!(deltas(&events), vec!["a", "b"]);
}

#[tokio::test]
async fn stream_skips_malformed_chunk() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(array_body(&[
            chunk("a"),
            "{\"candidates\": [oops]}".to_string(),
            chunk("b"),
        ])))
        .mount(&server)
        .await;

    let events = collect(&client(&server), ChatRequest::new("Hello")).await;
    assert_eq!(deltas(&events), vec!["a", "b"]);
    assert_eq!(
        events.last(),
        Some(&StreamEvent::MessageComplete("ab".into()))
    );
}

#[tokio::test]
async fn stream_text_with_braces_and_quotes() {
    let server = MockServer::start().await;

    let tricky = r#"fn main() { println!("}{\"") }"#;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(array_body(&[chunk(tricky), chunk(" done")])),
        )
        .mount(&server)
        .await;

    let events = collect(&client(&server), ChatRequest::new("code")).await;
    assert_eq!(deltas(&events), vec![tricky, " done"]);
}

#[tokio::test]
async fn stream_reports_usage() {
    let server = MockServer::start().await;

    let last = serde_json::json!({
        "candidates": [{ "content": { "parts": [{ "text": "!" }] }, "finishReason": "STOP" }],
        "usageMetadata": { "promptTokenCount": 5, "candidatesTokenCount": 2, "totalTokenCount": 7 }
    })
    .to_string();
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(array_body(&[chunk("Hi"), last])))
        .mount(&server)
        .await;

    let events = collect(&client(&server), ChatRequest::new("Hello")).await;
    let usage = events.iter().find_map(|e| match e {
        StreamEvent::Usage(u) => Some(*u),
        _ => None,
    });
    let usage = usage.expect("expected Usage event");
    assert_eq!(usage.prompt_tokens, 5);
    assert_eq!(usage.response_tokens, 2);
    assert_eq!(usage.total_tokens, 7);
}

#[tokio::test]
async fn stream_with_empty_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;

    let events = collect(&client(&server), ChatRequest::new("Hello")).await;
    assert_eq!(events, vec![StreamEvent::MessageComplete(String::new())]);
}

#[tokio::test]
async fn stream_returns_error_on_500() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("server error"))
        .mount(&server)
        .await;

    let err = client(&server)
        .stream_chat(ChatRequest::new("Hello"))
        .await
        .unwrap_err();

    match err {
        ChatError::Http { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "server error");
        }
        other => panic!("expected Http, got: {other:?}"),
    }
}

#[tokio::test]
async fn stream_returns_error_on_400() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("API key not valid"))
        .mount(&server)
        .await;

    let err = client(&server)
        .stream_chat(ChatRequest::new("Hello"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn missing_key_never_reaches_server() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(0)
        .mount(&server)
        .await;

    let err = Gemini::new("")
        .base_url(server.uri())
        .stream_chat(ChatRequest::new("Hello"))
        .await
        .unwrap_err();

    assert!(matches!(err, ChatError::Configuration(_)), "got: {err:?}");
}

#[tokio::test]
async fn slow_headers_time_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("[]")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .timeout(Duration::from_millis(100))
        .stream_chat(ChatRequest::new("Hello"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, ChatError::Timeout(d) if d == Duration::from_millis(100)),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn cancel_during_request_aborts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("[]")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let request = ChatRequest::new("Hello");
    let token = request.cancellation_token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let err = client(&server)
        .no_timeout()
        .stream_chat(request)
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Cancelled), "got: {err:?}");
}

/// Serve one connection: answer with a 500 whose body never finishes.
async fn stalled_error_body_server() -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.ends_with(b"}]}]}") {
            let n = socket.read(&mut buf).await.expect("read request");
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }
        socket
            .write_all(
                b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\n\r\npartial",
            )
            .await
            .expect("write head");
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(socket);
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn cancel_while_reading_error_body() {
    let base_url = stalled_error_body_server().await;

    let request = ChatRequest::new("Hello");
    let token = request.cancellation_token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    let client = Gemini::new("test-key")
        .base_url(base_url)
        .timeout(Duration::from_secs(20));
    let err = tokio::time::timeout(Duration::from_secs(5), client.stream_chat(request))
        .await
        .expect("cancellation should not wait for the idle timeout")
        .unwrap_err();
    assert!(matches!(err, ChatError::Cancelled), "got: {err:?}");
}

#[tokio::test]
async fn cancel_after_headers_ends_stream() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(array_body(&[chunk("x")])))
        .mount(&server)
        .await;

    let request = ChatRequest::new("Hello");
    let token = request.cancellation_token.clone();
    let handle = client(&server)
        .stream_chat(request)
        .await
        .expect("headers received");

    token.cancel();
    let events: Vec<StreamEvent> = handle.receiver.collect().await;
    assert_eq!(events.len(), 1);
    assert!(
        matches!(&events[0], StreamEvent::Error(e) if e.kind == StreamErrorKind::Cancelled),
        "got: {events:?}"
    );
}

#[tokio::test]
async fn clients_are_isolated() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;

    for (server, text) in [(&first, "one"), (&second, "two")] {
        Mock::given(method("POST"))
            .and(path(STREAM_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(array_body(&[chunk(text)])))
            .expect(1)
            .mount(server)
            .await;
    }

    let a = collect(&client(&first), ChatRequest::new("?")).await;
    let b = collect(&client(&second), ChatRequest::new("?")).await;
    assert_eq!(deltas(&a), vec!["one"]);
    assert_eq!(deltas(&b), vec!["two"]);
}

#[test]
fn from_env_always_builds() {
    let client = Gemini::from_env();
    assert!(format!("{client:?}").contains("gemini-2.0-flash"));
}
