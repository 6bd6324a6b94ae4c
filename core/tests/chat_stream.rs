#![allow(clippy::unwrap_used)]

use codediag_core::Chat;
use codediag_core::ChatGpt;
use codediag_core::ConsoleSink;
use codediag_core::DiagnosticError;
use codediag_core::Message;
use codediag_core::StreamEvent;
use core_test_support::TEST_API_KEY;
use core_test_support::delta_frame;
use core_test_support::mount_chat_completions;
use core_test_support::sse_body;
use core_test_support::sse_response;
use futures::StreamExt;
use pretty_assertions::assert_eq;
use std::time::Duration;
use tokio::time::timeout;
use wiremock::MockServer;
use wiremock::ResponseTemplate;

async fn collect(chat: &ChatGpt) -> Vec<StreamEvent> {
    let stream = chat.chat(vec![Message::user("why did it panic?")]);
    timeout(Duration::from_secs(10), stream.collect::<Vec<_>>())
        .await
        .unwrap()
}

fn client(server: &MockServer) -> ChatGpt {
    ChatGpt::new(TEST_API_KEY).with_base_url(server.uri())
}

#[tokio::test]
async fn streams_deltas_in_order() {
    let server = MockServer::start().await;
    mount_chat_completions(&server, sse_response(sse_body(&["A", "B"]))).await;

    assert_eq!(
        collect(&client(&server)).await,
        vec![
            StreamEvent::Data("A".into()),
            StreamEvent::Data("B".into()),
            StreamEvent::Done,
        ]
    );
}

#[tokio::test]
async fn sends_model_stream_flag_and_messages() {
    let server = MockServer::start().await;
    mount_chat_completions(&server, sse_response(sse_body(&["ok"]))).await;

    let chat = client(&server).with_model("gpt-4o-mini");
    collect(&chat).await;

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["stream"], true);
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"], "why did it panic?");
}

#[tokio::test]
async fn body_without_sentinel_ends_with_done() {
    let server = MockServer::start().await;
    let body = format!("{}{}", delta_frame("A"), delta_frame("B"));
    mount_chat_completions(&server, sse_response(body)).await;

    assert_eq!(
        collect(&client(&server)).await,
        vec![
            StreamEvent::Data("A".into()),
            StreamEvent::Data("B".into()),
            StreamEvent::Done,
        ]
    );
}

#[tokio::test]
async fn http_error_status_becomes_error_event() {
    let server = MockServer::start().await;
    mount_chat_completions(
        &server,
        ResponseTemplate::new(401).set_body_string(r#"{"error":{"message":"bad key"}}"#),
    )
    .await;

    let events = collect(&client(&server)).await;
    assert_eq!(events.len(), 1);
    match &events[0] {
        StreamEvent::Error(message) => {
            assert!(message.contains("401"), "{message}");
            assert!(message.contains("bad key"), "{message}");
        }
        other => panic!("expected error event, got {other:?}"),
    }
}

#[tokio::test]
async fn upstream_error_payload_becomes_error_event() {
    let server = MockServer::start().await;
    let body = "data: {\"error\":{\"message\":\"model overloaded\"}}\n\n";
    mount_chat_completions(&server, sse_response(body)).await;

    assert_eq!(
        collect(&client(&server)).await,
        vec![StreamEvent::Error("model overloaded".into())]
    );
}

#[tokio::test]
async fn unreachable_backend_becomes_error_event() {
    let chat = ChatGpt::new(TEST_API_KEY).with_base_url("http://127.0.0.1:9");
    let events = collect(&chat).await;

    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], StreamEvent::Error(m) if m.starts_with("request failed")));
}

#[tokio::test]
async fn console_sink_prints_streamed_answer() {
    let server = MockServer::start().await;
    mount_chat_completions(&server, sse_response(sse_body(&["Divide ", "by ", "zero."]))).await;

    let mut sink = ConsoleSink::new(Vec::new());
    sink.drain(client(&server).chat(vec![Message::user("diagnose")]))
        .await
        .unwrap();
    assert_eq!(String::from_utf8(sink.into_inner()).unwrap(), "Divide by zero.\n");
}

#[tokio::test]
async fn console_sink_reports_backend_error() {
    let server = MockServer::start().await;
    mount_chat_completions(&server, ResponseTemplate::new(500)).await;

    let mut sink = ConsoleSink::new(Vec::new());
    let err = sink
        .drain(client(&server).chat(vec![Message::user("diagnose")]))
        .await
        .unwrap_err();
    assert!(matches!(err, DiagnosticError::Transport(_)));
}
