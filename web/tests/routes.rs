#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::Body;
use axum::body::to_bytes;
use axum::http::Request;
use axum::http::StatusCode;
use codediag_core::CallSite;
use codediag_core::Chat;
use codediag_core::DiagnosticContext;
use codediag_core::Failure;
use codediag_core::Role;
use codediag_core::SessionConfig;
use codediag_core::StreamEvent;
use codediag_web::WebState;
use codediag_web::create_app;
use core_test_support::ScriptedChat;
use core_test_support::write_source;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const MATH: &str = "pub struct Calc(i32);\n\nimpl Calc {\n    pub fn div(&self, b: i32) -> i32 {\n        self.0 / b\n    }\n}\n\npub fn run() -> i32 {\n    Calc(1).div(0)\n}\n";

const STACK: &str = "   0: core::panicking::panic_const::panic_const_div_by_zero\n             at /rustc/x/library/core/src/panicking.rs:175:17\n   1: app::math::Calc::div\n             at src/math.rs:5:9\n   2: app::math::run\n             at src/math.rs:10:5\n";

struct Fixture {
    _dir: TempDir,
    chat: Arc<ScriptedChat>,
    app: Router,
}

fn fixture(chat: ScriptedChat) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(dir.path(), "src/math.rs", MATH);
    let ctx = Arc::new(DiagnosticContext::new(dir.path(), SessionConfig::default()));
    let failure = Failure {
        message: "attempt to divide by zero".into(),
        stack: STACK.into(),
        call_sites: vec![
            CallSite {
                qualified_name: "app::math::Calc::div".into(),
                file: file.clone(),
                line: 5,
            },
            CallSite {
                qualified_name: "app::math::run".into(),
                file,
                line: 10,
            },
        ],
    };

    let chat = Arc::new(chat);
    let backend: Arc<dyn Chat> = chat.clone();
    let state = WebState::new(ctx, failure, backend).unwrap();
    Fixture {
        _dir: dir,
        chat,
        app: create_app(Arc::new(state)),
    }
}

async fn get_json(app: Router, uri: &str) -> serde_json::Value {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// `(event, data)` pairs of an SSE body
async fn post_chat(app: Router, body: &'static str) -> Vec<(String, String)> {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    text.split("\n\n")
        .filter(|frame| !frame.trim().is_empty())
        .map(|frame| {
            let mut event = String::new();
            let mut data = Vec::new();
            for line in frame.lines() {
                if let Some(value) = line.strip_prefix("event:") {
                    event = value.trim_start().to_string();
                } else if let Some(value) = line.strip_prefix("data:") {
                    data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
                }
            }
            (event, data.join("\n"))
        })
        .collect()
}

fn pair(event: &str, data: &str) -> (String, String) {
    (event.to_string(), data.to_string())
}

#[tokio::test]
async fn panic_endpoint_returns_envelope() {
    let fixture = fixture(ScriptedChat::answering(&[]));
    let body = get_json(fixture.app, "/api/panic").await;

    assert_eq!(body["status_code"], 0);
    assert_eq!(body["status_msg"], "ok");
    assert_eq!(body["data"]["panic"], "attempt to divide by zero");
    assert_eq!(body["data"]["stack"], STACK);

    let functions = body["data"]["functions"].as_array().unwrap();
    assert_eq!(functions.len(), 2);
    assert_eq!(functions[0]["name"], "Calc::div");
    assert_eq!(functions[0]["type"], "method");
    assert_eq!(functions[0]["line"], 5);
    assert_eq!(functions[1]["name"], "run");
    assert_eq!(functions[1]["source"], "pub fn run() -> i32 {\n    Calc(1).div(0)\n}");
}

#[tokio::test]
async fn chat_streams_answer_with_prompt_as_system_turn() {
    let fixture = fixture(ScriptedChat::answering(&["Divide", " by zero"]));
    let events = post_chat(
        fixture.app,
        r#"{"messages":[{"role":"user","content":"why?"}]}"#,
    )
    .await;

    assert_eq!(
        events,
        vec![
            pair("message", "Divide"),
            pair("message", " by zero"),
            pair("done", ""),
        ]
    );

    let requests = fixture.chat.requests();
    assert_eq!(requests.len(), 1);
    let roles: Vec<Role> = requests[0].iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::System, Role::User]);
    let prompt = &requests[0][0].content;
    assert!(prompt.starts_with("The following error occurred in the current program: "));
    assert!(prompt.contains("src/math.rs:\n```rust\npub fn div(&self, b: i32) -> i32 {\n"));
    assert_eq!(requests[0][1].content, "why?");
}

#[tokio::test]
async fn chat_rejects_malformed_body_with_one_error_event() {
    let fixture = fixture(ScriptedChat::answering(&["unused"]));
    let events = post_chat(fixture.app, "{not json").await;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, "error");
    assert!(fixture.chat.requests().is_empty());
}

#[tokio::test]
async fn chat_relays_backend_errors() {
    let fixture = fixture(ScriptedChat::new(vec![
        StreamEvent::Data("partial".into()),
        StreamEvent::Error("upstream reset".into()),
    ]));
    let events = post_chat(fixture.app, r#"{"messages":[]}"#).await;

    assert_eq!(
        events,
        vec![
            pair("message", "partial"),
            pair("error", "chat response error: upstream reset"),
        ]
    );
}

#[tokio::test]
async fn chat_reports_stream_closed_without_terminal_event() {
    let fixture = fixture(ScriptedChat::new(vec![StreamEvent::Data("only".into())]));
    let events = post_chat(fixture.app, r#"{"messages":[]}"#).await;

    assert_eq!(events.len(), 2);
    assert_eq!(events[1].0, "error");
    assert!(events[1].1.starts_with("chat response error: "));
}

#[tokio::test]
async fn chat_keeps_multiline_tokens() {
    let fixture = fixture(ScriptedChat::answering(&["line one\r\nline two"]));
    let events = post_chat(fixture.app, r#"{"messages":[]}"#).await;

    assert_eq!(events[0], pair("message", "line one\nline two"));
}

#[tokio::test]
async fn func_endpoint_uses_bare_name_fallback() {
    let fixture = fixture(ScriptedChat::answering(&[]));
    let body = get_json(fixture.app, "/api/func?file=src/math.rs&func=Unresolved::div").await;

    assert_eq!(body["status_code"], 0);
    assert_eq!(body["data"]["function"]["name"], "Calc::div");
    assert_eq!(body["data"]["function"]["params"][1]["type"], "i32");
}

#[tokio::test]
async fn func_endpoint_reports_misses() {
    let fixture = fixture(ScriptedChat::answering(&[]));
    let body = get_json(fixture.app.clone(), "/api/func?file=src/math.rs&func=missing").await;
    assert_eq!(body["status_code"], -1);
    assert!(body["data"].is_null());

    let body = get_json(fixture.app, "/api/func?func=run").await;
    assert_eq!(body["status_code"], -1);
}
