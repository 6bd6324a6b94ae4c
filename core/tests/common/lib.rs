#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Shared fixtures for codediag integration tests.

use codediag_core::Chat;
use codediag_core::EventStream;
use codediag_core::Message;
use codediag_core::StreamEvent;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::header;
use wiremock::matchers::method;
use wiremock::matchers::path;

pub const TEST_API_KEY: &str = "sk-test";

/// One `data:` frame carrying a content delta
pub fn delta_frame(content: &str) -> String {
    let payload = serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion.chunk",
        "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}],
    });
    format!("data: {payload}\n\n")
}

/// Body streaming `contents` in order, terminated by `[DONE]`
pub fn sse_body(contents: &[&str]) -> String {
    let mut body: String = contents.iter().map(|c| delta_frame(c)).collect();
    body.push_str("data: [DONE]\n\n");
    body
}

pub fn sse_response(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.into())
        .insert_header("content-type", "text/event-stream")
        .insert_header("cache-control", "no-cache")
}

/// Mount `template` on `POST /v1/chat/completions` with the test bearer key
pub async fn mount_chat_completions(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", format!("Bearer {TEST_API_KEY}").as_str()))
        .respond_with(template)
        .expect(1)
        .mount(server)
        .await;
}

/// Write `contents` to `root/relative`, creating parent directories
pub fn write_source(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let file = root.join(relative);
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&file, contents).unwrap();
    file
}

/// Chat backend that replays a fixed script and records every request
#[derive(Debug, Default)]
pub struct ScriptedChat {
    events: Vec<StreamEvent>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedChat {
    pub fn new(events: Vec<StreamEvent>) -> Self {
        Self {
            events,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers with `contents` as data events, then `Done`
    pub fn answering(contents: &[&str]) -> Self {
        let mut events: Vec<StreamEvent> = contents
            .iter()
            .map(|c| StreamEvent::Data((*c).to_string()))
            .collect();
        events.push(StreamEvent::Done);
        Self::new(events)
    }

    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

impl Chat for ScriptedChat {
    fn chat(&self, messages: Vec<Message>) -> EventStream {
        self.requests.lock().unwrap().push(messages);
        EventStream::from_events(self.events.clone())
    }
}
