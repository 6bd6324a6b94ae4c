//! Dashboard API handlers.
//!
//! - `GET /api/panic`: panic text, stack and the functions of the stack
//! - `POST /api/chat`: conversation turns in, answer tokens out as SSE
//! - `GET /api/func?file=&func=`: one function looked up on demand

use crate::envelope::Envelope;
use crate::state::WebState;
use axum::extract::Query;
use axum::extract::State;
use axum::response::sse::Event;
use axum::response::sse::KeepAlive;
use axum::response::sse::KeepAliveStream;
use axum::response::sse::Sse;
use bytes::Bytes;
use codediag_ast::Function;
use codediag_core::EventStream;
use codediag_core::Message;
use codediag_core::PromptBuilder;
use codediag_core::StreamEvent;
use futures::Stream;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::Deserialize;
use serde::Serialize;
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

pub const EVENT_MESSAGE: &str = "message";
pub const EVENT_DONE: &str = "done";
pub const EVENT_ERROR: &str = "error";

const CHAT_ERROR_PREFIX: &str = "chat response error: ";

type SharedState = Arc<WebState>;
type EventBody = BoxStream<'static, Result<Event, Infallible>>;

#[derive(Debug, Serialize)]
pub struct PanicData<'a> {
    pub panic: &'a str,
    pub stack: &'a str,
    pub functions: &'a [Function],
}

/// `GET /api/panic`
pub async fn get_panic(State(state): State<SharedState>) -> Envelope<serde_json::Value> {
    let data = PanicData {
        panic: &state.panic,
        stack: &state.stack,
        functions: &state.functions,
    };
    match serde_json::to_value(data) {
        Ok(value) => Envelope::success(value),
        Err(e) => Envelope::error(e.to_string()),
    }
}

#[derive(Debug, Deserialize)]
pub struct FuncQuery {
    pub file: Option<String>,
    pub func: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FuncData {
    pub function: Function,
}

/// `GET /api/func?file=&func=`, non-strict so unresolved receivers still match
pub async fn get_func(
    State(state): State<SharedState>,
    Query(query): Query<FuncQuery>,
) -> Envelope<FuncData> {
    let (Some(file), Some(func)) = (query.file, query.func) else {
        return Envelope::error("both `file` and `func` are required");
    };
    let mut path = PathBuf::from(file);
    if path.is_relative() {
        path = state.ctx.source_root.join(path);
    }

    match state.locator.locate(&path, &func, false) {
        Ok(function) => Envelope::success(FuncData { function }),
        Err(e) => {
            tracing::debug!(file = %path.display(), %func, "function lookup failed: {e}");
            Envelope::error(e.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
}

/// `POST /api/chat`; a malformed body yields a single `error` event
pub async fn post_chat(
    State(state): State<SharedState>,
    body: Bytes,
) -> Sse<KeepAliveStream<EventBody>> {
    let stream: EventBody = match serde_json::from_slice::<ChatRequest>(&body) {
        Ok(request) => {
            let messages = PromptBuilder::new(&state.ctx).web_messages(
                &state.panic,
                &state.stack,
                &state.local_catalog,
                request.messages,
            );
            relay(state.chat.chat(messages)).boxed()
        }
        Err(e) => {
            tracing::warn!("malformed chat request: {e}");
            futures::stream::once(async move { Ok(event(EVENT_ERROR, &e.to_string())) }).boxed()
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Map chat events onto SSE events, ending after the first terminal one
fn relay(mut events: EventStream) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    async_stream::stream! {
        let mut terminated = false;
        while let Some(next) = events.recv().await {
            let terminal = next.is_terminal();
            yield Ok(to_event(next));
            if terminal {
                terminated = true;
                break;
            }
        }
        if !terminated {
            yield Ok(event(
                EVENT_ERROR,
                &format!("{CHAT_ERROR_PREFIX}stream closed without a terminal event"),
            ));
        }
    }
}

fn to_event(next: StreamEvent) -> Event {
    match next {
        StreamEvent::Data(content) => event(EVENT_MESSAGE, &content),
        StreamEvent::Done => event(EVENT_DONE, ""),
        StreamEvent::Error(message) => event(EVENT_ERROR, &format!("{CHAT_ERROR_PREFIX}{message}")),
    }
}

/// SSE cannot carry `\r`; newlines become separate `data:` lines
fn event(name: &str, data: &str) -> Event {
    Event::default().event(name).data(data.replace('\r', ""))
}
