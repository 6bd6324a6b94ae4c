//! Provider-agnostic streaming chat.
//!
//! A [`Chat`] call returns at once with an [`EventStream`]; a background task
//! produces zero or more [`StreamEvent::Data`] followed by exactly one
//! [`StreamEvent::Done`] or [`StreamEvent::Error`].

pub mod chatgpt;
pub mod sse;

pub use chatgpt::ChatGpt;
pub use sse::SseDecoder;

use futures::Stream;
use serde::Deserialize;
use serde::Serialize;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;
use tokio::sync::mpsc;

/// Buffered events between the producing task and the consumer
pub const EVENT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Data(String),
    Done,
    Error(String),
}

impl StreamEvent {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }
}

/// Receiving half of one chat response
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::Receiver<StreamEvent>,
}

impl EventStream {
    pub fn channel() -> (mpsc::Sender<StreamEvent>, Self) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        (tx, Self { rx })
    }

    /// Stream that replays fixed events, then closes
    pub fn from_events(events: Vec<StreamEvent>) -> Self {
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            if tx.try_send(event).is_err() {
                break;
            }
        }
        Self { rx }
    }

    /// Next event, `None` once the producer is gone
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }
}

impl Stream for EventStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// A chat backend
pub trait Chat: Send + Sync {
    /// Start a completion for `messages`; must be called inside a tokio runtime
    fn chat(&self, messages: Vec<Message>) -> EventStream;
}
