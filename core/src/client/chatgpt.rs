//! OpenAI-compatible chat-completions backend.

use super::Chat;
use super::EventStream;
use super::Message;
use super::SseDecoder;
use super::StreamEvent;
use crate::config::ChatGptConfig;
use futures::StreamExt;
use reqwest::Client;
use reqwest::RequestBuilder;
use serde::Serialize;
use tokio::sync::mpsc;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Debug, Clone)]
pub struct ChatGpt {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: &'a [Message],
}

impl ChatGpt {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn from_config(config: &ChatGptConfig) -> Self {
        let mut chat = Self::new(config.api_key.clone());
        if let Some(model) = &config.model {
            chat = chat.with_model(model.clone());
        }
        if let Some(base_url) = &config.base_url {
            chat = chat.with_base_url(base_url.clone());
        }
        chat
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl Chat for ChatGpt {
    fn chat(&self, messages: Vec<Message>) -> EventStream {
        let (tx, stream) = EventStream::channel();
        let request = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: &self.model,
                stream: true,
                messages: &messages,
            });
        tracing::debug!(model = %self.model, messages = messages.len(), "starting chat completion");
        tokio::spawn(relay(request, tx));
        stream
    }
}

/// Drive one request and forward its decoded events until a terminal one
async fn relay(request: RequestBuilder, tx: mpsc::Sender<StreamEvent>) {
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            let _ = tx.send(StreamEvent::Error(format!("request failed: {e}"))).await;
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let _ = tx
            .send(StreamEvent::Error(format!("unexpected status {status}: {body}")))
            .await;
        return;
    }

    let mut decoder = SseDecoder::new();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let events = match chunk {
            Ok(bytes) => decoder.feed(&bytes),
            Err(e) => vec![StreamEvent::Error(e.to_string())],
        };
        if !forward(&tx, events).await {
            return;
        }
    }
    forward(&tx, decoder.finish()).await;
}

/// Returns false once the stream is over, either terminally or because the
/// consumer went away
async fn forward(tx: &mpsc::Sender<StreamEvent>, events: Vec<StreamEvent>) -> bool {
    for event in events {
        let terminal = event.is_terminal();
        if tx.send(event).await.is_err() {
            tracing::debug!("chat consumer dropped, stopping stream");
            return false;
        }
        if terminal {
            return false;
        }
    }
    true
}
