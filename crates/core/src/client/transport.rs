//! # Chat Transport
//!
//! How a [`ChatSession`](super::ChatSession) reaches the server. The HTTP
//! implementation posts JSON bodies to `/api/chat`; tests substitute an
//! in-memory transport.

use crate::swarm::requests::ChatRequest;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::time::Duration;
use thiserror::Error;

pub type ByteStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Http(String),

    /// Non-success status; `body` is the server's diagnostic
    #[error("Server answered {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Http(err.to_string())
    }
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Post a streaming request; yields the raw NDJSON body.
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ByteStream, TransportError>;

    /// Post a request answered with one JSON string; yields the raw body.
    async fn invoke_chat(&self, request: &ChatRequest) -> Result<Vec<u8>, TransportError>;
}

pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    async fn post(&self, request: &ChatRequest) -> Result<reqwest::Response, TransportError> {
        let response = self.client.post(self.chat_url()).json(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ByteStream, TransportError> {
        let response = self.post(request).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(TransportError::from))
            .boxed())
    }

    async fn invoke_chat(&self, request: &ChatRequest) -> Result<Vec<u8>, TransportError> {
        let response = self.post(request).await?;
        Ok(response.bytes().await?.to_vec())
    }
}
