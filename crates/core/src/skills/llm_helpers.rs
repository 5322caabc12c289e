//! # LLM Helpers
//!
//! The completion-service seam every agent talks through, and the
//! chat-completions client (Azure OpenAI or any OpenAI-compatible endpoint)
//! that implements it.
//!
//! ## Retries
//!
//! Requests are retried on 429, 5xx, timeouts and connection failures with
//! exponential backoff (`retry_base_ms`, doubled per attempt) up to
//! `max_retries` extra attempts.

use crate::models::{LlmProvider, ModelConfig};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON arguments as produced by the model
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    /// Optional author label, e.g. the upstream agent's name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    pub fn assistant_tool_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::plain(Role::Assistant, content)
        }
    }

    pub fn tool(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::plain(Role::Tool, content)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A tool advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

/// A single non-streamed model turn
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
}

pub type TokenStream = BoxStream<'static, Result<String, ModelError>>;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("No completion service configured")]
    NotConfigured,

    #[error("Invalid or expired API key: {0}")]
    AuthFailed(String),

    #[error("API rate limit exceeded, please try again later")]
    RateLimited,

    #[error("Completion service response timeout")]
    Timeout,

    #[error("Cannot connect to completion service: {0}")]
    ConnectionFailed(String),

    #[error("Completion service error: {0}")]
    Api(String),

    #[error("Unreadable completion response: {0}")]
    Parse(String),

    #[error("Agent '{agent}' made no final answer within {limit} turns")]
    TurnLimit { agent: String, limit: usize },
}

impl ModelError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            ModelError::RateLimited | ModelError::Timeout | ModelError::ConnectionFailed(_)
        )
    }
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ModelError::Timeout
        } else if err.is_connect() {
            ModelError::ConnectionFailed(err.to_string())
        } else if err.is_decode() {
            ModelError::Parse(err.to_string())
        } else {
            ModelError::Api(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Parse(err.to_string())
    }
}

// ============================================================================
// Service seam
// ============================================================================

/// A chat-completions capable model. Temperature and retries are the
/// implementation's concern; callers only pass messages and tools.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ModelError>;

    /// Stream content tokens of a single turn. Tools are not offered.
    async fn stream(&self, request: CompletionRequest) -> Result<TokenStream, ModelError>;
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
struct WireRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    messages: Vec<WireMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    tool_type: String,
    function: WireFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireChunk {
    #[serde(default)]
    choices: Vec<WireChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChunkChoice {
    delta: WireDelta,
}

#[derive(Debug, Deserialize)]
struct WireDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: WireErrorDetail,
}

#[derive(Debug, Deserialize)]
struct WireErrorDetail {
    message: String,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        let tool_calls = (!message.tool_calls.is_empty()).then(|| {
            message
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    tool_type: function_type(),
                    function: WireFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                })
                .collect()
        });
        // Assistant turns that only call tools carry null content
        let content = if tool_calls.is_some() && message.content.is_empty() {
            None
        } else {
            Some(message.content.clone())
        };

        Self {
            role: message.role.as_str(),
            content,
            name: message.name.clone(),
            tool_calls,
            tool_call_id: message.tool_call_id.clone(),
        }
    }
}

// ============================================================================
// SSE decoding
// ============================================================================

/// Event produced by the SSE decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Token(String),
    Done,
}

/// Incremental decoder for `data: {...}` server-sent events. Chunks may
/// split lines anywhere; incomplete lines stay buffered.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = Self::decode_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// Decode whatever is left once the body ends without a trailing newline
    pub fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        Self::decode_line(&String::from_utf8_lossy(&rest))
    }

    fn decode_line(line: &str) -> Option<SseEvent> {
        let data = line.trim().strip_prefix("data:")?.trim();
        if data == "[DONE]" {
            return Some(SseEvent::Done);
        }
        match serde_json::from_str::<WireChunk>(data) {
            Ok(chunk) => chunk
                .choices
                .into_iter()
                .filter_map(|choice| choice.delta.content)
                .find(|content| !content.is_empty())
                .map(SseEvent::Token),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unparseable SSE line");
                None
            }
        }
    }
}

struct SseState {
    bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    done: bool,
}

fn sse_token_stream(response: reqwest::Response) -> TokenStream {
    let bytes = response
        .bytes_stream()
        .map(|chunk| chunk.map(|b| b.to_vec()))
        .boxed();
    let state = SseState {
        bytes,
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(token) = st.pending.pop_front() {
                return Some((Ok(token), st));
            }
            if st.done {
                return None;
            }
            let events = match st.bytes.next().await {
                Some(Ok(chunk)) => st.decoder.push(&chunk),
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(ModelError::from(e)), st));
                }
                None => {
                    st.done = true;
                    st.decoder.finish().into_iter().collect()
                }
            };
            for event in events {
                match event {
                    SseEvent::Token(token) => st.pending.push_back(token),
                    SseEvent::Done => st.done = true,
                }
            }
        }
    })
    .boxed()
}

// ============================================================================
// Client
// ============================================================================

/// Chat-completions client for Azure OpenAI and OpenAI-compatible endpoints
pub struct ChatCompletionsClient {
    config: ModelConfig,
    client: reqwest::Client,
}

impl ChatCompletionsClient {
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ModelError::ConnectionFailed(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn wire_request(&self, request: &CompletionRequest, stream: bool) -> WireRequest {
        WireRequest {
            model: match self.config.provider {
                LlmProvider::OpenAI => Some(self.config.model.clone()),
                LlmProvider::AzureOpenAI => None,
            },
            messages: request.messages.iter().map(WireMessage::from).collect(),
            temperature: self.config.temperature,
            tools: request
                .tools
                .iter()
                .map(|tool| WireTool {
                    tool_type: "function",
                    function: WireFunction {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters: tool.parameters.clone(),
                    },
                })
                .collect(),
            stream,
        }
    }

    async fn send_once(&self, body: &WireRequest) -> Result<reqwest::Response, ModelError> {
        let builder = self.client.post(self.config.chat_completions_url()).json(body);
        let builder = match self.config.provider {
            LlmProvider::AzureOpenAI => builder.header("api-key", &self.config.api_key),
            LlmProvider::OpenAI => builder.bearer_auth(&self.config.api_key),
        };

        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<WireError>(&text)
            .map(|e| e.error.message)
            .unwrap_or(text);

        Err(match status.as_u16() {
            401 | 403 => ModelError::AuthFailed(message),
            429 => ModelError::RateLimited,
            408 | 504 => ModelError::Timeout,
            code if code >= 500 => ModelError::ConnectionFailed(format!("{}: {}", status, message)),
            _ => ModelError::Api(format!("{}: {}", status, message)),
        })
    }

    async fn send(&self, body: &WireRequest) -> Result<reqwest::Response, ModelError> {
        let mut attempt: u32 = 0;
        loop {
            match self.send_once(body).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.retry_base_ms.saturating_mul(1 << attempt.min(16));
                    tracing::warn!(
                        attempt = attempt + 1,
                        delay_ms = delay,
                        error = %e,
                        "Completion request failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl CompletionService for ChatCompletionsClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ModelError> {
        let body = self.wire_request(&request, false);
        let response = self.send(&body).await?;
        let parsed: WireResponse = response.json().await?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::Parse("response has no choices".to_string()))?;

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            tool_calls: choice
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|call| ToolCall {
                    id: call.id,
                    name: call.function.name,
                    arguments: call.function.arguments,
                })
                .collect(),
            finish_reason: choice.finish_reason,
        })
    }

    async fn stream(&self, request: CompletionRequest) -> Result<TokenStream, ModelError> {
        let body = self.wire_request(&CompletionRequest::new(request.messages), true);
        let response = self.send(&body).await?;
        Ok(sse_token_stream(response))
    }
}
