//! Scripted completion service for pipeline tests.
//!
//! Replies are consumed in order by both `complete` and `stream`; every
//! request is recorded so tests can assert on the prompts agents sent.

use crate::skills::llm_helpers::{
    Completion, CompletionRequest, CompletionService, ModelError, TokenStream, ToolCall,
};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One canned model turn
#[derive(Debug)]
pub enum ScriptedReply {
    Text(String),
    ToolCalls(Vec<ToolCall>),
    Tokens(Vec<String>),
    Fail(ModelError),
}

impl ScriptedReply {
    pub fn text(content: impl Into<String>) -> Self {
        ScriptedReply::Text(content.into())
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        ScriptedReply::ToolCalls(calls)
    }

    pub fn tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedReply::Tokens(tokens.into_iter().map(Into::into).collect())
    }

    pub fn fail(error: ModelError) -> Self {
        ScriptedReply::Fail(error)
    }
}

#[derive(Debug, Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_replies(replies: impl IntoIterator<Item = ScriptedReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::default(),
        })
    }

    pub fn push(&self, reply: ScriptedReply) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    /// Every request received so far, oldest first
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn next(&self, request: CompletionRequest) -> Result<ScriptedReply, ModelError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or_else(|| ModelError::Api("scripted replies exhausted".to_string()))
    }
}

#[async_trait]
impl CompletionService for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ModelError> {
        match self.next(request)? {
            ScriptedReply::Text(content) => Ok(Completion {
                content,
                tool_calls: Vec::new(),
                finish_reason: Some("stop".to_string()),
            }),
            ScriptedReply::Tokens(tokens) => Ok(Completion {
                content: tokens.concat(),
                tool_calls: Vec::new(),
                finish_reason: Some("stop".to_string()),
            }),
            ScriptedReply::ToolCalls(tool_calls) => Ok(Completion {
                content: String::new(),
                tool_calls,
                finish_reason: Some("tool_calls".to_string()),
            }),
            ScriptedReply::Fail(error) => Err(error),
        }
    }

    async fn stream(&self, request: CompletionRequest) -> Result<TokenStream, ModelError> {
        let tokens = match self.next(request)? {
            ScriptedReply::Text(content) => vec![content],
            ScriptedReply::Tokens(tokens) => tokens,
            ScriptedReply::ToolCalls(_) => {
                return Err(ModelError::Api("tool calls cannot be streamed".to_string()))
            }
            ScriptedReply::Fail(error) => return Err(error),
        };
        Ok(stream::iter(tokens.into_iter().map(Ok)).boxed())
    }
}
