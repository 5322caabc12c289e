//! # Chat API
//!
//! `/api/chat` and `/api/file-context`, plus an SSE feed of pipeline events.
//! Architect replies stream as NDJSON frames; every other mode answers with
//! one JSON string. Failures are plain text with the coordinator's status.

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use themify_core::swarm::{
    encode_frame, ChatRequest, Coordinator, CoordinatorError, Dispatch, FileContextRequest,
};
use tokio::sync::broadcast::error::RecvError;

use crate::AppState;

const HEARTBEAT: Duration = Duration::from_secs(15);

fn coordinator(state: &AppState) -> Result<Arc<Coordinator>, CoordinatorError> {
    state.coordinator.clone().ok_or_else(|| {
        CoordinatorError::Disabled("no completion credentials are configured".to_string())
    })
}

/// Malformed bodies are a 400 like any other unroutable request
fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, CoordinatorError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| CoordinatorError::InvalidRequest(rejection.body_text()))
}

pub(crate) fn error_response(err: CoordinatorError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::error!(status = status.as_u16(), error = %err, "Request failed");
    } else {
        tracing::warn!(status = status.as_u16(), error = %err, "Request rejected");
    }
    (status, err.to_string()).into_response()
}

fn ndjson(frames: themify_core::swarm::FrameStream) -> Response {
    let body = Body::from_stream(frames.map(|frame| Ok::<_, Infallible>(encode_frame(&frame))));
    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, "no-cache, no-transform"),
        ],
        body,
    )
        .into_response()
}

/// Route a chat body to the architect or a coder chain
#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    request_body(content = serde_json::Value, description = "{ content?, llmType, history?, feedback?, granularFeedback? }"),
    responses(
        (status = 200, description = "Architect: NDJSON frames. Coder modes: the artifact or reply as a JSON string", body = String),
        (status = 400, description = "No generation mode matches the body", body = String),
        (status = 500, description = "Agent or tool failure", body = String),
        (status = 503, description = "Agents disabled", body = String)
    )
)]
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let coordinator = match coordinator(&state) {
        Ok(c) => c,
        Err(e) => return error_response(e),
    };
    let body = match parse_body(payload) {
        Ok(body) => body,
        Err(e) => return error_response(e),
    };
    match coordinator.handle(body).await {
        Ok(Dispatch::Stream(frames)) => ndjson(frames),
        Ok(Dispatch::Final(text)) => Json(text).into_response(),
        Err(e) => error_response(e),
    }
}

/// Read files mentioned in the message; with a snippet, revise the file holding it
#[utoipa::path(
    post,
    path = "/api/file-context",
    tag = "chat",
    request_body(content = serde_json::Value, description = "{ message, codeSnippet?, llmType?, history? }"),
    responses(
        (status = 200, description = "Agent reply as a JSON string", body = String),
        (status = 400, description = "No message found", body = String),
        (status = 500, description = "Agent or tool failure, or SnippetNotFound", body = String),
        (status = 503, description = "Agents disabled", body = String)
    )
)]
pub async fn file_context(
    State(state): State<AppState>,
    payload: Result<Json<FileContextRequest>, JsonRejection>,
) -> Response {
    let coordinator = match coordinator(&state) {
        Ok(c) => c,
        Err(e) => return error_response(e),
    };
    let body = match parse_body(payload) {
        Ok(body) => body,
        Err(e) => return error_response(e),
    };
    match coordinator.file_context(body).await {
        Ok(text) => Json(text).into_response(),
        Err(CoordinatorError::InvalidRequest(_)) => {
            error_response(CoordinatorError::InvalidRequest("No messages found".to_string()))
        }
        Err(e) => error_response(e),
    }
}

/// SSE feed of pipeline events with a heartbeat comment
pub async fn events(State(state): State<AppState>) -> Response {
    let coordinator = match coordinator(&state) {
        Ok(c) => c,
        Err(e) => return error_response(e),
    };
    Sse::new(event_stream(coordinator))
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn event_stream(coordinator: Arc<Coordinator>) -> impl Stream<Item = Result<Event, Infallible>> {
    let rx = coordinator.subscribe();
    stream::unfold(rx, |mut rx| async move {
        loop {
            match tokio::time::timeout(HEARTBEAT, rx.recv()).await {
                Ok(Ok(event)) => {
                    let json = serde_json::to_string(&event).unwrap_or_default();
                    return Some((Ok(Event::default().data(json)), rx));
                }
                Ok(Err(RecvError::Lagged(skipped))) => {
                    tracing::warn!(skipped, "Event subscriber lagged");
                }
                Ok(Err(RecvError::Closed)) => return None,
                Err(_) => return Some((Ok(Event::default().comment("heartbeat")), rx)),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{app, post_json, read_body, LEADS};
    use axum::http::StatusCode;
    use serde_json::json;
    use themify_core::swarm::{FrameDecoder, StreamFrame};
    use themify_core::testing::ScriptedReply;

    #[tokio::test]
    async fn test_architect_streams_ndjson() {
        let (_dir, router) = app(vec![ScriptedReply::tokens(["Plan. ", "Start Coding"])]);

        let response = post_json(
            router,
            "/api/chat",
            json!({"content": "a lead list", "llmType": "architect"}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["cache-control"], "no-cache, no-transform");

        let body = read_body(response).await;
        let mut decoder = FrameDecoder::new();
        let text: String = decoder
            .push(&body)
            .into_iter()
            .map(|frame| match frame.unwrap() {
                StreamFrame::TokenDelta { content } => content,
                other => panic!("unexpected frame {:?}", other),
            })
            .collect();
        assert_eq!(text, "Plan. Start Coding");
    }

    #[tokio::test]
    async fn test_coder_returns_artifact_as_json_string() {
        let (dir, router) = app(vec![
            ScriptedReply::text(LEADS),
            crate::api::test_support::tool(
                "save_component",
                json!({"componentName": "Leads", "componentCode": LEADS}),
            ),
            crate::api::test_support::tool("update_code_renderer", json!({"componentName": "Leads"})),
            ScriptedReply::text("Done."),
        ]);

        let response = post_json(
            router,
            "/api/chat",
            json!({
                "llmType": "coder",
                "history": [
                    {"id": 1, "role": "ai", "content": "... Start Coding"},
                    {"id": 2, "role": "user", "content": "go"}
                ]
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let artifact: String = serde_json::from_slice(&read_body(response).await).unwrap();
        assert_eq!(artifact, LEADS);
        assert!(dir.path().join("components/suggestions/Leads.tsx").exists());
    }

    #[tokio::test]
    async fn test_unmatched_body_is_400_plain_text() {
        let (_dir, router) = app(vec![]);
        let response = post_json(router, "/api/chat", json!({"llmType": "coder"})).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let text = String::from_utf8(read_body(response).await.to_vec()).unwrap();
        assert!(!text.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_feedback_is_400() {
        let (_dir, router) = app(vec![]);
        let response = post_json(
            router,
            "/api/chat",
            json!({"llmType": "coder", "feedback": {"message": "make it blue"}}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let text = String::from_utf8(read_body(response).await.to_vec()).unwrap();
        assert!(text.contains("missing field `code`"), "{}", text);
    }

    #[tokio::test]
    async fn test_model_failure_is_500() {
        let (_dir, router) = app(vec![]);
        let response = post_json(
            router,
            "/api/chat",
            json!({"llmType": "coder", "history": [{"id": 1, "role": "user", "content": "go"}]}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_disabled_agents_answer_503() {
        let (_dir, router) = crate::api::test_support::disabled_app();
        let response = post_json(
            router,
            "/api/chat",
            json!({"content": "hi", "llmType": "architect"}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_file_context_requires_message() {
        let (_dir, router) = app(vec![]);
        let response = post_json(router, "/api/file-context", json!({"llmType": "file"})).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let text = String::from_utf8(read_body(response).await.to_vec()).unwrap();
        assert_eq!(text, "No messages found");
    }

    #[tokio::test]
    async fn test_file_context_reads_mentioned_files() {
        let (_dir, router) = app(vec![
            crate::api::test_support::tool(
                "read_files",
                json!({"paths": ["components/code-renderer.tsx"]}),
            ),
            ScriptedReply::text("The renderer mounts one component."),
        ]);
        let response = post_json(
            router,
            "/api/file-context",
            json!({"message": "what does @components/code-renderer.tsx do?"}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let reply: String = serde_json::from_slice(&read_body(response).await).unwrap();
        assert_eq!(reply, "The renderer mounts one component.");
    }
}
