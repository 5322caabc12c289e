//! # HTTP API
//!
//! Route table and OpenAPI document for the Themify server.

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;

use crate::AppState;

pub mod chat;
pub mod project;

/// Upper bound for recorded voice prompts
const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Themify API",
        version = "0.1.0",
        description = "Multi-agent UI generation: architect chat, component generation and feedback"
    ),
    paths(
        chat::chat,
        chat::file_context,
        project::suggestions,
        project::transcribe
    ),
    components(schemas(project::TranscriptionResponse, project::ErrorResponse)),
    tags(
        (name = "chat", description = "Agent chains"),
        (name = "project", description = "Host project helpers")
    )
)]
pub struct ApiDoc;

async fn serve_openapi() -> Response {
    match ApiDoc::openapi().to_json() {
        Ok(spec) => ([(header::CONTENT_TYPE, "application/json")], Body::from(spec)).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat::chat))
        .route("/api/file-context", post(chat::file_context))
        .route("/api/events", get(chat::events))
        .route("/api/suggestions", get(project::suggestions))
        .route(
            "/api/transcribe",
            post(project::transcribe).layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES)),
        )
        .route("/api/openapi.json", get(serve_openapi))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::build_router;
    use crate::AppState;
    use axum::{
        body::{Body, Bytes},
        http::Request,
        response::Response,
        Router,
    };
    use std::fs;
    use std::sync::Arc;
    use themify_core::skills::llm_helpers::ToolCall;
    use themify_core::skills::tools::ToolSurface;
    use themify_core::skills::AgentRegistry;
    use themify_core::swarm::Coordinator;
    use themify_core::testing::{ScriptedLlm, ScriptedReply};
    use themify_core::tools::ProjectLayout;
    use tower::ServiceExt;

    pub const RENDERER: &str = "import React from 'react';\n\nexport default function CodeRenderer() {\n  return (\n    <div id=\"code-renderer\">\n    </div>\n  );\n}\n";
    pub const LEADS: &str = "export default function Leads() {\n  return (\n    <main className=\"p-8\">\n      <h1>Leads</h1>\n    </main>\n  );\n}\n";

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("components")).unwrap();
        fs::write(dir.path().join("components/code-renderer.tsx"), RENDERER).unwrap();
        fs::write(
            dir.path().join("tsconfig.json"),
            r#"{"compilerOptions":{"paths":{"@suggestions/*":["./components/suggestions/*"]}}}"#,
        )
        .unwrap();
        dir
    }

    pub fn app(replies: Vec<ScriptedReply>) -> (tempfile::TempDir, Router) {
        let dir = project();
        let registry = AgentRegistry::new(
            ScriptedLlm::with_replies(replies),
            ToolSurface::open(dir.path(), ProjectLayout::default()),
        );
        let state = AppState {
            coordinator: Some(Arc::new(Coordinator::new(registry))),
            project_root: dir.path().to_path_buf(),
            speech: None,
        };
        (dir, build_router(state))
    }

    pub fn disabled_app() -> (tempfile::TempDir, Router) {
        let dir = project();
        let state = AppState {
            coordinator: None,
            project_root: dir.path().to_path_buf(),
            speech: None,
        };
        (dir, build_router(state))
    }

    pub fn tool(name: &str, args: serde_json::Value) -> ScriptedReply {
        ScriptedReply::tool_calls(vec![ToolCall {
            id: format!("call_{}", name),
            name: name.into(),
            arguments: args.to_string(),
        }])
    }

    pub async fn post_json(router: Router, uri: &str, body: serde_json::Value) -> Response {
        router
            .oneshot(
                Request::post(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    pub async fn read_body(response: Response) -> Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{app, read_body};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_openapi_lists_routes() {
        let (_dir, router) = app(vec![]);
        let response = router
            .oneshot(Request::get("/api/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let doc: serde_json::Value = serde_json::from_slice(&read_body(response).await).unwrap();
        for path in ["/api/chat", "/api/file-context", "/api/suggestions", "/api/transcribe"] {
            assert!(doc["paths"].get(path).is_some(), "missing {}", path);
        }
    }
}
