//! # Project API
//!
//! Endpoints around the host project: `@path` suggestions for the chat
//! input and speech-to-text for voice prompts.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use themify_core::speech::SpeechError;
use themify_core::tools::suggestions::{list_project_entries, SuggestionEntry};
use utoipa::ToSchema;

use crate::AppState;

pub const AUDIO_FIELD: &str = "audio";

#[derive(Debug, Serialize, ToSchema)]
pub struct TranscriptionResponse {
    pub text: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_json(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// List project files and folders as `@` mentions, grouped by top-level entry
#[utoipa::path(
    get,
    path = "/api/suggestions",
    tag = "project",
    responses(
        (status = 200, description = "Map of top-level entry to [{ path, isFolder }]", body = serde_json::Value)
    )
)]
pub async fn suggestions(State(state): State<AppState>) -> Json<BTreeMap<String, Vec<SuggestionEntry>>> {
    let root = state.project_root.clone();
    // walkdir is blocking
    let listing = tokio::task::spawn_blocking(move || list_project_entries(&root))
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Suggestion listing panicked");
            BTreeMap::new()
        });
    Json(listing)
}

/// Transcribe the uploaded `audio` field
#[utoipa::path(
    post,
    path = "/api/transcribe",
    tag = "project",
    request_body(content = Vec<u8>, content_type = "multipart/form-data", description = "Form with an `audio` file field"),
    responses(
        (status = 200, description = "Transcribed text", body = TranscriptionResponse),
        (status = 400, description = "No audio uploaded", body = ErrorResponse),
        (status = 500, description = "Transcription failed", body = ErrorResponse)
    )
)]
pub async fn transcribe(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut audio = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some(AUDIO_FIELD) => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                match field.bytes().await {
                    Ok(bytes) => audio = Some((bytes.to_vec(), content_type)),
                    Err(e) => {
                        tracing::warn!(error = %e, "Unreadable audio field");
                        return error_json(StatusCode::BAD_REQUEST, "No audio uploaded");
                    }
                }
                break;
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed multipart body");
                return error_json(StatusCode::BAD_REQUEST, "No audio uploaded");
            }
        }
    }

    let Some((audio, content_type)) = audio.filter(|(bytes, _)| !bytes.is_empty()) else {
        return error_json(StatusCode::BAD_REQUEST, "No audio uploaded");
    };

    let result = match &state.speech {
        Some(stt) => stt.transcribe(audio, &content_type).await,
        None => Err(SpeechError::NotConfigured),
    };
    match result {
        Ok(text) => Json(TranscriptionResponse { text }).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Transcription failed");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Transcription failed")
        }
    }
}
