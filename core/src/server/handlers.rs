use std::path::{Path, PathBuf};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::state::AppState;
use super::TARGET;
use crate::audio::AudioArtifact;
use crate::orchestrator::PipelineRequest;

const AUDIO_FIELD: &str = "audio";
const ALLOWED_EXTENSIONS: [&str; 4] = ["mp3", "wav", "ogg", "flac"];
const PREVIEW_CHARS: usize = 50;

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
struct EndpointInfo {
    path: &'static str,
    method: &'static str,
    description: &'static str,
}

#[derive(Serialize)]
struct ServiceInfo {
    name: &'static str,
    version: &'static str,
    endpoints: Vec<EndpointInfo>,
}

const ENDPOINTS: [(&str, &str, &str); 5] = [
    ("/", "GET", "service information"),
    ("/health", "GET", "liveness check"),
    ("/api/process-text", "POST", "answer text through the external assistant"),
    ("/api/process-audio", "POST", "transcribe an audio upload and answer it"),
    ("/api/direct-response", "POST", "answer text with the response backend only"),
];

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

pub async fn index_handler() -> impl IntoResponse {
    Json(ServiceInfo {
        name: "Asurada API",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: ENDPOINTS
            .iter()
            .map(|&(path, method, description)| EndpointInfo {
                path,
                method,
                description,
            })
            .collect(),
    })
}

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "healthy" })))
}

pub async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "resource not found")
}

pub async fn process_text_handler(
    State(state): State<AppState>,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> Response {
    run_text(&state, payload, true).await
}

pub async fn direct_response_handler(
    State(state): State<AppState>,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> Response {
    run_text(&state, payload, false).await
}

async fn run_text(
    state: &AppState,
    payload: Result<Json<TextRequest>, JsonRejection>,
    delegate: bool,
) -> Response {
    let text = match payload {
        Ok(Json(TextRequest { text: Some(text) })) => text,
        Ok(_) => {
            warn!(target: TARGET, delegate, "request without text");
            return error_response(StatusCode::BAD_REQUEST, "text is required");
        }
        Err(rejection) => {
            warn!(target: TARGET, delegate, error = %rejection, "unreadable text request");
            return error_response(StatusCode::BAD_REQUEST, "text is required");
        }
    };

    info!(target: TARGET, delegate, text = %preview(&text), "text request received");
    let result = state
        .orchestrator()
        .run(PipelineRequest::text(text, delegate))
        .await;
    Json(result).into_response()
}

/// Lower-cased extension of an uploaded file name, if it is one we accept.
fn allowed_extension(filename: &str) -> Option<String> {
    let (_, extension) = filename.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();
    ALLOWED_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

struct Upload {
    extension: String,
    content_type: Option<String>,
    data: bytes::Bytes,
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, Response> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => {
                warn!(target: TARGET, "upload without audio field");
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    "audio file is required",
                ));
            }
            Err(err) => {
                warn!(target: TARGET, error = %err, "failed to read multipart body");
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    format!("failed to read multipart body: {err}"),
                ));
            }
        };

        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            warn!(target: TARGET, "upload with empty filename");
            return Err(error_response(StatusCode::BAD_REQUEST, "filename is empty"));
        }
        let Some(extension) = allowed_extension(&filename) else {
            warn!(target: TARGET, %filename, "upload with disallowed extension");
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "file type is not allowed",
            ));
        };
        let content_type = field.content_type().map(str::to_string);

        let data = field.bytes().await.map_err(|err| {
            warn!(target: TARGET, error = %err, "failed to read upload bytes");
            error_response(
                StatusCode::BAD_REQUEST,
                format!("failed to read file: {err}"),
            )
        })?;

        debug!(target: TARGET, %filename, bytes = data.len(), "audio upload received");
        return Ok(Upload {
            extension,
            content_type,
            data,
        });
    }
}

async fn store_upload(upload_dir: &Path, upload: &Upload) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(upload_dir).await?;
    let path = upload_dir.join(format!("{}.{}", Uuid::new_v4(), upload.extension));
    tokio::fs::write(&path, &upload.data).await?;
    Ok(path)
}

async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(target: TARGET, path = %path.display(), "removed upload artifact"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(
            target: TARGET,
            path = %path.display(),
            error = %err,
            "failed to remove upload artifact"
        ),
    }
}

pub async fn process_audio_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let upload = match read_upload(&mut multipart).await {
        Ok(upload) => upload,
        Err(response) => return response,
    };

    let path = match store_upload(state.upload_dir(), &upload).await {
        Ok(path) => path,
        Err(err) => {
            error!(target: TARGET, error = %err, "failed to store upload");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error",
            );
        }
    };
    info!(target: TARGET, path = %path.display(), "audio upload stored");

    let mut artifact = AudioArtifact::from_path(&path);
    if let Some(content_type) = upload.content_type {
        artifact = artifact.with_mime_hint(content_type);
    }
    let result = state
        .orchestrator()
        .run(PipelineRequest::audio(artifact, true))
        .await;

    discard(&path).await;

    Json(result).into_response()
}
