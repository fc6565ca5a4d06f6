//! Audio turn processing endpoint

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;

use super::ApiState;
use crate::Error;
use crate::pipeline::{AudioBlob, TurnReply};

/// Client-facing message for any turn that fails server-side
///
/// Stage detail stays in the logs; clients get one stable string.
pub const FAILURE_MESSAGE: &str = "Failed to process audio. Please try again.";

/// Build process router
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/process-audio", post(process_audio))
        .with_state(state)
}

/// Run one audio turn through the pipeline
///
/// Accepts raw audio bytes; the Content-Type header carries the encoding
async fn process_audio(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<TurnReply>, ProcessError> {
    if body.is_empty() {
        return Err(ProcessError::BadRequest("Empty audio data"));
    }

    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");

    let audio = AudioBlob::new(body.to_vec(), mime_type);
    let reply = state
        .pipeline
        .process(audio)
        .await
        .map_err(ProcessError::Pipeline)?;

    Ok(Json(reply))
}

/// Process endpoint errors
#[derive(Debug)]
pub enum ProcessError {
    BadRequest(&'static str),
    Pipeline(Error),
}

/// Stable error code for a pipeline failure
const fn error_code(error: &Error) -> &'static str {
    match error {
        Error::Upload(_) => "upload_failed",
        Error::JobCreation(_) => "job_creation_failed",
        Error::TranscriptionFailed(_) => "transcription_failed",
        Error::TranscriptionTimeout(_) => "transcription_timeout",
        Error::Synthesis(_) => "synthesis_failed",
        Error::Publish(_) => "publish_failed",
        _ => "pipeline_failed",
    }
}

impl IntoResponse for ProcessError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            message: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            error: Option<&'static str>,
        }

        let (status, message, error) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.to_string(), None),
            Self::Pipeline(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                FAILURE_MESSAGE.to_string(),
                Some(error_code(&e)),
            ),
        };

        (status, Json(ErrorResponse { message, error })).into_response()
    }
}
