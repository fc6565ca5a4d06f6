//! HTTP client for the hosted transcription service

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::retry::{self, RetryPolicy};
use super::{JobStatus, TranscriptionJob, TranscriptionService};
use crate::pipeline::AudioBlob;
use crate::{Error, Result};

/// Response from the audio upload endpoint
#[derive(serde::Deserialize)]
struct UploadResponse {
    upload_url: String,
}

/// Response from transcript creation
#[derive(serde::Deserialize)]
struct CreateResponse {
    id: String,
}

/// Transcript status as reported by the service
#[derive(serde::Deserialize)]
struct TranscriptResponse {
    id: String,
    status: String,
    text: Option<String>,
    error: Option<String>,
}

/// Client for the hosted transcription API
///
/// Speaks the three-call protocol: upload raw audio, create a transcript
/// job referencing the uploaded file, then poll the job by id until it
/// reaches a terminal status.
pub struct HttpTranscriptionService {
    client: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
    retry: RetryPolicy,
}

impl HttpTranscriptionService {
    /// Create a new transcription client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty or the base URL is invalid
    pub fn new(base_url: &str, api_key: SecretString) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "transcription API key required (set ASSEMBLYAI_API_KEY)".to_string(),
            ));
        }

        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid transcription base URL: {e}")))?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            retry: RetryPolicy::default(),
        })
    }

    /// Override the default retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("invalid transcription endpoint {path}: {e}")))
    }

    /// Send a request, retrying transient failures with backoff.
    ///
    /// Rate limits (429) honor the `Retry-After` header when present. Errors
    /// that survive all retries are wrapped with `wrap` so each caller keeps
    /// its own error variant.
    async fn send_with_retry<F>(
        &self,
        what: &'static str,
        wrap: fn(String) -> Error,
        build: F,
    ) -> Result<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            match build().send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let retry_after = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(retry::parse_retry_after);
                    let body = response.text().await.unwrap_or_default();

                    if attempt < self.retry.max_retries
                        && retry::is_recoverable(status.as_u16(), &body)
                    {
                        let delay = retry::delay_for_attempt(&self.retry, attempt, retry_after);
                        tracing::warn!(
                            what,
                            status = %status,
                            attempt = attempt + 1,
                            ?delay,
                            "transcription service error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    tracing::error!(what, status = %status, body = %body, "transcription service error");
                    return Err(wrap(format!("{status}: {body}")));
                }
                Err(e) => {
                    if attempt < self.retry.max_retries && retry::is_recoverable(0, &e.to_string())
                    {
                        let delay = retry::delay_for_attempt(&self.retry, attempt, None);
                        tracing::warn!(
                            what,
                            error = %e,
                            attempt = attempt + 1,
                            ?delay,
                            "transcription request failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    tracing::error!(what, error = %e, "transcription request failed");
                    return Err(wrap(e.to_string()));
                }
            }
        }
    }
}

#[async_trait]
impl TranscriptionService for HttpTranscriptionService {
    async fn upload(&self, audio: &AudioBlob) -> Result<String> {
        tracing::debug!(audio_bytes = audio.bytes.len(), "uploading audio");

        let url = self.endpoint("v2/upload")?;
        let bytes = audio.bytes.clone();
        let response = self
            .send_with_retry("upload", Error::Upload, || {
                self.client
                    .post(url.clone())
                    .header("authorization", self.api_key.expose_secret())
                    .header("content-type", "application/octet-stream")
                    .body(bytes.clone())
            })
            .await?;

        let result: UploadResponse = response
            .json()
            .await
            .map_err(|e| Error::Upload(format!("invalid upload response: {e}")))?;

        tracing::debug!(upload_url = %result.upload_url, "audio uploaded");
        Ok(result.upload_url)
    }

    async fn create_job(&self, audio_url: &str) -> Result<String> {
        let url = self.endpoint("v2/transcript")?;
        let payload = serde_json::json!({ "audio_url": audio_url });
        let response = self
            .send_with_retry("create_job", Error::JobCreation, || {
                self.client
                    .post(url.clone())
                    .header("authorization", self.api_key.expose_secret())
                    .json(&payload)
            })
            .await?;

        let result: CreateResponse = response
            .json()
            .await
            .map_err(|e| Error::JobCreation(format!("invalid create response: {e}")))?;

        tracing::debug!(job_id = %result.id, "transcription job created");
        Ok(result.id)
    }

    async fn fetch_job(&self, job_id: &str) -> Result<TranscriptionJob> {
        let url = self.endpoint(&format!("v2/transcript/{job_id}"))?;
        let wrap: fn(String) -> Error =
            |detail| Error::TranscriptionFailed(format!("status check failed: {detail}"));
        let response = self
            .send_with_retry("fetch_job", wrap, || {
                self.client
                    .get(url.clone())
                    .header("authorization", self.api_key.expose_secret())
            })
            .await?;

        let result: TranscriptResponse = response.json().await.map_err(|e| {
            Error::TranscriptionFailed(format!("invalid transcript response: {e}"))
        })?;

        let status = match result.status.as_str() {
            "queued" | "processing" => JobStatus::Pending,
            "completed" => JobStatus::Completed(result.text),
            "error" => JobStatus::Failed(
                result
                    .error
                    .unwrap_or_else(|| "transcription service reported an error".to_string()),
            ),
            other => {
                tracing::warn!(job_id = %result.id, status = %other, "unknown transcript status");
                JobStatus::Pending
            }
        };

        Ok(TranscriptionJob {
            id: result.id,
            status,
        })
    }
}
