//! Speech-to-text pipeline stage
//!
//! Transcription is asynchronous on the service side: audio is uploaded,
//! a job is created referencing the upload, and the job is polled until
//! it reaches a terminal status. [`TranscriptionPoller`] owns the polling
//! loop and its bounds; [`HttpTranscriptionService`] speaks the wire
//! protocol.

pub mod http;
pub mod retry;

pub use http::HttpTranscriptionService;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::pipeline::{AudioBlob, SttProvider};
use crate::{Error, Result};

/// Status of a transcription job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Queued or still processing
    Pending,
    /// Finished; the service may omit text for silent audio
    Completed(Option<String>),
    /// The service gave up on the job
    Failed(String),
}

/// A transcription job snapshot
#[derive(Debug, Clone)]
pub struct TranscriptionJob {
    /// Service-assigned job id
    pub id: String,
    /// Status at fetch time
    pub status: JobStatus,
}

/// Operations of a remote transcription service
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Upload raw audio, returning a service URL for the stored file
    async fn upload(&self, audio: &AudioBlob) -> Result<String>;

    /// Create a transcription job for previously uploaded audio
    async fn create_job(&self, audio_url: &str) -> Result<String>;

    /// Fetch the current state of a job
    async fn fetch_job(&self, job_id: &str) -> Result<TranscriptionJob>;
}

/// Bounds for the status polling loop
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    /// Delay between consecutive status checks
    pub interval: Duration,
    /// Status checks before the job is declared stuck
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 120,
        }
    }
}

/// Drives a transcription job from submission to terminal status
///
/// Polling is bounded: a job that never leaves `Pending` within
/// `max_attempts` checks yields [`Error::TranscriptionTimeout`] rather
/// than spinning forever.
pub struct TranscriptionPoller {
    service: Arc<dyn TranscriptionService>,
    policy: PollPolicy,
}

impl TranscriptionPoller {
    /// Create a poller with the default policy
    #[must_use]
    pub fn new(service: Arc<dyn TranscriptionService>) -> Self {
        Self::with_policy(service, PollPolicy::default())
    }

    /// Create a poller with an explicit policy
    #[must_use]
    pub fn with_policy(service: Arc<dyn TranscriptionService>, policy: PollPolicy) -> Self {
        Self { service, policy }
    }

    /// Upload audio and create a transcription job, returning the job id
    ///
    /// # Errors
    ///
    /// Returns error if the upload or job creation fails
    pub async fn submit(&self, audio: &AudioBlob) -> Result<String> {
        let audio_url = self.service.upload(audio).await?;
        self.service.create_job(&audio_url).await
    }

    /// Poll a job until it reaches a terminal status
    ///
    /// Sleeps `interval` between checks but not after the final one. A
    /// completed job with no text yields an empty transcript.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TranscriptionFailed`] if the service reports the
    /// job failed, or [`Error::TranscriptionTimeout`] if the job is still
    /// pending after `max_attempts` checks
    pub async fn await_result(&self, job_id: &str) -> Result<String> {
        for attempt in 1..=self.policy.max_attempts {
            let job = self.service.fetch_job(job_id).await?;

            match job.status {
                JobStatus::Completed(text) => {
                    let transcript = text.unwrap_or_default();
                    tracing::info!(job_id, attempts = attempt, transcript = %transcript, "transcription complete");
                    return Ok(transcript);
                }
                JobStatus::Failed(detail) => {
                    tracing::error!(job_id, detail = %detail, "transcription job failed");
                    return Err(Error::TranscriptionFailed(detail));
                }
                JobStatus::Pending => {
                    if attempt < self.policy.max_attempts {
                        tokio::time::sleep(self.policy.interval).await;
                    }
                }
            }
        }

        Err(Error::TranscriptionTimeout(format!(
            "job {job_id} still pending after {} status checks",
            self.policy.max_attempts
        )))
    }
}

#[async_trait]
impl SttProvider for TranscriptionPoller {
    async fn transcribe(&self, audio: &AudioBlob) -> Result<String> {
        let job_id = self.submit(audio).await?;
        self.await_result(&job_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Plays back a scripted sequence of job statuses, counting calls.
    /// An exhausted script keeps reporting `Pending`.
    struct ScriptedService {
        script: Mutex<VecDeque<JobStatus>>,
        uploads: AtomicU32,
        creates: AtomicU32,
        fetches: AtomicU32,
    }

    impl ScriptedService {
        fn new(script: Vec<JobStatus>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                uploads: AtomicU32::new(0),
                creates: AtomicU32::new(0),
                fetches: AtomicU32::new(0),
            }
        }

        fn fetches(&self) -> u32 {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TranscriptionService for ScriptedService {
        async fn upload(&self, _audio: &AudioBlob) -> Result<String> {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            Ok("https://stt.example/upload/abc".to_string())
        }

        async fn create_job(&self, _audio_url: &str) -> Result<String> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            Ok("job-1".to_string())
        }

        async fn fetch_job(&self, job_id: &str) -> Result<TranscriptionJob> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let status = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(JobStatus::Pending);
            Ok(TranscriptionJob {
                id: job_id.to_string(),
                status,
            })
        }
    }

    fn poller(service: Arc<ScriptedService>, max_attempts: u32) -> TranscriptionPoller {
        TranscriptionPoller::with_policy(
            service,
            PollPolicy {
                interval: Duration::from_secs(1),
                max_attempts,
            },
        )
    }

    fn wav_blob() -> AudioBlob {
        AudioBlob::wav(vec![0u8; 16])
    }

    #[tokio::test]
    async fn submit_uploads_then_creates_without_polling() {
        let service = Arc::new(ScriptedService::new(vec![]));
        let p = poller(Arc::clone(&service), 10);

        let job_id = p.submit(&wav_blob()).await.unwrap();

        assert_eq!(job_id, "job-1");
        assert_eq!(service.uploads.load(Ordering::SeqCst), 1);
        assert_eq!(service.creates.load(Ordering::SeqCst), 1);
        assert_eq!(service.fetches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_then_completed_sleeps_between_checks() {
        let service = Arc::new(ScriptedService::new(vec![
            JobStatus::Pending,
            JobStatus::Pending,
            JobStatus::Completed(Some("hello world".to_string())),
        ]));
        let p = poller(Arc::clone(&service), 10);

        let start = tokio::time::Instant::now();
        let transcript = p.await_result("job-1").await.unwrap();

        // Two Pending checks cost one interval each; the terminal check costs none
        assert_eq!(transcript, "hello world");
        assert_eq!(service.fetches(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_job_surfaces_service_detail() {
        let service = Arc::new(ScriptedService::new(vec![
            JobStatus::Pending,
            JobStatus::Failed("audio too short".to_string()),
        ]));
        let p = poller(Arc::clone(&service), 10);

        let err = p.await_result("job-1").await.unwrap_err();

        assert!(matches!(err, Error::TranscriptionFailed(ref d) if d == "audio too short"));
        assert_eq!(service.fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn permanently_pending_job_times_out() {
        let service = Arc::new(ScriptedService::new(vec![]));
        let p = poller(Arc::clone(&service), 5);

        let err = p.await_result("job-1").await.unwrap_err();

        assert!(matches!(err, Error::TranscriptionTimeout(_)));
        assert_eq!(service.fetches(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_does_not_sleep_after_final_check() {
        let service = Arc::new(ScriptedService::new(vec![]));
        let p = poller(Arc::clone(&service), 3);

        let start = tokio::time::Instant::now();
        let _ = p.await_result("job-1").await;

        // 3 checks, 2 sleeps
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn completed_without_text_yields_empty_transcript() {
        let service = Arc::new(ScriptedService::new(vec![JobStatus::Completed(None)]));
        let p = poller(service, 10);

        let transcript = p.await_result("job-1").await.unwrap();

        assert_eq!(transcript, "");
    }

    #[tokio::test]
    async fn transcribe_composes_submit_and_poll() {
        let service = Arc::new(ScriptedService::new(vec![JobStatus::Completed(Some(
            "hi".to_string(),
        ))]));
        let p = poller(Arc::clone(&service), 10);

        let transcript = p.transcribe(&wav_blob()).await.unwrap();

        assert_eq!(transcript, "hi");
        assert_eq!(service.uploads.load(Ordering::SeqCst), 1);
        assert_eq!(service.creates.load(Ordering::SeqCst), 1);
        assert_eq!(service.fetches(), 1);
    }
}
