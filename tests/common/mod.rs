//! Shared test utilities
//!
//! Stub pipeline stages so turns run without any external service.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use talkback::pipeline::{AudioBlob, Pipeline, SttProvider, TtsProvider};
use talkback::publish::ArtifactPublisher;
use talkback::reply::ReplyRules;
use talkback::{Error, Result};

/// Reply audio URL returned by the stub publisher
pub const STUB_AUDIO_URL: &str = "https://cdn.example/test.mp3";

/// What the stub transcriber does with a turn
#[derive(Clone, Copy)]
pub enum SttOutcome {
    Transcript(&'static str),
    UploadError,
    JobCreationError,
    TranscriptionFailed,
    TranscriptionTimeout,
}

/// Stub speech-to-text with a scripted outcome
pub struct StubStt {
    outcome: SttOutcome,
}

impl StubStt {
    pub fn new(outcome: SttOutcome) -> Self {
        Self { outcome }
    }
}

#[async_trait]
impl SttProvider for StubStt {
    async fn transcribe(&self, _audio: &AudioBlob) -> Result<String> {
        match self.outcome {
            SttOutcome::Transcript(text) => Ok(text.to_string()),
            SttOutcome::UploadError => Err(Error::Upload("stub upload failure".to_string())),
            SttOutcome::JobCreationError => {
                Err(Error::JobCreation("stub job creation failure".to_string()))
            }
            SttOutcome::TranscriptionFailed => {
                Err(Error::TranscriptionFailed("stub terminal failure".to_string()))
            }
            SttOutcome::TranscriptionTimeout => {
                Err(Error::TranscriptionTimeout("stub stuck job".to_string()))
            }
        }
    }
}

/// Stub text-to-speech counting invocations
pub struct StubTts {
    fail: bool,
    calls: AtomicU32,
}

impl StubTts {
    pub fn ok() -> Self {
        Self {
            fail: false,
            calls: AtomicU32::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TtsProvider for StubTts {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Synthesis("stub synthesis failure".to_string()));
        }
        Ok(vec![0x49, 0x44, 0x33])
    }
}

/// Stub publisher returning a fixed URL
pub struct StubPublisher {
    fail: bool,
    calls: AtomicU32,
}

impl StubPublisher {
    pub fn ok() -> Self {
        Self {
            fail: false,
            calls: AtomicU32::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactPublisher for StubPublisher {
    async fn publish(&self, _audio: &[u8]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Publish("stub publish failure".to_string()));
        }
        Ok(STUB_AUDIO_URL.to_string())
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Pipeline with a scripted transcriber and succeeding later stages
pub fn stub_pipeline(outcome: SttOutcome, rules: ReplyRules) -> Pipeline {
    Pipeline::new(
        Arc::new(StubStt::new(outcome)),
        rules,
        Arc::new(StubTts::ok()),
        Arc::new(StubPublisher::ok()),
    )
}
