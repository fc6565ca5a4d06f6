//! Turn pipeline: transcribe, reply, synthesize, publish
//!
//! One audio turn flows through four stages in strict order. A failure at
//! any stage abandons the turn; the response never mixes results from a
//! partially completed run.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::publish::ArtifactPublisher;
use crate::reply::ReplyRules;
use crate::{Error, Result};

/// Captured audio with its MIME type
#[derive(Debug, Clone)]
pub struct AudioBlob {
    /// Encoded audio bytes
    pub bytes: Vec<u8>,
    /// MIME type of the encoding (e.g. "audio/wav")
    pub mime_type: String,
}

impl AudioBlob {
    /// Create a blob from bytes and a MIME type
    #[must_use]
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Create a WAV blob
    #[must_use]
    pub fn wav(bytes: Vec<u8>) -> Self {
        Self::new(bytes, "audio/wav")
    }
}

/// Speech-to-text capability
#[async_trait]
pub trait SttProvider: Send + Sync {
    /// Transcribe audio to text
    ///
    /// # Errors
    ///
    /// Returns error if transcription fails
    async fn transcribe(&self, audio: &AudioBlob) -> Result<String>;
}

/// Text-to-speech capability
#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Synthesize text to MP3 audio bytes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Completed turn: the reply text and where its audio can be fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReply {
    /// Reply text
    pub text: String,
    /// URL of the synthesized reply audio (may be a data URI)
    #[serde(rename = "audioUrl")]
    pub audio_url: String,
}

/// Pipeline stage, for failure attribution in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Accepting the incoming audio
    Receiving,
    /// Uploading audio to the transcription service
    Uploading,
    /// Waiting on the transcription job
    Transcribing,
    /// Synthesizing the reply audio
    Synthesizing,
    /// Publishing the reply audio
    Publishing,
}

impl Stage {
    /// Attribute an error to the stage that produced it
    #[must_use]
    pub const fn of(error: &Error) -> Self {
        match error {
            Error::Upload(_) => Self::Uploading,
            Error::JobCreation(_)
            | Error::TranscriptionFailed(_)
            | Error::TranscriptionTimeout(_) => Self::Transcribing,
            Error::Synthesis(_) => Self::Synthesizing,
            Error::Publish(_) => Self::Publishing,
            _ => Self::Receiving,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Receiving => "receiving",
            Self::Uploading => "uploading",
            Self::Transcribing => "transcribing",
            Self::Synthesizing => "synthesizing",
            Self::Publishing => "publishing",
        };
        f.write_str(name)
    }
}

/// Runs one audio turn end to end
pub struct Pipeline {
    stt: Arc<dyn SttProvider>,
    rules: ReplyRules,
    tts: Arc<dyn TtsProvider>,
    publisher: Arc<dyn ArtifactPublisher>,
}

impl Pipeline {
    /// Create a pipeline from its stage providers
    #[must_use]
    pub fn new(
        stt: Arc<dyn SttProvider>,
        rules: ReplyRules,
        tts: Arc<dyn TtsProvider>,
        publisher: Arc<dyn ArtifactPublisher>,
    ) -> Self {
        Self {
            stt,
            rules,
            tts,
            publisher,
        }
    }

    /// Process one turn of captured audio
    ///
    /// # Errors
    ///
    /// Returns the first stage error; the turn is abandoned at that point
    /// and no partial result is produced
    pub async fn process(&self, audio: AudioBlob) -> Result<TurnReply> {
        let request_id = uuid::Uuid::new_v4();
        tracing::debug!(
            %request_id,
            audio_bytes = audio.bytes.len(),
            mime_type = %audio.mime_type,
            "processing turn"
        );

        match self.run_stages(&audio).await {
            Ok(reply) => {
                tracing::info!(%request_id, text = %reply.text, "turn processed");
                Ok(reply)
            }
            Err(e) => {
                tracing::error!(%request_id, stage = %Stage::of(&e), error = %e, "turn failed");
                Err(e)
            }
        }
    }

    async fn run_stages(&self, audio: &AudioBlob) -> Result<TurnReply> {
        let transcript = self.stt.transcribe(audio).await?;
        let text = self.rules.reply(&transcript);
        let speech = self.tts.synthesize(&text).await?;
        let audio_url = self.publisher.publish(&speech).await?;

        Ok(TurnReply { text, audio_url })
    }
}
