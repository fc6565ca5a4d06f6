//! Text-to-speech synthesis

use async_trait::async_trait;
use url::Url;

use crate::pipeline::TtsProvider;
use crate::{Error, Result};

/// Longest text the synthesis endpoint accepts in a single request
pub const MAX_TTS_CHARS: usize = 200;

/// Synthesizes speech from text via the public translate endpoint
///
/// The endpoint is unauthenticated and only handles short English text,
/// so requests are validated up front and sent exactly once. A failed
/// synthesis fails the whole turn; requests are never retried.
pub struct SpeechSynthesizer {
    client: reqwest::Client,
    base_url: Url,
    language: String,
}

impl SpeechSynthesizer {
    /// Create a new synthesizer
    ///
    /// # Errors
    ///
    /// Returns error if the language is not "en" or the base URL is invalid
    pub fn new(base_url: &str, language: &str) -> Result<Self> {
        if language != "en" {
            return Err(Error::Config(format!(
                "unsupported synthesis language \"{language}\" (only \"en\" is available)"
            )));
        }

        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid synthesis base URL: {e}")))?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            language: language.to_string(),
        })
    }

    /// Synthesize text to speech
    ///
    /// # Returns
    ///
    /// Audio bytes (MP3 format)
    ///
    /// # Errors
    ///
    /// Returns error if the text is empty, exceeds [`MAX_TTS_CHARS`], or
    /// the synthesis request fails
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        if text.is_empty() {
            return Err(Error::Synthesis("cannot synthesize empty text".to_string()));
        }

        let chars = text.chars().count();
        if chars > MAX_TTS_CHARS {
            return Err(Error::Synthesis(format!(
                "text too long for synthesis ({chars} chars, limit {MAX_TTS_CHARS})"
            )));
        }

        tracing::debug!(chars, "starting speech synthesis");

        let response = self
            .client
            .get(self.base_url.clone())
            .query(&[
                ("ie", "UTF-8"),
                ("q", text),
                ("tl", self.language.as_str()),
                ("client", "tw-ob"),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "synthesis request failed");
                Error::Synthesis(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "synthesis endpoint error");
            return Err(Error::Synthesis(format!(
                "synthesis endpoint error {status}: {body}"
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        tracing::debug!(audio_bytes = audio.len(), "synthesis complete");
        Ok(audio.to_vec())
    }
}

#[async_trait]
impl TtsProvider for SpeechSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        Self::synthesize(self, text).await
    }
}
