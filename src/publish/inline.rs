//! Inline data URI publication

use async_trait::async_trait;
use base64::Engine;

use super::ArtifactPublisher;
use crate::Result;

/// Embeds reply audio in the response itself as a data URI
///
/// Needs no credentials and no disk, at the cost of response payloads
/// carrying the full audio. This is the default strategy.
pub struct InlinePublisher;

#[async_trait]
impl ArtifactPublisher for InlinePublisher {
    async fn publish(&self, audio: &[u8]) -> Result<String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(audio);
        Ok(format!("data:audio/mpeg;base64,{encoded}"))
    }

    fn name(&self) -> &'static str {
        "inline"
    }
}
