//! Reply audio publication
//!
//! The synthesized MP3 has to land somewhere the client can fetch it.
//! Exactly one strategy is active per deployment, selected by
//! configuration: signed upload to object storage, a file under a
//! public-servable directory, or a data URI inlined in the response.

mod cloudinary;
mod inline;
mod static_dir;

pub use cloudinary::CloudinaryPublisher;
pub use inline::InlinePublisher;
pub use static_dir::{AUDIO_ROUTE, StaticDirPublisher};

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{StorageConfig, StorageStrategy};
use crate::{Error, Result};

/// Publishes synthesized reply audio
#[async_trait]
pub trait ArtifactPublisher: Send + Sync {
    /// Publish MP3 bytes, returning a URL the client can resolve
    ///
    /// # Errors
    ///
    /// Returns error if publication fails
    async fn publish(&self, audio: &[u8]) -> Result<String>;

    /// Strategy name for logging
    fn name(&self) -> &'static str;
}

/// Timestamped artifact file name, unique per turn at millisecond resolution
#[must_use]
pub fn artifact_name() -> String {
    format!("response-{}.mp3", chrono::Utc::now().timestamp_millis())
}

/// Build the publisher for the configured storage strategy
///
/// # Errors
///
/// Returns error if the selected strategy is missing required credentials
pub fn for_strategy(storage: &StorageConfig) -> Result<Arc<dyn ArtifactPublisher>> {
    match storage.strategy {
        StorageStrategy::Cloudinary => {
            let cloud_name = storage.cloud_name.clone().ok_or_else(|| {
                Error::Config("CLOUDINARY_CLOUD_NAME required for cloudinary storage".to_string())
            })?;
            let api_key = storage.api_key.clone().ok_or_else(|| {
                Error::Config("CLOUDINARY_API_KEY required for cloudinary storage".to_string())
            })?;
            let api_secret = storage.api_secret.clone().ok_or_else(|| {
                Error::Config("CLOUDINARY_API_SECRET required for cloudinary storage".to_string())
            })?;

            Ok(Arc::new(CloudinaryPublisher::new(
                &storage.base_url,
                cloud_name,
                api_key,
                api_secret,
            )?))
        }
        StorageStrategy::StaticDir => {
            let root = storage.static_dir.clone().ok_or_else(|| {
                Error::Config("artifact directory required for static storage".to_string())
            })?;

            Ok(Arc::new(StaticDirPublisher::new(root)))
        }
        StorageStrategy::Inline => Ok(Arc::new(InlinePublisher)),
    }
}
