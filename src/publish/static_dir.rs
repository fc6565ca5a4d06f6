//! Local file publication under a public-servable directory

use std::path::PathBuf;

use async_trait::async_trait;

use super::{ArtifactPublisher, artifact_name};
use crate::{Error, Result};

/// Route where the API server mounts the artifact directory
pub const AUDIO_ROUTE: &str = "/audio";

/// Writes reply audio under a directory the API server serves at
/// [`AUDIO_ROUTE`], returning a server-relative URL
pub struct StaticDirPublisher {
    root: PathBuf,
}

impl StaticDirPublisher {
    /// Create a publisher rooted at `root`
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl ArtifactPublisher for StaticDirPublisher {
    async fn publish(&self, audio: &[u8]) -> Result<String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Error::Publish(format!("cannot create artifact directory: {e}")))?;

        let name = artifact_name();
        let path = self.root.join(&name);
        tokio::fs::write(&path, audio)
            .await
            .map_err(|e| Error::Publish(format!("cannot write artifact: {e}")))?;

        tracing::debug!(path = %path.display(), audio_bytes = audio.len(), "reply audio written");
        Ok(format!("{AUDIO_ROUTE}/{name}"))
    }

    fn name(&self) -> &'static str {
        "static-dir"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_artifact_and_returns_relative_url() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = StaticDirPublisher::new(dir.path().to_path_buf());

        let url = publisher.publish(b"mp3 bytes").await.unwrap();

        assert!(url.starts_with("/audio/response-"), "unexpected url: {url}");
        assert!(url.ends_with(".mp3"), "unexpected url: {url}");

        let name = url.strip_prefix("/audio/").unwrap();
        let written = std::fs::read(dir.path().join(name)).unwrap();
        assert_eq!(written, b"mp3 bytes");
    }

    #[tokio::test]
    async fn creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let publisher = StaticDirPublisher::new(nested.clone());

        publisher.publish(b"x").await.unwrap();

        assert!(nested.is_dir());
    }
}
