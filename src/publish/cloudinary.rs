//! Signed upload to remote object storage

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use url::Url;

use super::{ArtifactPublisher, artifact_name};
use crate::{Error, Result};

/// Response from the storage upload endpoint
#[derive(serde::Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Publishes reply audio to Cloudinary
///
/// Audio files ride the video upload endpoint, per the service's resource
/// type mapping. Each upload is signed with a SHA-256 digest over the
/// signed parameters plus the API secret.
pub struct CloudinaryPublisher {
    client: reqwest::Client,
    base_url: Url,
    cloud_name: String,
    api_key: String,
    api_secret: SecretString,
}

impl CloudinaryPublisher {
    /// Create a new publisher
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is invalid
    pub fn new(
        base_url: &str,
        cloud_name: String,
        api_key: String,
        api_secret: SecretString,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid storage base URL: {e}")))?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            cloud_name,
            api_key,
            api_secret,
        })
    }

    /// Compute the upload signature over the signed parameters
    ///
    /// Parameters are serialized in alphabetical order, then the API secret
    /// is appended and the whole string digested with SHA-256.
    fn sign(&self, public_id: &str, timestamp: i64) -> String {
        let payload = format!(
            "public_id={public_id}&timestamp={timestamp}{}",
            self.api_secret.expose_secret()
        );
        hex::encode(Sha256::digest(payload.as_bytes()))
    }
}

#[async_trait]
impl ArtifactPublisher for CloudinaryPublisher {
    async fn publish(&self, audio: &[u8]) -> Result<String> {
        let file_name = artifact_name();
        let public_id = file_name.trim_end_matches(".mp3").to_string();
        let timestamp = chrono::Utc::now().timestamp();
        let signature = self.sign(&public_id, timestamp);

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name(file_name)
                    .mime_str("audio/mpeg")
                    .map_err(|e| Error::Publish(e.to_string()))?,
            )
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("public_id", public_id.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let url = self
            .base_url
            .join(&format!("v1_1/{}/video/upload", self.cloud_name))
            .map_err(|e| Error::Publish(e.to_string()))?;

        tracing::debug!(public_id = %public_id, audio_bytes = audio.len(), "uploading reply audio");

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "storage upload request failed");
                Error::Publish(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "storage upload error");
            return Err(Error::Publish(format!(
                "storage upload error {status}: {body}"
            )));
        }

        let result: UploadResponse = response
            .json()
            .await
            .map_err(|e| Error::Publish(format!("invalid upload response: {e}")))?;

        tracing::info!(url = %result.secure_url, "reply audio published");
        Ok(result.secure_url)
    }

    fn name(&self) -> &'static str {
        "cloudinary"
    }
}
