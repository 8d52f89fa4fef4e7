//! HTTP client for the remote content repository.

use super::{RegisterError, ScrapedDataRepository, SourceData};
use crate::config::RepositoryConfig;
use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;

/// Client for the repository's client-data API. Registration is a two-step
/// handshake: request a signed upload URL for the artifact's logical path,
/// then PUT the file bytes to it.
pub struct HttpRepository {
    client: Client,
    base_url: String,
    auth_token: String,
}

#[derive(Debug, serde::Deserialize)]
struct UploadCredentials {
    signed_url: String,
}

impl HttpRepository {
    pub fn new(config: &RepositoryConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: config.base_url(),
            auth_token: config.auth_token.clone(),
        }
    }

    async fn register(
        &self,
        job_id: i64,
        data: &SourceData,
        local_path: &Path,
        kind: &str,
    ) -> Result<(), RegisterError> {
        let credentials_url = format!("{}/client/{}/upload-credentials", self.base_url, job_id);
        let response = self
            .client
            .get(&credentials_url)
            .query(&[
                ("protocol", "s3"),
                ("relative_path", data.relative_path.as_str()),
            ])
            .header("x-auth-token", &self.auth_token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RegisterError::Refused {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        let credentials: UploadCredentials = response.json().await?;

        let bytes = tokio::fs::read(local_path).await?;
        let upload = self
            .client
            .put(&credentials.signed_url)
            .body(bytes)
            .send()
            .await?;
        if !upload.status().is_success() {
            return Err(RegisterError::Refused {
                status: upload.status().as_u16(),
                message: format!("upload of {} {} rejected", kind, data.relative_path),
            });
        }

        tracing::info!(job_id, kind, path = %data.relative_path, "Registered artifact");
        Ok(())
    }
}

#[async_trait]
impl ScrapedDataRepository for HttpRepository {
    async fn register_photo(
        &self,
        job_id: i64,
        data: &SourceData,
        local_path: &Path,
    ) -> Result<(), RegisterError> {
        self.register(job_id, data, local_path, "photo").await
    }

    async fn register_json(
        &self,
        job_id: i64,
        data: &SourceData,
        local_path: &Path,
    ) -> Result<(), RegisterError> {
        self.register(job_id, data, local_path, "json").await
    }
}
