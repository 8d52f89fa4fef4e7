use super::{FetchError, ImageFetcher};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use image::DynamicImage;
use reqwest::Client;
use std::time::Duration;

/// Fetcher for direct snapshot/stream endpoints that serve the current
/// frame at a fixed URL.
pub struct StreamUrlFetcher {
    client: Client,
    url: String,
}

impl StreamUrlFetcher {
    pub fn new(url: String) -> Self {
        let url = if url.starts_with("http") {
            url
        } else {
            format!("http://{}", url)
        };
        Self {
            client: default_client(),
            url,
        }
    }
}

#[async_trait]
impl ImageFetcher for StreamUrlFetcher {
    async fn fetch(&self, _instant: DateTime<Utc>) -> Result<DynamicImage, FetchError> {
        fetch_and_decode(&self.client, &self.url).await
    }
}

pub(super) fn default_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to build HTTP client")
}

/// GET a URL and decode the body as an image.
pub(super) async fn fetch_and_decode(client: &Client, url: &str) -> Result<DynamicImage, FetchError> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(FetchError::Status {
            status: response.status().as_u16(),
            url: url.to_string(),
        });
    }
    let bytes = response.bytes().await?;
    Ok(image::load_from_memory(&bytes)?)
}
