use super::stream::{default_client, fetch_and_decode};
use super::{FetchError, ImageFetcher};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use image::DynamicImage;
use reqwest::Client;

/// Fetcher for the Roundshot timelapse archive. The webcam id is resolved
/// into a per-instant URL encoding year/month/day/hour/minute, so range
/// windows can replay historical captures.
pub struct RoundshotFetcher {
    client: Client,
    webcam_id: String,
}

impl RoundshotFetcher {
    pub fn new(webcam_id: String) -> Self {
        Self {
            client: default_client(),
            webcam_id,
        }
    }

    /// Archive layout: `<id>/<yyyy-mm-dd>/<hh-mm-00>/<yyyy-mm-dd-hh-mm-00>_full.jpg`.
    /// Captures are published on full minutes; seconds are always zeroed.
    fn archive_url(&self, instant: DateTime<Utc>) -> String {
        let day = instant.format("%Y-%m-%d").to_string();
        let slot = instant.format("%H-%M-00").to_string();
        format!(
            "https://storage.roundshot.com/{}/{}/{}/{}-{}_full.jpg",
            self.webcam_id, day, slot, day, slot
        )
    }
}

#[async_trait]
impl ImageFetcher for RoundshotFetcher {
    async fn fetch(&self, instant: DateTime<Utc>) -> Result<DynamicImage, FetchError> {
        fetch_and_decode(&self.client, &self.archive_url(instant)).await
    }
}
