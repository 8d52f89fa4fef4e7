//! Image acquisition from webcam sources.

pub mod roundshot;
pub mod stream;
pub mod validity;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use image::DynamicImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

/// A webcam source: either a direct snapshot endpoint, or a Roundshot
/// webcam id resolved into a per-instant archive URL.
#[derive(Debug, Clone)]
pub enum Source {
    StreamUrl(String),
    RoundshotWebcam(String),
}

/// Trait for image fetchers. One attempt per call; every failure mode is
/// returned as a `FetchError` so the scrape loop can record it as a failed
/// tick without aborting the run.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, instant: DateTime<Utc>) -> Result<DynamicImage, FetchError>;
}

/// Build the fetcher matching a source descriptor.
pub fn fetcher_for(source: &Source) -> Box<dyn ImageFetcher> {
    match source {
        Source::StreamUrl(url) => Box::new(stream::StreamUrlFetcher::new(url.clone())),
        Source::RoundshotWebcam(id) => Box::new(roundshot::RoundshotFetcher::new(id.clone())),
    }
}
