//! Weather-condition classification from the Open-Meteo archive API.
//!
//! Augments a scrape run with a coarse condition label for its window,
//! derived from hourly rain, snowfall, cloud cover, and sunshine series.
//! Classifier training and on-image inference are out of scope; this is
//! the API-backed collaborator only.

use crate::scrape::CaptureRecord;
use crate::storage::path::{self, RunScope};
use crate::storage::{self, ScrapedDataRepository, SourceData};
use anyhow::Context;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

const ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";

/// Coarse condition label for a window of hourly observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Rainy,
    Snowy,
    Sunny,
    Cloudy,
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::Rainy => write!(f, "rainy"),
            Condition::Snowy => write!(f, "snowy"),
            Condition::Sunny => write!(f, "sunny"),
            Condition::Cloudy => write!(f, "cloudy"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    hourly: HourlySeries,
}

#[derive(Debug, Default, Deserialize)]
struct HourlySeries {
    #[serde(default)]
    rain: Vec<f64>,
    #[serde(default)]
    snowfall: Vec<f64>,
    #[serde(default)]
    cloud_cover: Vec<f64>,
    #[serde(default)]
    sunshine_duration: Vec<f64>,
}

/// Observation document persisted and registered for a classified window.
#[derive(Debug, Serialize)]
pub struct WeatherObservation {
    pub kind: &'static str,
    pub condition: Condition,
    pub date: String,
    pub latitude: String,
    pub longitude: String,
}

/// Classify from window averages. Any rain wins, then snow; clear skies
/// with recorded sunshine are sunny; everything else is cloudy.
fn classify(hourly: &HourlySeries) -> Condition {
    if mean(&hourly.rain) > 0.0 {
        Condition::Rainy
    } else if mean(&hourly.snowfall) > 0.0 {
        Condition::Snowy
    } else if mean(&hourly.cloud_cover) < 20.0 && mean(&hourly.sunshine_duration) > 0.0 {
        Condition::Sunny
    } else {
        Condition::Cloudy
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Fetch the hourly archive series for the window and reduce it to a label.
pub async fn fetch_condition(
    client: &Client,
    latitude: &str,
    longitude: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<Condition> {
    let start = start.to_string();
    let end = end.to_string();
    let response = client
        .get(ARCHIVE_URL)
        .query(&[
            ("latitude", latitude),
            ("longitude", longitude),
            ("start_date", start.as_str()),
            ("end_date", end.as_str()),
            ("hourly", "rain,snowfall,cloud_cover,sunshine_duration"),
        ])
        .send()
        .await
        .context("weather archive request failed")?
        .error_for_status()
        .context("weather archive rejected request")?;
    let archive: ArchiveResponse = response
        .json()
        .await
        .context("weather archive response malformed")?;
    Ok(classify(&archive.hourly))
}

/// Classify the window, persist the observation JSON into the scratch
/// directory, and register it under the `augmented` dataset label.
pub async fn run(
    scope: &RunScope,
    latitude: &str,
    longitude: &str,
    start: NaiveDate,
    end: NaiveDate,
    scratch: &storage::ScratchDir,
    repository: &dyn ScrapedDataRepository,
) -> anyhow::Result<CaptureRecord> {
    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to build HTTP client");

    let condition = fetch_condition(&client, latitude, longitude, start, end).await?;
    info!(job_id = scope.job_id, %condition, "Classified window");

    let observation = WeatherObservation {
        kind: "API",
        condition,
        date: start.to_string(),
        latitude: latitude.to_string(),
        longitude: longitude.to_string(),
    };

    let name = format!("webcam_{}_{}_{}", latitude, longitude, start);
    let local_path = scratch.join(format!("results/{}.json", path::sanitize(&name)));
    storage::save_json(&observation, &local_path)?;

    let relative_path = path::augmented_path(scope, &name);
    let data = SourceData {
        name: name.clone(),
        relative_path: relative_path.clone(),
    };
    repository
        .register_json(scope.job_id, &data, &local_path)
        .await
        .context("could not register weather observation")?;

    Ok(CaptureRecord {
        name,
        relative_path,
        local_path,
    })
}
