//! framegrab -- batch webcam capture and registration.
//!
//! This crate provides the scrape loop that drives timed webcam captures,
//! the frame validity filter, local/remote persistence, and the
//! weather-condition classifier used to augment a run.

pub mod config;
pub mod fetch;
pub mod scrape;
pub mod storage;
pub mod weather;

pub use scrape::{JobOutcome, JobState};
