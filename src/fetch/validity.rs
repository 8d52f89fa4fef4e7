//! Frame validity heuristic.

use image::DynamicImage;

/// Rejects uniformly blank frames.
///
/// The rule is intentionally coarse: a frame whose mean pixel intensity
/// across all channels is exactly zero is a dead capture (camera offline,
/// shutter closed, black test card). Partially corrupt or frozen frames
/// pass. Known limitation, kept for behavioral compatibility with earlier
/// runs; the cutoff is exposed so operators can raise it for near-black
/// night captures.
#[derive(Debug, Clone, Copy)]
pub struct BlankFilter {
    /// Mean-intensity cutoff; frames at or below it are rejected.
    pub threshold: f64,
}

impl Default for BlankFilter {
    fn default() -> Self {
        Self { threshold: 0.0 }
    }
}

impl BlankFilter {
    pub fn is_valid(&self, image: &DynamicImage) -> bool {
        mean_intensity(image) > self.threshold
    }
}

fn mean_intensity(image: &DynamicImage) -> f64 {
    let rgb = image.to_rgb8();
    let samples = rgb.as_raw();
    if samples.is_empty() {
        return 0.0;
    }
    let sum: u64 = samples.iter().map(|&v| u64::from(v)).sum();
    sum as f64 / samples.len() as f64
}
