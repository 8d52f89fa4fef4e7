//! Canonical logical-path scheme for remote registration.
//!
//! Captures: `{case_study}/{tracer_id}/{job_id}/{timestamp}/{label}/{name}.{ext}`
//! Reports:  `{case_study}/{tracer_id}/{job_id}/webcam_report/{name}.json`
//! Weather:  `{case_study}/{tracer_id}/{job_id}/augmented/{name}.json`
//!
//! Paths are fully derived from run identifiers and the capture instant, so
//! re-running with identical parameters reproduces identical paths.

/// Identifiers shared by every artifact a run produces.
#[derive(Debug, Clone)]
pub struct RunScope {
    pub case_study: String,
    pub tracer_id: String,
    pub job_id: i64,
}

/// Replace characters outside `[A-Za-z0-9_.-]` with underscores.
pub fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Logical path for one capture, keyed by its tick timestamp and dataset label.
pub fn capture_path(scope: &RunScope, timestamp: i64, label: &str, name: &str, ext: &str) -> String {
    format!(
        "{}/{}/{}/{}/{}/{}.{}",
        sanitize(&scope.case_study),
        sanitize(&scope.tracer_id),
        scope.job_id,
        timestamp,
        sanitize(label),
        sanitize(name),
        ext
    )
}

/// Logical path for the run report.
pub fn report_path(scope: &RunScope, name: &str) -> String {
    format!(
        "{}/{}/{}/webcam_report/{}.json",
        sanitize(&scope.case_study),
        sanitize(&scope.tracer_id),
        scope.job_id,
        sanitize(name)
    )
}

/// Logical path for a weather-augmentation document.
pub fn augmented_path(scope: &RunScope, name: &str) -> String {
    format!(
        "{}/{}/{}/augmented/{}.json",
        sanitize(&scope.case_study),
        sanitize(&scope.tracer_id),
        scope.job_id,
        sanitize(name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> RunScope {
        RunScope {
            case_study: "webcam".into(),
            tracer_id: "tracer-1".into(),
            job_id: 42,
        }
    }

    #[test]
    fn test_capture_path_layout() {
        assert_eq!(
            capture_path(&scope(), 1714543200, "scraped", "webcam_46.0_7.5_1714543200", "png"),
            "webcam/tracer-1/42/1714543200/scraped/webcam_46.0_7.5_1714543200.png"
        );
    }

    #[test]
    fn test_report_path_layout() {
        assert_eq!(
            report_path(&scope(), "report_42_tracer-1"),
            "webcam/tracer-1/42/webcam_report/report_42_tracer-1.json"
        );
    }

    #[test]
    fn test_sanitize_replaces_hostile_characters() {
        assert_eq!(sanitize("a b/c:d"), "a_b_c_d");
        assert_eq!(sanitize("46.02_7-74"), "46.02_7-74");
    }

    #[test]
    fn test_paths_are_deterministic() {
        let a = capture_path(&scope(), 1714543200, "scraped", "n", "png");
        let b = capture_path(&scope(), 1714543200, "scraped", "n", "png");
        assert_eq!(a, b);
    }
}
