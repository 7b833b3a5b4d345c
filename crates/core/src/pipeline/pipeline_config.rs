use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::shared::constants::{
    DEFAULT_ANONYMIZATION_ENDPOINT, DEFAULT_CLASSIFICATION_ENDPOINT, DEFAULT_COLLABORATOR_TIMEOUT,
    DEFAULT_DETECTION_ENDPOINT, DEFAULT_FALLBACK_BLUR_KERNEL, DEFAULT_JPEG_QUALITY,
};

/// What to do with a face when classification or anonymization fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Leave the face untouched and carry on.
    #[default]
    FailOpen,
    /// Redact anyway: treat an unclassified face as a minor, and blur
    /// locally if the anonymization service cannot.
    FailClosed,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fail-open" | "open" => Ok(Self::FailOpen),
            "fail-closed" | "closed" => Ok(Self::FailClosed),
            other => Err(format!(
                "unknown failure policy '{other}' (expected fail-open or fail-closed)"
            )),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailOpen => f.write_str("fail-open"),
            Self::FailClosed => f.write_str("fail-closed"),
        }
    }
}

/// How per-face collaborator calls are scheduled within one request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RegionStrategy {
    /// One face at a time, compositing each before cropping the next.
    #[default]
    Sequential,
    /// Up to `workers` faces in flight; results are gathered and composited
    /// afterwards on the calling thread.
    Concurrent { workers: usize },
}

impl RegionStrategy {
    /// `1` (or `0`) selects sequential processing.
    pub fn from_workers(workers: usize) -> Self {
        if workers <= 1 {
            Self::Sequential
        } else {
            Self::Concurrent { workers }
        }
    }
}

/// Everything needed to assemble a pipeline against live collaborators.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub detection_endpoint: String,
    pub classification_endpoint: String,
    pub anonymization_endpoint: String,
    /// Applied to each collaborator call individually.
    pub timeout: Duration,
    pub failure_policy: FailurePolicy,
    pub region_strategy: RegionStrategy,
    pub fallback_blur_kernel: usize,
    pub jpeg_quality: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            detection_endpoint: DEFAULT_DETECTION_ENDPOINT.to_string(),
            classification_endpoint: DEFAULT_CLASSIFICATION_ENDPOINT.to_string(),
            anonymization_endpoint: DEFAULT_ANONYMIZATION_ENDPOINT.to_string(),
            timeout: DEFAULT_COLLABORATOR_TIMEOUT,
            failure_policy: FailurePolicy::default(),
            region_strategy: RegionStrategy::default(),
            fallback_blur_kernel: DEFAULT_FALLBACK_BLUR_KERNEL,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults_match_reference_deployment() {
        let config = PipelineConfig::default();
        assert_eq!(config.detection_endpoint, "http://bounding:5001/detect");
        assert_eq!(config.classification_endpoint, "http://classifier:5002/classify");
        assert_eq!(config.anonymization_endpoint, "http://pixelator:5003/pixelate");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.failure_policy, FailurePolicy::FailOpen);
        assert_eq!(config.region_strategy, RegionStrategy::Sequential);
    }

    #[rstest]
    #[case("fail-open", FailurePolicy::FailOpen)]
    #[case("OPEN", FailurePolicy::FailOpen)]
    #[case("fail-closed", FailurePolicy::FailClosed)]
    #[case("closed", FailurePolicy::FailClosed)]
    fn test_parse_failure_policy(#[case] input: &str, #[case] expected: FailurePolicy) {
        assert_eq!(input.parse::<FailurePolicy>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_policy_fails() {
        let err = "maybe".parse::<FailurePolicy>().unwrap_err();
        assert!(err.contains("maybe"));
    }

    #[test]
    fn test_policy_display_round_trips() {
        for policy in [FailurePolicy::FailOpen, FailurePolicy::FailClosed] {
            assert_eq!(policy.to_string().parse::<FailurePolicy>().unwrap(), policy);
        }
    }

    #[rstest]
    #[case(0, RegionStrategy::Sequential)]
    #[case(1, RegionStrategy::Sequential)]
    #[case(4, RegionStrategy::Concurrent { workers: 4 })]
    fn test_strategy_from_workers(#[case] workers: usize, #[case] expected: RegionStrategy) {
        assert_eq!(RegionStrategy::from_workers(workers), expected);
    }
}
