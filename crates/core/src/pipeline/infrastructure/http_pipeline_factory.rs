use std::sync::Arc;

use crate::anonymization::infrastructure::http_face_anonymizer::HttpFaceAnonymizer;
use crate::blurring::infrastructure::gaussian_region_blurrer::GaussianRegionBlurrer;
use crate::classification::infrastructure::http_face_classifier::HttpFaceClassifier;
use crate::codec::domain::image_codec::ImageCodec;
use crate::codec::infrastructure::jpeg_image_codec::JpegImageCodec;
use crate::detection::infrastructure::http_face_detector::HttpFaceDetector;
use crate::pipeline::anonymize_minors_use_case::AnonymizeMinorsUseCase;
use crate::pipeline::pipeline_config::PipelineConfig;
use crate::shared::collaborator_error::CollaboratorError;

/// Wires the use case to the three HTTP collaborators named in `config`.
///
/// Builds blocking HTTP clients: call this outside any async runtime.
pub fn build_http_pipeline(config: &PipelineConfig) -> Result<AnonymizeMinorsUseCase, CollaboratorError> {
    let codec: Arc<dyn ImageCodec> = Arc::new(JpegImageCodec::new(config.jpeg_quality));

    let detector = HttpFaceDetector::new(config.detection_endpoint.as_str(), config.timeout)?;
    let classifier =
        HttpFaceClassifier::new(config.classification_endpoint.as_str(), config.timeout)?;
    let anonymizer = HttpFaceAnonymizer::new(
        config.anonymization_endpoint.as_str(),
        config.timeout,
        codec.clone(),
    )?;

    log::debug!(
        "Pipeline collaborators: detect={} classify={} anonymize={} (timeout {:?}, {}, {:?})",
        config.detection_endpoint,
        config.classification_endpoint,
        config.anonymization_endpoint,
        config.timeout,
        config.failure_policy,
        config.region_strategy,
    );

    Ok(AnonymizeMinorsUseCase::new(
        codec,
        Box::new(detector),
        Box::new(classifier),
        Box::new(anonymizer),
    )
    .with_failure_policy(config.failure_policy)
    .with_region_strategy(config.region_strategy)
    .with_fallback_blurrer(Box::new(GaussianRegionBlurrer::new(
        config.fallback_blur_kernel,
    ))))
}
