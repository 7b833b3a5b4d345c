use std::sync::Arc;
use std::time::Instant;

use crate::anonymization::domain::face_anonymizer::FaceAnonymizer;
use crate::blurring::domain::region_blurrer::RegionBlurrer;
use crate::blurring::infrastructure::gaussian_region_blurrer::GaussianRegionBlurrer;
use crate::classification::domain::face_classifier::FaceClassifier;
use crate::codec::domain::image_codec::ImageCodec;
use crate::detection::domain::face_detector::{DetectedFace, FaceDetector};
use crate::pipeline::infrastructure::threaded_region_executor::ThreadedRegionExecutor;
use crate::pipeline::pipeline_config::{FailurePolicy, RegionStrategy};
use crate::pipeline::pipeline_error::PipelineError;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::region_outcome::{
    FaceStage, PipelineStage, RegionFailure, RegionOutcome, RegionReport,
};
use crate::shared::raster_image::RasterImage;
use crate::shared::region::FaceRegion;

/// The encoded result of one successful request.
#[derive(Clone, Debug)]
pub struct PipelineOutput {
    pub image: Vec<u8>,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
    /// One entry per detector box, in detector order.
    pub regions: Vec<RegionReport>,
}

impl PipelineOutput {
    pub fn modified_regions(&self) -> usize {
        self.regions
            .iter()
            .filter(|r| r.outcome.is_modified())
            .count()
    }

    pub fn failed_regions(&self) -> usize {
        self.regions
            .iter()
            .filter(|r| r.outcome.failure().is_some())
            .count()
    }
}

/// What the remote calls decided for one face, before anything is written.
enum RegionDecision {
    Replace(RasterImage),
    Keep(RegionOutcome),
    Failed(RegionFailure),
}

struct ResolvedRegion {
    decision: RegionDecision,
    stage: FaceStage,
    /// Set when a fail-closed policy sent an unclassified face on anyway.
    classification_failed: bool,
    classify_ms: Option<f64>,
    anonymize_ms: Option<f64>,
    warnings: Vec<String>,
}

impl ResolvedRegion {
    fn new() -> Self {
        Self {
            decision: RegionDecision::Keep(RegionOutcome::NotMinor),
            stage: FaceStage::Cropped,
            classification_failed: false,
            classify_ms: None,
            anonymize_ms: None,
            warnings: Vec::new(),
        }
    }

    fn reach(&mut self, index: usize, stage: FaceStage) {
        log::trace!("face {index}: {stage:?}");
        self.stage = stage;
    }

    fn finish(mut self, decision: RegionDecision) -> Self {
        self.decision = decision;
        self
    }
}

/// Single-image anonymization pipeline:
/// decode → detect → per face (crop → classify → anonymize → composite) → encode.
///
/// Only decoding and detection can fail a request. Everything that goes
/// wrong for an individual face is settled by the [`FailurePolicy`] and
/// reported in [`PipelineOutput::regions`].
pub struct AnonymizeMinorsUseCase {
    codec: Arc<dyn ImageCodec>,
    detector: Box<dyn FaceDetector>,
    classifier: Box<dyn FaceClassifier>,
    anonymizer: Box<dyn FaceAnonymizer>,
    fallback_blurrer: Box<dyn RegionBlurrer>,
    policy: FailurePolicy,
    strategy: RegionStrategy,
}

impl AnonymizeMinorsUseCase {
    pub fn new(
        codec: Arc<dyn ImageCodec>,
        detector: Box<dyn FaceDetector>,
        classifier: Box<dyn FaceClassifier>,
        anonymizer: Box<dyn FaceAnonymizer>,
    ) -> Self {
        Self {
            codec,
            detector,
            classifier,
            anonymizer,
            fallback_blurrer: Box::new(GaussianRegionBlurrer::default()),
            policy: FailurePolicy::default(),
            strategy: RegionStrategy::default(),
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_region_strategy(mut self, strategy: RegionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_fallback_blurrer(mut self, blurrer: Box<dyn RegionBlurrer>) -> Self {
        self.fallback_blurrer = blurrer;
        self
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn region_strategy(&self) -> RegionStrategy {
        self.strategy
    }

    pub fn execute(
        &self,
        image_bytes: &[u8],
        logger: &mut dyn PipelineLogger,
    ) -> Result<PipelineOutput, PipelineError> {
        enter(PipelineStage::Received);
        if image_bytes.is_empty() {
            return Err(PipelineError::NoImage);
        }

        let started = Instant::now();
        let mut raster = self.codec.decode(image_bytes).map_err(PipelineError::Decode)?;
        logger.timing("decode", elapsed_ms(started));
        enter(PipelineStage::Decoded);

        // The detector decodes the upload itself, so it gets the original bytes.
        let started = Instant::now();
        let faces = self
            .detector
            .detect(image_bytes)
            .map_err(PipelineError::DetectionFailed)?;
        logger.timing("detect", elapsed_ms(started));
        logger.info(&format!(
            "Detected {} face(s) in {}x{} image",
            faces.len(),
            raster.width(),
            raster.height()
        ));
        logger.metric("faces_detected", faces.len() as f64);
        enter(PipelineStage::FacesDetected);

        let regions = match self.strategy {
            RegionStrategy::Sequential => self.process_sequentially(&mut raster, &faces, logger),
            RegionStrategy::Concurrent { workers } => {
                self.process_concurrently(&mut raster, &faces, workers, logger)
            }
        };
        enter(PipelineStage::Composited);

        let started = Instant::now();
        let image = self.codec.encode(&raster).map_err(PipelineError::Encode)?;
        logger.timing("encode", elapsed_ms(started));
        enter(PipelineStage::Encoded);

        Ok(PipelineOutput {
            image,
            mime_type: self.codec.mime_type(),
            width: raster.width(),
            height: raster.height(),
            regions,
        })
    }

    /// Crops each face from the raster as it stands after the previous
    /// face was composited.
    fn process_sequentially(
        &self,
        raster: &mut RasterImage,
        faces: &[DetectedFace],
        logger: &mut dyn PipelineLogger,
    ) -> Vec<RegionReport> {
        let total = faces.len();
        let mut reports = Vec::with_capacity(total);

        for (index, face) in faces.iter().enumerate() {
            logger.progress(index + 1, total);
            let Some((region, crop)) = self.crop_face(raster, index, face, logger) else {
                reports.push(rejected(face));
                continue;
            };
            let resolved = self.resolve(index, &crop);
            let (outcome, stage) = self.apply(raster, index, region, resolved, logger);
            reports.push(RegionReport {
                detected: *face,
                region: Some(region),
                outcome,
                stage: Some(stage),
            });
        }
        reports
    }

    /// Gather-then-apply: every crop is taken from the decoded raster, the
    /// remote calls run on worker threads, and the results are composited
    /// here, one at a time, in detector order.
    fn process_concurrently(
        &self,
        raster: &mut RasterImage,
        faces: &[DetectedFace],
        workers: usize,
        logger: &mut dyn PipelineLogger,
    ) -> Vec<RegionReport> {
        let total = faces.len();
        let mut slots: Vec<Option<RegionReport>> = vec![None; total];
        let mut jobs = Vec::with_capacity(total);

        for (index, face) in faces.iter().enumerate() {
            match self.crop_face(raster, index, face, logger) {
                Some((region, crop)) => jobs.push((index, region, crop)),
                None => slots[index] = Some(rejected(face)),
            }
        }

        // Every crop comes from the decoded raster, so where boxes overlap
        // the later face's result wins on the shared pixels.
        for (i, (first, a, _)) in jobs.iter().enumerate() {
            for (second, b, _) in &jobs[i + 1..] {
                if a.overlaps(b) {
                    log::debug!(
                        "faces {first} and {second} overlap (IoU {:.2}); face {second} is composited last",
                        a.iou(b)
                    );
                    logger.increment("overlapping_regions");
                }
            }
        }

        let executor = ThreadedRegionExecutor::new(workers);
        let resolved = executor.gather(jobs, |(index, region, crop)| {
            (index, region, self.resolve(index, &crop))
        });

        for (done, (index, region, resolved)) in resolved.into_iter().enumerate() {
            logger.progress(done + 1, total);
            let (outcome, stage) = self.apply(raster, index, region, resolved, logger);
            slots[index] = Some(RegionReport {
                detected: faces[index],
                region: Some(region),
                outcome,
                stage: Some(stage),
            });
        }

        slots.into_iter().flatten().collect()
    }

    fn crop_face(
        &self,
        raster: &RasterImage,
        index: usize,
        face: &DetectedFace,
        logger: &mut dyn PipelineLogger,
    ) -> Option<(FaceRegion, RasterImage)> {
        let Some(region) = FaceRegion::clamped(face, raster.width(), raster.height()) else {
            logger.warn(&format!(
                "face {index}: detector box {face:?} has no area inside the {}x{} image; skipped",
                raster.width(),
                raster.height()
            ));
            logger.increment("regions_rejected");
            return None;
        };
        match raster.crop(&region) {
            Ok(crop) => Some((region, crop)),
            Err(e) => {
                logger.warn(&format!("face {index}: {e}; skipped"));
                logger.increment("regions_rejected");
                None
            }
        }
    }

    /// Runs the remote calls for one face. Touches no shared state, so it is
    /// safe to call from worker threads.
    fn resolve(&self, index: usize, crop: &RasterImage) -> ResolvedRegion {
        let mut resolved = ResolvedRegion::new();
        resolved.reach(index, FaceStage::Cropped);

        let crop_bytes = match self.codec.encode(crop) {
            Ok(bytes) => bytes,
            Err(e) => {
                resolved
                    .warnings
                    .push(format!("face {index}: could not encode crop: {e}"));
                return resolved.finish(RegionDecision::Failed(RegionFailure::CropEncoding));
            }
        };

        let started = Instant::now();
        let verdict = self.classifier.classify(&crop_bytes);
        resolved.classify_ms = Some(elapsed_ms(started));

        let is_minor = match verdict {
            Ok(verdict) => {
                log::debug!(
                    "face {index}: is_minor={} score={:.3}",
                    verdict.is_minor,
                    verdict.score
                );
                resolved.reach(index, FaceStage::Classified);
                verdict.is_minor
            }
            Err(e) => {
                resolved
                    .warnings
                    .push(format!("face {index}: classification failed: {e}"));
                match self.policy {
                    FailurePolicy::FailOpen => {
                        return resolved
                            .finish(RegionDecision::Failed(RegionFailure::Classification));
                    }
                    FailurePolicy::FailClosed => {
                        resolved.classification_failed = true;
                        true
                    }
                }
            }
        };

        if !is_minor {
            return resolved.finish(RegionDecision::Keep(RegionOutcome::NotMinor));
        }

        let started = Instant::now();
        let anonymized = self.anonymizer.anonymize(&crop_bytes);
        resolved.anonymize_ms = Some(elapsed_ms(started));

        let decision = match anonymized {
            Ok(replacement) if replacement.dimensions() == crop.dimensions() => {
                resolved.reach(index, FaceStage::Anonymized);
                RegionDecision::Replace(replacement)
            }
            Ok(replacement) => {
                resolved.warnings.push(format!(
                    "face {index}: anonymized crop is {}x{}, expected {}x{}",
                    replacement.width(),
                    replacement.height(),
                    crop.width(),
                    crop.height()
                ));
                RegionDecision::Failed(RegionFailure::DimensionMismatch)
            }
            Err(e) => {
                resolved
                    .warnings
                    .push(format!("face {index}: anonymization failed: {e}"));
                RegionDecision::Failed(RegionFailure::Anonymization)
            }
        };
        resolved.finish(decision)
    }

    /// Writes one face's result into the raster. Needs exclusive access, so
    /// it only ever runs on the request's own thread.
    fn apply(
        &self,
        raster: &mut RasterImage,
        index: usize,
        region: FaceRegion,
        resolved: ResolvedRegion,
        logger: &mut dyn PipelineLogger,
    ) -> (RegionOutcome, FaceStage) {
        if let Some(ms) = resolved.classify_ms {
            logger.timing("classify", ms);
        }
        if let Some(ms) = resolved.anonymize_ms {
            logger.timing("anonymize", ms);
        }
        for warning in &resolved.warnings {
            logger.warn(warning);
        }

        let outcome = match resolved.decision {
            RegionDecision::Keep(outcome) => outcome,
            RegionDecision::Replace(replacement) => match raster.composite(&region, &replacement) {
                Ok(()) if resolved.classification_failed => {
                    RegionOutcome::Redacted(RegionFailure::Classification)
                }
                Ok(()) => RegionOutcome::Anonymized,
                Err(e) => {
                    logger.warn(&format!("face {index}: anonymized crop rejected: {e}"));
                    self.settle_failure(raster, index, region, RegionFailure::DimensionMismatch, logger)
                }
            },
            RegionDecision::Failed(failure) => {
                self.settle_failure(raster, index, region, failure, logger)
            }
        };

        if let Some(failure) = outcome.failure() {
            logger.increment("region_failures");
            logger.increment(&format!("region_failures.{failure}"));
        }
        let stage = if outcome.is_modified() {
            log::trace!("face {index}: {:?}", FaceStage::Composited);
            logger.increment("regions_modified");
            FaceStage::Composited
        } else {
            resolved.stage
        };
        (outcome, stage)
    }

    fn settle_failure(
        &self,
        raster: &mut RasterImage,
        index: usize,
        region: FaceRegion,
        failure: RegionFailure,
        logger: &mut dyn PipelineLogger,
    ) -> RegionOutcome {
        match self.policy {
            FailurePolicy::FailOpen => RegionOutcome::Unmodified(failure),
            FailurePolicy::FailClosed => match self.fallback_blurrer.blur(raster, &region) {
                Ok(()) => RegionOutcome::Redacted(failure),
                Err(e) => {
                    logger.warn(&format!("face {index}: local blur failed: {e}"));
                    RegionOutcome::Unmodified(failure)
                }
            },
        }
    }
}

fn rejected(face: &DetectedFace) -> RegionReport {
    RegionReport {
        detected: *face,
        region: None,
        outcome: RegionOutcome::Rejected,
        stage: None,
    }
}

fn enter(stage: PipelineStage) {
    log::trace!("pipeline stage: {stage:?}");
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
