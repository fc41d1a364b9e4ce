use std::time::Duration;
use image::RgbImage;
use parking_lot::Mutex;

use crate::common::{Detection, LabelTable, ScanConfig};
use crate::data::TimeCalc;
use crate::detection_runners::bay_matcher::BayEndpointMatcher;
use crate::detection_runners::image_ops::{self, ModelInput};
use crate::detection_runners::inference_process::{InferenceBackend, InferenceProcess};
use crate::detection_runners::nms;
use crate::detection_runners::tensor_decoder::TensorDecoder;

/// One captured camera frame and the surface the detections are reported against.
#[derive(Debug, Clone)]
pub struct FrameRequest {
    pub image: RgbImage,
    pub screen_width: u32,
    pub screen_height: u32,
}

/// Flat output tensors of both models for one frame.
#[derive(Debug, Clone, Default)]
pub struct RawOutputs {
    pub objects: Vec<f32>,
    pub bays: Vec<f32>,
}

/// Runs the object classifier and the bay-endpoint classifier on a frame and turns their
/// outputs into one candidate list: suppressed objects first, then bay endpoints.
pub struct ShelfDetector {
    object_backend: Box<dyn InferenceBackend>,
    bay_backend: Box<dyn InferenceBackend>,
    decoder: TensorDecoder,
    bay_matcher: BayEndpointMatcher,
    iou_threshold: f32,
    times: Mutex<TimeCalc>,
}

impl std::fmt::Debug for ShelfDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShelfDetector")
            .field("decoder", &self.decoder)
            .field("bay_matcher", &self.bay_matcher)
            .field("iou_threshold", &self.iou_threshold)
            .finish()
    }
}

impl ShelfDetector {
    pub fn new(
        config: &ScanConfig,
        labels: LabelTable,
        object_backend: Box<dyn InferenceBackend>,
        bay_backend: Box<dyn InferenceBackend>,
    ) -> Self {
        log::info!("Object model:\n{}", config.object_model);
        log::info!("Bay model:\n{}", config.bay_model);
        Self {
            object_backend,
            bay_backend,
            decoder: TensorDecoder::new(config.object_model, labels).with_jpeg_quality(config.jpeg_quality),
            bay_matcher: BayEndpointMatcher::new(config.bay_model).with_ratio(config.bay_ratio),
            iou_threshold: config.iou_threshold,
            times: Mutex::new(TimeCalc::default()),
        }
    }

    /// Full pipeline for one frame.
    pub fn analyze(&self, image: RgbImage, screen_width: u32, screen_height: u32) -> anyhow::Result<Vec<Detection>> {
        self.forward(&FrameRequest { image, screen_width, screen_height }, false)
    }

    pub fn timings(&self) -> TimeCalc {
        self.times.lock().clone()
    }
}

impl InferenceProcess for ShelfDetector {
    type Input = FrameRequest;
    type Prepared = ModelInput;
    type Raw = RawOutputs;
    type Output = Vec<Detection>;

    fn preprocess(&self, x: &FrameRequest) -> anyhow::Result<ModelInput> {
        let model = self.decoder.model();
        image_ops::prepare_model_input(&x.image, model.width, model.height)
    }

    fn inference(&self, x: &ModelInput) -> anyhow::Result<RawOutputs> {
        let objects = self.object_backend.run(&x.tensor)?;
        let bays = self.bay_backend.run(&x.tensor)?;
        Ok(RawOutputs { objects, bays })
    }

    fn postprocess(&self, raw: RawOutputs, prepared: &ModelInput, x: &FrameRequest) -> anyhow::Result<Vec<Detection>> {
        let candidates = self.decoder.decode(&raw.objects, x.screen_width, x.screen_height, Some(&prepared.image));
        let decoded = candidates.len();
        let mut detections = nms::apply_nms(candidates, self.iou_threshold);
        log::debug!("Decoded {} candidates, {} left after NMS", decoded, detections.len());

        let bays = self.bay_matcher.decode(&raw.bays, x.screen_width, x.screen_height);
        for bay in &bays {
            log::debug!("Bay endpoint candidate, left edge {:.1}", bay.bbox().left());
        }
        detections.extend(bays);

        Ok(detections)
    }

    fn record_time(&self, stage: usize, elapsed: Duration) {
        self.times.lock().add_or_push(stage, elapsed);
    }
}
