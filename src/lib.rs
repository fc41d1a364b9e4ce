mod utils;
pub mod anchors;
pub mod common;
pub mod data;
pub mod detection_runners;
pub mod fusion_store;
pub mod layout_inference;
pub mod scan_session;

use std::time::Instant;
use image::RgbImage;
use crate::common::{Detection, LabelTable, ScanConfig};
use crate::detection_runners::{InferenceBackend, ShelfDetector};
use crate::scan_session::ScanSession;

pub use crate::anchors::{AnchorHandle, AnchorRegistry, AnchorResolver, AnchorView, TrackedAnchor};
pub use crate::fusion_store::{FusionSnapshot, FusionStore, MergeOutcome};
pub use crate::layout_inference::{LayoutInferencer, LayoutReport};
pub use crate::scan_session::{CameraFrame, FrameReport};

pub fn init_detector(
    config: &ScanConfig,
    labels: LabelTable,
    object_backend: Box<dyn InferenceBackend>,
    bay_backend: Box<dyn InferenceBackend>,
) -> anyhow::Result<ShelfDetector> {
    config.validate()?;
    log::info!("Initializing shelf detector with {} labels", labels.len());
    Ok(ShelfDetector::new(config, labels, object_backend, bay_backend))
}

pub fn init_scanner(
    config: ScanConfig,
    labels: LabelTable,
    object_backend: Box<dyn InferenceBackend>,
    bay_backend: Box<dyn InferenceBackend>,
) -> anyhow::Result<ScanSession> {
    let detector = init_detector(&config, labels, object_backend, bay_backend)?;
    ScanSession::new(config, detector)
}

/// Runs one frame through the detector outside of a scan session.
pub fn run_detection(detector: &ShelfDetector, image: RgbImage, screen_width: u32, screen_height: u32) -> anyhow::Result<Vec<Detection>> {
    let now = Instant::now();

    let detections = detector.analyze(image, screen_width, screen_height)?;

    log::debug!("Processing time: {:?}", now.elapsed());

    Ok(detections)
}
