//! The scanning workflow: per-frame merging, background detection and the start / stop toggle.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use image::RgbImage;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::anchors::{AnchorHandle, AnchorRegistry, AnchorResolver, AnchorView};
use crate::common::{Detection, ScanConfig};
use crate::data::{DetectionManager, DetectionPayload, MessageState, OverviewImage, UserMessage};
use crate::detection_runners::image_ops;
use crate::detection_runners::ShelfDetector;
use crate::fusion_store::{FusionStore, MergeOutcome};
use crate::layout_inference::LayoutInferencer;

pub const NO_RESULTS_MESSAGE: &str = "Classification model returned no results.";
pub const UNANCHORED_MESSAGE: &str = "Objects were classified, but could not be attached to an anchor. \
Try moving your device around to obtain a better understanding of the environment.";

/// What the host hands over on every rendered frame.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    /// Monotonic clock in milliseconds.
    pub timestamp_ms: u64,
    /// `None` when the camera image is not available for this frame.
    pub image: Option<RgbImage>,
    pub screen_width: u32,
    pub screen_height: u32,
}

/// Summary of one call to [`ScanSession::on_frame`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// A background detection run was launched on this frame.
    pub detection_started: bool,
    /// Candidates of a completed detection run picked up on this frame.
    pub candidates: usize,
    pub anchored: usize,
    /// Candidates that ended up in the store.
    pub accepted: usize,
    /// Any anchored candidate, including kinds that are never stored.
    pub found_anything: bool,
}

#[derive(Debug)]
struct PendingResult {
    generation: u64,
    detections: Vec<Detection>,
}

#[derive(Debug, Default)]
struct ScanState {
    scanning: bool,
    last_acquire_ms: Option<u64>,
    scan_press_ms: u64,
}

pub struct ScanSession {
    config: ScanConfig,
    detector: Arc<ShelfDetector>,
    store: Arc<FusionStore>,
    anchors: AnchorRegistry,
    pool: rayon::ThreadPool,
    pending: Arc<Mutex<Option<PendingResult>>>,
    overview: Arc<Mutex<OverviewImage>>,
    manager: DetectionManager,
    messages: MessageState,
    state: Mutex<ScanState>,
    // Bumped whenever the collections are cleared; results of older runs are discarded.
    generation: Arc<AtomicU64>,
}

impl ScanSession {
    pub fn new(config: ScanConfig, detector: ShelfDetector) -> anyhow::Result<Self> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("shelf-scan-worker-{}", i))
            .build()?;
        log::info!("Scan session ready with {} worker threads", config.worker_threads);

        Ok(Self {
            store: Arc::new(FusionStore::new(config.dedup_distance, config.bay_ratio)),
            anchors: AnchorRegistry::new(config.anchor_capacity),
            detector: Arc::new(detector),
            pool,
            pending: Arc::new(Mutex::new(None)),
            overview: Arc::new(Mutex::new(OverviewImage::Missing)),
            manager: DetectionManager::new(),
            messages: MessageState::new(),
            state: Mutex::new(ScanState::default()),
            generation: Arc::new(AtomicU64::new(0)),
            config,
        })
    }

    pub fn store(&self) -> &Arc<FusionStore> {
        &self.store
    }

    pub fn detector(&self) -> &Arc<ShelfDetector> {
        &self.detector
    }

    pub fn is_scanning(&self) -> bool {
        self.state.lock().scanning
    }

    pub fn subscribe(&self) -> watch::Receiver<DetectionPayload> {
        self.manager.subscribe()
    }

    pub fn latest_payload(&self) -> DetectionPayload {
        self.manager.latest()
    }

    pub fn messages(&self) -> crossbeam_channel::Receiver<UserMessage> {
        self.messages.msg_rx.clone()
    }

    pub fn labeled_anchors(&self) -> Vec<AnchorView> {
        self.anchors.tracking_views()
    }

    pub fn has_anchors(&self) -> bool {
        !self.anchors.is_empty()
    }

    pub fn overview_image(&self) -> OverviewImage {
        self.overview.lock().clone()
    }

    /// A finished detection run is waiting to be merged by the next frame.
    pub fn has_pending_result(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// Flips between scanning and idle.
    ///
    /// Starting clears every collection. Stopping runs the layout pass and publishes the
    /// annotated objects with the overview image, which is also returned.
    pub fn toggle_scan(&self, now_ms: u64) -> Option<DetectionPayload> {
        let scanning = {
            let mut state = self.state.lock();
            state.scanning = !state.scanning;
            state.scan_press_ms = now_ms;
            state.last_acquire_ms = None;
            state.scanning
        };

        if scanning {
            log::info!("Scan started");
            self.clear_collections();
            *self.overview.lock() = OverviewImage::Missing;
            return None;
        }

        let timings = self.detector.timings();
        log::info!(
            "Scan stopped after {} detection runs (avg {:?}, total {:?}), inferring layout",
            timings.n(),
            timings.avg(),
            timings.total()
        );
        let report = LayoutInferencer::run(&self.store);
        for warning in report.warnings {
            self.messages.send(UserMessage::Warning(warning));
        }
        let payload = DetectionPayload::new(report.objects, self.overview_image());
        self.manager.update_detections(payload.clone());
        Some(payload)
    }

    /// Publishes the end marker with no detections.
    pub fn finish(&self) {
        log::info!("Finish requested");
        self.manager.update_detections(DetectionPayload::end());
    }

    /// Clears every collection without running the layout pass.
    pub fn reset(&self) {
        log::info!("Reset requested");
        self.clear_collections();
    }

    fn clear_collections(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.pending.lock().take();
        self.store.clear();
        self.anchors.clear();
    }

    /// Per-frame path. Never waits on background work.
    ///
    /// While scanning, launches a detection run when the minimum interval has passed, and
    /// merges the most recently completed run into the store.
    pub fn on_frame<R: AnchorResolver>(&self, frame: CameraFrame, resolver: &R) -> FrameReport {
        let mut report = FrameReport::default();
        let now = frame.timestamp_ms;

        let (trigger, capture_overview) = {
            let mut state = self.state.lock();
            let due = state
                .last_acquire_ms
                .map_or(true, |last| now.saturating_sub(last) > self.config.min_detect_interval_ms);
            if state.scanning && due {
                state.last_acquire_ms = Some(now);
                (true, now <= state.scan_press_ms + self.config.overview_window_ms)
            } else {
                (false, false)
            }
        };

        if trigger {
            match frame.image {
                Some(image) => {
                    if capture_overview {
                        self.spawn_overview(image.clone());
                    }
                    self.spawn_detection(image, frame.screen_width, frame.screen_height);
                    report.detection_started = true;
                }
                None => log::debug!("Camera image not available at {}ms", now),
            }
        }

        let pending = self.pending.lock().take();
        if let Some(result) = pending {
            if result.generation == self.generation.load(Ordering::SeqCst) {
                self.merge_candidates(result.detections, resolver, &mut report);
            } else {
                log::info!("Discarding {} detections from a previous scan", result.detections.len());
            }
        }

        report
    }

    fn merge_candidates<R: AnchorResolver>(&self, detections: Vec<Detection>, resolver: &R, report: &mut FrameReport) {
        report.candidates = detections.len();

        for detection in detections {
            let (cx, cy) = detection.center();
            let Some(anchor) = resolver.resolve_world_position(cx, cy) else {
                continue;
            };
            let handle = AnchorHandle::new(anchor);
            let Some(position) = handle.world_position() else {
                continue;
            };
            report.anchored += 1;
            report.found_anything = true;

            let display_label = detection.display_label().to_string();
            match self.store.merge(detection, position) {
                MergeOutcome::Duplicate | MergeOutcome::Ignored => {}
                _ => {
                    report.accepted += 1;
                    self.anchors.push(handle, &display_label);
                }
            }
        }

        log::debug!("Frame merge: {} candidates, {} anchored, {} accepted", report.candidates, report.anchored, report.accepted);
        if report.candidates == 0 {
            self.messages.send(UserMessage::Info(NO_RESULTS_MESSAGE.to_string()));
        } else if report.anchored < report.candidates {
            self.messages.send(UserMessage::Info(UNANCHORED_MESSAGE.to_string()));
        }
    }

    fn spawn_detection(&self, image: RgbImage, screen_width: u32, screen_height: u32) {
        let detector = Arc::clone(&self.detector);
        let pending = Arc::clone(&self.pending);
        let messages = self.messages.clone();
        let generation = self.generation.load(Ordering::SeqCst);

        self.pool.spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| detector.analyze(image, screen_width, screen_height)));
            let error = match result {
                Ok(Ok(detections)) => {
                    *pending.lock() = Some(PendingResult { generation, detections });
                    return;
                }
                Ok(Err(err)) => err.to_string(),
                Err(_) => "detection pipeline panicked".to_string(),
            };
            log::error!("Exception thrown analyzing input frame: {}", error);
            messages.send(UserMessage::Error(format!(
                "Exception thrown analyzing input frame: {}\nSee log for details.",
                error
            )));
        });
    }

    fn spawn_overview(&self, image: RgbImage) {
        let overview = Arc::clone(&self.overview);
        let current = Arc::clone(&self.generation);
        let generation = current.load(Ordering::SeqCst);
        let quality = self.config.jpeg_quality;

        self.pool.spawn(move || match image_ops::encode_jpeg_base64(&image, quality) {
            Ok(encoded) => {
                if current.load(Ordering::SeqCst) == generation {
                    *overview.lock() = OverviewImage::Jpeg(encoded);
                }
            }
            Err(err) => log::warn!("Failed to encode overview image: {}", err),
        });
    }
}
