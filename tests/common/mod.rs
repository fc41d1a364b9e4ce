#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use shelf_scan::common::{Detection, LabelTable, ModelConfig, ScanConfig, ScreenBox, WorldPosition};
use shelf_scan::{AnchorResolver, TrackedAnchor};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Small object model: 3 label channels, 16 elements.
pub fn small_object_model() -> ModelConfig {
    ModelConfig::new(7, 16, 640, 640, 0.65)
}

pub fn small_bay_model() -> ModelConfig {
    ModelConfig::new(5, 16, 640, 640, 0.65)
}

pub fn small_labels() -> LabelTable {
    LabelTable::from_strs(&["object", "label", "shelf stripping"], &["Object", "Price label", "Shelf stripping"])
}

pub fn small_config() -> ScanConfig {
    ScanConfig::new()
        .with_object_model(small_object_model())
        .with_bay_model(small_bay_model())
        .with_worker_threads(1)
}

/// Builds a flat channel-major output tensor, all scores zero by default.
pub struct TensorBuilder {
    channels: usize,
    elements: usize,
    data: Vec<f32>,
}

impl TensorBuilder {
    pub fn new(model: &ModelConfig) -> Self {
        Self {
            channels: model.channels,
            elements: model.elements,
            data: vec![0.; model.channels * model.elements],
        }
    }

    pub fn element(mut self, element: usize, cxcywh: [f32; 4], label_index: usize, score: f32) -> Self {
        for (c, v) in cxcywh.iter().enumerate() {
            self.data[c * self.elements + element] = *v;
        }
        self.data[(4 + label_index) * self.elements + element] = score;
        self
    }

    pub fn score(mut self, element: usize, label_index: usize, score: f32) -> Self {
        self.data[(4 + label_index) * self.elements + element] = score;
        self
    }

    pub fn build(self) -> Vec<f32> {
        assert_eq!(self.data.len(), self.channels * self.elements);
        self.data
    }
}

pub fn detection(label: &str, x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32) -> Detection {
    Detection::new(label, label, ScreenBox::new(x1, y1, x2, y2), confidence)
}

pub fn object(label: &str) -> Detection {
    detection(label, 0., 0., 10., 10., 0.9)
}

pub fn pos(x: f32, y: f32) -> WorldPosition {
    WorldPosition::new(x, y, 0.)
}

pub struct FakeAnchor {
    position: WorldPosition,
    detached: Arc<AtomicUsize>,
}

impl TrackedAnchor for FakeAnchor {
    fn world_position(&self) -> WorldPosition {
        self.position
    }

    fn detach(&mut self) {
        self.detached.fetch_add(1, Ordering::SeqCst);
    }
}

/// Maps screen pixels linearly into world space: `x / 1000`, `-y / 1000`.
pub struct FakeResolver {
    pub reachable: bool,
    pub detached: Arc<AtomicUsize>,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self {
            reachable: true,
            detached: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::new()
        }
    }

    pub fn detached(&self) -> usize {
        self.detached.load(Ordering::SeqCst)
    }
}

impl AnchorResolver for FakeResolver {
    type Anchor = FakeAnchor;

    fn resolve_world_position(&self, image_x: f32, image_y: f32) -> Option<FakeAnchor> {
        if !self.reachable {
            return None;
        }
        Some(FakeAnchor {
            position: WorldPosition::new(image_x / 1000., -image_y / 1000., 0.),
            detached: Arc::clone(&self.detached),
        })
    }
}
