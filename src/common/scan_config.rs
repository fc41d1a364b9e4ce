use std::path::Path;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use crate::common::ModelConfig;

/// Tuning constants for one scanning session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub object_model: ModelConfig,
    pub bay_model: ModelConfig,
    /// Candidates overlapping an accepted box at or above this IoU are suppressed.
    pub iou_threshold: f32,
    /// World distance under which two entries of the same kind are the same entry.
    pub dedup_distance: f32,
    /// Relative horizontal tolerance separating two bay endpoints.
    pub bay_ratio: f32,
    /// Minimum time between two detection runs.
    pub min_detect_interval_ms: u64,
    /// Frames acquired this soon after the scan press feed the overview image.
    pub overview_window_ms: u64,
    pub anchor_capacity: usize,
    pub worker_threads: usize,
    pub jpeg_quality: u8,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            object_model: ModelConfig::object_model(),
            bay_model: ModelConfig::bay_model(),
            iou_threshold: 0.6,
            dedup_distance: 0.08,
            bay_ratio: 0.2,
            min_detect_interval_ms: 5000,
            overview_window_ms: 100,
            anchor_capacity: 80,
            worker_threads: 2,
            jpeg_quality: 75,
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: ScanConfig = serde_json::from_str(json).context("Invalid scan configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scan configuration {}", path.display()))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, model) in [("object", &self.object_model), ("bay", &self.bay_model)] {
            if model.channels < 5 {
                anyhow::bail!("The {} model needs at least 5 channels, got {}", name, model.channels);
            }
            if model.width == 0 || model.height == 0 {
                anyhow::bail!("The {} model input resolution must be non-zero", name);
            }
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            anyhow::bail!("IoU threshold must be within [0, 1], got {}", self.iou_threshold);
        }
        if self.anchor_capacity == 0 {
            anyhow::bail!("Anchor capacity must be at least 1");
        }
        if self.worker_threads == 0 {
            anyhow::bail!("At least one worker thread is required");
        }
        Ok(())
    }

    pub fn with_iou_threshold(mut self, iou: f32) -> Self {
        self.iou_threshold = iou;
        self
    }

    pub fn with_dedup_distance(mut self, distance: f32) -> Self {
        self.dedup_distance = distance;
        self
    }

    pub fn with_min_detect_interval_ms(mut self, interval: u64) -> Self {
        self.min_detect_interval_ms = interval;
        self
    }

    pub fn with_anchor_capacity(mut self, capacity: usize) -> Self {
        self.anchor_capacity = capacity;
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    pub fn with_object_model(mut self, model: ModelConfig) -> Self {
        self.object_model = model;
        self
    }

    pub fn with_bay_model(mut self, model: ModelConfig) -> Self {
        self.bay_model = model;
        self
    }
}
