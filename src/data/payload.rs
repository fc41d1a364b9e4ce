use serde::{Deserialize, Serialize};
use crate::common::Detection;

/// Scene overview attached to a published payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum OverviewImage {
    /// No overview was captured.
    #[default]
    Missing,
    /// Base64 encoded JPEG of the first frame of the scan.
    Jpeg(String),
    /// Marker published by the finish action.
    End,
}

/// What the presentation layer receives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionPayload {
    pub detections: Vec<Detection>,
    pub overview_image: OverviewImage,
}

impl DetectionPayload {
    pub fn new(detections: Vec<Detection>, overview_image: OverviewImage) -> Self {
        Self {
            detections,
            overview_image,
        }
    }

    /// Payload of the explicit finish action.
    pub fn end() -> Self {
        Self::new(vec![], OverviewImage::End)
    }

    pub fn is_end(&self) -> bool {
        self.overview_image == OverviewImage::End
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
