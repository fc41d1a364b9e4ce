use serde::{Deserialize, Serialize};
use crate::common::{ScreenBox, WorldPosition};
use crate::detection_runners::nms::Nms;

pub const BAY_LABEL: &str = "bay";
pub const PRICE_LABEL: &str = "label";
pub const SHELF_STRIPPING_LABEL: &str = "shelf stripping";

/// Image data attached to a detection: either an encoded crop of the source region or a plain tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CropImage {
    /// Base64 encoded JPEG.
    Jpeg(String),
    Tag(String),
}

impl Default for CropImage {
    fn default() -> Self {
        CropImage::Tag(String::new())
    }
}

/// One decoded candidate, later enriched with its world position and layout attributes.
///
/// Confidence, label and box are fixed once decoded. The world position is attached on
/// fusion and shelf / facing / bay are written by the layout pass; `0` means unassigned.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub(crate) class_id: usize,
    pub(crate) confidence: f32,
    pub(crate) label: String,
    pub(crate) display_label: String,
    pub(crate) bbox: ScreenBox,
    pub(crate) crop: CropImage,
    pub(crate) world_position: Option<WorldPosition>,
    pub(crate) shelf: u32,
    pub(crate) facing: u32,
    pub(crate) bay: u32,
}

impl Nms for Detection {
    fn iou(&self, other: &Self) -> f32 {
        self.bbox.iou(&other.bbox)
    }

    fn confidence(&self) -> f32 {
        self.confidence
    }
}

impl Detection {
    pub fn new(label: &str, display_label: &str, bbox: ScreenBox, confidence: f32) -> Self {
        Self {
            class_id: 0,
            confidence,
            label: label.to_string(),
            display_label: display_label.to_string(),
            bbox,
            crop: CropImage::default(),
            world_position: None,
            shelf: 0,
            facing: 0,
            bay: 0,
        }
    }

    /// Sets the class index the label was looked up with.
    pub fn with_class_id(mut self, class_id: usize) -> Self {
        self.class_id = class_id;
        self
    }

    pub fn with_crop(mut self, crop: CropImage) -> Self {
        self.crop = crop;
        self
    }

    /// Attaches the resolved world position.
    ///
    /// # Arguments
    ///
    /// * `position` - The anchored position returned by the tracking collaborator.
    ///
    /// # Returns
    ///
    /// A `Detection` instance carrying the position.
    pub fn with_world_position(mut self, position: WorldPosition) -> Self {
        self.world_position = Some(position);
        self
    }

    pub fn class_id(&self) -> usize {
        self.class_id
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn display_label(&self) -> &str {
        &self.display_label
    }

    pub fn bbox(&self) -> &ScreenBox {
        &self.bbox
    }

    pub fn crop(&self) -> &CropImage {
        &self.crop
    }

    pub fn world_position(&self) -> Option<&WorldPosition> {
        self.world_position.as_ref()
    }

    pub fn shelf(&self) -> u32 {
        self.shelf
    }

    pub fn facing(&self) -> u32 {
        self.facing
    }

    pub fn bay(&self) -> u32 {
        self.bay
    }

    pub fn is_bay(&self) -> bool {
        self.label == BAY_LABEL
    }

    /// Center of the box in screen pixels, used as the hit-test point.
    pub fn center(&self) -> (f32, f32) {
        (self.bbox.cx(), self.bbox.cy())
    }
}
