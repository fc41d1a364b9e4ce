//! File/code adapted from https://github.com/jamjamjon/usls

use image::RgbImage;
use ndarray::{s, Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;

use crate::common::{CropImage, Detection, LabelTable, ModelConfig, ScreenBox};
use crate::detection_runners::image_ops;

/// One element of the output tensor that cleared the confidence threshold, still in
/// normalized model coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawCandidate {
    pub element: usize,
    pub label_index: usize,
    pub confidence: f32,
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
}

impl RawCandidate {
    /// Scans the label channels of an element-major row for the best score.
    ///
    /// Only scores strictly above `threshold` count; on equal scores the first channel wins.
    pub fn from_row(element: usize, row: ArrayView1<f32>, threshold: f32) -> Option<Self> {
        let mut best: Option<(usize, f32)> = None;
        for (idx, &score) in row.slice(s![4..]).iter().enumerate() {
            let floor = best.map_or(threshold, |(_, conf)| conf);
            if score > floor {
                best = Some((idx, score));
            }
        }

        let (label_index, confidence) = best?;
        Some(Self {
            element,
            label_index,
            confidence,
            cx: row[0],
            cy: row[1],
            w: row[2],
            h: row[3],
        })
    }

    /// Corner box in model pixels.
    pub fn model_box(&self, model: &ModelConfig) -> ScreenBox {
        let (mw, mh) = (model.width as f32, model.height as f32);
        ScreenBox::default().with_x1y1_x2y2(
            (self.cx - self.w / 2.) * mw,
            (self.cy - self.h / 2.) * mh,
            (self.cx + self.w / 2.) * mw,
            (self.cy + self.h / 2.) * mh,
        )
    }

    /// Corner box rescaled from model pixels into screen pixels.
    pub fn screen_box(&self, model: &ModelConfig, screen_width: u32, screen_height: u32) -> ScreenBox {
        self.model_box(model).scale_xy(
            screen_width as f32 / model.width as f32,
            screen_height as f32 / model.height as f32,
        )
    }
}

/// Turns a flat channel-major tensor into element-major layout.
///
/// Returns `None` for models without a label channel and for tensors that cannot be the
/// model's output: empty, a single value, or a length that does not match `channels x elements`.
pub fn transpose_output(raw: &[f32], model: &ModelConfig) -> Option<Array2<f32>> {
    if model.channels < 5 {
        log::info!("Output tensor needs at least 5 channels, model has {}", model.channels);
        return None;
    }
    if raw.len() <= 1 {
        log::info!("Model produced no usable output ({} values)", raw.len());
        return None;
    }
    if raw.len() != model.tensor_len() {
        log::info!("Unexpected output tensor length {}, expected {}x{}", raw.len(), model.channels, model.elements);
        return None;
    }

    let view = ArrayView2::from_shape((model.channels, model.elements), raw).ok()?;
    Some(view.reversed_axes().as_standard_layout().into_owned())
}

/// Decodes the object / label / shelf classifier output into screen-space candidates.
#[derive(Debug, Clone)]
pub struct TensorDecoder {
    model: ModelConfig,
    labels: LabelTable,
    jpeg_quality: u8,
}

impl TensorDecoder {
    pub fn new(model: ModelConfig, labels: LabelTable) -> Self {
        if labels.len() != model.num_labels() {
            log::warn!("Label table has {} entries for {} label channels", labels.len(), model.num_labels());
        }
        Self {
            model,
            labels,
            jpeg_quality: 75,
        }
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    /// Decodes every element above the confidence threshold, in the tensor's element order.
    ///
    /// # Arguments
    ///
    /// * `raw` - Flat `channels x elements` output of the model.
    /// * `screen_width`, `screen_height` - Size of the surface the boxes are reported in.
    /// * `source` - Model-space image to cut crops from. Without it detections carry an empty tag.
    ///
    /// # Returns
    ///
    /// * Unsorted, un-suppressed candidates. Malformed tensors yield an empty list.
    pub fn decode(&self, raw: &[f32], screen_width: u32, screen_height: u32, source: Option<&RgbImage>) -> Vec<Detection> {
        let transposed = match transpose_output(raw, &self.model) {
            Some(transposed) => transposed,
            None => return vec![],
        };

        transposed
            .axis_iter(Axis(0))
            .into_par_iter()
            .enumerate()
            .filter_map(|(element, row)| {
                let candidate = RawCandidate::from_row(element, row, self.model.conf_threshold)?;
                Some(self.to_detection(&candidate, screen_width, screen_height, source))
            })
            .collect()
    }

    fn to_detection(&self, candidate: &RawCandidate, screen_width: u32, screen_height: u32, source: Option<&RgbImage>) -> Detection {
        let (label, display_label) = self.labels.get(candidate.label_index);
        let crop = match source {
            Some(image) => {
                let model_box = candidate.model_box(&self.model);
                image_ops::crop_encoded(
                    image,
                    model_box.x1,
                    model_box.y1,
                    model_box.width(),
                    model_box.height(),
                    self.jpeg_quality,
                )
            }
            None => CropImage::Tag(image_ops::EMPTY_CROP_TAG.to_string()),
        };

        Detection::new(&label, &display_label, candidate.screen_box(&self.model, screen_width, screen_height), candidate.confidence)
            .with_class_id(candidate.label_index)
            .with_crop(crop)
    }
}
