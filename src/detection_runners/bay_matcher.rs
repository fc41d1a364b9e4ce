use ndarray::Axis;

use crate::common::{CropImage, Detection, ModelConfig, BAY_LABEL};
use crate::detection_runners::tensor_decoder::{transpose_output, RawCandidate};

pub const BAY_CROP_TAG: &str = "BayObject";

/// Picks at most one left / right pair of bay-endpoint candidates from the endpoint model.
///
/// Endpoints come in pairs with similar scores, so they are not suppressed against each other.
/// Instead elements are walked in the model's native order: the first candidate fixes a
/// reference center and a second one is only accepted when its center lies outside
/// `[ref * (1 - ratio), ref * (1 + ratio)]`.
#[derive(Debug, Clone)]
pub struct BayEndpointMatcher {
    model: ModelConfig,
    ratio: f32,
    max_endpoints: usize,
}

impl BayEndpointMatcher {
    pub fn new(model: ModelConfig) -> Self {
        Self {
            model,
            ratio: 0.2,
            max_endpoints: 2,
        }
    }

    pub fn with_ratio(mut self, ratio: f32) -> Self {
        self.ratio = ratio;
        self
    }

    pub fn decode(&self, raw: &[f32], screen_width: u32, screen_height: u32) -> Vec<Detection> {
        let transposed = match transpose_output(raw, &self.model) {
            Some(transposed) => transposed,
            None => return vec![],
        };

        let mut accepted = Vec::with_capacity(self.max_endpoints);
        let mut ref_cx: Option<f32> = None;

        for (element, row) in transposed.axis_iter(Axis(0)).enumerate() {
            let candidate = match RawCandidate::from_row(element, row, self.model.conf_threshold) {
                Some(candidate) => candidate,
                None => continue,
            };

            let keep = match ref_cx {
                None => {
                    ref_cx = Some(candidate.cx);
                    true
                }
                Some(reference) => {
                    let lo = reference * (1. - self.ratio);
                    let hi = reference * (1. + self.ratio);
                    candidate.cx < lo.min(hi) || candidate.cx > lo.max(hi)
                }
            };

            if keep {
                log::debug!("Bay endpoint candidate at element {} (cx {:.3})", element, candidate.cx);
                accepted.push(
                    Detection::new(BAY_LABEL, BAY_LABEL, candidate.screen_box(&self.model, screen_width, screen_height), candidate.confidence)
                        .with_crop(CropImage::Tag(BAY_CROP_TAG.to_string())),
                );
                if accepted.len() == self.max_endpoints {
                    break;
                }
            }
        }

        accepted
    }
}
