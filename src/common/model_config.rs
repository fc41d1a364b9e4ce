use std::fmt;
use serde::{Deserialize, Serialize};

/// Shape and thresholds of one detector's raw output tensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Rows of the channel-major output: 4 box channels followed by the label scores.
    pub channels: usize,
    /// Candidate slots per channel.
    pub elements: usize,
    pub width: u32,
    pub height: u32,
    pub conf_threshold: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::object_model()
    }
}

impl ModelConfig {
    pub fn new(channels: usize, elements: usize, width: u32, height: u32, conf_threshold: f32) -> Self {
        Self {
            channels,
            elements,
            width,
            height,
            conf_threshold,
        }
    }

    /// Object / label / shelf classifier: 30 label channels.
    pub fn object_model() -> Self {
        Self::new(34, 8400, 640, 640, 0.65)
    }

    /// Bay-endpoint classifier: a single label channel.
    pub fn bay_model() -> Self {
        Self::new(5, 8400, 640, 640, 0.65)
    }

    pub fn num_labels(&self) -> usize {
        self.channels.saturating_sub(4)
    }

    pub fn tensor_len(&self) -> usize {
        self.channels * self.elements
    }
}

impl fmt::Display for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Output Tensor: {}x{}\n\
        Model Input Resolution: {}x{}\n\
        Detection Threshold: {}",
               self.channels, self.elements, self.width, self.height, self.conf_threshold)
    }
}
