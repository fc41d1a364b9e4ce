pub mod bay_matcher;
pub mod image_ops;
pub mod inference_process;
pub mod nms;
pub mod shelf_detector;
pub mod tensor_decoder;

pub use bay_matcher::BayEndpointMatcher;
pub use inference_process::{InferenceBackend, InferenceProcess};
pub use shelf_detector::{FrameRequest, RawOutputs, ShelfDetector};
pub use tensor_decoder::{RawCandidate, TensorDecoder};
