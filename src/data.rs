mod payload;
mod time_calc;
pub mod send_channels;

pub use payload::{DetectionPayload, OverviewImage};
pub use send_channels::{DetectionManager, MessageState, UserMessage};
pub use time_calc::TimeCalc;
