use std::fmt;
use tokio::sync::watch;
use crate::data::DetectionPayload;

/// Latest-value channel towards the presentation layer.
///
/// Subscribers always see the most recent payload; intermediate ones may be skipped.
#[derive(Debug)]
pub struct DetectionManager {
    payload_tx: watch::Sender<DetectionPayload>,
}

impl Default for DetectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionManager {
    pub fn new() -> Self {
        let (payload_tx, _) = watch::channel(DetectionPayload::default());
        Self { payload_tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<DetectionPayload> {
        self.payload_tx.subscribe()
    }

    /// Replaces the current payload, whether or not anyone is listening.
    pub fn update_detections(&self, payload: DetectionPayload) {
        log::debug!("Publishing {} detections", payload.detections.len());
        self.payload_tx.send_replace(payload);
    }

    pub fn latest(&self) -> DetectionPayload {
        self.payload_tx.borrow().clone()
    }
}

/// Transient message for the user, shown for a single frame or action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserMessage {
    Info(String),
    Warning(String),
    Error(String),
}

impl fmt::Display for UserMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserMessage::Info(msg) | UserMessage::Warning(msg) | UserMessage::Error(msg) => f.write_str(msg),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MessageState {
    pub msg_tx: crossbeam_channel::Sender<UserMessage>,
    pub msg_rx: crossbeam_channel::Receiver<UserMessage>,
}

impl Default for MessageState {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageState {
    pub fn new() -> Self {
        let (msg_tx, msg_rx) = crossbeam_channel::unbounded();
        Self { msg_tx, msg_rx }
    }

    /// Sends a message; a closed channel only gets logged.
    pub fn send(&self, message: UserMessage) {
        if let Err(err) = self.msg_tx.send(message) {
            log::warn!("Dropping user message: {}", err);
        }
    }
}
