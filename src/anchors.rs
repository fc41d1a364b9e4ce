//! World anchors supplied by the tracking collaborator.

use std::collections::VecDeque;
use parking_lot::Mutex;
use crate::common::WorldPosition;

/// A tracked pose owned by the tracking subsystem. It must be released with [`detach`](TrackedAnchor::detach)
/// once the crate no longer needs it.
pub trait TrackedAnchor: Send {
    fn world_position(&self) -> WorldPosition;

    fn is_tracking(&self) -> bool {
        true
    }

    fn detach(&mut self);
}

/// Hit-test style resolution of an image coordinate against the tracked scene.
pub trait AnchorResolver {
    type Anchor: TrackedAnchor + 'static;

    /// First intersecting surface wins; `None` means the point cannot be anchored yet.
    fn resolve_world_position(&self, image_x: f32, image_y: f32) -> Option<Self::Anchor>;
}

/// Owns one anchor and detaches it when dropped.
pub struct AnchorHandle {
    anchor: Option<Box<dyn TrackedAnchor>>,
}

impl AnchorHandle {
    pub fn new<A: TrackedAnchor + 'static>(anchor: A) -> Self {
        Self {
            anchor: Some(Box::new(anchor)),
        }
    }

    pub fn world_position(&self) -> Option<WorldPosition> {
        self.anchor.as_ref().map(|a| a.world_position())
    }

    pub fn is_tracking(&self) -> bool {
        self.anchor.as_ref().is_some_and(|a| a.is_tracking())
    }

    /// Releases the anchor now instead of on drop.
    pub fn detach(&mut self) {
        if let Some(mut anchor) = self.anchor.take() {
            anchor.detach();
        }
    }
}

impl Drop for AnchorHandle {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for AnchorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnchorHandle")
            .field("world_position", &self.world_position())
            .finish()
    }
}

#[derive(Debug)]
pub struct LabeledAnchor {
    pub handle: AnchorHandle,
    pub label: String,
}

/// Snapshot of a labeled anchor for the render layer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorView {
    pub label: String,
    pub world_position: WorldPosition,
}

/// Anchors placed for accepted detections, capped with FIFO eviction.
#[derive(Debug)]
pub struct AnchorRegistry {
    capacity: usize,
    anchors: Mutex<VecDeque<LabeledAnchor>>,
}

impl AnchorRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            anchors: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Adds an anchor, evicting (and detaching) the oldest ones past capacity.
    pub fn push(&self, handle: AnchorHandle, label: &str) {
        let mut anchors = self.anchors.lock();
        while anchors.len() >= self.capacity {
            if let Some(mut evicted) = anchors.pop_front() {
                log::trace!("Evicting anchor '{}'", evicted.label);
                evicted.handle.detach();
            }
        }
        anchors.push_back(LabeledAnchor {
            handle,
            label: label.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.lock().is_empty()
    }

    /// Detaches and drops every anchor.
    pub fn clear(&self) {
        let drained: Vec<LabeledAnchor> = self.anchors.lock().drain(..).collect();
        drop(drained);
    }

    /// Currently tracking anchors, oldest first.
    pub fn tracking_views(&self) -> Vec<AnchorView> {
        self.anchors
            .lock()
            .iter()
            .filter(|a| a.handle.is_tracking())
            .filter_map(|a| {
                a.handle.world_position().map(|world_position| AnchorView {
                    label: a.label.clone(),
                    world_position,
                })
            })
            .collect()
    }
}
