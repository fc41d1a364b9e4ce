//! Cross-frame, world-anchored de-duplication of detections.
//!
//! Every collection sits behind its own lock so inserts into different collections never wait
//! on each other. When more than one lock is needed they are always taken in the order
//! objects, labels, shelves, bay endpoints, bays.

use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};

use crate::common::{
    BayRecord, Detection, LabelRecord, ShelfRecord, WorldPosition, BAY_LABEL, PRICE_LABEL,
    SHELF_STRIPPING_LABEL,
};

/// What a merge did with a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Object,
    BayEndpoint,
    /// A new price label; `shelf_added` when it also opened a new shelf band.
    Label { shelf_added: bool },
    /// Close enough to an existing entry of the same kind.
    Duplicate,
    /// Kind that is recognized but never stored.
    Ignored,
}

impl MergeOutcome {
    pub fn is_stored(&self) -> bool {
        !matches!(self, MergeOutcome::Duplicate | MergeOutcome::Ignored)
    }
}

/// Owned copy of every collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FusionSnapshot {
    pub objects: Vec<Detection>,
    pub labels: Vec<LabelRecord>,
    pub shelves: Vec<ShelfRecord>,
    pub bay_endpoints: Vec<WorldPosition>,
    pub bays: Vec<BayRecord>,
}

/// Exclusive access to all collections at once.
pub struct FusionGuard<'a> {
    pub objects: MutexGuard<'a, Vec<Detection>>,
    pub labels: MutexGuard<'a, Vec<LabelRecord>>,
    pub shelves: MutexGuard<'a, Vec<ShelfRecord>>,
    pub bay_endpoints: MutexGuard<'a, Vec<WorldPosition>>,
    pub bays: MutexGuard<'a, Vec<BayRecord>>,
}

#[derive(Debug)]
pub struct FusionStore {
    dedup_distance: f32,
    bay_ratio: f32,
    objects: Mutex<Vec<Detection>>,
    labels: Mutex<Vec<LabelRecord>>,
    shelves: Mutex<Vec<ShelfRecord>>,
    bay_endpoints: Mutex<Vec<WorldPosition>>,
    bays: Mutex<Vec<BayRecord>>,
}

impl Default for FusionStore {
    fn default() -> Self {
        Self::new(0.08, 0.2)
    }
}

impl FusionStore {
    pub fn new(dedup_distance: f32, bay_ratio: f32) -> Self {
        Self {
            dedup_distance,
            bay_ratio,
            objects: Mutex::new(vec![]),
            labels: Mutex::new(vec![]),
            shelves: Mutex::new(vec![]),
            bay_endpoints: Mutex::new(vec![]),
            bays: Mutex::new(vec![]),
        }
    }

    /// Merges a candidate whose image position resolved to `position`.
    ///
    /// * `bay` - kept as a pending endpoint unless an existing endpoint's horizontal
    ///   coordinate falls inside the candidate's ratio window.
    /// * `label` - stored unless within the de-dup distance of a stored label; opens a new
    ///   shelf band unless a stored label sits within the de-dup distance vertically.
    /// * `shelf stripping` - ignored.
    /// * anything else - stored as an object unless within the de-dup distance of one.
    pub fn merge(&self, detection: Detection, position: WorldPosition) -> MergeOutcome {
        let detection = detection.with_world_position(position);
        let label = detection.label().to_owned();
        match label.as_str() {
            BAY_LABEL => self.merge_bay_endpoint(position),
            PRICE_LABEL => self.merge_label(&detection, position),
            SHELF_STRIPPING_LABEL => MergeOutcome::Ignored,
            _ => self.merge_object(detection, position),
        }
    }

    fn merge_bay_endpoint(&self, position: WorldPosition) -> MergeOutcome {
        let mut endpoints = self.bay_endpoints.lock();
        let duplicate = endpoints
            .iter()
            .any(|existing| position.within_horizontal_ratio(existing.x, self.bay_ratio));
        if duplicate {
            return MergeOutcome::Duplicate;
        }
        endpoints.push(position);
        log::debug!("Bay endpoint added at x={:.3} ({} pending)", position.x, endpoints.len());
        MergeOutcome::BayEndpoint
    }

    fn merge_label(&self, detection: &Detection, position: WorldPosition) -> MergeOutcome {
        let mut labels = self.labels.lock();
        let overlap = labels
            .iter()
            .any(|item| item.world_position.distance(&position) < self.dedup_distance);
        let overlap_shelf = labels
            .iter()
            .any(|item| item.world_position.vertical_distance(&position) < self.dedup_distance);

        if !overlap {
            labels.push(LabelRecord {
                bbox: *detection.bbox(),
                world_position: position,
            });
        }

        let mut shelves = self.shelves.lock();
        if !overlap_shelf {
            shelves.push(ShelfRecord {
                bbox: *detection.bbox(),
                world_position: position,
                id: 0,
            });
            log::debug!("Shelf band added at y={:.3}", position.y);
        }

        if overlap {
            MergeOutcome::Duplicate
        } else {
            MergeOutcome::Label { shelf_added: !overlap_shelf }
        }
    }

    fn merge_object(&self, detection: Detection, position: WorldPosition) -> MergeOutcome {
        let mut objects = self.objects.lock();
        let overlap = objects.iter().any(|item| {
            item.world_position()
                .is_some_and(|p| p.distance(&position) < self.dedup_distance)
        });
        if overlap {
            return MergeOutcome::Duplicate;
        }
        log::debug!("Object '{}' added ({:.2})", detection.label(), detection.confidence());
        objects.push(detection);
        MergeOutcome::Object
    }

    /// Takes every lock, in the store's lock order.
    pub fn lock_all(&self) -> FusionGuard<'_> {
        let objects = self.objects.lock();
        let labels = self.labels.lock();
        let shelves = self.shelves.lock();
        let bay_endpoints = self.bay_endpoints.lock();
        let bays = self.bays.lock();
        FusionGuard {
            objects,
            labels,
            shelves,
            bay_endpoints,
            bays,
        }
    }

    /// Empties every collection.
    pub fn clear(&self) {
        let mut guard = self.lock_all();
        guard.objects.clear();
        guard.labels.clear();
        guard.shelves.clear();
        guard.bay_endpoints.clear();
        guard.bays.clear();
    }

    pub fn snapshot(&self) -> FusionSnapshot {
        let guard = self.lock_all();
        FusionSnapshot {
            objects: guard.objects.clone(),
            labels: guard.labels.clone(),
            shelves: guard.shelves.clone(),
            bay_endpoints: guard.bay_endpoints.clone(),
            bays: guard.bays.clone(),
        }
    }

    pub fn objects(&self) -> Vec<Detection> {
        self.objects.lock().clone()
    }

    pub fn labels(&self) -> Vec<LabelRecord> {
        self.labels.lock().clone()
    }

    pub fn shelves(&self) -> Vec<ShelfRecord> {
        self.shelves.lock().clone()
    }

    pub fn bay_endpoints(&self) -> Vec<WorldPosition> {
        self.bay_endpoints.lock().clone()
    }

    pub fn bays(&self) -> Vec<BayRecord> {
        self.bays.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        let guard = self.lock_all();
        guard.objects.is_empty()
            && guard.labels.is_empty()
            && guard.shelves.is_empty()
            && guard.bay_endpoints.is_empty()
            && guard.bays.is_empty()
    }
}
