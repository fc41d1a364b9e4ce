//! Shelf, facing and bay assignment, run once when a scan ends.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

use crate::common::{BayRecord, Detection, ShelfRecord, WorldPosition};
use crate::fusion_store::FusionStore;

pub const MISSING_BAY_ENDPOINT_WARNING: &str = "Both bay endpoints not identified\nPlease Rescan";

/// Result of one layout pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutReport {
    pub objects: Vec<Detection>,
    pub shelves: Vec<ShelfRecord>,
    pub bays: Vec<BayRecord>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LayoutInferencer;

impl LayoutInferencer {
    /// Runs every step while holding all of the store's locks, so no insert can interleave.
    ///
    /// Pending bay endpoints are paired into bays and cleared, shelf bands are numbered and
    /// every object gets its shelf, facing and bay. The store keeps the annotated objects.
    pub fn run(store: &FusionStore) -> LayoutReport {
        let mut guard = store.lock_all();

        let new_bays = pair_bay_endpoints(&guard.bay_endpoints, guard.bays.len() as u32);
        log::info!("Paired {} pending bay endpoints into {} bays", guard.bay_endpoints.len(), new_bays.len());
        guard.bays.extend(new_bays);
        guard.bay_endpoints.clear();

        assign_shelf_ids(&mut guard.shelves);

        for object in guard.objects.iter_mut() {
            object.shelf = 0;
            object.facing = 0;
            object.bay = 0;
        }
        assign_shelves(&mut guard.objects, &guard.shelves);
        assign_facings(&mut guard.objects);
        let warnings = assign_bays(&mut guard.objects, &guard.bays);

        for object in guard.objects.iter() {
            log::debug!("{}: shelf {}, facing {}, bay {}", object.label(), object.shelf(), object.facing(), object.bay());
        }

        LayoutReport {
            objects: guard.objects.clone(),
            shelves: guard.shelves.clone(),
            bays: guard.bays.clone(),
            warnings,
        }
    }
}

/// Sorts endpoints left to right and pairs them two at a time. A trailing odd endpoint is
/// dropped. Ids continue after `existing`.
pub fn pair_bay_endpoints(endpoints: &[WorldPosition], existing: u32) -> Vec<BayRecord> {
    let mut ordered = endpoints.to_vec();
    ordered.sort_by(|a, b| a.x.total_cmp(&b.x));

    ordered
        .chunks_exact(2)
        .enumerate()
        .map(|(i, pair)| BayRecord::new(existing + i as u32 + 1, pair[0], pair[1]))
        .collect()
}

/// Numbers shelf bands by ascending vertical coordinate: the lowest band gets the highest id.
pub fn assign_shelf_ids(shelves: &mut [ShelfRecord]) {
    let count = shelves.len();
    let mut order: Vec<usize> = (0..count).collect();
    order.sort_by(|&a, &b| shelves[a].world_position.y.total_cmp(&shelves[b].world_position.y));
    for (rank, idx) in order.into_iter().enumerate() {
        shelves[idx].id = (count - rank) as u32;
    }
}

/// Places every object on a shelf band.
///
/// With bands sorted by ascending vertical coordinate, an object at or past band `s` and short
/// of band `s + 1` belongs to band `s`; anything else falls through to the last band.
/// Without bands objects stay unassigned.
pub fn assign_shelves(objects: &mut [Detection], shelves: &[ShelfRecord]) {
    let mut sorted = shelves.to_vec();
    sorted.sort_by(|a, b| a.world_position.y.total_cmp(&b.world_position.y));
    let Some(last) = sorted.last() else {
        return;
    };

    for object in objects.iter_mut() {
        let Some(y) = object.world_position().map(|p| p.y) else {
            continue;
        };
        object.shelf = sorted
            .windows(2)
            .find(|pair| y >= pair[0].world_position.y && y < pair[1].world_position.y)
            .map_or(last.id, |pair| pair[0].id);
    }
}

/// Ranks objects left to right within each shelf, starting at 1.
pub fn assign_facings(objects: &mut [Detection]) {
    let mut by_shelf: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (idx, object) in objects.iter().enumerate() {
        if object.world_position().is_some() {
            by_shelf.entry(object.shelf).or_default().push(idx);
        }
    }

    for (_, mut group) in by_shelf {
        group.sort_by(|&a, &b| {
            let xa = objects[a].world_position().map_or(0., |p| p.x);
            let xb = objects[b].world_position().map_or(0., |p| p.x);
            xa.total_cmp(&xb)
        });
        for (rank, idx) in group.into_iter().enumerate() {
            objects[idx].facing = rank as u32 + 1;
        }
    }
}

/// Sets each object's bay to the bay whose endpoints strictly contain its horizontal
/// coordinate. Bays missing an endpoint produce a warning instead.
pub fn assign_bays(objects: &mut [Detection], bays: &[BayRecord]) -> Vec<String> {
    let mut warnings = vec![];
    let incomplete = bays.iter().filter(|b| b.horizontal_span().is_none()).count();
    if incomplete > 0 {
        log::warn!("{} bays are missing an endpoint", incomplete);
        warnings.push(MISSING_BAY_ENDPOINT_WARNING.to_string());
    }

    for object in objects.iter_mut() {
        let Some(x) = object.world_position().map(|p| p.x) else {
            continue;
        };
        for bay in bays {
            if bay.contains_x(x) == Some(true) {
                object.bay = bay.id;
            }
        }
    }
    warnings
}
