//! File/code adapted from https://github.com/jamjamjon/usls

pub trait Nms {
    fn iou(&self, other: &Self) -> f32;
    fn confidence(&self) -> f32;
}

/// Greedy non-max suppression.
///
/// Sorts by descending confidence (stable, so ties keep their input order), then keeps a
/// box only if its IoU with every box kept before it is below `iou_threshold`. The survivors
/// stay in descending confidence order.
pub fn nms<T: Nms>(boxes: &mut Vec<T>, iou_threshold: f32) {
    boxes.sort_by(|b1, b2| {
        b2.confidence()
            .partial_cmp(&b1.confidence())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut current_index = 0;
    for index in 0..boxes.len() {
        let mut drop = false;
        for prev_index in 0..current_index {
            let iou = boxes[prev_index].iou(&boxes[index]);
            if iou >= iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            boxes.swap(current_index, index);
            current_index += 1;
        }
    }
    boxes.truncate(current_index);
}

/// Owned variant of [`nms`].
pub fn apply_nms<T: Nms>(mut boxes: Vec<T>, iou_threshold: f32) -> Vec<T> {
    nms(&mut boxes, iou_threshold);
    boxes
}
