// src/violation.rs

use crate::check_region::CheckRegion;
use crate::detection::Detection;
use crate::signal::SignalPhase;
use std::collections::HashSet;
use tracing::info;

/// Per-stream violation state machine.
///
/// An id enters the set only while the signal is red and the detection's
/// box center is inside the check region. Once in, it stays flagged for as
/// long as the tracker keeps reporting that id (through green, through
/// leaving the region) and is dropped the moment the id disappears from a
/// frame's detections.
pub struct ViolationTracker {
    violation_classes: HashSet<String>,
    violating_ids: HashSet<u32>,
}

impl ViolationTracker {
    pub fn new(violation_classes: &[String]) -> Self {
        Self {
            violation_classes: violation_classes.iter().cloned().collect(),
            violating_ids: HashSet::new(),
        }
    }

    /// Advance the state machine by one frame.
    ///
    /// Additions happen before pruning, and pruning uses this frame's id
    /// set, so an id that first appears already in violation is retained.
    pub fn update(
        &mut self,
        phase: SignalPhase,
        detections: &[Detection],
        region: &CheckRegion,
    ) {
        let mut current_ids: HashSet<u32> = HashSet::new();

        for det in detections {
            if !self.violation_classes.contains(&det.class_name) {
                continue;
            }
            let Some(id) = det.track_id else {
                continue;
            };
            current_ids.insert(id);

            if phase == SignalPhase::Red {
                let (cx, cy) = det.center();
                if region.contains(cx, cy) && self.violating_ids.insert(id) {
                    info!(
                        "🚨 Violation: {} (ID #{}) entered check area on red",
                        det.class_name, id
                    );
                }
            }
        }

        // Prune ids that left the scene or lost tracking. Presence alone
        // keeps an id flagged; phase and region no longer matter.
        self.violating_ids.retain(|id| current_ids.contains(id));
    }

    pub fn is_violation_class(&self, class_name: &str) -> bool {
        self.violation_classes.contains(class_name)
    }

    /// Render decision: a detection is drawn as violating iff it carries a
    /// tracking id that is currently in the violation set.
    pub fn is_violating(&self, detection: &Detection) -> bool {
        detection
            .track_id
            .map_or(false, |id| self.violating_ids.contains(&id))
    }

    pub fn violating_count(&self) -> usize {
        self.violating_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RegionConfig;

    fn region() -> CheckRegion {
        CheckRegion::from_config(&RegionConfig::Rect {
            x1: 0.0,
            y1: 0.0,
            x2: 100.0,
            y2: 100.0,
        })
        .unwrap()
    }

    fn det(id: Option<u32>, class: &str, cx: f32, cy: f32) -> Detection {
        Detection {
            bbox: [cx - 10.0, cy - 10.0, cx + 10.0, cy + 10.0],
            confidence: 0.9,
            class_id: 0,
            class_name: class.to_string(),
            track_id: id,
        }
    }

    fn tracker() -> ViolationTracker {
        ViolationTracker::new(&["car".to_string(), "truck".to_string()])
    }

    #[test]
    fn test_red_inside_region_records_violation() {
        let mut vt = tracker();
        let d = det(Some(7), "car", 50.0, 50.0);
        vt.update(SignalPhase::Red, &[d.clone()], &region());
        assert!(vt.is_violating(&d));
        assert_eq!(vt.violating_count(), 1);
    }

    #[test]
    fn test_green_inside_region_is_not_a_violation() {
        let mut vt = tracker();
        let d = det(Some(7), "car", 50.0, 50.0);
        vt.update(SignalPhase::Green, &[d.clone()], &region());
        assert!(!vt.is_violating(&d));
    }

    #[test]
    fn test_update_is_idempotent_for_same_frame() {
        let mut vt = tracker();
        let frame = vec![det(Some(1), "car", 50.0, 50.0), det(Some(2), "car", 200.0, 200.0)];
        vt.update(SignalPhase::Red, &frame, &region());
        let after_first = vt.violating_count();
        vt.update(SignalPhase::Red, &frame, &region());
        assert_eq!(vt.violating_count(), after_first);
        assert_eq!(after_first, 1);
    }

    #[test]
    fn test_violation_sticks_until_id_disappears() {
        let mut vt = tracker();
        let r = region();

        // Red, inside: flagged.
        let inside = det(Some(7), "car", 50.0, 50.0);
        vt.update(SignalPhase::Red, &[inside], &r);

        // Green, outside the region, same id: still flagged.
        let outside = det(Some(7), "car", 300.0, 300.0);
        vt.update(SignalPhase::Green, &[outside.clone()], &r);
        assert!(vt.is_violating(&outside));

        // Id gone: pruned.
        vt.update(SignalPhase::Green, &[], &r);
        assert_eq!(vt.violating_count(), 0);

        // A later appearance under a fresh id starts clean.
        let reappeared = det(Some(12), "car", 50.0, 50.0);
        vt.update(SignalPhase::Green, &[reappeared.clone()], &r);
        assert!(!vt.is_violating(&reappeared));
    }

    #[test]
    fn test_pruning_only_depends_on_presence() {
        let mut vt = tracker();
        let r = region();
        vt.update(SignalPhase::Red, &[det(Some(3), "truck", 50.0, 50.0)], &r);

        // Phase changes and region exits never remove a present id.
        for phase in [SignalPhase::Green, SignalPhase::Yellow, SignalPhase::Red] {
            vt.update(phase, &[det(Some(3), "truck", 500.0, 500.0)], &r);
            assert_eq!(vt.violating_count(), 1);
        }
    }

    #[test]
    fn test_untracked_detections_are_ignored() {
        let mut vt = tracker();
        let d = det(None, "car", 50.0, 50.0);
        vt.update(SignalPhase::Red, &[d.clone()], &region());
        assert!(!vt.is_violating(&d));
        assert_eq!(vt.violating_count(), 0);
    }

    #[test]
    fn test_non_violation_classes_are_ignored() {
        let mut vt = tracker();
        let d = det(Some(9), "bicycle", 50.0, 50.0);
        vt.update(SignalPhase::Red, &[d.clone()], &region());
        assert!(!vt.is_violating(&d));
    }

    #[test]
    fn test_violation_id_added_and_pruned_in_same_frame_order() {
        // An id first seen in violation must survive that frame's prune.
        let mut vt = tracker();
        let d = det(Some(21), "car", 50.0, 50.0);
        vt.update(SignalPhase::Red, &[d.clone()], &region());
        assert!(vt.is_violating(&d));
    }
}
