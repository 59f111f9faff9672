// src/tracker.rs

use crate::detection::{calculate_iou, Detection};
use crate::types::TrackingConfig;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone)]
struct Track {
    bbox: [f32; 4],
    class_name: String,
    last_seen_frame: u64,
}

/// Assigns stable identities to detections across frames by greedy IoU
/// matching against live tracks of the same class. This layer owns
/// identity; the violation tracker only consumes the ids it stamps.
pub struct IouTracker {
    next_id: u32,
    tracks: HashMap<u32, Track>,
    iou_threshold: f32,
    max_missed_frames: u64,
}

impl IouTracker {
    pub fn new(config: &TrackingConfig) -> Self {
        Self {
            next_id: 0,
            tracks: HashMap::new(),
            iou_threshold: config.iou_threshold,
            max_missed_frames: config.max_missed_frames,
        }
    }

    /// Stamp a track id onto every detection, creating new tracks for
    /// unmatched ones and retiring tracks that went unseen for too long.
    pub fn assign(&mut self, mut detections: Vec<Detection>, frame_id: u64) -> Vec<Detection> {
        let mut claimed: Vec<u32> = Vec::new();

        for det in &mut detections {
            let mut best_match: Option<(u32, f32)> = None;

            for (track_id, track) in &self.tracks {
                if track.class_name != det.class_name || claimed.contains(track_id) {
                    continue;
                }
                let iou = calculate_iou(&track.bbox, &det.bbox);
                if iou > self.iou_threshold && best_match.map_or(true, |(_, best)| iou > best) {
                    best_match = Some((*track_id, iou));
                }
            }

            let id = match best_match {
                Some((track_id, _)) => {
                    let track = self.tracks.get_mut(&track_id).expect("matched track exists");
                    track.bbox = det.bbox;
                    track.last_seen_frame = frame_id;
                    track_id
                }
                None => {
                    let id = self.next_id;
                    self.next_id += 1;
                    self.tracks.insert(
                        id,
                        Track {
                            bbox: det.bbox,
                            class_name: det.class_name.clone(),
                            last_seen_frame: frame_id,
                        },
                    );
                    debug!("New track: ID #{} ({})", id, det.class_name);
                    id
                }
            };

            claimed.push(id);
            det.track_id = Some(id);
        }

        let max_missed = self.max_missed_frames;
        self.tracks
            .retain(|_, track| frame_id - track.last_seen_frame <= max_missed);

        detections
    }

    pub fn active_track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn total_tracks_seen(&self) -> u32 {
        self.next_id
    }
}
