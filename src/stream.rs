// src/stream.rs

use crate::check_region::CheckRegion;
use crate::detection::{Detection, YoloDetector};
use crate::frame_source::ImageSequence;
use crate::renderer;
use crate::signal::PhaseSequence;
use crate::tracker::IouTracker;
use crate::types::Config;
use crate::violation::ViolationTracker;
use anyhow::Result;
use bytes::Bytes;
use opencv::{core::Mat, imgproc, prelude::*};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Everything one running stream owns: the model, the tracker, the
/// violation set and the frame cursor live here rather than in globals.
/// Exactly one producer drives the session; viewers only ever see the
/// encoded frames it broadcasts.
pub struct StreamSession {
    source: ImageSequence,
    detector: YoloDetector,
    tracker: Option<IouTracker>,
    violations: ViolationTracker,
    phases: PhaseSequence,
    region: CheckRegion,
    started: Instant,
    frame_count: u64,
    frame_width: usize,
    frame_height: usize,
    confidence_threshold: f32,
}

impl StreamSession {
    pub fn new(config: &Config) -> Result<Self> {
        let source = ImageSequence::open(
            &config.stream.images_dir,
            config.stream.frame_step,
            config.stream.frame_width,
            config.stream.frame_height,
        )?;
        info!("Cycling {} image(s) as the synthetic feed", source.len());

        let detector = YoloDetector::new(&config.model, config.detection.nms_iou_threshold)?;
        let tracker = config
            .detection
            .tracking
            .enabled
            .then(|| IouTracker::new(&config.detection.tracking));
        if tracker.is_none() {
            info!("Tracking disabled; violations will not persist across frames");
        }

        let phases = PhaseSequence::new(&config.signal.phases)?;
        info!("Signal cycle: {:.0}s", phases.cycle_length());

        Ok(Self {
            source,
            detector,
            tracker,
            violations: ViolationTracker::new(&config.detection.violation_classes),
            phases,
            region: CheckRegion::from_config(&config.check_region)?,
            started: Instant::now(),
            frame_count: 0,
            frame_width: config.stream.frame_width as usize,
            frame_height: config.stream.frame_height as usize,
            confidence_threshold: config.detection.confidence_threshold,
        })
    }

    /// Run one full detect -> update -> render -> encode cycle.
    /// None means the frame was skipped (unreadable image).
    pub fn next_jpeg(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(mut frame) = self.source.next_frame()? else {
            return Ok(None);
        };
        self.frame_count += 1;

        let phase = self.phases.phase_at(self.started.elapsed().as_secs_f64());

        // A failed inference degrades to an empty frame: the violation set
        // gets pruned as if nothing was seen, and the stream keeps going.
        let detections = match self.detect(&frame) {
            Ok(detections) => detections,
            Err(e) => {
                warn!("Detection failed on frame {}: {e:#}", self.frame_count);
                Vec::new()
            }
        };
        let detections = match &mut self.tracker {
            Some(tracker) => tracker.assign(detections, self.frame_count),
            None => detections,
        };

        self.violations.update(phase, &detections, &self.region);

        renderer::annotate_frame(&mut frame, phase, &detections, &self.region, &self.violations)?;

        if self.frame_count % 50 == 0 {
            info!(
                "Frame {}: phase={} | detections={} | active tracks={} | unique seen={} | violating={}",
                self.frame_count,
                phase.label(),
                detections.len(),
                self.tracker.as_ref().map_or(0, |t| t.active_track_count()),
                self.tracker.as_ref().map_or(0, |t| t.total_tracks_seen()),
                self.violations.violating_count()
            );
        }

        Ok(Some(renderer::encode_jpeg(&frame)?))
    }

    fn detect(&mut self, frame: &Mat) -> Result<Vec<Detection>> {
        let mut rgb = Mat::default();
        imgproc::cvt_color(frame, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;
        let data = rgb.data_bytes()?;
        self.detector.detect(
            data,
            self.frame_width,
            self.frame_height,
            self.confidence_threshold,
        )
    }
}

/// Single-owner producer loop. Frames are published into a broadcast
/// channel; slow viewers drop frames instead of stalling the pipeline.
pub fn spawn_producer(
    mut session: StreamSession,
    frames: broadcast::Sender<Bytes>,
) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || loop {
        match session.next_jpeg() {
            Ok(Some(jpeg)) => {
                // Send only fails when no viewer is connected.
                let _ = frames.send(Bytes::from(jpeg));
            }
            Ok(None) => {
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(e) => {
                error!("Frame dropped from stream: {e:#}");
                std::thread::sleep(Duration::from_millis(100));
            }
        }
    })
}
