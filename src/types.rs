// src/types.rs

use serde::{Deserialize, Serialize};

use crate::signal::SignalPhase;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    pub detection: DetectionConfig,
    pub signal: SignalConfig,
    pub check_region: RegionConfig,
    pub stream: StreamConfig,
    pub dataset: DatasetConfig,
    pub training: TrainingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub path: String,
    pub input_size: usize,
    pub class_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub confidence_threshold: f32,
    pub nms_iou_threshold: f32,
    pub violation_classes: Vec<String>,
    pub tracking: TrackingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    pub enabled: bool,
    pub iou_threshold: f32,
    pub max_missed_frames: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    pub phases: Vec<PhaseStep>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PhaseStep {
    pub phase: SignalPhase,
    pub duration: f64,
}

/// Check-region geometry as written in config. All three variants are
/// normalized to a polygon at startup, see `check_region::CheckRegion`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegionConfig {
    Rect {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    },
    RotatedRect {
        center: [f32; 2],
        size: [f32; 2],
        angle_degrees: f32,
    },
    Polygon {
        points: Vec<[f32; 2]>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    pub images_dir: String,
    pub frame_width: i32,
    pub frame_height: i32,
    pub frame_step: usize,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub annotations_path: String,
    pub images_dir: String,
    pub labels_dir: String,
    pub output_dir: String,
    pub subset_ratio: f64,
    pub train_ratio: f64,
    pub seed: u64,
    pub overlay: OverlayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    pub input_dir: String,
    pub output_dir: String,
    pub green_min_frames: usize,
    pub green_max_frames: usize,
    pub yellow_frames: usize,
    pub red_frames: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub command: String,
    pub base_model: String,
    pub data_yaml: String,
    pub epochs: u32,
    pub device: String,
    pub batch: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}
