// src/dataset/labels.rs

use crate::types::DatasetConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Debug, Deserialize)]
pub struct CocoFile {
    #[serde(default)]
    pub images: Vec<CocoImage>,
    #[serde(default)]
    pub annotations: Vec<CocoAnnotation>,
    #[serde(default)]
    pub categories: Vec<CocoCategory>,
}

#[derive(Debug, Deserialize)]
pub struct CocoImage {
    pub id: i64,
    pub file_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CocoAnnotation {
    pub image_id: i64,
    pub category_id: i64,
    /// [x, y, width, height] in pixels.
    pub bbox: Vec<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CocoCategory {
    pub id: i64,
    pub name: String,
}

/// Label lines for one image: `<category_id> <x_center> <y_center> <w> <h>`,
/// normalized against the frame dimensions. Empty string when the file has
/// no annotation record.
pub fn label_lines(coco: &CocoFile, file_name: &str, frame_w: f64, frame_h: f64) -> String {
    let Some(image) = coco.images.iter().find(|img| img.file_name == file_name) else {
        return String::new();
    };

    let mut lines = String::new();
    for ann in coco.annotations.iter().filter(|a| a.image_id == image.id) {
        if ann.bbox.len() < 4 {
            continue;
        }
        let (x, y, w, h) = (ann.bbox[0], ann.bbox[1], ann.bbox[2], ann.bbox[3]);
        let x_center = (x + w / 2.0) / frame_w;
        let y_center = (y + h / 2.0) / frame_h;
        lines.push_str(&format!(
            "{} {} {} {} {}\n",
            ann.category_id,
            x_center,
            y_center,
            w / frame_w,
            h / frame_h
        ));
    }
    lines
}

/// Convert the MSCOCO-style annotation file into one label file per image.
/// Images without a record still get an empty file so the training layout
/// stays aligned with the image listing.
pub fn write_label_files(config: &DatasetConfig, frame_w: f64, frame_h: f64) -> Result<()> {
    let raw = fs::read_to_string(&config.annotations_path)
        .with_context(|| format!("Failed to read {}", config.annotations_path))?;
    let coco: CocoFile = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid annotation file", config.annotations_path))?;

    info!(
        "Loaded {} image record(s), {} annotation(s), {} categorie(s)",
        coco.images.len(),
        coco.annotations.len(),
        coco.categories.len()
    );
    for cat in &coco.categories {
        debug!("Category {}: {}", cat.id, cat.name);
    }

    fs::create_dir_all(&config.labels_dir)?;

    let mut written = 0usize;
    let mut unmatched = 0usize;
    for entry in WalkDir::new(&config.images_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| {
                IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
            });
        if !is_image {
            continue;
        }

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        let lines = label_lines(&coco, file_name, frame_w, frame_h);
        if lines.is_empty() {
            unmatched += 1;
            warn!("No annotation record for {}", file_name);
        }

        let out_path = Path::new(&config.labels_dir).join(format!("{}.txt", stem));
        fs::write(&out_path, lines)
            .with_context(|| format!("Failed to write {}", out_path.display()))?;
        written += 1;
    }

    info!(
        "✓ Wrote {} label file(s) to {} ({} without annotations)",
        written, config.labels_dir, unmatched
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CocoFile {
        serde_json::from_str(
            r#"{
                "images": [
                    {"id": 1, "file_name": "frame_0001.jpg"},
                    {"id": 2, "file_name": "frame_0002.jpg"}
                ],
                "annotations": [
                    {"image_id": 1, "category_id": 3, "bbox": [100.0, 200.0, 256.0, 128.0]},
                    {"image_id": 1, "category_id": 1, "bbox": [0.0, 0.0, 512.0, 320.0]},
                    {"image_id": 2, "category_id": 2, "bbox": [10.0, 10.0]}
                ],
                "categories": [
                    {"id": 1, "name": "car"},
                    {"id": 2, "name": "truck"},
                    {"id": 3, "name": "bus"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_label_lines_normalized_format() {
        let lines = label_lines(&sample(), "frame_0001.jpg", 1024.0, 640.0);
        let mut split = lines.lines();
        // (100 + 128) / 1024 = 0.22265625, (200 + 64) / 640 = 0.4125
        assert_eq!(split.next().unwrap(), "3 0.22265625 0.4125 0.25 0.2");
        assert_eq!(split.next().unwrap(), "1 0.25 0.25 0.5 0.5");
        assert!(split.next().is_none());
    }

    #[test]
    fn test_unknown_file_yields_empty_body() {
        assert!(label_lines(&sample(), "missing.jpg", 1024.0, 640.0).is_empty());
    }

    #[test]
    fn test_short_bbox_is_skipped() {
        assert!(label_lines(&sample(), "frame_0002.jpg", 1024.0, 640.0).is_empty());
    }

    #[test]
    fn test_write_label_files_creates_one_txt_per_image() {
        let dir = tempfile::tempdir().unwrap();
        let images_dir = dir.path().join("images");
        let labels_dir = dir.path().join("labels");
        fs::create_dir_all(&images_dir).unwrap();

        // Only the file names matter here; the tool never decodes pixels.
        fs::write(images_dir.join("frame_0001.jpg"), b"").unwrap();
        fs::write(images_dir.join("orphan.jpg"), b"").unwrap();
        fs::write(images_dir.join("notes.txt"), b"").unwrap();

        let annotations_path = dir.path().join("annotations.json");
        fs::write(
            &annotations_path,
            r#"{
                "images": [{"id": 1, "file_name": "frame_0001.jpg"}],
                "annotations": [{"image_id": 1, "category_id": 3, "bbox": [100.0, 200.0, 256.0, 128.0]}],
                "categories": [{"id": 3, "name": "bus"}]
            }"#,
        )
        .unwrap();

        let config = DatasetConfig {
            annotations_path: annotations_path.to_string_lossy().into_owned(),
            images_dir: images_dir.to_string_lossy().into_owned(),
            labels_dir: labels_dir.to_string_lossy().into_owned(),
            output_dir: dir.path().join("out").to_string_lossy().into_owned(),
            subset_ratio: 1.0,
            train_ratio: 0.8,
            seed: 42,
            overlay: crate::types::OverlayConfig {
                input_dir: String::new(),
                output_dir: String::new(),
                green_min_frames: 1,
                green_max_frames: 1,
                yellow_frames: 1,
                red_frames: 1,
            },
        };

        write_label_files(&config, 1024.0, 640.0).unwrap();

        let annotated = fs::read_to_string(labels_dir.join("frame_0001.txt")).unwrap();
        assert_eq!(annotated, "3 0.22265625 0.4125 0.25 0.2\n");

        let orphan = fs::read_to_string(labels_dir.join("orphan.txt")).unwrap();
        assert!(orphan.is_empty());

        assert!(!labels_dir.join("notes.txt").exists());
    }
}
