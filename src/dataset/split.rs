// src/dataset/split.rs

use crate::types::DatasetConfig;
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs;
use std::path::Path;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Shuffle the image listing with a seeded RNG, keep `subset_ratio` of it
/// and cut the subset at `train_ratio`. Deterministic for a given seed.
pub fn partition(
    mut files: Vec<String>,
    subset_ratio: f64,
    train_ratio: f64,
    seed: u64,
) -> (Vec<String>, Vec<String>) {
    files.sort();
    let mut rng = StdRng::seed_from_u64(seed);
    files.shuffle(&mut rng);

    let subset_size = (files.len() as f64 * subset_ratio) as usize;
    files.truncate(subset_size);

    let split_index = (files.len() as f64 * train_ratio) as usize;
    let val = files.split_off(split_index);
    (files, val)
}

/// Copy train/val image+label pairs into the YOLO directory layout
/// `<output>/{train,val}/{images,labels}`.
pub fn split_dataset(config: &DatasetConfig) -> Result<()> {
    let images: Vec<String> = WalkDir::new(&config.images_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| ext.eq_ignore_ascii_case("jpg"))
        })
        .filter_map(|e| e.file_name().to_str().map(String::from))
        .collect();

    if images.is_empty() {
        anyhow::bail!("no .jpg images found in {}", config.images_dir);
    }

    let (train, val) = partition(
        images,
        config.subset_ratio,
        config.train_ratio,
        config.seed,
    );

    info!(
        "Subset of {} image(s): {} train, {} val",
        train.len() + val.len(),
        train.len(),
        val.len()
    );

    copy_pairs(config, &train, "train")?;
    copy_pairs(config, &val, "val")?;

    info!("✓ Dataset split written to {}", config.output_dir);
    Ok(())
}

fn copy_pairs(config: &DatasetConfig, files: &[String], subset: &str) -> Result<()> {
    let image_dir = Path::new(&config.output_dir).join(subset).join("images");
    let label_dir = Path::new(&config.output_dir).join(subset).join("labels");
    fs::create_dir_all(&image_dir)?;
    fs::create_dir_all(&label_dir)?;

    for file in files {
        let stem = Path::new(file)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file);
        let label_name = format!("{}.txt", stem);

        let label_src = Path::new(&config.labels_dir).join(&label_name);
        if !label_src.exists() {
            warn!("Label file not found for image {}", file);
            continue;
        }

        let image_src = Path::new(&config.images_dir).join(file);
        fs::copy(&image_src, image_dir.join(file))
            .with_context(|| format!("Failed to copy {}", image_src.display()))?;
        fs::copy(&label_src, label_dir.join(&label_name))
            .with_context(|| format!("Failed to copy {}", label_src.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{:04}.jpg", i)).collect()
    }

    #[test]
    fn test_partition_sizes() {
        let (train, val) = partition(names(100), 0.3, 0.8, 42);
        assert_eq!(train.len() + val.len(), 30);
        assert_eq!(train.len(), 24);
        assert_eq!(val.len(), 6);
    }

    #[test]
    fn test_partition_is_deterministic_for_seed() {
        let (a_train, a_val) = partition(names(50), 0.5, 0.8, 7);
        let (b_train, b_val) = partition(names(50), 0.5, 0.8, 7);
        assert_eq!(a_train, b_train);
        assert_eq!(a_val, b_val);
    }

    #[test]
    fn test_partition_train_and_val_are_disjoint() {
        let (train, val) = partition(names(40), 1.0, 0.5, 3);
        for file in &val {
            assert!(!train.contains(file));
        }
        assert_eq!(train.len() + val.len(), 40);
    }
}
