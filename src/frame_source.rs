// src/frame_source.rs

use anyhow::{bail, Result};
use opencv::{
    core::{Mat, Rect, Scalar, Size},
    imgcodecs, imgproc,
    prelude::*,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "JPG", "JPEG", "PNG"];

// The source images carry a burned-in timestamp in the top-left corner;
// it is masked out so the detector never sees it.
const TIMESTAMP_MASK: (i32, i32) = (140, 26);

/// Cycles through a sorted directory of still images like a video feed,
/// advancing by a configurable step and wrapping at the end. Independent
/// of the phase clock.
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    index: usize,
    step: usize,
    width: i32,
    height: i32,
}

impl ImageSequence {
    pub fn open(dir: &str, step: usize, width: i32, height: i32) -> Result<Self> {
        let mut paths: Vec<PathBuf> = WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .and_then(|ext| ext.to_str())
                    .map_or(false, |ext| IMAGE_EXTENSIONS.contains(&ext))
            })
            .collect();
        paths.sort();

        info!("Found {} image(s) in {}", paths.len(), dir);
        Self::from_paths(paths, step, width, height)
    }

    fn from_paths(paths: Vec<PathBuf>, step: usize, width: i32, height: i32) -> Result<Self> {
        if paths.is_empty() {
            bail!("image sequence is empty");
        }
        if step == 0 {
            bail!("frame step must be at least 1");
        }
        Ok(Self {
            paths,
            index: 0,
            step,
            width,
            height,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    fn next_path(&mut self) -> &Path {
        let i = self.index % self.paths.len();
        self.index = (self.index + self.step) % self.paths.len();
        &self.paths[i]
    }

    /// Load the next frame, resized to the configured dimensions.
    /// An unreadable file is skipped (None), never fatal.
    pub fn next_frame(&mut self) -> Result<Option<Mat>> {
        let path = self.next_path().to_path_buf();

        let mut img = imgcodecs::imread(
            path.to_str().unwrap_or_default(),
            imgcodecs::IMREAD_COLOR,
        )?;
        if img.empty() {
            warn!("Skipping unreadable image: {}", path.display());
            return Ok(None);
        }

        let (mask_w, mask_h) = TIMESTAMP_MASK;
        imgproc::rectangle(
            &mut img,
            Rect::new(0, 0, mask_w, mask_h),
            Scalar::new(0.0, 0.0, 0.0, 0.0),
            -1,
            imgproc::LINE_8,
            0,
        )?;

        let mut resized = Mat::default();
        imgproc::resize(
            &img,
            &mut resized,
            Size::new(self.width, self.height),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;

        Ok(Some(resized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(n: usize, step: usize) -> ImageSequence {
        let paths = (0..n)
            .map(|i| PathBuf::from(format!("{:04}.jpg", i)))
            .collect();
        ImageSequence::from_paths(paths, step, 1024, 640).unwrap()
    }

    #[test]
    fn test_advances_by_step_and_wraps() {
        let mut seq = sequence(5, 3);
        let visited: Vec<String> = (0..5)
            .map(|_| seq.next_path().file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            visited,
            vec!["0000.jpg", "0003.jpg", "0001.jpg", "0004.jpg", "0002.jpg"]
        );
    }

    #[test]
    fn test_step_one_visits_in_order() {
        let mut seq = sequence(3, 1);
        assert_eq!(seq.next_path().to_string_lossy(), "0000.jpg");
        assert_eq!(seq.next_path().to_string_lossy(), "0001.jpg");
        assert_eq!(seq.next_path().to_string_lossy(), "0002.jpg");
        assert_eq!(seq.next_path().to_string_lossy(), "0000.jpg");
    }

    #[test]
    fn test_empty_directory_rejected() {
        assert!(ImageSequence::from_paths(vec![], 1, 1024, 640).is_err());
    }

    #[test]
    fn test_zero_step_rejected() {
        let paths = vec![PathBuf::from("a.jpg")];
        assert!(ImageSequence::from_paths(paths, 0, 1024, 640).is_err());
    }
}
