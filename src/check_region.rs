// src/check_region.rs

use crate::types::RegionConfig;
use anyhow::{bail, Result};

const EDGE_EPSILON: f32 = 1e-4;

/// Fixed check area in frame coordinates. Every config variant is
/// normalized to this polygon form at construction; the region is
/// immutable afterwards.
#[derive(Debug, Clone)]
pub struct CheckRegion {
    points: Vec<(f32, f32)>,
}

impl CheckRegion {
    pub fn from_config(config: &RegionConfig) -> Result<Self> {
        let points = match config {
            RegionConfig::Rect { x1, y1, x2, y2 } => {
                if x2 <= x1 || y2 <= y1 {
                    bail!(
                        "check region rect is degenerate: ({}, {}) -> ({}, {})",
                        x1,
                        y1,
                        x2,
                        y2
                    );
                }
                vec![(*x1, *y1), (*x2, *y1), (*x2, *y2), (*x1, *y2)]
            }
            RegionConfig::RotatedRect {
                center,
                size,
                angle_degrees,
            } => {
                if size[0] <= 0.0 || size[1] <= 0.0 {
                    bail!("check region rotated rect has non-positive size");
                }
                rotated_rect_corners(*center, *size, *angle_degrees)
            }
            RegionConfig::Polygon { points } => {
                if points.len() < 3 {
                    bail!(
                        "check region polygon needs at least 3 points, got {}",
                        points.len()
                    );
                }
                points.iter().map(|p| (p[0], p[1])).collect()
            }
        };

        Ok(Self { points })
    }

    pub fn points(&self) -> &[(f32, f32)] {
        &self.points
    }

    /// Point-in-polygon test; a point exactly on the boundary counts as
    /// inside.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        if self.on_boundary(x, y) {
            return true;
        }

        // Ray casting: count crossings of a ray going in +x direction.
        let mut inside = false;
        let n = self.points.len();
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = self.points[i];
            let (xj, yj) = self.points[j];
            if (yi > y) != (yj > y) {
                let x_cross = xi + (y - yi) * (xj - xi) / (yj - yi);
                if x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    fn on_boundary(&self, x: f32, y: f32) -> bool {
        let n = self.points.len();
        for i in 0..n {
            let (x1, y1) = self.points[i];
            let (x2, y2) = self.points[(i + 1) % n];

            let cross = (x2 - x1) * (y - y1) - (y2 - y1) * (x - x1);
            if cross.abs() > EDGE_EPSILON * ((x2 - x1).abs() + (y2 - y1).abs()).max(1.0) {
                continue;
            }
            let within_x = x >= x1.min(x2) - EDGE_EPSILON && x <= x1.max(x2) + EDGE_EPSILON;
            let within_y = y >= y1.min(y2) - EDGE_EPSILON && y <= y1.max(y2) + EDGE_EPSILON;
            if within_x && within_y {
                return true;
            }
        }
        false
    }
}

/// Rotate the four axis-aligned corner offsets around the center.
fn rotated_rect_corners(center: [f32; 2], size: [f32; 2], angle_degrees: f32) -> Vec<(f32, f32)> {
    let (cx, cy) = (center[0], center[1]);
    let (hw, hh) = (size[0] / 2.0, size[1] / 2.0);
    let angle = angle_degrees.to_radians();
    let (sin, cos) = angle.sin_cos();

    [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)]
        .iter()
        .map(|(dx, dy)| (cx + dx * cos - dy * sin, cy + dx * sin + dy * cos))
        .collect()
}
