// src/dataset/light_overlay.rs

use crate::signal::SignalPhase;
use crate::types::OverlayConfig;
use anyhow::{bail, Context, Result};
use opencv::{
    core::{Mat, Point, Rect, Scalar},
    imgcodecs, imgproc,
    prelude::*,
};
use rand::Rng;
use std::path::Path;
use tracing::info;
use walkdir::WalkDir;

const LIGHT_WIDTH: i32 = 30;
const LIGHT_HEIGHT: i32 = 80;
const LAMP_RADIUS: i32 = 10;
const CORNER_GAP: i32 = 10;

fn lamp_color(phase: SignalPhase) -> Scalar {
    match phase {
        SignalPhase::Red => Scalar::new(0.0, 0.0, 255.0, 0.0),
        SignalPhase::Yellow => Scalar::new(0.0, 255.0, 255.0, 0.0),
        SignalPhase::Green => Scalar::new(0.0, 255.0, 0.0, 0.0),
    }
}

fn lamp_off_color() -> Scalar {
    Scalar::new(50.0, 50.0, 50.0, 0.0)
}

/// Phase per image index: green for a random stretch, then fixed yellow
/// and red stretches, repeated until the listing is covered.
pub fn build_phase_cycle(
    len: usize,
    config: &OverlayConfig,
    rng: &mut impl Rng,
) -> Vec<SignalPhase> {
    let mut cycle = Vec::with_capacity(len);
    while cycle.len() < len {
        let green = rng.gen_range(config.green_min_frames..=config.green_max_frames);
        cycle.extend(std::iter::repeat(SignalPhase::Green).take(green));
        cycle.extend(std::iter::repeat(SignalPhase::Yellow).take(config.yellow_frames));
        cycle.extend(std::iter::repeat(SignalPhase::Red).take(config.red_frames));
    }
    cycle.truncate(len);
    cycle
}

/// Burn a simulated traffic light into every image of a directory,
/// producing the synthetic labeled feed the detector is trained on.
pub fn annotate_lights(config: &OverlayConfig) -> Result<()> {
    if config.green_min_frames > config.green_max_frames {
        bail!("overlay green_min_frames exceeds green_max_frames");
    }

    let mut paths: Vec<_> = WalkDir::new(&config.input_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| {
                    matches!(ext.to_lowercase().as_str(), "jpg" | "jpeg" | "png")
                })
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        bail!("no images found in {}", config.input_dir);
    }

    std::fs::create_dir_all(&config.output_dir)?;

    let mut rng = rand::thread_rng();
    let cycle = build_phase_cycle(paths.len(), config, &mut rng);

    for (path, phase) in paths.iter().zip(&cycle) {
        let mut img = imgcodecs::imread(
            path.to_str().unwrap_or_default(),
            imgcodecs::IMREAD_COLOR,
        )?;
        if img.empty() {
            bail!("unreadable image: {}", path.display());
        }

        draw_traffic_light(&mut img, *phase)?;

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let out_path = Path::new(&config.output_dir).join(file_name);
        imgcodecs::imwrite(
            out_path.to_str().unwrap_or_default(),
            &img,
            &opencv::core::Vector::new(),
        )
        .with_context(|| format!("Failed to write {}", out_path.display()))?;
    }

    info!(
        "✓ Overlaid traffic lights on {} image(s) into {}",
        paths.len(),
        config.output_dir
    );
    Ok(())
}

/// Housing near the top-right corner with three stacked lamps; only the
/// active lamp is lit.
fn draw_traffic_light(img: &mut Mat, active: SignalPhase) -> Result<()> {
    let width = img.cols();

    let x0 = width - LIGHT_WIDTH - CORNER_GAP;
    let y0 = CORNER_GAP;
    let housing = Rect::new(x0, y0, LIGHT_WIDTH, LIGHT_HEIGHT);

    imgproc::rectangle(
        img,
        housing,
        Scalar::new(30.0, 30.0, 30.0, 0.0),
        -1,
        imgproc::LINE_8,
        0,
    )?;
    imgproc::rectangle(
        img,
        housing,
        Scalar::new(255.0, 255.0, 255.0, 0.0),
        1,
        imgproc::LINE_8,
        0,
    )?;

    let cx = x0 + LIGHT_WIDTH / 2;
    let lamps = [
        (SignalPhase::Red, y0 + LAMP_RADIUS + 5),
        (SignalPhase::Yellow, y0 + LIGHT_HEIGHT / 2),
        (SignalPhase::Green, y0 + LIGHT_HEIGHT - LAMP_RADIUS - 5),
    ];

    for (phase, cy) in lamps {
        let color = if phase == active {
            lamp_color(phase)
        } else {
            lamp_off_color()
        };
        imgproc::circle(
            img,
            Point::new(cx, cy),
            LAMP_RADIUS,
            color,
            -1,
            imgproc::LINE_8,
            0,
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> OverlayConfig {
        OverlayConfig {
            input_dir: String::new(),
            output_dir: String::new(),
            green_min_frames: 3,
            green_max_frames: 5,
            yellow_frames: 2,
            red_frames: 4,
        }
    }

    #[test]
    fn test_cycle_covers_listing_exactly() {
        let mut rng = StdRng::seed_from_u64(1);
        let cycle = build_phase_cycle(100, &config(), &mut rng);
        assert_eq!(cycle.len(), 100);
    }

    #[test]
    fn test_cycle_starts_green_and_orders_phases() {
        let mut rng = StdRng::seed_from_u64(1);
        let cycle = build_phase_cycle(50, &config(), &mut rng);
        assert_eq!(cycle[0], SignalPhase::Green);

        // Yellow only ever follows green, red only ever follows yellow.
        for pair in cycle.windows(2) {
            match (pair[0], pair[1]) {
                (SignalPhase::Green, SignalPhase::Yellow)
                | (SignalPhase::Yellow, SignalPhase::Red)
                | (SignalPhase::Red, SignalPhase::Green) => {}
                (a, b) if a == b => {}
                (a, b) => panic!("unexpected transition {:?} -> {:?}", a, b),
            }
        }
    }

    #[test]
    fn test_green_stretch_respects_bounds() {
        let mut rng = StdRng::seed_from_u64(9);
        let cycle = build_phase_cycle(200, &config(), &mut rng);
        let first_green = cycle
            .iter()
            .take_while(|p| **p == SignalPhase::Green)
            .count();
        assert!((3..=5).contains(&first_green));
    }
}
