// src/renderer.rs

use crate::check_region::CheckRegion;
use crate::detection::Detection;
use crate::signal::SignalPhase;
use crate::violation::ViolationTracker;
use anyhow::Result;
use opencv::{
    core::{Mat, Point, Rect, Scalar, Vector},
    imgcodecs, imgproc,
    prelude::*,
};

fn red() -> Scalar {
    Scalar::new(0.0, 0.0, 255.0, 0.0)
}

fn green() -> Scalar {
    Scalar::new(0.0, 255.0, 0.0, 0.0)
}

fn yellow() -> Scalar {
    Scalar::new(0.0, 255.0, 255.0, 0.0)
}

fn neutral() -> Scalar {
    Scalar::new(160.0, 160.0, 160.0, 0.0)
}

fn phase_color(phase: SignalPhase) -> Scalar {
    match phase {
        SignalPhase::Red => red(),
        SignalPhase::Green => green(),
        SignalPhase::Yellow => yellow(),
    }
}

/// Draw the check region, signal banner and detection boxes onto a frame.
///
/// Stateless; any drawing error aborts this frame's emission without
/// touching the violation set.
pub fn annotate_frame(
    frame: &mut Mat,
    phase: SignalPhase,
    detections: &[Detection],
    region: &CheckRegion,
    violations: &ViolationTracker,
) -> Result<()> {
    for det in detections {
        let [x1, y1, x2, y2] = det.bbox;
        let rect = Rect::new(
            x1.round() as i32,
            y1.round() as i32,
            (x2 - x1).round().max(1.0) as i32,
            (y2 - y1).round().max(1.0) as i32,
        );
        let label_org = Point::new(x1.round() as i32, y1.round() as i32 - 5);

        let (color, thickness, label) = if !violations.is_violation_class(&det.class_name) {
            (neutral(), 1, det.class_name.clone())
        } else if violations.is_violating(det) {
            (red(), 2, format!("{} (Violation)", det.class_name))
        } else {
            (green(), 1, det.class_name.clone())
        };

        imgproc::rectangle(frame, rect, color, thickness, imgproc::LINE_8, 0)?;
        imgproc::put_text(
            frame,
            &label,
            label_org,
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.6,
            color,
            thickness,
            imgproc::LINE_8,
            false,
        )?;
    }

    draw_check_region(frame, region)?;
    draw_phase_banner(frame, phase)?;

    Ok(())
}

fn draw_check_region(frame: &mut Mat, region: &CheckRegion) -> Result<()> {
    let mut contour: Vector<Point> = Vector::new();
    for (x, y) in region.points() {
        contour.push(Point::new(x.round() as i32, y.round() as i32));
    }
    let mut polygons: Vector<Vector<Point>> = Vector::new();
    polygons.push(contour);

    imgproc::polylines(frame, &polygons, true, yellow(), 2, imgproc::LINE_8, 0)?;
    Ok(())
}

fn draw_phase_banner(frame: &mut Mat, phase: SignalPhase) -> Result<()> {
    imgproc::rectangle(
        frame,
        Rect::new(25, 25, 360, 45),
        Scalar::new(40.0, 40.0, 40.0, 0.0),
        -1,
        imgproc::LINE_8,
        0,
    )?;
    imgproc::put_text(
        frame,
        &format!("Traffic Light: {}", phase.label()),
        Point::new(35, 55),
        imgproc::FONT_HERSHEY_SIMPLEX,
        1.0,
        phase_color(phase),
        3,
        imgproc::LINE_8,
        false,
    )?;
    Ok(())
}

/// Encode an annotated frame for the MJPEG stream.
pub fn encode_jpeg(frame: &Mat) -> Result<Vec<u8>> {
    let mut buf: Vector<u8> = Vector::new();
    imgcodecs::imencode(".jpg", frame, &mut buf, &Vector::new())?;
    Ok(buf.to_vec())
}
