use anyhow::bail;
use opencv::{
    core::{add_weighted, Mat, MatTraitConst, Point, Scalar, Vector, CV_8UC3},
    imgproc::{fill_poly_def, line, put_text, FONT_HERSHEY_SIMPLEX, LINE_8, LINE_AA},
};

use crate::{
    config::RenderConfig,
    lanes::line::{PolarLine, Segment, Side, Sides},
    utils::{bgr, to_point},
};

/// Cartesian segments for the smoothed lines, cropped to the road band.
pub fn lane_segments(lines: &Sides<Option<PolarLine>>, config: &RenderConfig) -> Sides<Option<Segment>> {
    lines.map(|_, polar| {
        polar.map(|l| l.to_segment(config.segment_extension).cropped(config.horizon_y, config.frame_bottom_y))
    })
}

/// Blends the lane overlay (and the lane change label, if any) onto a copy of
/// `frame`. Missing sides are skipped, as is the fill between them.
pub fn render_lanes(
    frame: &Mat,
    segments: &Sides<Option<Segment>>,
    label: Option<Side>,
    config: &RenderConfig,
) -> anyhow::Result<Mat> {
    if frame.typ() != CV_8UC3 {
        bail!("Can only render onto BGR frames, got type {}", frame.typ());
    }

    let mut overlay = Mat::new_size_with_default(frame.size()?, CV_8UC3, Scalar::all(0.0))?;

    if let Sides { left: Some(left), right: Some(right) } = segments {
        let quad: Vector<Point> = [left.bottom, left.top, right.top, right.bottom]
            .iter()
            .map(to_point)
            .collect();
        fill_poly_def(&mut overlay, &Vector::<Vector<Point>>::from_iter([quad]), bgr(&config.fill_color))?;
    }

    for (_, segment) in segments.iter() {
        let Some(segment) = segment else {
            continue;
        };
        line(
            &mut overlay,
            to_point(&segment.bottom),
            to_point(&segment.top),
            bgr(&config.line_color),
            config.line_thickness,
            LINE_8,
            0,
        )?;
    }

    // Saturating blend, the weights are allowed to brighten the frame
    let mut output = Mat::default();
    add_weighted(frame, config.frame_weight, &overlay, config.overlay_weight, 0.0, &mut output, -1)?;

    if let Some(direction) = label {
        put_text(
            &mut output,
            &format!("Lane Change: {}", direction.label()),
            Point::new(config.label_origin[0], config.label_origin[1]),
            FONT_HERSHEY_SIMPLEX,
            config.label_scale,
            bgr(&config.label_color),
            config.label_thickness,
            LINE_AA,
            false,
        )?;
    }

    Ok(output)
}
