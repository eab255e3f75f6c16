use std::f64::consts::PI;

use opencv::{
    core::{Mat, Vec2f, Vector},
    imgproc::hough_lines,
};

use crate::config::ExtractionConfig;

use super::line::{PolarLine, Sides};

/// Runs the standard Hough transform once per lane side, restricted to that
/// side's angle range. Near horizontal lines fall between the two ranges and
/// are never reported.
pub fn extract_candidates(edges: &Mat, config: &ExtractionConfig) -> anyhow::Result<Sides<Vec<PolarLine>>> {
    let left = detect_lines(edges, config, 0.0, config.left_angle_max)?;
    let right = detect_lines(edges, config, config.right_angle_min, PI)?;

    Ok(Sides::new(left, right))
}

fn detect_lines(
    edges: &Mat,
    config: &ExtractionConfig,
    min_theta: f64,
    max_theta: f64,
) -> anyhow::Result<Vec<PolarLine>> {
    let mut lines: Vector<Vec2f> = Vector::new();
    hough_lines(
        edges,
        &mut lines,
        config.rho_resolution,
        config.theta_resolution_deg.to_radians(),
        config.vote_threshold,
        0.0,
        0.0,
        min_theta,
        max_theta,
    )?;

    Ok(lines
        .iter()
        .map(|l| PolarLine::new(l[0] as f64, l[1] as f64))
        .collect())
}

#[cfg(test)]
mod tests {
    use opencv::{
        core::{Point, Scalar, CV_8UC1},
        imgproc::{line, LINE_8},
    };

    use super::*;

    fn edge_map_with_line(from: Point, to: Point) -> Mat {
        let mut edges = Mat::new_rows_cols_with_default(400, 400, CV_8UC1, Scalar::all(0.0)).unwrap();
        line(&mut edges, from, to, Scalar::all(255.0), 1, LINE_8, 0).unwrap();
        edges
    }

    #[test]
    fn leaning_line_is_a_left_candidate() {
        let config = ExtractionConfig::default();
        let edges = edge_map_with_line(Point::new(100, 399), Point::new(250, 0));

        let candidates = extract_candidates(&edges, &config).unwrap();
        assert!(!candidates.left.is_empty());

        // normal of the drawn line points at atan2(150, 399)
        let expected_theta = 150f64.atan2(399.0);
        let best = candidates.left[0];
        assert!((best.theta - expected_theta).abs() < 0.05, "theta {}", best.theta);
        assert!((best.rho - 234.0).abs() < 10.0, "rho {}", best.rho);

        assert!(candidates.left.iter().all(|l| l.theta >= 0.0 && l.theta <= config.left_angle_max + 1e-6));
        assert!(candidates.right.iter().all(|l| l.theta >= config.right_angle_min - 1e-6 && l.theta <= PI));
    }

    #[test]
    fn mirrored_line_is_a_right_candidate() {
        let config = ExtractionConfig::default();
        let edges = edge_map_with_line(Point::new(300, 399), Point::new(150, 0));

        let candidates = extract_candidates(&edges, &config).unwrap();
        assert!(!candidates.right.is_empty());
        assert!(candidates.left.is_empty());
    }

    #[test]
    fn horizontal_line_is_ignored() {
        let edges = edge_map_with_line(Point::new(0, 200), Point::new(399, 200));
        let candidates = extract_candidates(&edges, &ExtractionConfig::default()).unwrap();
        assert!(candidates.left.is_empty());
        assert!(candidates.right.is_empty());
    }

    #[test]
    fn empty_edge_map_has_no_candidates() {
        let edges = Mat::new_rows_cols_with_default(200, 200, CV_8UC1, Scalar::all(0.0)).unwrap();
        let candidates = extract_candidates(&edges, &ExtractionConfig::default()).unwrap();
        assert_eq!(candidates, Sides::default());
    }
}
