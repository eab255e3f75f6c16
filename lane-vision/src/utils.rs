use nalgebra::Vector2;
use opencv::core::{Point, Scalar, Size, Vector};

pub fn to_point(v: &Vector2<i32>) -> Point {
    Point::new(v.x, v.y)
}

pub fn bgr(color: &[f64; 3]) -> Scalar {
    Scalar::new(color[0], color[1], color[2], 0.0)
}

// Scales a polygon given in frame fractions to pixel coordinates
pub fn roi_points(size: Size, polygon: &[[f64; 2]]) -> Vector<Point> {
    polygon
        .iter()
        .map(|[fx, fy]| Point::new((fx * size.width as f64).round() as i32, (fy * size.height as f64).round() as i32))
        .collect()
}

#[cfg(test)]
pub fn mat_to_dmatrix(mat: &opencv::core::Mat) -> anyhow::Result<nalgebra::DMatrix<u8>> {
    use opencv::prelude::*;

    let mut res = nalgebra::DMatrix::zeros(mat.rows() as usize, mat.cols() as usize);
    for r in 0..mat.rows() {
        for c in 0..mat.cols() {
            res[(r as usize, c as usize)] = *mat.at_2d::<u8>(r, c)?;
        }
    }

    Ok(res)
}
