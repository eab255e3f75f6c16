use anyhow::bail;
use opencv::{
    core::{bitwise_and_def, convert_scale_abs, Mat, MatTraitConst, Point, Scalar, Size, Vector, CV_8UC1, CV_8UC3},
    imgproc::{canny_def, cvt_color_def, fill_poly_def, gaussian_blur_def, COLOR_BGR2GRAY},
};

use crate::{config::PreprocessConfig, utils::roi_points};

/// Turns a BGR (or already grey) frame into a binary edge map of the same size,
/// with everything outside the road region of interest zeroed.
pub fn preprocess_frame(img: &Mat, config: &PreprocessConfig) -> anyhow::Result<Mat> {
    let mut img_gray = Mat::default();
    match img.typ() {
        CV_8UC1 => {
            img_gray = img.clone();
        }
        CV_8UC3 => {
            cvt_color_def(img, &mut img_gray, COLOR_BGR2GRAY)?;
        }
        typ => {
            bail!("Frame of unsupported type {typ}");
        }
    }

    // Brighten markings before smoothing
    let mut img_contrast = Mat::default();
    convert_scale_abs(&img_gray, &mut img_contrast, config.contrast_alpha, config.contrast_beta)?;

    let mut img_blur = Mat::default();
    let k = config.blur_kernel;
    gaussian_blur_def(&img_contrast, &mut img_blur, Size::new(k, k), 0.0)?;

    let mut edges = Mat::default();
    canny_def(&img_blur, &mut edges, config.canny_low, config.canny_high)?;

    let mask = roi_mask(edges.size()?, &config.roi_polygon)?;
    let mut masked_edges = Mat::default();
    bitwise_and_def(&edges, &mask, &mut masked_edges)?;

    Ok(masked_edges)
}

fn roi_mask(size: Size, polygon: &[[f64; 2]]) -> anyhow::Result<Mat> {
    let mut mask = Mat::new_size_with_default(size, CV_8UC1, Scalar::all(0.0))?;
    let polygons: Vector<Vector<Point>> = Vector::from_iter([roi_points(size, polygon)]);
    fill_poly_def(&mut mask, &polygons, Scalar::all(255.0))?;

    Ok(mask)
}

#[cfg(test)]
mod tests {
    use opencv::{
        core::{Rect, CV_32FC1},
        imgproc::{line, rectangle, LINE_8},
    };

    use super::*;
    use crate::utils::mat_to_dmatrix;

    fn road_frame() -> Mat {
        let mut frame = Mat::new_rows_cols_with_default(300, 400, CV_8UC3, Scalar::all(60.0)).unwrap();
        // bright block in the sky, outside the region of interest
        rectangle(
            &mut frame,
            Rect::new(10, 10, 90, 50),
            Scalar::all(255.0),
            -1,
            LINE_8,
            0,
        )
        .unwrap();
        // lane marking on the road
        line(&mut frame, Point::new(150, 290), Point::new(190, 200), Scalar::all(255.0), 6, LINE_8, 0).unwrap();
        frame
    }

    #[test]
    fn edge_map_keeps_frame_size() {
        let edges = preprocess_frame(&road_frame(), &PreprocessConfig::default()).unwrap();
        assert_eq!(edges.rows(), 300);
        assert_eq!(edges.cols(), 400);
        assert_eq!(edges.typ(), CV_8UC1);
    }

    #[test]
    fn edges_outside_roi_are_zeroed() {
        let edges = preprocess_frame(&road_frame(), &PreprocessConfig::default()).unwrap();
        let m = mat_to_dmatrix(&edges).unwrap();

        let sky_edges = m.view((0, 0), (120, 150)).iter().filter(|v| **v != 0).count();
        assert_eq!(sky_edges, 0);

        let road_edges = m.view((190, 130), (110, 80)).iter().filter(|v| **v != 0).count();
        assert!(road_edges > 0);
    }

    #[test]
    fn edge_map_is_binary() {
        let edges = preprocess_frame(&road_frame(), &PreprocessConfig::default()).unwrap();
        let m = mat_to_dmatrix(&edges).unwrap();
        assert!(m.iter().all(|v| *v == 0 || *v == 255));
    }

    #[test]
    fn grey_input_is_accepted() {
        let frame = Mat::new_rows_cols_with_default(100, 100, CV_8UC1, Scalar::all(30.0)).unwrap();
        let edges = preprocess_frame(&frame, &PreprocessConfig::default()).unwrap();
        assert_eq!(mat_to_dmatrix(&edges).unwrap().iter().filter(|v| **v != 0).count(), 0);
    }

    #[test]
    fn rejects_float_frames() {
        let frame = Mat::new_rows_cols_with_default(10, 10, CV_32FC1, Scalar::all(0.0)).unwrap();
        assert!(preprocess_frame(&frame, &PreprocessConfig::default()).is_err());
    }
}
