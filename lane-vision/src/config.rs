use std::{f64::consts::PI, fs, path::Path};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

// Defaults are tuned for a single dashcam mounting recording at 3840x2160.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneConfig {
    pub preprocess: PreprocessConfig,
    pub extraction: ExtractionConfig,
    pub tracking: TrackingConfig,
    pub lane_change: LaneChangeConfig,
    pub render: RenderConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub contrast_alpha: f64,
    pub contrast_beta: f64,
    pub blur_kernel: i32,
    pub canny_low: f64,
    pub canny_high: f64,
    /// Region of interest as fractions of frame width and height
    pub roi_polygon: Vec<[f64; 2]>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            contrast_alpha: 1.5,
            contrast_beta: 10.0,
            blur_kernel: 5,
            canny_low: 50.0,
            canny_high: 100.0,
            roi_polygon: vec![[0.0, 1.0], [0.4, 0.53], [0.6, 0.53], [1.0, 1.0]],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub rho_resolution: f64,
    pub theta_resolution_deg: f64,
    pub vote_threshold: i32,
    pub left_angle_max: f64,
    pub right_angle_min: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            rho_resolution: 1.0,
            theta_resolution_deg: 1.0,
            vote_threshold: 100,
            left_angle_max: 7.0 * PI / 18.0,
            right_angle_min: 11.0 * PI / 18.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub history_window: usize,
    pub rho_close_threshold: f64,
    pub theta_close_threshold: f64,
    /// Push the held-over line back into history on frames with no candidates
    pub reappend_fallback: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            history_window: 60,
            rho_close_threshold: 50.0,
            theta_close_threshold: 0.1,
            reappend_fallback: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneChangeConfig {
    pub lane_change_rho_threshold: f64,
    pub lane_change_display_frames: u32,
}

impl Default for LaneChangeConfig {
    fn default() -> Self {
        Self {
            lane_change_rho_threshold: 170.0,
            lane_change_display_frames: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub horizon_y: i32,
    pub frame_bottom_y: i32,
    pub segment_extension: f64,
    // Colours are BGR
    pub line_color: [f64; 3],
    pub line_thickness: i32,
    pub fill_color: [f64; 3],
    pub frame_weight: f64,
    pub overlay_weight: f64,
    pub label_origin: [i32; 2],
    pub label_scale: f64,
    pub label_color: [f64; 3],
    pub label_thickness: i32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            horizon_y: 1150,
            frame_bottom_y: 2200,
            segment_extension: 4000.0,
            line_color: [0.0, 0.0, 255.0],
            line_thickness: 20,
            fill_color: [0.0, 255.0, 0.0],
            frame_weight: 0.8,
            overlay_weight: 0.4,
            label_origin: [100, 200],
            label_scale: 4.0,
            label_color: [255.0, 255.0, 255.0],
            label_thickness: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Frames preprocessed in parallel before being tracked in order
    pub batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { batch_size: 1 }
    }
}

impl LaneConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> anyhow::Result<Self> {
        let config: LaneConfig = serde_yaml::from_str(contents)?;
        config.validate()?;

        Ok(config)
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let p = &self.preprocess;
        if p.roi_polygon.len() < 3 {
            bail!("roi_polygon needs at least 3 vertices, got {}", p.roi_polygon.len());
        }
        if p.roi_polygon.iter().flatten().any(|v| !(0.0..=1.0).contains(v)) {
            bail!("roi_polygon vertices must be fractions in [0, 1]");
        }
        if p.blur_kernel <= 0 || p.blur_kernel % 2 == 0 {
            bail!("blur_kernel must be a positive odd number, got {}", p.blur_kernel);
        }
        if p.canny_low > p.canny_high {
            bail!("canny_low ({}) is above canny_high ({})", p.canny_low, p.canny_high);
        }

        let e = &self.extraction;
        if e.rho_resolution <= 0.0 || e.theta_resolution_deg <= 0.0 {
            bail!("Hough resolutions must be positive");
        }
        if e.left_angle_max >= e.right_angle_min {
            bail!(
                "left_angle_max ({}) must be below right_angle_min ({})",
                e.left_angle_max,
                e.right_angle_min
            );
        }
        if e.left_angle_max < 0.0 || e.right_angle_min > PI {
            bail!("Angle limits must lie within [0, pi]");
        }

        if self.tracking.history_window == 0 {
            bail!("history_window must be at least 1");
        }
        if self.lane_change.lane_change_display_frames == 0 {
            bail!("lane_change_display_frames must be at least 1");
        }

        let r = &self.render;
        if r.horizon_y >= r.frame_bottom_y {
            bail!("horizon_y ({}) must be above frame_bottom_y ({})", r.horizon_y, r.frame_bottom_y);
        }
        if r.segment_extension <= 0.0 {
            bail!("segment_extension must be positive");
        }

        if self.pipeline.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = LaneConfig::default();
        config.validate().unwrap();
        assert_eq!(config.tracking.history_window, 60);
        assert_eq!(config.render.horizon_y, 1150);
        assert_eq!(config.extraction.vote_threshold, 100);
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let config = LaneConfig::from_yaml(
            "tracking:\n  history_window: 30\nrender:\n  horizon_y: 400\n  frame_bottom_y: 733\n",
        )
        .unwrap();
        assert_eq!(config.tracking.history_window, 30);
        assert_eq!(config.tracking.rho_close_threshold, 50.0);
        assert_eq!(config.render.horizon_y, 400);
        assert_eq!(config.preprocess, PreprocessConfig::default());
    }

    #[test]
    fn yaml_round_trip() {
        let config = LaneConfig::default();
        let parsed = LaneConfig::from_yaml(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn rejects_inverted_crop_band() {
        let mut config = LaneConfig::default();
        config.render.horizon_y = 2500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_degenerate_roi_and_window() {
        let mut config = LaneConfig::default();
        config.preprocess.roi_polygon = vec![[0.0, 1.0], [1.0, 1.0]];
        assert!(config.validate().is_err());

        let mut config = LaneConfig::default();
        config.tracking.history_window = 0;
        assert!(config.validate().is_err());

        let mut config = LaneConfig::default();
        config.preprocess.blur_kernel = 4;
        assert!(config.validate().is_err());
    }
}
