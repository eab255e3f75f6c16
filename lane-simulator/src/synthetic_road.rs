use anyhow::ensure;
use nalgebra::Vector2;
use opencv::{
    core::{Mat, Point, Scalar, Size, CV_8UC3},
    imgproc::{line, LINE_8},
};
use rand::{rngs::StdRng, Rng, SeedableRng};

const ROAD_GREY: f64 = 70.0;
const MARKING_WHITE: f64 = 255.0;

/// A lane marking as its two endpoints, bottom of the frame first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marking {
    pub bottom: Vector2<i32>,
    pub top: Vector2<i32>,
}

impl Marking {
    fn shifted(&self, dx: i32) -> Self {
        let offset = Vector2::new(dx, 0);
        Self {
            bottom: self.bottom + offset,
            top: self.top + offset,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoadSettings {
    pub frame_size: Size,
    pub left: Marking,
    pub right: Marking,
    pub marking_thickness: i32,
    /// Max random horizontal offset per endpoint and frame, in pixels
    pub jitter: i32,
    /// Frame index where both markings jump sideways
    pub shift_at: u64,
    /// Horizontal jump in pixels, positive moves the markings right
    pub shift: i32,
    pub seed: u64,
}

impl Default for RoadSettings {
    fn default() -> Self {
        Self {
            frame_size: Size::new(1280, 720),
            left: Marking {
                bottom: Vector2::new(420, 720),
                top: Vector2::new(600, 383),
            },
            right: Marking {
                bottom: Vector2::new(860, 720),
                top: Vector2::new(680, 383),
            },
            marking_thickness: 8,
            jitter: 3,
            shift_at: 150,
            shift: 250,
            seed: 42,
        }
    }
}

/// Produces road frames one at a time. The same settings always give the
/// same clip.
pub struct SyntheticRoad {
    settings: RoadSettings,
    rng: StdRng,
    frame_index: u64,
}

impl SyntheticRoad {
    pub fn new(settings: RoadSettings) -> anyhow::Result<Self> {
        ensure!(
            settings.frame_size.width > 0 && settings.frame_size.height > 0,
            "Frame size must be positive"
        );
        ensure!(settings.jitter >= 0, "Jitter can't be negative");
        ensure!(settings.marking_thickness > 0, "Marking thickness must be positive");

        let rng = StdRng::seed_from_u64(settings.seed);
        Ok(Self {
            settings,
            rng,
            frame_index: 0,
        })
    }

    pub fn settings(&self) -> &RoadSettings {
        &self.settings
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Markings as drawn for the current frame, before jitter.
    pub fn markings(&self) -> (Marking, Marking) {
        let dx = if self.frame_index >= self.settings.shift_at {
            self.settings.shift
        } else {
            0
        };
        (self.settings.left.shifted(dx), self.settings.right.shifted(dx))
    }

    pub fn next_frame(&mut self) -> anyhow::Result<Mat> {
        let mut frame = Mat::new_size_with_default(self.settings.frame_size, CV_8UC3, Scalar::all(ROAD_GREY))?;

        let (left, right) = self.markings();
        for marking in [left, right] {
            let bottom = self.jittered(marking.bottom);
            let top = self.jittered(marking.top);
            line(
                &mut frame,
                bottom,
                top,
                Scalar::all(MARKING_WHITE),
                self.settings.marking_thickness,
                LINE_8,
                0,
            )?;
        }

        self.frame_index += 1;
        Ok(frame)
    }

    fn jittered(&mut self, p: Vector2<i32>) -> Point {
        let j = self.settings.jitter;
        let dx = if j > 0 { self.rng.gen_range(-j..=j) } else { 0 };
        Point::new(p.x + dx, p.y)
    }
}

impl Iterator for SyntheticRoad {
    type Item = anyhow::Result<Mat>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_frame())
    }
}

#[cfg(test)]
mod tests {
    use lane_vision::{LaneConfig, LanePipeline, Side};
    use opencv::{core::Vec3b, prelude::*};

    use super::*;

    const SHIFT_AT: u64 = 30;
    const TOTAL_FRAMES: u64 = 120;

    fn settings() -> RoadSettings {
        RoadSettings {
            shift_at: SHIFT_AT,
            ..RoadSettings::default()
        }
    }

    // Crop band sized for 720p and an ROI covering the whole lower half, so the
    // shifted markings stay visible.
    fn pipeline_config() -> LaneConfig {
        let mut config = LaneConfig::default();
        config.render.horizon_y = 383;
        config.render.frame_bottom_y = 733;
        config.preprocess.roi_polygon = vec![[0.0, 1.0], [0.0, 0.53], [1.0, 0.53], [1.0, 1.0]];
        config
    }

    #[test]
    fn same_seed_same_frames() {
        let mut a = SyntheticRoad::new(settings()).unwrap();
        let mut b = SyntheticRoad::new(settings()).unwrap();
        for _ in 0..5 {
            let fa = a.next_frame().unwrap();
            let fb = b.next_frame().unwrap();
            let diff = opencv::core::norm2_def(&fa, &fb).unwrap();
            assert_eq!(diff, 0.0);
        }
    }

    #[test]
    fn markings_jump_at_shift_frame() {
        let mut road = SyntheticRoad::new(settings()).unwrap();
        let (before, _) = road.markings();
        for _ in 0..SHIFT_AT {
            road.next_frame().unwrap();
        }
        let (after, _) = road.markings();
        assert_eq!(after.bottom.x - before.bottom.x, 250);
        assert_eq!(after.top.y, before.top.y);
    }

    #[test]
    fn frame_has_markings_on_grey_road() {
        let settings = RoadSettings {
            jitter: 0,
            ..settings()
        };
        let mut road = SyntheticRoad::new(settings).unwrap();
        let frame = road.next_frame().unwrap();

        assert_eq!(frame.size().unwrap(), Size::new(1280, 720));
        assert_eq!(*frame.at_2d::<Vec3b>(100, 100).unwrap(), Vec3b::all(70));
        // midpoint of the left marking
        assert_eq!(*frame.at_2d::<Vec3b>(551, 510).unwrap(), Vec3b::all(255));
    }

    #[test]
    fn rejects_negative_jitter() {
        let settings = RoadSettings {
            jitter: -1,
            ..RoadSettings::default()
        };
        assert!(SyntheticRoad::new(settings).is_err());
    }

    #[test]
    fn detects_exactly_one_lane_change_after_shift() {
        let road = SyntheticRoad::new(settings()).unwrap();
        let mut pipeline = LanePipeline::new(pipeline_config()).unwrap();

        let mut labels = Vec::new();
        for frame in road.take(TOTAL_FRAMES as usize) {
            let result = pipeline.process_frame(&frame.unwrap()).unwrap();
            assert!(result.lines.left.is_some() && result.lines.right.is_some());
            labels.push(result.lane_change);
        }

        assert_eq!(pipeline.lane_changes(), 1);

        let (before, after) = labels.split_at(SHIFT_AT as usize);
        assert!(before.iter().all(Option::is_none), "{before:?}");

        let shown = after.iter().filter(|l| l.is_some()).count();
        assert_eq!(shown, 60);
        assert!(after.iter().flatten().all(|side| *side == Side::Right));
        assert_eq!(after[0], Some(Side::Right));
        assert_eq!(*after.last().unwrap(), None);
    }
}
