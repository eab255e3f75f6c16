mod config;
mod lanes;
mod preprocess;
mod render;
mod utils;

use opencv::core::Mat;
use rayon::prelude::*;

pub use config::{
    ExtractionConfig, LaneChangeConfig, LaneConfig, PipelineConfig, PreprocessConfig, RenderConfig, TrackingConfig,
};
pub use lanes::{
    extraction::extract_candidates,
    history::BoundedHistory,
    lane_change::{LaneChangeDetector, LaneChangeState},
    line::{PolarLine, Segment, Side, Sides},
    tracker::LaneTracker,
};
pub use preprocess::preprocess_frame;
pub use render::{lane_segments, render_lanes};

pub struct FrameResult {
    pub frame: Mat,
    pub lines: Sides<Option<PolarLine>>,
    pub segments: Sides<Option<Segment>>,
    /// Lane change label shown on this frame
    pub lane_change: Option<Side>,
}

/// Owns all cross-frame state. Frames must be fed in arrival order.
pub struct LanePipeline {
    config: LaneConfig,
    tracker: LaneTracker,
    lane_change: LaneChangeDetector,
    frames_processed: u64,
}

impl LanePipeline {
    pub fn new(config: LaneConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let tracker = LaneTracker::new(config.tracking.clone());
        let lane_change = LaneChangeDetector::new(config.lane_change.clone(), config.tracking.history_window);

        Ok(Self {
            config,
            tracker,
            lane_change,
            frames_processed: 0,
        })
    }

    pub fn process_frame(&mut self, frame: &Mat) -> anyhow::Result<FrameResult> {
        let candidates = detect_candidates(frame, &self.config)?;
        self.track_and_render(frame, &candidates)
    }

    /// Edge and line detection run in parallel across the batch, tracking and
    /// rendering stay sequential in the original order.
    pub fn process_batch(&mut self, frames: Vec<Mat>) -> anyhow::Result<Vec<FrameResult>> {
        let detected = frames
            .into_par_iter()
            .map(|frame| {
                let candidates = detect_candidates(&frame, &self.config)?;
                Ok((frame, candidates))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        detected
            .into_iter()
            .map(|(frame, candidates)| self.track_and_render(&frame, &candidates))
            .collect()
    }

    fn track_and_render(&mut self, frame: &Mat, candidates: &Sides<Vec<PolarLine>>) -> anyhow::Result<FrameResult> {
        let lines = self.tracker.update(candidates);
        let segments = lane_segments(&lines, &self.config.render);

        let left_bottom_x = segments.left.map(|s| s.bottom.x as f64);
        let lane_change = self.lane_change.update(&mut self.tracker, &lines, left_bottom_x);

        let output = render_lanes(frame, &segments, lane_change, &self.config.render)?;
        self.frames_processed += 1;

        log::debug!(
            "Frame {}: {} left / {} right candidates, lines {:?}",
            self.frames_processed,
            candidates.left.len(),
            candidates.right.len(),
            lines
        );

        Ok(FrameResult {
            frame: output,
            lines,
            segments,
            lane_change,
        })
    }

    pub fn config(&self) -> &LaneConfig {
        &self.config
    }

    pub fn tracker(&self) -> &LaneTracker {
        &self.tracker
    }

    pub fn lane_change_state(&self) -> LaneChangeState {
        self.lane_change.state()
    }

    pub fn lane_changes(&self) -> usize {
        self.lane_change.lane_changes()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }
}

fn detect_candidates(frame: &Mat, config: &LaneConfig) -> anyhow::Result<Sides<Vec<PolarLine>>> {
    let edges = preprocess_frame(frame, &config.preprocess)?;
    extract_candidates(&edges, &config.extraction)
}
