use crate::config::LaneChangeConfig;

use super::{history::BoundedHistory, line::{PolarLine, Side, Sides}, tracker::LaneTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneChangeState {
    Inactive,
    Active { direction: Side, frames_shown: u32 },
}

/// Flags a lane change when both smoothed lines jump away from their rolling
/// average at once, then keeps the label up for a fixed number of frames.
pub struct LaneChangeDetector {
    config: LaneChangeConfig,
    state: LaneChangeState,
    // bottom x of the left segment
    x_history: BoundedHistory<f64>,
    lane_changes: usize,
}

impl LaneChangeDetector {
    pub fn new(config: LaneChangeConfig, history_window: usize) -> Self {
        Self {
            config,
            state: LaneChangeState::Inactive,
            x_history: BoundedHistory::new(history_window),
            lane_changes: 0,
        }
    }

    /// Feeds one frame. Must run after the tracker has been updated with the
    /// same frame. Returns the direction to display on this frame, if any.
    pub fn update(
        &mut self,
        tracker: &mut LaneTracker,
        current: &Sides<Option<PolarLine>>,
        left_bottom_x: Option<f64>,
    ) -> Option<Side> {
        if let Some(x) = left_bottom_x {
            self.x_history.push(x);
        }

        if self.state == LaneChangeState::Inactive {
            if let Some(direction) = self.detect(tracker, current, left_bottom_x) {
                log::info!("Lane change detected, direction: {}", direction.label());
                self.state = LaneChangeState::Active { direction, frames_shown: 0 };
                self.lane_changes += 1;

                // Both trackers start over in the new lane
                tracker.clear_history();
                self.x_history.clear();
            }
        }

        match self.state {
            LaneChangeState::Inactive => None,
            LaneChangeState::Active { direction, frames_shown } => {
                let frames_shown = frames_shown + 1;
                self.state = if frames_shown >= self.config.lane_change_display_frames {
                    log::debug!("Lane change label shown for {frames_shown} frames, clearing");
                    LaneChangeState::Inactive
                } else {
                    LaneChangeState::Active { direction, frames_shown }
                };
                Some(direction)
            }
        }
    }

    fn detect(
        &self,
        tracker: &LaneTracker,
        current: &Sides<Option<PolarLine>>,
        left_bottom_x: Option<f64>,
    ) -> Option<Side> {
        let threshold = self.config.lane_change_rho_threshold;

        let jumped = Side::ALL.iter().all(|&side| match current[side] {
            Some(line) if !tracker.history(side).is_empty() => {
                let diff = (line.rho - tracker.average_rho(side)).abs();
                log::trace!("{} rho diff {diff:.1}", side.label());
                diff > threshold
            }
            _ => false,
        });
        if !jumped {
            return None;
        }

        let direction = match (left_bottom_x, self.x_history.mean()) {
            (Some(x), Some(avg_x)) if x < avg_x => Side::Left,
            _ => Side::Right,
        };
        Some(direction)
    }

    pub fn state(&self) -> LaneChangeState {
        self.state
    }

    pub fn lane_changes(&self) -> usize {
        self.lane_changes
    }

    pub fn x_history(&self) -> &BoundedHistory<f64> {
        &self.x_history
    }
}
