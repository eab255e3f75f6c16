use itertools::Itertools;

use crate::config::TrackingConfig;

use super::{history::BoundedHistory, line::{PolarLine, Side, Sides}};

/// Reduces the per-frame Hough candidates to one smoothed line per side, using
/// the previously accepted lines to reject outliers.
pub struct LaneTracker {
    config: TrackingConfig,
    history: Sides<BoundedHistory<PolarLine>>,
}

impl LaneTracker {
    pub fn new(config: TrackingConfig) -> Self {
        let window = config.history_window;
        Self {
            config,
            history: Sides::from_fn(|_| BoundedHistory::new(window)),
        }
    }

    pub fn update(&mut self, candidates: &Sides<Vec<PolarLine>>) -> Sides<Option<PolarLine>> {
        Sides::from_fn(|side| self.update_side(side, &candidates[side]))
    }

    /// Always yields a result for the side; `None` only while nothing has ever
    /// been detected on it (or since the last history reset).
    pub fn update_side(&mut self, side: Side, candidates: &[PolarLine]) -> Option<PolarLine> {
        let history = &mut self.history[side];
        let last_accepted = history.last().copied();

        if candidates.is_empty() {
            let last = last_accepted?;
            log::debug!("No {} candidates, holding last line {last:?}", side.label());
            if self.config.reappend_fallback {
                history.push(last);
            }
            return Some(last);
        }

        let (rho_tol, theta_tol) = (self.config.rho_close_threshold, self.config.theta_close_threshold);
        let selected = match last_accepted {
            Some(last) => {
                let close = candidates
                    .iter()
                    .filter(|c| c.is_close_to(&last, rho_tol, theta_tol))
                    .copied()
                    .collect_vec();
                if close.is_empty() {
                    candidates.to_vec()
                } else {
                    close
                }
            }
            None => candidates.to_vec(),
        };

        let smoothed = PolarLine::mean(&selected)?;
        log::debug!(
            "{} line from {}/{} candidates: rho {:.1}, theta {:.3}",
            side.label(),
            selected.len(),
            candidates.len(),
            smoothed.rho,
            smoothed.theta
        );
        history.push(smoothed);

        Some(smoothed)
    }

    pub fn history(&self, side: Side) -> &BoundedHistory<PolarLine> {
        &self.history[side]
    }

    /// Mean rho over the side's history window, 0 for an empty history.
    pub fn average_rho(&self, side: Side) -> f64 {
        self.history[side].mean_by(|l| l.rho).unwrap_or(0.0)
    }

    pub fn clear_history(&mut self) {
        for side in Side::ALL {
            self.history[side].clear();
        }
    }
}
