pub mod extraction;
pub mod history;
pub mod lane_change;
pub mod line;
pub mod tracker;
