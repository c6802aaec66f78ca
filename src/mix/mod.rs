pub mod classifier;
pub mod config;
pub mod planner;
pub mod sequencer;
pub mod stats;

pub use config::*;
pub use sequencer::{MixOutput, mix};
pub use stats::{MixStats, format_duration_ms};
