use crate::domain::systems::scheduler::DEFAULT_FIXED_STEP;
use std::{env, path::PathBuf, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("RACE_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

pub fn track_path() -> PathBuf {
    env::var("TRACK_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("assets/tracks/sprint.toml"))
}

pub fn best_times_path() -> PathBuf {
    env::var("BEST_TIMES_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data/best_times.json"))
}

/// Simulation step in seconds. `FIXED_STEP_HZ` overrides the 120 Hz default.
pub fn fixed_step() -> f32 {
    env::var("FIXED_STEP_HZ")
        .ok()
        .and_then(|v| v.parse::<f32>().ok())
        .filter(|hz| hz.is_finite() && *hz > 0.0)
        .map(|hz| 1.0 / hz)
        .unwrap_or(DEFAULT_FIXED_STEP)
}

pub const COMMAND_CHANNEL_CAPACITY: usize = 1024;
pub const FRAME_BROADCAST_CAPACITY: usize = 128;

pub const FRAME_INTERVAL: Duration = Duration::from_millis(1000 / 60);
