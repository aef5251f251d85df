/// Gameplay tuning for run flow around the race session.
///
/// Countdown and go-flash durations are fixed by the session itself; these are the knobs the
/// tick pipeline uses around it.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaceTuning {
    /// Simulation is suppressed for this long after a respawn or restart.
    pub action_freeze_ms: f32,

    /// How long the vehicle must stay stuck upside down before it is recovered.
    pub auto_right_trigger_ms: f32,

    /// Above this speed an upside-down vehicle is still considered in motion.
    pub auto_right_max_speed_kmh: f32,
}

impl Default for RaceTuning {
    fn default() -> Self {
        Self {
            action_freeze_ms: 30.0,
            auto_right_trigger_ms: 1200.0,
            auto_right_max_speed_kmh: 45.0,
        }
    }
}
