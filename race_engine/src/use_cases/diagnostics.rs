// Debug and regression hooks, injected as a port instead of living in globals.

use crate::domain::errors::TraceError;
use crate::domain::ports::RigidBodyPort;
use crate::domain::state::DebugSnapshot;
use crate::domain::systems::vehicle::Basis;
use crate::use_cases::simulation::Simulation;
use crate::use_cases::trace::{InputTrace, ReplayOptions, ReplayResult, ReplayStatus};

pub trait DiagnosticsPort {
    fn debug_snapshot(&self) -> DebugSnapshot;

    /// Places the vehicle at a checkpoint (`-1` for the spawn) with an optional planar speed.
    fn force_respawn(&mut self, checkpoint_order: i64, initial_speed_kmh: Option<f32>);

    fn start_recording(&mut self, label: &str) -> Result<(), TraceError>;
    fn stop_recording(&mut self) -> InputTrace;

    fn play_trace(&mut self, trace: InputTrace, options: ReplayOptions);
    fn replay_status(&self) -> ReplayStatus;
    fn last_replay_result(&self) -> Option<ReplayResult>;
}

impl<B: RigidBodyPort> DiagnosticsPort for Simulation<B> {
    fn debug_snapshot(&self) -> DebugSnapshot {
        let basis = Basis::from_rotation(self.body.rotation());
        let vehicle = self.vehicle.state();
        let auto_right_countdown_ms = if self.upside_down_ms > 0.0 {
            (self.race_tuning.auto_right_trigger_ms - self.upside_down_ms).max(0.0)
        } else {
            0.0
        };

        DebugSnapshot {
            speed_kmh: self.vehicle.speed_kmh(&self.body),
            phase: self.race.phase(),
            position: self.body.translation(),
            forward: basis.forward,
            up: basis.up,
            checkpoint_order: self.race.state().current_checkpoint_order,
            boost_remaining_ms: vehicle.boost_remaining_ms,
            input_steer: vehicle.input_steer,
            steering_angle: vehicle.steering_angle,
            auto_right_countdown_ms,
            slip_angle_deg: vehicle.slip_angle_deg,
            yaw_rate: vehicle.yaw_rate,
            yaw_assist_torque: vehicle.yaw_assist_torque,
            fly_mode: vehicle.fly_mode,
            flight_turbo: vehicle.flight_turbo,
            grounded: vehicle.grounded,
        }
    }

    fn force_respawn(&mut self, checkpoint_order: i64, initial_speed_kmh: Option<f32>) {
        self.stage_at(checkpoint_order, initial_speed_kmh);
    }

    fn start_recording(&mut self, label: &str) -> Result<(), TraceError> {
        Simulation::start_recording(self, label)
    }

    fn stop_recording(&mut self) -> InputTrace {
        Simulation::stop_recording(self)
    }

    fn play_trace(&mut self, trace: InputTrace, options: ReplayOptions) {
        Simulation::play_trace(self, trace, options);
    }

    fn replay_status(&self) -> ReplayStatus {
        Simulation::replay_status(self)
    }

    fn last_replay_result(&self) -> Option<ReplayResult> {
        Simulation::last_replay_result(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RacePhase;
    use crate::use_cases::test_support::sprint_track;
    use crate::use_cases::trace::TraceMode;

    fn port() -> Box<dyn DiagnosticsPort> {
        Box::new(Simulation::arcade(sprint_track(), None, 1.0 / 120.0))
    }

    #[test]
    fn when_fresh_then_snapshot_shows_vehicle_idle_at_spawn() {
        let port = port();

        let snapshot = port.debug_snapshot();

        assert_eq!(snapshot.phase, RacePhase::Idle);
        assert_eq!(snapshot.speed_kmh, 0.0);
        assert!(snapshot.grounded);
        assert!((snapshot.forward.z - 1.0).abs() < 1e-6);
        assert!((snapshot.up.y - 1.0).abs() < 1e-6);
        assert_eq!(snapshot.auto_right_countdown_ms, 0.0);
    }

    #[test]
    fn when_forcing_a_respawn_with_speed_then_vehicle_is_staged_at_the_checkpoint() {
        let mut port = port();

        port.force_respawn(1, Some(90.0));

        let snapshot = port.debug_snapshot();
        assert!((snapshot.speed_kmh - 90.0).abs() < 1e-3);
        assert!(snapshot.position.y > 2.8);
    }

    #[test]
    fn when_recording_through_the_port_then_status_reports_recording() {
        let mut port = port();

        port.start_recording("hud").expect("idle deck");

        assert_eq!(port.replay_status().state, TraceMode::Recording);
        assert!(port.stop_recording().frames.is_empty());
        assert_eq!(port.replay_status().state, TraceMode::Idle);
        assert_eq!(port.last_replay_result(), None);
    }
}
