// Player vehicle controller: owns the handling state and drives the body through the physics port.

use crate::domain::ports::RigidBodyPort;
use crate::domain::state::{ControlVector, RespawnPose, VehicleTelemetry};
use crate::domain::systems::{flight, ground};
use crate::domain::tuning::VehicleTuning;
use glam::{Quat, Vec3};
use tracing::debug;

/// Chassis up-vector Y below which the vehicle counts as upside down.
pub const UPSIDE_DOWN_UP_Y: f32 = 0.1;

/// Force model used for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
    Ground,
    Flight,
}

/// Transient handling state. Pose and velocities live in the physics body.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VehicleState {
    pub input_steer: f32,
    /// Front wheel angle in radians, positive turns left.
    pub steering_angle: f32,
    pub applied_brake_force: f32,
    pub boost_force: f32,
    pub boost_remaining_ms: f32,
    pub fly_mode: bool,
    pub flight_turbo: bool,
    pub grounded: bool,
    /// Speed along the chassis forward axis, negative when reversing.
    pub signed_speed_ms: f32,
    pub slip_angle_deg: f32,
    /// Yaw rate in rad/s, positive while turning right.
    pub yaw_rate: f32,
    pub yaw_assist_torque: f32,
}

impl VehicleState {
    fn clear_transients(&mut self) {
        *self = Self {
            fly_mode: self.fly_mode,
            flight_turbo: self.flight_turbo,
            ..Self::default()
        };
    }
}

/// Chassis basis derived from the body rotation. Forward is +Z, up is +Y, right is -X.
#[derive(Debug, Clone, Copy)]
pub struct Basis {
    pub forward: Vec3,
    pub up: Vec3,
    pub right: Vec3,
}

impl Basis {
    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            forward: rotation * Vec3::Z,
            up: rotation * Vec3::Y,
            right: rotation * Vec3::NEG_X,
        }
    }

    pub fn planar_forward(&self) -> Vec3 {
        Vec3::new(self.forward.x, 0.0, self.forward.z).normalize_or_zero()
    }
}

pub fn horizontal_speed_ms(body: &dyn RigidBodyPort) -> f32 {
    let v = body.linvel();
    v.x.hypot(v.z)
}

pub struct VehicleController {
    tuning: VehicleTuning,
    state: VehicleState,
}

impl VehicleController {
    pub fn new(tuning: VehicleTuning) -> Self {
        Self {
            tuning,
            state: VehicleState::default(),
        }
    }

    pub fn tuning(&self) -> &VehicleTuning {
        &self.tuning
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    pub fn mode(&self) -> DriveMode {
        if self.state.fly_mode {
            DriveMode::Flight
        } else {
            DriveMode::Ground
        }
    }

    /// Applies this tick's forces. Must be followed by the body step and then [`Self::post_step`].
    pub fn pre_step(&mut self, body: &mut dyn RigidBodyPort, control: &ControlVector, dt: f32) {
        let control = control.clamped();
        self.state.input_steer = control.steer;
        self.state.grounded = body.wheel_contacts().iter().any(|c| *c);

        match self.mode() {
            DriveMode::Ground => ground::apply(&self.tuning, &mut self.state, body, &control, dt),
            DriveMode::Flight => flight::apply(&self.tuning, &mut self.state, body, &control, dt),
        }

        if self.state.boost_remaining_ms > 0.0 {
            let forward = Basis::from_rotation(body.rotation()).planar_forward();
            body.apply_impulse(forward * self.state.boost_force * dt);
        }
    }

    pub fn post_step(&mut self, body: &mut dyn RigidBodyPort, dt: f32) {
        self.state.grounded = body.wheel_contacts().iter().any(|c| *c);

        let velocity = body.linvel();
        let horizontal = velocity.x.hypot(velocity.z);
        let mut max_speed = self.tuning.max_speed_ms();
        if self.state.fly_mode && self.state.flight_turbo {
            max_speed *= self.tuning.turbo_max_speed_multiplier;
        }
        if horizontal > max_speed {
            let scale = max_speed / horizontal;
            body.set_linvel(Vec3::new(velocity.x * scale, velocity.y, velocity.z * scale));
        }

        let forward = Basis::from_rotation(body.rotation()).forward;
        self.state.signed_speed_ms = body.linvel().dot(forward);

        if self.state.boost_remaining_ms > 0.0 {
            self.state.boost_remaining_ms = (self.state.boost_remaining_ms - dt * 1000.0).max(0.0);
            if self.state.boost_remaining_ms == 0.0 {
                self.state.boost_force = 0.0;
            }
        }
    }

    /// Re-triggering while a boost is active keeps the stronger force and the longer duration.
    pub fn activate_boost(&mut self, force: f32, duration_ms: f32) {
        self.state.boost_force = self.state.boost_force.max(force);
        self.state.boost_remaining_ms = self.state.boost_remaining_ms.max(duration_ms);
        debug!(
            boost_force = self.state.boost_force,
            boost_remaining_ms = self.state.boost_remaining_ms,
            "boost activated"
        );
    }

    /// Teleports to `pose` with zero velocity. Mode flags survive.
    pub fn respawn(&mut self, body: &mut dyn RigidBodyPort, pose: RespawnPose) {
        body.set_translation(pose.position);
        body.set_rotation(Quat::from_rotation_y(pose.yaw));
        body.set_linvel(Vec3::ZERO);
        body.set_angvel(Vec3::ZERO);
        self.state.clear_transients();
        self.state.grounded = body.wheel_contacts().iter().any(|c| *c);
    }

    /// Gives the body a planar speed along its heading, used for staged diagnostics respawns.
    pub fn launch(&mut self, body: &mut dyn RigidBodyPort, speed_kmh: f32) {
        if !speed_kmh.is_finite() {
            return;
        }
        let forward = Basis::from_rotation(body.rotation()).planar_forward();
        let velocity = forward * (speed_kmh / 3.6);
        body.set_linvel(Vec3::new(velocity.x, body.linvel().y, velocity.z));
        self.state.signed_speed_ms = speed_kmh / 3.6;
    }

    pub fn set_fly_mode(&mut self, body: &mut dyn RigidBodyPort, enabled: bool) {
        if self.state.fly_mode == enabled {
            return;
        }
        self.state.fly_mode = enabled;
        if enabled {
            flight::enter(&self.tuning, &mut self.state, body);
        } else {
            self.state.flight_turbo = false;
        }
    }

    pub fn toggle_fly_mode(&mut self, body: &mut dyn RigidBodyPort) -> bool {
        let enabled = !self.state.fly_mode;
        self.set_fly_mode(body, enabled);
        enabled
    }

    pub fn is_upside_down(&self, body: &dyn RigidBodyPort) -> bool {
        Basis::from_rotation(body.rotation()).up.y < UPSIDE_DOWN_UP_Y
    }

    pub fn speed_kmh(&self, body: &dyn RigidBodyPort) -> f32 {
        horizontal_speed_ms(body) * 3.6
    }

    pub fn telemetry(&self, body: &dyn RigidBodyPort) -> VehicleTelemetry {
        VehicleTelemetry {
            speed_kmh: self.speed_kmh(body),
            grounded: self.state.grounded,
            boost_remaining_ms: self.state.boost_remaining_ms,
            fly_mode: self.state.fly_mode,
            flight_turbo: self.state.flight_turbo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::physics::ArcadeBody;

    const DT: f32 = 1.0 / 120.0;

    fn spawn() -> RespawnPose {
        RespawnPose {
            position: Vec3::new(0.0, 0.83, 0.0),
            yaw: 0.0,
        }
    }

    fn rig() -> (VehicleController, ArcadeBody) {
        let tuning = VehicleTuning::default();
        (VehicleController::new(tuning), ArcadeBody::from_tuning(&tuning, spawn()))
    }

    fn drive(
        vehicle: &mut VehicleController,
        body: &mut ArcadeBody,
        control: ControlVector,
        ticks: usize,
    ) {
        for _ in 0..ticks {
            vehicle.pre_step(body, &control, DT);
            body.step(DT);
            vehicle.post_step(body, DT);
        }
    }

    #[test]
    fn when_boost_is_retriggered_weaker_then_force_and_remaining_never_drop() {
        let (mut vehicle, _) = rig();
        vehicle.activate_boost(32_000.0, 900.0);

        vehicle.activate_boost(10_000.0, 300.0);

        assert_eq!(vehicle.state().boost_force, 32_000.0);
        assert_eq!(vehicle.state().boost_remaining_ms, 900.0);

        vehicle.activate_boost(40_000.0, 500.0);
        assert_eq!(vehicle.state().boost_force, 40_000.0);
        assert_eq!(vehicle.state().boost_remaining_ms, 900.0);
    }

    #[test]
    fn when_throttle_is_held_then_vehicle_moves_forward_along_z() {
        let (mut vehicle, mut body) = rig();

        drive(
            &mut vehicle,
            &mut body,
            ControlVector {
                throttle: 1.0,
                ..Default::default()
            },
            240,
        );

        assert!(body.translation().z > 5.0);
        assert!(body.translation().x.abs() < 1e-3);
        assert!(vehicle.state().signed_speed_ms > 10.0);
        assert!(vehicle.state().grounded);
    }

    #[test]
    fn when_steering_right_then_heading_turns_toward_negative_x() {
        let (mut vehicle, mut body) = rig();
        drive(
            &mut vehicle,
            &mut body,
            ControlVector {
                throttle: 1.0,
                ..Default::default()
            },
            120,
        );

        drive(
            &mut vehicle,
            &mut body,
            ControlVector {
                throttle: 0.6,
                steer: 1.0,
                ..Default::default()
            },
            60,
        );

        let forward = Basis::from_rotation(body.rotation()).forward;
        assert!(forward.x < -0.05, "forward was {forward:?}");
        assert!(vehicle.state().steering_angle < 0.0);
        assert!(vehicle.state().yaw_rate > 0.0);
    }

    #[test]
    fn when_boost_runs_out_then_force_is_cleared() {
        let (mut vehicle, mut body) = rig();
        vehicle.activate_boost(20_000.0, 50.0);

        drive(&mut vehicle, &mut body, ControlVector::default(), 12);

        assert_eq!(vehicle.state().boost_remaining_ms, 0.0);
        assert_eq!(vehicle.state().boost_force, 0.0);
        assert!(body.linvel().z > 0.0);
    }

    #[test]
    fn when_speed_exceeds_max_then_post_step_clamps_horizontal_speed() {
        let (mut vehicle, mut body) = rig();
        body.set_linvel(Vec3::new(0.0, 0.0, 200.0));

        vehicle.post_step(&mut body, DT);

        assert!((vehicle.speed_kmh(&body) - 315.0).abs() < 0.01);
    }

    #[test]
    fn when_respawned_then_velocities_and_transients_reset_but_fly_mode_survives() {
        let (mut vehicle, mut body) = rig();
        vehicle.set_fly_mode(&mut body, true);
        vehicle.activate_boost(20_000.0, 1_000.0);
        drive(
            &mut vehicle,
            &mut body,
            ControlVector {
                throttle: 1.0,
                steer: 0.5,
                ..Default::default()
            },
            30,
        );

        let pose = RespawnPose {
            position: Vec3::new(5.0, 2.93, 40.0),
            yaw: 1.2,
        };
        vehicle.respawn(&mut body, pose);

        assert_eq!(body.translation(), pose.position);
        assert_eq!(body.linvel(), Vec3::ZERO);
        assert_eq!(body.angvel(), Vec3::ZERO);
        assert_eq!(vehicle.state().boost_remaining_ms, 0.0);
        assert_eq!(vehicle.state().steering_angle, 0.0);
        assert!(vehicle.state().fly_mode);
    }

    #[test]
    fn when_entering_flight_then_body_gets_an_upward_kick() {
        let (mut vehicle, mut body) = rig();

        vehicle.set_fly_mode(&mut body, true);

        assert_eq!(vehicle.mode(), DriveMode::Flight);
        assert!((body.linvel().y - vehicle.tuning().flight_kick_speed).abs() < 1e-4);
    }

    #[test]
    fn when_climbing_in_flight_then_vehicle_gains_height() {
        let (mut vehicle, mut body) = rig();
        vehicle.toggle_fly_mode(&mut body);

        drive(
            &mut vehicle,
            &mut body,
            ControlVector {
                handbrake: true,
                ..Default::default()
            },
            240,
        );

        assert!(body.translation().y > 5.0, "y was {}", body.translation().y);
        assert!(!vehicle.state().grounded);
    }

    #[test]
    fn when_chassis_is_rolled_over_then_it_is_upside_down() {
        let (vehicle, mut body) = rig();
        assert!(!vehicle.is_upside_down(&body));

        body.set_rotation(Quat::from_rotation_z(std::f32::consts::PI));

        assert!(vehicle.is_upside_down(&body));
    }
}
