// Wheel-driven force model: engine, ramped brakes, side grip, steering yaw and stability assist.

use crate::domain::ports::RigidBodyPort;
use crate::domain::state::ControlVector;
use crate::domain::systems::handling::{slip_angle_deg, steer_rate, yaw_stability_torque};
use crate::domain::systems::vehicle::{Basis, VehicleState};
use crate::domain::tuning::VehicleTuning;
use glam::{Vec2, Vec3};

/// Longitudinal demand derived from pedals and current forward speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveForces {
    pub engine: f32,
    pub target_brake: f32,
    pub reversing: bool,
}

/// Below `reverse_engage_speed_ms` (strictly) the brake pedal turns into reverse drive.
pub fn drive_forces(
    tuning: &VehicleTuning,
    control: &ControlVector,
    forward_speed_ms: f32,
) -> DriveForces {
    let reversing = forward_speed_ms < tuning.reverse_engage_speed_ms;
    let mut engine = control.throttle * tuning.engine_force;
    let mut service = control.brake * tuning.brake_force;
    if reversing {
        engine -= control.brake * tuning.engine_force * tuning.reverse_force_factor;
        service = 0.0;
    }
    let handbrake = if control.handbrake {
        tuning.brake_force * tuning.handbrake_ratio
    } else {
        0.0
    };
    DriveForces {
        engine,
        target_brake: service + handbrake,
        reversing,
    }
}

/// Moves the applied brake force toward `target`, rising slower than it releases.
pub fn ramp_brake(tuning: &VehicleTuning, applied: f32, target: f32, dt: f32) -> f32 {
    if target > applied {
        (applied + tuning.brake_rise_rate * dt).min(target)
    } else {
        (applied - tuning.brake_release_rate * dt).max(target)
    }
}

/// (front, rear) side-grip factors.
pub fn grip_factors(tuning: &VehicleTuning, speed_kmh: f32, handbrake: bool) -> (f32, f32) {
    let blend = (speed_kmh / tuning.steer_blend_kmh.max(1.0)).clamp(0.0, 1.0);
    let front = 1.0 + (0.85 - 1.0) * blend;
    let rear = if handbrake {
        tuning.drift_grip_factor_rear
    } else {
        1.0 + (1.1 - 1.0) * blend
    };
    (front, rear)
}

pub fn apply(
    tuning: &VehicleTuning,
    state: &mut VehicleState,
    body: &mut dyn RigidBodyPort,
    control: &ControlVector,
    dt: f32,
) {
    let basis = Basis::from_rotation(body.rotation());
    let velocity = body.linvel();
    let mass = body.mass();
    let inertia = body.angular_inertia();
    let forward_speed = velocity.dot(basis.forward);
    let speed_kmh = velocity.x.hypot(velocity.z) * 3.6;

    state.signed_speed_ms = forward_speed;
    state.flight_turbo = false;
    state.steering_angle = -control.steer * steer_rate(tuning, speed_kmh);

    let forces = drive_forces(tuning, control, forward_speed);
    state.applied_brake_force =
        ramp_brake(tuning, state.applied_brake_force, forces.target_brake, dt);

    let (front_grip, rear_grip) = grip_factors(tuning, speed_kmh, control.handbrake);

    state.slip_angle_deg = slip_angle_deg(
        Vec2::new(basis.forward.x, basis.forward.z),
        Vec2::new(velocity.x, velocity.z),
    );
    state.yaw_rate = -body.angvel().y;

    if state.grounded {
        body.apply_impulse(basis.forward * forces.engine * dt);

        if forward_speed != 0.0 && state.applied_brake_force > 0.0 {
            // Never brakes past standstill.
            let magnitude = (state.applied_brake_force * dt).min(forward_speed.abs() * mass);
            body.apply_impulse(-basis.forward * forward_speed.signum() * magnitude);
        }

        let lateral_speed = velocity.dot(basis.right);
        let grip = tuning.tire_grip * 0.5 * (front_grip + rear_grip);
        let fraction = (grip * tuning.lateral_grip_rate * dt).clamp(0.0, 1.0);
        body.apply_impulse(-basis.right * lateral_speed * mass * fraction);

        // Bicycle model, in world yaw where positive turns left.
        let target_yaw_rate =
            forward_speed * state.steering_angle.tan() / tuning.wheelbase.max(0.1);
        let current_yaw_rate = body.angvel().y;
        let response = (front_grip * tuning.steer_response * dt).clamp(0.0, 1.0);
        let correction = (target_yaw_rate - current_yaw_rate) * response * inertia;
        body.apply_torque_impulse(Vec3::Y * correction);

        state.yaw_assist_torque =
            yaw_stability_torque(tuning, state.yaw_rate, state.slip_angle_deg, true);
        body.apply_torque_impulse(Vec3::Y * -state.yaw_assist_torque * dt);
    } else {
        state.yaw_assist_torque = 0.0;
        let air_yaw = -control.steer * tuning.air_control_torque * tuning.air_control_factor * dt;
        body.apply_torque_impulse(Vec3::Y * air_yaw);
    }

    let omega = body.angvel();
    let damping = Vec3::from_array(tuning.angular_damping);
    body.apply_torque_impulse(-omega * damping * dt * inertia);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pedal(throttle: f32, brake: f32, handbrake: bool) -> ControlVector {
        ControlVector {
            throttle,
            brake,
            handbrake,
            ..Default::default()
        }
    }

    #[test]
    fn when_forward_speed_is_exactly_reverse_threshold_then_brake_is_a_service_brake() {
        let tuning = VehicleTuning::default();

        let forces = drive_forces(&tuning, &pedal(0.0, 1.0, false), tuning.reverse_engage_speed_ms);

        assert!(!forces.reversing);
        assert_eq!(forces.engine, 0.0);
        assert_eq!(forces.target_brake, tuning.brake_force);
    }

    #[test]
    fn when_forward_speed_is_just_below_threshold_then_brake_drives_backwards() {
        let tuning = VehicleTuning::default();

        let forces = drive_forces(&tuning, &pedal(0.0, 1.0, false), 1.499);

        assert!(forces.reversing);
        assert_eq!(
            forces.engine,
            -tuning.engine_force * tuning.reverse_force_factor
        );
        assert_eq!(forces.target_brake, 0.0);
    }

    #[test]
    fn when_handbrake_is_held_then_it_adds_its_share_of_brake_force() {
        let tuning = VehicleTuning::default();

        let forces = drive_forces(&tuning, &pedal(0.0, 0.0, true), 20.0);

        assert_eq!(forces.target_brake, tuning.brake_force * tuning.handbrake_ratio);
    }

    #[test]
    fn when_brake_ramps_then_release_is_faster_than_rise() {
        let tuning = VehicleTuning::default();
        let dt = 1.0 / 120.0;

        let risen = ramp_brake(&tuning, 0.0, tuning.brake_force, dt);
        let released = ramp_brake(&tuning, tuning.brake_force, 0.0, dt);

        let rise = risen;
        let release = tuning.brake_force - released;
        assert!(rise > 0.0 && rise < tuning.brake_force);
        assert!(release > rise);
    }

    #[test]
    fn when_ramp_would_overshoot_then_it_stops_at_target() {
        let tuning = VehicleTuning::default();

        assert_eq!(ramp_brake(&tuning, 900.0, 1000.0, 1.0), 1000.0);
        assert_eq!(ramp_brake(&tuning, 900.0, 0.0, 1.0), 0.0);
    }

    #[test]
    fn when_handbrake_is_held_then_rear_grip_drops_to_drift_factor() {
        let tuning = VehicleTuning::default();

        let (_, rear) = grip_factors(&tuning, 120.0, true);
        let (front_fast, rear_fast) = grip_factors(&tuning, 400.0, false);

        assert_eq!(rear, tuning.drift_grip_factor_rear);
        assert!((front_fast - 0.85).abs() < 1e-6);
        assert!((rear_fast - 1.1).abs() < 1e-6);
    }
}
