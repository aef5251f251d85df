// Hover-craft force model used while fly mode is on. Wheel forces are off entirely.

use crate::domain::ports::RigidBodyPort;
use crate::domain::state::ControlVector;
use crate::domain::systems::vehicle::{Basis, VehicleState};
use crate::domain::tuning::VehicleTuning;
use glam::Vec3;

pub fn enter(tuning: &VehicleTuning, state: &mut VehicleState, body: &mut dyn RigidBodyPort) {
    state.steering_angle = 0.0;
    state.applied_brake_force = 0.0;
    state.yaw_assist_torque = 0.0;
    state.slip_angle_deg = 0.0;
    body.apply_impulse(Vec3::Y * body.mass() * tuning.flight_kick_speed);
}

pub fn apply(
    tuning: &VehicleTuning,
    state: &mut VehicleState,
    body: &mut dyn RigidBodyPort,
    control: &ControlVector,
    dt: f32,
) {
    let basis = Basis::from_rotation(body.rotation());
    let mass = body.mass();
    state.flight_turbo = control.turbo;
    state.steering_angle = 0.0;
    state.applied_brake_force = 0.0;
    state.yaw_assist_torque = 0.0;
    state.yaw_rate = -body.angvel().y;

    // Drag the carried velocity only, so hover lift and gravity still cancel exactly.
    let linear_drag = if control.turbo {
        tuning.flight_turbo_linear_drag
    } else {
        tuning.flight_linear_drag
    };
    body.set_linvel(body.linvel() * (-linear_drag * dt).exp());
    body.set_angvel(body.angvel() * (-tuning.flight_angular_drag * dt).exp());

    let turbo = if control.turbo {
        tuning.flight_turbo_multiplier
    } else {
        1.0
    };
    let thrust = basis.forward * control.throttle * tuning.flight_thrust_force * turbo;

    let mut lift = mass * body.gravity().length() * tuning.flight_lift_factor;
    if body
        .ground_distance()
        .is_some_and(|distance| distance < tuning.flight_takeoff_assist_height)
    {
        lift += tuning.flight_takeoff_assist_force;
    }
    let climb_input = f32::from(u8::from(control.handbrake)) - control.brake;
    let climb = climb_input * tuning.flight_climb_force;
    let strafe = basis.right * control.steer * tuning.flight_strafe_force;

    body.apply_impulse((thrust + Vec3::Y * (lift + climb) + strafe) * dt);

    // Throttle dips the nose, brake raises it; steering banks and yaws into the turn.
    let pitch = (control.brake - control.throttle) * tuning.flight_pitch_torque;
    let yaw = -control.steer * tuning.flight_yaw_torque;
    let roll = control.steer * tuning.flight_roll_torque;
    body.apply_torque_impulse(basis.right * pitch * dt);
    body.apply_torque_impulse(Vec3::Y * yaw * dt);
    body.apply_torque_impulse(basis.forward * roll * dt);

    let level = basis.up.cross(Vec3::Y) * tuning.flight_level_gain;
    body.apply_torque_impulse(level * dt);
}
