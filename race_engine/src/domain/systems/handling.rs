// Pure handling math shared by the ground model and diagnostics.

use crate::domain::tuning::VehicleTuning;
use glam::Vec2;

const MIN_FORWARD_LEN: f32 = 1e-4;
const MIN_VELOCITY_LEN: f32 = 1e-3;

/// Wheel-angle rate per unit of steer input, blended from low to high speed.
pub fn steer_rate(tuning: &VehicleTuning, speed_kmh: f32) -> f32 {
    let blend = (speed_kmh / tuning.steer_blend_kmh.max(1.0)).clamp(0.0, 1.0);
    let span = tuning.steer_rate_high_speed - tuning.steer_rate_low_speed;
    tuning.steer_rate_low_speed + span * blend
}

/// Signed angle in degrees between the planar heading and the planar travel direction.
///
/// Positive means the nose points to the right of where the body is going.
pub fn slip_angle_deg(forward_xz: Vec2, velocity_xz: Vec2) -> f32 {
    if forward_xz.length() < MIN_FORWARD_LEN || velocity_xz.length() < MIN_VELOCITY_LEN {
        return 0.0;
    }
    let f = forward_xz.normalize();
    let v = velocity_xz.normalize();
    // Vec2 here is (x, z).
    let cross = f.y * v.x - f.x * v.y;
    let dot = f.dot(v);
    cross.atan2(dot).to_degrees()
}

/// Yaw torque that damps spin and pulls the heading back toward the travel direction.
pub fn yaw_stability_torque(
    tuning: &VehicleTuning,
    yaw_rate: f32,
    slip_deg: f32,
    grounded: bool,
) -> f32 {
    if !grounded {
        return 0.0;
    }
    let yaw_term = (-yaw_rate * tuning.yaw_stability_gain).clamp(
        -tuning.yaw_stability_max_torque,
        tuning.yaw_stability_max_torque,
    );
    let slip_term = (-slip_deg.to_radians() * tuning.slip_assist_gain)
        .clamp(-tuning.slip_assist_max_torque, tuning.slip_assist_max_torque);
    yaw_term + slip_term
}

pub fn apply_boost_impulse(
    current_speed_ms: f32,
    force: f32,
    duration_ms: f32,
    mass_kg: f32,
) -> f32 {
    current_speed_ms + force * (duration_ms / 1000.0) / mass_kg.max(1.0)
}
