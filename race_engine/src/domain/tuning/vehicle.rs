/// Gameplay tuning for the player vehicle.
///
/// Loaded once when the vehicle is created and never mutated afterwards. Forces are in
/// newtons, torques in the arcade units of the physics port (impulse divided by the body's
/// angular inertia), speeds in the unit named by the field.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleTuning {
    /// Chassis mass in kilograms.
    pub mass_kg: f32,

    /// Top horizontal speed in km/h on the ground and in regular flight.
    pub max_speed_kmh: f32,

    /// Engine force summed over the driven wheels.
    pub engine_force: f32,

    /// Service brake force at full pedal.
    pub brake_force: f32,

    /// Share of `brake_force` the handbrake adds on top of the service brake.
    pub handbrake_ratio: f32,

    /// How fast the applied brake force may climb toward its target (N/s).
    pub brake_rise_rate: f32,

    /// How fast the applied brake force may drop toward its target (N/s).
    /// Must stay above `brake_rise_rate`.
    pub brake_release_rate: f32,

    /// Below this forward speed (m/s) the brake pedal drives the car backwards.
    pub reverse_engage_speed_ms: f32,

    /// Share of `engine_force` available in reverse.
    pub reverse_force_factor: f32,

    /// Steering rate (rad of wheel angle per unit steer) when stationary.
    pub steer_rate_low_speed: f32,

    /// Steering rate at and above `steer_blend_kmh`.
    pub steer_rate_high_speed: f32,

    /// Speed at which steering has fully blended to the high-speed rate.
    pub steer_blend_kmh: f32,

    /// Axle distance used by the steering yaw response.
    pub wheelbase: f32,

    /// How quickly the chassis yaw rate follows the steering target (1/s).
    pub steer_response: f32,

    /// Suspension rest length in meters.
    pub suspension_rest: f32,

    /// How stiffly a grounded chassis settles back onto its wheels (1/s).
    pub suspension_spring: f32,

    /// Pitch/roll velocity damping while the wheels touch the ground (1/s).
    pub suspension_damper: f32,

    /// Lateral tire grip coefficient.
    pub tire_grip: f32,

    /// Lateral velocity removal rate per unit of grip (1/s).
    pub lateral_grip_rate: f32,

    /// Rear side-grip factor while the handbrake is held.
    pub drift_grip_factor_rear: f32,

    /// Yaw torque available from steering input while airborne.
    pub air_control_torque: f32,

    /// Scales `air_control_torque`.
    pub air_control_factor: f32,

    /// Gain of the yaw-rate damping term of the stability assist.
    pub yaw_stability_gain: f32,

    /// Cap of the yaw-rate damping term.
    pub yaw_stability_max_torque: f32,

    /// Gain of the slip-angle correction term of the stability assist.
    pub slip_assist_gain: f32,

    /// Cap of the slip-angle correction term.
    pub slip_assist_max_torque: f32,

    /// Always-on angular velocity damping per axis (1/s).
    pub angular_damping: [f32; 3],

    /// Forward thrust at full throttle in flight.
    pub flight_thrust_force: f32,

    /// Thrust multiplier while turbo is held in flight.
    pub flight_turbo_multiplier: f32,

    /// Share of gravity countered by hover lift.
    pub flight_lift_factor: f32,

    /// Extra lift applied close to the ground so the craft can take off.
    pub flight_takeoff_assist_force: f32,

    /// Ground distance (m) under which the takeoff assist is active.
    pub flight_takeoff_assist_height: f32,

    /// Vertical force from the climb (handbrake) and descend (brake) inputs.
    pub flight_climb_force: f32,

    /// Lateral force from steering in flight.
    pub flight_strafe_force: f32,

    pub flight_pitch_torque: f32,
    pub flight_yaw_torque: f32,
    pub flight_roll_torque: f32,

    /// Torque pulling the craft back toward level attitude.
    pub flight_level_gain: f32,

    /// Exponential linear drag in flight (1/s).
    pub flight_linear_drag: f32,

    /// Exponential linear drag while turbo is held (1/s).
    pub flight_turbo_linear_drag: f32,

    /// Exponential angular drag in flight (1/s).
    pub flight_angular_drag: f32,

    /// Upward speed (m/s) given when flight mode is entered.
    pub flight_kick_speed: f32,

    /// Widens the top speed while turbo is active in flight.
    pub turbo_max_speed_multiplier: f32,
}

impl VehicleTuning {
    pub fn max_speed_ms(&self) -> f32 {
        self.max_speed_kmh / 3.6
    }
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            mass_kg: 1200.0,
            max_speed_kmh: 315.0,
            engine_force: 16_800.0,
            brake_force: 14_000.0,
            handbrake_ratio: 0.72,
            brake_rise_rate: 42_000.0,
            brake_release_rate: 120_000.0,
            reverse_engage_speed_ms: 1.5,
            reverse_force_factor: 0.45,
            steer_rate_low_speed: 0.6,
            steer_rate_high_speed: 0.31,
            steer_blend_kmh: 220.0,
            wheelbase: 2.72,
            steer_response: 10.0,
            suspension_rest: 0.35,
            suspension_spring: 42.0,
            suspension_damper: 4.2,
            tire_grip: 3.2,
            lateral_grip_rate: 2.5,
            drift_grip_factor_rear: 0.54,
            air_control_torque: 13.0,
            air_control_factor: 0.6,
            yaw_stability_gain: 2.15,
            yaw_stability_max_torque: 8.5,
            slip_assist_gain: 5.8,
            slip_assist_max_torque: 5.4,
            angular_damping: [0.6, 0.8, 0.6],
            flight_thrust_force: 26_000.0,
            flight_turbo_multiplier: 1.9,
            flight_lift_factor: 1.0,
            flight_takeoff_assist_force: 9_000.0,
            flight_takeoff_assist_height: 2.5,
            flight_climb_force: 18_000.0,
            flight_strafe_force: 9_000.0,
            flight_pitch_torque: 2.0,
            flight_yaw_torque: 6.0,
            flight_roll_torque: 2.5,
            flight_level_gain: 6.0,
            flight_linear_drag: 0.9,
            flight_turbo_linear_drag: 0.55,
            flight_angular_drag: 2.4,
            flight_kick_speed: 7.0,
            turbo_max_speed_multiplier: 1.6,
        }
    }
}
