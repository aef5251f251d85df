// Arcade rigid body over a flat ground plane, the reference implementation of the physics port.

use crate::domain::ports::{RigidBodyPort, WHEEL_COUNT};
use crate::domain::state::RespawnPose;
use crate::domain::tuning::VehicleTuning;
use glam::{Quat, Vec3};

/// Chassis-local wheel hub positions: front-left, front-right, rear-left, rear-right.
const WHEEL_OFFSETS: [Vec3; WHEEL_COUNT] = [
    Vec3::new(1.0, -0.4, 1.37),
    Vec3::new(-1.0, -0.4, 1.37),
    Vec3::new(1.0, -0.4, -1.37),
    Vec3::new(-1.0, -0.4, -1.37),
];

/// Roof corners, so an upside-down chassis rests on the ground instead of sinking into it.
const ROOF_OFFSETS: [Vec3; 4] = [
    Vec3::new(0.9, 0.6, 1.6),
    Vec3::new(-0.9, 0.6, 1.6),
    Vec3::new(0.9, 0.6, -1.6),
    Vec3::new(-0.9, 0.6, -1.6),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcadeBodyConfig {
    pub ground_height: f32,
    pub gravity: Vec3,
    pub wheel_radius: f32,
    /// Chassis centre height above the ground when resting on its wheels.
    pub ride_height: f32,
    pub contact_tolerance: f32,
    pub angular_inertia: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// How quickly a grounded upright chassis settles flat (1/s).
    pub settle_rate: f32,
    /// Pitch/roll velocity removed per second while grounded upright.
    pub settle_damping: f32,
}

impl Default for ArcadeBodyConfig {
    fn default() -> Self {
        Self {
            ground_height: 0.0,
            gravity: Vec3::new(0.0, -29.5, 0.0),
            wheel_radius: 0.43,
            ride_height: 0.83,
            contact_tolerance: 0.05,
            angular_inertia: 4.0,
            linear_damping: 0.32,
            angular_damping: 0.65,
            settle_rate: 42.0,
            settle_damping: 4.2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArcadeBody {
    config: ArcadeBodyConfig,
    mass: f32,
    translation: Vec3,
    rotation: Quat,
    linvel: Vec3,
    angvel: Vec3,
    contacts: [bool; WHEEL_COUNT],
}

impl ArcadeBody {
    pub fn new(config: ArcadeBodyConfig, mass: f32, pose: RespawnPose) -> Self {
        let mut body = Self {
            config,
            mass: mass.max(1.0),
            translation: pose.position,
            rotation: Quat::from_rotation_y(pose.yaw),
            linvel: Vec3::ZERO,
            angvel: Vec3::ZERO,
            contacts: [false; WHEEL_COUNT],
        };
        body.refresh_contacts();
        body
    }

    /// Body for the player vehicle: mass and settle behaviour come from the vehicle tuning.
    pub fn from_tuning(tuning: &VehicleTuning, pose: RespawnPose) -> Self {
        let config = ArcadeBodyConfig {
            settle_rate: tuning.suspension_spring,
            settle_damping: tuning.suspension_damper,
            ..ArcadeBodyConfig::default()
        };
        Self::new(config, tuning.mass_kg, pose)
    }

    pub fn config(&self) -> &ArcadeBodyConfig {
        &self.config
    }

    fn wheel_bottom(&self, offset: Vec3) -> f32 {
        (self.translation + self.rotation * offset).y - self.config.wheel_radius
    }

    fn lowest_point(&self) -> f32 {
        let wheels = WHEEL_OFFSETS.iter().map(|offset| self.wheel_bottom(*offset));
        let roof = ROOF_OFFSETS
            .iter()
            .map(|offset| (self.translation + self.rotation * *offset).y);
        wheels.chain(roof).fold(f32::INFINITY, f32::min)
    }

    fn refresh_contacts(&mut self) {
        let limit = self.config.ground_height + self.config.contact_tolerance;
        for (contact, offset) in self.contacts.iter_mut().zip(WHEEL_OFFSETS) {
            let bottom = (self.translation + self.rotation * offset).y - self.config.wheel_radius;
            *contact = bottom <= limit;
        }
    }

    fn resolve_ground(&mut self) {
        let penetration = self.config.ground_height - self.lowest_point();
        if penetration > 0.0 {
            self.translation.y += penetration;
            if self.linvel.y < 0.0 {
                self.linvel.y = 0.0;
            }
        }
    }

    fn settle(&mut self, dt: f32) {
        let up = self.rotation * Vec3::Y;
        if up.y < 0.5 || !self.contacts.iter().any(|c| *c) {
            return;
        }
        let forward = self.rotation * Vec3::Z;
        let level = Quat::from_rotation_y(forward.x.atan2(forward.z));
        let t = (self.config.settle_rate * dt).clamp(0.0, 1.0);
        self.rotation = self.rotation.slerp(level, t).normalize();

        let keep = (1.0 - self.config.settle_damping * dt).max(0.0);
        self.angvel.x *= keep;
        self.angvel.z *= keep;
    }
}

impl RigidBodyPort for ArcadeBody {
    fn translation(&self) -> Vec3 {
        self.translation
    }

    fn rotation(&self) -> Quat {
        self.rotation
    }

    fn linvel(&self) -> Vec3 {
        self.linvel
    }

    fn angvel(&self) -> Vec3 {
        self.angvel
    }

    fn mass(&self) -> f32 {
        self.mass
    }

    fn angular_inertia(&self) -> f32 {
        self.config.angular_inertia
    }

    fn gravity(&self) -> Vec3 {
        self.config.gravity
    }

    fn set_translation(&mut self, translation: Vec3) {
        self.translation = translation;
        self.refresh_contacts();
    }

    fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation.normalize();
        self.refresh_contacts();
    }

    fn set_linvel(&mut self, linvel: Vec3) {
        self.linvel = linvel;
    }

    fn set_angvel(&mut self, angvel: Vec3) {
        self.angvel = angvel;
    }

    fn apply_impulse(&mut self, impulse: Vec3) {
        self.linvel += impulse / self.mass;
    }

    fn apply_torque_impulse(&mut self, torque_impulse: Vec3) {
        self.angvel += torque_impulse / self.config.angular_inertia;
    }

    fn wheel_contacts(&self) -> [bool; WHEEL_COUNT] {
        self.contacts
    }

    fn ground_distance(&self) -> Option<f32> {
        Some((self.translation.y - self.config.ground_height - self.config.ride_height).max(0.0))
    }

    /// Semi-implicit Euler: velocities first, then pose, then ground contact.
    fn step(&mut self, dt: f32) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }

        self.linvel += self.config.gravity * dt;
        self.linvel /= 1.0 + self.config.linear_damping * dt;
        self.angvel /= 1.0 + self.config.angular_damping * dt;

        self.translation += self.linvel * dt;
        self.rotation = (Quat::from_scaled_axis(self.angvel * dt) * self.rotation).normalize();

        self.resolve_ground();
        self.refresh_contacts();
        self.settle(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resting_body() -> ArcadeBody {
        ArcadeBody::from_tuning(
            &VehicleTuning::default(),
            RespawnPose {
                position: Vec3::new(0.0, 0.83, 0.0),
                yaw: 0.0,
            },
        )
    }

    #[test]
    fn when_resting_on_its_wheels_then_every_wheel_is_in_contact_and_height_holds() {
        let mut body = resting_body();

        for _ in 0..240 {
            body.step(1.0 / 120.0);
        }

        assert_eq!(body.wheel_contacts(), [true; WHEEL_COUNT]);
        assert!((body.translation().y - 0.83).abs() < 1e-3);
    }

    #[test]
    fn when_dropped_from_height_then_body_falls_and_lands() {
        let mut body = resting_body();
        body.set_translation(Vec3::new(0.0, 10.0, 0.0));
        assert_eq!(body.wheel_contacts(), [false; WHEEL_COUNT]);

        for _ in 0..360 {
            body.step(1.0 / 120.0);
        }

        assert!(body.wheel_contacts().iter().all(|c| *c));
        assert!(body.translation().y < 1.0);
    }

    #[test]
    fn when_impulse_is_applied_then_velocity_changes_by_impulse_over_mass() {
        let mut body = resting_body();

        body.apply_impulse(Vec3::new(0.0, 0.0, 2400.0));
        body.apply_torque_impulse(Vec3::new(0.0, 8.0, 0.0));

        assert_eq!(body.linvel(), Vec3::new(0.0, 0.0, 2.0));
        assert_eq!(body.angvel(), Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn when_flipped_then_body_rests_on_its_roof_without_wheel_contact() {
        let mut body = resting_body();
        body.set_rotation(Quat::from_rotation_z(std::f32::consts::PI));
        body.set_translation(Vec3::new(0.0, 2.0, 0.0));

        for _ in 0..360 {
            body.step(1.0 / 120.0);
        }

        assert!((body.rotation() * Vec3::Y).y < 0.0);
        assert_eq!(body.wheel_contacts(), [false; WHEEL_COUNT]);
        assert!(body.translation().y > 0.0);
    }
}
