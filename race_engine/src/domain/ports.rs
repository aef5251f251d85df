use glam::{Quat, Vec3};

use crate::domain::entities::BestTimes;
use crate::domain::errors::StoreError;

/// Wheel contact points reported by the physics collaborator.
pub const WHEEL_COUNT: usize = 4;

// Port onto the physics collaborator's rigid body for the player vehicle.
//
// Impulses are linear momentum (N*s); torque impulses are divided by the body's angular
// inertia. `step` advances the world that owns the body by exactly `dt` seconds.
pub trait RigidBodyPort {
    fn translation(&self) -> Vec3;
    fn rotation(&self) -> Quat;
    fn linvel(&self) -> Vec3;
    fn angvel(&self) -> Vec3;
    fn mass(&self) -> f32;
    fn angular_inertia(&self) -> f32;
    fn gravity(&self) -> Vec3;

    fn set_translation(&mut self, translation: Vec3);
    fn set_rotation(&mut self, rotation: Quat);
    fn set_linvel(&mut self, linvel: Vec3);
    fn set_angvel(&mut self, angvel: Vec3);
    fn apply_impulse(&mut self, impulse: Vec3);
    fn apply_torque_impulse(&mut self, torque_impulse: Vec3);

    /// Per-wheel ground contact after the last step.
    fn wheel_contacts(&self) -> [bool; WHEEL_COUNT];
    /// Distance from the chassis rest height down to the ground, if ground is below.
    fn ground_distance(&self) -> Option<f32>;

    fn step(&mut self, dt: f32);
}

// Port for best-time persistence owned by the orchestrator.
pub trait BestTimeStore: Send + Sync {
    fn load(&self, track_id: &str) -> Result<Option<BestTimes>, StoreError>;
    fn save(&self, track_id: &str, best: &BestTimes) -> Result<(), StoreError>;
}
