// Gameplay tuning, kept apart from runtime/server configuration.

pub mod race;
pub mod vehicle;

pub use race::RaceTuning;
pub use vehicle::VehicleTuning;
