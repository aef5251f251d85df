pub mod flight;
pub mod ground;
pub mod handling;
pub mod race;
pub mod respawn;
pub mod scheduler;
pub mod vehicle;
