// Where and how the vehicle reappears after a reset.

use crate::domain::state::RespawnPose;
use crate::domain::track::{CheckpointDef, Track};
use glam::Vec3;

/// Height added above a checkpoint centre so the chassis drops onto the road.
pub const RESPAWN_LIFT_M: f32 = 2.1;

fn bearing(from: &CheckpointDef, to: &CheckpointDef) -> Option<f32> {
    let dx = to.position[0] - from.position[0];
    let dz = to.position[2] - from.position[2];
    if dx == 0.0 && dz == 0.0 {
        return None;
    }
    Some(dx.atan2(dz))
}

/// Resolves the pose for `last_checkpoint_order`; `-1` (or any unknown order) means the spawn.
pub fn resolve_respawn_pose(track: &Track, last_checkpoint_order: i64) -> RespawnPose {
    let spawn = track.spawn_pose();
    let Some(checkpoint) = track.checkpoint(last_checkpoint_order) else {
        return spawn;
    };

    let position = Vec3::from_array(checkpoint.position) + Vec3::Y * RESPAWN_LIFT_M;

    let yaw = match track.checkpoint(last_checkpoint_order + 1) {
        Some(next) => bearing(checkpoint, next),
        None => track
            .checkpoint((last_checkpoint_order - 1).max(0))
            .filter(|previous| previous.id != checkpoint.id)
            .and_then(|previous| bearing(previous, checkpoint)),
    }
    .unwrap_or(spawn.yaw);

    RespawnPose { position, yaw }
}
