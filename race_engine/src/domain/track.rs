// Track collaborator surface: authored definition, structural validation and region queries.

use crate::domain::errors::TrackError;
use crate::domain::state::RespawnPose;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnDef {
    pub position: [f32; 3],
    pub yaw: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointDef {
    pub id: String,
    pub order: i64,
    pub position: [f32; 3],
    pub size: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostPadDef {
    pub id: String,
    pub position: [f32; 3],
    pub size: [f32; 3],
    pub force: f32,
    pub duration_ms: i64,
}

/// Authored track as handed over by the geometry collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDefinition {
    pub id: String,
    pub name: String,
    pub spawn: SpawnDef,
    #[serde(default)]
    pub checkpoints: Vec<CheckpointDef>,
    #[serde(default)]
    pub boost_pads: Vec<BoostPadDef>,
}

/// Axis-aligned trigger volume, inclusive on every face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_center_size(center: [f32; 3], size: [f32; 3]) -> Self {
        let center = Vec3::from_array(center);
        let half = Vec3::from_array(size) * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

fn is_vec3(value: &[f32; 3]) -> bool {
    value.iter().all(|component| component.is_finite())
}

fn is_positive_size(value: &[f32; 3]) -> bool {
    is_vec3(value) && value.iter().all(|component| *component > 0.0)
}

/// Collects every structural problem instead of stopping at the first one.
pub fn collect_track_errors(track: &TrackDefinition) -> Vec<String> {
    let mut errors = Vec::new();

    if track.id.trim().is_empty() {
        errors.push("track id must not be empty".to_string());
    }
    if track.name.trim().is_empty() {
        errors.push("track name must not be empty".to_string());
    }
    if !is_vec3(&track.spawn.position) {
        errors.push("spawn position must be a finite vector".to_string());
    }
    if !track.spawn.yaw.is_finite() {
        errors.push("spawn yaw must be finite".to_string());
    }

    if track.checkpoints.is_empty() {
        errors.push("track needs at least one checkpoint".to_string());
    }

    let mut checkpoint_ids = HashSet::new();
    for checkpoint in &track.checkpoints {
        if checkpoint.id.trim().is_empty() {
            errors.push("every checkpoint needs an id".to_string());
        }
        if !checkpoint_ids.insert(checkpoint.id.as_str()) {
            errors.push(format!("duplicate checkpoint id: {}", checkpoint.id));
        }
        if !is_vec3(&checkpoint.position) {
            errors.push(format!("checkpoint {}: invalid position", checkpoint.id));
        }
        if !is_positive_size(&checkpoint.size) {
            errors.push(format!("checkpoint {}: size must be positive", checkpoint.id));
        }
        if checkpoint.order < 0 {
            errors.push(format!("checkpoint {}: order must be >= 0", checkpoint.id));
        }
    }

    let mut orders: Vec<i64> = track.checkpoints.iter().map(|c| c.order).collect();
    orders.sort_unstable();
    if orders
        .iter()
        .enumerate()
        .any(|(expected, order)| *order != expected as i64)
    {
        errors.push("checkpoint orders must be sequential without gaps (0..n-1)".to_string());
    }

    let mut boost_ids = HashSet::new();
    for pad in &track.boost_pads {
        if pad.id.trim().is_empty() {
            errors.push("every boost pad needs an id".to_string());
        }
        if !boost_ids.insert(pad.id.as_str()) {
            errors.push(format!("duplicate boost pad id: {}", pad.id));
        }
        if !is_vec3(&pad.position) {
            errors.push(format!("boost pad {}: invalid position", pad.id));
        }
        if !is_positive_size(&pad.size) {
            errors.push(format!("boost pad {}: size must be positive", pad.id));
        }
        if !pad.force.is_finite() || pad.force <= 0.0 {
            errors.push(format!("boost pad {}: force must be > 0", pad.id));
        }
        if pad.duration_ms <= 0 {
            errors.push(format!("boost pad {}: duration_ms must be > 0", pad.id));
        }
    }

    errors
}

struct CheckpointRegion {
    order: u32,
    bounds: Aabb,
}

struct BoostRegion {
    index: usize,
    bounds: Aabb,
}

/// Validated track with precomputed trigger volumes.
pub struct Track {
    definition: TrackDefinition,
    checkpoints: Vec<CheckpointRegion>,
    boost_pads: Vec<BoostRegion>,
}

impl Track {
    /// Refuses to hand back a definition that would corrupt race logic.
    pub fn new(mut definition: TrackDefinition) -> Result<Self, TrackError> {
        let errors = collect_track_errors(&definition);
        if !errors.is_empty() {
            return Err(TrackError::Invalid(errors));
        }

        definition.checkpoints.sort_by_key(|checkpoint| checkpoint.order);
        let checkpoints = definition
            .checkpoints
            .iter()
            .map(|checkpoint| CheckpointRegion {
                order: checkpoint.order as u32,
                bounds: Aabb::from_center_size(checkpoint.position, checkpoint.size),
            })
            .collect();
        let boost_pads = definition
            .boost_pads
            .iter()
            .enumerate()
            .map(|(index, pad)| BoostRegion {
                index,
                bounds: Aabb::from_center_size(pad.position, pad.size),
            })
            .collect();

        Ok(Self {
            definition,
            checkpoints,
            boost_pads,
        })
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn definition(&self) -> &TrackDefinition {
        &self.definition
    }

    pub fn spawn_pose(&self) -> RespawnPose {
        RespawnPose {
            position: Vec3::from_array(self.definition.spawn.position),
            yaw: self.definition.spawn.yaw,
        }
    }

    pub fn checkpoint_count(&self) -> u32 {
        self.checkpoints.len() as u32
    }

    pub fn checkpoint(&self, order: i64) -> Option<&CheckpointDef> {
        self.definition
            .checkpoints
            .iter()
            .find(|checkpoint| checkpoint.order == order)
    }

    /// Orders of every checkpoint volume containing `position`, ascending.
    pub fn checkpoint_orders_at(&self, position: Vec3) -> Vec<u32> {
        self.checkpoints
            .iter()
            .filter(|region| region.bounds.contains(position))
            .map(|region| region.order)
            .collect()
    }

    pub fn boost_pads_at(&self, position: Vec3) -> Vec<&BoostPadDef> {
        self.boost_pads
            .iter()
            .filter(|region| region.bounds.contains(position))
            .map(|region| &self.definition.boost_pads[region.index])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::test_support::sprint_track_definition;

    #[test]
    fn when_definition_is_well_formed_then_no_errors_are_collected() {
        let errors = collect_track_errors(&sprint_track_definition());

        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    }

    #[test]
    fn when_checkpoint_orders_have_a_gap_then_track_is_rejected() {
        let mut definition = sprint_track_definition();
        definition.checkpoints.truncate(2);
        definition.checkpoints[1].order = 2;

        let result = Track::new(definition);

        let Err(TrackError::Invalid(errors)) = result else {
            panic!("expected invalid track");
        };
        assert!(errors.iter().any(|e| e.contains("sequential")));
    }

    #[test]
    fn when_ids_repeat_and_sizes_are_not_positive_then_every_problem_is_reported() {
        let mut definition = sprint_track_definition();
        definition.checkpoints[1].id = definition.checkpoints[0].id.clone();
        definition.boost_pads[0].size = [11.0, 0.0, 11.0];
        definition.boost_pads[0].duration_ms = 0;

        let errors = collect_track_errors(&definition);

        assert!(errors.iter().any(|e| e.starts_with("duplicate checkpoint id")));
        assert!(errors.iter().any(|e| e.contains("size must be positive")));
        assert!(errors.iter().any(|e| e.contains("duration_ms")));
    }

    #[test]
    fn when_spawn_values_are_not_finite_then_track_is_rejected() {
        let mut definition = sprint_track_definition();
        definition.spawn.yaw = f32::NAN;

        assert!(matches!(
            Track::new(definition),
            Err(TrackError::Invalid(_))
        ));
    }

    #[test]
    fn when_position_is_inside_a_checkpoint_volume_then_its_order_is_reported() {
        let track = Track::new(sprint_track_definition()).expect("valid track");
        let checkpoint = track.checkpoint(1).expect("checkpoint 1");
        let inside = Vec3::from_array(checkpoint.position);

        assert_eq!(track.checkpoint_orders_at(inside), vec![1]);
        assert!(
            track
                .checkpoint_orders_at(inside + Vec3::new(0.0, 50.0, 0.0))
                .is_empty()
        );
    }

    #[test]
    fn when_position_is_on_a_boost_pad_then_the_pad_is_reported() {
        let track = Track::new(sprint_track_definition()).expect("valid track");
        let pad = &track.definition().boost_pads[0];
        let on_pad = Vec3::from_array(pad.position);

        let hits = track.boost_pads_at(on_pad);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, pad.id);
    }
}
