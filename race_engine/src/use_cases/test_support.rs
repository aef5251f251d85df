use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::entities::BestTimes;
use crate::domain::errors::StoreError;
use crate::domain::ports::BestTimeStore;
use crate::domain::track::{BoostPadDef, CheckpointDef, SpawnDef, Track, TrackDefinition};

// Straight flat sprint along +Z: four checkpoints and one boost pad before the second one.
pub(crate) fn sprint_track_definition() -> TrackDefinition {
    let checkpoint = |order: i64, z: f32| CheckpointDef {
        id: format!("cp-{order}"),
        order,
        position: [0.0, 2.8, z],
        size: [16.0, 8.0, 12.0],
    };

    TrackDefinition {
        id: "sprint".to_string(),
        name: "Test Sprint".to_string(),
        spawn: SpawnDef {
            position: [0.0, 0.83, 0.0],
            yaw: 0.0,
        },
        checkpoints: vec![
            checkpoint(0, 40.0),
            checkpoint(1, 90.0),
            checkpoint(2, 150.0),
            checkpoint(3, 220.0),
        ],
        boost_pads: vec![BoostPadDef {
            id: "pad-a".to_string(),
            position: [0.0, 0.9, 60.0],
            size: [11.0, 0.45, 11.0],
            force: 32_000.0,
            duration_ms: 900,
        }],
    }
}

pub(crate) fn sprint_track() -> Arc<Track> {
    Arc::new(Track::new(sprint_track_definition()).expect("fixture track is valid"))
}

#[derive(Clone, Copy, Default)]
pub(crate) struct FailureFlags {
    pub load: bool,
    pub save: bool,
}

// In-memory best-time store that remembers every save.
#[derive(Clone)]
pub(crate) struct RecordingStore {
    records: Arc<Mutex<HashMap<String, BestTimes>>>,
    failures: FailureFlags,
}

impl RecordingStore {
    pub(crate) fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            failures: FailureFlags::default(),
        }
    }

    pub(crate) fn with_failures(mut self, failures: FailureFlags) -> Self {
        self.failures = failures;
        self
    }

    pub(crate) fn insert_test_record(&self, track_id: impl Into<String>, best: BestTimes) {
        let mut guard = self.records.lock().expect("records mutex poisoned");
        guard.insert(track_id.into(), best);
    }

    pub(crate) fn get_test_record(&self, track_id: &str) -> Option<BestTimes> {
        let guard = self.records.lock().expect("records mutex poisoned");
        guard.get(track_id).cloned()
    }
}

impl BestTimeStore for RecordingStore {
    fn load(&self, track_id: &str) -> Result<Option<BestTimes>, StoreError> {
        if self.failures.load {
            return Err(StoreError::Io("load failed".to_string()));
        }
        let guard = self.records.lock().expect("records mutex poisoned");
        Ok(guard.get(track_id).cloned())
    }

    fn save(&self, track_id: &str, best: &BestTimes) -> Result<(), StoreError> {
        if self.failures.save {
            return Err(StoreError::Io("save failed".to_string()));
        }
        let mut guard = self.records.lock().expect("records mutex poisoned");
        guard.insert(track_id.to_string(), best.clone());
        Ok(())
    }
}
