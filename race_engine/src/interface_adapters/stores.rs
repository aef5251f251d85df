// Best-time persistence backed by one JSON file keyed by track id.

use crate::domain::entities::BestTimes;
use crate::domain::errors::StoreError;
use crate::domain::ports::BestTimeStore;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, warn};

type BestTimesFile = BTreeMap<String, BestTimes>;

pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles from concurrent save tasks.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Result<BestTimesFile, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BestTimesFile::new()),
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };
        if text.trim().is_empty() {
            return Ok(BestTimesFile::new());
        }
        serde_json::from_str(&text).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

impl BestTimeStore for JsonFileStore {
    fn load(&self, track_id: &str) -> Result<Option<BestTimes>, StoreError> {
        let records = self.read_all()?;
        debug!(track_id, found = records.contains_key(track_id), "best times loaded");
        Ok(records.get(track_id).cloned().map(BestTimes::sanitized))
    }

    fn save(&self, track_id: &str, best: &BestTimes) -> Result<(), StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StoreError::Io("best time store lock poisoned".to_string()))?;

        // A corrupt file is replaced rather than blocking every future save.
        let mut records = self.read_all().unwrap_or_else(|e| {
            warn!(error = %e, "discarding unreadable best time file");
            BestTimesFile::new()
        });
        records.insert(track_id.to_string(), best.clone());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        let text = serde_json::to_string_pretty(&records)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        // Write then rename so a crash mid-save keeps the previous file intact.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(|e| StoreError::Io(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| StoreError::Io(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static NEXT_FILE: AtomicU32 = AtomicU32::new(0);

    fn temp_path() -> PathBuf {
        let n = NEXT_FILE.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir()
            .join(format!("race_engine_store_{}_{n}", std::process::id()))
            .join("best_times.json")
    }

    #[test]
    fn when_file_is_missing_then_load_returns_none() {
        let store = JsonFileStore::new(temp_path());

        assert!(store.load("sprint").expect("missing file is not an error").is_none());
    }

    #[test]
    fn when_best_times_are_saved_then_they_load_back_per_track() {
        let path = temp_path();
        let store = JsonFileStore::new(&path);
        let best = BestTimes {
            best_ms: Some(42_000.0),
            best_splits_ms: vec![10_000.0, 42_000.0],
        };

        store.save("sprint", &best).expect("save succeeds");
        store
            .save("canyon", &BestTimes::default())
            .expect("second track saves");

        assert_eq!(store.load("sprint").expect("readable"), Some(best));
        assert_eq!(
            store.load("canyon").expect("readable"),
            Some(BestTimes::default())
        );
        let _ = fs::remove_dir_all(path.parent().expect("temp dir"));
    }

    #[test]
    fn when_file_is_corrupt_then_load_fails_and_save_recovers() {
        let path = temp_path();
        fs::create_dir_all(path.parent().expect("temp dir")).expect("temp dir");
        fs::write(&path, "{ not json").expect("write garbage");
        let store = JsonFileStore::new(&path);

        assert!(matches!(
            store.load("sprint"),
            Err(StoreError::Serialization(_))
        ));

        store
            .save("sprint", &BestTimes::default())
            .expect("save replaces corrupt file");
        assert!(store.load("sprint").expect("readable").is_some());
        let _ = fs::remove_dir_all(path.parent().expect("temp dir"));
    }

    #[test]
    fn when_stored_values_are_negative_then_load_sanitizes_them() {
        let path = temp_path();
        fs::create_dir_all(path.parent().expect("temp dir")).expect("temp dir");
        fs::write(
            &path,
            r#"{"sprint":{"best_ms":-5.0,"best_splits_ms":[1000.0,-3.0]}}"#,
        )
        .expect("write fixture");
        let store = JsonFileStore::new(&path);

        let best = store.load("sprint").expect("readable").expect("record");

        assert_eq!(best.best_ms, Some(0.0));
        assert_eq!(best.best_splits_ms, vec![1000.0, 0.0]);
        let _ = fs::remove_dir_all(path.parent().expect("temp dir"));
    }
}
