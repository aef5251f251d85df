use serde::{Deserialize, Serialize};

// Best lap and per-checkpoint splits persisted by the orchestrator, keyed by track id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BestTimes {
    #[serde(default)]
    pub best_ms: Option<f64>,
    #[serde(default)]
    pub best_splits_ms: Vec<f64>,
}

impl BestTimes {
    /// Drops non-finite values and floors the rest at zero, the way stored records are trusted.
    pub fn sanitized(self) -> Self {
        Self {
            best_ms: self.best_ms.filter(|ms| ms.is_finite()).map(|ms| ms.max(0.0)),
            best_splits_ms: self
                .best_splits_ms
                .into_iter()
                .filter(|ms| ms.is_finite())
                .map(|ms| ms.max(0.0))
                .collect(),
        }
    }

    pub fn splits(&self) -> Option<Vec<f64>> {
        if self.best_splits_ms.is_empty() {
            None
        } else {
            Some(self.best_splits_ms.clone())
        }
    }
}
