use crate::domain::errors::TrackError;
use crate::domain::track::{Track, TrackDefinition};
use std::path::Path;
use tracing::info;

/// Reads a TOML track definition and validates it.
pub fn load_track(path: &Path) -> Result<Track, TrackError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| TrackError::Io(format!("{}: {e}", path.display())))?;
    let track = parse_track(&text)?;
    info!(
        track_id = track.id(),
        checkpoints = track.checkpoint_count(),
        boost_pads = track.definition().boost_pads.len(),
        "track loaded"
    );
    Ok(track)
}

pub fn parse_track(text: &str) -> Result<Track, TrackError> {
    let definition: TrackDefinition =
        toml::from_str(text).map_err(|e| TrackError::Parse(e.to_string()))?;
    Track::new(definition)
}
