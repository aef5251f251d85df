// Domain-level errors for track loading, trace control and best-time persistence.

use std::fmt;

#[derive(Debug)]
pub enum TrackError {
    Io(String),
    Parse(String),
    /// Structural problems found by validation, one entry per problem.
    Invalid(Vec<String>),
}

#[derive(Debug, PartialEq, Eq)]
pub enum TraceError {
    /// Recording cannot start while a replay owns the tick path.
    ReplayInProgress,
    Parse(String),
}

#[derive(Debug)]
pub enum StoreError {
    Io(String),
    Serialization(String),
}

impl fmt::Display for TrackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackError::Io(msg) => write!(f, "failed to read track: {msg}"),
            TrackError::Parse(msg) => write!(f, "failed to parse track: {msg}"),
            TrackError::Invalid(errors) => {
                write!(f, "invalid track definition:")?;
                for error in errors {
                    write!(f, "\n- {error}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceError::ReplayInProgress => write!(f, "a trace replay is in progress"),
            TraceError::Parse(msg) => write!(f, "failed to parse trace: {msg}"),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(msg) => write!(f, "best time storage failed: {msg}"),
            StoreError::Serialization(msg) => write!(f, "best time encoding failed: {msg}"),
        }
    }
}

impl std::error::Error for TrackError {}
impl std::error::Error for TraceError {}
impl std::error::Error for StoreError {}
