//! Decoding of persisted and imported activity documents.
//!
//! Stored documents may predate the exercise history; imported documents may
//! be partial exports. Both paths back-fill what is missing and reject what is
//! malformed.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::activity::ActivityDocument;

const EXERCISES_COMPLETED: &str = "exercisesCompleted";
const EXERCISE_HISTORY: &str = "exerciseHistory";

/// Reasons a JSON value is not an acceptable activity document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DocumentError {
    #[error("activity document must be a JSON object")]
    NotAnObject,

    #[error("activity document is missing `exercisesCompleted`")]
    MissingExercisesCompleted,

    #[error("`exercisesCompleted` must be a non-negative whole number, got {0}")]
    InvalidExercisesCompleted(String),

    #[error("activity document could not be decoded: {0}")]
    Decode(String),
}

/// A stored document after the schema check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub document: ActivityDocument,
    /// True when the stored value had to be patched and should be written back.
    pub migrated: bool,
}

fn as_object(value: Value) -> Result<Map<String, Value>, DocumentError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(DocumentError::NotAnObject),
    }
}

/// A non-negative whole number, whether written as `3` or `3.0`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn exercise_count(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    (f >= 0.0 && f.fract() == 0.0 && f < u64::MAX as f64).then(|| f as u64)
}

fn decode(map: Map<String, Value>) -> Result<ActivityDocument, DocumentError> {
    serde_json::from_value(Value::Object(map)).map_err(|e| DocumentError::Decode(e.to_string()))
}

impl ActivityDocument {
    /// Decode a document read back from storage.
    ///
    /// Documents written before exercise history existed get an empty history
    /// and are flagged as migrated. Running this on an already-migrated
    /// document is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError` if the value is not an object or fails to decode.
    pub fn from_stored(value: Value) -> Result<LoadedDocument, DocumentError> {
        let mut map = as_object(value)?;
        let migrated = !map.contains_key(EXERCISE_HISTORY);
        if migrated {
            map.insert(EXERCISE_HISTORY.to_owned(), Value::Array(Vec::new()));
        }
        Ok(LoadedDocument {
            document: decode(map)?,
            migrated,
        })
    }

    /// Validate and decode a document supplied for import.
    ///
    /// `exercisesCompleted` must be present and a non-negative whole number
    /// (`3.0` is read as `3`, `2.5` is rejected); any other missing field
    /// takes its empty default.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError` when the marker field is absent or invalid, or
    /// when a present field has the wrong shape.
    pub fn from_import(value: Value) -> Result<Self, DocumentError> {
        let mut map = as_object(value)?;
        let raw = map
            .get(EXERCISES_COMPLETED)
            .ok_or(DocumentError::MissingExercisesCompleted)?;
        let count = exercise_count(raw)
            .ok_or_else(|| DocumentError::InvalidExercisesCompleted(raw.to_string()))?;
        map.insert(EXERCISES_COMPLETED.to_owned(), Value::from(count));
        decode(map)
    }
}
