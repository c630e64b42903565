//! Saving and restoring the workout store.
//!
//! The store is written as a JSON array under a single key. Loading rebuilds
//! each record through the `Workout` constructors, so pace, speed and
//! description are derived again rather than trusted from disk.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::PersistError;
use crate::models::{Coords, Metrics, Origin, UnknownWorkoutType, Workout, WorkoutType};
use crate::storage::KeyValueStore;
use crate::store::WorkoutStore;

pub const STORAGE_KEY: &str = "workouts";

/// On-disk shape of one workout.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutRecord {
    pub id: String,
    pub date: DateTime<Local>,
    pub coords: Coords,
    pub distance: f64,
    pub duration: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pace: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_gain: Option<f64>,
}

#[derive(Error, Debug, PartialEq)]
pub enum RecordError {
    #[error(transparent)]
    UnknownType(#[from] UnknownWorkoutType),

    #[error("{kind} record is missing {field}")]
    MissingField { kind: WorkoutType, field: &'static str },

    #[error("record has an invalid {field}")]
    Invalid { field: &'static str },
}

fn require_positive(field: &'static str, n: f64) -> Result<f64, RecordError> {
    if n.is_finite() && n > 0.0 {
        Ok(n)
    } else {
        Err(RecordError::Invalid { field })
    }
}

impl From<&Workout> for WorkoutRecord {
    fn from(w: &Workout) -> Self {
        let (cadence, pace, speed, elevation_gain) = match *w.metrics() {
            Metrics::Running { cadence, pace } => (Some(cadence), Some(pace), None, None),
            Metrics::Cycling { elevation_gain, speed } => {
                (None, None, Some(speed), Some(elevation_gain))
            }
        };
        WorkoutRecord {
            id: w.id().to_string(),
            date: *w.date(),
            coords: w.coords(),
            distance: w.distance(),
            duration: w.duration(),
            kind: w.kind().to_string(),
            description: w.description().to_string(),
            cadence,
            pace,
            speed,
            elevation_gain,
        }
    }
}

impl TryFrom<WorkoutRecord> for Workout {
    type Error = RecordError;

    fn try_from(r: WorkoutRecord) -> Result<Self, Self::Error> {
        let kind: WorkoutType = r.kind.parse()?;
        if !r.coords.is_valid() {
            return Err(RecordError::Invalid { field: "coords" });
        }
        let distance = require_positive("distance", r.distance)?;
        let duration = require_positive("duration", r.duration)?;
        let origin = Origin {
            id: r.id,
            date: r.date,
        };
        match kind {
            WorkoutType::Running => {
                let cadence = r.cadence.ok_or(RecordError::MissingField {
                    kind,
                    field: "cadence",
                })?;
                if cadence == 0 {
                    return Err(RecordError::Invalid { field: "cadence" });
                }
                Ok(Workout::running_from(origin, r.coords, duration, distance, cadence))
            }
            WorkoutType::Cycling => {
                let elevation_gain = r.elevation_gain.ok_or(RecordError::MissingField {
                    kind,
                    field: "elevationGain",
                })?;
                // Zero or negative gain is allowed, as at submission.
                if !elevation_gain.is_finite() {
                    return Err(RecordError::Invalid { field: "elevationGain" });
                }
                Ok(Workout::cycling_from(
                    origin,
                    r.coords,
                    duration,
                    distance,
                    elevation_gain,
                ))
            }
        }
    }
}

pub fn encode(workouts: &[Workout]) -> Result<String, serde_json::Error> {
    let records: Vec<WorkoutRecord> = workouts.iter().map(WorkoutRecord::from).collect();
    serde_json::to_string(&records)
}

/// Parses a stored blob. Unreadable blobs give an empty vector; records that
/// cannot be rebuilt are skipped.
pub fn decode(blob: &str) -> Vec<Workout> {
    let entries: Vec<Value> = match serde_json::from_str::<Option<Vec<Value>>>(blob) {
        Ok(entries) => entries.unwrap_or_default(),
        Err(e) => {
            tracing::warn!("Stored workouts are unreadable, starting empty: {}", e);
            return Vec::new();
        }
    };

    let mut workouts = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let record = match serde_json::from_value::<WorkoutRecord>(entry) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(index, "Skipping malformed workout record: {}", e);
                continue;
            }
        };
        match Workout::try_from(record) {
            Ok(workout) => workouts.push(workout),
            Err(e) => tracing::warn!(index, "Skipping workout record: {}", e),
        }
    }
    workouts
}

pub struct Persistence<S> {
    storage: S,
}

impl<S: KeyValueStore> Persistence<S> {
    pub fn new(storage: S) -> Self {
        Persistence { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Overwrites the stored blob with the whole store.
    pub fn save(&mut self, store: &WorkoutStore) -> Result<(), PersistError> {
        let blob = encode(store.all())?;
        self.storage.set(STORAGE_KEY, &blob)?;
        tracing::debug!(count = store.len(), "Saved workouts");
        Ok(())
    }

    pub fn load(&self) -> Vec<Workout> {
        match self.storage.get(STORAGE_KEY) {
            Ok(Some(blob)) => {
                let workouts = decode(&blob);
                tracing::info!(count = workouts.len(), "Loaded workouts");
                workouts
            }
            Ok(None) => {
                tracing::info!("No stored workouts found");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("Failed to read stored workouts: {}", e);
                Vec::new()
            }
        }
    }

    pub fn clear(&mut self) -> Result<(), PersistError> {
        self.storage.remove(STORAGE_KEY)?;
        Ok(())
    }
}
