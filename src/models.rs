//models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Local};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// A map position. Serialized as `[lat, lng]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coords {
    pub lat: f64,
    pub lng: f64,
}

impl Coords {
    pub fn new(lat: f64, lng: f64) -> Self {
        Coords { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl From<[f64; 2]> for Coords {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Coords { lat, lng }
    }
}

impl From<Coords> for [f64; 2] {
    fn from(c: Coords) -> Self {
        [c.lat, c.lng]
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutType {
    #[default]
    Running,
    Cycling,
}

impl WorkoutType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkoutType::Running => "running",
            WorkoutType::Cycling => "cycling",
        }
    }

    /// Capitalized name used in descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            WorkoutType::Running => "Running",
            WorkoutType::Cycling => "Cycling",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            WorkoutType::Running => "🏃‍♂️",
            WorkoutType::Cycling => "⚡️",
        }
    }
}

impl fmt::Display for WorkoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown workout type: {0}")]
pub struct UnknownWorkoutType(pub String);

impl FromStr for WorkoutType {
    type Err = UnknownWorkoutType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(WorkoutType::Running),
            "cycling" => Ok(WorkoutType::Cycling),
            other => Err(UnknownWorkoutType(other.to_string())),
        }
    }
}

/// Type-specific input plus the metric derived from it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Metrics {
    Running { cadence: u32, pace: f64 },
    Cycling { elevation_gain: f64, speed: f64 },
}

/// Identity of a workout: its id and creation time.
#[derive(Clone, Debug, PartialEq)]
pub struct Origin {
    pub id: String,
    pub date: DateTime<Local>,
}

impl Origin {
    pub fn now() -> Self {
        Origin::at(Local::now())
    }

    /// Fresh id stamped from `date`.
    pub fn at(date: DateTime<Local>) -> Self {
        Origin {
            id: new_id(&date),
            date,
        }
    }
}

// last 10 digits of the millisecond timestamp, then 4 random digits
fn new_id(date: &DateTime<Local>) -> String {
    let millis = date.timestamp_millis().rem_euclid(10_000_000_000);
    let salt: u16 = rand::thread_rng().gen_range(0..10_000);
    format!("{:010}{:04}", millis, salt)
}

pub fn describe(kind: WorkoutType, date: &DateTime<Local>) -> String {
    format!(
        "{} on {} {}",
        kind.label(),
        MONTHS[date.month0() as usize],
        date.day()
    )
}

/// A logged running or cycling activity. Immutable once built.
///
/// Inputs are not validated here; callers must pass finite, positive
/// `distance` and `duration`.
#[derive(Clone, Debug)]
pub struct Workout {
    id: String,
    date: DateTime<Local>,
    coords: Coords,
    distance: f64,
    duration: f64,
    description: String,
    metrics: Metrics,
}

impl Workout {
    pub fn running(coords: Coords, duration: f64, distance: f64, cadence: u32) -> Self {
        Workout::running_from(Origin::now(), coords, duration, distance, cadence)
    }

    pub fn cycling(coords: Coords, duration: f64, distance: f64, elevation_gain: f64) -> Self {
        Workout::cycling_from(Origin::now(), coords, duration, distance, elevation_gain)
    }

    pub fn running_from(
        origin: Origin,
        coords: Coords,
        duration: f64,
        distance: f64,
        cadence: u32,
    ) -> Self {
        let pace = duration / distance;
        Workout::build(origin, coords, duration, distance, Metrics::Running { cadence, pace })
    }

    pub fn cycling_from(
        origin: Origin,
        coords: Coords,
        duration: f64,
        distance: f64,
        elevation_gain: f64,
    ) -> Self {
        let speed = distance / (duration / 60.0);
        Workout::build(
            origin,
            coords,
            duration,
            distance,
            Metrics::Cycling { elevation_gain, speed },
        )
    }

    fn build(origin: Origin, coords: Coords, duration: f64, distance: f64, metrics: Metrics) -> Self {
        let kind = match metrics {
            Metrics::Running { .. } => WorkoutType::Running,
            Metrics::Cycling { .. } => WorkoutType::Cycling,
        };
        Workout {
            description: describe(kind, &origin.date),
            id: origin.id,
            date: origin.date,
            coords,
            distance,
            duration,
            metrics,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn date(&self) -> &DateTime<Local> {
        &self.date
    }

    pub fn coords(&self) -> Coords {
        self.coords
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn kind(&self) -> WorkoutType {
        match self.metrics {
            Metrics::Running { .. } => WorkoutType::Running,
            Metrics::Cycling { .. } => WorkoutType::Cycling,
        }
    }

    pub fn pace(&self) -> Option<f64> {
        match self.metrics {
            Metrics::Running { pace, .. } => Some(pace),
            Metrics::Cycling { .. } => None,
        }
    }

    pub fn speed(&self) -> Option<f64> {
        match self.metrics {
            Metrics::Cycling { speed, .. } => Some(speed),
            Metrics::Running { .. } => None,
        }
    }

    pub fn cadence(&self) -> Option<u32> {
        match self.metrics {
            Metrics::Running { cadence, .. } => Some(cadence),
            Metrics::Cycling { .. } => None,
        }
    }

    pub fn elevation_gain(&self) -> Option<f64> {
        match self.metrics {
            Metrics::Cycling { elevation_gain, .. } => Some(elevation_gain),
            Metrics::Running { .. } => None,
        }
    }
}

impl PartialEq for Workout {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Workout {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon(year: i32, month: u32, day: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(year, month, day, 12, 0, 0)
            .single()
            .unwrap()
    }

    fn here() -> Coords {
        Coords::new(51.51, -0.13)
    }

    #[test]
    fn test_running_pace_is_duration_over_distance() {
        let w = Workout::running(here(), 30.0, 5.0, 150);
        assert_eq!(w.pace(), Some(6.0));
        assert_eq!(w.speed(), None);
        assert_eq!(w.cadence(), Some(150));
        assert_eq!(w.kind(), WorkoutType::Running);
    }

    #[test]
    fn test_cycling_speed_is_km_per_hour() {
        let w = Workout::cycling(here(), 90.0, 45.0, 320.0);
        assert_eq!(w.speed(), Some(45.0 / (90.0 / 60.0)));
        assert_eq!(w.speed(), Some(30.0));
        assert_eq!(w.pace(), None);
        assert_eq!(w.elevation_gain(), Some(320.0));
    }

    #[test]
    fn test_pace_is_not_rounded() {
        let w = Workout::running(here(), 10.0, 3.0, 170);
        assert_eq!(w.pace(), Some(10.0 / 3.0));
    }

    #[test]
    fn test_description_running_march_5() {
        let w = Workout::running_from(Origin::at(noon(2024, 3, 5)), here(), 30.0, 5.0, 150);
        assert_eq!(w.description(), "Running on March 5");
    }

    #[test]
    fn test_description_cycling_december_31() {
        let w = Workout::cycling_from(Origin::at(noon(2023, 12, 31)), here(), 60.0, 20.0, 0.0);
        assert_eq!(w.description(), "Cycling on December 31");
    }

    #[test]
    fn test_id_is_fourteen_digits() {
        let origin = Origin::now();
        assert_eq!(origin.id.len(), 14);
        assert!(origin.id.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_equality_is_by_id() {
        let origin = Origin::at(noon(2024, 6, 1));
        let a = Workout::running_from(origin.clone(), here(), 30.0, 5.0, 150);
        let b = Workout::running_from(origin, Coords::new(0.0, 0.0), 10.0, 1.0, 90);
        assert_eq!(a, b);
    }

    #[test]
    fn test_coords_serialize_as_pair() {
        let json = serde_json::to_string(&Coords::new(51.5, -0.12)).unwrap();
        assert_eq!(json, "[51.5,-0.12]");
        let back: Coords = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Coords::new(51.5, -0.12));
    }

    #[test]
    fn test_coords_range() {
        assert!(Coords::new(51.5, -0.12).is_valid());
        assert!(!Coords::new(91.0, 0.0).is_valid());
        assert!(!Coords::new(0.0, f64::NAN).is_valid());
    }

    #[test]
    fn test_workout_type_parse() {
        assert_eq!("cycling".parse::<WorkoutType>(), Ok(WorkoutType::Cycling));
        assert!("swimming".parse::<WorkoutType>().is_err());
    }
}
