//! Contracts for everything the controller drives but does not own: the
//! position source, the map, the workout list, the entry form and user
//! notices. The desktop app implements all of them on one type; tests use a
//! recording fake.

use std::time::Duration;

use crate::models::{Coords, Workout, WorkoutType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MapHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MarkerHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanOptions {
    pub zoom: u8,
    pub animate: bool,
    pub duration: Duration,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PopupStyle {
    pub class_name: String,
    pub min_width: f32,
    pub max_width: f32,
    pub auto_close: bool,
    pub close_on_click: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Popup {
    pub kind: WorkoutType,
    pub content: String,
    pub style: PopupStyle,
}

impl Popup {
    pub fn for_workout(workout: &Workout) -> Self {
        let kind = workout.kind();
        Popup {
            kind,
            content: format!("{} {}", kind.icon(), workout.description()),
            style: PopupStyle {
                class_name: format!("{}-popup", kind),
                min_width: 150.0,
                max_width: 200.0,
                auto_close: false,
                close_on_click: false,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Detail {
    pub icon: &'static str,
    pub value: String,
    pub unit: &'static str,
}

/// One row of the workout list, keyed by workout id.
#[derive(Clone, Debug, PartialEq)]
pub struct ListEntry {
    pub id: String,
    pub kind: WorkoutType,
    pub title: String,
    pub details: Vec<Detail>,
}

impl ListEntry {
    pub fn for_workout(workout: &Workout) -> Self {
        let kind = workout.kind();
        let mut details = vec![
            Detail {
                icon: kind.icon(),
                value: workout.distance().to_string(),
                unit: "km",
            },
            Detail {
                icon: "⏱",
                value: workout.duration().to_string(),
                unit: "min",
            },
        ];
        if let (Some(pace), Some(cadence)) = (workout.pace(), workout.cadence()) {
            details.push(Detail {
                icon: "⚡️",
                value: format!("{:.1}", pace),
                unit: "min/km",
            });
            details.push(Detail {
                icon: "🦶🏼",
                value: cadence.to_string(),
                unit: "spm",
            });
        }
        if let (Some(speed), Some(gain)) = (workout.speed(), workout.elevation_gain()) {
            details.push(Detail {
                icon: "⚡️",
                value: format!("{:.1}", speed),
                unit: "km/h",
            });
            details.push(Detail {
                icon: "⛰",
                value: gain.to_string(),
                unit: "m",
            });
        }
        ListEntry {
            id: workout.id().to_string(),
            kind,
            title: workout.description().to_string(),
            details,
        }
    }
}

/// Raw form contents as typed by the user.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormValues {
    pub kind: WorkoutType,
    pub distance: String,
    pub duration: String,
    pub cadence: String,
    pub elevation: String,
}

/// Requests a position. The answer arrives later as a controller event.
pub trait Geolocation {
    fn request_position(&mut self);
}

pub trait MapService {
    fn create_map(&mut self, center: Coords, zoom: u8) -> MapHandle;
    fn add_marker(&mut self, map: MapHandle, coords: Coords) -> MarkerHandle;
    fn bind_popup(&mut self, marker: MarkerHandle, popup: Popup);
    fn remove_marker(&mut self, map: MapHandle, marker: MarkerHandle);
    fn pan_to(&mut self, map: MapHandle, coords: Coords, options: PanOptions);
    /// Drops the map and everything on it.
    fn destroy_map(&mut self, map: MapHandle);
}

pub trait WorkoutList {
    /// Adds an entry at the top of the list.
    fn render_entry(&mut self, entry: ListEntry);
    fn clear_entries(&mut self);
}

pub trait WorkoutForm {
    fn values(&self) -> FormValues;
    fn show(&mut self);
    fn focus_distance(&mut self);
    fn hide(&mut self);
    /// Empties distance, duration, cadence and elevation.
    fn clear(&mut self);
    /// Swaps the cadence and elevation rows.
    fn toggle_type_fields(&mut self);
    /// Re-enables the form layout after `delay`, once the hide has settled.
    fn schedule_layout_restore(&mut self, delay: Duration);
}

pub trait Notifier {
    fn notify(&mut self, message: &str);
}

pub trait Surface: Geolocation + MapService + WorkoutList + WorkoutForm + Notifier {}

impl<T> Surface for T where T: Geolocation + MapService + WorkoutList + WorkoutForm + Notifier {}
