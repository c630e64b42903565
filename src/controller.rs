//! The application controller.
//!
//! Drives the session: wait for a position, build the map and restore saved
//! workouts, then take map clicks and form submissions. Every user or
//! platform event arrives through [`Controller::handle`] and runs to
//! completion before the next one.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::{AppError, ValidationError};
use crate::models::{Coords, Workout, WorkoutType};
use crate::persistence::Persistence;
use crate::settings::Settings;
use crate::storage::KeyValueStore;
use crate::store::WorkoutStore;
use crate::surface::{FormValues, ListEntry, MapHandle, MarkerHandle, PanOptions, Popup, Surface};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FormState {
    Hidden,
    /// Open, holding the map position the next workout will be logged at.
    Shown { pending: Coords },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Phase {
    AwaitingPosition,
    /// Geolocation failed. Nothing happens until a reset.
    PositionUnavailable,
    MapReady { form: FormState },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    PositionAcquired(Coords),
    PositionFailed(String),
    MapClicked(Coords),
    TypeChanged,
    FormSubmitted,
    ListEntryClicked(String),
    Reset,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControllerConfig {
    pub zoom: u8,
    pub pan_duration: Duration,
    pub restore_delay: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig::from(&Settings::default())
    }
}

impl From<&Settings> for ControllerConfig {
    fn from(settings: &Settings) -> Self {
        ControllerConfig {
            zoom: settings.map.zoom,
            pan_duration: settings.map.pan_duration(),
            restore_delay: settings.form.restore_delay(),
        }
    }
}

/// A validated form submission.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Submission {
    Running { distance: f64, duration: f64, cadence: u32 },
    Cycling { distance: f64, duration: f64, elevation_gain: f64 },
}

impl Submission {
    pub fn into_workout(self, coords: Coords) -> Workout {
        match self {
            Submission::Running { distance, duration, cadence } => {
                Workout::running(coords, duration, distance, cadence)
            }
            Submission::Cycling { distance, duration, elevation_gain } => {
                Workout::cycling(coords, duration, distance, elevation_gain)
            }
        }
    }
}

fn parse_number(field: &'static str, raw: &str) -> Result<f64, ValidationError> {
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(ValidationError::NotANumber { field }),
    }
}

fn require_positive(field: &'static str, n: f64) -> Result<f64, ValidationError> {
    if n > 0.0 {
        Ok(n)
    } else {
        Err(ValidationError::NotPositive { field })
    }
}

/// Checks the form. Every field must be a finite number before any
/// positivity check runs. Distance, duration and cadence must be positive;
/// elevation gain may be zero or negative.
pub fn validate(values: &FormValues) -> Result<Submission, ValidationError> {
    let distance = parse_number("distance", &values.distance)?;
    let duration = parse_number("duration", &values.duration)?;
    match values.kind {
        WorkoutType::Running => {
            let cadence = parse_number("cadence", &values.cadence)?;
            let distance = require_positive("distance", distance)?;
            let duration = require_positive("duration", duration)?;
            let cadence = require_positive("cadence", cadence)?;
            if cadence.fract() != 0.0 || cadence > f64::from(u32::MAX) {
                return Err(ValidationError::NotWhole { field: "cadence" });
            }
            Ok(Submission::Running {
                distance,
                duration,
                cadence: cadence as u32,
            })
        }
        WorkoutType::Cycling => {
            let elevation_gain = parse_number("elevation gain", &values.elevation)?;
            let distance = require_positive("distance", distance)?;
            let duration = require_positive("duration", duration)?;
            Ok(Submission::Cycling {
                distance,
                duration,
                elevation_gain,
            })
        }
    }
}

pub struct Controller<U, S> {
    surface: U,
    persistence: Persistence<S>,
    store: WorkoutStore,
    phase: Phase,
    map: Option<MapHandle>,
    markers: HashMap<String, MarkerHandle>,
    config: ControllerConfig,
}

impl<U: Surface, S: KeyValueStore> Controller<U, S> {
    pub fn new(surface: U, storage: S, config: ControllerConfig) -> Self {
        Controller {
            surface,
            persistence: Persistence::new(storage),
            store: WorkoutStore::new(),
            phase: Phase::AwaitingPosition,
            map: None,
            markers: HashMap::new(),
            config,
        }
    }

    /// Asks for the user's position. The session proceeds once the answer
    /// comes back through [`Event::PositionAcquired`].
    pub fn start(&mut self) {
        tracing::info!("Requesting position");
        self.phase = Phase::AwaitingPosition;
        self.surface.request_position();
    }

    pub fn handle(&mut self, event: Event) -> Result<(), AppError> {
        match event {
            Event::PositionAcquired(coords) => self.on_position(coords),
            Event::PositionFailed(reason) => self.on_position_failed(reason),
            Event::MapClicked(coords) => {
                self.on_map_click(coords);
                Ok(())
            }
            Event::TypeChanged => {
                self.on_type_changed();
                Ok(())
            }
            Event::FormSubmitted => self.submit(),
            Event::ListEntryClicked(id) => {
                self.on_list_click(&id);
                Ok(())
            }
            Event::Reset => self.reset(),
        }
    }

    pub fn on_position(&mut self, coords: Coords) -> Result<(), AppError> {
        if self.phase != Phase::AwaitingPosition {
            tracing::debug!(phase = ?self.phase, "Ignoring position outside of start-up");
            return Ok(());
        }
        if !coords.is_valid() {
            return self.on_position_failed(format!(
                "position out of range ({}, {})",
                coords.lat, coords.lng
            ));
        }

        tracing::info!(lat = coords.lat, lng = coords.lng, "Position acquired");
        self.map = Some(self.surface.create_map(coords, self.config.zoom));
        self.phase = Phase::MapReady {
            form: FormState::Hidden,
        };
        self.hydrate();
        Ok(())
    }

    pub fn on_position_failed(&mut self, reason: String) -> Result<(), AppError> {
        if self.phase != Phase::AwaitingPosition {
            return Ok(());
        }
        tracing::error!("Geolocation failed: {}", reason);
        self.phase = Phase::PositionUnavailable;
        let err = AppError::PositionUnavailable(reason);
        self.surface.notify(&err.to_string());
        Err(err)
    }

    /// Restores saved workouts into the store and renders them. Anything
    /// rendered before is cleared first, so running it twice is harmless.
    pub fn hydrate(&mut self) {
        self.clear_rendered();
        self.store.replace_all(self.persistence.load());
        let workouts = self.store.all().to_vec();
        for workout in &workouts {
            self.render(workout);
        }
        tracing::info!(count = workouts.len(), "Restored workouts");
    }

    pub fn on_map_click(&mut self, coords: Coords) {
        let Phase::MapReady { .. } = self.phase else {
            return;
        };
        if !coords.is_valid() {
            tracing::debug!(lat = coords.lat, lng = coords.lng, "Ignoring click outside the world");
            return;
        }
        self.phase = Phase::MapReady {
            form: FormState::Shown { pending: coords },
        };
        self.surface.show();
        self.surface.focus_distance();
    }

    pub fn on_type_changed(&mut self) {
        self.surface.toggle_type_fields();
    }

    pub fn submit(&mut self) -> Result<(), AppError> {
        let Phase::MapReady {
            form: FormState::Shown { pending },
        } = self.phase
        else {
            tracing::debug!("Submit with no open form");
            return Ok(());
        };

        let submission = match validate(&self.surface.values()) {
            Ok(submission) => submission,
            Err(e) => {
                tracing::debug!("Rejected submission: {}", e);
                self.surface.notify(&e.to_string());
                return Err(e.into());
            }
        };

        let workout = submission.into_workout(pending);
        tracing::info!(id = workout.id(), kind = %workout.kind(), "Logged workout");
        self.render(&workout);
        self.store.append(workout);

        self.surface.clear();
        self.surface.hide();
        self.surface.schedule_layout_restore(self.config.restore_delay);
        self.phase = Phase::MapReady {
            form: FormState::Hidden,
        };

        if let Err(e) = self.persistence.save(&self.store) {
            tracing::error!("Failed to save workouts: {}", e);
            let err = AppError::from(e);
            self.surface.notify(&err.to_string());
            return Err(err);
        }
        Ok(())
    }

    pub fn on_list_click(&mut self, id: &str) {
        let Some(map) = self.map else {
            return;
        };
        let Some(workout) = self.store.find_by_id(id) else {
            tracing::debug!(id, "List click for unknown workout");
            return;
        };
        let options = PanOptions {
            zoom: self.config.zoom,
            animate: true,
            duration: self.config.pan_duration,
        };
        self.surface.pan_to(map, workout.coords(), options);
    }

    /// Wipes saved workouts and starts the session over.
    pub fn reset(&mut self) -> Result<(), AppError> {
        tracing::info!("Resetting session");
        let cleared = self.persistence.clear();
        self.teardown();
        self.start();
        if let Err(e) = cleared {
            tracing::error!("Failed to clear saved workouts: {}", e);
            let err = AppError::from(e);
            self.surface.notify(&err.to_string());
            return Err(err);
        }
        Ok(())
    }

    /// Removes the map, the list and the in-memory store. Map clicks are
    /// ignored until a new position arrives.
    pub fn teardown(&mut self) {
        self.markers.clear();
        if let Some(map) = self.map.take() {
            self.surface.destroy_map(map);
        }
        self.surface.clear_entries();
        self.surface.clear();
        self.surface.hide();
        self.store.clear();
        self.phase = Phase::AwaitingPosition;
    }

    fn render(&mut self, workout: &Workout) {
        if let Some(map) = self.map {
            let marker = self.surface.add_marker(map, workout.coords());
            self.surface.bind_popup(marker, Popup::for_workout(workout));
            self.markers.insert(workout.id().to_string(), marker);
        } else {
            tracing::warn!(id = workout.id(), "No map to place marker on");
        }
        self.surface.render_entry(ListEntry::for_workout(workout));
    }

    fn clear_rendered(&mut self) {
        if let Some(map) = self.map {
            for (_, marker) in self.markers.drain() {
                self.surface.remove_marker(map, marker);
            }
        }
        self.surface.clear_entries();
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn store(&self) -> &WorkoutStore {
        &self.store
    }

    pub fn marker_for(&self, id: &str) -> Option<MarkerHandle> {
        self.markers.get(id).copied()
    }

    pub fn surface(&self) -> &U {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut U {
        &mut self.surface
    }

    pub fn persistence(&self) -> &Persistence<S> {
        &self.persistence
    }
}
