//! Recording stand-ins for the map, list, form and storage.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use workout_mapper::controller::{Controller, ControllerConfig};
use workout_mapper::error::StorageError;
use workout_mapper::models::{Coords, WorkoutType};
use workout_mapper::storage::{KeyValueStore, MemoryStore};
use workout_mapper::surface::{
    FormValues, Geolocation, ListEntry, MapHandle, MapService, MarkerHandle, Notifier, PanOptions,
    Popup, WorkoutForm, WorkoutList,
};

#[derive(Debug, Default)]
pub struct FakeSurface {
    next_handle: u32,
    pub position_requests: usize,
    pub created_maps: Vec<(MapHandle, Coords, u8)>,
    pub live_map: Option<MapHandle>,
    pub markers: Vec<(MarkerHandle, Coords)>,
    pub popups: HashMap<MarkerHandle, Popup>,
    pub pans: Vec<(MapHandle, Coords, PanOptions)>,
    pub entries: Vec<ListEntry>,
    pub form_visible: bool,
    pub distance_focused: bool,
    pub values: FormValues,
    pub show_elevation: bool,
    pub restore_delays: Vec<Duration>,
    pub notices: Vec<String>,
}

impl FakeSurface {
    fn next(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    pub fn fill(&mut self, kind: WorkoutType, distance: &str, duration: &str, extra: &str) {
        self.values = FormValues {
            kind,
            distance: distance.to_string(),
            duration: duration.to_string(),
            cadence: String::new(),
            elevation: String::new(),
        };
        match kind {
            WorkoutType::Running => self.values.cadence = extra.to_string(),
            WorkoutType::Cycling => self.values.elevation = extra.to_string(),
        }
    }
}

impl Geolocation for FakeSurface {
    fn request_position(&mut self) {
        self.position_requests += 1;
    }
}

impl MapService for FakeSurface {
    fn create_map(&mut self, center: Coords, zoom: u8) -> MapHandle {
        let handle = MapHandle(self.next());
        self.created_maps.push((handle, center, zoom));
        self.live_map = Some(handle);
        handle
    }

    fn add_marker(&mut self, map: MapHandle, coords: Coords) -> MarkerHandle {
        assert_eq!(self.live_map, Some(map), "marker added to a dead map");
        let marker = MarkerHandle(self.next());
        self.markers.push((marker, coords));
        marker
    }

    fn bind_popup(&mut self, marker: MarkerHandle, popup: Popup) {
        self.popups.insert(marker, popup);
    }

    fn remove_marker(&mut self, _map: MapHandle, marker: MarkerHandle) {
        self.markers.retain(|(m, _)| *m != marker);
        self.popups.remove(&marker);
    }

    fn pan_to(&mut self, map: MapHandle, coords: Coords, options: PanOptions) {
        self.pans.push((map, coords, options));
    }

    fn destroy_map(&mut self, map: MapHandle) {
        if self.live_map == Some(map) {
            self.live_map = None;
            self.markers.clear();
            self.popups.clear();
        }
    }
}

impl WorkoutList for FakeSurface {
    fn render_entry(&mut self, entry: ListEntry) {
        self.entries.insert(0, entry);
    }

    fn clear_entries(&mut self) {
        self.entries.clear();
    }
}

impl WorkoutForm for FakeSurface {
    fn values(&self) -> FormValues {
        self.values.clone()
    }

    fn show(&mut self) {
        self.form_visible = true;
    }

    fn focus_distance(&mut self) {
        self.distance_focused = true;
    }

    fn hide(&mut self) {
        self.form_visible = false;
        self.distance_focused = false;
    }

    fn clear(&mut self) {
        self.values.distance.clear();
        self.values.duration.clear();
        self.values.cadence.clear();
        self.values.elevation.clear();
    }

    fn toggle_type_fields(&mut self) {
        self.show_elevation = !self.show_elevation;
    }

    fn schedule_layout_restore(&mut self, delay: Duration) {
        self.restore_delays.push(delay);
    }
}

impl Notifier for FakeSurface {
    fn notify(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}

/// Storage whose writes always fail.
#[derive(Debug, Default)]
pub struct ReadOnlyStore {
    pub inner: MemoryStore,
}

impl KeyValueStore for ReadOnlyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Io {
            path: PathBuf::from(format!("{key}.json")),
            source: std::io::Error::new(std::io::ErrorKind::Other, "quota exceeded"),
        })
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }
}

pub fn london() -> Coords {
    Coords::new(51.5, -0.12)
}

pub fn controller_with(storage: MemoryStore) -> Controller<FakeSurface, MemoryStore> {
    Controller::new(FakeSurface::default(), storage, ControllerConfig::default())
}

/// A controller that has its position and an empty map.
pub fn ready_controller() -> Controller<FakeSurface, MemoryStore> {
    let mut controller = controller_with(MemoryStore::new());
    controller.start();
    controller.on_position(london()).unwrap();
    controller
}
