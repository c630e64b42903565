use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use eframe::{egui, App, CreationContext, Frame};
use egui::{Align, Color32, Layout, RichText, ScrollArea, Ui};

use workout_mapper::controller::{Controller, ControllerConfig, Event, FormState, Phase};
use workout_mapper::geolocation::Locator;
use workout_mapper::models::{Coords, WorkoutType};
use workout_mapper::storage::FileStore;
use workout_mapper::surface::{
    FormValues, Geolocation, ListEntry, MapHandle, MapService, MarkerHandle, Notifier, PanOptions,
    Popup, WorkoutForm, WorkoutList,
};

use crate::map_view::{accent, MapView};
use crate::tiles::TileCache;

#[derive(Default)]
struct FormView {
    visible: bool,
    values: FormValues,
    show_elevation: bool,
    focus_distance: bool,
    layout_ready_at: Option<Instant>,
}

impl FormView {
    fn layout_ready(&self, now: Instant) -> bool {
        self.layout_ready_at.map_or(true, |at| now >= at)
    }
}

/// egui rendition of the map, list, form and notices.
pub struct EguiSurface {
    locator: Locator,
    maps: HashMap<MapHandle, MapView>,
    tiles: TileCache,
    next_handle: u32,
    entries: Vec<ListEntry>,
    form: FormView,
    notices: Vec<String>,
}

impl EguiSurface {
    pub fn new(locator: Locator, tiles: TileCache) -> Self {
        EguiSurface {
            locator,
            maps: HashMap::new(),
            tiles,
            next_handle: 0,
            entries: Vec::new(),
            form: FormView::default(),
            notices: Vec::new(),
        }
    }

    fn next_id(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    fn is_animating(&self) -> bool {
        self.maps.values().any(MapView::is_animating)
    }
}

impl Geolocation for EguiSurface {
    fn request_position(&mut self) {
        self.locator.request();
    }
}

impl MapService for EguiSurface {
    fn create_map(&mut self, center: Coords, zoom: u8) -> MapHandle {
        let handle = MapHandle(self.next_id());
        self.maps.insert(handle, MapView::new(center, zoom));
        handle
    }

    fn add_marker(&mut self, map: MapHandle, coords: Coords) -> MarkerHandle {
        let marker = MarkerHandle(self.next_id());
        if let Some(view) = self.maps.get_mut(&map) {
            view.add_marker(marker, coords);
        }
        marker
    }

    fn bind_popup(&mut self, marker: MarkerHandle, popup: Popup) {
        for view in self.maps.values_mut() {
            view.bind_popup(marker, popup.clone());
        }
    }

    fn remove_marker(&mut self, map: MapHandle, marker: MarkerHandle) {
        if let Some(view) = self.maps.get_mut(&map) {
            view.remove_marker(marker);
        }
    }

    fn pan_to(&mut self, map: MapHandle, coords: Coords, options: PanOptions) {
        if let Some(view) = self.maps.get_mut(&map) {
            view.pan_to(coords, options);
        }
    }

    fn destroy_map(&mut self, map: MapHandle) {
        self.maps.remove(&map);
    }
}

impl WorkoutList for EguiSurface {
    fn render_entry(&mut self, entry: ListEntry) {
        self.entries.insert(0, entry);
    }

    fn clear_entries(&mut self) {
        self.entries.clear();
    }
}

impl WorkoutForm for EguiSurface {
    fn values(&self) -> FormValues {
        self.form.values.clone()
    }

    fn show(&mut self) {
        self.form.visible = true;
    }

    fn focus_distance(&mut self) {
        self.form.focus_distance = true;
    }

    fn hide(&mut self) {
        self.form.visible = false;
    }

    fn clear(&mut self) {
        let values = &mut self.form.values;
        values.distance.clear();
        values.duration.clear();
        values.cadence.clear();
        values.elevation.clear();
    }

    fn toggle_type_fields(&mut self) {
        self.form.show_elevation = !self.form.show_elevation;
    }

    fn schedule_layout_restore(&mut self, delay: Duration) {
        self.form.layout_ready_at = Some(Instant::now() + delay);
    }
}

impl Notifier for EguiSurface {
    fn notify(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}

impl EguiSurface {
    fn show_sidebar(&mut self, ui: &mut Ui, events: &mut Vec<Event>) {
        ui.add_space(10.0);
        ui.label(RichText::new("Workouts").heading().size(28.0).strong());
        ui.add_space(10.0);

        if self.form.visible && self.form.layout_ready(Instant::now()) {
            self.show_form(ui, events);
            ui.add_space(10.0);
        }

        ScrollArea::vertical()
            .max_height((ui.available_height() - 40.0).max(0.0))
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                for entry in &self.entries {
                    show_entry(ui, entry, events);
                    ui.add_space(6.0);
                }
            });

        ui.with_layout(Layout::bottom_up(Align::Center), |ui| {
            if ui.button("Reset").clicked() {
                events.push(Event::Reset);
            }
        });
    }

    fn show_form(&mut self, ui: &mut Ui, events: &mut Vec<Event>) {
        egui::Frame::group(ui.style()).show(ui, |ui| {
            egui::Grid::new("workout_form")
                .num_columns(2)
                .spacing([12.0, 8.0])
                .show(ui, |ui| {
                    let form = &mut self.form;
                    let before = form.values.kind;

                    ui.label("Type");
                    egui::ComboBox::from_id_salt("workout_type")
                        .selected_text(form.values.kind.label())
                        .show_ui(ui, |ui| {
                            ui.selectable_value(&mut form.values.kind, WorkoutType::Running, "Running");
                            ui.selectable_value(&mut form.values.kind, WorkoutType::Cycling, "Cycling");
                        });
                    if form.values.kind != before {
                        events.push(Event::TypeChanged);
                    }
                    ui.end_row();

                    ui.label("Distance");
                    let distance = ui.add(
                        egui::TextEdit::singleline(&mut form.values.distance).hint_text("km"),
                    );
                    if form.focus_distance {
                        distance.request_focus();
                        form.focus_distance = false;
                    }
                    ui.end_row();

                    ui.label("Duration");
                    ui.add(egui::TextEdit::singleline(&mut form.values.duration).hint_text("min"));
                    ui.end_row();

                    if form.show_elevation {
                        ui.label("Elev Gain");
                        ui.add(
                            egui::TextEdit::singleline(&mut form.values.elevation)
                                .hint_text("meters"),
                        );
                    } else {
                        ui.label("Cadence");
                        ui.add(
                            egui::TextEdit::singleline(&mut form.values.cadence)
                                .hint_text("step/min"),
                        );
                    }
                    ui.end_row();
                });

            let enter = ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("OK").clicked() || enter {
                events.push(Event::FormSubmitted);
            }
        });
    }

    fn show_map(&mut self, ui: &mut Ui, phase: Phase, events: &mut Vec<Event>) {
        let Some(view) = self.maps.values_mut().next() else {
            let message = match phase {
                Phase::PositionUnavailable => "No position found. Press Reset to try again.",
                _ => "Locating you...",
            };
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new(message).size(24.0));
            });
            return;
        };
        self.tiles.receive(ui.ctx());
        if let Some(coords) = view.show(ui, &mut self.tiles) {
            events.push(Event::MapClicked(coords));
        }
    }

    fn show_notices(&mut self, ctx: &egui::Context) {
        let Some(message) = self.notices.first().cloned() else {
            return;
        };
        let mut dismissed = false;
        egui::Window::new("Notice")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_TOP, [0.0, 40.0])
            .show(ctx, |ui| {
                ui.label(RichText::new(message).size(18.0));
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.notices.remove(0);
        }
    }
}

fn show_entry(ui: &mut Ui, entry: &ListEntry, events: &mut Vec<Event>) {
    let response = egui::Frame::group(ui.style())
        .stroke(egui::Stroke::new(2.0, accent(entry.kind)))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.label(RichText::new(&entry.title).size(20.0).strong());
            ui.horizontal_wrapped(|ui| {
                for detail in &entry.details {
                    ui.label(format!("{} ", detail.icon));
                    ui.label(RichText::new(&detail.value).strong());
                    ui.label(RichText::new(detail.unit).small().color(Color32::GRAY));
                    ui.add_space(10.0);
                }
            });
        })
        .response
        .interact(egui::Sense::click());
    if response.clicked() {
        events.push(Event::ListEntryClicked(entry.id.clone()));
    }
}

pub struct WorkoutApp {
    controller: Controller<EguiSurface, FileStore>,
    events: Receiver<Event>,
}

impl WorkoutApp {
    pub fn new(
        _cc: &CreationContext,
        surface: EguiSurface,
        storage: FileStore,
        config: ControllerConfig,
        events: Receiver<Event>,
    ) -> Self {
        tracing::info!("Storing workouts in {:?}", storage.dir());
        let mut controller = Controller::new(surface, storage, config);
        controller.start();
        WorkoutApp { controller, events }
    }

    fn dispatch(&mut self, event: Event) {
        if let Err(e) = self.controller.handle(event) {
            tracing::debug!("Event not applied: {}", e);
        }
    }
}

impl App for WorkoutApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        while let Ok(event) = self.events.try_recv() {
            self.dispatch(event);
        }

        let phase = self.controller.phase();
        let mut events = Vec::new();

        egui::SidePanel::left("sidebar")
            .resizable(false)
            .exact_width(380.0)
            .show(ctx, |ui| {
                self.controller.surface_mut().show_sidebar(ui, &mut events);
            });
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.controller.surface_mut().show_map(ui, phase, &mut events);
            });
        self.controller.surface_mut().show_notices(ctx);

        for event in events {
            self.dispatch(event);
        }

        let waiting_on_form = matches!(
            self.controller.phase(),
            Phase::MapReady {
                form: FormState::Shown { .. }
            }
        );
        if phase == Phase::AwaitingPosition || waiting_on_form || self.controller.surface().is_animating() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }
    }
}
