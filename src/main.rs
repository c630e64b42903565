use std::path::PathBuf;

use eframe::egui;
use tracing_subscriber::EnvFilter;

use workout_mapper::controller::ControllerConfig;
use workout_mapper::geolocation::{source_from_settings, Locator};
use workout_mapper::settings::load_settings;
use workout_mapper::storage::{default_data_dir, FileStore};

mod app;
mod map_view;
mod tiles;

use app::{EguiSurface, WorkoutApp};
use tiles::TileCache;

fn main() -> Result<(), eframe::Error> {
    // Settings pick the log level, so their own diagnostics go through a
    // bootstrap subscriber.
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    let settings = tracing::subscriber::with_default(bootstrap, load_settings);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .init();

    let data_dir = settings
        .storage
        .data_dir
        .clone()
        .or_else(default_data_dir)
        .unwrap_or_else(|| PathBuf::from("data"));
    let storage = FileStore::new(data_dir);
    let config = ControllerConfig::from(&settings);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Workout Mapper")
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([900.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Workout Mapper",
        options,
        Box::new(move |cc| {
            let (tx, rx) = crossbeam_channel::unbounded();
            let source = source_from_settings(&settings.geolocation)?;
            let tiles = TileCache::new(&settings.map)?;
            let surface = EguiSurface::new(Locator::new(source, tx), tiles);
            Ok(Box::new(WorkoutApp::new(cc, surface, storage, config, rx)))
        }),
    )
}
