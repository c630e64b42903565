//! Application settings, stored as TOML in the platform config folder:
//! - macOS: ~/Library/Application Support/com.workout-mapper.Workout-Mapper/
//! - Windows: %APPDATA%\workout-mapper\Workout Mapper\config\
//! - Linux: ~/.config/workoutmapper/
//!
//! A missing or unparseable file gives the defaults.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::models::Coords;

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "workout-mapper";
const APP_NAME: &str = "Workout Mapper";
const CONFIG_FILENAME: &str = "settings.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_level: String,
    pub map: MapSettings,
    pub storage: StorageSettings,
    pub geolocation: GeolocationSettings,
    pub form: FormSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            map: MapSettings::default(),
            storage: StorageSettings::default(),
            geolocation: GeolocationSettings::default(),
            form: FormSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    pub zoom: u8,
    pub pan_duration_secs: f32,
    /// Tile source with `{z}`, `{x}` and `{y}` placeholders. Empty disables tiles.
    pub tile_url: String,
    pub tile_attribution: String,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            zoom: 13,
            pan_duration_secs: 1.0,
            tile_url: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            tile_attribution: "© OpenStreetMap contributors".to_string(),
        }
    }
}

impl MapSettings {
    const MAX_PAN_SECS: f32 = 10.0;

    /// Negative or NaN values mean no animation; very long pans are capped.
    pub fn pan_duration(&self) -> Duration {
        let secs = self.pan_duration_secs;
        if secs.is_nan() {
            return Duration::ZERO;
        }
        Duration::from_secs_f32(secs.clamp(0.0, Self::MAX_PAN_SECS))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Overrides the platform data directory.
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationSettings {
    pub endpoint: String,
    /// Used instead of a network lookup when set.
    pub fallback: Option<Coords>,
}

impl Default for GeolocationSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://ip-api.com/json".to_string(),
            fallback: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormSettings {
    pub restore_delay_ms: u64,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            restore_delay_ms: 1000,
        }
    }
}

impl FormSettings {
    pub fn restore_delay(&self) -> Duration {
        Duration::from_millis(self.restore_delay_ms)
    }
}

pub fn settings_path() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
}

pub fn load_settings() -> Settings {
    let Some(path) = settings_path() else {
        tracing::warn!("Could not determine settings path, using defaults");
        return Settings::default();
    };
    load_settings_from(&path)
}

pub fn load_settings_from(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                tracing::info!("Loaded settings from {:?}", path);
                settings
            }
            Err(e) => {
                tracing::warn!("Failed to parse settings file: {}, using defaults", e);
                Settings::default()
            }
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::info!("No settings file found at {:?}, using defaults", path);
            Settings::default()
        }
        Err(e) => {
            tracing::warn!("Failed to read settings file: {}, using defaults", e);
            Settings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerConfig;

    #[test]
    fn test_settings_round_trip() {
        let mut settings = Settings::default();
        settings.geolocation.fallback = Some(Coords::new(51.5, -0.12));
        let text = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(settings, parsed);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let parsed: Settings = toml::from_str("[map]\nzoom = 10\n").unwrap();
        assert_eq!(parsed.map.zoom, 10);
        assert_eq!(parsed.map.pan_duration_secs, 1.0);
        assert_eq!(parsed.form.restore_delay(), Duration::from_millis(1000));
        assert_eq!(parsed.geolocation.fallback, None);
    }

    #[test]
    fn test_pan_duration_is_clamped() {
        let parsed: Settings = toml::from_str("[map]\npan_duration_secs = inf\n").unwrap();
        assert_eq!(parsed.map.pan_duration(), Duration::from_secs(10));

        let parsed: Settings = toml::from_str("[map]\npan_duration_secs = nan\n").unwrap();
        assert_eq!(parsed.map.pan_duration(), Duration::ZERO);

        let parsed: Settings = toml::from_str("[map]\npan_duration_secs = -3.0\n").unwrap();
        assert_eq!(parsed.map.pan_duration(), Duration::ZERO);

        let parsed: Settings = toml::from_str("[map]\npan_duration_secs = 1e30\n").unwrap();
        assert_eq!(ControllerConfig::from(&parsed).pan_duration, Duration::from_secs(10));
    }

    #[test]
    fn test_fallback_reads_as_pair() {
        let parsed: Settings = toml::from_str("[geolocation]\nfallback = [48.85, 2.35]\n").unwrap();
        assert_eq!(parsed.geolocation.fallback, Some(Coords::new(48.85, 2.35)));
    }

    #[test]
    fn test_missing_or_broken_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.toml");
        assert_eq!(load_settings_from(&path), Settings::default());

        fs::write(&path, "map = ???").unwrap();
        assert_eq!(load_settings_from(&path), Settings::default());
    }
}
