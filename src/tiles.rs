//! Slippy-map tiles, downloaded off the UI thread and kept as textures.

use std::collections::{HashMap, HashSet};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use eframe::egui::{self, ColorImage, TextureHandle, TextureOptions};
use thiserror::Error;

use workout_mapper::settings::MapSettings;

const MAX_IN_FLIGHT: usize = 6;
const MAX_CACHED: usize = 256;

#[derive(Error, Debug)]
pub enum TileError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("could not decode tile: {0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    pub fn url(&self, template: &str) -> String {
        template
            .replace("{z}", &self.z.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }
}

enum Slot {
    Pending,
    Ready(TextureHandle),
    Failed,
}

type Delivery = (TileKey, Result<ColorImage, TileError>);

pub struct TileCache {
    template: Option<String>,
    attribution: String,
    client: reqwest::blocking::Client,
    slots: HashMap<TileKey, Slot>,
    in_flight: usize,
    tx: Sender<Delivery>,
    rx: Receiver<Delivery>,
}

impl TileCache {
    /// An empty `tile_url` turns tiles off.
    pub fn new(settings: &MapSettings) -> Result<Self, TileError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("workout-mapper/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()?;
        let template = Some(settings.tile_url.trim().to_string()).filter(|t| !t.is_empty());
        if template.is_none() {
            tracing::info!("No tile source configured, drawing a blank map");
        }
        let (tx, rx) = crossbeam_channel::unbounded();
        Ok(TileCache {
            template,
            attribution: settings.tile_attribution.clone(),
            client,
            slots: HashMap::new(),
            in_flight: 0,
            tx,
            rx,
        })
    }

    pub fn attribution(&self) -> Option<&str> {
        self.template
            .as_ref()
            .map(|_| self.attribution.as_str())
            .filter(|a| !a.is_empty())
    }

    /// Texture for `key`, starting a download the first time it is asked for.
    pub fn get(&mut self, ctx: &egui::Context, key: TileKey) -> Option<&TextureHandle> {
        if !self.slots.contains_key(&key) && self.in_flight < MAX_IN_FLIGHT {
            if let Some(url) = self.template.as_deref().map(|t| key.url(t)) {
                self.fetch(ctx, key, url);
            }
        }
        match self.slots.get(&key) {
            Some(Slot::Ready(texture)) => Some(texture),
            _ => None,
        }
    }

    fn fetch(&mut self, ctx: &egui::Context, key: TileKey, url: String) {
        self.slots.insert(key, Slot::Pending);
        self.in_flight += 1;
        let client = self.client.clone();
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        thread::spawn(move || {
            let result = download(&client, &url);
            if tx.send((key, result)).is_ok() {
                ctx.request_repaint();
            }
        });
    }

    /// Uploads finished downloads. Runs once per frame, before drawing.
    pub fn receive(&mut self, ctx: &egui::Context) {
        while let Ok((key, result)) = self.rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            let slot = match result {
                Ok(image) => {
                    let name = format!("tile-{}-{}-{}", key.z, key.x, key.y);
                    Slot::Ready(ctx.load_texture(name, image, TextureOptions::LINEAR))
                }
                Err(e) => {
                    tracing::warn!(z = key.z, x = key.x, y = key.y, "Tile failed: {}", e);
                    Slot::Failed
                }
            };
            self.slots.insert(key, slot);
        }
    }

    /// Forgets tiles outside `keep` once the cache has grown too large.
    pub fn prune(&mut self, keep: &HashSet<TileKey>) {
        if self.slots.len() > MAX_CACHED {
            self.slots
                .retain(|key, slot| keep.contains(key) || matches!(slot, Slot::Pending));
        }
    }
}

fn download(client: &reqwest::blocking::Client, url: &str) -> Result<ColorImage, TileError> {
    let bytes = client.get(url).send()?.error_for_status()?.bytes()?;
    decode(&bytes)
}

fn decode(bytes: &[u8]) -> Result<ColorImage, TileError> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    let size = [image.width() as usize, image.height() as usize];
    Ok(ColorImage::from_rgba_unmultiplied(size, image.as_raw()))
}
