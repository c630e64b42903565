use std::f64::consts::PI;
use std::time::{Duration, Instant};

use std::collections::HashSet;

use eframe::egui::{self, Align2, Color32, FontId, Painter, Pos2, Rect, Stroke, Vec2};

use workout_mapper::models::{Coords, WorkoutType};
use workout_mapper::surface::{MarkerHandle, PanOptions, Popup};

use crate::tiles::{TileCache, TileKey};

const TILE_SIZE: f64 = 256.0;
const MAX_LAT: f64 = 85.051_128_78;
const MIN_ZOOM: f64 = 2.0;
const MAX_ZOOM: f64 = 20.0;

/// Web Mercator world pixel position at `zoom`.
pub fn project(c: Coords, zoom: f64) -> (f64, f64) {
    let scale = TILE_SIZE * 2f64.powf(zoom);
    let x = (c.lng + 180.0) / 360.0 * scale;
    let lat = c.lat.clamp(-MAX_LAT, MAX_LAT).to_radians();
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * scale;
    (x, y)
}

pub fn unproject(x: f64, y: f64, zoom: f64) -> Coords {
    let scale = TILE_SIZE * 2f64.powf(zoom);
    let lng = x / scale * 360.0 - 180.0;
    let n = PI - 2.0 * PI * y / scale;
    Coords::new(n.sinh().atan().to_degrees(), lng)
}

/// Brings a longitude back into [-180, 180).
pub fn wrap_lng(lng: f64) -> f64 {
    (lng + 180.0).rem_euclid(360.0) - 180.0
}

/// Marker and list accent for a workout type.
pub fn accent(kind: WorkoutType) -> Color32 {
    match kind {
        WorkoutType::Running => Color32::from_rgb(0, 196, 106),
        WorkoutType::Cycling => Color32::from_rgb(255, 181, 69),
    }
}

struct Marker {
    handle: MarkerHandle,
    coords: Coords,
    popup: Option<Popup>,
}

struct Pan {
    from: Coords,
    to: Coords,
    started: Instant,
    duration: Duration,
}

pub struct MapView {
    center: Coords,
    zoom: f64,
    markers: Vec<Marker>,
    pan: Option<Pan>,
}

impl MapView {
    pub fn new(center: Coords, zoom: u8) -> Self {
        MapView {
            center,
            zoom: f64::from(zoom).clamp(MIN_ZOOM, MAX_ZOOM),
            markers: Vec::new(),
            pan: None,
        }
    }

    pub fn center(&self) -> Coords {
        self.center
    }

    pub fn add_marker(&mut self, handle: MarkerHandle, coords: Coords) {
        self.markers.push(Marker {
            handle,
            coords,
            popup: None,
        });
    }

    pub fn bind_popup(&mut self, handle: MarkerHandle, popup: Popup) {
        if let Some(marker) = self.markers.iter_mut().find(|m| m.handle == handle) {
            marker.popup = Some(popup);
        }
    }

    pub fn remove_marker(&mut self, handle: MarkerHandle) {
        self.markers.retain(|m| m.handle != handle);
    }

    pub fn pan_to(&mut self, coords: Coords, options: PanOptions) {
        self.zoom = f64::from(options.zoom).clamp(MIN_ZOOM, MAX_ZOOM);
        if options.animate && !options.duration.is_zero() {
            self.pan = Some(Pan {
                from: self.center,
                to: coords,
                started: Instant::now(),
                duration: options.duration,
            });
        } else {
            self.pan = None;
            self.center = coords;
        }
    }

    pub fn is_animating(&self) -> bool {
        self.pan.is_some()
    }

    fn advance(&mut self, now: Instant) {
        let Some(pan) = &self.pan else {
            return;
        };
        let t = (now.duration_since(pan.started).as_secs_f64() / pan.duration.as_secs_f64()).min(1.0);
        let eased = 1.0 - (1.0 - t).powi(3);
        self.center = Coords::new(
            pan.from.lat + (pan.to.lat - pan.from.lat) * eased,
            pan.from.lng + (pan.to.lng - pan.from.lng) * eased,
        );
        if t >= 1.0 {
            self.pan = None;
        }
    }

    pub fn to_screen(&self, coords: Coords, rect: Rect) -> Pos2 {
        let (cx, cy) = project(self.center, self.zoom);
        let (x, y) = project(coords, self.zoom);
        let c = rect.center();
        Pos2::new(c.x + (x - cx) as f32, c.y + (y - cy) as f32)
    }

    pub fn to_coords(&self, pos: Pos2, rect: Rect) -> Coords {
        let (cx, cy) = project(self.center, self.zoom);
        let c = rect.center();
        let raw = unproject(cx + f64::from(pos.x - c.x), cy + f64::from(pos.y - c.y), self.zoom);
        Coords::new(raw.lat, wrap_lng(raw.lng))
    }

    /// Tiles covering `rect` at the current zoom, with where to draw each.
    /// Column indices wrap around the antimeridian.
    pub fn visible_tiles(&self, rect: Rect) -> Vec<(TileKey, Rect)> {
        let z = self.zoom.floor();
        let per_side = 1i64 << (z as u32);
        let tile_px = TILE_SIZE * 2f64.powf(self.zoom - z);
        let (cx, cy) = project(self.center, self.zoom);
        let c = rect.center();
        let (half_w, half_h) = (f64::from(rect.width()) / 2.0, f64::from(rect.height()) / 2.0);

        let x0 = ((cx - half_w) / tile_px).floor() as i64;
        let x1 = ((cx + half_w) / tile_px).floor() as i64;
        let y0 = (((cy - half_h) / tile_px).floor() as i64).max(0);
        let y1 = (((cy + half_h) / tile_px).floor() as i64).min(per_side - 1);

        let mut tiles = Vec::new();
        for ty in y0..=y1 {
            for tx in x0..=x1 {
                let min = Pos2::new(
                    c.x + (tx as f64 * tile_px - cx) as f32,
                    c.y + (ty as f64 * tile_px - cy) as f32,
                );
                let key = TileKey {
                    z: z as u8,
                    x: tx.rem_euclid(per_side) as u32,
                    y: ty as u32,
                };
                tiles.push((key, Rect::from_min_size(min, Vec2::splat(tile_px as f32))));
            }
        }
        tiles
    }

    fn drag(&mut self, delta: Vec2, rect: Rect) {
        self.pan = None;
        let c = rect.center();
        self.center = self.to_coords(c - delta, rect);
    }

    fn zoom_by(&mut self, steps: f64) {
        self.zoom = (self.zoom + steps).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Draws the map and returns the position of a click, if any.
    pub fn show(&mut self, ui: &mut egui::Ui, tiles: &mut TileCache) -> Option<Coords> {
        self.advance(Instant::now());

        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let rect = response.rect;

        if response.dragged() {
            self.drag(response.drag_delta(), rect);
        }
        if response.hovered() {
            let scroll = ui.input(|i| i.smooth_scroll_delta.y);
            if scroll != 0.0 {
                self.zoom_by(f64::from(scroll) / 120.0);
            }
        }

        painter.rect_filled(rect, 0.0, Color32::from_rgb(42, 49, 55));
        self.draw_tiles(ui.ctx(), &painter, rect, tiles);
        for marker in &self.markers {
            self.draw_marker(&painter, rect, marker);
        }
        painter.text(
            rect.right_bottom() + Vec2::new(-8.0, -6.0),
            Align2::RIGHT_BOTTOM,
            format!("{:.4}, {:.4}  z{:.1}", self.center.lat, self.center.lng, self.zoom),
            FontId::monospace(12.0),
            Color32::GRAY,
        );
        if let Some(attribution) = tiles.attribution() {
            painter.text(
                rect.left_bottom() + Vec2::new(8.0, -6.0),
                Align2::LEFT_BOTTOM,
                attribution,
                FontId::proportional(11.0),
                Color32::DARK_GRAY,
            );
        }

        if response.clicked() {
            return response
                .interact_pointer_pos()
                .map(|pos| self.to_coords(pos, rect));
        }
        None
    }

    fn draw_tiles(&self, ctx: &egui::Context, painter: &Painter, rect: Rect, tiles: &mut TileCache) {
        let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
        let visible = self.visible_tiles(rect);
        for (key, at) in &visible {
            if let Some(texture) = tiles.get(ctx, *key) {
                painter.image(texture.id(), *at, uv, Color32::WHITE);
            }
        }
        let keep: HashSet<TileKey> = visible.into_iter().map(|(key, _)| key).collect();
        tiles.prune(&keep);
    }

    fn draw_marker(&self, painter: &Painter, rect: Rect, marker: &Marker) {
        let pos = self.to_screen(marker.coords, rect);
        if !rect.expand(200.0).contains(pos) {
            return;
        }
        let accent = accent(marker.popup.as_ref().map_or(WorkoutType::Running, |p| p.kind));
        painter.circle_filled(pos, 7.0, accent);
        painter.circle_stroke(pos, 7.0, Stroke::new(2.0, Color32::WHITE));

        if let Some(popup) = &marker.popup {
            let galley = painter.layout(
                popup.content.clone(),
                FontId::proportional(14.0),
                Color32::WHITE,
                popup.style.max_width,
            );
            let width = galley.size().x.max(popup.style.min_width);
            let size = Vec2::new(width, galley.size().y) + Vec2::splat(16.0);
            let bubble = Rect::from_center_size(pos - Vec2::new(0.0, 14.0 + size.y / 2.0), size);
            painter.rect_filled(bubble, 5.0, Color32::from_rgb(45, 52, 57));
            painter.line_segment(
                [bubble.left_top(), bubble.left_bottom()],
                Stroke::new(5.0, accent),
            );
            painter.galley(bubble.left_top() + Vec2::splat(8.0), galley, Color32::WHITE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_round_trip() {
        let c = Coords::new(51.51, -0.13);
        let (x, y) = project(c, 13.0);
        let back = unproject(x, y, 13.0);
        assert!((back.lat - c.lat).abs() < 1e-9);
        assert!((back.lng - c.lng).abs() < 1e-9);
    }

    #[test]
    fn test_screen_round_trip() {
        let map = MapView::new(Coords::new(51.5, -0.12), 13);
        let rect = Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0));
        assert_eq!(map.to_screen(map.center(), rect), rect.center());

        let c = map.to_coords(Pos2::new(100.0, 50.0), rect);
        let p = map.to_screen(c, rect);
        assert!((p.x - 100.0).abs() < 0.01);
        assert!((p.y - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_pan_without_animation_jumps() {
        let mut map = MapView::new(Coords::new(0.0, 0.0), 5);
        let options = PanOptions {
            zoom: 13,
            animate: false,
            duration: Duration::from_secs(1),
        };
        map.pan_to(Coords::new(10.0, 10.0), options);
        assert_eq!(map.center(), Coords::new(10.0, 10.0));
        assert!(!map.is_animating());
    }

    #[test]
    fn test_animated_pan_settles() {
        let mut map = MapView::new(Coords::new(0.0, 0.0), 5);
        let options = PanOptions {
            zoom: 13,
            animate: true,
            duration: Duration::from_millis(10),
        };
        map.pan_to(Coords::new(10.0, 10.0), options);
        assert!(map.is_animating());
        map.advance(Instant::now() + Duration::from_secs(1));
        assert_eq!(map.center(), Coords::new(10.0, 10.0));
        assert!(!map.is_animating());
    }

    #[test]
    fn test_click_past_antimeridian_wraps() {
        let map = MapView::new(Coords::new(0.0, 170.0), 2);
        let rect = Rect::from_min_size(Pos2::ZERO, Vec2::new(900.0, 700.0));
        let c = map.to_coords(Pos2::new(890.0, 350.0), rect);
        assert!(c.is_valid());
        assert!(c.lng < 0.0);
        assert!((wrap_lng(200.0) + 160.0).abs() < 1e-9);
        assert!((wrap_lng(-190.0) - 170.0).abs() < 1e-9);
    }

    #[test]
    fn test_drag_keeps_center_in_range() {
        let mut map = MapView::new(Coords::new(0.0, 170.0), 2);
        let rect = Rect::from_min_size(Pos2::ZERO, Vec2::new(900.0, 700.0));
        for _ in 0..10 {
            map.drag(Vec2::new(-300.0, 0.0), rect);
        }
        assert!(map.center().is_valid());
    }

    #[test]
    fn test_visible_tiles_cover_view() {
        let map = MapView::new(Coords::new(0.0, 0.0), 2);
        let rect = Rect::from_min_size(Pos2::ZERO, Vec2::new(1024.0, 1024.0));
        let tiles = map.visible_tiles(rect);
        let keys: HashSet<TileKey> = tiles.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys.len(), 16);
        assert!(keys.iter().all(|k| k.z == 2 && k.x < 4 && k.y < 4));
        assert_eq!(tiles[0].1.min, Pos2::ZERO);
    }

    #[test]
    fn test_visible_tiles_wrap_columns() {
        let map = MapView::new(Coords::new(0.0, 170.0), 2);
        let rect = Rect::from_min_size(Pos2::ZERO, Vec2::new(900.0, 700.0));
        let tiles = map.visible_tiles(rect);
        assert!(tiles.iter().all(|(key, _)| key.x < 4));
        assert!(tiles.iter().any(|(key, _)| key.x == 0));
    }
}
