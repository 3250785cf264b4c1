use glam::DVec2;
use std::f64::consts::PI;

use crate::geo::LatLng;

/// Braille pixels spanned by the whole world at zoom level 0.
/// A 256px web tile with one Braille dot standing in for 4 CSS pixels.
const WORLD_PX_AT_LEVEL_0: f64 = 64.0;

pub const MIN_LEVEL: f64 = 0.0;
pub const MAX_LEVEL: f64 = 19.0;

/// Viewport representing the visible map area and zoom level
#[derive(Clone, Debug)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (-85 to 85)
    pub center_lat: f64,
    /// Web-map zoom level (0 = whole world, each step doubles the scale)
    pub level: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, level: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat: center_lat.clamp(-85.0, 85.0),
            level: level.clamp(MIN_LEVEL, MAX_LEVEL),
            width,
            height,
        }
    }

    pub fn centered(center: LatLng, level: f64, width: usize, height: usize) -> Self {
        Self::new(center.lng, center.lat, level, width, height)
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(self.center_lat, self.center_lon)
    }

    /// Width of the whole world in pixels at the current level
    #[inline]
    fn world_px(&self) -> f64 {
        WORLD_PX_AT_LEVEL_0 * 2f64.powf(self.level)
    }

    /// Degrees of longitude covered by one pixel
    pub fn degrees_per_pixel(&self) -> f64 {
        360.0 / self.world_px()
    }

    /// Pan the viewport by pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let (cx, cy) = mercator(self.center_lon, self.center_lat);
        let world = self.world_px();
        let (lon, lat) = inverse_mercator(cx + dx as f64 / world, cy + dy as f64 / world);
        self.center_lon = lon;
        self.center_lat = lat;

        // Wrap longitude
        if self.center_lon > 180.0 {
            self.center_lon -= 360.0;
        } else if self.center_lon < -180.0 {
            self.center_lon += 360.0;
        }

        // Clamp latitude
        self.center_lat = self.center_lat.clamp(-85.0, 85.0);
    }

    /// Zoom in by one level
    pub fn zoom_in(&mut self) {
        self.level = (self.level + 1.0).min(MAX_LEVEL);
    }

    /// Zoom out by one level
    pub fn zoom_out(&mut self) {
        self.level = (self.level - 1.0).max(MIN_LEVEL);
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, -1.0);
    }

    /// Change level by `delta`, keeping the geographic point under (px, py) fixed
    fn zoom_at(&mut self, px: i32, py: i32, delta: f64) {
        let (lon, lat) = self.unproject(px, py);

        self.level = (self.level + delta).clamp(MIN_LEVEL, MAX_LEVEL);

        // Move center so (lon, lat) lands back under the cursor
        let world = self.world_px();
        let (x, y) = mercator(lon, lat);
        let cx = x - (px as f64 - self.width as f64 / 2.0) / world;
        let cy = y - (py as f64 - self.height as f64 / 2.0) / world;
        let (clon, clat) = inverse_mercator(cx, cy);
        self.center_lon = clon;
        self.center_lat = clat.clamp(-85.0, 85.0);
    }

    /// Convert pixel coordinates back to geographic coordinates (lon, lat)
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        let world = self.world_px();
        let (cx, cy) = mercator(self.center_lon, self.center_lat);
        let x = (px as f64 - self.width as f64 / 2.0) / world + cx;
        let y = (py as f64 - self.height as f64 / 2.0) / world + cy;
        inverse_mercator(x, y)
    }

    /// Project to sub-pixel coordinates
    pub fn project_f(&self, lon: f64, lat: f64) -> DVec2 {
        let world = self.world_px();
        let (x, y) = mercator(lon, lat);
        let (cx, cy) = mercator(self.center_lon, self.center_lat);
        DVec2::new(
            (x - cx) * world + self.width as f64 / 2.0,
            (y - cy) * world + self.height as f64 / 2.0,
        )
    }

    /// Project a geographic coordinate (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let p = self.project_f(lon, lat);
        (p.x as i32, p.y as i32)
    }

    /// Check if a projected point is visible in the viewport
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -10
            && px < self.width as i32 + 10
            && py >= -10
            && py < self.height as i32 + 10
    }

    /// Check if a line segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0
            && min_x < self.width as i32
            && max_y >= 0
            && min_y < self.height as i32
    }
}

/// Web Mercator, normalized to [0, 1] on both axes
#[inline]
fn mercator(lon: f64, lat: f64) -> (f64, f64) {
    let x = (lon + 180.0) / 360.0;
    let lat_rad = lat.clamp(-85.0511, 85.0511) * PI / 180.0;
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0;
    (x, y)
}

#[inline]
fn inverse_mercator(x: f64, y: f64) -> (f64, f64) {
    let lon = x * 360.0 - 180.0;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    (lon, lat_rad * 180.0 / PI)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_center() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        let (x, y) = vp.project(0.0, 0.0);
        assert_eq!(x, 50);
        assert_eq!(y, 50);
    }

    #[test]
    fn test_unproject_roundtrip() {
        let vp = Viewport::new(92.29, 21.05, 11.0, 200, 120);
        let (lon, lat) = vp.unproject(100, 60);
        assert!((lon - 92.29).abs() < 1e-3);
        assert!((lat - 21.05).abs() < 1e-3);
    }

    #[test]
    fn test_pan() {
        let mut vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        vp.pan(10, 0);
        assert!(vp.center_lon > 0.0);
        vp.pan(0, 10);
        assert!(vp.center_lat < 0.0);
    }

    #[test]
    fn test_zoom_clamps() {
        let mut vp = Viewport::new(0.0, 0.0, MAX_LEVEL, 100, 100);
        vp.zoom_in();
        assert_eq!(vp.level, MAX_LEVEL);
        let mut vp = Viewport::new(0.0, 0.0, MIN_LEVEL, 100, 100);
        vp.zoom_out();
        assert_eq!(vp.level, MIN_LEVEL);
    }

    #[test]
    fn test_zoom_at_keeps_point_fixed() {
        let mut vp = Viewport::new(92.29, 21.05, 10.0, 200, 120);
        let before = vp.unproject(40, 30);
        vp.zoom_in_at(40, 30);
        let after = vp.unproject(40, 30);
        assert_eq!(vp.level, 11.0);
        assert!((before.0 - after.0).abs() < 1e-3);
        assert!((before.1 - after.1).abs() < 1e-3);
    }
}
