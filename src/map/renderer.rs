use glam::DVec2;

use crate::braille::BrailleCanvas;
use crate::map::geometry::{draw_circle, draw_line, draw_pin, draw_weighted_line, fill_polygon};
use crate::map::instance::Map;
use crate::map::layer::{GeoJsonLayer, Layer, Marker, Shape, StyledFeature};
use crate::map::legend::Legend;
use crate::map::projection::Viewport;
use crate::scale::Rgb;

/// A geographic line (sequence of lon/lat coordinates)
pub type LineString = Vec<(f64, f64)>;

/// Leaflet's default marker blue
pub const MARKER_COLOR: Rgb = Rgb::new(0x2a, 0x81, 0xcb);
const BASEMAP_COLOR: Rgb = Rgb::new(0x55, 0x66, 0x77);

/// Turns a [`Map`] into something a surface can display.
///
/// The map instance only holds data; backends decide how layers look.
pub trait MapRenderer {
    type Output;

    fn render(&self, map: &Map, viewport: &Viewport) -> Self::Output;
}

/// Display settings for map layers
#[derive(Clone, Debug)]
pub struct DisplaySettings {
    pub show_basemap: bool,
    pub show_overlays: bool,
    pub show_markers: bool,
    pub show_labels: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_basemap: true,
            show_overlays: true,
            show_markers: true,
            show_labels: true,
        }
    }
}

/// A popup placed in character coordinates of the map area
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedPopup {
    pub col: i32,
    pub row: i32,
    pub text: String,
}

/// Rendered output of [`BrailleRenderer`], composited back to front
pub struct MapLayers {
    pub basemap: BrailleCanvas,
    pub overlays: BrailleCanvas,
    pub markers: BrailleCanvas,
    /// Marker tooltips as (col, row, text)
    pub labels: Vec<(u16, u16, String)>,
    pub popup: Option<PlacedPopup>,
    pub legend: Option<Legend>,
    pub attribution: Option<String>,
}

/// Terminal backend drawing with Braille dots and colored cell backgrounds
pub struct BrailleRenderer {
    /// Outline stand-in for the raster tiles a terminal can't show
    pub basemap: Vec<LineString>,
    pub settings: DisplaySettings,
}

impl BrailleRenderer {
    pub fn new() -> Self {
        Self {
            basemap: Vec::new(),
            settings: DisplaySettings::default(),
        }
    }

    /// Add a basemap outline
    pub fn add_outline(&mut self, line: LineString) {
        self.basemap.push(line);
    }

    pub fn has_basemap(&self) -> bool {
        !self.basemap.is_empty()
    }

    pub fn toggle_basemap(&mut self) {
        self.settings.show_basemap = !self.settings.show_basemap;
    }

    pub fn toggle_overlays(&mut self) {
        self.settings.show_overlays = !self.settings.show_overlays;
    }

    pub fn toggle_markers(&mut self) {
        self.settings.show_markers = !self.settings.show_markers;
    }

    pub fn toggle_labels(&mut self) {
        self.settings.show_labels = !self.settings.show_labels;
    }

    /// Draw a linestring with viewport culling
    fn draw_linestring(&self, canvas: &mut BrailleCanvas, line: &LineString, viewport: &Viewport) {
        if line.len() < 2 {
            return;
        }

        let mut prev: Option<(i32, i32)> = None;

        for &(lon, lat) in line {
            let (px, py) = viewport.project(lon, lat);

            if let Some((prev_x, prev_y)) = prev {
                let dist = ((px - prev_x).abs() + (py - prev_y).abs()) as usize;
                if dist < viewport.width * 4
                    && viewport.line_might_be_visible((prev_x, prev_y), (px, py))
                {
                    draw_line(canvas, prev_x, prev_y, px, py);
                }
            }

            prev = Some((px, py));
        }
    }

    fn draw_overlay(&self, canvas: &mut BrailleCanvas, layer: &GeoJsonLayer, viewport: &Viewport) {
        for feature in layer.features() {
            if !feature_might_be_visible(feature, viewport) {
                continue;
            }
            let style = &feature.style;
            let fill = style.fill_color.over(Rgb::BLACK, style.fill_opacity);
            let stroke = style.color.over(Rgb::BLACK, style.opacity);

            for shape in &feature.shapes {
                match shape {
                    Shape::Polygon(rings) => {
                        let projected: Vec<Vec<DVec2>> = rings
                            .iter()
                            .map(|r| r.iter().map(|p| viewport.project_f(p.x, p.y)).collect())
                            .collect();
                        fill_polygon(canvas, &projected, fill);
                        canvas.set_pen(Some(stroke));
                        for ring in &projected {
                            stroke_path(canvas, ring, style.weight, style.dash_array);
                        }
                    }
                    Shape::Line(line) => {
                        let projected: Vec<DVec2> =
                            line.iter().map(|p| viewport.project_f(p.x, p.y)).collect();
                        canvas.set_pen(Some(stroke));
                        stroke_path(canvas, &projected, style.weight, style.dash_array);
                    }
                    Shape::Point(p) => {
                        let (px, py) = viewport.project(p.x, p.y);
                        canvas.set_pen(Some(fill));
                        draw_circle(canvas, px, py, 2);
                    }
                }
            }
        }
        canvas.set_pen(None);
    }

    fn draw_marker(
        &self,
        canvas: &mut BrailleCanvas,
        marker: &Marker,
        map: &Map,
        viewport: &Viewport,
        labels: &mut Vec<(u16, u16, String)>,
    ) {
        let (px, py) = viewport.project(marker.position.lng, marker.position.lat);
        if !viewport.is_visible(px, py) {
            return;
        }
        draw_pin(canvas, px, py);

        if !self.settings.show_labels || px < 0 || py < 0 {
            return;
        }
        if let Some(text) = marker.popup_text() {
            let (dx, _) = map.icon().tooltip_offset_cells();
            let col = (px / 2 + dx.max(1)) as u16;
            let row = (py / 4) as u16;
            labels.push((col, row, text.to_string()));
        }
    }
}

impl Default for BrailleRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MapRenderer for BrailleRenderer {
    type Output = MapLayers;

    /// Render all map layers to canvases sized to the viewport
    fn render(&self, map: &Map, viewport: &Viewport) -> MapLayers {
        // Braille gives 2x4 resolution per character
        let cols = viewport.width / 2;
        let rows = viewport.height / 4;
        let mut out = MapLayers {
            basemap: BrailleCanvas::new(cols, rows),
            overlays: BrailleCanvas::new(cols, rows),
            markers: BrailleCanvas::new(cols, rows),
            labels: Vec::new(),
            popup: None,
            legend: map.legend().cloned(),
            attribution: None,
        };

        if self.settings.show_basemap {
            out.basemap.set_pen(Some(BASEMAP_COLOR));
            for line in &self.basemap {
                self.draw_linestring(&mut out.basemap, line, viewport);
            }
        }

        out.markers.set_pen(Some(MARKER_COLOR));
        for (_, layer) in map.layers() {
            match layer {
                Layer::Tiles(tiles) => {
                    out.attribution = Some(tiles.config.plain_attribution());
                }
                Layer::GeoJson(overlay) if self.settings.show_overlays => {
                    self.draw_overlay(&mut out.overlays, overlay, viewport);
                }
                Layer::Marker(marker) if self.settings.show_markers => {
                    self.draw_marker(&mut out.markers, marker, map, viewport, &mut out.labels);
                }
                Layer::Markers(group) if self.settings.show_markers => {
                    for marker in group.markers() {
                        self.draw_marker(&mut out.markers, marker, map, viewport, &mut out.labels);
                    }
                }
                _ => {}
            }
        }

        if let Some(popup) = map.popup() {
            let (px, py) = viewport.project(popup.anchor.lng, popup.anchor.lat);
            let (dx, dy) = map.icon().popup_offset_cells();
            out.popup = Some(PlacedPopup {
                col: px / 2 + dx,
                row: py / 4 + dy,
                text: popup.text.clone(),
            });
        }

        out
    }
}

/// Stroke a projected path, carrying the dash phase across segments
fn stroke_path(canvas: &mut BrailleCanvas, path: &[DVec2], weight: u8, dash: Option<u32>) {
    let max = DVec2::new(canvas.width() as f64 * 2.0, canvas.height() as f64 * 4.0);
    let mut phase = 0;
    for pair in path.windows(2) {
        let Some((a, b)) = clip_segment(pair[0], pair[1], DVec2::splat(-2.0), max + 2.0) else {
            continue;
        };
        let a = (a.x as i32, a.y as i32);
        let b = (b.x as i32, b.y as i32);
        draw_weighted_line(canvas, a, b, weight, dash, &mut phase);
    }
}

/// Liang-Barsky clip of segment `a`-`b` to the rectangle `min`..`max`
fn clip_segment(a: DVec2, b: DVec2, min: DVec2, max: DVec2) -> Option<(DVec2, DVec2)> {
    let d = b - a;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    for (p, q) in [
        (-d.x, a.x - min.x),
        (d.x, max.x - a.x),
        (-d.y, a.y - min.y),
        (d.y, max.y - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((a + d * t0, a + d * t1))
}

fn feature_might_be_visible(feature: &StyledFeature, viewport: &Viewport) -> bool {
    let Some((min_lon, min_lat, max_lon, max_lat)) = feature.bbox() else {
        return false;
    };
    let (x0, y0) = viewport.project(min_lon, max_lat);
    let (x1, y1) = viewport.project(max_lon, min_lat);
    x1 >= 0 && x0 < viewport.width as i32 && y1 >= 0 && y0 < viewport.height as i32
}
