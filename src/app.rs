use std::sync::mpsc::Receiver;

use health_map::config::tile_for;
use health_map::map::{BrailleRenderer, Viewport};
use health_map::{LatLng, MapEvent, MapView, DEFAULT_CENTER, DEFAULT_ZOOM};
use tracing::info;

/// Clicks this close to a marker (in Braille pixels) select it
const PICK_RADIUS_PX: f64 = 3.0;

/// Application state
pub struct App {
    pub view: MapView,
    pub viewport: Viewport,
    pub renderer: BrailleRenderer,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position for cursor marker
    pub mouse_pos: Option<(u16, u16)>,
    /// Whether the current left-button press has moved (drag, not click)
    dragged: bool,
    /// Last selection or popup event, shown in the status bar
    pub status: Option<String>,
    events: Receiver<MapEvent>,
}

impl App {
    pub fn new(mut view: MapView, renderer: BrailleRenderer, width: usize, height: usize) -> Self {
        let (center, zoom) = home(&view);
        let (pixel_width, pixel_height) = pixel_size(width, height);
        let events = view.subscribe();

        Self {
            view,
            viewport: Viewport::centered(center, zoom, pixel_width, pixel_height),
            renderer,
            should_quit: false,
            last_mouse: None,
            mouse_pos: None,
            dragged: false,
            status: None,
            events,
        }
    }

    /// Update viewport size when terminal resizes
    pub fn resize(&mut self, width: usize, height: usize) {
        let (pixel_width, pixel_height) = pixel_size(width, height);
        self.viewport.width = pixel_width;
        self.viewport.height = pixel_height;
    }

    /// Back to the map's initial center and zoom
    pub fn reset_view(&mut self) {
        let (center, zoom) = home(&self.view);
        self.viewport = Viewport::centered(center, zoom, self.viewport.width, self.viewport.height);
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    /// Zoom in towards a screen position (terminal column/row)
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        let (px, py) = screen_to_pixel(col, row);
        self.viewport.zoom_in_at(px, py);
    }

    /// Zoom out from a screen position (terminal column/row)
    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        let (px, py) = screen_to_pixel(col, row);
        self.viewport.zoom_out_at(px, py);
    }

    /// Esc closes an open popup first, then quits
    pub fn escape(&mut self) {
        let popup_open = self.view.map().is_some_and(|m| m.popup().is_some());
        if popup_open {
            self.view.close_popup();
        } else {
            self.quit();
        }
    }

    pub fn clear_overlays(&mut self) {
        self.view.clear_overlays();
        self.status = Some("overlays cleared".to_string());
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn zoom_level(&self) -> String {
        format!("z{:.0}", self.viewport.level)
    }

    /// Get current center coordinates as a string
    pub fn center_coords(&self) -> String {
        format!(
            "{:.3}°{}, {:.3}°{}",
            self.viewport.center_lat.abs(),
            if self.viewport.center_lat >= 0.0 { "N" } else { "S" },
            self.viewport.center_lon.abs(),
            if self.viewport.center_lon >= 0.0 { "E" } else { "W" }
        )
    }

    /// Web-map tile under the center, as `z/x/y`
    pub fn tile_label(&self) -> String {
        let z = self.viewport.level.round() as u32;
        let (x, y) = tile_for(self.viewport.center(), z);
        format!("{z}/{x}/{y}")
    }

    pub fn press(&mut self, col: u16, row: u16) {
        self.last_mouse = Some((col, row));
        self.dragged = false;
    }

    /// Pan by the mouse delta since the last drag event
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - x as i32;
            let dy = last_y as i32 - y as i32;
            // One terminal cell is 2x4 Braille pixels
            self.pan(dx * 2, dy * 4);
            self.dragged |= dx != 0 || dy != 0;
        }
        self.last_mouse = Some((x, y));
    }

    /// Button released: a press without movement is a click
    pub fn release(&mut self, col: u16, row: u16) {
        if self.last_mouse.is_some() && !self.dragged {
            self.click(col, row);
        }
        self.last_mouse = None;
        self.dragged = false;
    }

    /// Select whatever is under a screen position
    pub fn click(&mut self, col: u16, row: u16) {
        let (px, py) = screen_to_pixel(col, row);
        let (lng, lat) = self.viewport.unproject(px, py);
        let point = LatLng::new(lat, lng);
        let tolerance = self.viewport.degrees_per_pixel() * lat.to_radians().cos() * PICK_RADIUS_PX;
        self.view.pick(point, tolerance);
    }

    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
    }

    /// Get mouse position in braille pixel coordinates (for rendering marker)
    pub fn mouse_pixel_pos(&self) -> Option<(i32, i32)> {
        self.mouse_pos.map(|(col, row)| screen_to_pixel(col, row))
    }

    /// Drain map events into the status line
    pub fn poll_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            info!(?event, "map event");
            self.status = match event {
                MapEvent::MarkerSelected(sel) | MapEvent::FeatureSelected(sel) => {
                    Some(sel.popup().unwrap_or("(no details)").to_string())
                }
                MapEvent::PopupClosed => None,
            };
        }
    }
}

fn home(view: &MapView) -> (LatLng, f64) {
    view.map()
        .map(|m| (m.center(), m.zoom()))
        .unwrap_or((DEFAULT_CENTER, DEFAULT_ZOOM))
}

/// Braille pixel size of the map area inside the border and above the status bar
fn pixel_size(width: usize, height: usize) -> (usize, usize) {
    let inner_width = width.saturating_sub(2);
    let inner_height = height.saturating_sub(3);
    (inner_width * 2, inner_height * 4)
}

/// Terminal cell to Braille pixel, accounting for the 1-cell border
fn screen_to_pixel(col: u16, row: u16) -> (i32, i32) {
    let px = (col.saturating_sub(1) as i32) * 2;
    let py = (row.saturating_sub(1) as i32) * 4;
    (px, py)
}
