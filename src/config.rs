use crate::geo::LatLng;

/// View center used by the demo binary and `MapOptions::default()`
pub const DEFAULT_CENTER: LatLng = LatLng::new(21.05, 92.29);

/// Web-map zoom level of the initial view
pub const DEFAULT_ZOOM: f64 = 11.0;

/// Marker icon assets and geometry, in CSS pixels.
///
/// Held by each map instance; nothing here is process-wide.
#[derive(Clone, Debug, PartialEq)]
pub struct IconConfig {
    pub icon_retina_url: String,
    pub icon_url: String,
    pub shadow_url: String,
    pub icon_size: (i32, i32),
    pub icon_anchor: (i32, i32),
    pub popup_anchor: (i32, i32),
    pub tooltip_anchor: (i32, i32),
    pub shadow_size: (i32, i32),
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            icon_retina_url: "./assets/marker-icon-2x.png".to_string(),
            icon_url: "./assets/marker-icon.png".to_string(),
            shadow_url: "./assets/marker-shadow.png".to_string(),
            icon_size: (20, 40),
            icon_anchor: (20, 40),
            popup_anchor: (1, -40),
            tooltip_anchor: (16, -40),
            shadow_size: (40, 40),
        }
    }
}

/// CSS pixels covered by one terminal cell, used to turn icon offsets into cells
pub const CELL_CSS_PX: (i32, i32) = (8, 16);

impl IconConfig {
    /// Popup offset from the marker's cell, in terminal cells
    pub fn popup_offset_cells(&self) -> (i32, i32) {
        css_to_cells(self.popup_anchor)
    }

    /// Tooltip offset from the marker's cell, in terminal cells
    pub fn tooltip_offset_cells(&self) -> (i32, i32) {
        css_to_cells(self.tooltip_anchor)
    }
}

fn css_to_cells((x, y): (i32, i32)) -> (i32, i32) {
    (x / CELL_CSS_PX.0, y / CELL_CSS_PX.1)
}

/// A slippy-map tile source.
#[derive(Clone, Debug, PartialEq)]
pub struct TileLayerConfig {
    /// Template with `{s}`, `{z}`, `{x}`, `{y}` placeholders
    pub url_template: String,
    pub subdomains: Vec<String>,
    /// HTML attribution required by the tile provider
    pub attribution: String,
}

impl Default for TileLayerConfig {
    fn default() -> Self {
        Self {
            url_template: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            subdomains: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            attribution: "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors"
                .to_string(),
        }
    }
}

impl TileLayerConfig {
    /// Expand the template for one tile, rotating subdomains by tile position
    pub fn url_for(&self, z: u32, x: u32, y: u32) -> String {
        let subdomain = if self.subdomains.is_empty() {
            ""
        } else {
            let idx = (x as usize + y as usize) % self.subdomains.len();
            self.subdomains[idx].as_str()
        };
        self.url_template
            .replace("{s}", subdomain)
            .replace("{z}", &z.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }

    /// Attribution with HTML tags stripped and `&copy;` decoded, for plain-text surfaces
    pub fn plain_attribution(&self) -> String {
        let mut out = String::with_capacity(self.attribution.len());
        let mut in_tag = false;
        for ch in self.attribution.chars() {
            match ch {
                '<' => in_tag = true,
                '>' => in_tag = false,
                _ if !in_tag => out.push(ch),
                _ => {}
            }
        }
        out.replace("&copy;", "©")
    }
}

/// Slippy-map tile index containing a point at an integer zoom level
pub fn tile_for(point: LatLng, z: u32) -> (u32, u32) {
    let n = 2f64.powi(z as i32);
    let lat_rad = point.lat.clamp(-85.0511, 85.0511).to_radians();
    let x = ((point.lng + 180.0) / 360.0 * n).floor();
    let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0 * n).floor();
    let max = n - 1.0;
    (x.clamp(0.0, max) as u32, y.clamp(0.0, max) as u32)
}

/// Everything a map instance needs at construction time
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapOptions {
    pub icon: IconConfig,
    pub tiles: TileLayerConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_defaults() {
        let icon = IconConfig::default();
        assert_eq!(icon.icon_size, (20, 40));
        assert_eq!(icon.popup_anchor, (1, -40));
        assert_eq!(icon.tooltip_anchor, (16, -40));
        assert_eq!(icon.shadow_size, (40, 40));
        assert_eq!(icon.popup_offset_cells(), (0, -2));
        assert_eq!(icon.tooltip_offset_cells(), (2, -2));
    }

    #[test]
    fn test_tile_url() {
        let tiles = TileLayerConfig::default();
        assert_eq!(
            tiles.url_for(11, 1549, 899),
            "https://a.tile.openstreetmap.org/11/1549/899.png"
        );
        assert_eq!(
            tiles.url_for(11, 1550, 899),
            "https://b.tile.openstreetmap.org/11/1550/899.png"
        );
    }

    #[test]
    fn test_plain_attribution() {
        let tiles = TileLayerConfig::default();
        assert_eq!(tiles.plain_attribution(), "© OpenStreetMap contributors");
    }

    #[test]
    fn test_tile_for_default_center() {
        assert_eq!(tile_for(LatLng::new(0.0, 0.0), 1), (1, 1));
        let (x, y) = tile_for(DEFAULT_CENTER, 11);
        assert_eq!(x, 1549);
        assert_eq!(y, 901);
    }
}
