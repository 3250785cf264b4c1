use geojson::{Feature, Geometry, JsonObject, Value};
use glam::DVec2;

use crate::config::TileLayerConfig;
use crate::geo::LatLng;
use crate::map::geometry::point_in_rings;
use crate::map::spatial::{BBox, FeatureGrid, SpatialGrid};
use crate::scale::Rgb;

/// Marker index cell size in degrees (~5km)
const MARKER_CELL_DEG: f64 = 0.05;
/// Feature index cell size in degrees (~11km)
const FEATURE_CELL_DEG: f64 = 0.1;

/// Handle of a layer attached to a [`crate::map::Map`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub(crate) u64);

/// Text shown when a marker or feature is selected
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Popup {
    pub text: String,
}

impl Popup {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A point marker drawn with the map's icon
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub position: LatLng,
    pub popup: Option<Popup>,
}

impl Marker {
    pub fn new(position: LatLng) -> Self {
        Self {
            position,
            popup: None,
        }
    }

    pub fn with_popup(mut self, text: impl Into<String>) -> Self {
        self.popup = Some(Popup::new(text));
        self
    }

    pub fn popup_text(&self) -> Option<&str> {
        self.popup.as_ref().map(|p| p.text.as_str())
    }
}

/// A group of markers attached and detached as one unit
#[derive(Clone, Debug)]
pub struct LayerGroup {
    markers: SpatialGrid<Marker>,
}

impl LayerGroup {
    pub fn new() -> Self {
        Self {
            markers: SpatialGrid::new(MARKER_CELL_DEG),
        }
    }

    pub fn push(&mut self, marker: Marker) {
        self.markers.insert(marker.position, marker);
    }

    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&Marker> {
        self.markers.get(idx)
    }

    /// Marker closest to `point` within `tolerance_deg`
    pub fn nearest(&self, point: LatLng, tolerance_deg: f64) -> Option<usize> {
        self.markers.nearest(point, tolerance_deg)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

impl Default for LayerGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Marker> for LayerGroup {
    fn from_iter<I: IntoIterator<Item = Marker>>(iter: I) -> Self {
        let mut group = Self::new();
        for marker in iter {
            group.push(marker);
        }
        group
    }
}

/// Stroke and fill options for a vector shape
#[derive(Clone, Debug, PartialEq)]
pub struct PathStyle {
    pub fill_color: Rgb,
    /// Stroke width in pixels
    pub weight: u8,
    /// Stroke opacity
    pub opacity: f64,
    /// Stroke color
    pub color: Rgb,
    /// Dash length in pixels; `None` draws a solid stroke
    pub dash_array: Option<u32>,
    pub fill_opacity: f64,
}

/// A geometry flattened to lon/lat vertices (x = lng, y = lat)
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// Exterior ring followed by holes
    Polygon(Vec<Vec<DVec2>>),
    Line(Vec<DVec2>),
    Point(DVec2),
}

impl Shape {
    /// Flatten a GeoJSON geometry into shapes
    pub fn collect(geometry: &Geometry, out: &mut Vec<Shape>) {
        fn ring(coords: &[Vec<f64>]) -> Vec<DVec2> {
            coords
                .iter()
                .filter(|c| c.len() >= 2)
                .map(|c| DVec2::new(c[0], c[1]))
                .collect()
        }

        match &geometry.value {
            Value::Point(c) if c.len() >= 2 => out.push(Shape::Point(DVec2::new(c[0], c[1]))),
            Value::MultiPoint(points) => {
                out.extend(
                    points
                        .iter()
                        .filter(|c| c.len() >= 2)
                        .map(|c| Shape::Point(DVec2::new(c[0], c[1]))),
                );
            }
            Value::LineString(coords) => out.push(Shape::Line(ring(coords))),
            Value::MultiLineString(lines) => {
                out.extend(lines.iter().map(|l| Shape::Line(ring(l))));
            }
            Value::Polygon(rings) => {
                out.push(Shape::Polygon(rings.iter().map(|r| ring(r)).collect()));
            }
            Value::MultiPolygon(polygons) => {
                for rings in polygons {
                    out.push(Shape::Polygon(rings.iter().map(|r| ring(r)).collect()));
                }
            }
            Value::GeometryCollection(geometries) => {
                for g in geometries {
                    Shape::collect(g, out);
                }
            }
            _ => {}
        }
    }

    fn vertices(&self) -> Box<dyn Iterator<Item = &DVec2> + '_> {
        match self {
            Shape::Polygon(rings) => Box::new(rings.iter().flatten()),
            Shape::Line(line) => Box::new(line.iter()),
            Shape::Point(p) => Box::new(std::iter::once(p)),
        }
    }
}

/// One feature of a GeoJSON overlay with its resolved style and popup
#[derive(Clone, Debug)]
pub struct StyledFeature {
    pub shapes: Vec<Shape>,
    pub properties: Option<JsonObject>,
    pub style: PathStyle,
    pub popup: Option<Popup>,
}

impl StyledFeature {
    pub fn new(feature: &Feature, style: PathStyle, popup: Option<Popup>) -> Self {
        let mut shapes = Vec::new();
        if let Some(geometry) = &feature.geometry {
            Shape::collect(geometry, &mut shapes);
        }
        Self {
            shapes,
            properties: feature.properties.clone(),
            style,
            popup,
        }
    }

    pub fn bbox(&self) -> Option<BBox> {
        let mut vertices = self.shapes.iter().flat_map(Shape::vertices).peekable();
        vertices.peek()?;
        Some(vertices.fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
        ))
    }

    /// Whether a point falls inside one of this feature's polygons
    pub fn contains(&self, point: LatLng) -> bool {
        let p = DVec2::new(point.lng, point.lat);
        self.shapes.iter().any(|shape| match shape {
            Shape::Polygon(rings) => point_in_rings(rings, p),
            _ => false,
        })
    }
}

/// A rendered GeoJSON collection
#[derive(Clone, Debug)]
pub struct GeoJsonLayer {
    features: Vec<StyledFeature>,
    index: FeatureGrid,
}

impl GeoJsonLayer {
    pub fn new(features: Vec<StyledFeature>) -> Self {
        let index = FeatureGrid::build(features.iter().map(StyledFeature::bbox), FEATURE_CELL_DEG);
        Self { features, index }
    }

    pub fn features(&self) -> &[StyledFeature] {
        &self.features
    }

    /// Topmost (last drawn) feature containing `point`
    pub fn hit_test(&self, point: LatLng) -> Option<usize> {
        self.index
            .query_point(point)
            .into_iter()
            .rev()
            .find(|&idx| self.features[idx].contains(point))
    }
}

/// Base tile layer descriptor
#[derive(Clone, Debug, PartialEq)]
pub struct TileLayer {
    pub config: TileLayerConfig,
}

/// Anything attachable to a map
#[derive(Clone, Debug)]
pub enum Layer {
    Tiles(TileLayer),
    Marker(Marker),
    Markers(LayerGroup),
    GeoJson(GeoJsonLayer),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn style() -> PathStyle {
        PathStyle {
            fill_color: Rgb::BLACK,
            weight: 2,
            opacity: 1.0,
            color: Rgb::WHITE,
            dash_array: Some(3),
            fill_opacity: 0.9,
        }
    }

    fn square_feature(x0: f64, y0: f64, size: f64) -> Feature {
        serde_json::from_value(json!({
            "type": "Feature",
            "properties": {},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[x0, y0], [x0 + size, y0], [x0 + size, y0 + size], [x0, y0 + size], [x0, y0]]]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_layer_group_collects_markers() {
        let group: LayerGroup = vec![
            Marker::new(LatLng::new(21.0, 92.0)).with_popup("A"),
            Marker::new(LatLng::new(21.2, 92.2)),
        ]
        .into_iter()
        .collect();
        assert_eq!(group.len(), 2);
        assert_eq!(group.get(0).and_then(Marker::popup_text), Some("A"));
        assert_eq!(group.get(1).and_then(Marker::popup_text), None);
        assert_eq!(group.nearest(LatLng::new(21.2, 92.2), 0.01), Some(1));
    }

    #[test]
    fn test_shapes_from_multipolygon() {
        let geometry: Geometry = serde_json::from_value(json!({
            "type": "MultiPolygon",
            "coordinates": [
                [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                [[[2.0, 2.0], [3.0, 2.0], [3.0, 3.0], [2.0, 2.0]]]
            ]
        }))
        .unwrap();
        let mut shapes = Vec::new();
        Shape::collect(&geometry, &mut shapes);
        assert_eq!(shapes.len(), 2);
        assert!(matches!(&shapes[0], Shape::Polygon(rings) if rings[0].len() == 4));
    }

    #[test]
    fn test_feature_bbox_and_contains() {
        let f = StyledFeature::new(&square_feature(92.0, 21.0, 0.5), style(), None);
        assert_eq!(f.bbox(), Some((92.0, 21.0, 92.5, 21.5)));
        assert!(f.contains(LatLng::new(21.25, 92.25)));
        assert!(!f.contains(LatLng::new(21.25, 93.0)));
    }

    #[test]
    fn test_feature_without_geometry() {
        let feature: Feature =
            serde_json::from_value(json!({"type": "Feature", "properties": null, "geometry": null}))
                .unwrap();
        let f = StyledFeature::new(&feature, style(), None);
        assert!(f.shapes.is_empty());
        assert_eq!(f.bbox(), None);
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let layer = GeoJsonLayer::new(vec![
            StyledFeature::new(&square_feature(92.0, 21.0, 1.0), style(), None),
            StyledFeature::new(&square_feature(92.2, 21.2, 0.2), style(), None),
        ]);
        assert_eq!(layer.hit_test(LatLng::new(21.3, 92.3)), Some(1));
        assert_eq!(layer.hit_test(LatLng::new(21.8, 92.8)), Some(0));
        assert_eq!(layer.hit_test(LatLng::new(25.0, 95.0)), None);
    }
}
