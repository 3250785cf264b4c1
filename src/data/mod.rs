use std::fs;
use std::path::Path;

use geojson::{FeatureCollection, GeoJson, Geometry, Value};
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::choropleth::NAME_PROPERTY;
use crate::error::{MapError, Result};
use crate::geo::Location;
use crate::map::{BrailleRenderer, LineString};

fn parse_geojson(path: &Path) -> Result<GeoJson> {
    // simd-json parses in place
    let mut bytes = fs::read(path)?;
    let geojson: GeoJson = simd_json::serde::from_slice(&mut bytes)?;
    Ok(geojson)
}

/// Load a GeoJSON FeatureCollection for use as a choropleth overlay
pub fn load_feature_collection(path: &Path) -> Result<FeatureCollection> {
    match parse_geojson(path)? {
        GeoJson::FeatureCollection(fc) => {
            info!(path = %path.display(), features = fc.features.len(), "feature collection loaded");
            Ok(fc)
        }
        _ => Err(MapError::NotAFeatureCollection),
    }
}

/// Load health locations from a JSON array of
/// `{"name": ..., "latitude": ..., "longitude": ...}` objects.
///
/// Entries that don't fit that shape are skipped with a warning.
pub fn load_locations(path: &Path) -> Result<Vec<Location>> {
    let mut bytes = fs::read(path)?;
    let value: JsonValue = simd_json::serde::from_slice(&mut bytes)?;
    let entries = match value {
        JsonValue::Array(entries) => entries,
        other => {
            warn!(path = %path.display(), kind = json_kind(&other), "locations file is not an array");
            return Ok(Vec::new());
        }
    };

    let total = entries.len();
    let locations: Vec<Location> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(idx, entry)| match serde_json::from_value::<Location>(entry) {
            Ok(loc) => Some(loc),
            Err(e) => {
                warn!(idx, error = %e, "malformed location skipped");
                None
            }
        })
        .collect();

    info!(path = %path.display(), loaded = locations.len(), total, "locations loaded");
    Ok(locations)
}

/// Load locations from the Point features of a GeoJSON FeatureCollection,
/// named by their `name` property
pub fn load_point_locations(path: &Path) -> Result<Vec<Location>> {
    let fc = load_feature_collection(path)?;
    Ok(point_locations(&fc))
}

fn point_locations(fc: &FeatureCollection) -> Vec<Location> {
    let mut skipped = 0usize;
    let locations: Vec<Location> = fc
        .features
        .iter()
        .filter_map(|feature| {
            let name = feature
                .properties
                .as_ref()
                .and_then(|p| p.get(NAME_PROPERTY))
                .and_then(JsonValue::as_str)
                .unwrap_or_default();

            match feature.geometry.as_ref().map(|g| &g.value) {
                Some(Value::Point(c)) if c.len() >= 2 => Some(Location::new(name, c[1], c[0])),
                _ => {
                    skipped += 1;
                    None
                }
            }
        })
        .collect();

    if skipped > 0 {
        warn!(skipped, "non-point features skipped");
    }
    locations
}

/// Load basemap outlines (coastlines, admin boundaries) into the renderer.
/// Returns the number of lines added.
pub fn load_basemap(renderer: &mut BrailleRenderer, path: &Path) -> Result<usize> {
    let geojson = parse_geojson(path)?;
    let mut count = 0;
    process_geojson_lines(&geojson, |line| {
        renderer.add_outline(line);
        count += 1;
    });
    debug!(path = %path.display(), lines = count, "basemap loaded");
    Ok(count)
}

/// Process GeoJSON and extract line features
fn process_geojson_lines<F>(geojson: &GeoJson, mut add_line: F)
where
    F: FnMut(LineString),
{
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(ref geometry) = feature.geometry {
                    process_geometry_lines(geometry, &mut add_line);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(ref geometry) = f.geometry {
                process_geometry_lines(geometry, &mut add_line);
            }
        }
        GeoJson::Geometry(geometry) => {
            process_geometry_lines(geometry, &mut add_line);
        }
    }
}

fn to_line(coords: &[Vec<f64>]) -> LineString {
    coords
        .iter()
        .filter(|c| c.len() >= 2)
        .map(|c| (c[0], c[1]))
        .collect()
}

fn process_geometry_lines<F>(geometry: &Geometry, add_line: &mut F)
where
    F: FnMut(LineString),
{
    match &geometry.value {
        Value::LineString(coords) => add_line(to_line(coords)),
        Value::MultiLineString(lines) => {
            for coords in lines {
                add_line(to_line(coords));
            }
        }
        // Every ring, so district holes show up as outlines too
        Value::Polygon(rings) => {
            for ring in rings {
                add_line(to_line(ring));
            }
        }
        Value::MultiPolygon(polygons) => {
            for ring in polygons.iter().flatten() {
                add_line(to_line(ring));
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                process_geometry_lines(g, add_line);
            }
        }
        _ => {}
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Write `contents` to a per-test temp file
    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("health-map-{}-{name}", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_feature_collection() {
        let path = temp_file(
            "districts.geojson",
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {"name": "Ukhia", "numbars": 4},
                 "geometry": {"type": "Polygon", "coordinates": [[[92.0, 21.0], [92.1, 21.0], [92.1, 21.1], [92.0, 21.0]]]}}
            ]}"#,
        );
        let fc = load_feature_collection(&path).unwrap();
        assert_eq!(fc.features.len(), 1);
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_feature_collection_rejects_other_geojson() {
        let path = temp_file("point.geojson", r#"{"type": "Point", "coordinates": [92.0, 21.0]}"#);
        assert!(matches!(load_feature_collection(&path), Err(MapError::NotAFeatureCollection)));
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_feature_collection_errors() {
        let missing = std::env::temp_dir().join("health-map-does-not-exist.geojson");
        assert!(matches!(load_feature_collection(&missing), Err(MapError::Io(_))));

        let path = temp_file("broken.geojson", "{not json");
        assert!(matches!(load_feature_collection(&path), Err(MapError::Json(_))));
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_locations_skips_malformed() {
        let path = temp_file(
            "locations.json",
            r#"[
                {"name": "Kutupalong", "latitude": 21.21, "longitude": 92.16},
                {"name": "No coords"},
                {"name": "Bad lat", "latitude": "north", "longitude": 92.0},
                {"name": "Teknaf", "latitude": 20.86, "longitude": 92.30}
            ]"#,
        );
        let locations = load_locations(&path).unwrap();
        assert_eq!(
            locations,
            vec![
                Location::new("Kutupalong", 21.21, 92.16),
                Location::new("Teknaf", 20.86, 92.30),
            ]
        );
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_locations_not_an_array() {
        let path = temp_file("object.json", r#"{"name": "x"}"#);
        assert!(load_locations(&path).unwrap().is_empty());
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_point_locations() {
        let path = temp_file(
            "points.geojson",
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {"name": "Pharmacy"},
                 "geometry": {"type": "Point", "coordinates": [92.2, 21.1]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Point", "coordinates": [92.3, 21.2]}},
                {"type": "Feature", "properties": {"name": "Road"},
                 "geometry": {"type": "LineString", "coordinates": [[92.0, 21.0], [92.1, 21.1]]}}
            ]}"#,
        );
        let locations = load_point_locations(&path).unwrap();
        assert_eq!(
            locations,
            vec![Location::new("Pharmacy", 21.1, 92.2), Location::new("", 21.2, 92.3)]
        );
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_basemap_outlines_every_ring() {
        let path = temp_file(
            "basemap.geojson",
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Polygon", "coordinates": [
                    [[92.0, 21.0], [93.0, 21.0], [93.0, 22.0], [92.0, 21.0]],
                    [[92.4, 21.2], [92.6, 21.2], [92.6, 21.4], [92.4, 21.2]]
                 ]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "LineString", "coordinates": [[92.0, 21.0], [92.5, 21.5]]}}
            ]}"#,
        );
        let mut renderer = BrailleRenderer::new();
        assert_eq!(load_basemap(&mut renderer, &path).unwrap(), 3);
        assert!(renderer.has_basemap());
        assert_eq!(renderer.basemap[2], vec![(92.0, 21.0), (92.5, 21.5)]);
        fs::remove_file(path).ok();
    }
}
