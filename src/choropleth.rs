//! Styling of GeoJSON feature collections by a numeric property.
//!
//! Every feature is filled from a sequential color scale over `[0, max]`,
//! where `max` is the largest `numbars` value in the collection.

use geojson::{Feature, FeatureCollection, JsonValue};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::map::{GeoJsonLayer, Legend, LegendRamp, PathStyle, Popup, StyledFeature};
use crate::scale::{ColorScale, Rgb, SequentialScale};

/// Feature property holding the value to color by
pub const VALUE_PROPERTY: &str = "numbars";
/// Feature property holding the region name
pub const NAME_PROPERTY: &str = "name";

/// Coerce a property value to a finite number.
/// Numbers and numeric strings qualify; everything else does not.
pub fn numeric(value: &JsonValue) -> Option<f64> {
    let n = match value {
        JsonValue::Number(n) => n.as_f64()?,
        JsonValue::String(s) if !s.trim().is_empty() => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn property<'a>(feature: &'a Feature, key: &str) -> Option<&'a JsonValue> {
    feature.properties.as_ref()?.get(key)
}

/// The feature's numeric value, if it has a usable one
pub fn feature_value(feature: &Feature) -> Option<f64> {
    property(feature, VALUE_PROPERTY).and_then(numeric)
}

/// Color domain `[0, max]` for a collection. Falls back to `[0, 1]` when no
/// feature carries a positive numeric value.
pub fn color_domain(collection: &FeatureCollection) -> (f64, f64) {
    let max = collection
        .features
        .iter()
        .filter_map(feature_value)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))));

    match max {
        Some(max) if max > 0.0 => (0.0, max),
        _ => {
            debug!("no positive {VALUE_PROPERTY} values, using unit domain");
            (0.0, 1.0)
        }
    }
}

/// Fill and stroke for one feature: only the fill color varies
pub fn feature_style(feature: &Feature, scale: &dyn ColorScale) -> PathStyle {
    PathStyle {
        fill_color: scale.color(feature_value(feature).unwrap_or(0.0)),
        weight: 2,
        opacity: 1.0,
        color: Rgb::WHITE,
        dash_array: Some(3),
        fill_opacity: 0.9,
    }
}

/// Render a property the way a template literal would: integral numbers
/// without a fractional part, strings verbatim.
fn display_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// JS truthiness of a property value
fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null | JsonValue::Bool(false) => false,
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => true,
    }
}

/// `"<admin_level> <name> has <numbars> <unit>"`, when the feature has a
/// truthy name and the `numbars` key is present. Zero and null values
/// still count as present.
pub fn popup_text(feature: &Feature, admin_level: &str, unit: &str) -> Option<String> {
    let name = property(feature, NAME_PROPERTY).filter(|v| is_truthy(v))?;
    let value = property(feature, VALUE_PROPERTY)?;
    Some(format!(
        "{admin_level} {} has {} {unit}",
        display_value(name),
        display_value(value)
    ))
}

/// Style every feature of a collection and bind popups
pub fn build_overlay(
    collection: &FeatureCollection,
    admin_level: &str,
    unit: &str,
    scale: &dyn ColorScale,
) -> GeoJsonLayer {
    let features: Vec<StyledFeature> = collection
        .features
        .par_iter()
        .map(|feature| {
            let popup = popup_text(feature, admin_level, unit).map(Popup::new);
            StyledFeature::new(feature, feature_style(feature, scale), popup)
        })
        .collect();

    let malformed = collection
        .features
        .iter()
        .filter(|f| property(f, VALUE_PROPERTY).is_some_and(|v| numeric(v).is_none()))
        .count();
    if malformed > 0 {
        warn!(malformed, "features with non-numeric {VALUE_PROPERTY} drawn as zero");
    }

    GeoJsonLayer::new(features)
}

/// Legend for an overlay: the fixed basemap key plus the scale's real stops
pub fn overlay_legend(scale: &dyn ColorScale, unit: &str) -> Legend {
    Legend::basemap().with_ramp(LegendRamp::from_scale(scale, unit))
}

/// The fixed scale used by `MapView::add_geojson`
pub fn default_scale(collection: &FeatureCollection) -> SequentialScale {
    let (lo, hi) = color_domain(collection);
    SequentialScale::viridis(lo, hi)
}
