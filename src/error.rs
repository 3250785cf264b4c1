use thiserror::Error;

/// Errors surfaced by map setup and data loading.
///
/// Rendering operations on [`crate::MapView`] never return these: bad input
/// there is skipped and logged instead.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum MapError {
    #[error("map container id is empty; the view has not been mounted")]
    MissingContainer,

    #[error("map is already initialized")]
    AlreadyInitialized,

    #[error("invalid coordinate: lat={lat}, lng={lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] simd_json::Error),

    #[error("geojson error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("expected a GeoJSON FeatureCollection")]
    NotAFeatureCollection,
}

pub type Result<T, E = MapError> = std::result::Result<T, E>;
