//! Terminal map widget for health-facility data.
//!
//! [`MapView`] owns a map centered on the Cox's Bazar area, draws
//! health-location markers, ad-hoc markers, and choropleth overlays colored
//! by each feature's `numbars` property. [`map::BrailleRenderer`] turns the
//! map into Braille canvases for a ratatui front end.

pub mod braille;
pub mod choropleth;
pub mod config;
pub mod data;
pub mod error;
pub mod geo;
pub mod map;
pub mod scale;
pub mod view;

pub use config::{IconConfig, MapOptions, TileLayerConfig, DEFAULT_CENTER, DEFAULT_ZOOM};
pub use error::{MapError, Result};
pub use geo::{LatLng, Location};
pub use map::{MapEvent, Selection};
pub use scale::{ColorScale, Rgb, SequentialScale};
pub use view::MapView;
