mod event;
mod geometry;
mod instance;
mod layer;
mod legend;
mod projection;
mod renderer;
mod spatial;

pub use event::{MapEvent, Selection};
pub use geometry::{fill_polygon, point_in_rings};
pub use instance::{Map, OpenPopup};
pub use layer::{
    GeoJsonLayer, Layer, LayerGroup, LayerId, Marker, PathStyle, Popup, Shape, StyledFeature,
    TileLayer,
};
pub use legend::{Legend, LegendEntry, LegendPosition, LegendRamp, LegendSymbol, BORDER_ICON_URL};
pub use projection::{Viewport, MAX_LEVEL, MIN_LEVEL};
pub use renderer::{
    BrailleRenderer, DisplaySettings, LineString, MapLayers, MapRenderer, PlacedPopup, MARKER_COLOR,
};
