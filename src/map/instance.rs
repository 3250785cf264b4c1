use tracing::debug;

use crate::config::{IconConfig, MapOptions, TileLayerConfig};
use crate::geo::LatLng;
use crate::map::layer::{Layer, LayerId, TileLayer};
use crate::map::legend::Legend;

/// A popup currently shown on the map
#[derive(Clone, Debug, PartialEq)]
pub struct OpenPopup {
    pub anchor: LatLng,
    pub text: String,
}

/// The map instance: view state, attached layers in draw order, and controls
#[derive(Debug)]
pub struct Map {
    container: String,
    center: LatLng,
    zoom: f64,
    icon: IconConfig,
    layers: Vec<(LayerId, Layer)>,
    next_id: u64,
    legend: Option<Legend>,
    popup: Option<OpenPopup>,
}

impl Map {
    /// Create a map bound to `container`, with no layers attached
    pub fn new(container: impl Into<String>, options: &MapOptions) -> Self {
        Self {
            container: container.into(),
            center: crate::config::DEFAULT_CENTER,
            zoom: crate::config::DEFAULT_ZOOM,
            icon: options.icon.clone(),
            layers: Vec::new(),
            next_id: 0,
            legend: None,
            popup: None,
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn set_view(&mut self, center: LatLng, zoom: f64) {
        self.center = center;
        self.zoom = zoom;
    }

    pub fn center(&self) -> LatLng {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Icon used for every marker on this map
    pub fn icon(&self) -> &IconConfig {
        &self.icon
    }

    pub fn add_layer(&mut self, layer: Layer) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        self.layers.push((id, layer));
        debug!(layer = id.0, "layer attached");
        id
    }

    /// Detach a layer. Unknown ids are ignored.
    pub fn remove_layer(&mut self, id: LayerId) -> Option<Layer> {
        let pos = self.layers.iter().position(|(lid, _)| *lid == id)?;
        debug!(layer = id.0, "layer detached");
        Some(self.layers.remove(pos).1)
    }

    pub fn has_layer(&self, id: LayerId) -> bool {
        self.layers.iter().any(|(lid, _)| *lid == id)
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|(lid, _)| *lid == id).map(|(_, l)| l)
    }

    /// Attached layers, bottom to top
    pub fn layers(&self) -> impl DoubleEndedIterator<Item = (LayerId, &Layer)> {
        self.layers.iter().map(|(id, layer)| (*id, layer))
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// First attached tile source, if any
    pub fn tile_layer(&self) -> Option<&TileLayerConfig> {
        self.layers.iter().find_map(|(_, layer)| match layer {
            Layer::Tiles(TileLayer { config }) => Some(config),
            _ => None,
        })
    }

    /// Install the legend, replacing any previous one
    pub fn set_legend(&mut self, legend: Legend) {
        self.legend = Some(legend);
    }

    pub fn legend(&self) -> Option<&Legend> {
        self.legend.as_ref()
    }

    /// Show a popup, closing whichever was open
    pub fn open_popup(&mut self, anchor: LatLng, text: impl Into<String>) {
        self.popup = Some(OpenPopup {
            anchor,
            text: text.into(),
        });
    }

    /// Returns the popup that was open
    pub fn close_popup(&mut self) -> Option<OpenPopup> {
        self.popup.take()
    }

    pub fn popup(&self) -> Option<&OpenPopup> {
        self.popup.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::layer::Marker;

    #[test]
    fn test_layer_ids_are_unique_and_ordered() {
        let mut map = Map::new("map", &MapOptions::default());
        let a = map.add_layer(Layer::Marker(Marker::new(LatLng::new(0.0, 0.0))));
        let b = map.add_layer(Layer::Marker(Marker::new(LatLng::new(1.0, 1.0))));
        assert!(a < b);

        assert!(map.remove_layer(a).is_some());
        assert!(map.remove_layer(a).is_none());
        let c = map.add_layer(Layer::Marker(Marker::new(LatLng::new(2.0, 2.0))));
        assert_ne!(a, c);

        let order: Vec<_> = map.layers().map(|(id, _)| id).collect();
        assert_eq!(order, vec![b, c]);
    }

    #[test]
    fn test_tile_layer_lookup() {
        let mut map = Map::new("map", &MapOptions::default());
        assert!(map.tile_layer().is_none());
        map.add_layer(Layer::Tiles(TileLayer {
            config: TileLayerConfig::default(),
        }));
        assert!(map.tile_layer().is_some_and(|t| t.url_template.contains("openstreetmap")));
    }

    #[test]
    fn test_popup_replaces_previous() {
        let mut map = Map::new("map", &MapOptions::default());
        map.open_popup(LatLng::new(0.0, 0.0), "first");
        map.open_popup(LatLng::new(1.0, 1.0), "second");
        assert_eq!(map.popup().map(|p| p.text.as_str()), Some("second"));
        assert!(map.close_popup().is_some());
        assert!(map.popup().is_none());
    }
}
