//! The map widget: health-location markers, ad-hoc markers, and
//! choropleth overlays on top of a base tile layer.

use std::sync::mpsc::{channel, Receiver, Sender};

use geojson::FeatureCollection;
use tracing::{debug, info, warn};

use crate::choropleth;
use crate::config::MapOptions;
use crate::error::{MapError, Result};
use crate::geo::{LatLng, Location};
use crate::map::{
    GeoJsonLayer, Layer, LayerGroup, LayerId, Legend, Map, MapEvent, Marker, Selection, TileLayer,
};
use crate::scale::ColorScale;

/// Work requested before the map existed, applied in order on `initialize`
#[derive(Debug)]
enum Pending {
    Marker(Marker),
    Overlay(GeoJsonLayer, Legend),
}

/// Interactive map widget.
///
/// Every rendering call is safe before [`MapView::initialize`]: location
/// lists are stored and markers/overlays are queued, then replayed once the
/// map exists.
pub struct MapView {
    options: MapOptions,
    map: Option<Map>,
    health_locations: Vec<Location>,
    health_layer: Option<LayerId>,
    amenities: Vec<Location>,
    amenities_layer: Option<LayerId>,
    overlays: Vec<LayerId>,
    pending: Vec<Pending>,
    subscribers: Vec<Sender<MapEvent>>,
}

impl MapView {
    pub fn new(options: MapOptions) -> Self {
        Self {
            options,
            map: None,
            health_locations: Vec::new(),
            health_layer: None,
            amenities: Vec::new(),
            amenities_layer: None,
            overlays: Vec::new(),
            pending: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    /// Create the map in `container`, center it, and attach the tile layer.
    ///
    /// Fails when the container id is empty (nothing mounted yet), when the
    /// center is not a valid coordinate, or when called twice.
    pub fn initialize(&mut self, container: &str, center: LatLng, zoom: f64) -> Result<()> {
        if self.map.is_some() {
            return Err(MapError::AlreadyInitialized);
        }
        if container.trim().is_empty() {
            return Err(MapError::MissingContainer);
        }
        if !center.is_valid() || !zoom.is_finite() {
            return Err(MapError::InvalidCoordinate {
                lat: center.lat,
                lng: center.lng,
            });
        }

        let mut map = Map::new(container, &self.options);
        map.set_view(center, zoom);
        map.add_layer(Layer::Tiles(TileLayer {
            config: self.options.tiles.clone(),
        }));
        self.map = Some(map);
        info!(container, lat = center.lat, lng = center.lng, zoom, "map initialized");

        self.update_health_locations_layer();
        self.update_amenities_layer();
        for pending in std::mem::take(&mut self.pending) {
            match pending {
                Pending::Marker(marker) => self.attach_marker(marker),
                Pending::Overlay(layer, legend) => self.attach_overlay(layer, legend),
            }
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.map.is_some()
    }

    pub fn map(&self) -> Option<&Map> {
        self.map.as_ref()
    }

    /// Replace the health-location markers
    pub fn set_health_locations(&mut self, locations: Vec<Location>) {
        self.health_locations = locations;
        self.update_health_locations_layer();
    }

    pub fn health_locations(&self) -> &[Location] {
        &self.health_locations
    }

    /// Currently attached health-location markers
    pub fn health_layer(&self) -> Option<&LayerGroup> {
        self.marker_group(self.health_layer)
    }

    /// Replace the amenity markers
    pub fn set_amenities(&mut self, locations: Vec<Location>) {
        self.amenities = locations;
        self.update_amenities_layer();
    }

    pub fn amenities(&self) -> &[Location] {
        &self.amenities
    }

    pub fn amenities_layer(&self) -> Option<&LayerGroup> {
        self.marker_group(self.amenities_layer)
    }

    fn marker_group(&self, id: Option<LayerId>) -> Option<&LayerGroup> {
        match self.map.as_ref()?.layer(id?)? {
            Layer::Markers(group) => Some(group),
            _ => None,
        }
    }

    fn update_health_locations_layer(&mut self) {
        let Some(map) = self.map.as_mut() else {
            debug!(count = self.health_locations.len(), "health locations deferred until initialize");
            return;
        };
        self.health_layer = Some(replace_marker_layer(map, self.health_layer, &self.health_locations));
    }

    fn update_amenities_layer(&mut self) {
        let Some(map) = self.map.as_mut() else {
            debug!(count = self.amenities.len(), "amenities deferred until initialize");
            return;
        };
        self.amenities_layer = Some(replace_marker_layer(map, self.amenities_layer, &self.amenities));
    }

    /// Add a single marker straight to the map. A non-empty `name` becomes
    /// its popup. These markers accumulate and cannot be removed.
    pub fn add_marker(&mut self, latitude: f64, longitude: f64, name: Option<&str>) {
        let position = LatLng::new(latitude, longitude);
        if !position.is_valid() {
            warn!(latitude, longitude, "marker with invalid coordinate skipped");
            return;
        }
        let mut marker = Marker::new(position);
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            marker = marker.with_popup(name);
        }

        if self.map.is_some() {
            self.attach_marker(marker);
        } else {
            self.pending.push(Pending::Marker(marker));
        }
    }

    fn attach_marker(&mut self, marker: Marker) {
        if let Some(map) = self.map.as_mut() {
            map.add_layer(Layer::Marker(marker));
        }
    }

    /// Add a choropleth of `collection` colored by each feature's `numbars`.
    ///
    /// Features with a `name` and a defined `numbars` get the popup
    /// `"<admin_level> <name> has <numbars> <unit_of_interest>"`. Each call
    /// attaches a new overlay on top of earlier ones.
    pub fn add_geojson(&mut self, collection: &FeatureCollection, admin_level: &str, unit_of_interest: &str) {
        let scale = choropleth::default_scale(collection);
        self.add_geojson_with_scale(collection, admin_level, unit_of_interest, &scale);
    }

    /// [`MapView::add_geojson`] with a caller-supplied color scale
    pub fn add_geojson_with_scale(
        &mut self,
        collection: &FeatureCollection,
        admin_level: &str,
        unit_of_interest: &str,
        scale: &dyn ColorScale,
    ) {
        let (lo, hi) = scale.domain();
        debug!(features = collection.features.len(), lo, hi, "building choropleth");
        let layer = choropleth::build_overlay(collection, admin_level, unit_of_interest, scale);
        let legend = choropleth::overlay_legend(scale, unit_of_interest);

        if self.map.is_some() {
            self.attach_overlay(layer, legend);
        } else {
            self.pending.push(Pending::Overlay(layer, legend));
        }
    }

    fn attach_overlay(&mut self, layer: GeoJsonLayer, legend: Legend) {
        if let Some(map) = self.map.as_mut() {
            map.set_legend(legend);
            let id = map.add_layer(Layer::GeoJson(layer));
            self.overlays.push(id);
        }
    }

    /// Ids of attached choropleth overlays, oldest first
    pub fn overlays(&self) -> &[LayerId] {
        &self.overlays
    }

    /// Detach every choropleth overlay; the legend stays
    pub fn clear_overlays(&mut self) {
        self.pending.retain(|p| !matches!(p, Pending::Overlay(..)));
        let Some(map) = self.map.as_mut() else {
            return;
        };
        for id in self.overlays.drain(..) {
            map.remove_layer(id);
        }
    }

    /// Select the marker or feature under `point` and open its popup.
    ///
    /// Markers win over overlays; within each, the topmost layer wins.
    /// Missing everything closes the open popup.
    pub fn pick(&mut self, point: LatLng, tolerance_deg: f64) -> Option<Selection> {
        let selection = self.hit_test(point, tolerance_deg);
        let map = self.map.as_mut()?;

        match &selection {
            Some(sel) => {
                match (sel.popup(), sel) {
                    (Some(text), Selection::Marker { position, .. }) => map.open_popup(*position, text),
                    (Some(text), Selection::Feature { .. }) => map.open_popup(point, text),
                    (None, _) => {
                        map.close_popup();
                    }
                }
                let event = match sel {
                    Selection::Marker { .. } => MapEvent::MarkerSelected(sel.clone()),
                    Selection::Feature { .. } => MapEvent::FeatureSelected(sel.clone()),
                };
                self.emit(event);
            }
            None => self.close_popup(),
        }
        selection
    }

    fn hit_test(&self, point: LatLng, tolerance_deg: f64) -> Option<Selection> {
        let map = self.map.as_ref()?;

        let marker_hit = map.layers().rev().find_map(|(id, layer)| match layer {
            Layer::Marker(marker) => {
                (crate::geo::planar_distance_deg(point, marker.position) <= tolerance_deg).then(|| {
                    Selection::Marker {
                        layer: id,
                        index: 0,
                        position: marker.position,
                        popup: marker.popup_text().map(str::to_string),
                    }
                })
            }
            Layer::Markers(group) => group.nearest(point, tolerance_deg).and_then(|index| {
                let marker = group.get(index)?;
                Some(Selection::Marker {
                    layer: id,
                    index,
                    position: marker.position,
                    popup: marker.popup_text().map(str::to_string),
                })
            }),
            _ => None,
        });
        if marker_hit.is_some() {
            return marker_hit;
        }

        map.layers().rev().find_map(|(id, layer)| match layer {
            Layer::GeoJson(overlay) => overlay.hit_test(point).map(|index| Selection::Feature {
                layer: id,
                index,
                popup: overlay.features()[index].popup.as_ref().map(|p| p.text.clone()),
            }),
            _ => None,
        })
    }

    /// Close the open popup, notifying subscribers if there was one
    pub fn close_popup(&mut self) {
        let closed = self.map.as_mut().and_then(Map::close_popup);
        if closed.is_some() {
            self.emit(MapEvent::PopupClosed);
        }
    }

    /// Receive selection and popup events. Dropped receivers are pruned.
    pub fn subscribe(&mut self) -> Receiver<MapEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: MapEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Default for MapView {
    fn default() -> Self {
        Self::new(MapOptions::default())
    }
}

/// Detach `previous` and attach a fresh group built from `locations`
fn replace_marker_layer(map: &mut Map, previous: Option<LayerId>, locations: &[Location]) -> LayerId {
    if let Some(id) = previous {
        map.remove_layer(id);
    }

    let mut skipped = 0usize;
    let group: LayerGroup = locations
        .iter()
        .filter(|loc| {
            let ok = loc.position().is_valid();
            if !ok {
                skipped += 1;
            }
            ok
        })
        .map(|loc| Marker::new(loc.position()).with_popup(loc.name.clone()))
        .collect();
    if skipped > 0 {
        warn!(skipped, "locations with invalid coordinates skipped");
    }

    map.add_layer(Layer::Markers(group))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_CENTER, DEFAULT_ZOOM};
    use crate::scale::{interpolate_viridis, SequentialScale};
    use geojson::Feature;
    use serde_json::{json, Value};

    fn ready_view() -> MapView {
        let mut view = MapView::default();
        view.initialize("map", DEFAULT_CENTER, DEFAULT_ZOOM).unwrap();
        view
    }

    fn locations(n: usize) -> Vec<Location> {
        (0..n)
            .map(|i| Location::new(format!("Clinic {i}"), 21.0 + i as f64 * 0.01, 92.0 + i as f64 * 0.01))
            .collect()
    }

    fn square(x0: f64, y0: f64, size: f64, properties: Value) -> Feature {
        serde_json::from_value(json!({
            "type": "Feature",
            "properties": properties,
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[x0, y0], [x0 + size, y0], [x0 + size, y0 + size], [x0, y0 + size], [x0, y0]]]
            }
        }))
        .unwrap()
    }

    fn collection(features: Vec<Feature>) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }

    /// Tracked marker layers: health locations plus amenities
    fn marker_layer_count(view: &MapView) -> usize {
        view.map()
            .unwrap()
            .layers()
            .filter(|(_, l)| matches!(l, Layer::Markers(_)))
            .count()
    }

    #[test]
    fn test_initialize_sets_view_and_tiles() {
        let view = ready_view();
        let map = view.map().unwrap();
        assert_eq!(map.container(), "map");
        assert_eq!(map.center(), LatLng::new(21.05, 92.29));
        assert_eq!(map.zoom(), 11.0);
        assert!(map.tile_layer().is_some());
        assert_eq!(map.icon().icon_size, (20, 40));
    }

    #[test]
    fn test_initialize_guards() {
        let mut view = MapView::default();
        assert!(matches!(
            view.initialize("", DEFAULT_CENTER, DEFAULT_ZOOM),
            Err(MapError::MissingContainer)
        ));
        assert!(matches!(
            view.initialize("map", LatLng::new(f64::NAN, 0.0), DEFAULT_ZOOM),
            Err(MapError::InvalidCoordinate { .. })
        ));
        assert!(!view.is_initialized());

        view.initialize("map", DEFAULT_CENTER, DEFAULT_ZOOM).unwrap();
        assert!(matches!(
            view.initialize("map", DEFAULT_CENTER, DEFAULT_ZOOM),
            Err(MapError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_health_locations_replace_previous() {
        let mut view = ready_view();
        view.set_health_locations(locations(3));

        let group = view.health_layer().unwrap();
        assert_eq!(group.len(), 3);
        for (marker, loc) in group.markers().zip(locations(3)) {
            assert_eq!(marker.position, loc.position());
            assert_eq!(marker.popup_text(), Some(loc.name.as_str()));
        }

        let first = view.health_layer.unwrap();
        view.set_health_locations(locations(2));
        assert_eq!(view.health_layer().unwrap().len(), 2);
        assert!(!view.map().unwrap().has_layer(first));
        assert_ne!(view.health_layer, Some(first));
        // The other tracked group is the (empty) amenities layer
        assert_eq!(marker_layer_count(&view), 2);
        assert!(view.amenities_layer().unwrap().is_empty());
    }

    #[test]
    fn test_health_locations_idempotent_and_empty() {
        let mut view = ready_view();
        view.set_health_locations(locations(4));
        let first = view.health_layer.unwrap();
        view.set_health_locations(locations(4));
        assert_eq!(view.health_layer().unwrap().len(), 4);
        assert!(!view.map().unwrap().has_layer(first));
        assert_eq!(marker_layer_count(&view), 2);

        view.set_health_locations(Vec::new());
        assert!(view.health_layer().unwrap().is_empty());
    }

    #[test]
    fn test_health_locations_before_initialize_replay() {
        let mut view = MapView::default();
        view.set_health_locations(locations(5));
        view.set_health_locations(locations(2));
        assert!(view.health_layer().is_none());

        view.initialize("map", DEFAULT_CENTER, DEFAULT_ZOOM).unwrap();
        assert_eq!(view.health_layer().unwrap().len(), 2);
    }

    #[test]
    fn test_malformed_location_skipped() {
        let mut view = ready_view();
        let mut locs = locations(2);
        locs.push(Location::new("Broken", f64::NAN, 92.0));
        view.set_health_locations(locs);
        assert_eq!(view.health_layer().unwrap().len(), 2);
        assert_eq!(view.health_locations().len(), 3);
    }

    #[test]
    fn test_amenities_are_independent() {
        let mut view = ready_view();
        view.set_health_locations(locations(3));
        view.set_amenities(locations(1));
        view.set_amenities(locations(2));
        assert_eq!(view.amenities(), locations(2).as_slice());
        assert_eq!(view.amenities_layer().unwrap().len(), 2);
        assert_eq!(view.health_layer().unwrap().len(), 3);
        assert_eq!(marker_layer_count(&view), 2);
    }

    #[test]
    fn test_add_marker_accumulates() {
        let mut view = ready_view();
        let before = view.map().unwrap().layer_count();
        view.add_marker(21.1, 92.1, Some("Pharmacy"));
        view.add_marker(21.1, 92.1, None);
        view.add_marker(21.2, 92.2, Some(""));

        let map = view.map().unwrap();
        assert_eq!(map.layer_count(), before + 3);
        let popups: Vec<_> = map
            .layers()
            .filter_map(|(_, l)| match l {
                Layer::Marker(m) => Some(m.popup_text()),
                _ => None,
            })
            .collect();
        assert_eq!(popups, vec![Some("Pharmacy"), None, None]);
    }

    #[test]
    fn test_add_marker_before_initialize_is_queued() {
        let mut view = MapView::default();
        view.add_marker(21.1, 92.1, Some("Early"));
        view.initialize("map", DEFAULT_CENTER, DEFAULT_ZOOM).unwrap();
        let found = view
            .map()
            .unwrap()
            .layers()
            .any(|(_, l)| matches!(l, Layer::Marker(m) if m.popup_text() == Some("Early")));
        assert!(found);
    }

    #[test]
    fn test_geojson_colors_by_domain() {
        let mut view = ready_view();
        let fc = collection(vec![
            square(92.0, 21.0, 0.1, json!({"name": "A", "numbars": 0})),
            square(92.1, 21.0, 0.1, json!({"name": "B", "numbars": 0})),
            square(92.2, 21.0, 0.1, json!({"name": "C", "numbars": 5})),
        ]);
        view.add_geojson(&fc, "District", "clinics");

        let id = view.overlays()[0];
        let Some(Layer::GeoJson(layer)) = view.map().unwrap().layer(id) else {
            panic!("overlay missing");
        };
        assert_eq!(layer.features()[2].style.fill_color, interpolate_viridis(1.0));
        assert_eq!(layer.features()[0].style.fill_color, interpolate_viridis(0.0));

        let legend = view.map().unwrap().legend().unwrap();
        assert_eq!(legend.ramp.as_ref().unwrap().domain, (0.0, 5.0));
    }

    #[test]
    fn test_geojson_without_values_uses_unit_domain() {
        let mut view = ready_view();
        let fc = collection(vec![square(92.0, 21.0, 0.1, json!({"name": "A"}))]);
        view.add_geojson(&fc, "District", "clinics");
        let legend = view.map().unwrap().legend().unwrap();
        assert_eq!(legend.ramp.as_ref().unwrap().domain, (0.0, 1.0));
    }

    #[test]
    fn test_geojson_popup_text() {
        let mut view = ready_view();
        let fc = collection(vec![
            square(92.0, 21.0, 0.1, json!({"name": "Foo", "numbars": 3})),
            square(92.2, 21.0, 0.1, json!({"numbars": 3})),
        ]);
        view.add_geojson(&fc, "District", "clinics");

        let Some(Layer::GeoJson(layer)) = view.map().unwrap().layer(view.overlays()[0]) else {
            panic!("overlay missing");
        };
        assert_eq!(
            layer.features()[0].popup.as_ref().map(|p| p.text.as_str()),
            Some("District Foo has 3 clinics")
        );
        assert!(layer.features()[1].popup.is_none());
        assert_eq!(layer.features()[1].style.fill_color, layer.features()[0].style.fill_color);
    }

    #[test]
    fn test_geojson_is_additive_and_clearable() {
        let mut view = ready_view();
        let fc = collection(vec![square(92.0, 21.0, 0.1, json!({"name": "A", "numbars": 1}))]);
        view.add_geojson(&fc, "District", "clinics");
        view.add_geojson(&fc, "District", "clinics");

        assert_eq!(view.overlays().len(), 2);
        let map = view.map().unwrap();
        assert!(view.overlays().iter().all(|id| map.has_layer(*id)));

        view.clear_overlays();
        assert!(view.overlays().is_empty());
        let remaining = view
            .map()
            .unwrap()
            .layers()
            .filter(|(_, l)| matches!(l, Layer::GeoJson(_)))
            .count();
        assert_eq!(remaining, 0);
        assert!(view.map().unwrap().legend().is_some());
    }

    #[test]
    fn test_geojson_before_initialize_is_queued() {
        let mut view = MapView::default();
        let fc = collection(vec![square(92.0, 21.0, 0.1, json!({"numbars": 2}))]);
        view.add_geojson(&fc, "District", "clinics");
        assert!(view.overlays().is_empty());

        view.initialize("map", DEFAULT_CENTER, DEFAULT_ZOOM).unwrap();
        assert_eq!(view.overlays().len(), 1);
        assert!(view.map().unwrap().legend().is_some());
    }

    #[test]
    fn test_custom_scale() {
        let mut view = ready_view();
        let fc = collection(vec![square(92.0, 21.0, 0.1, json!({"numbars": 50}))]);
        let scale = SequentialScale::viridis(0.0, 100.0);
        view.add_geojson_with_scale(&fc, "District", "clinics", &scale);
        let Some(Layer::GeoJson(layer)) = view.map().unwrap().layer(view.overlays()[0]) else {
            panic!("overlay missing");
        };
        assert_eq!(layer.features()[0].style.fill_color, interpolate_viridis(0.5));
    }

    #[test]
    fn test_pick_marker_opens_popup_and_emits() {
        let mut view = ready_view();
        let events = view.subscribe();
        view.set_health_locations(vec![Location::new("Kutupalong", 21.2, 92.16)]);

        let sel = view.pick(LatLng::new(21.2001, 92.1601), 0.001).unwrap();
        assert_eq!(sel.popup(), Some("Kutupalong"));
        assert_eq!(
            view.map().unwrap().popup().map(|p| p.text.as_str()),
            Some("Kutupalong")
        );
        assert!(matches!(events.try_recv(), Ok(MapEvent::MarkerSelected(_))));

        assert!(view.pick(LatLng::new(25.0, 95.0), 0.001).is_none());
        assert!(view.map().unwrap().popup().is_none());
        assert_eq!(events.try_recv(), Ok(MapEvent::PopupClosed));
    }

    #[test]
    fn test_pick_prefers_markers_over_features() {
        let mut view = ready_view();
        let fc = collection(vec![square(92.0, 21.0, 0.5, json!({"name": "Ukhia", "numbars": 3}))]);
        view.add_geojson(&fc, "Upazila", "clinics");
        view.add_marker(21.25, 92.25, Some("Camp 4"));

        let sel = view.pick(LatLng::new(21.25, 92.25), 0.01).unwrap();
        assert_eq!(sel.popup(), Some("Camp 4"));

        let sel = view.pick(LatLng::new(21.4, 92.4), 0.01).unwrap();
        assert!(matches!(sel, Selection::Feature { index: 0, .. }));
        assert_eq!(sel.popup(), Some("Upazila Ukhia has 3 clinics"));
    }

    #[test]
    fn test_pick_before_initialize() {
        let mut view = MapView::default();
        assert!(view.pick(DEFAULT_CENTER, 1.0).is_none());
        view.close_popup();
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let mut view = ready_view();
        drop(view.subscribe());
        let live = view.subscribe();
        view.add_marker(21.0, 92.0, Some("x"));
        view.pick(LatLng::new(21.0, 92.0), 0.01);
        assert!(live.try_recv().is_ok());
        assert_eq!(view.subscribers.len(), 1);
    }
}
