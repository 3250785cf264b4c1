use serde::{Deserialize, Serialize};

/// A geographic point in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Both components finite and inside the WGS84 ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A named place supplied by the caller, e.g. a clinic or an amenity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }

    #[inline]
    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}

/// Equirectangular distance in degrees of latitude.
/// Good enough for hit-testing at street-to-district scale.
#[inline(always)]
pub fn planar_distance_deg(a: LatLng, b: LatLng) -> f64 {
    let cos_lat = ((a.lat + b.lat) * 0.5).to_radians().cos();
    let dx = (b.lng - a.lng) * cos_lat;
    let dy = b.lat - a.lat;
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity() {
        assert!(LatLng::new(21.05, 92.29).is_valid());
        assert!(!LatLng::new(f64::NAN, 92.29).is_valid());
        assert!(!LatLng::new(91.0, 0.0).is_valid());
        assert!(!LatLng::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_planar_distance() {
        let a = LatLng::new(0.0, 0.0);
        let b = LatLng::new(3.0, 4.0);
        assert!((planar_distance_deg(a, b) - 5.0).abs() < 0.01);
        assert_eq!(planar_distance_deg(a, a), 0.0);
    }

    #[test]
    fn test_location_deserialize() {
        let loc: Location =
            serde_json::from_str(r#"{"name":"Kutupalong","latitude":21.2,"longitude":92.16}"#)
                .unwrap();
        assert_eq!(loc.position(), LatLng::new(21.2, 92.16));
    }
}
