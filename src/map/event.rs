use crate::geo::LatLng;
use crate::map::layer::LayerId;

/// What a pick landed on
#[derive(Clone, Debug, PartialEq)]
pub enum Selection {
    Marker {
        layer: LayerId,
        /// Position of the marker inside its group; 0 for standalone markers
        index: usize,
        position: LatLng,
        popup: Option<String>,
    },
    Feature {
        layer: LayerId,
        index: usize,
        popup: Option<String>,
    },
}

impl Selection {
    pub fn popup(&self) -> Option<&str> {
        match self {
            Selection::Marker { popup, .. } | Selection::Feature { popup, .. } => popup.as_deref(),
        }
    }
}

/// Notifications for code hosting a [`crate::MapView`]
#[derive(Clone, Debug, PartialEq)]
pub enum MapEvent {
    MarkerSelected(Selection),
    FeatureSelected(Selection),
    PopupClosed,
}
