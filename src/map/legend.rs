use crate::scale::{ColorScale, Rgb};

/// Corner of the map a control is pinned to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LegendPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LegendSymbol {
    Swatch(Rgb),
    /// External image; terminals draw a placeholder glyph
    Icon { url: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct LegendEntry {
    pub symbol: LegendSymbol,
    pub label: String,
}

impl LegendEntry {
    pub fn swatch(hex: &str, label: impl Into<String>) -> Self {
        Self {
            symbol: LegendSymbol::Swatch(Rgb::from_hex(hex).unwrap_or(Rgb::BLACK)),
            label: label.into(),
        }
    }

    pub fn icon(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            symbol: LegendSymbol::Icon { url: url.into() },
            label: label.into(),
        }
    }
}

/// Color stops of the scale actually used for the choropleth fills
#[derive(Clone, Debug, PartialEq)]
pub struct LegendRamp {
    pub unit: String,
    pub domain: (f64, f64),
    pub stops: Vec<(f64, Rgb)>,
}

impl LegendRamp {
    pub const STOPS: usize = 5;

    pub fn from_scale(scale: &dyn ColorScale, unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            domain: scale.domain(),
            stops: scale.sample(Self::STOPS),
        }
    }
}

/// A single map-wide legend control
#[derive(Clone, Debug, PartialEq)]
pub struct Legend {
    pub position: LegendPosition,
    pub title: String,
    pub entries: Vec<LegendEntry>,
    pub ramp: Option<LegendRamp>,
}

pub const BORDER_ICON_URL: &str = "https://d30y9cdsu7xlg0.cloudfront.net/png/194515-200.png";

impl Legend {
    /// The fixed basemap key: land-cover swatches plus the border icon
    pub fn basemap() -> Self {
        Self {
            position: LegendPosition::BottomLeft,
            title: "Tegnforklaring".to_string(),
            entries: vec![
                LegendEntry::swatch("#477AC2", "Water"),
                LegendEntry::swatch("#448D40", "Forest"),
                LegendEntry::swatch("#E6E696", "Land"),
                LegendEntry::swatch("#E8E6E0", "Residential"),
                LegendEntry::swatch("#FFFFFF", "Ice"),
                LegendEntry::icon(BORDER_ICON_URL, "Grænse"),
            ],
            ramp: None,
        }
    }

    pub fn with_ramp(mut self, ramp: LegendRamp) -> Self {
        self.ramp = Some(ramp);
        self
    }

    /// Rows of text the legend occupies when drawn, title included
    pub fn line_count(&self) -> usize {
        1 + self.entries.len() + self.ramp.as_ref().map_or(0, |r| 1 + r.stops.len())
    }
}
