use std::fmt;

/// 24-bit sRGB color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (case-insensitive, leading `#` optional)
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Composite this color over `background` with the given opacity
    pub fn over(self, background: Rgb, alpha: f64) -> Rgb {
        let a = alpha.clamp(0.0, 1.0);
        let mix = |fg: u8, bg: u8| (fg as f64 * a + bg as f64 * (1.0 - a)).round() as u8;
        Rgb::new(
            mix(self.r, background.r),
            mix(self.g, background.g),
            mix(self.b, background.b),
        )
    }

    /// Linear interpolation between two colors, `t` in [0, 1]
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        other.over(self, t)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<Rgb> for ratatui::style::Color {
    fn from(c: Rgb) -> Self {
        ratatui::style::Color::Rgb(c.r, c.g, c.b)
    }
}

/// Maps a numeric value to a color.
///
/// Choropleth styling only depends on this trait, so the palette and the
/// domain math can be swapped or stubbed without a rendering surface.
pub trait ColorScale: Send + Sync {
    /// Inclusive value range covered by the scale
    fn domain(&self) -> (f64, f64);

    fn color(&self, value: f64) -> Rgb;

    /// `n` evenly spaced (value, color) stops across the domain
    fn sample(&self, n: usize) -> Vec<(f64, Rgb)> {
        let (lo, hi) = self.domain();
        match n {
            0 => Vec::new(),
            1 => vec![(lo, self.color(lo))],
            _ => (0..n)
                .map(|i| {
                    let v = lo + (hi - lo) * i as f64 / (n - 1) as f64;
                    (v, self.color(v))
                })
                .collect(),
        }
    }
}

/// Continuous scale over `[lo, hi]` feeding a normalized interpolator
#[derive(Clone, Copy)]
pub struct SequentialScale {
    lo: f64,
    hi: f64,
    interpolator: fn(f64) -> Rgb,
}

impl SequentialScale {
    pub fn new(lo: f64, hi: f64, interpolator: fn(f64) -> Rgb) -> Self {
        Self { lo, hi, interpolator }
    }

    pub fn viridis(lo: f64, hi: f64) -> Self {
        Self::new(lo, hi, interpolate_viridis)
    }

    /// Position of `value` in the domain, unclamped.
    /// A zero-width domain maps everything to the midpoint.
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.hi - self.lo;
        if span == 0.0 {
            0.5
        } else {
            (value - self.lo) / span
        }
    }
}

impl ColorScale for SequentialScale {
    fn domain(&self) -> (f64, f64) {
        (self.lo, self.hi)
    }

    fn color(&self, value: f64) -> Rgb {
        (self.interpolator)(self.normalize(value))
    }
}

impl fmt::Debug for SequentialScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequentialScale")
            .field("lo", &self.lo)
            .field("hi", &self.hi)
            .finish_non_exhaustive()
    }
}

/// Viridis sampled at every tenth of the range
const VIRIDIS: [Rgb; 11] = [
    Rgb::new(68, 1, 84),
    Rgb::new(72, 36, 117),
    Rgb::new(65, 68, 135),
    Rgb::new(53, 95, 141),
    Rgb::new(42, 120, 142),
    Rgb::new(33, 145, 140),
    Rgb::new(34, 168, 132),
    Rgb::new(68, 191, 112),
    Rgb::new(122, 209, 81),
    Rgb::new(189, 223, 38),
    Rgb::new(253, 231, 37),
];

/// Perceptually uniform dark-purple to yellow ramp. `t` is clamped to [0, 1];
/// NaN maps to the bottom of the ramp.
pub fn interpolate_viridis(t: f64) -> Rgb {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let segs = (VIRIDIS.len() - 1) as f64;
    let x = t * segs;
    let i = x.floor() as usize;
    if i >= VIRIDIS.len() - 1 {
        return VIRIDIS[VIRIDIS.len() - 1];
    }
    VIRIDIS[i].lerp(VIRIDIS[i + 1], x - i as f64)
}
