use crate::scale::Rgb;

/// Braille Unicode canvas for high-resolution terminal graphics.
/// Each character cell represents a 2x4 pixel grid (8 dots) and carries
/// an optional foreground (dot) color and background (fill) color.
/// Unicode Braille patterns: U+2800 to U+28FF
pub struct BrailleCanvas {
    width: usize,  // Characters
    height: usize, // Characters
    pixels: Vec<Vec<u8>>, // Bit patterns per char
    fg: Vec<Vec<Option<Rgb>>>,
    bg: Vec<Vec<Option<Rgb>>>,
    pen: Option<Rgb>,
}

/// One rendered character cell
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cell {
    pub ch: char,
    pub fg: Option<Rgb>,
    pub bg: Option<Rgb>,
}

impl BrailleCanvas {
    /// Create a new canvas with the given character dimensions.
    /// Effective pixel resolution: width*2 x height*4
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![vec![0u8; width]; height],
            fg: vec![vec![None; width]; height],
            bg: vec![vec![None; width]; height],
            pen: None,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Color applied to every dot set from now on (last write wins per cell)
    pub fn set_pen(&mut self, color: Option<Rgb>) {
        self.pen = color;
    }

    /// Set a pixel at the given coordinates.
    /// Braille dot layout per character:
    /// ```text
    /// (0,0) (1,0)   bits: 0x01 0x08
    /// (0,1) (1,1)   bits: 0x02 0x10
    /// (0,2) (1,2)   bits: 0x04 0x20
    /// (0,3) (1,3)   bits: 0x40 0x80
    /// ```
    pub fn set_pixel(&mut self, x: usize, y: usize) {
        let cx = x / 2;
        let cy = y / 4;

        if cx >= self.width || cy >= self.height {
            return;
        }

        let bit = match (x % 2, y % 4) {
            (0, 0) => 0x01,
            (1, 0) => 0x08,
            (0, 1) => 0x02,
            (1, 1) => 0x10,
            (0, 2) => 0x04,
            (1, 2) => 0x20,
            (0, 3) => 0x40,
            (1, 3) => 0x80,
            _ => 0,
        };

        self.pixels[cy][cx] |= bit;
        if self.pen.is_some() {
            self.fg[cy][cx] = self.pen;
        }
    }

    /// Set a pixel using signed coordinates (ignores negative values)
    pub fn set_pixel_signed(&mut self, x: i32, y: i32) {
        if x >= 0 && y >= 0 {
            self.set_pixel(x as usize, y as usize);
        }
    }

    /// Paint the background of a whole character cell
    pub fn fill_cell(&mut self, cx: usize, cy: usize, color: Rgb) {
        if cx < self.width && cy < self.height {
            self.bg[cy][cx] = Some(color);
        }
    }

    pub fn cell(&self, cx: usize, cy: usize) -> Option<Cell> {
        if cx >= self.width || cy >= self.height {
            return None;
        }
        Some(Cell {
            ch: braille_char(self.pixels[cy][cx]),
            fg: self.fg[cy][cx],
            bg: self.bg[cy][cx],
        })
    }

    /// Cells that carry dots or a fill, with their character coordinates
    pub fn painted_cells(&self) -> impl Iterator<Item = (usize, usize, Cell)> + '_ {
        (0..self.height).flat_map(move |cy| {
            (0..self.width).filter_map(move |cx| {
                let cell = self.cell(cx, cy)?;
                (cell.ch != '\u{2800}' || cell.bg.is_some()).then_some((cx, cy, cell))
            })
        })
    }

    /// Convert the canvas to a string of Braille characters
    #[cfg(test)]
    pub fn to_string(&self) -> String {
        (0..self.height)
            .map(|i| self.row_to_string(i))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Get a specific row as a string (for line-by-line rendering)
    pub fn row_to_string(&self, row: usize) -> String {
        if row >= self.height {
            return String::new();
        }
        self.pixels[row].iter().map(|&b| braille_char(b)).collect()
    }
}

#[inline]
fn braille_char(bits: u8) -> char {
    char::from_u32(0x2800 + bits as u32).unwrap_or(' ')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pixel() {
        let mut canvas = BrailleCanvas::new(1, 1);
        canvas.set_pixel(0, 0);
        assert_eq!(canvas.to_string(), "⠁"); // U+2801
    }

    #[test]
    fn test_all_dots() {
        let mut canvas = BrailleCanvas::new(1, 1);
        for x in 0..2 {
            for y in 0..4 {
                canvas.set_pixel(x, y);
            }
        }
        assert_eq!(canvas.to_string(), "⣿"); // U+28FF (all dots)
    }

    #[test]
    fn test_pen_colors_cell() {
        let mut canvas = BrailleCanvas::new(2, 1);
        canvas.set_pen(Some(Rgb::WHITE));
        canvas.set_pixel(0, 0);
        canvas.set_pen(None);
        canvas.set_pixel(2, 0);

        let first = canvas.cell(0, 0).unwrap();
        assert_eq!(first.fg, Some(Rgb::WHITE));
        let second = canvas.cell(1, 0).unwrap();
        assert_eq!(second.ch, '⠁');
        assert_eq!(second.fg, None);
    }

    #[test]
    fn test_fill_and_painted_cells() {
        let mut canvas = BrailleCanvas::new(3, 2);
        canvas.fill_cell(1, 1, Rgb::new(68, 1, 84));
        canvas.fill_cell(9, 9, Rgb::BLACK); // out of range, ignored
        canvas.set_pixel(0, 0);

        let painted: Vec<_> = canvas.painted_cells().map(|(x, y, _)| (x, y)).collect();
        assert_eq!(painted, vec![(0, 0), (1, 1)]);
        assert_eq!(canvas.cell(1, 1).unwrap().bg, Some(Rgb::new(68, 1, 84)));
        assert!(canvas.cell(3, 0).is_none());
    }
}
