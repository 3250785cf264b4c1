use glam::DVec2;

use crate::braille::BrailleCanvas;
use crate::scale::Rgb;

/// Walk a line with Bresenham's algorithm, calling `plot` for every pixel
fn bresenham(x0: i32, y0: i32, x1: i32, y1: i32, mut plot: impl FnMut(i32, i32)) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        plot(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    bresenham(x0, y0, x1, y1, |x, y| canvas.set_pixel_signed(x, y));
}

/// Draw a line with `dash` pixels on, `dash` pixels off.
/// `phase` carries the pattern position across consecutive segments of a ring.
pub fn draw_dashed_line(
    canvas: &mut BrailleCanvas,
    (x0, y0): (i32, i32),
    (x1, y1): (i32, i32),
    dash: u32,
    phase: &mut u32,
) {
    let period = dash.max(1) * 2;
    bresenham(x0, y0, x1, y1, |x, y| {
        if *phase % period < dash.max(1) {
            canvas.set_pixel_signed(x, y);
        }
        *phase = phase.wrapping_add(1);
    });
}

/// Stroke a line `weight` pixels wide by offsetting copies down and right
pub fn draw_weighted_line(
    canvas: &mut BrailleCanvas,
    p0: (i32, i32),
    p1: (i32, i32),
    weight: u8,
    dash: Option<u32>,
    phase: &mut u32,
) {
    for w in 0..weight.max(1) as i32 {
        let (a, b) = if (p1.0 - p0.0).abs() >= (p1.1 - p0.1).abs() {
            ((p0.0, p0.1 + w), (p1.0, p1.1 + w))
        } else {
            ((p0.0 + w, p0.1), (p1.0 + w, p1.1))
        };
        match dash {
            Some(dash) => {
                // Each copy restarts from the same phase so dashes line up
                let mut p = *phase;
                draw_dashed_line(canvas, a, b, dash, &mut p);
                if w == weight.max(1) as i32 - 1 {
                    *phase = p;
                }
            }
            None => draw_line(canvas, a.0, a.1, b.0, b.1),
        }
    }
}

/// Draw a marker pin: a small filled head with a stem ending at (x, y)
pub fn draw_pin(canvas: &mut BrailleCanvas, x: i32, y: i32) {
    draw_circle(canvas, x, y - 4, 1);
    draw_line(canvas, x, y - 2, x, y);
}

/// Draw a filled circle
pub fn draw_circle(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: i32) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                canvas.set_pixel_signed(cx + dx, cy + dy);
            }
        }
    }
}

/// Fill a polygon (exterior plus holes, even-odd rule) at character-cell
/// resolution. Ring coordinates are in Braille pixel space; a cell is
/// filled when its center lies inside.
pub fn fill_polygon(canvas: &mut BrailleCanvas, rings: &[Vec<DVec2>], color: Rgb) {
    let (min_y, max_y) = rings
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
    if !min_y.is_finite() || !max_y.is_finite() {
        return;
    }

    let first_row = ((min_y / 4.0).floor().max(0.0)) as usize;
    let last_row = ((max_y / 4.0).ceil().max(0.0) as usize).min(canvas.height());
    let mut crossings: Vec<f64> = Vec::new();

    for cy in first_row..last_row {
        let sy = cy as f64 * 4.0 + 2.0;
        crossings.clear();
        for ring in rings {
            scanline_crossings(ring, sy, &mut crossings);
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        for span in crossings.chunks_exact(2) {
            // Cell centers sit at x = cx*2 + 1
            let start = ((span[0] - 1.0) / 2.0).ceil().max(0.0) as usize;
            let end = ((span[1] - 1.0) / 2.0).ceil().max(0.0) as usize;
            for cx in start..end.min(canvas.width()) {
                canvas.fill_cell(cx, cy, color);
            }
        }
    }
}

/// X positions where a closed ring crosses the horizontal line `y`
fn scanline_crossings(ring: &[DVec2], y: f64, out: &mut Vec<f64>) {
    if ring.len() < 3 {
        return;
    }
    let mut prev = ring[ring.len() - 1];
    for &p in ring {
        if (p.y > y) != (prev.y > y) {
            let t = (y - prev.y) / (p.y - prev.y);
            out.push(prev.x + t * (p.x - prev.x));
        }
        prev = p;
    }
}

/// Even-odd point-in-polygon test over an exterior ring and its holes
pub fn point_in_rings(rings: &[Vec<DVec2>], point: DVec2) -> bool {
    let mut inside = false;
    for ring in rings {
        if ring.len() < 3 {
            continue;
        }
        let mut j = ring.len() - 1;
        for i in 0..ring.len() {
            let (a, b) = (ring[i], ring[j]);
            if (a.y > point.y) != (b.y > point.y)
                && point.x < (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x
            {
                inside = !inside;
            }
            j = i;
        }
    }
    inside
}
