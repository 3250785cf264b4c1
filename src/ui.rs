use crate::app::App;
use health_map::braille::BrailleCanvas;
use health_map::map::{Legend, LegendPosition, LegendSymbol, MapLayers, MapRenderer, PlacedPopup};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame,
};

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Split into map area and status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_map(frame, app, chunks[0]);
    render_status_bar(frame, app, chunks[1]);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let title = app
        .view
        .map()
        .map_or_else(|| " Health Map ".to_string(), |m| format!(" {} ", m.container()));
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(map) = app.view.map() else {
        return;
    };

    // Braille gives 2x4 resolution per character
    let mut viewport = app.viewport.clone();
    viewport.width = inner.width as usize * 2;
    viewport.height = inner.height as usize * 4;

    let layers = app.renderer.render(map, &viewport);

    let cursor_pos = app.mouse_pixel_pos().and_then(|(px, py)| {
        let cx = (px / 2) as u16;
        let cy = (py / 4) as u16;
        (cx < inner.width && cy < inner.height).then_some((cx, cy))
    });

    frame.render_widget(MapWidget { layers, cursor_pos }, inner);
}

/// Custom widget that renders braille map with text labels overlaid
struct MapWidget {
    layers: MapLayers,
    cursor_pos: Option<(u16, u16)>,
}

impl MapWidget {
    /// Copy painted cells of a canvas into the buffer.
    /// Fills become cell backgrounds; dots keep their own color or `default_fg`.
    fn render_layer(canvas: &BrailleCanvas, default_fg: Color, area: Rect, buf: &mut Buffer) {
        for (cx, cy, cell) in canvas.painted_cells() {
            if cx >= area.width as usize || cy >= area.height as usize {
                continue;
            }
            let target = &mut buf[(area.x + cx as u16, area.y + cy as u16)];
            if let Some(bg) = cell.bg {
                target.set_bg(bg.into());
            }
            // Skip empty braille characters (U+2800)
            if cell.ch != '\u{2800}' {
                target
                    .set_char(cell.ch)
                    .set_fg(cell.fg.map_or(default_fg, Color::from));
            }
        }
    }

    fn put_str(buf: &mut Buffer, area: Rect, x: i32, y: i32, text: &str, style: Style) {
        if y < 0 || y >= area.height as i32 {
            return;
        }
        for (i, ch) in text.chars().enumerate() {
            let px = x + i as i32;
            if px < 0 {
                continue;
            }
            if px >= area.width as i32 {
                break;
            }
            buf[(area.x + px as u16, area.y + y as u16)].set_char(ch).set_style(style);
        }
    }

    /// Boxed popup whose bottom edge sits on the popup anchor row
    fn render_popup(popup: &PlacedPopup, area: Rect, buf: &mut Buffer) {
        let width = popup.text.chars().count() as i32 + 4;
        let left = (popup.col - width / 2).clamp(0, (area.width as i32 - width).max(0));
        let top = popup.row - 2;
        let style = Style::default().fg(Color::Black).bg(Color::White);
        let bar = "─".repeat(width as usize - 2);

        Self::put_str(buf, area, left, top, &format!("┌{bar}┐"), style);
        Self::put_str(buf, area, left, top + 1, &format!("│ {} │", popup.text), style);
        Self::put_str(buf, area, left, top + 2, &format!("└{bar}┘"), style);
    }

    /// Legend box pinned to the corner its position names
    fn render_legend(legend: &Legend, area: Rect, buf: &mut Buffer) {
        let frame_style = Style::default().fg(Color::Gray).bg(Color::Black);
        let title_style = frame_style.add_modifier(Modifier::BOLD);

        let mut lines: Vec<(Option<Color>, String)> = Vec::with_capacity(legend.line_count());
        for entry in &legend.entries {
            match &entry.symbol {
                LegendSymbol::Swatch(rgb) => lines.push((Some((*rgb).into()), entry.label.clone())),
                LegendSymbol::Icon { .. } => lines.push((None, format!("┄ {}", entry.label))),
            }
        }
        if let Some(ramp) = &legend.ramp {
            lines.push((None, ramp.unit.clone()));
            for (value, rgb) in &ramp.stops {
                lines.push((Some((*rgb).into()), format!("{value:.1}")));
            }
        }

        let width = lines
            .iter()
            .map(|(swatch, text)| text.chars().count() + if swatch.is_some() { 2 } else { 0 })
            .chain(std::iter::once(legend.title.chars().count()))
            .max()
            .unwrap_or(0) as i32
            + 2;
        let (left, top) = legend_origin(
            legend.position,
            area.width as i32,
            area.height as i32,
            width,
            legend.line_count() as i32,
        );

        Self::put_str(buf, area, left, top, &format!(" {:<w$} ", legend.title, w = width as usize - 2), title_style);
        for (i, (swatch, text)) in lines.iter().enumerate() {
            let y = top + 1 + i as i32;
            let body = match swatch {
                Some(_) => format!(" ■ {text:<w$} ", w = width as usize - 4),
                None => format!(" {text:<w$} ", w = width as usize - 2),
            };
            Self::put_str(buf, area, left, y, &body, frame_style);
            if let Some(color) = swatch {
                Self::put_str(buf, area, left + 1, y, "■", frame_style.fg(*color));
            }
        }
    }
}

/// Top-left cell of a `width` x `height` box anchored in one corner of the area
fn legend_origin(position: LegendPosition, area_w: i32, area_h: i32, width: i32, height: i32) -> (i32, i32) {
    let right = (area_w - width).max(0);
    let bottom = area_h - height;
    match position {
        LegendPosition::TopLeft => (0, 0),
        LegendPosition::TopRight => (right, 0),
        LegendPosition::BottomLeft => (0, bottom),
        LegendPosition::BottomRight => (right, bottom),
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Back to front: basemap, choropleth fills and strokes, markers
        Self::render_layer(&self.layers.basemap, Color::DarkGray, area, buf);
        Self::render_layer(&self.layers.overlays, Color::White, area, buf);
        Self::render_layer(&self.layers.markers, Color::Blue, area, buf);

        let label_style = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
        for (lx, ly, text) in &self.layers.labels {
            Self::put_str(buf, area, *lx as i32, *ly as i32, text, label_style);
        }

        if let Some(legend) = &self.layers.legend {
            Self::render_legend(legend, area, buf);
        }

        if let Some(attribution) = &self.layers.attribution {
            let x = area.width as i32 - attribution.chars().count() as i32 - 1;
            let style = Style::default().fg(Color::Gray);
            Self::put_str(buf, area, x.max(0), area.height as i32 - 1, attribution, style);
        }

        if let Some(popup) = &self.layers.popup {
            Self::render_popup(popup, area, buf);
        }

        // Render cursor marker
        if let Some((cx, cy)) = self.cursor_pos {
            let x = area.x + cx;
            let y = area.y + cy;
            if x < area.x + area.width && y < area.y + area.height {
                buf[(x, y)].set_char('╋').set_fg(Color::Red);
            }
        }
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let settings = &app.renderer.settings;
    let toggle = |on: bool, active: &'static str, inactive: &'static str| {
        Span::styled(
            if on { active } else { inactive },
            Style::default().fg(if on { Color::Green } else { Color::DarkGray }),
        )
    };
    let mut spans = vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" (", Style::default().fg(Color::DarkGray)),
        Span::styled(app.tile_label(), Style::default().fg(Color::Magenta)),
        Span::styled(") ", Style::default().fg(Color::DarkGray)),
        toggle(settings.show_basemap, "[B]asemap ", "[b]asemap "),
        toggle(settings.show_overlays, "[C]horopleth ", "[c]horopleth "),
        toggle(settings.show_markers, "[M]arkers ", "[m]arkers "),
        toggle(settings.show_labels, "[L]abels ", "[L]abels "),
        Span::styled("| ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
    ];
    if let Some(status) = &app.status {
        spans.push(Span::styled(" | ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(status.clone(), Style::default().fg(Color::White)));
    }
    spans.push(Span::styled(
        " | hjkl:pan +/-:zoom click:select o:clear r:reset q:quit",
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
