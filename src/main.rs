mod app;
mod ui;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use health_map::map::BrailleRenderer;
use health_map::{data, MapOptions, MapView, DEFAULT_CENTER, DEFAULT_ZOOM};
use ratatui::DefaultTerminal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Terminal map of health locations with choropleth overlays")]
struct Args {
    /// GeoJSON FeatureCollection to draw as a choropleth (repeatable)
    #[arg(short, long)]
    geojson: Vec<PathBuf>,

    /// Administrative level named in overlay popups
    #[arg(short, long, default_value = "District")]
    admin_level: String,

    /// Unit of interest named in overlay popups
    #[arg(short, long, default_value = "clinics")]
    unit: String,

    /// Health locations: a JSON array of {name, latitude, longitude},
    /// or a GeoJSON FeatureCollection of points
    #[arg(short, long)]
    locations: Option<PathBuf>,

    /// GeoJSON outlines drawn under everything else
    #[arg(short, long)]
    basemap: Option<PathBuf>,

    /// Write logs here; RUST_LOG controls the filter (default info)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let mut view = MapView::new(MapOptions::default());
    let mut renderer = BrailleRenderer::new();
    load_data(&args, &mut view, &mut renderer)?;
    view.initialize("Health Map", DEFAULT_CENTER, DEFAULT_ZOOM)
        .context("initializing map")?;

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, view, renderer);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Logging goes to a file or nowhere; stderr would corrupt the TUI
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
    Ok(())
}

/// Queue everything on the view before it is initialized; it replays on init
fn load_data(args: &Args, view: &mut MapView, renderer: &mut BrailleRenderer) -> Result<()> {
    if let Some(path) = &args.basemap {
        data::load_basemap(renderer, path)
            .with_context(|| format!("loading basemap {}", path.display()))?;
    }

    if let Some(path) = &args.locations {
        let mut locations = data::load_locations(path)
            .with_context(|| format!("loading locations {}", path.display()))?;
        if locations.is_empty() {
            // Not a plain array: try a FeatureCollection of points
            locations = data::load_point_locations(path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "no locations found");
                Vec::new()
            });
        }
        view.set_health_locations(locations);
    }

    for path in &args.geojson {
        match data::load_feature_collection(path) {
            Ok(fc) => view.add_geojson(&fc, &args.admin_level, &args.unit),
            Err(e) => warn!(path = %path.display(), error = %e, "overlay skipped"),
        }
    }
    Ok(())
}

/// Handle mouse events for panning, zooming and selection
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    app.set_mouse_pos(mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        MouseEventKind::Down(MouseButton::Left) => app.press(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.handle_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.release(mouse.column, mouse.row),
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, view: MapView, renderer: BrailleRenderer) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(view, renderer, size.width as usize, size.height as usize);
    info!("event loop started");

    loop {
        terminal.draw(|frame| ui::render(frame, &app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') => app.quit(),
                    KeyCode::Esc => app.escape(),

                    // Pan with hjkl or arrow keys
                    KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
                    KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
                    KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
                    KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

                    KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
                    KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

                    // Layer toggles
                    KeyCode::Char('b') | KeyCode::Char('B') => app.renderer.toggle_basemap(),
                    KeyCode::Char('c') | KeyCode::Char('C') => app.renderer.toggle_overlays(),
                    KeyCode::Char('m') | KeyCode::Char('M') => app.renderer.toggle_markers(),
                    KeyCode::Char('L') => app.renderer.toggle_labels(),

                    KeyCode::Char('o') | KeyCode::Char('O') => app.clear_overlays(),
                    KeyCode::Char('r') | KeyCode::Char('0') => app.reset_view(),
                    _ => {}
                },
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(width as usize, height as usize),
                _ => {}
            }
        }

        app.poll_events();

        if app.should_quit {
            break;
        }
    }

    info!("event loop finished");
    Ok(())
}
