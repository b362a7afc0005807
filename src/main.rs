use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use directories::ProjectDirs;
use lazy_static::lazy_static;
use ratatui::{
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Block,
    Frame, Terminal,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use glyphfall::{
    parse_hex_color, Backdrop, CellShape, DrawContext, FontSpec, RainEngine, RainOptions, Rgba,
};

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Animation tick interval in milliseconds
    pub tick_ms: u64,

    /// RNG seed for a reproducible animation
    pub seed: Option<u64>,

    /// Grid dimensions
    pub grid: GridConfig,

    /// Shape, color and text configuration
    pub style: StyleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub columns: u16,
    pub rows: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Cell shape: "line", "rectangle", "circle", "text"
    pub mode: String,
    /// Fill color as RGB hex ("00FF00", "#00FF00" or "0x00FF00")
    pub fill: String,
    /// Border/stroke color as RGB hex
    pub border: String,
    /// Background color as RGB hex; empty keeps the terminal background
    pub background: String,
    /// Candidate glyphs for text mode
    pub glyphs: String,
    /// Font face requested from the drawing surface
    pub font: String,
    pub font_size: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tick_ms: 100,
            seed: None,
            grid: GridConfig::default(),
            style: StyleConfig::default(),
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            columns: 32,
            rows: 16,
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        StyleConfig {
            mode: "text".to_string(),
            fill: "000000".to_string(),
            border: "00FF00".to_string(),
            background: "000000".to_string(),
            glyphs: "ｱｲｳｴｵｶｷｸｹｺ0123456789".to_string(),
            font: "DejaVu Sans".to_string(),
            font_size: 17.0,
        }
    }
}

// ============================================================================
// OPTION PARSING
// ============================================================================

fn parse_mode(mode: &str) -> CellShape {
    match mode.to_lowercase().as_str() {
        "line" => CellShape::Line,
        "rectangle" | "rect" => CellShape::Rectangle,
        "circle" => CellShape::Circle,
        "text" => CellShape::Text,
        _ => CellShape::Rectangle,
    }
}

lazy_static! {
    static ref GRID_SPEC: Regex = Regex::new(r"^(\d{1,3})x(\d{1,3})$").unwrap();
}

/// Parses a "COLSxROWS" grid override like "32x16".
fn parse_grid_spec(spec: &str) -> Option<(u16, u16)> {
    let caps = GRID_SPEC.captures(spec.trim())?;
    let cols = caps[1].parse().ok()?;
    let rows = caps[2].parse().ok()?;
    Some((cols, rows))
}

// ============================================================================
// CONFIG LOADING
// ============================================================================

fn get_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "glyphfall").map(|dirs| dirs.config_dir().join("config.toml"))
}

fn load_config() -> Config {
    if let Some(config_path) = get_config_path() {
        if config_path.exists() {
            match fs::read_to_string(&config_path) {
                Ok(content) => match toml::from_str::<Config>(&content) {
                    Ok(config) => {
                        return config;
                    }
                    Err(e) => {
                        eprintln!("Warning: Failed to parse config file: {}", e);
                        eprintln!("Using default configuration.");
                    }
                },
                Err(e) => {
                    eprintln!("Warning: Failed to read config file: {}", e);
                    eprintln!("Using default configuration.");
                }
            }
        }
    }
    Config::default()
}

fn generate_default_config() -> String {
    String::from(
        r##"## glyphfall configuration file
## Place this file at ~/.config/glyphfall/config.toml
## All fields are optional - defaults will be used for missing values

## Animation tick interval in milliseconds
tick_ms = 100

## Uncomment for a reproducible animation
# seed = 42

[grid]
## How many columns and rows the screen is divided into.
## Values below 1 are clamped to 1.
columns = 32
rows = 16

[style]
## What falls down each column: "line", "rectangle", "circle" or "text"
mode = "text"

## Colors are RGB hex strings: "00FF00", "#00FF00" or "0x00FF00".
## fill paints shape interiors and the box behind text glyphs,
## border paints outlines and the glyphs themselves.
fill = "000000"
border = "00FF00"

## Background of the whole screen; leave empty to keep the terminal background
background = "000000"

## Candidate glyphs for text mode; one is picked per column per frame
glyphs = "ｱｲｳｴｵｶｷｸｹｺ0123456789"

## Font face requested from the drawing surface. The terminal renders with
## its own font; the face is forwarded to surfaces that can resolve one.
font = "DejaVu Sans"
font_size = 17.0
"##,
    )
}

fn generate_config_file() -> Result<()> {
    let config_path = get_config_path().context("Could not determine config directory")?;

    let config_dir = config_path.parent().context("Invalid config path")?;

    fs::create_dir_all(config_dir).with_context(|| {
        format!(
            "Failed to create config directory: {}",
            config_dir.display()
        )
    })?;

    let default_config = generate_default_config();

    fs::write(&config_path, default_config)
        .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

    println!(
        "Default configuration file created at: {}",
        config_path.display()
    );
    println!("Edit this file to customize the animation.");

    Ok(())
}

fn load_config_from_path(path: &PathBuf) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

// ============================================================================
// BUFFER PAINTING
// ============================================================================

/// One pending paint operation; the frame batch is flushed by
/// `fill_and_stroke`.
#[derive(Debug)]
enum PaintOp {
    Segment {
        from: (f64, f64),
        to: (f64, f64),
        stroke: Option<Color>,
    },
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        fill: Option<Color>,
        stroke: Option<Color>,
    },
    Ring {
        cx: f64,
        cy: f64,
        radius: f64,
        stroke: Option<Color>,
    },
    Glyph {
        ch: char,
        x: f64,
        y: f64,
        fg: Option<Color>,
        bg: Option<Color>,
    },
}

/// The engine's drawing surface, implemented over the ratatui cell buffer.
/// One "pixel" is one terminal cell.
struct BufferContext<'a> {
    buf: &'a mut Buffer,
    area: Rect,
    fill: Option<Color>,
    stroke: Option<Color>,
    cursor: (f64, f64),
    ops: Vec<PaintOp>,
}

impl<'a> BufferContext<'a> {
    fn new(buf: &'a mut Buffer, area: Rect) -> Self {
        BufferContext {
            buf,
            area,
            fill: None,
            stroke: None,
            cursor: (0.0, 0.0),
            ops: Vec::new(),
        }
    }

    fn put(&mut self, x: i64, y: i64, ch: char, fg: Option<Color>, bg: Option<Color>) {
        if x < 0 || y < 0 || x >= i64::from(self.area.width) || y >= i64::from(self.area.height) {
            return;
        }
        let cell = &mut self.buf[(self.area.x + x as u16, self.area.y + y as u16)];
        cell.set_char(ch);
        if let Some(fg) = fg {
            cell.set_fg(fg);
        }
        if let Some(bg) = bg {
            cell.set_bg(bg);
        }
    }

    fn paint_segment(&mut self, from: (f64, f64), to: (f64, f64), stroke: Option<Color>) {
        let Some(color) = stroke else { return };
        let (x0, y0) = (from.0.round() as i64, from.1.round() as i64);
        let (x1, y1) = (to.0.round() as i64, to.1.round() as i64);
        let glyph = if x0 == x1 {
            '│'
        } else if y0 == y1 {
            '─'
        } else {
            '·'
        };
        let steps = (x1 - x0).abs().max((y1 - y0).abs());
        if steps == 0 {
            self.put(x0, y0, glyph, Some(color), None);
            return;
        }
        // Stop one short of the far endpoint so a cell-high trail stays
        // inside its own cell.
        for i in 0..steps {
            let x = x0 + (x1 - x0) * i / steps;
            let y = y0 + (y1 - y0) * i / steps;
            self.put(x, y, glyph, Some(color), None);
        }
    }

    fn paint_rect(
        &mut self,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        fill: Option<Color>,
        stroke: Option<Color>,
    ) {
        let x0 = x.round() as i64;
        let y0 = y.round() as i64;
        let w = w.round() as i64;
        let h = h.round() as i64;
        for dy in 0..h {
            for dx in 0..w {
                let on_border = dx == 0 || dy == 0 || dx == w - 1 || dy == h - 1;
                let color = if on_border { stroke.or(fill) } else { fill };
                if let Some(color) = color {
                    self.put(x0 + dx, y0 + dy, '█', Some(color), None);
                }
            }
        }
    }

    fn paint_ring(&mut self, cx: f64, cy: f64, radius: f64, stroke: Option<Color>) {
        let Some(color) = stroke else { return };
        let (cx, cy) = (cx.round() as i64, cy.round() as i64);
        let reach = radius.ceil() as i64;
        // Mark every cell whose distance to the center is within half a cell
        // of the radius.
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let dist = ((dx * dx + dy * dy) as f64).sqrt();
                if (dist - radius).abs() <= 0.5 {
                    self.put(cx + dx, cy + dy, '●', Some(color), None);
                }
            }
        }
    }

    fn paint_glyph(&mut self, ch: char, x: f64, y: f64, fg: Option<Color>, bg: Option<Color>) {
        // Terminal glyphs are cell-sized; the requested font box collapses to
        // the anchor cell.
        self.put(x.round() as i64, y.round() as i64, ch, fg, bg);
    }
}

impl DrawContext for BufferContext<'_> {
    fn set_fill(&mut self, color: Rgba) {
        self.fill = to_color(color);
    }

    fn set_stroke(&mut self, color: Rgba) {
        self.stroke = to_color(color);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.cursor = (x, y);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.ops.push(PaintOp::Segment {
            from: self.cursor,
            to: (x, y),
            stroke: self.stroke,
        });
        self.cursor = (x, y);
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.ops.push(PaintOp::Rect {
            x,
            y,
            w: width,
            h: height,
            fill: self.fill,
            stroke: self.stroke,
        });
    }

    fn circle(&mut self, cx: f64, cy: f64, radius: f64) {
        self.ops.push(PaintOp::Ring {
            cx,
            cy,
            radius,
            stroke: self.stroke,
        });
    }

    fn text(&mut self, glyph: char, x: f64, y: f64, _width: f64, _height: f64, _font: &FontSpec) {
        self.ops.push(PaintOp::Glyph {
            ch: glyph,
            x,
            y,
            fg: self.stroke,
            bg: self.fill,
        });
    }

    fn fill_and_stroke(&mut self) {
        let ops = std::mem::take(&mut self.ops);
        for op in ops {
            match op {
                PaintOp::Segment { from, to, stroke } => self.paint_segment(from, to, stroke),
                PaintOp::Rect {
                    x,
                    y,
                    w,
                    h,
                    fill,
                    stroke,
                } => self.paint_rect(x, y, w, h, fill, stroke),
                PaintOp::Ring {
                    cx,
                    cy,
                    radius,
                    stroke,
                } => self.paint_ring(cx, cy, radius, stroke),
                PaintOp::Glyph { ch, x, y, fg, bg } => self.paint_glyph(ch, x, y, fg, bg),
            }
        }
    }
}

fn to_color(color: Rgba) -> Option<Color> {
    if color.is_transparent() {
        return None;
    }
    Some(Color::Rgb(
        (color.r * 255.0).round() as u8,
        (color.g * 255.0).round() as u8,
        (color.b * 255.0).round() as u8,
    ))
}

// ============================================================================
// UI RENDERING
// ============================================================================

fn draw_rain(frame: &mut Frame, engine: &mut RainEngine) {
    let area = frame.area();

    if let Some(bg) = to_color(engine.background()) {
        frame.render_widget(Block::default().style(Style::default().bg(bg)), area);
    }

    let mut ctx = BufferContext::new(frame.buffer_mut(), area);
    engine.redraw(&mut ctx);
}

// ============================================================================
// MAIN
// ============================================================================

#[derive(Parser)]
#[command(name = "glyphfall")]
#[command(version = "0.1.0")]
#[command(about = "Matrix-style falling glyph animation for the terminal", long_about = None)]
struct Cli {
    /// Generate default configuration file
    #[arg(short, long)]
    init: bool,

    /// Specify custom config file path
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Grid dimensions as COLSxROWS, e.g. 32x16
    #[arg(short, long, value_name = "COLSxROWS")]
    grid: Option<String>,

    /// Cell shape: line, rectangle, circle or text
    #[arg(short, long, value_name = "MODE")]
    mode: Option<String>,

    /// Fill color as RGB hex
    #[arg(long, value_name = "HEX")]
    fill: Option<String>,

    /// Border/stroke color as RGB hex
    #[arg(long, value_name = "HEX")]
    border: Option<String>,

    /// Background color as RGB hex (empty keeps the terminal background)
    #[arg(long, value_name = "HEX")]
    background: Option<String>,

    /// Glyph pool for text mode
    #[arg(long, value_name = "CHARS")]
    glyphs: Option<String>,

    /// Animation tick interval in milliseconds
    #[arg(long, value_name = "MS")]
    tick_ms: Option<u64>,

    /// Seed the animation for a reproducible run
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(spec) = &cli.grid {
        match parse_grid_spec(spec) {
            Some((cols, rows)) => {
                config.grid.columns = cols;
                config.grid.rows = rows;
            }
            None => eprintln!(
                "Warning: invalid grid spec \"{}\", expected COLSxROWS",
                spec
            ),
        }
    }
    if let Some(mode) = &cli.mode {
        config.style.mode = mode.clone();
    }
    if let Some(fill) = &cli.fill {
        config.style.fill = fill.clone();
    }
    if let Some(border) = &cli.border {
        config.style.border = border.clone();
    }
    if let Some(background) = &cli.background {
        config.style.background = background.clone();
    }
    if let Some(glyphs) = &cli.glyphs {
        config.style.glyphs = glyphs.clone();
    }
    if let Some(tick_ms) = cli.tick_ms {
        config.tick_ms = tick_ms;
    }
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle --init flag
    if cli.init {
        return generate_config_file();
    }

    // Load configuration
    let mut config = if let Some(config_path) = &cli.config {
        load_config_from_path(config_path)?
    } else {
        load_config()
    };
    apply_overrides(&mut config, &cli);

    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to setup terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    // Run the animation
    let res = run_app(&mut terminal, &config);

    // Restore terminal
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen).context("Failed to restore terminal")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

fn build_engine(config: &Config, viewport: (u32, u32)) -> RainEngine {
    let style = &config.style;
    let background = if style.background.trim().is_empty() {
        Backdrop::Transparent
    } else {
        Backdrop::Solid(style.background.clone())
    };

    RainEngine::new(
        viewport,
        RainOptions {
            grid: (config.grid.columns, config.grid.rows),
            shape: parse_mode(&style.mode),
            background,
            fill: Some(style.fill.clone()),
            border: Some(style.border.clone()),
            glyphs: Some(style.glyphs.clone()),
            font_name: Some(style.font.clone()),
            font_size: Some(style.font_size),
            tick: Duration::from_millis(config.tick_ms.max(1)),
            seed: config.seed,
        },
    )
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    config: &Config,
) -> Result<()> {
    let size = terminal.size().context("Failed to read terminal size")?;
    let mut engine = build_engine(config, (u32::from(size.width), u32::from(size.height)));
    engine.start();

    loop {
        if engine.tick(Instant::now()) {
            terminal.draw(|frame| draw_rain(frame, &mut engine))?;
        }

        if event::poll(Duration::from_millis(10))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Char(' ') => {
                        if engine.is_running() {
                            engine.stop();
                        } else {
                            engine.start();
                        }
                    }
                    _ => {}
                },
                Event::Resize(width, height) => {
                    // The grid is fixed for an engine's lifetime; a resize
                    // builds a fresh engine over the new viewport.
                    let running = engine.is_running();
                    engine = build_engine(config, (u32::from(width), u32::from(height)));
                    if running {
                        engine.start();
                    }
                }
                _ => {}
            }
        }
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
