//! Falling-glyph grid animation engine.
//!
//! The library is the backend-agnostic core: a viewport is partitioned into a
//! fixed grid of cells and every column scrolls one drawn shape downward,
//! wrapping at the bottom, on a fixed tick. A host embeds a [`RainEngine`],
//! implements [`DrawContext`] over its drawing surface and drives
//! [`RainEngine::tick`] from its event loop.

use std::time::{Duration, Instant};

use log::warn;
use rand::{rngs::StdRng, Rng, SeedableRng};

// ============================================================================
// COLOR PARSING
// ============================================================================

/// An RGBA color with normalized 0..=1 channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub const GRAY: Rgba = Rgba {
        r: 0.5,
        g: 0.5,
        b: 0.5,
        a: 1.0,
    };

    pub fn is_transparent(self) -> bool {
        self.a == 0.0
    }
}

/// Converts an RGB hex string ("00FF00", "#00FF00" or "0x00FF00") to an
/// [`Rgba`].
///
/// Never fails: an empty string maps to [`Rgba::TRANSPARENT`], any other
/// malformed input maps to [`Rgba::GRAY`], and non-hex digits inside a
/// correctly sized string parse as zero channels.
pub fn parse_hex_color(hex: &str) -> Rgba {
    let mut colorhex = hex.trim().to_uppercase();

    if colorhex.is_empty() {
        return Rgba::TRANSPARENT;
    }

    if colorhex.len() < 6 {
        return Rgba::GRAY;
    }

    // Strip at most one leading "0X" or "#".
    if let Some(rest) = colorhex.strip_prefix("0X") {
        colorhex = rest.to_string();
    } else if let Some(rest) = colorhex.strip_prefix('#') {
        colorhex = rest.to_string();
    }

    if colorhex.len() != 6 {
        return Rgba::GRAY;
    }

    let bytes = colorhex.as_bytes();
    let channel = |i: usize| {
        std::str::from_utf8(&bytes[i..i + 2])
            .ok()
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            .unwrap_or(0) as f32
            / 255.0
    };

    Rgba {
        r: channel(0),
        g: channel(2),
        b: channel(4),
        a: 1.0,
    }
}

// ============================================================================
// GRID LAYOUT
// ============================================================================

/// The fixed partition of a viewport into columns x rows of equal-sized
/// cells.
///
/// Cell sizes use integer-truncating division; remainder pixels at the right
/// and bottom edges are never rendered into. Immutable after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    cols: u16,
    rows: u16,
    width: u32,
    height: u32,
    cell_w: u32,
    cell_h: u32,
}

impl Grid {
    /// Lays out a grid over `viewport` pixels. Column/row requests below 1
    /// clamp to 1.
    pub fn new(viewport: (u32, u32), cols: u16, rows: u16) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        let (width, height) = viewport;
        Grid {
            cols,
            rows,
            width,
            height,
            cell_w: width / u32::from(cols),
            cell_h: height / u32::from(rows),
        }
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    pub fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn cell_size(&self) -> (u32, u32) {
        (self.cell_w, self.cell_h)
    }

    /// Pixel origin of cell (`col`, `row`). Pure; callable one past the last
    /// index on either axis, which yields the far edge of the grid.
    pub fn cell_origin(&self, col: u16, row: u16) -> (u32, u32) {
        (
            u32::from(col) * self.cell_w,
            u32::from(row) * self.cell_h,
        )
    }
}

// ============================================================================
// SCROLL STATE
// ============================================================================

/// Per-column scroll phase: which row is the active draw row of each column.
///
/// Columns advance in lockstep, one row per tick, wrapping at the bottom;
/// only their randomized starting phases differ, which is what staggers the
/// fall.
#[derive(Debug, Clone)]
pub struct ScrollState {
    rows: u16,
    active: Vec<u16>,
}

impl ScrollState {
    pub fn new(cols: u16, rows: u16, rng: &mut StdRng) -> Self {
        let rows = rows.max(1);
        let active = (0..cols.max(1)).map(|_| rng.gen_range(0..rows)).collect();
        ScrollState { rows, active }
    }

    /// The row currently eligible for drawing in `col`.
    pub fn active_row(&self, col: u16) -> u16 {
        self.active[usize::from(col)]
    }

    /// Advances one column by a row, wrapping at the bottom.
    pub fn advance_column(&mut self, col: u16) {
        let row = &mut self.active[usize::from(col)];
        *row = (*row + 1) % self.rows;
    }

    /// Advances every column by a row.
    pub fn advance(&mut self) {
        for row in &mut self.active {
            *row = (*row + 1) % self.rows;
        }
    }
}

// ============================================================================
// CELL RENDERING
// ============================================================================

/// Fill/border color pair threaded through every draw entry point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorPair {
    pub fill: Rgba,
    pub border: Rgba,
}

/// Font requested from the drawing surface for text cells.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub name: String,
    pub size: f64,
}

/// The drawing surface consumed by the engine, borrowed for one redraw at a
/// time and never retained.
///
/// Shape and glyph calls accumulate into the surface's pending batch;
/// [`fill_and_stroke`](DrawContext::fill_and_stroke) commits the whole frame
/// at once. Implementations resolve the requested font face themselves and
/// fall back to a fixed default when it cannot be resolved.
pub trait DrawContext {
    fn set_fill(&mut self, color: Rgba);
    fn set_stroke(&mut self, color: Rgba);
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn circle(&mut self, cx: f64, cy: f64, radius: f64);
    fn text(&mut self, glyph: char, x: f64, y: f64, width: f64, height: f64, font: &FontSpec);
    fn fill_and_stroke(&mut self);
}

/// The kind of object scrolled down every column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellShape {
    /// A vertical trail segment along the cell's left edge.
    Line,
    /// The full cell rectangle.
    #[default]
    Rectangle,
    /// A circle centered on the cell's top-left corner, radius half the cell
    /// width.
    Circle,
    /// One glyph from the configured pool.
    Text,
}

impl CellShape {
    /// Strokes the falling trail from the current cursor down to `to`.
    pub fn draw_line(self, ctx: &mut dyn DrawContext, to: (f64, f64), colors: ColorPair) {
        if self != CellShape::Line {
            warn!("draw_line invoked for {self:?} cells");
            return;
        }
        ctx.set_stroke(colors.border);
        ctx.set_fill(colors.fill);
        ctx.line_to(to.0, to.1);
    }

    /// Fills and strokes the full cell rectangle.
    pub fn draw_rect(
        self,
        ctx: &mut dyn DrawContext,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        colors: ColorPair,
    ) {
        if self != CellShape::Rectangle {
            warn!("draw_rect invoked for {self:?} cells");
            return;
        }
        ctx.set_stroke(colors.border);
        ctx.set_fill(colors.fill);
        ctx.rect(x, y, width, height);
    }

    /// Draws a full circle around `center`.
    pub fn draw_circle(
        self,
        ctx: &mut dyn DrawContext,
        center: (f64, f64),
        radius: f64,
        colors: ColorPair,
    ) {
        if self != CellShape::Circle {
            warn!("draw_circle invoked for {self:?} cells");
            return;
        }
        ctx.set_stroke(colors.border);
        ctx.set_fill(colors.fill);
        ctx.circle(center.0, center.1, radius);
    }

    /// Renders `glyph` centered in a font-sized box anchored at `pos`. The
    /// border color is the glyph color, the fill color backs the glyph.
    pub fn draw_text(
        self,
        ctx: &mut dyn DrawContext,
        pos: (f64, f64),
        glyph: char,
        font: &FontSpec,
        colors: ColorPair,
    ) {
        if self != CellShape::Text {
            warn!("draw_text invoked for {self:?} cells");
            return;
        }
        ctx.set_stroke(colors.border);
        ctx.set_fill(colors.fill);
        ctx.text(glyph, pos.0, pos.1, font.size, font.size, font);
    }
}

// ============================================================================
// ANIMATION ENGINE
// ============================================================================

pub const DEFAULT_COLOR: &str = "FFFF00";
pub const DEFAULT_GLYPHS: &str = "T";
pub const DEFAULT_FONT: &str = "DejaVu Sans";
pub const DEFAULT_FONT_SIZE: f64 = 17.0;
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Background of the whole widget.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Backdrop {
    /// Keep whatever the surface already shows.
    #[default]
    Transparent,
    /// One solid color, given as an RGB hex string.
    Solid(String),
}

impl Backdrop {
    fn resolve(&self) -> Rgba {
        match self {
            Backdrop::Transparent => Rgba::TRANSPARENT,
            Backdrop::Solid(hex) => parse_hex_color(hex),
        }
    }
}

/// Raw construction inputs for a [`RainEngine`].
///
/// Every field has a lenient default; malformed values degrade per the color
/// and grid rules instead of failing construction.
#[derive(Debug, Clone)]
pub struct RainOptions {
    /// Grid dimensions as (columns, rows); values below 1 clamp to 1.
    pub grid: (u16, u16),
    pub shape: CellShape,
    pub background: Backdrop,
    /// Fill color hex; `None` falls back to [`DEFAULT_COLOR`].
    pub fill: Option<String>,
    /// Border/stroke color hex; `None` falls back to [`DEFAULT_COLOR`].
    pub border: Option<String>,
    /// Candidate glyphs for [`CellShape::Text`]; one is picked per column per
    /// frame.
    pub glyphs: Option<String>,
    pub font_name: Option<String>,
    pub font_size: Option<f64>,
    pub tick: Duration,
    /// RNG seed for a reproducible animation; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for RainOptions {
    fn default() -> Self {
        RainOptions {
            grid: (1, 1),
            shape: CellShape::default(),
            background: Backdrop::default(),
            fill: None,
            border: None,
            glyphs: None,
            font_name: None,
            font_size: None,
            tick: DEFAULT_TICK,
            seed: None,
        }
    }
}

/// Resolved rendering configuration, immutable for the engine's lifetime.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub shape: CellShape,
    pub colors: ColorPair,
    pub backdrop: Rgba,
    pub glyphs: Vec<char>,
    pub font: FontSpec,
}

impl RenderConfig {
    fn resolve(opts: &RainOptions) -> Self {
        let glyphs: Vec<char> = opts
            .glyphs
            .as_deref()
            .unwrap_or(DEFAULT_GLYPHS)
            .chars()
            .collect();
        RenderConfig {
            shape: opts.shape,
            colors: ColorPair {
                fill: parse_hex_color(opts.fill.as_deref().unwrap_or(DEFAULT_COLOR)),
                border: parse_hex_color(opts.border.as_deref().unwrap_or(DEFAULT_COLOR)),
            },
            backdrop: opts.background.resolve(),
            // An empty pool would leave text cells nothing to pick from.
            glyphs: if glyphs.is_empty() {
                DEFAULT_GLYPHS.chars().collect()
            } else {
                glyphs
            },
            font: FontSpec {
                name: opts
                    .font_name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_FONT.to_string()),
                size: opts.font_size.unwrap_or(DEFAULT_FONT_SIZE),
            },
        }
    }
}

/// The repeating-timer primitive: fires at most once per interval when
/// polled from the host loop.
#[derive(Debug, Clone, Copy)]
struct Ticker {
    interval: Duration,
    last: Instant,
}

impl Ticker {
    fn new(interval: Duration) -> Self {
        Ticker {
            interval,
            last: Instant::now(),
        }
    }

    fn due(&mut self, now: Instant) -> bool {
        if now.duration_since(self.last) >= self.interval {
            self.last = now;
            true
        } else {
            false
        }
    }
}

/// The falling-glyph animation: owns the grid, the per-column scroll state,
/// the resolved render configuration and the tick lifecycle.
///
/// Constructed hidden and stopped. [`start`](RainEngine::start) arms the
/// repeating tick, the host polls [`tick`](RainEngine::tick) and calls
/// [`redraw`](RainEngine::redraw) with its drawing surface when a frame is
/// due, and [`stop`](RainEngine::stop) disarms the tick while the last-drawn
/// frame stays on the surface.
pub struct RainEngine {
    grid: Grid,
    scroll: ScrollState,
    config: RenderConfig,
    interval: Duration,
    timer: Option<Ticker>,
    visible: bool,
    rng: StdRng,
}

impl RainEngine {
    /// Builds an engine over a viewport of `viewport` drawing-surface pixels.
    pub fn new(viewport: (u32, u32), opts: RainOptions) -> Self {
        let mut rng = match opts.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let grid = Grid::new(viewport, opts.grid.0, opts.grid.1);
        let scroll = ScrollState::new(grid.cols(), grid.rows(), &mut rng);
        RainEngine {
            grid,
            scroll,
            config: RenderConfig::resolve(&opts),
            interval: opts.tick,
            timer: None,
            visible: false,
            rng,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// The resolved backdrop color; alpha 0 keeps the surface untouched.
    pub fn background(&self) -> Rgba {
        self.config.backdrop
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// False until the first successful redraw, true ever after.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Arms the repeating tick. Starting while already running replaces the
    /// existing ticker, so only one cadence is ever live.
    pub fn start(&mut self) {
        self.timer = Some(Ticker::new(self.interval));
    }

    /// Disarms the tick. Safe to call repeatedly and when not running; the
    /// last-drawn frame persists on the surface.
    pub fn stop(&mut self) {
        self.timer = None;
    }

    /// Polled by the host loop: true when running and a redraw is due, at
    /// most once per interval.
    pub fn tick(&mut self, now: Instant) -> bool {
        match &mut self.timer {
            Some(ticker) => ticker.due(now),
            None => false,
        }
    }

    /// Draws one frame: one shape per column at that column's active row,
    /// then advances the column's phase, then commits the whole frame with a
    /// single fill-and-stroke batch.
    pub fn redraw(&mut self, ctx: &mut dyn DrawContext) {
        let shape = self.config.shape;
        let colors = self.config.colors;
        let (cell_w, cell_h) = self.grid.cell_size();

        for col in 0..self.grid.cols() {
            // Text cells re-roll their glyph every frame.
            let glyph = if shape == CellShape::Text {
                let pool = &self.config.glyphs;
                Some(pool[self.rng.gen_range(0..pool.len())])
            } else {
                None
            };

            let row = self.scroll.active_row(col);
            let origin = self.grid.cell_origin(col, row);
            let (x, y) = (f64::from(origin.0), f64::from(origin.1));

            ctx.move_to(x, y);
            match shape {
                CellShape::Line => {
                    shape.draw_line(ctx, (x, y + f64::from(cell_h)), colors);
                }
                CellShape::Rectangle => {
                    shape.draw_rect(ctx, x, y, f64::from(cell_w), f64::from(cell_h), colors);
                }
                CellShape::Circle => {
                    shape.draw_circle(ctx, (x, y), f64::from(cell_w) / 2.0, colors);
                }
                CellShape::Text => {
                    shape.draw_text(
                        ctx,
                        (x, y),
                        glyph.unwrap_or('T'),
                        &self.config.font,
                        colors,
                    );
                }
            }

            self.scroll.advance_column(col);
        }

        ctx.fill_and_stroke();

        if !self.visible {
            self.visible = true;
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Op {
        Fill(Rgba),
        Stroke(Rgba),
        MoveTo(f64, f64),
        LineTo(f64, f64),
        Rect(f64, f64, f64, f64),
        Circle(f64, f64, f64),
        Glyph(char, f64, f64, f64, f64),
        Commit,
    }

    #[derive(Default)]
    struct Recorder {
        ops: Vec<Op>,
    }

    impl DrawContext for Recorder {
        fn set_fill(&mut self, color: Rgba) {
            self.ops.push(Op::Fill(color));
        }

        fn set_stroke(&mut self, color: Rgba) {
            self.ops.push(Op::Stroke(color));
        }

        fn move_to(&mut self, x: f64, y: f64) {
            self.ops.push(Op::MoveTo(x, y));
        }

        fn line_to(&mut self, x: f64, y: f64) {
            self.ops.push(Op::LineTo(x, y));
        }

        fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
            self.ops.push(Op::Rect(x, y, width, height));
        }

        fn circle(&mut self, cx: f64, cy: f64, radius: f64) {
            self.ops.push(Op::Circle(cx, cy, radius));
        }

        fn text(&mut self, glyph: char, x: f64, y: f64, width: f64, height: f64, _font: &FontSpec) {
            self.ops.push(Op::Glyph(glyph, x, y, width, height));
        }

        fn fill_and_stroke(&mut self) {
            self.ops.push(Op::Commit);
        }
    }

    fn make_engine(shape: CellShape, grid: (u16, u16)) -> RainEngine {
        RainEngine::new(
            (100, 100),
            RainOptions {
                grid,
                shape,
                fill: Some("00FF00".to_string()),
                border: Some("00FF00".to_string()),
                seed: Some(7),
                ..RainOptions::default()
            },
        )
    }

    #[test]
    fn hex_parses_exact_channels() {
        let c = parse_hex_color("#FF00AA");
        assert_eq!(c.r, 1.0);
        assert_eq!(c.g, 0.0);
        assert!((c.b - 170.0 / 255.0).abs() < 1e-6);
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn hex_empty_is_transparent() {
        assert_eq!(parse_hex_color(""), Rgba::TRANSPARENT);
        assert_eq!(parse_hex_color("   "), Rgba::TRANSPARENT);
    }

    #[test]
    fn hex_wrong_length_is_gray() {
        assert_eq!(parse_hex_color("ZZ"), Rgba::GRAY);
        assert_eq!(parse_hex_color("FFFFF"), Rgba::GRAY);
        assert_eq!(parse_hex_color("FFFFFFF"), Rgba::GRAY);
        assert_eq!(parse_hex_color("#FFFF"), Rgba::GRAY);
    }

    #[test]
    fn hex_prefixes_strip_case_insensitively() {
        let white = parse_hex_color("0xFFFFFF");
        assert_eq!((white.r, white.g, white.b, white.a), (1.0, 1.0, 1.0, 1.0));
        assert_eq!(parse_hex_color("#00ff00").g, 1.0);
        assert_eq!(parse_hex_color("  0X000000  ").a, 1.0);
    }

    #[test]
    fn hex_bad_digits_parse_as_zero_channels() {
        let c = parse_hex_color("GGHHII");
        assert_eq!((c.r, c.g, c.b, c.a), (0.0, 0.0, 0.0, 1.0));
        // Multi-byte input of the right byte length must not panic either.
        let c = parse_hex_color("ééé");
        assert_eq!((c.r, c.g, c.b, c.a), (0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn grid_clamps_dimensions_and_floors_cell_sizes() {
        let grid = Grid::new((100, 50), 3, 0);
        assert_eq!(grid.cols(), 3);
        assert_eq!(grid.rows(), 1);
        assert_eq!(grid.viewport(), (100, 50));
        assert_eq!(grid.cell_size(), (33, 50));

        let grid = Grid::new((100, 50), 0, 0);
        assert_eq!((grid.cols(), grid.rows()), (1, 1));
        assert_eq!(grid.cell_size(), (100, 50));
    }

    #[test]
    fn grid_origin_is_linear_in_cell_size() {
        let grid = Grid::new((120, 80), 4, 8);
        assert_eq!(grid.cell_origin(0, 0), (0, 0));
        assert_eq!(grid.cell_origin(2, 3), (60, 30));
        // One past the last index yields the far edge of the grid.
        assert_eq!(grid.cell_origin(4, 8), (120, 80));
    }

    #[test]
    fn scroll_rows_stay_in_bounds_and_wrap() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut scroll = ScrollState::new(6, 4, &mut rng);
        let before: Vec<u16> = (0..6).map(|col| scroll.active_row(col)).collect();
        assert!(before.iter().all(|&row| row < 4));

        scroll.advance();
        for col in 0..6u16 {
            assert_eq!(scroll.active_row(col), (before[usize::from(col)] + 1) % 4);
        }
    }

    #[test]
    fn single_row_scroll_never_leaves_row_zero() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut scroll = ScrollState::new(2, 1, &mut rng);
        scroll.advance();
        scroll.advance_column(0);
        assert_eq!(scroll.active_row(0), 0);
        assert_eq!(scroll.active_row(1), 0);
    }

    #[test]
    fn redraw_draws_one_rectangle_per_column_and_advances() {
        let mut engine = make_engine(CellShape::Rectangle, (4, 4));
        let before: Vec<u16> = (0..4).map(|col| engine.scroll.active_row(col)).collect();

        let mut ctx = Recorder::default();
        engine.redraw(&mut ctx);

        let rects: Vec<&Op> = ctx
            .ops
            .iter()
            .filter(|op| matches!(op, Op::Rect(..)))
            .collect();
        assert_eq!(rects.len(), 4);
        for (col, rect) in rects.iter().enumerate() {
            let origin = engine.grid().cell_origin(col as u16, before[col]);
            let expected = Op::Rect(f64::from(origin.0), f64::from(origin.1), 25.0, 25.0);
            assert_eq!(**rect, expected);
        }

        for col in 0..4u16 {
            assert_eq!(
                engine.scroll.active_row(col),
                (before[usize::from(col)] + 1) % 4
            );
        }

        let commits = ctx.ops.iter().filter(|op| matches!(op, Op::Commit)).count();
        assert_eq!(commits, 1);
    }

    #[test]
    fn line_cells_stroke_the_left_edge_downward() {
        let mut engine = make_engine(CellShape::Line, (1, 2));
        let row = engine.scroll.active_row(0);
        let origin = engine.grid().cell_origin(0, row);

        let mut ctx = Recorder::default();
        engine.redraw(&mut ctx);

        let (x, y) = (f64::from(origin.0), f64::from(origin.1));
        assert!(ctx.ops.contains(&Op::MoveTo(x, y)));
        assert!(ctx.ops.contains(&Op::LineTo(x, y + 50.0)));
    }

    #[test]
    fn circle_cells_anchor_on_the_top_left_corner() {
        let mut engine = make_engine(CellShape::Circle, (2, 2));
        let before: Vec<u16> = (0..2).map(|col| engine.scroll.active_row(col)).collect();

        let mut ctx = Recorder::default();
        engine.redraw(&mut ctx);

        let circles: Vec<&Op> = ctx
            .ops
            .iter()
            .filter(|op| matches!(op, Op::Circle(..)))
            .collect();
        assert_eq!(circles.len(), 2);
        for (col, circle) in circles.iter().enumerate() {
            let origin = engine.grid().cell_origin(col as u16, before[col]);
            let expected = Op::Circle(f64::from(origin.0), f64::from(origin.1), 25.0);
            assert_eq!(**circle, expected);
        }
    }

    #[test]
    fn text_cells_pick_glyphs_from_the_pool() {
        let mut engine = RainEngine::new(
            (80, 40),
            RainOptions {
                grid: (8, 4),
                shape: CellShape::Text,
                glyphs: Some("AB".to_string()),
                seed: Some(11),
                ..RainOptions::default()
            },
        );

        let mut ctx = Recorder::default();
        engine.redraw(&mut ctx);

        let glyphs: Vec<char> = ctx
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Glyph(ch, ..) => Some(*ch),
                _ => None,
            })
            .collect();
        assert_eq!(glyphs.len(), 8);
        assert!(glyphs.iter().all(|ch| *ch == 'A' || *ch == 'B'));
    }

    #[test]
    fn empty_glyph_pool_falls_back_to_default() {
        let engine = RainEngine::new(
            (10, 10),
            RainOptions {
                shape: CellShape::Text,
                glyphs: Some(String::new()),
                seed: Some(1),
                ..RainOptions::default()
            },
        );
        assert_eq!(engine.config().glyphs, vec!['T']);
    }

    #[test]
    fn mismatched_draw_calls_are_no_ops() {
        let mut ctx = Recorder::default();
        let colors = ColorPair {
            fill: Rgba::GRAY,
            border: Rgba::GRAY,
        };
        let font = FontSpec {
            name: DEFAULT_FONT.to_string(),
            size: DEFAULT_FONT_SIZE,
        };

        CellShape::Line.draw_rect(&mut ctx, 0.0, 0.0, 5.0, 5.0, colors);
        CellShape::Rectangle.draw_circle(&mut ctx, (0.0, 0.0), 2.0, colors);
        CellShape::Circle.draw_text(&mut ctx, (0.0, 0.0), 'x', &font, colors);
        CellShape::Text.draw_line(&mut ctx, (0.0, 1.0), colors);

        assert!(ctx.ops.is_empty());
    }

    #[test]
    fn first_redraw_reveals_the_widget_permanently() {
        let mut engine = make_engine(CellShape::Line, (2, 3));
        assert!(!engine.is_visible());

        let mut ctx = Recorder::default();
        engine.redraw(&mut ctx);
        assert!(engine.is_visible());

        engine.redraw(&mut ctx);
        engine.stop();
        assert!(engine.is_visible());
    }

    #[test]
    fn stop_is_idempotent() {
        let mut engine = make_engine(CellShape::Rectangle, (2, 2));
        engine.stop();
        assert!(!engine.is_running());

        engine.start();
        engine.stop();
        engine.stop();
        assert!(!engine.is_running());
        assert!(!engine.tick(Instant::now() + Duration::from_secs(1)));
    }

    #[test]
    fn tick_is_silent_until_started() {
        let mut engine = make_engine(CellShape::Rectangle, (2, 2));
        assert!(!engine.tick(Instant::now() + Duration::from_secs(10)));
    }

    #[test]
    fn restart_keeps_a_single_cadence() {
        let mut engine = make_engine(CellShape::Rectangle, (2, 2));
        assert_eq!(engine.interval(), DEFAULT_TICK);
        engine.start();
        engine.start();
        assert!(engine.is_running());

        let later = Instant::now() + Duration::from_millis(150);
        assert!(engine.tick(later));
        // The same instant must not fire a second redraw.
        assert!(!engine.tick(later));
    }

    #[test]
    fn background_resolves_through_the_color_rules() {
        let solid = RainEngine::new(
            (10, 10),
            RainOptions {
                background: Backdrop::Solid("000000".to_string()),
                seed: Some(1),
                ..RainOptions::default()
            },
        );
        assert!(!solid.background().is_transparent());

        let clear = RainEngine::new(
            (10, 10),
            RainOptions {
                seed: Some(1),
                ..RainOptions::default()
            },
        );
        assert!(clear.background().is_transparent());
    }
}
