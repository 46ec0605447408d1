/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Compose the next frame from a `Snapshot` into the `front` buffer
///   2. Compare each cell with `back` (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Screen layout (columns × rows):
///
///   HUD ─────────────────────────────────────────────
///   ┌ board 37×17 ┐   ┌ hand panel 36×10 ┐
///   │             │   status / hint / pinch bar
///   │             │   direction flash
///   message
///   help

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::grid::{Direction, Pos, SIZE};
use crate::sim::gesture::UiCategory;
use crate::sim::world::{FeedStatus, Snapshot};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit background for every "empty" terminal cell, so the gap
    /// between rows matches the cells on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill(&mut self, x: usize, y: usize, w: usize, h: usize, bg: Color) {
        for row in y..y + h {
            for col in x..x + w {
                self.set(col, row, Cell::new(' ', Color::White, bg));
            }
        }
    }

    #[cfg(test)]
    fn row_text(&self, y: usize) -> String {
        (0..self.width).map(|x| self.get(x, y).ch).collect()
    }
}

// ── Layout ──

const HUD_ROW: usize = 0;

const BOARD_ROW: usize = 2;
const BOARD_COL: usize = 2;
const TILE_W: usize = 8;
const TILE_H: usize = 3;
const BOARD_W: usize = SIZE * TILE_W + SIZE + 1;
const BOARD_H: usize = SIZE * TILE_H + SIZE + 1;

const PANEL_COL: usize = BOARD_COL + BOARD_W + 3;
const PANEL_ROW: usize = BOARD_ROW + 1;
const PANEL_W: usize = 36;
const PANEL_H: usize = 10;
const STATUS_ROW: usize = PANEL_ROW + PANEL_H + 1;

const MSG_ROW: usize = BOARD_ROW + BOARD_H + 1;
const HELP_ROW: usize = MSG_ROW + 1;

const MIN_W: usize = PANEL_COL + PANEL_W + 1;
const MIN_H: usize = HELP_ROW + 1;

const BOARD_BG: Color = Color::Rgb { r: 187, g: 173, b: 160 };
const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const PINCH_BAR_W: usize = 20;

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw as usize, th as usize);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        // Force full repaint: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render(&mut self, snap: &Snapshot) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        self.compose(snap);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors; ResetColor would fall back to the terminal default.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        let mut utf8 = [0u8; 4];
        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(&*cell.ch.encode_utf8(&mut utf8)))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose(&mut self, s: &Snapshot) {
        self.front.clear();

        if self.front.width < MIN_W || self.front.height < MIN_H {
            let msg = format!("Terminal too small: need {MIN_W}×{MIN_H}");
            self.front.put_str(0, 0, &msg, Color::Yellow, Color::Reset);
            return;
        }

        self.compose_hud(s);
        self.compose_board(s);
        self.compose_hand_panel(s);
        self.compose_status(s);
        if s.game_over {
            self.compose_game_over(s);
        }

        if !s.message.is_empty() {
            let msg = format!(" ◈ {} ", s.message);
            self.front.put_str(BOARD_COL, MSG_ROW, &msg, Color::Black, Color::Rgb { r: 200, g: 180, b: 50 });
        }
        let help = " ←↑↓→/WASD: Move   N: New game   Q/Esc: Quit   │  Pinch + swipe on the board";
        self.front.put_str(0, HELP_ROW, help, Color::DarkGrey, Color::Reset);
    }

    fn compose_hud(&mut self, s: &Snapshot) {
        let feed = match s.feed {
            FeedStatus::Offline => "keyboard only".to_string(),
            FeedStatus::Live { frames } => format!("hand feed ({frames} frames)"),
        };
        let hud = format!(" PINCH 2048   Score: {:<7} Best: {:<7} {feed}", s.score, s.best_score);
        let w = self.front.width;
        self.front.fill(0, HUD_ROW, w, 1, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
    }

    fn compose_board(&mut self, s: &Snapshot) {
        self.front.fill(BOARD_COL, BOARD_ROW, BOARD_W, BOARD_H, BOARD_BG);
        let fresh = s.last_spawn.map(|sp| sp.pos);

        for (row, line) in s.grid.rows().iter().enumerate() {
            for (col, &value) in line.iter().enumerate() {
                let (fg, bg) = tile_colors(value);
                let x = BOARD_COL + 1 + col * (TILE_W + 1);
                let y = BOARD_ROW + 1 + row * (TILE_H + 1);
                self.front.fill(x, y, TILE_W, TILE_H, bg);
                if value != 0 {
                    let label = format!("{value:^w$}", w = TILE_W);
                    self.front.put_str(x, y + 1, &label, fg, bg);
                }
                if fresh == Some(Pos { row, col }) {
                    self.front.set(x + TILE_W - 1, y, Cell::new('•', fg, bg));
                }
            }
        }
    }

    /// Miniature of the virtual screen: board bounds, padding and the cursor.
    fn compose_hand_panel(&mut self, s: &Snapshot) {
        let frame = Color::Rgb { r: 90, g: 90, b: 120 };
        self.front.put_str(PANEL_COL, PANEL_ROW - 1, " Hand ", Color::White, Color::Reset);

        let outer = Color::Rgb { r: 34, g: 34, b: 52 };
        let inner = match s.ui.category {
            UiCategory::ControlActive => Color::Rgb { r: 30, g: 80, b: 40 },
            _ => Color::Rgb { r: 50, g: 50, b: 75 },
        };
        let b = &s.bounds;
        let (ol, ot) = to_panel(b.outer.left, b.outer.top, s.screen);
        let (or, ob) = to_panel(b.outer.right, b.outer.bottom, s.screen);
        let (il, it) = to_panel(b.inner.left, b.inner.top, s.screen);
        let (ir, ib) = to_panel(b.inner.right, b.inner.bottom, s.screen);
        self.front.fill(PANEL_COL + ol, PANEL_ROW + ot, or.saturating_sub(ol) + 1, ob.saturating_sub(ot) + 1, outer);
        self.front.fill(PANEL_COL + il, PANEL_ROW + it, ir.saturating_sub(il) + 1, ib.saturating_sub(it) + 1, inner);

        for x in 0..PANEL_W {
            self.front.set(PANEL_COL + x, PANEL_ROW + PANEL_H, Cell::new('─', frame, Color::Reset));
        }

        if let Some(p) = s.ui.palm {
            let (x, y) = to_panel(p.x, p.y, s.screen);
            let bg = self.front.get(PANEL_COL + x, PANEL_ROW + y).bg;
            self.front.set(PANEL_COL + x, PANEL_ROW + y, Cell::new('○', Color::Grey, bg));
        }
        if let Some(c) = s.ui.cursor {
            let (x, y) = to_panel(c.x, c.y, s.screen);
            let bg = self.front.get(PANEL_COL + x, PANEL_ROW + y).bg;
            let fg = if s.ui.pinching { Color::Rgb { r: 80, g: 255, b: 80 } } else { Color::White };
            self.front.set(PANEL_COL + x, PANEL_ROW + y, Cell::new('●', fg, bg));
        }
    }

    fn compose_status(&mut self, s: &Snapshot) {
        let (title, hint) = status_text(s.ui.category);
        let title_fg = match s.ui.category {
            UiCategory::ControlActive => Color::Rgb { r: 80, g: 255, b: 80 },
            UiCategory::ReleasePinch => Color::Rgb { r: 255, g: 180, b: 60 },
            UiCategory::NoHand => Color::DarkGrey,
            _ => Color::Rgb { r: 100, g: 200, b: 255 },
        };
        self.front.put_str(PANEL_COL, STATUS_ROW, title, title_fg, Color::Reset);
        self.front.put_str(PANEL_COL, STATUS_ROW + 1, hint, Color::Grey, Color::Reset);

        let bar = format!("Pinch {}", pinch_bar(s.ui.pinch_strength, PINCH_BAR_W));
        let bar_fg = if s.ui.pinching { Color::Rgb { r: 80, g: 255, b: 80 } } else { Color::Grey };
        self.front.put_str(PANEL_COL, STATUS_ROW + 2, &bar, bar_fg, Color::Reset);

        if let Some(dir) = s.last_move {
            let flash = format!("  {}  {:?}  ", arrow(dir), dir);
            self.front.put_str(PANEL_COL, STATUS_ROW + 4, &flash.to_uppercase(), Color::Black, Color::Rgb { r: 255, g: 220, b: 50 });
        }
    }

    fn compose_game_over(&mut self, s: &Snapshot) {
        let red = Color::Rgb { r: 255, g: 60, b: 60 };
        let dim = Color::Rgb { r: 40, g: 40, b: 40 };
        let box_w = 27;
        let x = BOARD_COL + (BOARD_W - box_w) / 2;
        let y = BOARD_ROW + BOARD_H / 2 - 3;
        self.front.fill(x, y, box_w, 6, dim);
        self.front.put_str(x, y, "╔═════════════════════════╗", red, dim);
        self.front.put_str(x, y + 1, "║        GAME OVER        ║", red, dim);
        self.front.put_str(x, y + 2, "╚═════════════════════════╝", red, dim);
        let score = format!("  ◈ Final Score: {}", s.score);
        self.front.put_str(x, y + 3, &score, Color::White, dim);
        self.front.put_str(x, y + 5, "  ▸ N: New game", Color::Rgb { r: 80, g: 255, b: 80 }, dim);
    }
}

// ── Lookup tables ──

/// Classic palette; values beyond 2048 share the last entry.
fn tile_colors(value: u32) -> (Color, Color) {
    let dark = Color::Rgb { r: 119, g: 110, b: 101 };
    let light = Color::Rgb { r: 249, g: 246, b: 242 };
    let rgb = |r, g, b| Color::Rgb { r, g, b };
    match value {
        0 => (dark, rgb(205, 193, 180)),
        2 => (dark, rgb(238, 228, 218)),
        4 => (dark, rgb(237, 224, 200)),
        8 => (light, rgb(242, 177, 121)),
        16 => (light, rgb(245, 149, 99)),
        32 => (light, rgb(246, 124, 95)),
        64 => (light, rgb(246, 94, 59)),
        128 => (light, rgb(237, 207, 114)),
        256 => (light, rgb(237, 204, 97)),
        512 => (light, rgb(237, 200, 80)),
        1024 => (light, rgb(237, 197, 63)),
        2048 => (light, rgb(237, 194, 46)),
        _ => (light, rgb(60, 58, 50)),
    }
}

/// Status title and hint for each hand category.
fn status_text(category: UiCategory) -> (&'static str, &'static str) {
    match category {
        UiCategory::NoHand => ("No Hand", "Show hand to camera"),
        UiCategory::ControlActive => ("Control Active", "Move hand to shift tiles!"),
        UiCategory::ReleasePinch => ("Release Pinch", "Release and pinch again"),
        UiCategory::PinchOutside => ("Pinch (Outside)", "Move inside game area"),
        UiCategory::HandInside => ("Hand Inside", "Pinch to control"),
        UiCategory::NearGame => ("Move Closer", "Move into game area"),
        UiCategory::HandOutside => ("Hand Outside", "Move inside game area"),
    }
}

fn arrow(dir: Direction) -> char {
    match dir {
        Direction::Up => '↑',
        Direction::Down => '↓',
        Direction::Left => '←',
        Direction::Right => '→',
    }
}

/// `[██████░░░░] 60%` style meter.
fn pinch_bar(strength: f32, width: usize) -> String {
    let strength = strength.clamp(0.0, 1.0);
    let filled = (strength * width as f32).round() as usize;
    format!(
        "[{}{}] {:>3}%",
        "█".repeat(filled),
        "░".repeat(width - filled),
        (strength * 100.0).round() as u32,
    )
}

/// Virtual screen position → hand panel cell, clamped inside the panel.
fn to_panel(x: f32, y: f32, screen: (f32, f32)) -> (usize, usize) {
    let cell = |v: f32, extent: f32, cells: usize| {
        let c = (v / extent * cells as f32).floor();
        (c.max(0.0) as usize).min(cells - 1)
    };
    (cell(x, screen.0, PANEL_W), cell(y, screen.1, PANEL_H))
}
