/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Clear the canvas and let the session draw the game into it
///   2. Blit the canvas into the `front` buffer as half-block cells
///   3. Compose HUD, screen overlays and touch controls on top
///   4. Compare each cell with `back` (previous frame) and only emit
///      terminal commands for cells that changed, batched with `queue!`
///   5. Swap front/back
///
/// The terminal is restored on `cleanup`, or on drop if cleanup never ran.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::screen::Screen;
use crate::game::Game;
use crate::sim::session::Session;
use crate::sim::store::KvStore;
use crate::ui::canvas::{Canvas, Rgb, Surface};
use crate::ui::touch::{Tier, TouchControls};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, so the gap
    /// between rows on VTE terminals matches the cell colour.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel used to invalidate the back buffer.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        Cell { ch, fg, bg: Self::norm_bg(bg) }
    }
}

fn rgb(p: Option<Rgb>) -> Color {
    match p {
        Some(Rgb(r, g, b)) => Color::Rgb { r, g, b },
        None => Cell::BASE_BG,
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

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    /// Horizontally centred text on row `y`.
    fn put_centered(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        let len = s.chars().count();
        let x = self.width.saturating_sub(len) / 2;
        self.put_str(x, y, s, fg, bg);
    }

    #[cfg(test)]
    fn row_text(&self, y: usize) -> String {
        (0..self.width).map(|x| self.get(x, y).ch).collect()
    }
}

// ── Renderer ──

/// Rows above the canvas.
const HUD_ROWS: u16 = 1;

const HUD_FG: Color = Color::Rgb { r: 200, g: 200, b: 220 };
const ACCENT: Color = Color::Rgb { r: 255, g: 220, b: 50 };
const PANEL_BG: Color = Color::Rgb { r: 40, g: 40, b: 56 };
const CONTROL_BG: Color = Color::Rgb { r: 60, g: 60, b: 80 };
const CONTROL_HELD_BG: Color = Color::Rgb { r: 80, g: 160, b: 255 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: u16,
    term_h: u16,
    canvas: Canvas,
    pixel_ratio: u8,
    last_screen: Option<Screen>,
    active: bool,
}

impl Renderer {
    pub fn new(pixel_ratio: u8) -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            canvas: Canvas::new(Surface::new(0, 0, pixel_ratio)),
            pixel_ratio,
            last_screen: None,
            active: false,
        }
    }

    /// Enter raw mode and the alternate screen. Returns whether the terminal
    /// reports key releases, which lets input drop the hold-timeout fallback.
    pub fn init(&mut self) -> io::Result<bool> {
        terminal::enable_raw_mode()?;
        self.active = true;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            EnableMouseCapture,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let honor_release = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if honor_release {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw, th);
        tracing::info!(cols = tw, rows = th, honor_release, "terminal ready");
        Ok(honor_release)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        // Pop is a no-op on terminals that never accepted the push.
        let _ = execute!(self.writer, PopKeyboardEnhancementFlags);
        execute!(
            self.writer,
            DisableMouseCapture,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn size(&self) -> (u16, u16) {
        (self.term_w, self.term_h)
    }

    /// Apply a terminal resize. The canvas surface is only rebuilt here.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.term_w = cols;
        self.term_h = rows;
        self.front.resize(cols as usize, rows as usize);
        self.back.resize(cols as usize, rows as usize);
        self.back.cells.fill(Cell::INVALID);
        self.canvas
            .resize(Surface::new(cols, rows.saturating_sub(HUD_ROWS), self.pixel_ratio));
    }

    /// Canvas extent in pixels; the session's view size.
    pub fn view_size(&self) -> (f32, f32) {
        (self.canvas.width() as f32, self.canvas.height() as f32)
    }

    pub fn render<G: Game, S: KvStore>(
        &mut self,
        session: &Session<G, S>,
        touch: &TouchControls,
    ) -> io::Result<()> {
        // Screen change → clear for a clean transition
        if self.last_screen != Some(session.screen()) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_screen = Some(session.screen());
        }

        self.compose(session, touch);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn compose<G: Game, S: KvStore>(&mut self, session: &Session<G, S>, touch: &TouchControls) {
        self.front.clear();

        self.canvas.clear();
        session.draw(&mut self.canvas);
        self.blit_canvas();

        self.compose_hud(session);
        match session.screen() {
            Screen::Instructions => self.compose_instructions(session.game()),
            Screen::Playing => {}
            Screen::GameOver => self.compose_game_over(session),
        }
        self.compose_controls(touch);
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colours; ResetColor would fall back to the terminal default.
        queue!(self.writer, SetForegroundColor(Color::White), SetBackgroundColor(Cell::BASE_BG))?;

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
                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn blit_canvas(&mut self) {
        let ratio = self.canvas.surface().pixel_ratio as usize;
        let rows = self.canvas.surface().rows as usize;
        let top = HUD_ROWS as usize;
        for row in 0..rows {
            for col in 0..self.canvas.width() {
                let cell = if ratio == 2 {
                    let upper = rgb(self.canvas.get(col, row * 2));
                    let lower = rgb(self.canvas.get(col, row * 2 + 1));
                    if upper == lower {
                        Cell::new(' ', Color::White, upper)
                    } else {
                        Cell::new('▀', upper, lower)
                    }
                } else {
                    Cell::new(' ', Color::White, rgb(self.canvas.get(col, row)))
                };
                self.front.set(col, top + row, cell);
            }
        }
    }

    fn compose_hud<G: Game, S: KvStore>(&mut self, session: &Session<G, S>) {
        let w = self.front.width;
        for x in 0..w {
            self.front.set(x, 0, Cell::new(' ', HUD_FG, PANEL_BG));
        }
        // Column 0..5 belongs to the HUB control.
        let game = session.game();
        self.front.put_str(7, 0, game.title(), ACCENT, PANEL_BG);

        let mut right = format!("SCORE {:>6}  BEST {:>6}", game.score(), session.best());
        if session.scores_degraded() {
            right.push_str(" (unsaved)");
        }
        let x = w.saturating_sub(right.chars().count() + 1);
        self.front.put_str(x, 0, &right, HUD_FG, PANEL_BG);
    }

    fn panel(&mut self, lines: &[(String, Color)]) {
        let inner = lines.iter().map(|(s, _)| s.chars().count()).max().unwrap_or(0);
        let box_w = (inner + 4).min(self.front.width);
        let box_h = lines.len() + 2;
        let x0 = self.front.width.saturating_sub(box_w) / 2;
        let y0 = HUD_ROWS as usize + (self.front.height.saturating_sub(HUD_ROWS as usize + box_h)) / 2;

        for y in y0..y0 + box_h {
            for x in x0..x0 + box_w {
                self.front.set(x, y, Cell::new(' ', HUD_FG, PANEL_BG));
            }
        }
        for (i, (line, fg)) in lines.iter().enumerate() {
            self.front.put_centered(y0 + 1 + i, line, *fg, PANEL_BG);
        }
    }

    fn compose_instructions<G: Game>(&mut self, game: &G) {
        let mut lines = vec![(game.title().to_uppercase(), ACCENT), (String::new(), HUD_FG)];
        lines.extend(game.instructions().iter().map(|l| (l.to_string(), HUD_FG)));
        lines.push((String::new(), HUD_FG));
        lines.push(("▸ SPACE / ENTER / GO to start".to_string(), Color::Rgb { r: 80, g: 255, b: 80 }));
        self.panel(&lines);
    }

    fn compose_game_over<G: Game, S: KvStore>(&mut self, session: &Session<G, S>) {
        let Some(summary) = session.summary() else { return };
        let mut lines = vec![
            ("GAME OVER".to_string(), Color::Rgb { r: 255, g: 60, b: 60 }),
            (String::new(), HUD_FG),
            (format!("Score: {}", summary.final_score), HUD_FG),
            (format!("Best:  {}", summary.best), HUD_FG),
        ];
        if summary.is_new_best {
            lines.push(("★ NEW BEST ★".to_string(), ACCENT));
        }
        lines.push((String::new(), HUD_FG));
        lines.push(("▸ SPACE / ENTER / GO to play again".to_string(), Color::Rgb { r: 80, g: 255, b: 80 }));
        self.panel(&lines);
    }

    fn compose_controls(&mut self, touch: &TouchControls) {
        for (control, held) in touch.visible() {
            let bg = if held { CONTROL_HELD_BG } else { CONTROL_BG };
            let fg = match control.tier {
                Tier::Persistent => HUD_FG,
                Tier::TabletBand => ACCENT,
            };
            let r = control.rect;
            for dy in 0..r.h as usize {
                for dx in 0..r.w as usize {
                    self.front.set(r.x as usize + dx, r.y as usize + dy, Cell::new(' ', fg, bg));
                }
            }
            let label_y = r.y as usize + r.h as usize / 2;
            let pad = (r.w as usize).saturating_sub(control.label.chars().count()) / 2;
            self.front.put_str(r.x as usize + pad, label_y, control.label, fg, bg);
        }
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::viewport::ViewportBand;
    use crate::game::testing::StubGame;
    use crate::sim::session::SessionSettings;
    use crate::sim::store::MemoryStore;
    use crate::domain::intent::{Intent, IntentSource};
    use std::time::Duration;

    fn setup(cols: u16, rows: u16) -> (Renderer, Session<StubGame, MemoryStore>) {
        let mut r = Renderer::new(2);
        r.resize(cols, rows);
        let (vw, vh) = r.view_size();
        let s = Session::new(StubGame::new(), MemoryStore::new(), SessionSettings::default(), vw, vh);
        (r, s)
    }

    fn screen_text(r: &Renderer) -> String {
        (0..r.front.height).map(|y| r.front.row_text(y)).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn canvas_excludes_hud_row_and_doubles_height() {
        let (r, _) = setup(100, 30);
        assert_eq!(r.view_size(), (100.0, 58.0));
    }

    #[test]
    fn instructions_then_hud_only_while_playing() {
        let (mut r, mut s) = setup(100, 30);
        let touch = TouchControls::new(100, 30, ViewportBand::Narrow);
        r.compose(&s, &touch);
        let text = screen_text(&r);
        assert!(text.contains("STUB"));
        assert!(text.contains("hold right"));
        assert!(r.front.row_text(0).contains("BEST"));

        s.press_action(IntentSource::Keyboard);
        r.compose(&s, &touch);
        assert!(!screen_text(&r).contains("hold right"));
    }

    #[test]
    fn game_over_panel_flags_new_best() {
        let (mut r, _) = setup(100, 30);
        let touch = TouchControls::new(100, 30, ViewportBand::Narrow);
        let mut stub = StubGame::new();
        stub.finish_at = Some(1);
        let mut s2 = Session::new(stub, MemoryStore::new(), SessionSettings::default(), 100.0, 58.0);
        s2.press_action(IntentSource::Keyboard);
        s2.set_intent(IntentSource::Keyboard, Intent::Right, true);
        s2.frame(Duration::ZERO, 0.016);
        assert_eq!(s2.screen(), Screen::GameOver);

        r.compose(&s2, &touch);
        let text = screen_text(&r);
        assert!(text.contains("GAME OVER"));
        assert!(text.contains("NEW BEST"));
    }

    #[test]
    fn tablet_controls_drawn_only_in_mid_band() {
        let (mut r, s) = setup(125, 30);
        let narrow = TouchControls::new(125, 30, ViewportBand::Narrow);
        r.compose(&s, &narrow);
        assert!(!screen_text(&r).contains("JUMP"));
        assert!(screen_text(&r).contains("[HUB]"));

        let mid = TouchControls::new(125, 30, ViewportBand::Mid);
        r.compose(&s, &mid);
        assert!(screen_text(&r).contains("JUMP"));
    }

    #[test]
    fn half_block_packs_two_pixels() {
        let (mut r, _) = setup(4, 3);
        r.canvas.set(1, 0, Rgb(255, 0, 0));
        r.blit_canvas();
        let cell = r.front.get(1, 1);
        assert_eq!(cell.ch, '▀');
        assert_eq!(cell.fg, Color::Rgb { r: 255, g: 0, b: 0 });
        assert_eq!(cell.bg, Cell::BASE_BG);
        assert_eq!(r.front.get(0, 1).ch, ' ');
    }
}
