// ABOUTME: vt100-backed terminal surface rendered through ratatui
// Holds the emulated screen the relayed session draws into, with local scrollback

use crate::relay::protocol::Geometry;
use crate::surface::TerminalSurface;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Widget},
};
use tracing::trace;

/// Lines of history kept for local scrolling
const SCROLLBACK_LINES: usize = 10_000;

/// Terminal emulator the relay output is written into
pub struct EmulatorSurface {
    /// VT100 parser for processing ANSI escape codes
    parser: vt100::Parser,

    geometry: Geometry,

    title: String,
}

impl EmulatorSurface {
    pub fn new(geometry: Geometry) -> Self {
        let geometry = clamp(geometry);
        Self {
            parser: vt100::Parser::new(geometry.rows, geometry.cols, SCROLLBACK_LINES),
            geometry,
            title: String::from("Terminal"),
        }
    }

    /// Plain text of the visible screen, rows joined by newlines
    pub fn contents(&self) -> String {
        self.parser.screen().contents()
    }

    /// Scroll up by n lines, at most one screen back
    pub fn scroll_up(&mut self, n: usize) {
        let offset = self.parser.screen().scrollback();
        self.parser
            .set_scrollback(offset.saturating_add(n).min(self.max_scroll()));
    }

    /// Scroll down by n lines
    pub fn scroll_down(&mut self, n: usize) {
        let offset = self.parser.screen().scrollback();
        self.parser.set_scrollback(offset.saturating_sub(n));
    }

    pub fn scroll_to_bottom(&mut self) {
        self.parser.set_scrollback(0);
    }

    pub fn scroll_offset(&self) -> usize {
        self.parser.screen().scrollback()
    }

    pub fn is_at_bottom(&self) -> bool {
        self.scroll_offset() == 0
    }

    /// vt100 can only show history while the offset fits in the visible rows
    fn max_scroll(&self) -> usize {
        usize::from(self.geometry.rows)
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Borrowing widget that draws the current screen
    pub const fn view(&self) -> EmulatorView<'_> {
        EmulatorView { surface: self }
    }

    /// Convert VT100 cell attributes to ratatui Style
    fn cell_to_style(cell: &vt100::Cell) -> Style {
        let mut style = Style::default();

        style = match cell.fgcolor() {
            vt100::Color::Default => style,
            vt100::Color::Idx(n) => style.fg(ansi_to_ratatui_color(n)),
            vt100::Color::Rgb(r, g, b) => style.fg(Color::Rgb(r, g, b)),
        };

        style = match cell.bgcolor() {
            vt100::Color::Default => style,
            vt100::Color::Idx(n) => style.bg(ansi_to_ratatui_color(n)),
            vt100::Color::Rgb(r, g, b) => style.bg(Color::Rgb(r, g, b)),
        };

        if cell.bold() {
            style = style.add_modifier(Modifier::BOLD);
        }
        if cell.italic() {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if cell.underline() {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        if cell.inverse() {
            style = style.add_modifier(Modifier::REVERSED);
        }

        style
    }
}

impl TerminalSurface for EmulatorSurface {
    fn write(&mut self, data: &str) {
        trace!("Surface processing {} bytes of output", data.len());
        self.parser.process(data.as_bytes());
        // New output snaps the view back to the live screen
        self.scroll_to_bottom();
    }

    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn fit(&mut self, available: Geometry) -> Geometry {
        let fitted = clamp(available);
        if fitted != self.geometry {
            trace!("Surface refit {} -> {}", self.geometry, fitted);
            self.parser.set_size(fitted.rows, fitted.cols);
            self.geometry = fitted;

            let offset = self.scroll_offset().min(self.max_scroll());
            self.parser.set_scrollback(offset);
        }
        self.geometry
    }
}

/// vt100 cannot hold a zero-sized screen
fn clamp(geometry: Geometry) -> Geometry {
    Geometry::new(geometry.cols.max(1), geometry.rows.max(1))
}

/// Convert ANSI color index to ratatui Color
const fn ansi_to_ratatui_color(idx: u8) -> Color {
    match idx {
        0 => Color::Black,
        1 => Color::Red,
        2 => Color::Green,
        3 => Color::Yellow,
        4 => Color::Blue,
        5 => Color::Magenta,
        6 => Color::Cyan,
        7 => Color::Gray,
        8 => Color::DarkGray,
        9 => Color::LightRed,
        10 => Color::LightGreen,
        11 => Color::LightYellow,
        12 => Color::LightBlue,
        13 => Color::LightMagenta,
        14 => Color::LightCyan,
        15 => Color::White,
        n => Color::Indexed(n),
    }
}

pub struct EmulatorView<'a> {
    surface: &'a EmulatorSurface,
}

impl Widget for EmulatorView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let surface = self.surface;
        let border_style = Style::default().fg(Color::Cyan);

        let block = Block::default()
            .title(surface.title.clone())
            .borders(Borders::ALL)
            .border_style(border_style);

        let inner = block.inner(area);
        block.render(area, buf);

        let screen = surface.parser.screen();
        let (rows, cols) = screen.size();

        for row in 0..rows.min(inner.height) {
            for col in 0..cols.min(inner.width) {
                let Some(cell) = screen.cell(row, col) else {
                    continue;
                };
                if cell.is_wide_continuation() {
                    continue;
                }
                let contents = cell.contents();
                let symbol = if contents.is_empty() {
                    " "
                } else {
                    contents.as_str()
                };
                buf.get_mut(inner.x + col, inner.y + row)
                    .set_symbol(symbol)
                    .set_style(EmulatorSurface::cell_to_style(cell));
            }
        }

        // Cursor only makes sense on the live screen
        let has_room = inner.width > 0 && inner.height > 0;
        if !screen.hide_cursor() && surface.is_at_bottom() && has_room {
            let (cursor_row, cursor_col) = screen.cursor_position();
            let x = inner.x + cursor_col.min(inner.width - 1);
            let y = inner.y + cursor_row.min(inner.height - 1);
            buf.get_mut(x, y)
                .set_style(Style::default().add_modifier(Modifier::REVERSED));
        }

        let offset = surface.scroll_offset();
        if offset > 0 {
            let indicator = format!(" ▲ {offset} lines above ");
            let indicator_style = Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD);
            buf.set_stringn(
                area.x + 2,
                area.y,
                indicator,
                usize::from(area.width.saturating_sub(4)),
                indicator_style,
            );
        }
    }
}
