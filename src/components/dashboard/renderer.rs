use super::page::{truncate_with_ellipsis, LineKind, Page, PageLine};
use crate::components::Renderer;
use crate::error::{render_error, DashResult};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::{self, Stdout, Write};

const DEFAULT_SIZE: (u16, u16) = (80, 24);

/// Draws pages on the alternate screen of the controlling terminal
pub struct TerminalRenderer {
    out: Stdout,
    active: bool,
}

impl TerminalRenderer {
    /// Switch to the alternate screen and hide the cursor
    pub fn new() -> DashResult<Self> {
        let mut out = io::stdout();
        execute!(out, EnterAlternateScreen, Hide).map_err(io_error)?;
        Ok(Self { out, active: true })
    }

    fn size(&self) -> (u16, u16) {
        terminal::size().unwrap_or(DEFAULT_SIZE)
    }

    fn draw(&mut self, page: &Page) -> io::Result<()> {
        let (width, height) = self.size();
        let usable = width as usize;

        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;

        // Header: title on the left, clock on the right
        let clock_width = page.clock.chars().count();
        let title = truncate_with_ellipsis(&page.title, usable.saturating_sub(clock_width + 1));
        queue!(
            self.out,
            SetForegroundColor(Color::Cyan),
            SetAttribute(Attribute::Bold),
            Print(&title),
            ResetColor,
            SetAttribute(Attribute::Reset),
        )?;
        if clock_width < usable {
            queue!(
                self.out,
                MoveTo((usable - clock_width) as u16, 0),
                SetForegroundColor(Color::Yellow),
                SetAttribute(Attribute::Bold),
                Print(&page.clock),
                ResetColor,
                SetAttribute(Attribute::Reset),
            )?;
        }

        queue!(
            self.out,
            MoveTo(0, 1),
            SetForegroundColor(Color::Cyan),
            Print("─".repeat(usable)),
            ResetColor,
        )?;

        // Body between the rule and the footer
        let body_rows = height.saturating_sub(3) as usize;
        for (row, line) in page.lines.iter().take(body_rows).enumerate() {
            queue!(self.out, MoveTo(1, row as u16 + 2))?;
            self.draw_line(line)?;
        }

        let footer = truncate_with_ellipsis(&page.footer, usable);
        let footer_col = usable.saturating_sub(footer.chars().count()) / 2;
        queue!(
            self.out,
            MoveTo(footer_col as u16, height.saturating_sub(1)),
            SetAttribute(Attribute::Dim),
            Print(&footer),
            SetAttribute(Attribute::Reset),
        )?;

        self.out.flush()
    }

    fn draw_line(&mut self, line: &PageLine) -> io::Result<()> {
        match line.kind {
            LineKind::Spacer => Ok(()),
            LineKind::Heading => queue!(
                self.out,
                SetForegroundColor(Color::Magenta),
                SetAttribute(Attribute::Bold),
                Print(line.rendered()),
                ResetColor,
                SetAttribute(Attribute::Reset),
            ),
            LineKind::Overflow => queue!(
                self.out,
                SetAttribute(Attribute::Dim),
                Print(line.rendered()),
                SetAttribute(Attribute::Reset),
            ),
            LineKind::Entry | LineKind::Metric => {
                if !line.label.is_empty() {
                    queue!(
                        self.out,
                        SetAttribute(Attribute::Bold),
                        Print(&line.label),
                        SetAttribute(Attribute::Reset),
                        Print(" "),
                    )?;
                }
                queue!(self.out, Print(&line.text))
            }
        }
    }
}

impl Renderer for TerminalRenderer {
    fn width(&self) -> u16 {
        self.size().0
    }

    fn present(&mut self, page: &Page) -> DashResult<()> {
        self.draw(page).map_err(io_error)
    }

    fn restore(&mut self) -> DashResult<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        execute!(self.out, LeaveAlternateScreen, Show).map_err(io_error)
    }
}

impl Drop for TerminalRenderer {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

fn io_error(err: io::Error) -> crate::error::Error {
    render_error(&err.to_string())
}
