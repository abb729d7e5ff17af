// Copyright (c) 2026 rezky_nightky

use std::io::{stdout, Result, Stdout, Write};

use crossterm::{
    cursor, event,
    style::{
        Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
    },
    terminal, ExecutableCommand, QueueableCommand,
};

use crate::frame::{Cell, Frame};

struct LastFrame {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl LastFrame {
    fn new(width: u16, height: u16) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            cells: vec![Cell::blank_with_bg(None); len],
        }
    }
}

pub struct Terminal {
    stdout: Stdout,
    last: Option<LastFrame>,
}

impl Terminal {
    pub fn new() -> Result<Self> {
        let mut out = stdout();
        terminal::enable_raw_mode()?;
        let init_res: Result<()> = (|| {
            out.execute(terminal::EnterAlternateScreen)?;
            out.execute(cursor::Hide)?;
            let _ = out.execute(terminal::DisableLineWrap);
            out.execute(SetAttribute(Attribute::Reset))?;
            out.execute(ResetColor)?;
            out.execute(terminal::Clear(terminal::ClearType::All))?;
            out.flush()?;
            Ok(())
        })();
        if let Err(e) = init_res {
            let _ = out.execute(SetAttribute(Attribute::Reset));
            let _ = out.execute(ResetColor);
            let _ = out.execute(cursor::Show);
            let _ = out.execute(terminal::EnableLineWrap);
            let _ = out.execute(terminal::LeaveAlternateScreen);
            let _ = terminal::disable_raw_mode();
            let _ = out.flush();
            return Err(e);
        }
        Ok(Self {
            stdout: out,
            last: None,
        })
    }

    pub fn size(&self) -> Result<(u16, u16)> {
        terminal::size()
    }

    pub fn poll_event(timeout: std::time::Duration) -> Result<bool> {
        event::poll(timeout)
    }

    pub fn read_event() -> Result<event::Event> {
        event::read()
    }

    /// Writes the frame, skipping cells unchanged since the last draw
    /// and eliding redundant cursor moves and SGR switches.
    pub fn draw(&mut self, frame: &Frame) -> Result<()> {
        let needs_full_redraw = self
            .last
            .as_ref()
            .map(|l| l.width != frame.width || l.height != frame.height)
            .unwrap_or(true);

        if needs_full_redraw {
            self.stdout
                .queue(terminal::Clear(terminal::ClearType::All))?;
            self.last = Some(LastFrame::new(frame.width, frame.height));
        }

        let last = self.last.as_mut().expect("set above");

        let mut cur_fg: Option<Option<Color>> = None;
        let mut cur_bg: Option<Option<Color>> = None;
        let mut cur_bold: Option<bool> = None;
        let mut cur_pos: Option<(u16, u16)> = None;

        for y in 0..frame.height {
            for x in 0..frame.width {
                let idx = y as usize * frame.width as usize + x as usize;
                let cell = frame.cell_at_index(idx);
                if !needs_full_redraw && last.cells[idx] == cell {
                    continue;
                }
                last.cells[idx] = cell;

                if cur_pos != Some((x, y)) {
                    self.stdout.queue(cursor::MoveTo(x, y))?;
                }

                if cur_fg != Some(cell.fg) {
                    self.stdout
                        .queue(SetForegroundColor(cell.fg.unwrap_or(Color::Reset)))?;
                    cur_fg = Some(cell.fg);
                }
                if cur_bg != Some(cell.bg) {
                    self.stdout
                        .queue(SetBackgroundColor(cell.bg.unwrap_or(Color::Reset)))?;
                    cur_bg = Some(cell.bg);
                }
                if cur_bold != Some(cell.bold) {
                    self.stdout.queue(SetAttribute(if cell.bold {
                        Attribute::Bold
                    } else {
                        Attribute::NormalIntensity
                    }))?;
                    cur_bold = Some(cell.bold);
                }

                self.stdout.queue(Print(cell.ch))?;
                let next_x = x.saturating_add(1);
                cur_pos = if next_x < frame.width {
                    Some((next_x, y))
                } else {
                    None
                };
            }
        }

        self.stdout.queue(SetAttribute(Attribute::Reset))?;
        self.stdout.queue(ResetColor)?;
        self.stdout.flush()?;
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = self.stdout.execute(SetAttribute(Attribute::Reset));
        let _ = self.stdout.execute(ResetColor);
        let _ = self.stdout.execute(cursor::Show);
        let _ = self.stdout.execute(terminal::EnableLineWrap);
        let _ = self.stdout.execute(terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
        let _ = self.stdout.flush();
    }
}

pub fn restore_terminal_best_effort() {
    let mut out = stdout();
    let _ = out.execute(SetAttribute(Attribute::Reset));
    let _ = out.execute(ResetColor);
    let _ = out.execute(cursor::Show);
    let _ = out.execute(terminal::EnableLineWrap);
    let _ = out.execute(terminal::LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();
    let _ = out.flush();
}
