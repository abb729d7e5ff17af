// Copyright (c) 2026 rezky_nightky

use crossterm::style::Color;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub bold: bool,
}

impl Cell {
    pub fn blank_with_bg(bg: Option<Color>) -> Self {
        Self {
            ch: ' ',
            fg: None,
            bg,
            bold: false,
        }
    }
}

/// Cell grid for one terminal-sized frame. The renderer diffs it against
/// the previously drawn frame, so the scene can repaint everything each
/// tick without flooding the terminal.
#[derive(Clone, Debug)]
pub struct Frame {
    pub width: u16,
    pub height: u16,
    cells: Vec<Cell>,
    blank: Cell,
}

impl Frame {
    pub fn new(width: u16, height: u16, bg: Option<Color>) -> Self {
        let len = width as usize * height as usize;
        let blank = Cell::blank_with_bg(bg);
        Self {
            width,
            height,
            cells: vec![blank; len],
            blank,
        }
    }

    #[allow(dead_code)]
    pub fn clear(&mut self) {
        self.cells.fill(self.blank);
    }

    pub fn index(&self, x: u16, y: u16) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    #[allow(dead_code)]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    pub fn cell_at_index(&self, i: usize) -> Cell {
        self.cells[i]
    }

    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = cell;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_round_trip() {
        let mut f = Frame::new(3, 2, None);
        let cell = Cell {
            ch: 'x',
            fg: None,
            bg: None,
            bold: true,
        };
        f.set(2, 1, cell);
        assert_eq!(f.get(2, 1), Some(&cell));
    }

    #[test]
    fn out_of_bounds_writes_are_ignored() {
        let mut f = Frame::new(2, 2, None);
        f.set(5, 5, Cell::blank_with_bg(None));
        assert!(f.get(5, 5).is_none());
    }

    #[test]
    fn clear_restores_blank_cells() {
        let mut f = Frame::new(2, 2, None);
        f.set(
            0,
            0,
            Cell {
                ch: 'x',
                fg: None,
                bg: None,
                bold: false,
            },
        );
        f.clear();
        assert_eq!(f.get(0, 0).map(|c| c.ch), Some(' '));
    }
}
