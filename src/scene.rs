// Copyright (c) 2026 rezky_nightky

use std::time::{Duration, Instant};

use rand::{
    distr::{Distribution, Uniform},
    rngs::StdRng,
    Rng, SeedableRng,
};

use crate::firework::{Firework, ShellType};
use crate::frame::{Cell, Frame};
use crate::palette::{background_color, term_color, Palette, Rgb};
use crate::runtime::ColorMode;

/// Per-tick Bernoulli probability of launching one new shell when the
/// scene is below its concurrency cap.
const LAUNCH_CHANCE: f32 = 0.08;

/// Launches are restricted to the central band of the surface.
const LAUNCH_BAND: f32 = 0.8;

/// Apex heights land in the upper 35-50% band of the surface.
const APEX_LO: f32 = 0.35;
const APEX_HI: f32 = 0.50;

/// The message is revealed after a quiet first act: quickly when there
/// is only the fallback banner, later when real text is set.
const REVEAL_WITH_TEXT: Duration = Duration::from_millis(2000);
const REVEAL_NO_TEXT: Duration = Duration::from_millis(800);

const FALLBACK_BANNER: &str = "\u{1f386}";

/// Pixels dimmer than this render as background.
const GLOW_FLOOR: f32 = 0.05;

#[derive(Clone, Debug)]
struct MsgChr {
    row: u16,
    col: u16,
    val: char,
}

pub struct Scene {
    /// Simulation surface in half-block pixels: `cols` wide, `rows * 2`
    /// tall, so physics stays roughly isotropic on terminal cells.
    width: f32,
    height: f32,
    cols: u16,
    rows: u16,

    pub palette: Palette,
    color_mode: ColorMode,

    fireworks: Vec<Firework>,
    cap: usize,
    multi_type: bool,
    pub paused: bool,
    total_launched: u64,

    rng: StdRng,
    rand_chance: Uniform<f32>,

    message_text: Option<String>,
    message_border: bool,
    message: Vec<MsgChr>,
    started_at: Instant,
    reveal_delay: Duration,

    glow: Vec<(f32, Rgb)>,
}

impl Scene {
    pub fn new(
        color_mode: ColorMode,
        default_background: bool,
        cap: usize,
        multi_type: bool,
        seed: u64,
    ) -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            cols: 0,
            rows: 0,
            palette: Palette::with_defaults(background_color(color_mode, default_background)),
            color_mode,
            fireworks: Vec::new(),
            cap: cap.max(1),
            multi_type,
            paused: false,
            total_launched: 0,
            rng: StdRng::seed_from_u64(seed),
            rand_chance: Uniform::new(0.0, 1.0).expect("valid range"),
            message_text: None,
            message_border: true,
            message: Vec::new(),
            started_at: Instant::now(),
            reveal_delay: REVEAL_NO_TEXT,
            glow: Vec::new(),
        }
    }

    #[allow(dead_code)]
    pub fn active_count(&self) -> usize {
        self.fireworks.len()
    }

    #[allow(dead_code)]
    pub fn total_launched(&self) -> u64 {
        self.total_launched
    }

    #[allow(dead_code)]
    pub fn fireworks(&self) -> &[Firework] {
        &self.fireworks
    }

    /// Resizes the surface in terminal cells. Live shells are dropped;
    /// their coordinates are meaningless on the new surface.
    pub fn reset(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
        self.width = cols as f32;
        self.height = (rows as f32) * 2.0;
        self.fireworks.clear();
        self.glow.clear();
        self.glow
            .resize(self.cols as usize * self.rows as usize * 2, (0.0, (0, 0, 0)));
        self.layout_message();
    }

    pub fn set_message(&mut self, msg: &str) {
        self.message_text = Some(msg.to_string());
        self.reveal_delay = REVEAL_WITH_TEXT;
        self.layout_message();
    }

    pub fn set_message_border(&mut self, on: bool) {
        self.message_border = on;
        self.layout_message();
    }

    /// Swaps in a freshly extracted palette wholesale. Shells already in
    /// flight keep the colors they were born with.
    pub fn set_palette(&mut self, colors: Vec<Rgb>) {
        self.palette.replace(colors);
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// One simulation step: maybe launch, then advance and cull every
    /// shell in the same pass.
    pub fn tick(&mut self) {
        if self.paused || self.cols == 0 || self.rows == 0 {
            return;
        }

        if self.fireworks.len() < self.cap
            && self.rand_chance.sample(&mut self.rng) < LAUNCH_CHANCE
        {
            self.launch_one();
        }

        let (w, h) = (self.width, self.height);
        let colors = std::mem::take(&mut self.palette.colors);
        let rng = &mut self.rng;
        self.fireworks.retain_mut(|fw| fw.step(w, h, &colors, rng));
        self.palette.colors = colors;
    }

    fn launch_one(&mut self) {
        let side = (1.0 - LAUNCH_BAND) / 2.0;
        let x = self.rng.random_range(self.width * side..self.width * (1.0 - side));
        let target_y = self
            .rng
            .random_range(self.height * APEX_LO..self.height * APEX_HI);
        let color = self.palette.colors[self.rng.random_range(0..self.palette.colors.len())];
        let shell = if self.multi_type {
            ShellType::ALL[self.rng.random_range(0..ShellType::ALL.len())]
        } else {
            ShellType::Peony
        };

        self.fireworks
            .push(Firework::launch(x, self.height, target_y, color, shell, &mut self.rng));
        self.total_launched += 1;
    }

    fn plot(&mut self, x: f32, y: f32, intensity: f32, color: Rgb) {
        if x < 0.0 || y < 0.0 {
            return;
        }
        let (xi, yi) = (x as usize, y as usize);
        if xi >= self.cols as usize || yi >= self.rows as usize * 2 {
            return;
        }
        let idx = yi * self.cols as usize + xi;
        if intensity > self.glow[idx].0 {
            self.glow[idx] = (intensity, color);
        }
    }

    /// Drops a fading streak behind a moving point, opposite its
    /// velocity. A zero-length direction is treated as minimal non-zero
    /// so positions stay finite.
    fn plot_trail(&mut self, x: f32, y: f32, vx: f32, vy: f32, len: usize, fade: f32, color: Rgb) {
        let mag = (vx * vx + vy * vy).sqrt().max(1e-6);
        let (dx, dy) = (-vx / mag, -vy / mag);
        for i in 1..=len {
            let falloff = 1.0 - i as f32 / (len as f32 + 1.0);
            self.plot(
                x + dx * i as f32,
                y + dy * i as f32,
                fade * falloff * 2.0,
                color,
            );
        }
    }

    /// Paints the current scene into the cell frame using half-blocks:
    /// one terminal row carries two vertically stacked pixels.
    pub fn render(&mut self, frame: &mut Frame, now: Instant) {
        if self.cols == 0 || self.rows == 0 {
            return;
        }

        for g in &mut self.glow {
            *g = (0.0, (0, 0, 0));
        }

        let fireworks = std::mem::take(&mut self.fireworks);
        for fw in &fireworks {
            if !fw.exploded {
                self.plot(fw.x, fw.y, 3.0, fw.color);
                self.plot_trail(fw.x, fw.y, fw.vx, fw.vy, 4, 1.0, fw.color);
                continue;
            }

            let trail_len = fw.shell.physics().trail_len;
            for p in &fw.particles {
                self.plot(p.x, p.y, p.life * 2.5, p.color);
                if trail_len > 0 {
                    self.plot_trail(p.x, p.y, p.vx, p.vy, trail_len, p.life, p.color);
                }
                if p.size >= 4.0 {
                    // Larger particles get a soft one-pixel halo.
                    for (ox, oy) in [(-1.0, 0.0), (1.0, 0.0), (0.0, -1.0), (0.0, 1.0)] {
                        self.plot(p.x + ox, p.y + oy, p.life * 0.8, p.color);
                    }
                }
            }
        }
        self.fireworks = fireworks;

        self.compose(frame);

        if now.saturating_duration_since(self.started_at) >= self.reveal_delay {
            self.draw_message(frame);
        }
    }

    fn shade(&self, intensity: f32, base: Rgb) -> Option<Rgb> {
        if intensity <= GLOW_FLOOR {
            return None;
        }
        let blend = (intensity / 3.0).min(1.0);
        Some((
            (base.0 as f32 * blend) as u8,
            (base.1 as f32 * blend) as u8,
            (base.2 as f32 * blend) as u8,
        ))
    }

    fn compose(&self, frame: &mut Frame) {
        let bg = self.palette.bg;
        for row in 0..self.rows {
            for col in 0..self.cols {
                let top_idx = (row as usize * 2) * self.cols as usize + col as usize;
                let bot_idx = top_idx + self.cols as usize;

                let (ti, tc) = self.glow[top_idx];
                let (bi, bc) = self.glow[bot_idx];
                let top = self.shade(ti, tc);
                let bot = self.shade(bi, bc);

                let cell = match (top, bot) {
                    (None, None) => Cell::blank_with_bg(bg),
                    (None, Some(b)) => Cell {
                        ch: '\u{2584}',
                        fg: term_color(self.color_mode, b),
                        bg,
                        bold: false,
                    },
                    (Some(t), None) => Cell {
                        ch: '\u{2580}',
                        fg: term_color(self.color_mode, t),
                        bg,
                        bold: false,
                    },
                    (Some(t), Some(b)) => Cell {
                        ch: '\u{2584}',
                        fg: term_color(self.color_mode, b),
                        bg: term_color(self.color_mode, t).or(bg),
                        bold: false,
                    },
                };
                frame.set(col, row, cell);
            }
        }
    }

    fn effective_message(&self) -> &str {
        self.message_text.as_deref().unwrap_or(FALLBACK_BANNER)
    }

    /// Lays the message out as a centered, optionally bordered box in
    /// cell coordinates. Recomputed on resize and on text changes.
    fn layout_message(&mut self) {
        self.message.clear();
        if self.cols == 0 || self.rows == 0 {
            return;
        }

        let pad_x: u16 = 2;
        let pad_y: u16 = 1;
        let border: u16 = if self.message_border { 1 } else { 0 };

        let chrome_w = 2 * (border + pad_x);
        let chrome_h = 2 * (border + pad_y);
        if self.cols <= chrome_w || self.rows <= chrome_h {
            return;
        }

        let max_content_w = (self.cols - chrome_w).max(1) as usize;
        let max_content_h = (self.rows - chrome_h).max(1) as usize;

        let mut lines: Vec<Vec<char>> = Vec::new();
        for raw in self.effective_message().split('\n') {
            if lines.len() >= max_content_h {
                break;
            }
            let chars: Vec<char> = raw.chars().collect();
            if chars.is_empty() {
                lines.push(Vec::new());
                continue;
            }
            for chunk in chars.chunks(max_content_w) {
                if lines.len() >= max_content_h {
                    break;
                }
                lines.push(chunk.to_vec());
            }
        }
        if lines.is_empty() {
            lines.push(Vec::new());
        }

        let content_w = lines.iter().map(Vec::len).max().unwrap_or(1).max(1) as u16;
        let content_h = lines.len() as u16;
        let box_w = content_w + chrome_w;
        let box_h = content_h + chrome_h;

        let start_col = (self.cols - box_w.min(self.cols)) / 2;
        let start_row = (self.rows - box_h.min(self.rows)) / 2;

        for y in 0..box_h {
            let row = start_row + y;
            if row >= self.rows {
                continue;
            }
            for x in 0..box_w {
                let col = start_col + x;
                if col >= self.cols {
                    continue;
                }

                let mut ch = ' ';
                if border == 1 {
                    let top = y == 0;
                    let bottom = y + 1 == box_h;
                    let left = x == 0;
                    let right = x + 1 == box_w;
                    ch = match (top || bottom, left || right) {
                        (true, true) => '+',
                        (true, false) => '-',
                        (false, true) => '|',
                        (false, false) => ' ',
                    };
                }

                let cy = border + pad_y;
                let cx = border + pad_x;
                if y >= cy && y < cy + content_h && x >= cx && x < cx + content_w {
                    if let Some(line) = lines.get((y - cy) as usize) {
                        let len = line.len().min(content_w as usize);
                        let left_pad = (content_w as usize - len) / 2;
                        let ix = (x - cx) as usize;
                        if ix >= left_pad && ix < left_pad + len {
                            ch = line[ix - left_pad];
                        }
                    }
                }

                self.message.push(MsgChr { row, col, val: ch });
            }
        }
    }

    fn draw_message(&self, frame: &mut Frame) {
        let fg = term_color(self.color_mode, (255, 255, 255));
        for mc in &self.message {
            frame.set(
                mc.col,
                mc.row,
                Cell {
                    ch: mc.val,
                    fg: if mc.val == ' ' { None } else { fg },
                    bg: self.palette.bg,
                    bold: mc.val != ' ',
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_scene(cap: usize, multi: bool, seed: u64) -> Scene {
        let mut scene = Scene::new(ColorMode::TrueColor, false, cap, multi, seed);
        scene.reset(120, 40);
        scene
    }

    #[test]
    fn active_count_never_exceeds_cap() {
        let mut scene = make_scene(15, true, 42);
        for _ in 0..500 {
            scene.tick();
            assert!(scene.active_count() <= 15);
        }
        assert!(scene.total_launched() >= 1);
    }

    #[test]
    fn unexploded_shells_never_own_particles() {
        let mut scene = make_scene(10, true, 9);
        for _ in 0..500 {
            scene.tick();
            for fw in scene.fireworks() {
                if !fw.exploded {
                    assert!(fw.particles.is_empty());
                }
            }
        }
    }

    #[test]
    fn exploded_stays_latched_across_ticks() {
        let mut scene = make_scene(5, false, 3);
        let mut seen_exploded = false;
        for _ in 0..1000 {
            scene.tick();
            for fw in scene.fireworks() {
                if fw.exploded {
                    seen_exploded = true;
                    assert!(!fw.particles.is_empty());
                }
            }
        }
        assert!(seen_exploded);
    }

    #[test]
    fn paused_scene_does_not_advance() {
        let mut scene = make_scene(15, true, 42);
        for _ in 0..50 {
            scene.tick();
        }
        let before = scene.total_launched();
        scene.toggle_pause();
        for _ in 0..200 {
            scene.tick();
        }
        assert_eq!(scene.total_launched(), before);
        scene.toggle_pause();
        for _ in 0..200 {
            scene.tick();
        }
        assert!(scene.total_launched() >= before);
    }

    #[test]
    fn palette_swap_is_wholesale() {
        let mut scene = make_scene(15, true, 1);
        let new = vec![(10, 20, 30), (40, 50, 60)];
        scene.set_palette(new.clone());
        assert_eq!(scene.palette.colors, new);

        scene.set_palette(Vec::new());
        assert!(!scene.palette.colors.is_empty());
    }

    #[test]
    fn newly_launched_shells_use_the_current_palette() {
        let mut scene = make_scene(15, true, 5);
        scene.set_palette(vec![(9, 9, 9)]);
        for _ in 0..500 {
            scene.tick();
        }
        assert!(scene.total_launched() >= 1);
        for fw in scene.fireworks() {
            assert_eq!(fw.color, (9, 9, 9));
        }
    }

    #[test]
    fn zero_size_surface_ticks_are_inert() {
        let mut scene = Scene::new(ColorMode::TrueColor, false, 15, true, 42);
        for _ in 0..100 {
            scene.tick();
        }
        assert_eq!(scene.total_launched(), 0);
    }

    #[test]
    fn render_paints_background_cells() {
        let mut scene = make_scene(15, true, 42);
        let mut frame = Frame::new(120, 40, scene.palette.bg);
        scene.render(&mut frame, Instant::now());
        assert!(frame.get(0, 0).is_some());
    }
}
