// Copyright (c) 2026 rezky_nightky

use std::collections::HashMap;

use crossterm::style::Color;

use crate::runtime::ColorMode;

pub type Rgb = (u8, u8, u8);

/// Display colors used when no image is supplied or extraction comes up
/// empty. Always non-empty; color picks index into this uniformly.
pub const DEFAULT_COLORS: [Rgb; 7] = [
    (255, 45, 117),
    (255, 215, 0),
    (0, 245, 255),
    (255, 107, 53),
    (168, 85, 247),
    (34, 197, 94),
    (244, 63, 94),
];

/// Side length of the thumbnail the extractor samples from. Bounds the
/// cost of extraction independent of the source resolution.
const SAMPLE_SIZE: u32 = 100;

/// Channel values are snapped to multiples of this bucket width so that
/// near-duplicate colors share a histogram bucket.
const BUCKET: u32 = 32;

/// Default pixel stride for histogram sampling (every 4th RGBA pixel).
pub const SAMPLE_STRIDE: usize = 4;

const MAX_COLORS: usize = 7;

#[derive(Clone, Debug)]
pub struct Palette {
    pub colors: Vec<Rgb>,
    pub bg: Option<Color>,
}

impl Palette {
    pub fn with_defaults(bg: Option<Color>) -> Self {
        Self {
            colors: DEFAULT_COLORS.to_vec(),
            bg,
        }
    }

    /// Replaces the color list wholesale. An empty list is rejected in
    /// favor of the built-in defaults so color selection stays defined.
    pub fn replace(&mut self, colors: Vec<Rgb>) {
        if colors.is_empty() {
            self.colors = DEFAULT_COLORS.to_vec();
        } else {
            self.colors = colors;
        }
    }
}

fn quantize(v: u8) -> u8 {
    let q = ((v as u32 + BUCKET / 2) / BUCKET) * BUCKET;
    q.min(255) as u8
}

/// Ranks the colors of an RGBA buffer by bucket frequency and returns up
/// to seven, most frequent first. Fully transparent pixels are skipped.
/// `stride` is in pixels; a stride of 4 looks at every 16th raw byte.
pub fn dominant_colors(rgba: &[u8], stride: usize) -> Vec<Rgb> {
    let step = stride.max(1) * 4;
    let mut counts: HashMap<Rgb, u32> = HashMap::new();

    let mut i = 0;
    while i + 3 < rgba.len() {
        if rgba[i + 3] > 0 {
            let key = (quantize(rgba[i]), quantize(rgba[i + 1]), quantize(rgba[i + 2]));
            *counts.entry(key).or_insert(0) += 1;
        }
        i += step;
    }

    let mut ranked: Vec<(Rgb, u32)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(MAX_COLORS);
    ranked.into_iter().map(|(c, _)| c).collect()
}

/// Decodes image bytes and extracts a palette from a downscaled
/// thumbnail. Never fails: decode errors and empty histograms resolve to
/// the default colors.
pub fn extract_or_default(bytes: &[u8]) -> Vec<Rgb> {
    let img = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(_) => return DEFAULT_COLORS.to_vec(),
    };

    let thumb = img.thumbnail_exact(SAMPLE_SIZE, SAMPLE_SIZE).to_rgba8();
    let colors = dominant_colors(thumb.as_raw(), SAMPLE_STRIDE);
    if colors.is_empty() {
        DEFAULT_COLORS.to_vec()
    } else {
        colors
    }
}

fn dist2(r0: u8, g0: u8, b0: u8, r1: u8, g1: u8, b1: u8) -> i32 {
    let dr = (r0 as i32) - (r1 as i32);
    let dg = (g0 as i32) - (g1 as i32);
    let db = (b0 as i32) - (b1 as i32);
    (dr * dr) + (dg * dg) + (db * db)
}

fn rgb_to_ansi256(r: u8, g: u8, b: u8) -> u8 {
    const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

    let r6 = ((r as u16 * 5) + 127) / 255;
    let g6 = ((g as u16 * 5) + 127) / 255;
    let b6 = ((b as u16 * 5) + 127) / 255;

    let cr = CUBE_LEVELS[r6 as usize];
    let cg = CUBE_LEVELS[g6 as usize];
    let cb = CUBE_LEVELS[b6 as usize];
    let cube_idx = 16 + (36 * r6 as u8) + (6 * g6 as u8) + (b6 as u8);
    let cube_dist = dist2(r, g, b, cr, cg, cb);

    let avg = ((r as u16 + g as u16 + b as u16) / 3) as u8;
    let gray_idx = if avg < 8 {
        16
    } else if avg > 238 {
        231
    } else {
        232 + ((avg - 8) / 10)
    };
    let (gr, gg, gb) = if gray_idx == 16 {
        (0, 0, 0)
    } else if gray_idx == 231 {
        (255, 255, 255)
    } else {
        let v = 8 + 10 * (gray_idx - 232);
        (v, v, v)
    };
    let gray_dist = dist2(r, g, b, gr, gg, gb);

    if gray_dist < cube_dist {
        gray_idx
    } else {
        cube_idx
    }
}

fn rgb_to_color16(r: u8, g: u8, b: u8) -> Color {
    const TABLE: [(Color, (u8, u8, u8)); 16] = [
        (Color::Black, (0, 0, 0)),
        (Color::DarkGrey, (128, 128, 128)),
        (Color::Grey, (192, 192, 192)),
        (Color::White, (255, 255, 255)),
        (Color::DarkRed, (128, 0, 0)),
        (Color::Red, (255, 0, 0)),
        (Color::DarkGreen, (0, 128, 0)),
        (Color::Green, (0, 255, 0)),
        (Color::DarkBlue, (0, 0, 128)),
        (Color::Blue, (0, 0, 255)),
        (Color::DarkCyan, (0, 128, 128)),
        (Color::Cyan, (0, 255, 255)),
        (Color::DarkMagenta, (128, 0, 128)),
        (Color::Magenta, (255, 0, 255)),
        (Color::DarkYellow, (128, 128, 0)),
        (Color::Yellow, (255, 255, 0)),
    ];

    let mut best = Color::White;
    let mut best_d = i32::MAX;
    for (c, (cr, cg, cb)) in TABLE {
        let d = dist2(r, g, b, cr, cg, cb);
        if d < best_d {
            best_d = d;
            best = c;
        }
    }
    best
}

/// Maps a simulation color onto whatever the terminal can show.
pub fn term_color(mode: ColorMode, (r, g, b): Rgb) -> Option<Color> {
    match mode {
        ColorMode::Mono => None,
        ColorMode::TrueColor => Some(Color::Rgb { r, g, b }),
        ColorMode::Color256 => Some(Color::AnsiValue(rgb_to_ansi256(r, g, b))),
        ColorMode::Color16 => Some(rgb_to_color16(r, g, b)),
    }
}

pub fn background_color(mode: ColorMode, default_background: bool) -> Option<Color> {
    if default_background {
        return None;
    }
    Some(match mode {
        ColorMode::Color16 => Color::Black,
        ColorMode::TrueColor => Color::Rgb { r: 0, g: 0, b: 0 },
        _ => Color::AnsiValue(16),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba_of(colors: &[(Rgb, usize)]) -> Vec<u8> {
        let mut out = Vec::new();
        for &((r, g, b), n) in colors {
            for _ in 0..n {
                out.extend_from_slice(&[r, g, b, 255]);
            }
        }
        out
    }

    #[test]
    fn most_frequent_color_ranks_first() {
        let buf = rgba_of(&[
            ((255, 0, 0), 8),
            ((0, 255, 0), 4),
            ((0, 0, 255), 2),
            ((0, 0, 0), 1),
        ]);
        let colors = dominant_colors(&buf, 1);
        assert_eq!(colors[0], (quantize(255), 0, 0));
        assert!(colors.len() <= 7);
    }

    #[test]
    fn near_duplicates_share_a_bucket() {
        let buf = rgba_of(&[((100, 100, 100), 3), ((110, 105, 98), 3)]);
        let colors = dominant_colors(&buf, 1);
        assert_eq!(colors.len(), 1);
    }

    #[test]
    fn transparent_pixels_yield_no_buckets() {
        let mut buf = rgba_of(&[((255, 0, 0), 4)]);
        for px in buf.chunks_mut(4) {
            px[3] = 0;
        }
        assert!(dominant_colors(&buf, 1).is_empty());
    }

    #[test]
    fn undecodable_bytes_fall_back_to_defaults() {
        let colors = extract_or_default(b"definitely not an image");
        assert_eq!(colors, DEFAULT_COLORS.to_vec());
    }

    #[test]
    fn replace_rejects_empty_palette() {
        let mut p = Palette::with_defaults(None);
        p.replace(Vec::new());
        assert!(!p.colors.is_empty());

        p.replace(vec![(1, 2, 3)]);
        assert_eq!(p.colors, vec![(1, 2, 3)]);
    }

    #[test]
    fn stride_skips_pixels() {
        let buf = rgba_of(&[((255, 0, 0), 1), ((0, 255, 0), 3)]);
        // Stride 4 only ever samples the first pixel here.
        let colors = dominant_colors(&buf, 4);
        assert_eq!(colors, vec![(quantize(255), 0, 0)]);
    }
}
