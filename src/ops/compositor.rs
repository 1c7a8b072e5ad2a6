// ============================================================================
// COMPOSITOR — per-cell erase margins followed by background chroma-key
// ============================================================================

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::grid::Grid;

/// Largest possible Euclidean distance between two RGB colours (√3 · 255).
pub const MAX_THRESHOLD: f32 = 441.673;

/// Pixel insets cleared inside every cell before export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Margins {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl Margins {
    pub fn new(top: u32, bottom: u32, left: u32, right: u32) -> Self {
        Self { top, bottom, left, right }
    }

    pub fn is_zero(&self) -> bool {
        self.top == 0 && self.bottom == 0 && self.left == 0 && self.right == 0
    }
}

/// Background colour keyed out to transparency, with its distance threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChromaKey {
    pub color: [u8; 3],
    pub threshold: f32,
}

impl ChromaKey {
    pub fn new(color: [u8; 3], threshold: f32) -> Self {
        Self { color, threshold }
    }

    /// Strict comparison: a pixel exactly `threshold` away survives.
    #[inline]
    pub fn matches(&self, rgb: [u8; 3]) -> bool {
        color_distance(rgb, self.color) < self.threshold as f64
    }
}

/// Run the full pipeline on a copy of `source`: margins first, then the
/// optional chroma-key.  Margin-cleared pixels are already transparent, so
/// the key scan skips them.
pub fn composite(
    source: &RgbaImage,
    grid: &Grid,
    margins: Margins,
    key: Option<ChromaKey>,
) -> RgbaImage {
    let mut out = source.clone();
    apply_erase_margins(&mut out, grid, margins);
    if let Some(key) = key {
        apply_chroma_key(&mut out, key);
    }
    out
}

/// Clear the top/bottom/left/right insets of every cell.  Insets are clipped
/// to the cell, so an oversized margin empties the cell but never reaches
/// into a neighbour.
pub fn apply_erase_margins(pixels: &mut RgbaImage, grid: &Grid, margins: Margins) {
    if margins.is_zero() {
        return;
    }
    for (r, c) in grid.cells() {
        let Some(cell) = grid.cell_pixel_rect(r, c) else {
            continue;
        };
        let (x0, y0, x1, y1) = (cell.x, cell.y, cell.right(), cell.bottom());

        if margins.top > 0 {
            clear_rect(pixels, x0, y0, x1, y0.saturating_add(margins.top).min(y1));
        }
        if margins.bottom > 0 {
            clear_rect(pixels, x0, y1.saturating_sub(margins.bottom).max(y0), x1, y1);
        }
        if margins.left > 0 {
            clear_rect(pixels, x0, y0, x0.saturating_add(margins.left).min(x1), y1);
        }
        if margins.right > 0 {
            clear_rect(pixels, x1.saturating_sub(margins.right).max(x0), y0, x1, y1);
        }
    }
}

/// Zero the alpha of every non-transparent pixel closer than the threshold
/// to the key colour.  Colour channels are left as they were.
///
/// Returns the number of pixels that were masked.
pub fn apply_chroma_key(pixels: &mut RgbaImage, key: ChromaKey) -> usize {
    let buf: &mut [u8] = pixels;
    buf.par_chunks_exact_mut(4)
        .map(|px| {
            if px[3] == 0 {
                return 0;
            }
            if key.matches([px[0], px[1], px[2]]) {
                px[3] = 0;
                1
            } else {
                0
            }
        })
        .sum()
}

/// Euclidean distance in 0-255 RGB space, unrounded.
#[inline]
pub fn color_distance(a: [u8; 3], b: [u8; 3]) -> f64 {
    let dr = a[0] as i32 - b[0] as i32;
    let dg = a[1] as i32 - b[1] as i32;
    let db = a[2] as i32 - b[2] as i32;
    ((dr * dr + dg * dg + db * db) as f64).sqrt()
}

/// Parse `#RRGGBB` / `RRGGBB` (any case).
pub fn parse_hex_color(s: &str) -> Option<[u8; 3]> {
    let hex = s.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// `#RRGGBB`, upper-case.
pub fn format_hex_color(rgb: [u8; 3]) -> String {
    format!("#{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2])
}

/// Clear the half-open rectangle `[x0, x1) × [y0, y1)`, clipped to the image.
fn clear_rect(pixels: &mut RgbaImage, x0: u32, y0: u32, x1: u32, y1: u32) {
    let x1 = x1.min(pixels.width());
    let y1 = y1.min(pixels.height());
    for y in y0..y1 {
        for x in x0..x1 {
            pixels.put_pixel(x, y, Rgba([0, 0, 0, 0]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(rgba))
    }

    #[test]
    fn white_key_masks_near_white_only() {
        let key = ChromaKey::new([255, 255, 255], 30.0);
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([250, 250, 250, 255]));
        img.put_pixel(1, 0, Rgba([200, 200, 200, 255]));

        assert!((color_distance([250, 250, 250], [255, 255, 255]) - 8.660).abs() < 0.001);
        assert!((color_distance([200, 200, 200], [255, 255, 255]) - 95.262).abs() < 0.001);

        assert_eq!(apply_chroma_key(&mut img, key), 1);
        assert_eq!(img.get_pixel(0, 0)[3], 0);
        assert_eq!(img.get_pixel(1, 0)[3], 255);
        // colour channels are untouched
        assert_eq!(img.get_pixel(0, 0)[0], 250);
    }

    #[test]
    fn threshold_comparison_is_strict() {
        // distance to the key is exactly 30
        let px = [255, 255, 225];
        assert!(!ChromaKey::new([255, 255, 255], 30.0).matches(px));
        assert!(ChromaKey::new([255, 255, 255], 30.01).matches(px));
        assert!(!ChromaKey::new(px, 0.0).matches(px));
    }

    #[test]
    fn transparent_pixels_are_skipped() {
        let mut img = solid(3, 3, [10, 20, 30, 0]);
        let key = ChromaKey::new([10, 20, 30], 100.0);
        assert_eq!(apply_chroma_key(&mut img, key), 0);
        assert!(img.pixels().all(|p| p.0 == [10, 20, 30, 0]));
        // second pass is a no-op as well
        apply_chroma_key(&mut img, key);
        assert!(img.pixels().all(|p| p.0 == [10, 20, 30, 0]));
    }

    #[test]
    fn masking_is_monotonic_in_threshold() {
        let mut img = RgbaImage::new(64, 4);
        for (x, y, p) in img.enumerate_pixels_mut() {
            let v = (x * 4) as u8;
            *p = Rgba([v, v.wrapping_add(y as u8 * 30), 255 - v, 255]);
        }
        let color = [120, 60, 90];
        let mut previous: Option<RgbaImage> = None;
        for threshold in [0.0, 10.0, 40.0, 90.0, 150.0, 300.0, MAX_THRESHOLD + 1.0] {
            let mut keyed = img.clone();
            apply_chroma_key(&mut keyed, ChromaKey::new(color, threshold));
            if let Some(prev) = &previous {
                for (a, b) in prev.pixels().zip(keyed.pixels()) {
                    if a[3] == 0 {
                        assert_eq!(b[3], 0);
                    }
                }
            }
            previous = Some(keyed);
        }
        // above the maximum distance everything goes
        assert!(previous.unwrap().pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn margins_clear_top_and_left_of_each_cell() {
        let img = solid(100, 100, [9, 8, 7, 255]);
        let grid = Grid::uniform(2, 2, 100, 100);
        let out = composite(&img, &grid, Margins::new(10, 0, 5, 0), None);

        for (r, c) in grid.cells() {
            let cell = grid.cell_pixel_rect(r, c).unwrap();
            for y in 0..cell.height {
                for x in 0..cell.width {
                    let p = out.get_pixel(cell.x + x, cell.y + y);
                    if y < 10 || x < 5 {
                        assert_eq!(p.0, [0, 0, 0, 0], "cell ({r},{c}) at {x},{y}");
                    } else {
                        assert_eq!(p.0, [9, 8, 7, 255], "cell ({r},{c}) at {x},{y}");
                    }
                }
            }
        }
    }

    #[test]
    fn bottom_and_right_margins() {
        let img = solid(20, 10, [1, 2, 3, 255]);
        let grid = Grid::uniform(1, 2, 20, 10);
        let out = composite(&img, &grid, Margins::new(0, 2, 0, 3), None);
        // first cell spans x 0..10
        assert_eq!(out.get_pixel(6, 0)[3], 255);
        assert_eq!(out.get_pixel(7, 0)[3], 0);
        assert_eq!(out.get_pixel(0, 7)[3], 255);
        assert_eq!(out.get_pixel(0, 8)[3], 0);
        // second cell starts fresh at x = 10
        assert_eq!(out.get_pixel(10, 0)[3], 255);
        assert_eq!(out.get_pixel(17, 0)[3], 0);
    }

    #[test]
    fn oversized_margins_stay_inside_their_cell() {
        let img = solid(40, 10, [5, 5, 5, 255]);
        let grid = Grid::uniform(1, 4, 40, 10);
        let mut out = img.clone();
        apply_erase_margins(&mut out, &grid, Margins::new(0, 0, 500, 0));
        assert!(out.pixels().all(|p| p[3] == 0));

        let mut partial = img.clone();
        let narrow = Grid::uniform(1, 1, 40, 10);
        apply_erase_margins(&mut partial, &narrow, Margins::new(0, 0, 0, 15));
        assert_eq!(partial.get_pixel(24, 5)[3], 255);
        assert_eq!(partial.get_pixel(25, 5)[3], 0);
    }

    #[test]
    fn max_margins_clear_everything_without_overflow() {
        let img = solid(100, 100, [5, 5, 5, 255]);
        let grid = Grid::uniform(2, 2, 100, 100);
        for m in [
            Margins::new(u32::MAX, 0, 0, 0),
            Margins::new(0, 0, u32::MAX, 0),
            Margins::new(u32::MAX, u32::MAX, u32::MAX, u32::MAX),
        ] {
            let out = composite(&img, &grid, m, None);
            assert!(out.pixels().all(|p| p[3] == 0), "{m:?}");
        }
    }

    #[test]
    fn margins_apply_before_the_key() {
        // key would keep these pixels; margins clear them regardless
        let img = solid(10, 10, [0, 0, 0, 255]);
        let grid = Grid::uniform(1, 1, 10, 10);
        let out = composite(
            &img,
            &grid,
            Margins::new(1, 0, 0, 0),
            Some(ChromaKey::new([255, 255, 255], 10.0)),
        );
        assert_eq!(out.get_pixel(3, 0).0, [0, 0, 0, 0]);
        assert_eq!(out.get_pixel(3, 1).0, [0, 0, 0, 255]);
    }

    #[test]
    fn hex_round_trip_and_rejects() {
        assert_eq!(parse_hex_color("#ff8000"), Some([255, 128, 0]));
        assert_eq!(parse_hex_color("00FF7f"), Some([0, 255, 127]));
        assert_eq!(parse_hex_color(" #0a0B0c "), Some([10, 11, 12]));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
        assert_eq!(parse_hex_color(""), None);
        assert_eq!(format_hex_color([255, 128, 0]), "#FF8000");
    }
}
