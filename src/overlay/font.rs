//! 5x7 bitmap font for burned-in frame annotations
//!
//! Covers the characters that appear in timestamps and metric readouts.
//! Characters without a glyph advance the cursor and draw nothing.

use crate::types::{Frame, FramePixels};
use image::{Luma, Rgb};

pub const GLYPH_WIDTH: u32 = 5;
pub const GLYPH_HEIGHT: u32 = 7;
/// Horizontal advance per character in unscaled pixels
pub const GLYPH_ADVANCE: u32 = GLYPH_WIDTH + 1;

/// Row bitmaps, top to bottom; bit 4 is the leftmost column
fn glyph(c: char) -> Option<[u8; 7]> {
    let rows = match c {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        '/' => [0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x00],
        'm' => [0x00, 0x00, 0x1A, 0x15, 0x15, 0x11, 0x11],
        's' => [0x00, 0x00, 0x0E, 0x10, 0x0E, 0x01, 0x1E],
        _ => return None,
    };
    Some(rows)
}

/// Pixel width of `text` rendered at `scale`
pub fn text_width(text: &str, scale: u32) -> u32 {
    text.chars().count() as u32 * GLYPH_ADVANCE * scale.max(1)
}

/// Draw `text` with its baseline at `(x, baseline)`
///
/// Pixels falling outside the frame are clipped. Single channel frames are
/// painted with the first component of `color`.
pub fn draw_text(frame: &mut Frame, text: &str, x: u32, baseline: u32, scale: u32, color: [u8; 3]) {
    let scale = scale.max(1);
    let top = baseline as i64 - (GLYPH_HEIGHT * scale) as i64;
    let mut cursor = x as i64;

    for c in text.chars() {
        if let Some(rows) = glyph(c) {
            for (row_idx, row) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if (row >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                        continue;
                    }
                    let px = cursor + (col * scale) as i64;
                    let py = top + (row_idx as u32 * scale) as i64;
                    fill_block(frame, px, py, scale, color);
                }
            }
        }
        cursor += (GLYPH_ADVANCE * scale) as i64;
    }
}

fn fill_block(frame: &mut Frame, x: i64, y: i64, size: u32, color: [u8; 3]) {
    let (w, h) = (frame.width() as i64, frame.height() as i64);
    for dy in 0..size as i64 {
        for dx in 0..size as i64 {
            let (px, py) = (x + dx, y + dy);
            if px < 0 || py < 0 || px >= w || py >= h {
                continue;
            }
            match &mut frame.pixels {
                FramePixels::Rgb(img) => img.put_pixel(px as u32, py as u32, Rgb(color)),
                FramePixels::Gray(img) => img.put_pixel(px as u32, py as u32, Luma([color[0]])),
            }
        }
    }
}
