//! Renderer stage: draws detections onto a copy of the source raster.
//!
//! Each detection gets an unfilled box outline in a color picked from a
//! fixed 12-color palette and a `"<label>: <score>%"` text tag anchored at
//! the box top-left. Outline and text are blended at partial opacity so the
//! underlying image stays visible. Color choice is cosmetic and random by
//! default; the picker is injectable so tests can render deterministically.
//!
//! The output keeps the source dimensions and is plain RGB, ready for JPEG
//! encoding.

use image::{Rgb, RgbImage};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::pipeline::data::{BoundingBox, Detection};

/// Fixed pastel palette boxes are drawn with.
pub const PALETTE: [Rgb<u8>; 12] = [
    Rgb([255, 127, 127]),
    Rgb([255, 127, 191]),
    Rgb([255, 127, 255]),
    Rgb([191, 127, 255]),
    Rgb([127, 127, 255]),
    Rgb([127, 191, 255]),
    Rgb([127, 255, 255]),
    Rgb([127, 255, 191]),
    Rgb([127, 255, 127]),
    Rgb([191, 255, 127]),
    Rgb([255, 255, 127]),
    Rgb([255, 191, 127]),
];

/// Opacity applied to outlines and label text.
const DRAW_ALPHA: f32 = 0.8;
/// Opacity of the dark strip behind label text.
const STRIP_ALPHA: f32 = 0.7;
/// Outline thickness in pixels.
const OUTLINE_THICKNESS: i64 = 3;
/// Label text color (glyphs, not the box outline).
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
/// Per-glyph advance and strip height for the 5x7 bitmap font.
const GLYPH_ADVANCE: i64 = 6;
const STRIP_HEIGHT: i64 = 11;

/// Source of box colors, one pick per detection.
pub trait ColorPicker {
    fn pick(&mut self) -> Rgb<u8>;
}

/// Uniform random palette selection. Two renders of the same detection set
/// may produce differently colored (but content-equivalent) images.
pub struct RandomPalette {
    rng: StdRng,
}

impl Default for RandomPalette {
    fn default() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl ColorPicker for RandomPalette {
    fn pick(&mut self) -> Rgb<u8> {
        PALETTE[self.rng.gen_range(0..PALETTE.len())]
    }
}

/// Deterministic picker cycling through the palette in order.
pub struct SequentialPalette {
    next: usize,
}

impl SequentialPalette {
    pub fn new() -> Self {
        Self { next: 0 }
    }
}

impl Default for SequentialPalette {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorPicker for SequentialPalette {
    fn pick(&mut self) -> Rgb<u8> {
        let color = PALETTE[self.next % PALETTE.len()];
        self.next += 1;
        color
    }
}

/// Draw `detections` onto a copy of `image`.
///
/// An empty detection set yields an untouched copy of the source. Boxes
/// partially outside the canvas are clamped when drawn; the detection's
/// stored coordinates are left as-is.
pub fn render(
    image: &RgbImage,
    detections: &[Detection],
    picker: &mut dyn ColorPicker,
) -> RgbImage {
    let mut canvas = image.clone();
    for detection in detections {
        let color = picker.pick();
        draw_box_outline(&mut canvas, &detection.bbox, color);
        let text = format!("{}: {}%", detection.label, detection.score_percent());
        draw_tag(&mut canvas, &detection.bbox, &text);
    }
    canvas
}

/// Blend `color` over the pixel at (x, y), ignoring out-of-canvas writes.
fn blend(canvas: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>, alpha: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
    for c in 0..3 {
        pixel[c] = (alpha * f32::from(color[c]) + (1.0 - alpha) * f32::from(pixel[c])).round()
            as u8;
    }
}

/// Unfilled rectangle outline, `OUTLINE_THICKNESS` pixels, blended.
fn draw_box_outline(canvas: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>) {
    let width = canvas.width() as i64;
    let height = canvas.height() as i64;
    let left = bbox.x1.clamp(0, width.saturating_sub(1));
    let right = bbox.x2.clamp(0, width.saturating_sub(1));
    let top = bbox.y1.clamp(0, height.saturating_sub(1));
    let bottom = bbox.y2.clamp(0, height.saturating_sub(1));
    if left > right || top > bottom {
        return;
    }

    // Blending is not idempotent, so visit every outline pixel exactly once.
    for y in top..=bottom {
        for x in left..=right {
            let on_edge = x - left < OUTLINE_THICKNESS
                || right - x < OUTLINE_THICKNESS
                || y - top < OUTLINE_THICKNESS
                || bottom - y < OUTLINE_THICKNESS;
            if on_edge {
                blend(canvas, x, y, color, DRAW_ALPHA);
            }
        }
    }
}

/// Label strip and text anchored at the box top-left corner.
fn draw_tag(canvas: &mut RgbImage, bbox: &BoundingBox, text: &str) {
    let width = canvas.width() as i64;
    let tag_x = bbox.x1.clamp(0, width.saturating_sub(1));
    let tag_y = (bbox.y1 - STRIP_HEIGHT).max(0);

    let text_width = text.chars().count() as i64 * GLYPH_ADVANCE;
    fill_rect(
        canvas,
        tag_x,
        tag_y,
        tag_x + text_width + 2,
        tag_y + STRIP_HEIGHT - 1,
        Rgb([0, 0, 0]),
        STRIP_ALPHA,
    );
    draw_text(canvas, tag_x + 2, tag_y + 2, text, TEXT_COLOR);
}

/// Filled rectangle, blended, clamped to the canvas.
fn fill_rect(canvas: &mut RgbImage, left: i64, top: i64, right: i64, bottom: i64, color: Rgb<u8>, alpha: f32) {
    let width = canvas.width() as i64;
    let height = canvas.height() as i64;
    let left = left.clamp(0, width.saturating_sub(1));
    let right = right.clamp(0, width.saturating_sub(1));
    let top = top.clamp(0, height.saturating_sub(1));
    let bottom = bottom.clamp(0, height.saturating_sub(1));
    for y in top..=bottom {
        for x in left..=right {
            blend(canvas, x, y, color, alpha);
        }
    }
}

/// Render text with the built-in 5x7 bitmap font, uppercased.
fn draw_text(canvas: &mut RgbImage, mut x: i64, y: i64, text: &str, color: Rgb<u8>) {
    for ch in text.chars().flat_map(|c| c.to_uppercase()) {
        if let Some(glyph) = glyph_bits(ch) {
            for (row, pattern) in glyph.iter().enumerate() {
                let py = y + row as i64;
                for col in 0..5 {
                    if (pattern >> (4 - col)) & 1 == 1 {
                        blend(canvas, x + col, py, color, DRAW_ALPHA);
                    }
                }
            }
        }
        x += GLYPH_ADVANCE;
    }
}

fn glyph_bits(ch: char) -> Option<[u8; 7]> {
    match ch {
        'A' => Some([
            0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001,
        ]),
        'B' => Some([
            0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110,
        ]),
        'C' => Some([
            0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110,
        ]),
        'D' => Some([
            0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100,
        ]),
        'E' => Some([
            0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b11111,
        ]),
        'F' => Some([
            0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b10000,
        ]),
        'G' => Some([
            0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111,
        ]),
        'H' => Some([
            0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001,
        ]),
        'I' => Some([
            0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110,
        ]),
        'J' => Some([
            0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100,
        ]),
        'K' => Some([
            0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001,
        ]),
        'L' => Some([
            0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111,
        ]),
        'M' => Some([
            0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001,
        ]),
        'N' => Some([
            0b10001, 0b11001, 0b10101, 0b10101, 0b10011, 0b10001, 0b10001,
        ]),
        'O' => Some([
            0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110,
        ]),
        'P' => Some([
            0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000,
        ]),
        'Q' => Some([
            0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101,
        ]),
        'R' => Some([
            0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001,
        ]),
        'S' => Some([
            0b01111, 0b10000, 0b01110, 0b00001, 0b00001, 0b10001, 0b01110,
        ]),
        'T' => Some([
            0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100,
        ]),
        'U' => Some([
            0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110,
        ]),
        'V' => Some([
            0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100,
        ]),
        'W' => Some([
            0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010,
        ]),
        'X' => Some([
            0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001,
        ]),
        'Y' => Some([
            0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100,
        ]),
        'Z' => Some([
            0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111,
        ]),
        '0' => Some([
            0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110,
        ]),
        '1' => Some([
            0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110,
        ]),
        '2' => Some([
            0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111,
        ]),
        '3' => Some([
            0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110,
        ]),
        '4' => Some([
            0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010,
        ]),
        '5' => Some([
            0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110,
        ]),
        '6' => Some([
            0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110,
        ]),
        '7' => Some([
            0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000,
        ]),
        '8' => Some([
            0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110,
        ]),
        '9' => Some([
            0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100,
        ]),
        '%' => Some([
            0b10001, 0b10010, 0b00100, 0b01000, 0b10010, 0b10001, 0b00000,
        ]),
        ':' => Some([
            0b00000, 0b00110, 0b00110, 0b00000, 0b00110, 0b00110, 0b00000,
        ]),
        '.' => Some([0, 0, 0, 0, 0, 0b00110, 0b00110]),
        '-' => Some([0, 0, 0, 0b01110, 0, 0, 0]),
        ' ' => Some([0, 0, 0, 0, 0, 0, 0]),
        _ => None,
    }
}
