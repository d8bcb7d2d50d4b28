//! Renders the "G'MIC failed" image: the untouched source with the error
//! message drawn over it in red.

use font8x8::{BASIC_FONTS, UnicodeFonts};

use crate::engine::{ENGINE_WHITE, EngineImage};

/// Label color, normalized RGBA.
pub const LABEL_COLOR: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
/// Glyph cell size in pixels (8x8 font scaled by two).
pub const GLYPH_SCALE: u32 = 2;
pub const GLYPH_SIZE: u32 = 8 * GLYPH_SCALE;
/// Distance of the label from the top-left corner.
pub const MARGIN: u32 = 8;

/// Non-premultiplied source-over of `fg` onto `bg`.
#[inline]
pub fn over_pixel(fg: [f32; 4], bg: [f32; 4]) -> [f32; 4] {
    let fg_a = fg[3];
    let bg_a = bg[3];
    let out_a = fg_a + bg_a * (1.0 - fg_a);

    if out_a < 1e-8 {
        return [0.0, 0.0, 0.0, 0.0];
    }

    let inv_out_a = 1.0 / out_a;
    [
        (fg[0] * fg_a + bg[0] * bg_a * (1.0 - fg_a)) * inv_out_a,
        (fg[1] * fg_a + bg[1] * bg_a * (1.0 - fg_a)) * inv_out_a,
        (fg[2] * fg_a + bg[2] * bg_a * (1.0 - fg_a)) * inv_out_a,
        out_a,
    ]
}

/// Splits `text` into lines of at most `max_cols` characters.
pub fn wrap_label(text: &str, max_cols: usize) -> Vec<String> {
    let max_cols = max_cols.max(1);
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let chars: Vec<char> = paragraph.chars().collect();
        if chars.is_empty() {
            lines.push(String::new());
            continue;
        }
        lines.extend(chars.chunks(max_cols).map(|c| c.iter().collect()));
    }
    lines
}

/// Columns that fit on one label line of an image `width` pixels wide.
pub fn label_columns(width: u32) -> usize {
    (width.saturating_sub(2 * MARGIN) / GLYPH_SIZE).max(1) as usize
}

/// Pixel rectangle `(x, y, width, height)` covered by the label cells.
pub fn text_extent(message: &str, width: u32) -> (u32, u32, u32, u32) {
    let lines = wrap_label(&label_text(message), label_columns(width));
    let cols = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u32;
    (MARGIN, MARGIN, cols * GLYPH_SIZE, lines.len() as u32 * GLYPH_SIZE)
}

fn label_text(message: &str) -> String {
    format!("G'MIC error: {}", message.trim_end())
}

/// RGBA copy of `source` (engine units) with `message` drawn on top.
///
/// The result always has the source's width and height.
pub fn render_error(source: &EngineImage<'_>, message: &str) -> EngineImage<'static> {
    let (w, h) = (source.width, source.height);
    let mut data = Vec::with_capacity(w as usize * h as usize * 4);
    for y in 0..h {
        for x in 0..w {
            let px = source.rgba(x, y).unwrap_or([0.0, 0.0, 0.0, ENGINE_WHITE]);
            data.extend_from_slice(&px);
        }
    }

    let lines = wrap_label(&label_text(message), label_columns(w));
    for (row, line) in lines.iter().enumerate() {
        let top = MARGIN + row as u32 * GLYPH_SIZE;
        for (col, ch) in line.chars().enumerate() {
            let left = MARGIN + col as u32 * GLYPH_SIZE;
            let glyph = BASIC_FONTS
                .get(ch)
                .or_else(|| BASIC_FONTS.get('?'))
                .unwrap_or([0; 8]);
            draw_glyph(&mut data, w, h, left, top, &glyph);
        }
    }

    EngineImage::from_host(source.name.clone(), w, h, 4, data)
}

fn draw_glyph(data: &mut [f32], width: u32, height: u32, left: u32, top: u32, glyph: &[u8; 8]) {
    for (gy, bits) in glyph.iter().enumerate() {
        for gx in 0..8 {
            if bits & (1 << gx) == 0 {
                continue;
            }
            for sy in 0..GLYPH_SCALE {
                for sx in 0..GLYPH_SCALE {
                    let x = left + gx * GLYPH_SCALE + sx;
                    let y = top + gy as u32 * GLYPH_SCALE + sy;
                    if x >= width || y >= height {
                        continue;
                    }
                    let idx = (y as usize * width as usize + x as usize) * 4;
                    let px = &mut data[idx..idx + 4];
                    let bg = [
                        px[0] / ENGINE_WHITE,
                        px[1] / ENGINE_WHITE,
                        px[2] / ENGINE_WHITE,
                        px[3] / ENGINE_WHITE,
                    ];
                    let out = over_pixel(LABEL_COLOR, bg);
                    for (dst, v) in px.iter_mut().zip(out) {
                        *dst = v * ENGINE_WHITE;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_source(w: u32, h: u32, value: f32) -> EngineImage<'static> {
        EngineImage::from_host("input", w, h, 1, vec![value; (w * h) as usize])
    }

    #[test]
    fn over_opaque_covers_background() {
        let out = over_pixel([1.0, 0.0, 0.0, 1.0], [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(out, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn over_transparent_keeps_background() {
        let out = over_pixel([1.0, 0.0, 0.0, 0.0], [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(out, [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn wrap_splits_long_lines_and_keeps_breaks() {
        assert_eq!(wrap_label("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(wrap_label("ab\ncd", 10), vec!["ab", "cd"]);
        assert_eq!(wrap_label("abc", 0), vec!["a", "b", "c"]);
    }

    #[test]
    fn keeps_size_and_pixels_outside_label() {
        let src = gray_source(64, 48, 100.0);
        let out = render_error(&src, "oops");
        assert_eq!((out.width, out.height, out.spectrum), (64, 48, 4));
        assert_eq!(out.rgba(0, 0), Some([100.0, 100.0, 100.0, 255.0]));
        assert_eq!(out.rgba(63, 47), Some([100.0, 100.0, 100.0, 255.0]));
    }

    #[test]
    fn draws_red_pixels_inside_label() {
        let src = gray_source(128, 64, 100.0);
        let out = render_error(&src, "oops");
        let (x0, y0, tw, th) = text_extent("oops", 128);
        let mut red = 0;
        for y in y0..(y0 + th).min(64) {
            for x in x0..(x0 + tw).min(128) {
                let px = out.rgba(x, y).unwrap();
                if px == [255.0, 0.0, 0.0, 255.0] {
                    red += 1;
                } else {
                    assert_eq!(px, [100.0, 100.0, 100.0, 255.0]);
                }
            }
        }
        assert!(red > 0);
    }

    #[test]
    fn tiny_images_are_clipped_not_panicking() {
        let src = gray_source(3, 2, 0.0);
        let out = render_error(&src, "a long message that cannot fit");
        assert_eq!(out.samples().len(), 3 * 2 * 4);
    }

    #[test]
    fn deterministic_output() {
        let src = gray_source(40, 40, 10.0);
        let a = render_error(&src, "x");
        let b = render_error(&src, "x");
        assert_eq!(a.samples(), b.samples());
    }
}
