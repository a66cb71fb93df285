use crate::{surface::SurfaceSize, ui::Rect};

pub type Color = [u8; 4];

pub const DEFAULT_TEXT_SCALE: u32 = 2;
const GLYPH_W: u32 = 3;
const GLYPH_H: u32 = 5;

pub fn glyph_advance_x(scale: u32) -> u32 {
    (GLYPH_W + 1) * scale.max(1)
}

pub fn line_advance_y(scale: u32) -> u32 {
    (GLYPH_H + 1) * scale.max(1)
}

/// Pixel width of `text` at `scale` (used to center/right-align labels).
pub fn text_width(text: &str, scale: u32) -> u32 {
    (text.chars().count() as u32).saturating_mul(glyph_advance_x(scale))
}

/// Unified 2D rendering interface.
///
/// Game code only talks to this trait; whether the target is an offscreen
/// RGBA buffer or the windowed `pixels` framebuffer is not its concern.
/// Circle and line primitives take signed coordinates because a panned
/// camera routinely pushes scene geometry partially off-screen.
pub trait Renderer2d {
    fn begin_frame(&mut self, size: SurfaceSize);
    fn size(&self) -> SurfaceSize;

    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Alpha-blends `color` over existing content.
    fn blend_rect(&mut self, rect: Rect, color: Color, alpha: u8);

    fn rect_outline(&mut self, rect: Rect, color: Color);

    fn fill_circle(&mut self, cx: i32, cy: i32, radius: u32, color: Color);
    fn blend_circle(&mut self, cx: i32, cy: i32, radius: u32, color: Color, alpha: u8);
    fn circle_outline(&mut self, cx: i32, cy: i32, radius: u32, color: Color);

    /// 1px line, clipped to the frame.
    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color);

    fn draw_text_scaled(&mut self, x: u32, y: u32, text: &str, color: Color, scale: u32);

    fn draw_text(&mut self, x: u32, y: u32, text: &str, color: Color) {
        self.draw_text_scaled(x, y, text, color, DEFAULT_TEXT_SCALE);
    }

    fn clear(&mut self, color: Color) {
        let s = self.size();
        self.fill_rect(Rect::from_size(s.width, s.height), color);
    }
}

/// CPU renderer drawing into an RGBA frame buffer.
///
/// All rasterization is integer-exact: rendering the same draw sequence twice
/// yields byte-identical frames, which the render tests rely on.
pub struct CpuRenderer<'a> {
    frame: &'a mut [u8],
    size: SurfaceSize,
}

impl<'a> CpuRenderer<'a> {
    pub fn new(frame: &'a mut [u8], size: SurfaceSize) -> Self {
        Self { frame, size }
    }

    fn frame_ok(&self) -> bool {
        !self.size.is_empty() && self.frame.len() >= self.size.rgba_len()
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.size.width || y >= self.size.height {
            return;
        }
        let idx = ((y * self.size.width + x) * 4) as usize;
        self.frame[idx..idx + 4].copy_from_slice(&color);
    }

    fn blend_pixel(&mut self, x: i32, y: i32, color: Color, alpha: u8) {
        if x < 0 || y < 0 || alpha == 0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.size.width || y >= self.size.height {
            return;
        }
        let idx = ((y * self.size.width + x) * 4) as usize;

        let a = alpha as u32;
        let inv = 255 - a;
        for c in 0..3 {
            let old = self.frame[idx + c] as u32;
            self.frame[idx + c] = ((old * inv + (color[c] as u32) * a + 127) / 255) as u8;
        }
        self.frame[idx + 3] = 255;
    }

    /// Fills the horizontal span [x0, x1] on row `y`, clipped.
    fn fill_span(&mut self, x0: i32, x1: i32, y: i32, color: Color) {
        if y < 0 || y >= self.size.height as i32 {
            return;
        }
        let x0 = x0.max(0) as u32;
        let x1 = x1.min(self.size.width as i32 - 1);
        if x1 < 0 || x0 > x1 as u32 {
            return;
        }
        let row = (y as u32 * self.size.width) as usize;
        let start = (row + x0 as usize) * 4;
        let end = (row + x1 as usize + 1) * 4;
        for px in self.frame[start..end].chunks_exact_mut(4) {
            px.copy_from_slice(&color);
        }
    }

    fn blend_span(&mut self, x0: i32, x1: i32, y: i32, color: Color, alpha: u8) {
        if y < 0 || y >= self.size.height as i32 {
            return;
        }
        let lo = x0.max(0);
        let hi = x1.min(self.size.width as i32 - 1);
        for x in lo..=hi {
            self.blend_pixel(x, y, color, alpha);
        }
    }
}

impl Renderer2d for CpuRenderer<'_> {
    fn begin_frame(&mut self, size: SurfaceSize) {
        self.size = size;
    }

    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        if !self.frame_ok() || rect.w == 0 || rect.h == 0 {
            return;
        }
        let x0 = rect.x.min(self.size.width) as i32;
        let x1 = rect.x.saturating_add(rect.w).min(self.size.width) as i32 - 1;
        let y0 = rect.y.min(self.size.height) as i32;
        let y1 = rect.y.saturating_add(rect.h).min(self.size.height) as i32 - 1;
        for y in y0..=y1 {
            self.fill_span(x0, x1, y, color);
        }
    }

    fn blend_rect(&mut self, rect: Rect, color: Color, alpha: u8) {
        if !self.frame_ok() || rect.w == 0 || rect.h == 0 || alpha == 0 {
            return;
        }
        if alpha == 255 {
            self.fill_rect(rect, color);
            return;
        }
        let x0 = rect.x.min(self.size.width) as i32;
        let x1 = rect.x.saturating_add(rect.w).min(self.size.width) as i32 - 1;
        let y0 = rect.y.min(self.size.height) as i32;
        let y1 = rect.y.saturating_add(rect.h).min(self.size.height) as i32 - 1;
        for y in y0..=y1 {
            self.blend_span(x0, x1, y, color, alpha);
        }
    }

    fn rect_outline(&mut self, rect: Rect, color: Color) {
        if !self.frame_ok() || rect.w == 0 || rect.h == 0 {
            return;
        }
        self.fill_rect(Rect::new(rect.x, rect.y, rect.w, 1), color);
        if rect.h > 1 {
            self.fill_rect(Rect::new(rect.x, rect.y + rect.h - 1, rect.w, 1), color);
        }
        self.fill_rect(Rect::new(rect.x, rect.y, 1, rect.h), color);
        if rect.w > 1 {
            self.fill_rect(Rect::new(rect.x + rect.w - 1, rect.y, 1, rect.h), color);
        }
    }

    fn fill_circle(&mut self, cx: i32, cy: i32, radius: u32, color: Color) {
        if !self.frame_ok() {
            return;
        }
        if radius == 0 {
            self.set_pixel(cx, cy, color);
            return;
        }
        let r = radius as i32;
        let r2 = (r * r) as f64;
        for dy in -r..=r {
            // Row half-width of the disc at this offset.
            let half = (r2 - (dy * dy) as f64).sqrt().floor() as i32;
            self.fill_span(cx - half, cx + half, cy + dy, color);
        }
    }

    fn blend_circle(&mut self, cx: i32, cy: i32, radius: u32, color: Color, alpha: u8) {
        if !self.frame_ok() || alpha == 0 {
            return;
        }
        if alpha == 255 {
            self.fill_circle(cx, cy, radius, color);
            return;
        }
        let r = radius as i32;
        let r2 = (r * r) as f64;
        for dy in -r..=r {
            let half = (r2 - (dy * dy) as f64).sqrt().floor() as i32;
            self.blend_span(cx - half, cx + half, cy + dy, color, alpha);
        }
    }

    fn circle_outline(&mut self, cx: i32, cy: i32, radius: u32, color: Color) {
        if !self.frame_ok() {
            return;
        }
        if radius == 0 {
            self.set_pixel(cx, cy, color);
            return;
        }

        // Midpoint circle, plotting all eight octants.
        let mut x = radius as i32;
        let mut y = 0i32;
        let mut err = 1 - x;
        while x >= y {
            for (px, py) in [
                (cx + x, cy + y),
                (cx - x, cy + y),
                (cx + x, cy - y),
                (cx - x, cy - y),
                (cx + y, cy + x),
                (cx - y, cy + x),
                (cx + y, cy - x),
                (cx - y, cy - x),
            ] {
                self.set_pixel(px, py, color);
            }
            y += 1;
            if err < 0 {
                err += 2 * y + 1;
            } else {
                x -= 1;
                err += 2 * (y - x) + 1;
            }
        }
    }

    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
        if !self.frame_ok() {
            return;
        }

        // Bresenham. Clipping happens per-pixel; segments are short (node to
        // node on screen), so span clipping is not worth the complexity.
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (x0, y0);

        loop {
            self.set_pixel(x, y, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn draw_text_scaled(&mut self, x: u32, y: u32, text: &str, color: Color, scale: u32) {
        if !self.frame_ok() {
            return;
        }
        let scale = scale.max(1);
        let adv_x = glyph_advance_x(scale);
        let adv_y = line_advance_y(scale);

        let mut cursor_x = x;
        let mut cursor_y = y;

        for ch in text.chars() {
            match ch {
                '\n' => {
                    cursor_x = x;
                    cursor_y = cursor_y.saturating_add(adv_y);
                    if cursor_y >= self.size.height {
                        break;
                    }
                    continue;
                }
                ' ' => {
                    cursor_x = cursor_x.saturating_add(adv_x);
                    if cursor_x >= self.size.width {
                        break;
                    }
                    continue;
                }
                _ => {}
            }

            let rows = glyph_rows(ch);
            for (row, bits) in rows.into_iter().enumerate() {
                let py0 = cursor_y.saturating_add(row as u32 * scale);
                for col in 0..GLYPH_W {
                    if bits & (1u8 << (GLYPH_W - 1 - col)) == 0 {
                        continue;
                    }
                    let px0 = cursor_x.saturating_add(col * scale);
                    self.fill_rect(Rect::new(px0, py0, scale, scale), color);
                }
            }

            cursor_x = cursor_x.saturating_add(adv_x);
            if cursor_x >= self.size.width {
                break;
            }
        }
    }
}

pub fn dim_color(mut c: Color, factor: f32) -> Color {
    let f = factor.clamp(0.0, 1.0);
    for v in c.iter_mut().take(3) {
        *v = ((*v as f32) * f) as u8;
    }
    c
}

pub fn brighten_color(mut c: Color, amount: f32) -> Color {
    let t = amount.clamp(0.0, 1.0);
    for v in c.iter_mut().take(3) {
        let f = *v as f32;
        *v = (f + (255.0 - f) * t).round().clamp(0.0, 255.0) as u8;
    }
    c
}

// 3x5 block font. Rows are top-to-bottom, 3 bits per row.
fn glyph_rows(ch: char) -> [u8; GLYPH_H as usize] {
    let c = ch.to_ascii_uppercase();
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],

        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b111, 0b001, 0b001, 0b101, 0b010],
        'K' => [0b101, 0b110, 0b100, 0b110, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b101, 0b111, 0b111, 0b111, 0b101],
        'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'R' => [0b111, 0b101, 0b111, 0b110, 0b101],
        'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],

        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '(' => [0b010, 0b100, 0b100, 0b100, 0b010],
        ')' => [0b010, 0b001, 0b001, 0b001, 0b010],
        '!' => [0b010, 0b010, 0b010, 0b000, 0b010],
        '?' => [0b111, 0b001, 0b010, 0b000, 0b010],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '%' => [0b101, 0b001, 0b010, 0b100, 0b101],
        '\'' => [0b010, 0b010, 0b000, 0b000, 0b000],

        _ => [0b111, 0b001, 0b010, 0b000, 0b010], // '?'
    }
}
