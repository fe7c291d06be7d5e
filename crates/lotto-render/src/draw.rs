//! Raster primitives on top of imageproc.

use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_circle_mut, draw_filled_rect_mut},
    rect::Rect,
};

/// Axis-aligned box in canvas pixels, `x0,y0` inclusive and `x1,y1` exclusive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Bounds {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn center_x(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    pub fn inset(&self, by: f32) -> Self {
        Self::new(self.x0 + by, self.y0 + by, self.x1 - by, self.y1 - by)
    }
}

/// Linear interpolation between two colours, `t` in `[0, 1]`.
pub fn lerp_rgb(top: [u8; 3], bottom: [u8; 3], t: f32) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f32 * (1.0 - t) + b as f32 * t).round() as u8;
    Rgb([
        mix(top[0], bottom[0]),
        mix(top[1], bottom[1]),
        mix(top[2], bottom[2]),
    ])
}

/// Fill the image with a vertical gradient, one colour per scanline.
pub fn vertical_gradient(img: &mut RgbImage, top: [u8; 3], bottom: [u8; 3]) {
    let h = img.height();
    let denom = h.saturating_sub(1).max(1) as f32;
    for y in 0..h {
        let color = lerp_rgb(top, bottom, y as f32 / denom);
        for x in 0..img.width() {
            img.put_pixel(x, y, color);
        }
    }
}

/// Filled rectangle with circular corners of `radius`.
pub fn fill_rounded_rect(img: &mut RgbImage, b: Bounds, radius: f32, color: Rgb<u8>) {
    let x0 = b.x0.round() as i32;
    let y0 = b.y0.round() as i32;
    let x1 = b.x1.round() as i32;
    let y1 = b.y1.round() as i32;
    let w = x1 - x0;
    let h = y1 - y0;
    if w <= 0 || h <= 0 {
        return;
    }
    let r = (radius.round() as i32).clamp(0, w.min(h) / 2);

    if r == 0 {
        draw_filled_rect_mut(img, Rect::at(x0, y0).of_size(w as u32, h as u32), color);
        return;
    }

    if w > 2 * r {
        draw_filled_rect_mut(
            img,
            Rect::at(x0 + r, y0).of_size((w - 2 * r) as u32, h as u32),
            color,
        );
    }
    if h > 2 * r {
        draw_filled_rect_mut(
            img,
            Rect::at(x0, y0 + r).of_size(w as u32, (h - 2 * r) as u32),
            color,
        );
    }
    for (cx, cy) in [
        (x0 + r, y0 + r),
        (x1 - r - 1, y0 + r),
        (x0 + r, y1 - r - 1),
        (x1 - r - 1, y1 - r - 1),
    ] {
        draw_filled_circle_mut(img, (cx, cy), r, color);
    }
}
