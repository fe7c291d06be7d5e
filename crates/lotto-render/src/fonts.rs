//! Fonts: a bundled TrueType face when available, otherwise a built-in 5×7
//! bitmap face scaled to the requested size.

use std::{fs, path::Path, sync::Arc};

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use tracing::warn;

pub const BOLD_FONT_FILE: &str = "Sarabun-Bold.ttf";

/// Pixel sizes used by the layout.
pub const TITLE_PX: f32 = 52.0;
pub const DATE_PX: f32 = 30.0;
pub const LABEL_PX: f32 = 28.0;
pub const HUGE_PX: f32 = 120.0;
pub const MEDIUM_PX: f32 = 56.0;

#[derive(Clone)]
enum Face {
    Vector(Arc<FontVec>),
    Bitmap,
}

/// A face at one pixel size.
#[derive(Clone)]
pub struct SizedFont {
    face: Face,
    px: f32,
}

impl SizedFont {
    /// Load `path` at `px`, falling back to the bitmap face on any failure.
    pub fn load(path: &Path, px: f32) -> Self {
        match read_face(path) {
            Some(font) => Self::vector(font, px),
            None => Self::fallback(px),
        }
    }

    pub fn fallback(px: f32) -> Self {
        Self {
            face: Face::Bitmap,
            px,
        }
    }

    fn vector(font: Arc<FontVec>, px: f32) -> Self {
        Self {
            face: Face::Vector(font),
            px,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.face, Face::Bitmap)
    }

    pub fn px(&self) -> f32 {
        self.px
    }

    /// Width and height of `text` as drawn by [`draw_centered`](Self::draw_centered).
    pub fn measure(&self, text: &str) -> (f32, f32) {
        match &self.face {
            Face::Vector(font) => {
                let (w, h) = text_size(PxScale::from(self.px), &**font, text);
                (w as f32, h as f32)
            }
            Face::Bitmap => bitmap::measure(text, self.px),
        }
    }

    /// Draw `text` with its bounding box centred on `(cx, cy)`.
    pub fn draw_centered(&self, img: &mut RgbImage, text: &str, cx: f32, cy: f32, color: Rgb<u8>) {
        match &self.face {
            Face::Vector(font) => {
                let (w, h) = self.measure(text);
                let x = (cx - w / 2.0).round() as i32;
                let y = (cy - h / 2.0).round() as i32;
                draw_text_mut(img, color, x, y, PxScale::from(self.px), &**font, text);
            }
            Face::Bitmap => bitmap::draw_centered(img, text, self.px, cx, cy, color),
        }
    }
}

fn read_face(path: &Path) -> Option<Arc<FontVec>> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "font not readable; using fallback font");
            return None;
        }
    };
    match FontVec::try_from_vec(bytes) {
        Ok(font) => Some(Arc::new(font)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "font file invalid; using fallback font");
            None
        }
    }
}

/// Every face the layout needs.
#[derive(Clone)]
pub struct FontSet {
    pub title: SizedFont,
    pub date: SizedFont,
    pub label: SizedFont,
    pub huge: SizedFont,
    pub medium: SizedFont,
}

impl FontSet {
    /// Load the bold face from `dir` once and derive every size from it.
    pub fn load(dir: &Path) -> Self {
        match read_face(&dir.join(BOLD_FONT_FILE)) {
            Some(font) => Self {
                title: SizedFont::vector(font.clone(), TITLE_PX),
                date: SizedFont::vector(font.clone(), DATE_PX),
                label: SizedFont::vector(font.clone(), LABEL_PX),
                huge: SizedFont::vector(font.clone(), HUGE_PX),
                medium: SizedFont::vector(font, MEDIUM_PX),
            },
            None => Self::fallback(),
        }
    }

    pub fn fallback() -> Self {
        Self {
            title: SizedFont::fallback(TITLE_PX),
            date: SizedFont::fallback(DATE_PX),
            label: SizedFont::fallback(LABEL_PX),
            huge: SizedFont::fallback(HUGE_PX),
            medium: SizedFont::fallback(MEDIUM_PX),
        }
    }
}

mod bitmap {
    use image::{Rgb, RgbImage};
    use imageproc::{drawing::draw_filled_rect_mut, rect::Rect};

    const COLS: u32 = 5;
    const ROWS: u32 = 7;
    /// Columns per character including one column of spacing.
    const ADVANCE: u32 = COLS + 1;

    /// Rows top to bottom, bit 4 is the leftmost column.
    fn glyph(c: char) -> [u8; 7] {
        match c {
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
            '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
            ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
            '/' => [0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x00],
            ' ' => [0x00; 7],
            _ => [0x1F, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1F],
        }
    }

    /// Edge length of one dot for a requested pixel size.
    pub(super) fn dot(px: f32) -> u32 {
        ((px / (ROWS + 1) as f32).round() as u32).max(1)
    }

    fn visible(text: &str) -> impl Iterator<Item = char> + '_ {
        text.chars().filter(|c| !c.is_control())
    }

    pub(super) fn measure(text: &str, px: f32) -> (f32, f32) {
        let n = visible(text).count() as u32;
        let d = dot(px);
        let width = if n == 0 { 0 } else { (n * ADVANCE - 1) * d };
        (width as f32, (ROWS * d) as f32)
    }

    pub(super) fn draw_centered(
        img: &mut RgbImage,
        text: &str,
        px: f32,
        cx: f32,
        cy: f32,
        color: Rgb<u8>,
    ) {
        let d = dot(px);
        let (w, h) = measure(text, px);
        let x0 = (cx - w / 2.0).round() as i32;
        let y0 = (cy - h / 2.0).round() as i32;

        for (i, c) in visible(text).enumerate() {
            let gx = x0 + (i as u32 * ADVANCE * d) as i32;
            for (row, bits) in glyph(c).iter().enumerate() {
                for col in 0..COLS {
                    if bits & (1 << (COLS - 1 - col)) == 0 {
                        continue;
                    }
                    let rect = Rect::at(gx + (col * d) as i32, y0 + (row as u32 * d) as i32)
                        .of_size(d, d);
                    draw_filled_rect_mut(img, rect, color);
                }
            }
        }
    }
}
