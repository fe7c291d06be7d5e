//! Result image composer.
//!
//! Renders a [`LottoResult`] into a fixed 1200×720 PNG: gradient background,
//! title, date badge and four cards. The composer only produces bytes; where
//! they are stored or served is the caller's business.

use std::{io::Cursor, path::Path};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use lotto_core::{domain::LottoResult, errors::Error, lotto::normalize::pad_digits, Result};

pub mod draw;
pub mod fonts;

use draw::{fill_rounded_rect, vertical_gradient, Bounds};
use fonts::{FontSet, SizedFont};

pub const WIDTH: u32 = 1200;
pub const HEIGHT: u32 = 720;

pub const GRADIENT_TOP: [u8; 3] = [245, 247, 250];
pub const GRADIENT_BOTTOM: [u8; 3] = [255, 210, 230];

const ACCENT: Rgb<u8> = Rgb([233, 30, 99]);
const TEXT: Rgb<u8> = Rgb([30, 30, 30]);
const CARD: Rgb<u8> = Rgb([255, 255, 255]);
const CARD_OUTLINE: Rgb<u8> = Rgb([240, 180, 210]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

const TITLE: &str = "ผลสลากกินแบ่งรัฐบาล";
const DATE_PREFIX: &str = "งวดประจำวันที่";

const CARD_RADIUS: f32 = 35.0;
const OUTLINE_WIDTH: f32 = 2.0;
const LABEL_BAND: f32 = 56.0;
const BADGE_PADDING: f32 = 40.0;
const BADGE_RADIUS: f32 = 25.0;
const BADGE_TOP: f32 = 130.0;
const BADGE_BOTTOM: f32 = 180.0;

/// Value shown for a missing six- or two-digit field.
pub const MISSING_VALUE: &str = "-";
/// Value shown for a missing member of a three-digit pair.
pub const MISSING_TRIPLE: &str = "---";

/// The four result cards, left to right, top to bottom.
pub fn card_bounds() -> [Bounds; 4] {
    let w = WIDTH as f32;
    [
        Bounds::new(70.0, 210.0, w * 0.68, 520.0),
        Bounds::new(w * 0.72, 210.0, w - 70.0, 520.0),
        Bounds::new(70.0, 540.0, w * 0.5 - 10.0, 690.0),
        Bounds::new(w * 0.5 + 10.0, 540.0, w - 70.0, 690.0),
    ]
}

/// Displayed text for a single-value field: zero-padded to `width`, or `-`.
pub fn single_value(value: &str, width: usize) -> String {
    let v = pad_digits(value, width);
    if v.is_empty() {
        MISSING_VALUE.to_string()
    } else {
        v
    }
}

/// Displayed text for a three-digit pair, missing members shown as `---`.
pub fn pair_value(pair: &[String; 2]) -> String {
    let show = |v: &String| {
        let v = pad_digits(v, 3);
        if v.is_empty() {
            MISSING_TRIPLE.to_string()
        } else {
            v
        }
    };
    format!("{}   {}", show(&pair[0]), show(&pair[1]))
}

/// Horizontal extent of the date badge around `text`.
pub fn badge_width(font: &SizedFont, text: &str) -> f32 {
    font.measure(text).0 + 2.0 * BADGE_PADDING
}

pub struct Composer {
    fonts: FontSet,
}

impl Composer {
    pub fn new(fonts: FontSet) -> Self {
        Self { fonts }
    }

    /// Composer using the bundled fonts in `dir` (fallback font if missing).
    pub fn from_font_dir(dir: &Path) -> Self {
        Self::new(FontSet::load(dir))
    }

    pub fn render(&self, result: &LottoResult) -> Result<Vec<u8>> {
        encode_png(self.compose(result))
    }

    /// "No result" image served when nothing could be fetched.
    pub fn render_placeholder(&self, message: &str) -> Result<Vec<u8>> {
        encode_png(self.compose_placeholder(message))
    }

    pub fn compose(&self, result: &LottoResult) -> RgbImage {
        let mut img = self.background();

        let date = if result.date_th().trim().is_empty() {
            MISSING_VALUE
        } else {
            result.date_th().trim()
        };
        self.date_badge(&mut img, &format!("{DATE_PREFIX} {date}"));

        let [first_box, last2_box, front3_box, last3_box] = card_bounds();
        self.card(
            &mut img,
            first_box,
            "รางวัลที่ 1",
            &single_value(result.first(), 6),
            &self.fonts.huge,
        );
        self.card(
            &mut img,
            last2_box,
            "เลขท้าย 2 ตัว",
            &single_value(result.last2(), 2),
            &self.fonts.huge,
        );
        self.card(
            &mut img,
            front3_box,
            "เลขหน้า 3 ตัว",
            &pair_value(result.front3()),
            &self.fonts.medium,
        );
        self.card(
            &mut img,
            last3_box,
            "เลขท้าย 3 ตัว",
            &pair_value(result.last3()),
            &self.fonts.medium,
        );

        img
    }

    pub fn compose_placeholder(&self, message: &str) -> RgbImage {
        let mut img = self.background();
        let w = WIDTH as f32;
        let card = Bounds::new(70.0, 210.0, w - 70.0, 520.0);
        self.card(&mut img, card, message, MISSING_VALUE, &self.fonts.huge);
        img
    }

    fn background(&self) -> RgbImage {
        let mut img = RgbImage::new(WIDTH, HEIGHT);
        vertical_gradient(&mut img, GRADIENT_TOP, GRADIENT_BOTTOM);
        self.fonts
            .title
            .draw_centered(&mut img, TITLE, WIDTH as f32 / 2.0, 80.0, ACCENT);
        img
    }

    fn date_badge(&self, img: &mut RgbImage, text: &str) {
        let cx = WIDTH as f32 / 2.0;
        let half = badge_width(&self.fonts.date, text) / 2.0;
        let badge = Bounds::new(cx - half, BADGE_TOP, cx + half, BADGE_BOTTOM);
        fill_rounded_rect(img, badge, BADGE_RADIUS, ACCENT);
        self.fonts
            .date
            .draw_centered(img, text, cx, (BADGE_TOP + BADGE_BOTTOM) / 2.0, WHITE);
    }

    /// Outlined white card with an accent label band and a centred value.
    fn card(&self, img: &mut RgbImage, b: Bounds, label: &str, value: &str, value_font: &SizedFont) {
        fill_rounded_rect(img, b, CARD_RADIUS, CARD_OUTLINE);
        let inner = b.inset(OUTLINE_WIDTH);
        let radius = CARD_RADIUS - OUTLINE_WIDTH;
        fill_rounded_rect(img, inner, radius, CARD);

        // Band: rounded top corners, square bottom edge.
        let band_bottom = inner.y0 + LABEL_BAND;
        fill_rounded_rect(
            img,
            Bounds::new(inner.x0, inner.y0, inner.x1, band_bottom + radius),
            radius,
            ACCENT,
        );
        fill_rounded_rect(
            img,
            Bounds::new(inner.x0, band_bottom, inner.x1, band_bottom + radius),
            0.0,
            CARD,
        );

        self.fonts.label.draw_centered(
            img,
            label,
            inner.center_x(),
            inner.y0 + LABEL_BAND / 2.0,
            WHITE,
        );
        value_font.draw_centered(
            img,
            value,
            inner.center_x(),
            (band_bottom + inner.y1) / 2.0,
            TEXT,
        );
    }
}

fn encode_png(img: RgbImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| Error::Render(format!("png encode failed: {e}")))?;
    Ok(buf)
}
