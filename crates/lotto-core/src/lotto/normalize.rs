//! Date/number normalization shared by all source adapters.

use std::sync::OnceLock;

use regex::Regex;

const THAI_MONTHS_ABBR: [(&str, &str); 12] = [
    ("ม.ค.", "มกราคม"),
    ("ก.พ.", "กุมภาพันธ์"),
    ("มี.ค.", "มีนาคม"),
    ("เม.ย.", "เมษายน"),
    ("พ.ค.", "พฤษภาคม"),
    ("มิ.ย.", "มิถุนายน"),
    ("ก.ค.", "กรกฎาคม"),
    ("ส.ค.", "สิงหาคม"),
    ("ก.ย.", "กันยายน"),
    ("ต.ค.", "ตุลาคม"),
    ("พ.ย.", "พฤศจิกายน"),
    ("ธ.ค.", "ธันวาคม"),
];

/// Abbreviated Thai date, e.g. `2 ม.ค. 67`.
pub const SHORT_DATE_PATTERN: &str = r"([0-9]{1,2})\s+([ก-๙]{1,2}\.[ก-๙]{1,2}\.)\s+([0-9]{2})";

fn short_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SHORT_DATE_PATTERN).expect("valid short date regex"))
}

/// Full month name for an abbreviation; unknown abbreviations pass through.
pub fn month_full_name(abbr: &str) -> &str {
    THAI_MONTHS_ABBR
        .iter()
        .find(|(a, _)| *a == abbr)
        .map(|(_, full)| *full)
        .unwrap_or(abbr)
}

/// Expand `2 ม.ค. 67` into `2 มกราคม 2567`.
///
/// The year is read as Buddhist era 25xx. Input that does not look like the
/// abbreviated form is returned trimmed but otherwise unchanged.
pub fn normalize_date_th(raw: &str) -> String {
    let s = raw.trim();
    let Some(caps) = short_date_re().captures(s) else {
        return s.to_string();
    };

    let (Ok(day), Ok(yy)) = (caps[1].parse::<u32>(), caps[3].parse::<u32>()) else {
        return s.to_string();
    };
    let month = month_full_name(&caps[2]);
    format!("{day} {month} {}", 2500 + yy)
}

/// Left-pad a numeric token with zeros to `width`.
///
/// Empty or non-numeric values are returned as-is so placeholders survive.
pub fn pad_digits(value: &str, width: usize) -> String {
    let v = value.trim();
    if v.is_empty() || !v.chars().all(|c| c.is_ascii_digit()) {
        return v.to_string();
    }
    format!("{v:0>width$}")
}
