//! lottery.co.th: abbreviated date (`2 ม.ค. 67`) followed by the numbers in
//! the order first, last two, last three ×2, front three ×2.

use std::sync::OnceLock;

use regex::Regex;

use lotto_core::{domain::LottoResult, lotto::normalize::normalize_date_th};

pub const NAME: &str = "lottery.co.th";
pub const URL: &str = "https://www.lottery.co.th/";

const PATTERN: &str = concat!(
    r"(?s)([0-9]{1,2}\s+[ก-๙]{1,2}\.[ก-๙]{1,2}\.\s+[0-9]{2})",
    r".{0,120}?",
    r"([0-9]{6})\s+([0-9]{2})\s+([0-9]{3})\s+([0-9]{3})\s+([0-9]{3})\s+([0-9]{3})",
);

fn re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| crate::page_regex(PATTERN))
}

pub fn parse(text: &str) -> Option<LottoResult> {
    let c = re().captures(text)?;
    Some(LottoResult::new(
        normalize_date_th(&c[1]),
        &c[2],
        &c[3],
        [&c[6], &c[7]],
        [&c[4], &c[5]],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::visible_text;

    #[test]
    fn parses_single_line_layout() {
        let r = parse("งวดวันที่ 2 ม.ค. 67 ผลสลาก 123456 99 111 222 333 444").unwrap();
        assert_eq!(r.date_th(), "2 มกราคม 2567");
        assert_eq!(r.first(), "123456");
        assert_eq!(r.last2(), "99");
        assert_eq!(r.last3(), &["111".to_string(), "222".to_string()]);
        assert_eq!(r.front3(), &["333".to_string(), "444".to_string()]);
    }

    #[test]
    fn parses_numbers_split_across_elements() {
        let html = r#"<div class="date">16 มี.ค. 68</div>
            <div class="prize"><span>รางวัลที่ 1</span><strong>071842</strong></div>
            <div><strong>05</strong></div>
            <div><strong>512</strong><strong>918</strong></div>
            <div><strong>364</strong><strong>770</strong></div>"#;
        let r = parse(&visible_text(html)).unwrap();
        assert_eq!(r.date_th(), "16 มีนาคม 2568");
        assert_eq!(r.first(), "071842");
        assert_eq!(r.last2(), "05");
        assert_eq!(r.last3(), &["512".to_string(), "918".to_string()]);
        assert_eq!(r.front3(), &["364".to_string(), "770".to_string()]);
    }

    #[test]
    fn gap_between_date_and_numbers_is_bounded() {
        let filler = "x".repeat(200);
        let text = format!("2 ม.ค. 67 {filler} 123456 99 111 222 333 444");
        assert!(parse(&text).is_none());
    }

    #[test]
    fn incomplete_page_does_not_match() {
        assert!(parse("2 ม.ค. 67 123456 99 111 222").is_none());
        assert!(parse("").is_none());
    }
}
