//! news.sanook.com lotto checker: spelled-out date, then labelled prize blocks.

use std::sync::OnceLock;

use regex::Regex;

use lotto_core::{domain::LottoResult, lotto::normalize::normalize_date_th};

pub const NAME: &str = "sanook-icheck";
pub const URL: &str = "https://news.sanook.com/lotto/icheck/";

const PATTERN: &str = concat!(
    r"(?s)([0-9]{1,2}\s+\S+\s+[0-9]{4})",
    r".{0,1200}?รางวัลที่\s*1\s+([0-9]{6})",
    r".{0,800}?เลขหน้า\s*3\s*ตัว\s+([0-9]{3})\s+([0-9]{3})",
    r".{0,800}?เลขท้าย\s*3\s*ตัว\s+([0-9]{3})\s+([0-9]{3})",
    r".{0,800}?เลขท้าย\s*2\s*ตัว\s+([0-9]{2})",
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
        &c[7],
        [&c[3], &c[4]],
        [&c[5], &c[6]],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::visible_text;

    const PAGE: &str = r#"<html><body>
        <h1>ตรวจหวย</h1>
        <div class="date">ผลสลากกินแบ่งรัฐบาล งวดวันที่</div><div>1 ธันวาคม 2567</div>
        <section>
          <h2>รางวัลที่ 1</h2><p>097863</p>
          <h3>เลขหน้า 3 ตัว</h3><p>264</p><p>716</p>
          <h3>เลขท้าย 3 ตัว</h3><p>350</p><p>807</p>
          <h3>เลขท้าย 2 ตัว</h3><p>32</p>
        </section>
        <script>var ad = "รางวัลที่ 1 000000";</script>
    </body></html>"#;

    #[test]
    fn parses_labelled_blocks() {
        let r = parse(&visible_text(PAGE)).unwrap();
        assert_eq!(r.date_th(), "1 ธันวาคม 2567");
        assert_eq!(r.first(), "097863");
        assert_eq!(r.front3(), &["264".to_string(), "716".to_string()]);
        assert_eq!(r.last3(), &["350".to_string(), "807".to_string()]);
        assert_eq!(r.last2(), "32");
    }

    #[test]
    fn missing_label_does_not_match() {
        let text = visible_text(&PAGE.replace("เลขท้าย 2 ตัว", "อื่น ๆ"));
        assert!(parse(&text).is_none());
    }
}
