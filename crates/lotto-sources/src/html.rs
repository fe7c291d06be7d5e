use scraper::{Html, Node};

/// Elements whose text never shows up on the page.
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Visible text of an HTML document: one trimmed text node per line, empty
/// nodes dropped.
pub fn visible_text(markup: &str) -> String {
    let doc = Html::parse_document(markup);
    let mut lines: Vec<&str> = Vec::new();

    for node in doc.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .map(|el| HIDDEN_ELEMENTS.contains(&el.name()))
                .unwrap_or(false)
        });
        if hidden {
            continue;
        }
        let t = text.trim();
        if !t.is_empty() {
            lines.push(t);
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_block_boundaries_and_drops_scripts() {
        let html = r#"<html><head><title>ผลหวย</title><style>p{color:red}</style></head>
            <body><div>งวด <b>2 ม.ค. 67</b></div>
            <script>var first = "999999";</script>
            <p>  123456  </p><p></p><span>&amp; more</span></body></html>"#;
        assert_eq!(visible_text(html), "ผลหวย\nงวด\n2 ม.ค. 67\n123456\n& more");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(visible_text("just text"), "just text");
        assert_eq!(visible_text(""), "");
    }
}
