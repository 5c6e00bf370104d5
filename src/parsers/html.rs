//! HTML parsing: strip non-content elements with `scraper`, then render to
//! plain text with `html2text` so headings/paragraphs/lists collapse to the
//! same line-oriented shape the chunker already knows how to split.

use super::{FormatMetadata, ParsedContent};
use crate::error::{CoreError, CoreResult};
use scraper::{Html, Selector};

const RENDER_WIDTH: usize = 120;

pub fn parse(bytes: &[u8], original_path: &str) -> CoreResult<ParsedContent> {
    let raw = String::from_utf8_lossy(bytes);
    let document = Html::parse_document(&raw);

    let noisy = Selector::parse("script, style, noscript").expect("static selector is valid");
    let noisy_ids: std::collections::HashSet<_> =
        document.select(&noisy).map(|el| el.id()).collect();

    // scraper's tree is immutable; re-serialize the body minus noisy nodes by
    // rendering only the elements that survive the filter.
    let body_selector = Selector::parse("body").expect("static selector is valid");
    let mut filtered_html = String::new();
    if let Some(body) = document.select(&body_selector).next() {
        for node in body.children() {
            if let Some(el) = scraper::ElementRef::wrap(node) {
                if noisy_ids.contains(&el.id()) {
                    continue;
                }
                filtered_html.push_str(&el.html());
            } else if let Some(text) = node.value().as_text() {
                filtered_html.push_str(text);
            }
        }
    } else {
        filtered_html = raw.to_string();
    }

    let rendered = html2text::from_read(filtered_html.as_bytes(), RENDER_WIDTH)
        .map_err(|e| CoreError::ParseError { path: original_path.into(), reason: e.to_string() })?;

    let lines: Vec<String> = rendered.lines().map(|l| l.trim_end().to_string()).collect();
    let content = lines.join("\n");

    Ok(ParsedContent {
        content,
        format_tag: "html",
        original_path: original_path.to_string(),
        metadata: FormatMetadata::Lines { lines },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_and_renders_text() {
        let html = b"<html><body><h1>Title</h1><script>evil()</script><p>Body text.</p></body></html>";
        let parsed = parse(html, "a.html").unwrap();
        assert!(parsed.content.contains("Title"));
        assert!(parsed.content.contains("Body text."));
        assert!(!parsed.content.contains("evil()"));
    }
}
