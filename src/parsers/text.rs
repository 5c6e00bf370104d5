//! Plain text and Markdown parsing.
//!
//! Normalization policy: CRLF is normalized to LF and trailing whitespace
//! is stripped from each line.
//! Round-trip extraction is therefore exact up to that normalization, never
//! byte-identical to a file with Windows line endings.

use super::{FormatMetadata, ParsedContent};
use crate::error::CoreResult;

pub fn parse(bytes: &[u8], original_path: &str, format_tag: &'static str) -> CoreResult<ParsedContent> {
    let raw = String::from_utf8_lossy(bytes);
    let lines: Vec<String> =
        raw.replace("\r\n", "\n").lines().map(|l| l.trim_end().to_string()).collect();
    let content = lines.join("\n");

    Ok(ParsedContent {
        content,
        format_tag,
        original_path: original_path.to_string(),
        metadata: FormatMetadata::Lines { lines },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_crlf_and_trailing_whitespace() {
        let parsed = parse(b"line one  \r\nline two\r\n", "a.txt", "text").unwrap();
        assert_eq!(parsed.content, "line one\nline two");
    }
}
