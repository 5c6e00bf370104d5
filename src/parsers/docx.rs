//! Word (.docx) parsing.
//!
//! A `.docx` is a zip archive; `word/document.xml` holds the body as a flat
//! sequence of `<w:p>` paragraphs, each containing `<w:t>` text runs. We
//! don't reconstruct formatting — only the paragraph boundaries the chunker
//! and `ExtractionParams::Word` need.

use super::{FormatMetadata, ParsedContent};
use crate::error::{CoreError, CoreResult};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::io::{Cursor, Read};

pub fn parse(bytes: &[u8], original_path: &str) -> CoreResult<ParsedContent> {
    let paragraphs = extract_paragraphs(bytes, original_path)?;
    let content = paragraphs.join("\n");

    Ok(ParsedContent {
        content,
        format_tag: "word",
        original_path: original_path.to_string(),
        metadata: FormatMetadata::Word { paragraphs },
    })
}

fn extract_paragraphs(bytes: &[u8], original_path: &str) -> CoreResult<Vec<String>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| CoreError::ParseError {
        path: original_path.into(),
        reason: format!("not a valid docx zip: {e}"),
    })?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| CoreError::ParseError {
            path: original_path.into(),
            reason: format!("missing word/document.xml: {e}"),
        })?
        .read_to_string(&mut xml)
        .map_err(|e| CoreError::io(original_path, e))?;

    let mut reader = Reader::from_str(&xml);
    reader.config_mut().trim_text(false);

    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:p" => {
                current.clear();
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"w:p" => {
                paragraphs.push(current.trim_end().to_string());
            }
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => {
                in_text = true;
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"w:t" => {
                in_text = false;
            }
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| CoreError::ParseError {
                    path: original_path.into(),
                    reason: e.to_string(),
                })?;
                current.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(CoreError::ParseError {
                    path: original_path.into(),
                    reason: format!("malformed document.xml: {e}"),
                })
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}
