//! PowerPoint (.pptx) parsing.
//!
//! Each slide lives at `ppt/slides/slideN.xml` (1-indexed); speaker notes,
//! when present, live at `ppt/notesSlides/notesSlideN.xml`. Both are flat
//! sequences of `<a:t>` text runs inside paragraph (`<a:p>`) groups — we
//! join runs with a space and paragraphs with a newline.

use super::{FormatMetadata, ParsedContent, SlideData};
use crate::error::{CoreError, CoreResult};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::io::{Cursor, Read};

pub fn parse(bytes: &[u8], original_path: &str) -> CoreResult<ParsedContent> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| CoreError::ParseError {
        path: original_path.into(),
        reason: format!("not a valid pptx zip: {e}"),
    })?;

    let slide_count = (1..).take_while(|i| {
        archive.by_name(&format!("ppt/slides/slide{i}.xml")).is_ok()
    }).count();

    let mut slides = Vec::with_capacity(slide_count);
    for i in 1..=slide_count {
        let slide_xml = read_entry(&mut archive, &format!("ppt/slides/slide{i}.xml"), original_path)?;
        let text = extract_text_runs(&slide_xml, original_path)?;

        let notes_path = format!("ppt/notesSlides/notesSlide{i}.xml");
        let notes = match read_entry(&mut archive, &notes_path, original_path) {
            Ok(xml) => {
                let raw_notes = extract_text_runs(&xml, original_path)?;
                if raw_notes.trim().is_empty() { None } else { Some(raw_notes) }
            }
            Err(_) => None,
        };

        slides.push(SlideData { index: i, text, notes });
    }

    let content = slides
        .iter()
        .map(|s| {
            let mut block = format!("[Slide {}]\n{}", s.index, s.text);
            if let Some(notes) = &s.notes {
                block.push_str("\n[Speaker Notes]\n");
                block.push_str(notes);
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(ParsedContent {
        content,
        format_tag: "powerpoint",
        original_path: original_path.to_string(),
        metadata: FormatMetadata::PowerPoint { slides },
    })
}

fn read_entry(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
    name: &str,
    original_path: &str,
) -> CoreResult<String> {
    let mut xml = String::new();
    archive
        .by_name(name)
        .map_err(|e| CoreError::ParseError { path: original_path.into(), reason: e.to_string() })?
        .read_to_string(&mut xml)
        .map_err(|e| CoreError::io(original_path, e))?;
    Ok(xml)
}

fn extract_text_runs(xml: &str, original_path: &str) -> CoreResult<String> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"a:p" => current.clear(),
            Ok(Event::End(e)) if e.name().as_ref() == b"a:p" => {
                if !current.trim().is_empty() {
                    paragraphs.push(current.trim_end().to_string());
                }
            }
            Ok(Event::Start(e)) if e.name().as_ref() == b"a:t" => in_text = true,
            Ok(Event::End(e)) if e.name().as_ref() == b"a:t" => in_text = false,
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
                    reason: format!("malformed slide xml: {e}"),
                })
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(paragraphs.join("\n"))
}

/// Re-derive a slide's content (optionally with notes) for extraction params.
pub fn extract_slide(
    slides: &[SlideData],
    slide: usize,
    include_notes: bool,
    params: &crate::chunker::ExtractionParams,
) -> CoreResult<String> {
    let data = slides.iter().find(|s| s.index == slide).ok_or_else(|| CoreError::ExtractionError {
        params: format!("{params:?}"),
        reason: format!("slide {slide} not found"),
    })?;

    let mut out = data.text.clone();
    if include_notes {
        if let Some(notes) = &data.notes {
            out.push_str("\n[Speaker Notes]\n");
            out.push_str(notes);
        }
    }
    Ok(out)
}
