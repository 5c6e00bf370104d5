//! Excel (.xlsx) and CSV parsing.
//!
//! `.xlsx` is a zip archive: `xl/workbook.xml` lists sheets in order,
//! `xl/sharedStrings.xml` holds the deduplicated string table referenced by
//! `t="s"` cells, and `xl/worksheets/sheetN.xml` (1-indexed in workbook
//! order) holds each sheet's rows. `.csv` is parsed directly into a single
//! sheet named `"Sheet1"` so both formats share one `SheetData`/
//! `ExtractionParams::Excel` representation.

use super::{FormatMetadata, ParsedContent, Row, SheetData};
use crate::error::{CoreError, CoreResult};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::io::{Cursor, Read};

pub fn parse(bytes: &[u8], original_path: &str) -> CoreResult<ParsedContent> {
    let sheets = extract_sheets(bytes, original_path)?;
    let content = sheets
        .iter()
        .map(|s| format!("# {}\n{}", s.name, rows_to_csv(&s.rows)))
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(ParsedContent {
        content,
        format_tag: "excel",
        original_path: original_path.to_string(),
        metadata: FormatMetadata::Excel { sheets },
    })
}

pub fn parse_csv(bytes: &[u8], original_path: &str) -> CoreResult<ParsedContent> {
    let mut reader = csv::ReaderBuilder::new().has_headers(false).from_reader(bytes);
    let mut rows: Vec<Row> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| CoreError::ParseError {
            path: original_path.into(),
            reason: e.to_string(),
        })?;
        rows.push(record.iter().map(|f| f.to_string()).collect());
    }
    let sheets = vec![SheetData { name: "Sheet1".to_string(), rows: rows.clone() }];
    let content = rows_to_csv(&rows);

    Ok(ParsedContent {
        content,
        format_tag: "excel",
        original_path: original_path.to_string(),
        metadata: FormatMetadata::Excel { sheets },
    })
}

fn rows_to_csv(rows: &[Row]) -> String {
    rows.iter().map(|r| r.join(",")).collect::<Vec<_>>().join("\n")
}

fn extract_sheets(bytes: &[u8], original_path: &str) -> CoreResult<Vec<SheetData>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| CoreError::ParseError {
        path: original_path.into(),
        reason: format!("not a valid xlsx zip: {e}"),
    })?;

    let sheet_names = read_sheet_names(&mut archive, original_path)?;
    let shared_strings = read_shared_strings(&mut archive, original_path)?;

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for (idx, name) in sheet_names.iter().enumerate() {
        let entry_name = format!("xl/worksheets/sheet{}.xml", idx + 1);
        let mut xml = String::new();
        match archive.by_name(&entry_name) {
            Ok(mut f) => {
                f.read_to_string(&mut xml).map_err(|e| CoreError::io(original_path, e))?;
            }
            Err(_) => continue,
        }
        let rows = parse_sheet_xml(&xml, &shared_strings, original_path)?;
        sheets.push(SheetData { name: name.clone(), rows });
    }
    Ok(sheets)
}

fn read_sheet_names(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
    original_path: &str,
) -> CoreResult<Vec<String>> {
    let mut xml = String::new();
    archive
        .by_name("xl/workbook.xml")
        .map_err(|e| CoreError::ParseError {
            path: original_path.into(),
            reason: format!("missing xl/workbook.xml: {e}"),
        })?
        .read_to_string(&mut xml)
        .map_err(|e| CoreError::io(original_path, e))?;

    let mut reader = Reader::from_str(&xml);
    let mut names = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"sheet" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"name" {
                        names.push(String::from_utf8_lossy(&attr.value).to_string());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(CoreError::ParseError {
                    path: original_path.into(),
                    reason: format!("malformed workbook.xml: {e}"),
                })
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(names)
}

fn read_shared_strings(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
    original_path: &str,
) -> CoreResult<Vec<String>> {
    let mut xml = String::new();
    match archive.by_name("xl/sharedStrings.xml") {
        Ok(mut f) => f.read_to_string(&mut xml).map_err(|e| CoreError::io(original_path, e))?,
        Err(_) => return Ok(Vec::new()),
    };

    let mut reader = Reader::from_str(&xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"si" => current.clear(),
            Ok(Event::End(e)) if e.name().as_ref() == b"si" => strings.push(current.clone()),
            Ok(Event::Start(e)) if e.name().as_ref() == b"t" => in_text = true,
            Ok(Event::End(e)) if e.name().as_ref() == b"t" => in_text = false,
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
                    reason: format!("malformed sharedStrings.xml: {e}"),
                })
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

fn parse_sheet_xml(
    xml: &str,
    shared_strings: &[String],
    original_path: &str,
) -> CoreResult<Vec<Row>> {
    let mut reader = Reader::from_str(xml);
    let mut rows: Vec<Row> = Vec::new();
    let mut current_row: Vec<(usize, String)> = Vec::new();
    let mut cell_type: Option<String> = None;
    let mut cell_col: usize = 0;
    let mut cell_text = String::new();
    let mut in_value = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"row" => {
                current_row.clear();
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"row" => {
                let width = current_row.iter().map(|(c, _)| *c + 1).max().unwrap_or(0);
                let mut row = vec![String::new(); width];
                for (col, value) in current_row.drain(..) {
                    row[col] = value;
                }
                rows.push(row);
            }
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"c" => {
                cell_type = None;
                cell_col = 0;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"t" => cell_type = Some(String::from_utf8_lossy(&attr.value).to_string()),
                        b"r" => {
                            let r = String::from_utf8_lossy(&attr.value).to_string();
                            cell_col = column_ref_to_index(&r);
                        }
                        _ => {}
                    }
                }
            }
            Ok(Event::Start(e)) if e.name().as_ref() == b"v" || e.name().as_ref() == b"t" => {
                in_value = true;
                cell_text.clear();
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"v" || e.name().as_ref() == b"t" => {
                in_value = false;
                let resolved = if cell_type.as_deref() == Some("s") {
                    cell_text
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| shared_strings.get(i).cloned())
                        .unwrap_or_default()
                } else {
                    cell_text.clone()
                };
                current_row.push((cell_col, resolved));
            }
            Ok(Event::Text(t)) if in_value => {
                let text = t.unescape().map_err(|e| CoreError::ParseError {
                    path: original_path.into(),
                    reason: e.to_string(),
                })?;
                cell_text.push_str(&text);
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"c" => {
                // No-op: cell closed, value already pushed on </v> or </t>, or
                // the cell had no value element at all (empty cell).
                let _ = e;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(CoreError::ParseError {
                    path: original_path.into(),
                    reason: format!("malformed sheet xml: {e}"),
                })
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}

/// Convert a cell reference like `"C7"` to a zero-based column index.
fn column_ref_to_index(cell_ref: &str) -> usize {
    let letters: String = cell_ref.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    letter_to_index(&letters)
}

/// Convert an A1-style column letter (e.g. `"A"`, `"AA"`) to a zero-based index.
pub fn letter_to_index(letters: &str) -> usize {
    letters
        .chars()
        .fold(0usize, |acc, c| acc * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1))
        .saturating_sub(1)
}

/// Convert a zero-based column index to its A1-style letter.
pub fn index_to_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// Slice `sheets` down to the requested 1-based row range and A1-style
/// column range, rendering the result as comma-separated rows joined by
/// newlines.
pub fn extract_range(
    sheets: &[SheetData],
    sheet_name: &str,
    start_row: usize,
    end_row: usize,
    start_col: &str,
    end_col: &str,
    params: &crate::chunker::ExtractionParams,
) -> CoreResult<String> {
    let sheet = sheets.iter().find(|s| s.name == sheet_name).ok_or_else(|| {
        CoreError::ExtractionError {
            params: format!("{params:?}"),
            reason: format!("sheet '{sheet_name}' not found"),
        }
    })?;

    if start_row == 0 || end_row < start_row || end_row > sheet.rows.len() {
        return Err(CoreError::ExtractionError {
            params: format!("{params:?}"),
            reason: format!(
                "row range {start_row}..={end_row} out of bounds (len={})",
                sheet.rows.len()
            ),
        });
    }

    let start_idx = letter_to_index(start_col);
    let end_idx = letter_to_index(end_col);
    if end_idx < start_idx {
        return Err(CoreError::ExtractionError {
            params: format!("{params:?}"),
            reason: format!("column range {start_col}..={end_col} is inverted"),
        });
    }

    let mut out_rows = Vec::with_capacity(end_row - start_row + 1);
    for row in &sheet.rows[start_row - 1..end_row] {
        let mut cells = Vec::with_capacity(end_idx - start_idx + 1);
        for col in start_idx..=end_idx {
            cells.push(row.get(col).cloned().unwrap_or_default());
        }
        out_rows.push(cells.join(","));
    }
    Ok(out_rows.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letter_round_trip() {
        assert_eq!(letter_to_index("A"), 0);
        assert_eq!(letter_to_index("B"), 1);
        assert_eq!(letter_to_index("D"), 3);
        assert_eq!(index_to_letter(0), "A");
        assert_eq!(index_to_letter(3), "D");
        assert_eq!(index_to_letter(26), "AA");
    }

    #[test]
    fn extract_range_reproduces_header_and_selected_rows() {
        let sheets = vec![SheetData {
            name: "Sales Data".to_string(),
            rows: vec![
                vec!["Product".into(), "Q1".into(), "Q2".into(), "Q3".into(), "Q4".into()],
                vec!["Apples".into(), "100".into(), "150".into(), "200".into(), "180".into()],
                vec!["Bananas".into(), "80".into(), "90".into(), "110".into(), "95".into()],
            ],
        }];
        let params = crate::chunker::ExtractionParams::Excel {
            sheet: "Sales Data".to_string(),
            start_row: 2,
            end_row: 3,
            start_col: "B".to_string(),
            end_col: "D".to_string(),
        };
        let out = extract_range(&sheets, "Sales Data", 2, 3, "B", "D", &params).unwrap();
        assert_eq!(out, "100,150,200\n80,90,110");
    }
}
