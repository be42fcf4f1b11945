//! First worksheet of a spreadsheet rendered as plain text rows in a PDF.

use super::{ConvertError, ConvertResult};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use lopdf::{
    Document, Object, ObjectId, Stream,
    content::{Content, Operation},
    dictionary,
};
use std::io::Cursor;

/// A4 in points.
const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 50.0;
const LINE_STEP: f32 = 15.0;
const FONT_SIZE: i64 = 10;
const MAX_ROW_CHARS: usize = 100;

/// Parse the workbook in `bytes` and lay out its first sheet.
pub fn first_sheet_to_pdf(bytes: &[u8]) -> ConvertResult<Vec<u8>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|err| ConvertError::Spreadsheet(err.to_string()))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ConvertError::Spreadsheet("workbook has no sheets".into()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|err| ConvertError::Spreadsheet(err.to_string()))?;

    let rows: Vec<String> = range.rows().map(row_text).collect();
    render_rows(&rows)
}

/// Cells joined with `" | "`, cut to the first 100 characters.
fn row_text(cells: &[Data]) -> String {
    let joined = cells
        .iter()
        .map(|cell| cell.to_string())
        .collect::<Vec<_>>()
        .join(" | ");
    joined.chars().take(MAX_ROW_CHARS).collect()
}

/// Draw one row per line, starting a new page whenever the cursor passes the
/// bottom margin. Always yields at least one page.
pub(super) fn render_rows(rows: &[String]) -> ConvertResult<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut pages: Vec<Vec<Operation>> = vec![Vec::new()];
    let mut y = PAGE_HEIGHT - MARGIN;
    for row in rows {
        if y < MARGIN {
            pages.push(Vec::new());
            y = PAGE_HEIGHT - MARGIN;
        }
        if let Some(ops) = pages.last_mut() {
            ops.extend(text_line(row, y));
        }
        y -= LINE_STEP;
    }

    let mut kids = Vec::with_capacity(pages.len());
    for operations in pages {
        let page_id = add_page(&mut doc, pages_id, resources_id, operations)?;
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

fn text_line(text: &str, y: f32) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), Object::Integer(FONT_SIZE)]),
        Operation::new("Td", vec![Object::Real(MARGIN), Object::Real(y)]),
        Operation::new("Tj", vec![Object::string_literal(win_ansi(text))]),
        Operation::new("ET", vec![]),
    ]
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    resources_id: ObjectId,
    operations: Vec<Operation>,
) -> ConvertResult<ObjectId> {
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(PAGE_WIDTH),
            Object::Real(PAGE_HEIGHT),
        ],
        "Resources" => resources_id,
        "Contents" => content_id,
    }))
}

/// The standard fonts only cover Latin-1 here; anything else becomes `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u32::from(c) {
            code @ 0x20..=0x7E | code @ 0xA0..=0xFF => code as u8,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::{fixtures::page_count, ooxml::write_xlsx, text::extract_text};
    use super::*;

    #[test]
    fn rows_are_pipe_joined_and_truncated() {
        let cells = vec![
            Data::String("Name".into()),
            Data::Float(2.5),
            Data::Empty,
            Data::String("x".repeat(200)),
        ];
        let text = row_text(&cells);
        assert!(text.starts_with("Name | 2.5 |  | xxx"));
        assert_eq!(text.chars().count(), MAX_ROW_CHARS);
    }

    #[test]
    fn non_latin_text_is_replaced() {
        assert_eq!(win_ansi("café ✓"), b"caf\xe9 ?".to_vec());
    }

    #[test]
    fn paginates_by_vertical_position() {
        // 50 rows fit on a page: y runs from 791.89 down to 56.89.
        let rows: Vec<String> = (0..120).map(|i| format!("row {}", i)).collect();
        let pdf = render_rows(&rows).unwrap();
        assert_eq!(page_count(&pdf), 3);
        assert_eq!(page_count(&render_rows(&rows[..50]).unwrap()), 1);
        assert_eq!(page_count(&render_rows(&rows[..51]).unwrap()), 2);
    }

    #[test]
    fn empty_sheet_still_has_a_page() {
        assert_eq!(page_count(&render_rows(&[]).unwrap()), 1);
    }

    #[test]
    fn converts_first_sheet_of_a_workbook() {
        let rows = vec![
            vec!["Item".to_string(), "Price".to_string()],
            vec!["Widget".to_string(), "9".to_string()],
        ];
        let xlsx = write_xlsx("Prices", &rows).unwrap();
        let pdf = first_sheet_to_pdf(&xlsx).unwrap();
        assert_eq!(page_count(&pdf), 1);

        let text = extract_text(&pdf).unwrap();
        assert!(text.contains("Item | Price"));
        assert!(text.contains("Widget | 9"));
    }

    #[test]
    fn rejects_non_spreadsheets() {
        assert!(matches!(
            first_sheet_to_pdf(b"plain text"),
            Err(ConvertError::Spreadsheet(_))
        ));
    }
}
