//! Minimal Office Open XML packages (DOCX, XLSX) written with `zip`.
//!
//! Only the parts a reader needs to open the file are emitted: content types,
//! the package relationships and the main document part(s).

use super::ConvertResult;
use std::io::{Cursor, Write};
use zip::{CompressionMethod, ZipWriter, write::FileOptions};

pub(super) const XML_HEADER: &str =
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

/// Zip up `(path, contents)` parts in order.
pub(super) fn package(parts: &[(String, String)]) -> ConvertResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (path, contents) in parts {
        zip.start_file(path.as_str(), options)?;
        zip.write_all(contents.as_bytes())?;
    }
    Ok(zip.finish()?.into_inner())
}

/// Escape text for element content and attribute values, dropping characters
/// XML 1.0 cannot represent.
pub(super) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 || c == '\u{FFFE}' || c == '\u{FFFF}' => {}
            c => out.push(c),
        }
    }
    out
}

pub(super) fn package_rels(main_part: &str) -> String {
    format!(
        concat!(
            "{}",
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"<Relationship Id="rId1" Type="{}" Target="{}"/>"#,
            "</Relationships>"
        ),
        XML_HEADER, REL_OFFICE_DOCUMENT, main_part
    )
}

/// Word document with one paragraph per line.
pub fn write_docx(lines: &[&str]) -> ConvertResult<Vec<u8>> {
    let content_types = format!(
        concat!(
            "{}",
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
            r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
            "</Types>"
        ),
        XML_HEADER
    );

    let mut body = String::new();
    for line in lines {
        body.push_str(r#"<w:p><w:r><w:t xml:space="preserve">"#);
        body.push_str(&escape_xml(line.trim_end_matches('\r')));
        body.push_str("</w:t></w:r></w:p>");
    }
    let document = format!(
        concat!(
            "{}",
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
            "<w:body>{}<w:sectPr/></w:body></w:document>"
        ),
        XML_HEADER, body
    );

    package(&[
        ("[Content_Types].xml".into(), content_types),
        ("_rels/.rels".into(), package_rels("word/document.xml")),
        ("word/document.xml".into(), document),
    ])
}

/// Workbook with a single sheet; every cell is an inline string.
pub fn write_xlsx(sheet_name: &str, rows: &[Vec<String>]) -> ConvertResult<Vec<u8>> {
    let content_types = format!(
        concat!(
            "{}",
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
            r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
            r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            "</Types>"
        ),
        XML_HEADER
    );
    let workbook = format!(
        concat!(
            "{}",
            r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
            r#"<sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#
        ),
        XML_HEADER,
        escape_xml(sheet_name)
    );
    let workbook_rels = format!(
        concat!(
            "{}",
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>"#,
            "</Relationships>"
        ),
        XML_HEADER
    );

    let mut sheet_data = String::new();
    for (r, row) in rows.iter().enumerate() {
        let row_number = r + 1;
        sheet_data.push_str(&format!(r#"<row r="{}">"#, row_number));
        for (c, value) in row.iter().enumerate() {
            sheet_data.push_str(&format!(
                r#"<c r="{}{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                column_name(c),
                row_number,
                escape_xml(value)
            ));
        }
        sheet_data.push_str("</row>");
    }
    let sheet = format!(
        concat!(
            "{}",
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
            "<sheetData>{}</sheetData></worksheet>"
        ),
        XML_HEADER, sheet_data
    );

    package(&[
        ("[Content_Types].xml".into(), content_types),
        ("_rels/.rels".into(), package_rels("xl/workbook.xml")),
        ("xl/workbook.xml".into(), workbook),
        ("xl/_rels/workbook.xml.rels".into(), workbook_rels),
        ("xl/worksheets/sheet1.xml".into(), sheet),
    ])
}

/// Zero-based column index to spreadsheet letters: 0 → A, 26 → AA.
fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}
