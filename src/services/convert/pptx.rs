//! Text-only slide decks.
//!
//! A deck is a title slide followed by one slide per chunk of extracted text.
//! Layout fidelity is not attempted: each slide carries plain text boxes on a
//! blank layout.

use super::{
    ConvertResult,
    ooxml::{XML_HEADER, escape_xml, package, package_rels},
};

/// Characters of extracted text per content slide.
pub const CHUNK_CHARS: usize = 1200;

/// English Metric Units per inch.
const EMU_PER_INCH: f64 = 914_400.0;
/// 16:9 slide, 10in x 5.625in.
const SLIDE_WIDTH: i64 = 9_144_000;
const SLIDE_HEIGHT: i64 = 5_143_500;

const NS: &str = concat!(
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#
);

const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

#[derive(Clone, Copy)]
enum Align {
    Left,
    Center,
}

struct TextBox<'a> {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    /// Font size in points.
    size: u32,
    bold: bool,
    color: Option<&'a str>,
    align: Align,
    text: &'a str,
}

fn emu(inches: f64) -> i64 {
    (inches * EMU_PER_INCH).round() as i64
}

/// Split `text` into slide-sized chunks after turning form feeds into line
/// breaks. Whitespace-only text yields no chunks.
pub fn chunk_text(text: &str) -> Vec<String> {
    let cleaned = text.replace('\u{c}', "\n");
    if cleaned.trim().is_empty() {
        return Vec::new();
    }
    let chars: Vec<char> = cleaned.chars().collect();
    chars
        .chunks(CHUNK_CHARS)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Build the deck for `text`; `generated_on` is shown on the title slide.
pub fn write_text_deck(text: &str, generated_on: &str) -> ConvertResult<Vec<u8>> {
    let subtitle = format!("Generated on {}", generated_on);
    let chunks = chunk_text(text);
    let labels: Vec<String> = (1..=chunks.len()).map(|i| format!("Slide {}", i)).collect();

    let mut slides: Vec<Vec<TextBox<'_>>> = Vec::new();

    slides.push(vec![
        TextBox {
            x: 0.5,
            y: 2.0,
            w: 9.0,
            h: 0.9,
            size: 36,
            bold: true,
            color: None,
            align: Align::Center,
            text: "Converted PDF Presentation",
        },
        TextBox {
            x: 0.5,
            y: 3.0,
            w: 9.0,
            h: 0.6,
            size: 18,
            bold: false,
            color: Some("666666"),
            align: Align::Center,
            text: &subtitle,
        },
    ]);

    if chunks.is_empty() {
        slides.push(vec![TextBox {
            x: 1.0,
            y: 1.0,
            w: 8.0,
            h: 0.8,
            size: 18,
            bold: false,
            color: None,
            align: Align::Left,
            text: "No text content found in PDF.",
        }]);
    } else {
        for (chunk, label) in chunks.iter().zip(&labels) {
            slides.push(vec![
                TextBox {
                    x: 8.5,
                    y: 0.2,
                    w: 1.3,
                    h: 0.3,
                    size: 10,
                    bold: false,
                    color: Some("999999"),
                    align: Align::Left,
                    text: label,
                },
                TextBox {
                    x: 0.5,
                    y: 0.5,
                    w: 9.0,
                    h: 4.78,
                    size: 14,
                    bold: false,
                    color: Some("363636"),
                    align: Align::Left,
                    text: chunk,
                },
            ]);
        }
    }

    let mut parts = vec![
        ("[Content_Types].xml".to_string(), content_types(slides.len())),
        ("_rels/.rels".to_string(), package_rels("ppt/presentation.xml")),
        ("ppt/presentation.xml".to_string(), presentation(slides.len())),
        (
            "ppt/_rels/presentation.xml.rels".to_string(),
            presentation_rels(slides.len()),
        ),
        ("ppt/slideMasters/slideMaster1.xml".to_string(), slide_master()),
        (
            "ppt/slideMasters/_rels/slideMaster1.xml.rels".to_string(),
            rels(&[
                ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
                ("rId2", "theme", "../theme/theme1.xml"),
            ]),
        ),
        ("ppt/slideLayouts/slideLayout1.xml".to_string(), slide_layout()),
        (
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels".to_string(),
            rels(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]),
        ),
        ("ppt/theme/theme1.xml".to_string(), theme()),
    ];
    for (i, boxes) in slides.iter().enumerate() {
        let n = i + 1;
        parts.push((format!("ppt/slides/slide{}.xml", n), slide(boxes)));
        parts.push((
            format!("ppt/slides/_rels/slide{}.xml.rels", n),
            rels(&[("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml")]),
        ));
    }

    package(&parts)
}

fn rels(entries: &[(&str, &str, &str)]) -> String {
    let mut out = format!(
        r#"{}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        XML_HEADER
    );
    for (id, kind, target) in entries {
        out.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}/{}" Target="{}"/>"#,
            id, REL_BASE, kind, target
        ));
    }
    out.push_str("</Relationships>");
    out
}

fn content_types(slide_count: usize) -> String {
    let mut out = format!(
        concat!(
            "{}",
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
            r#"<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>"#,
            r#"<Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>"#,
            r#"<Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>"#,
            r#"<Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>"#,
        ),
        XML_HEADER
    );
    for n in 1..=slide_count {
        out.push_str(&format!(
            r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
            n
        ));
    }
    out.push_str("</Types>");
    out
}

fn presentation(slide_count: usize) -> String {
    let mut ids = String::new();
    for n in 0..slide_count {
        // rId1 is the master, rId2 the theme; slides follow.
        ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + n, n + 3));
    }
    format!(
        concat!(
            "{}<p:presentation {}>",
            r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#,
            "<p:sldIdLst>{}</p:sldIdLst>",
            r#"<p:sldSz cx="{}" cy="{}"/><p:notesSz cx="6858000" cy="9144000"/>"#,
            "</p:presentation>"
        ),
        XML_HEADER, NS, ids, SLIDE_WIDTH, SLIDE_HEIGHT
    )
}

fn presentation_rels(slide_count: usize) -> String {
    let slide_entries: Vec<(String, String)> = (1..=slide_count)
        .map(|n| (format!("rId{}", n + 2), format!("slides/slide{}.xml", n)))
        .collect();
    let mut entries = vec![
        ("rId1", "slideMaster", "slideMasters/slideMaster1.xml"),
        ("rId2", "theme", "theme/theme1.xml"),
    ];
    entries.extend(
        slide_entries
            .iter()
            .map(|(id, target)| (id.as_str(), "slide", target.as_str())),
    );
    rels(&entries)
}

const EMPTY_GROUP: &str = concat!(
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
    r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/>"#,
    r#"<a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#
);

fn slide_master() -> String {
    format!(
        concat!(
            "{}<p:sldMaster {}>",
            "<p:cSld><p:spTree>{}</p:spTree></p:cSld>",
            r#"<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" "#,
            r#"accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" "#,
            r#"hlink="hlink" folHlink="folHlink"/>"#,
            r#"<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst>"#,
            "</p:sldMaster>"
        ),
        XML_HEADER, NS, EMPTY_GROUP
    )
}

fn slide_layout() -> String {
    format!(
        concat!(
            r#"{}<p:sldLayout {} type="blank" preserve="1">"#,
            r#"<p:cSld name="Blank"><p:spTree>{}</p:spTree></p:cSld>"#,
            "<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>",
            "</p:sldLayout>"
        ),
        XML_HEADER, NS, EMPTY_GROUP
    )
}

fn slide(boxes: &[TextBox<'_>]) -> String {
    let mut shapes = String::new();
    for (i, text_box) in boxes.iter().enumerate() {
        shapes.push_str(&shape(i as u32 + 2, text_box));
    }
    format!(
        concat!(
            "{}<p:sld {}>",
            "<p:cSld><p:spTree>{}{}</p:spTree></p:cSld>",
            "<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>",
            "</p:sld>"
        ),
        XML_HEADER, NS, EMPTY_GROUP, shapes
    )
}

fn shape(id: u32, text_box: &TextBox<'_>) -> String {
    let align = match text_box.align {
        Align::Left => "l",
        Align::Center => "ctr",
    };
    let fill = text_box
        .color
        .map(|c| format!(r#"<a:solidFill><a:srgbClr val="{}"/></a:solidFill>"#, c))
        .unwrap_or_default();
    let run_props = format!(
        r#"<a:rPr lang="en-US" sz="{}" b="{}" dirty="0">{}</a:rPr>"#,
        text_box.size * 100,
        if text_box.bold { 1 } else { 0 },
        fill
    );

    let mut paragraphs = String::new();
    for line in text_box.text.split('\n') {
        let line = line.trim_end_matches('\r');
        paragraphs.push_str(&format!(r#"<a:p><a:pPr algn="{}"/>"#, align));
        if !line.is_empty() {
            paragraphs.push_str(&format!(
                "<a:r>{}<a:t>{}</a:t></a:r>",
                run_props,
                escape_xml(line)
            ));
        }
        paragraphs.push_str("</a:p>");
    }

    format!(
        concat!(
            "<p:sp>",
            r#"<p:nvSpPr><p:cNvPr id="{id}" name="Text {id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>"#,
            r#"<p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{w}" cy="{h}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr>"#,
            r#"<p:txBody><a:bodyPr wrap="square" rtlCol="0" anchor="t"/><a:lstStyle/>{paragraphs}</p:txBody>"#,
            "</p:sp>"
        ),
        id = id,
        x = emu(text_box.x),
        y = emu(text_box.y),
        w = emu(text_box.w),
        h = emu(text_box.h),
        paragraphs = paragraphs
    )
}

fn theme() -> String {
    let colors = [
        ("dk1", r#"<a:sysClr val="windowText" lastClr="000000"/>"#),
        ("lt1", r#"<a:sysClr val="window" lastClr="FFFFFF"/>"#),
        ("dk2", r#"<a:srgbClr val="44546A"/>"#),
        ("lt2", r#"<a:srgbClr val="E7E6E6"/>"#),
        ("accent1", r#"<a:srgbClr val="4472C4"/>"#),
        ("accent2", r#"<a:srgbClr val="ED7D31"/>"#),
        ("accent3", r#"<a:srgbClr val="A5A5A5"/>"#),
        ("accent4", r#"<a:srgbClr val="FFC000"/>"#),
        ("accent5", r#"<a:srgbClr val="5B9BD5"/>"#),
        ("accent6", r#"<a:srgbClr val="70AD47"/>"#),
        ("hlink", r#"<a:srgbClr val="0563C1"/>"#),
        ("folHlink", r#"<a:srgbClr val="954F72"/>"#),
    ];
    let mut scheme = String::new();
    for (name, value) in colors {
        scheme.push_str(&format!("<a:{name}>{value}</a:{name}>"));
    }

    let solid = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    let line = |w: u32| {
        format!(
            r#"<a:ln w="{}" cap="flat" cmpd="sng" algn="ctr">{}<a:prstDash val="solid"/></a:ln>"#,
            w, solid
        )
    };
    let fills = solid.repeat(3);
    let lines = format!("{}{}{}", line(6350), line(12700), line(19050));
    let effects = "<a:effectStyle><a:effectLst/></a:effectStyle>".repeat(3);

    format!(
        concat!(
            "{}",
            r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme">"#,
            "<a:themeElements>",
            r#"<a:clrScheme name="Office">{}</a:clrScheme>"#,
            r#"<a:fontScheme name="Office">"#,
            r#"<a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>"#,
            r#"<a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>"#,
            "</a:fontScheme>",
            r#"<a:fmtScheme name="Office">"#,
            "<a:fillStyleLst>{}</a:fillStyleLst>",
            "<a:lnStyleLst>{}</a:lnStyleLst>",
            "<a:effectStyleLst>{}</a:effectStyleLst>",
            "<a:bgFillStyleLst>{}</a:bgFillStyleLst>",
            "</a:fmtScheme>",
            "</a:themeElements>",
            "</a:theme>"
        ),
        XML_HEADER, scheme, fills, lines, effects, fills
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    fn slide_parts(bytes: &[u8]) -> Vec<String> {
        let archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut names: Vec<String> = archive
            .file_names()
            .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
            .map(str::to_string)
            .collect();
        names.sort();
        names
    }

    fn read_part(bytes: &[u8], path: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut part = archive.by_name(path).unwrap();
        let mut out = String::new();
        part.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn chunks_are_counted_in_characters() {
        let text = "é".repeat(CHUNK_CHARS * 2 + 5);
        let chunks = chunk_text(&text);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), CHUNK_CHARS);
        assert_eq!(chunks[2].chars().count(), 5);
    }

    #[test]
    fn form_feeds_become_line_breaks() {
        assert_eq!(chunk_text("a\u{c}b"), vec!["a\nb".to_string()]);
        assert!(chunk_text(" \u{c}\n ").is_empty());
    }

    #[test]
    fn deck_has_title_plus_one_slide_per_chunk() {
        let text = "x".repeat(2500);
        let bytes = write_text_deck(&text, "2026-01-01").unwrap();
        assert_eq!(slide_parts(&bytes).len(), 4);

        let title = read_part(&bytes, "ppt/slides/slide1.xml");
        assert!(title.contains("Converted PDF Presentation"));
        assert!(title.contains("Generated on 2026-01-01"));

        let presentation = read_part(&bytes, "ppt/presentation.xml");
        assert_eq!(presentation.matches("<p:sldId ").count(), 4);

        let last = read_part(&bytes, "ppt/slides/slide4.xml");
        assert!(last.contains("Slide 3"));
    }

    #[test]
    fn empty_text_gives_no_content_slide() {
        let bytes = write_text_deck("\n\n", "2026-01-01").unwrap();
        assert_eq!(slide_parts(&bytes).len(), 2);
        let slide = read_part(&bytes, "ppt/slides/slide2.xml");
        assert!(slide.contains("No text content found in PDF."));
    }
}
