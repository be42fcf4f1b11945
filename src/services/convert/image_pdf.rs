//! JPEG/PNG images to a PDF with one page per image.
//!
//! Pages are sized to the image's pixel dimensions (1 px = 1 pt). JPEG data is
//! embedded untouched behind `DCTDecode`; PNGs are decoded and stored as
//! Flate-compressed RGB with an optional alpha soft mask.

use super::{ConvertResult, InputFile};
use flate2::{Compression, write::ZlibEncoder};
use image::{ImageDecoder, codecs::jpeg::JpegDecoder};
use lopdf::{
    Document, Object, ObjectId, Stream,
    content::{Content, Operation},
    dictionary,
};
use std::io::{Cursor, Write};

struct EmbeddedImage {
    width: u32,
    height: u32,
    xobject: Stream,
    soft_mask: Option<Stream>,
}

/// Build the document. Inputs whose declared type is neither JPEG nor PNG are
/// skipped, so an all-unsupported batch gives a PDF without pages.
pub fn images_to_pdf(inputs: &[InputFile]) -> ConvertResult<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();

    for input in inputs {
        let embedded = match input.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => embed_jpeg(&input.bytes)?,
            "image/png" => embed_png(&input.bytes)?,
            other => {
                tracing::debug!(
                    "skipping {} with unsupported type {}",
                    input.original_name,
                    other
                );
                continue;
            }
        };
        let page_id = add_image_page(&mut doc, pages_id, embedded)?;
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

fn add_image_page(
    doc: &mut Document,
    pages_id: ObjectId,
    image: EmbeddedImage,
) -> ConvertResult<ObjectId> {
    let EmbeddedImage {
        width,
        height,
        mut xobject,
        soft_mask,
    } = image;

    if let Some(mask) = soft_mask {
        let mask_id = doc.add_object(mask);
        xobject.dict.set("SMask", mask_id);
    }
    let image_id = doc.add_object(xobject);

    let (w, h) = (width as f32, height as f32);
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(w),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(h),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(w),
            Object::Real(h),
        ],
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
        "Contents" => content_id,
    }))
}

fn embed_jpeg(bytes: &[u8]) -> ConvertResult<EmbeddedImage> {
    let decoder = JpegDecoder::new(Cursor::new(bytes))?;
    let (width, height) = decoder.dimensions();
    // The decoder reports its converted output type, so the stored component
    // count comes from the frame header instead.
    let header = scan_jpeg_header(bytes);
    let color_space = match header.components {
        Some(1) => "DeviceGray",
        Some(4) => "DeviceCMYK",
        _ => "DeviceRGB",
    };

    let mut xobject = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        bytes.to_vec(),
    );
    // Adobe writers store CMYK inverted.
    if header.components == Some(4) && header.adobe {
        let decode = [1, 0, 1, 0, 1, 0, 1, 0].map(Object::Integer).to_vec();
        xobject.dict.set("Decode", decode);
    }

    Ok(EmbeddedImage {
        width,
        height,
        xobject,
        soft_mask: None,
    })
}

#[derive(Debug, Default, PartialEq, Eq)]
struct JpegHeader {
    /// Component count from the frame header.
    components: Option<u8>,
    /// An APP14 `Adobe` segment was seen.
    adobe: bool,
}

/// Walk the marker segments up to the scan data.
fn scan_jpeg_header(bytes: &[u8]) -> JpegHeader {
    let mut header = JpegHeader::default();
    let mut pos = 2;
    while pos + 4 <= bytes.len() && bytes[pos] == 0xFF {
        let marker = bytes[pos + 1];
        if marker == 0xDA || marker == 0xD9 {
            break;
        }
        let len = usize::from(u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]));
        if len < 2 {
            break;
        }
        let payload = &bytes[(pos + 4).min(bytes.len())..(pos + 2 + len).min(bytes.len())];
        match marker {
            0xEE if payload.starts_with(b"Adobe") => header.adobe = true,
            // SOF0..SOF15 minus DHT, JPG and DAC
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                header.components = payload.get(5).copied();
            }
            _ => {}
        }
        pos += 2 + len;
    }
    header
}

fn embed_png(bytes: &[u8]) -> ConvertResult<EmbeddedImage> {
    let decoded = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)?;
    let (width, height) = (decoded.width(), decoded.height());

    let soft_mask = if decoded.color().has_alpha() {
        let alpha: Vec<u8> = decoded.to_rgba8().pixels().map(|p| p.0[3]).collect();
        Some(flate_image_stream(width, height, "DeviceGray", &alpha)?)
    } else {
        None
    };
    let rgb = decoded.to_rgb8();
    let xobject = flate_image_stream(width, height, "DeviceRGB", rgb.as_raw())?;

    Ok(EmbeddedImage {
        width,
        height,
        xobject,
        soft_mask,
    })
}

fn flate_image_stream(
    width: u32,
    height: u32,
    color_space: &str,
    samples: &[u8],
) -> ConvertResult<Stream> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(samples)?;
    let compressed = encoder.finish()?;

    Ok(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        compressed,
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::super::fixtures::{input, page_count};
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

    pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 200, 30, 128]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 100, 50]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Jpeg).unwrap();
        out.into_inner()
    }

    /// 8x8 baseline CMYK JPEG with an Adobe APP14 segment. Every block holds
    /// only a zero DC coefficient, so both Huffman tables carry one symbol.
    pub fn cmyk_jpeg_bytes() -> Vec<u8> {
        let mut out = vec![0xFF, 0xD8];
        // APP14: "Adobe", version 100, no flags, transform 0 (CMYK)
        out.extend_from_slice(&[0xFF, 0xEE, 0x00, 0x0E]);
        out.extend_from_slice(b"Adobe");
        out.extend_from_slice(&[0x00, 0x64, 0x00, 0x00, 0x00, 0x00, 0x00]);
        // DQT: table 0, all ones
        out.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x43, 0x00]);
        out.extend_from_slice(&[1; 64]);
        // SOF0: 8 bit, 8x8, four components sharing table 0
        out.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x14, 0x08, 0x00, 0x08, 0x00, 0x08, 0x04]);
        for id in 1..=4u8 {
            out.extend_from_slice(&[id, 0x11, 0x00]);
        }
        // DHT: DC table 0 and AC table 0, one 1-bit code for symbol 0 each
        for class in [0x00u8, 0x10] {
            out.extend_from_slice(&[0xFF, 0xC4, 0x00, 0x14, class, 1]);
            out.extend_from_slice(&[0; 15]);
            out.push(0x00);
        }
        // SOS over all four components, then DC 0 + EOB per block
        out.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x0E, 0x04]);
        for id in 1..=4u8 {
            out.extend_from_slice(&[id, 0x00]);
        }
        out.extend_from_slice(&[0x00, 0x3F, 0x00]);
        out.push(0x00);
        out.extend_from_slice(&[0xFF, 0xD9]);
        out
    }

    fn image_xobjects(bytes: &[u8]) -> Vec<lopdf::Dictionary> {
        let doc = Document::load_mem(bytes).unwrap();
        doc.objects
            .values()
            .filter_map(|obj| obj.as_stream().ok())
            .filter(|stream| {
                stream.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(b"Image".as_slice())
            })
            .map(|stream| stream.dict.clone())
            .collect()
    }

    fn media_boxes(bytes: &[u8]) -> Vec<(f32, f32)> {
        let doc = Document::load_mem(bytes).unwrap();
        doc.get_pages()
            .into_values()
            .map(|id| {
                let media = doc
                    .get_dictionary(id)
                    .unwrap()
                    .get(b"MediaBox")
                    .unwrap()
                    .as_array()
                    .unwrap()
                    .clone();
                (
                    media[2].as_float().unwrap(),
                    media[3].as_float().unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn one_page_per_image_sized_to_pixels() {
        let inputs = vec![
            input("a.jpg", "image/jpeg", jpeg_bytes(40, 30)),
            input("b.png", "image/png", png_bytes(16, 64)),
        ];
        let pdf = images_to_pdf(&inputs).unwrap();
        assert_eq!(page_count(&pdf), 2);
        assert_eq!(media_boxes(&pdf), vec![(40.0, 30.0), (16.0, 64.0)]);
    }

    #[test]
    fn cmyk_jpeg_keeps_four_components() {
        let jpeg = cmyk_jpeg_bytes();
        assert_eq!(
            scan_jpeg_header(&jpeg),
            JpegHeader {
                components: Some(4),
                adobe: true
            }
        );

        let pdf = images_to_pdf(&[input("print.jpg", "image/jpeg", jpeg)]).unwrap();
        let images = image_xobjects(&pdf);
        assert_eq!(images.len(), 1);
        let image = &images[0];
        assert_eq!(image.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceCMYK");
        let decode: Vec<i64> = image
            .get(b"Decode")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_i64().unwrap())
            .collect();
        assert_eq!(decode, vec![1, 0, 1, 0, 1, 0, 1, 0]);
    }

    #[test]
    fn rgb_jpeg_stays_device_rgb() {
        let jpeg = jpeg_bytes(12, 12);
        assert_eq!(scan_jpeg_header(&jpeg).components, Some(3));

        let pdf = images_to_pdf(&[input("photo.jpg", "image/jpeg", jpeg)]).unwrap();
        let images = image_xobjects(&pdf);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceRGB");
        assert!(images[0].get(b"Decode").is_err());
    }

    #[test]
    fn unsupported_inputs_are_skipped() {
        let inputs = vec![
            input("a.png", "image/png", png_bytes(8, 8)),
            input("doc.pdf", "application/pdf", b"%PDF-1.4".to_vec()),
        ];
        assert_eq!(page_count(&images_to_pdf(&inputs).unwrap()), 1);
    }

    #[test]
    fn all_unsupported_gives_empty_document() {
        let inputs = vec![input("doc.pdf", "application/pdf", b"%PDF-1.4".to_vec())];
        assert_eq!(page_count(&images_to_pdf(&inputs).unwrap()), 0);
    }

    #[test]
    fn corrupt_image_fails() {
        let inputs = vec![input("bad.png", "image/png", b"not a png".to_vec())];
        assert!(images_to_pdf(&inputs).is_err());
    }
}
