//! Page-level PDF operations on top of `lopdf`: merge, split, re-save,
//! password protection and unlocking.

use super::{ConvertError, ConvertResult, page_range::parse_page_selection};
use lopdf::{
    Document, Object, ObjectId, StringFormat, dictionary,
    encryption::{EncryptionState, EncryptionVersion, Permissions},
};
use uuid::Uuid;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// RC4 key length for protected output, in bits.
const PROTECT_KEY_LENGTH: usize = 128;

fn load(bytes: &[u8]) -> ConvertResult<Document> {
    Ok(Document::load_mem(bytes)?)
}

fn save(doc: &mut Document) -> ConvertResult<Vec<u8>> {
    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

/// Concatenate `sources` into one document, pages in submission order.
pub fn merge(sources: &[&[u8]]) -> ConvertResult<Vec<u8>> {
    let mut merged = Document::with_version("1.5");
    let pages_id = merged.new_object_id();
    let mut kids: Vec<Object> = Vec::new();

    for source in sources {
        let mut doc = load(source)?;
        doc.renumber_objects_with(merged.max_id + 1);

        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        for &page_id in &page_ids {
            inherit_page_attributes(&mut doc, page_id);
        }

        merged.max_id = merged.max_id.max(doc.max_id);
        for (id, object) in doc.objects {
            // The page tree and catalog are rebuilt below.
            match object.type_name() {
                Ok(b"Catalog") | Ok(b"Pages") => continue,
                _ => {}
            }
            merged.objects.insert(id, object);
        }

        for page_id in page_ids {
            if let Ok(page) = merged.get_dictionary_mut(page_id) {
                page.set("Parent", pages_id);
                kids.push(Object::Reference(page_id));
            }
        }
    }

    let count = kids.len() as i64;
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", catalog_id);

    save(&mut merged)
}

/// Copy attributes a page inherits from its ancestors onto the page itself so
/// it still renders once detached from its original page tree.
fn inherit_page_attributes(doc: &mut Document, page_id: ObjectId) {
    for key in INHERITABLE {
        let present = doc
            .get_dictionary(page_id)
            .map(|page| page.has(key))
            .unwrap_or(true);
        if present {
            continue;
        }
        if let Some(value) = find_inherited(doc, page_id, key) {
            if let Ok(page) = doc.get_dictionary_mut(page_id) {
                page.set(key, value);
            }
        }
    }
}

fn find_inherited(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut parent = doc
        .get_dictionary(page_id)
        .ok()?
        .get(b"Parent")
        .and_then(Object::as_reference)
        .ok();
    // Bounded walk: malformed files can contain Parent cycles.
    for _ in 0..64 {
        let node = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// Keep only the pages selected by `pages` (1-based list/range syntax).
pub fn split(source: &[u8], pages: Option<&str>) -> ConvertResult<Vec<u8>> {
    let mut doc = load(source)?;
    let page_numbers: Vec<u32> = doc.get_pages().into_keys().collect();
    let total = page_numbers.len() as u32;

    let selected = parse_page_selection(pages, total);
    if selected.is_empty() {
        return Err(ConvertError::InvalidInput(
            "Invalid page range selected".into(),
        ));
    }

    let to_delete: Vec<u32> = page_numbers
        .into_iter()
        .filter(|number| selected.binary_search(&(number - 1)).is_err())
        .collect();
    if !to_delete.is_empty() {
        doc.delete_pages(&to_delete);
        doc.prune_objects();
        doc.renumber_objects();
    }

    save(&mut doc)
}

/// Parse and re-serialize the document. No size reduction is attempted.
pub fn resave(source: &[u8]) -> ConvertResult<Vec<u8>> {
    let mut doc = load(source)?;
    save(&mut doc)
}

/// Encrypt with `password` as both user and owner password. Only printing
/// (including high resolution) stays permitted.
pub fn protect(source: &[u8], password: &str) -> ConvertResult<Vec<u8>> {
    let mut doc = load(source)?;
    ensure_file_id(&mut doc);

    let version = EncryptionVersion::V2 {
        document: &doc,
        owner_password: password,
        user_password: password,
        key_length: PROTECT_KEY_LENGTH,
        permissions: protect_permissions(),
    };
    let state = EncryptionState::try_from(version)?;
    doc.encrypt(&state)?;

    save(&mut doc)
}

/// Printing, at any resolution, is the only right granted.
fn protect_permissions() -> Permissions {
    let granted = Permissions::PRINTABLE | Permissions::PRINTABLE_IN_HIGH_QUALITY;
    // Bits 7-8 and 13-32 of `/P` are reserved and must be 1.
    Permissions::from_bits_retain(granted.bits() | 0xFFFF_F0C0)
}

/// Open with `password` and write the document back without encryption.
///
/// Every failure is reported as an incorrect password; the caller cannot do
/// anything more specific with it.
pub fn unlock(source: &[u8], password: &str) -> ConvertResult<Vec<u8>> {
    let mut doc = Document::load_mem_with_password(source, password)
        .map_err(|err| ConvertError::IncorrectPassword(err.to_string()))?;

    // The reader remembers the decryption state and would re-encrypt on save.
    doc.encryption_state = None;
    doc.trailer.remove(b"Encrypt");
    doc.prune_objects();

    save(&mut doc).map_err(|err| ConvertError::IncorrectPassword(err.to_string()))
}

/// Standard security handlers derive keys from the first file identifier.
fn ensure_file_id(doc: &mut Document) {
    if doc.trailer.get(b"ID").is_ok() {
        return;
    }
    let id = Uuid::new_v4().as_bytes().to_vec();
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(id.clone(), StringFormat::Hexadecimal),
            Object::String(id, StringFormat::Hexadecimal),
        ]),
    );
}

#[cfg(test)]
mod tests {
    use super::super::{fixtures::*, text::extract_text};
    use super::*;

    #[test]
    fn merge_sums_pages_in_submission_order() {
        let a = pdf_with_page_texts(&["Alpha one".into(), "Alpha two".into()]);
        let b = pdf_with_page_texts(&["Bravo one".into()]);
        let c = pdf_with_page_texts(&["Charlie one".into(), "Charlie two".into(), "Charlie three".into()]);

        let merged = merge(&[&a, &b, &c]).unwrap();
        assert_eq!(page_count(&merged), 6);

        let text = extract_text(&merged).unwrap();
        let alpha = text.find("Alpha two").unwrap();
        let bravo = text.find("Bravo one").unwrap();
        let charlie = text.find("Charlie three").unwrap();
        assert!(alpha < bravo && bravo < charlie);
    }

    #[test]
    fn merge_carries_inherited_resources_to_pages() {
        let merged = merge(&[&text_pdf(1), &text_pdf(1)]).unwrap();
        let doc = Document::load_mem(&merged).unwrap();
        for page_id in doc.get_pages().into_values() {
            let page = doc.get_dictionary(page_id).unwrap();
            assert!(page.has(b"Resources"));
            assert!(page.has(b"MediaBox"));
        }
    }

    #[test]
    fn merge_twice_gives_identical_pages() {
        let a = text_pdf(2);
        let b = text_pdf(3);
        let first = merge(&[&a, &b]).unwrap();
        let second = merge(&[&a, &b]).unwrap();
        assert_eq!(page_count(&first), page_count(&second));
        assert_eq!(extract_text(&first).unwrap(), extract_text(&second).unwrap());
    }

    #[test]
    fn split_keeps_selected_pages_ascending() {
        let source = text_pdf(10);
        let out = split(&source, Some("8, 1, 3-5, 4")).unwrap();
        assert_eq!(page_count(&out), 5);

        let text = extract_text(&out).unwrap();
        let positions: Vec<usize> = ["Page 1", "Page 3", "Page 4", "Page 5", "Page 8"]
            .iter()
            .map(|needle| text.find(needle).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(!text.contains("Page 2"));
        assert!(!text.contains("Page 9"));
    }

    #[test]
    fn split_rejects_empty_selection() {
        let err = split(&text_pdf(3), Some("50")).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidInput(msg) if msg == "Invalid page range selected"));
    }

    #[test]
    fn split_without_range_copies_all_pages() {
        assert_eq!(page_count(&split(&text_pdf(4), None).unwrap()), 4);
    }

    #[test]
    fn resave_keeps_pages() {
        assert_eq!(page_count(&resave(&text_pdf(3)).unwrap()), 3);
    }

    #[test]
    fn resave_rejects_garbage() {
        assert!(matches!(resave(b"nope"), Err(ConvertError::Pdf(_))));
    }

    #[test]
    fn protect_then_unlock_preserves_text() {
        let source = text_pdf(3);
        let protected = protect(&source, "s3cret").unwrap();
        assert!(
            protected.windows(b"/Encrypt".len()).any(|w| w == b"/Encrypt"),
            "protected output must carry an Encrypt dictionary"
        );

        let unlocked = unlock(&protected, "s3cret").unwrap();
        assert_eq!(page_count(&unlocked), 3);
        assert_eq!(extract_text(&unlocked).unwrap(), extract_text(&source).unwrap());
        assert!(!unlocked.windows(b"/Encrypt".len()).any(|w| w == b"/Encrypt"));
    }

    /// One-based PDF permission bit.
    fn bit(p: u32, n: u32) -> bool {
        p & (1 << (n - 1)) != 0
    }

    #[test]
    fn protect_writes_print_only_rc4_dictionary() {
        let protected = protect(&text_pdf(1), "s3cret").unwrap();
        let doc = Document::load_mem_with_password(&protected, "s3cret").unwrap();
        let encrypt = match doc.trailer.get(b"Encrypt").unwrap() {
            Object::Reference(id) => doc.get_dictionary(*id).unwrap(),
            Object::Dictionary(dict) => dict,
            other => panic!("unexpected Encrypt entry {:?}", other),
        };

        assert_eq!(encrypt.get(b"Filter").unwrap().as_name().unwrap(), b"Standard");
        assert_eq!(encrypt.get(b"V").unwrap().as_i64().unwrap(), 2);
        assert_eq!(encrypt.get(b"Length").unwrap().as_i64().unwrap(), 128);

        let p = encrypt.get(b"P").unwrap().as_i64().unwrap() as u32;
        assert!(bit(p, 3), "print");
        assert!(bit(p, 12), "high-resolution print");
        for denied in [4, 5, 6, 9, 10, 11] {
            assert!(!bit(p, denied), "bit {} must be clear in {:#x}", denied, p);
        }
        for reserved in (7..=8).chain(13..=32) {
            assert!(bit(p, reserved), "reserved bit {} must be set in {:#x}", reserved, p);
        }
    }

    #[test]
    fn protected_output_needs_the_password() {
        let protected = protect(&text_pdf(2), "hunter2").unwrap();
        assert!(unlock(&protected, "").is_err());
        assert_eq!(page_count(&unlock(&protected, "hunter2").unwrap()), 2);
    }

    #[test]
    fn unlock_with_wrong_password_fails() {
        let protected = protect(&text_pdf(1), "right").unwrap();
        let err = unlock(&protected, "wrong").unwrap_err();
        assert!(matches!(err, ConvertError::IncorrectPassword(_)));
    }
}
