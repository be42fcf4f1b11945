use super::{ConvertError, ConvertResult};
use std::panic::{self, AssertUnwindSafe};

/// Extract the plain text of every page.
///
/// The extractor panics on some malformed inputs; that is reported as an
/// ordinary extraction failure.
pub fn extract_text(bytes: &[u8]) -> ConvertResult<String> {
    match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(err)) => Err(ConvertError::Extraction(err.to_string())),
        Err(_) => Err(ConvertError::Extraction("text extractor panicked".into())),
    }
}

/// Lines with at least one non-whitespace character, as extracted.
pub fn non_blank_lines(text: &str) -> Vec<&str> {
    text.split('\n').filter(|line| !line.trim().is_empty()).collect()
}
