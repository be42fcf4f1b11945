//! Page selection strings such as `"1, 3-5, 8"`.
//!
//! Parsing is lenient: parts that do not start with a number are ignored and
//! pages outside `1..=total_pages` are dropped. The result is zero-based,
//! ascending and free of duplicates.

use std::collections::BTreeSet;

/// Resolve `selection` against a document of `total_pages` pages.
///
/// An absent or blank selection selects every page.
pub fn parse_page_selection(selection: Option<&str>, total_pages: u32) -> Vec<u32> {
    let selection = match selection.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return (0..total_pages).collect(),
    };

    let mut selected = BTreeSet::new();
    for part in selection.split(',') {
        let bounds: Vec<&str> = part.trim().split('-').collect();
        if bounds.len() == 2 {
            let (Some(start), Some(end)) = (leading_int(bounds[0]), leading_int(bounds[1])) else {
                continue;
            };
            let first = start.max(1);
            let last = end.min(i64::from(total_pages));
            for page in first..=last {
                selected.insert((page - 1) as u32);
            }
        } else if let Some(page) = leading_int(part) {
            if page >= 1 && page <= i64::from(total_pages) {
                selected.insert((page - 1) as u32);
            }
        }
    }

    selected.into_iter().collect()
}

/// Parse the integer prefix of `s` after leading whitespace: `" 12abc"` is 12,
/// `"abc"` is nothing.
fn leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // Saturate rather than fail on absurdly long numbers; they are out of
    // range either way.
    let value = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}
