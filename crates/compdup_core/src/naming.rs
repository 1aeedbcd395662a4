//! Deterministic naming for produced items.
//!
//! # Responsibility
//! - Derive the name of a duplicate from its destination and source names.
//! - Provide the slug normalization shared by every produced name.
//!
//! # Invariants
//! - Output depends only on the inputs (no clock, no randomness).
//! - Output contains only `[a-z0-9-]`, never starts/ends with `-`, and never
//!   contains `--`.
//! - Non-blank inputs never derive an empty name: a part with no ASCII
//!   letters or digits after transliteration is replaced by the hex of its
//!   UTF-8 bytes.

use deunicode::deunicode;
use once_cell::sync::Lazy;
use regex::Regex;

static SEPARATOR_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid separator regex"));

/// Separator placed between destination and source names.
pub const NAME_SEPARATOR: char = '-';

/// Transliterates `value` to ASCII, lowercases it and collapses every
/// non-alphanumeric run into `-`.
pub fn slugify(value: &str) -> String {
    let lowered = deunicode(value).to_lowercase();
    SEPARATOR_RUN_RE
        .replace_all(&lowered, "-")
        .trim_matches(NAME_SEPARATOR)
        .to_string()
}

/// Derives the memoization key / new name for a duplicate of `source_name`
/// placed in the folder `destination_name`.
pub fn derive_name(destination_name: &str, source_name: &str) -> String {
    [destination_name, source_name]
        .into_iter()
        .map(name_part)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn name_part(value: &str) -> String {
    let slug = slugify(value);
    if !slug.is_empty() {
        return slug;
    }
    value.trim().bytes().map(|byte| format!("{byte:02x}")).collect()
}
