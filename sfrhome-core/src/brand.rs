//! Brand label normalization.
//!
//! The portal reports brands either as plain labels (`Bosch`) or as the
//! path of a logo asset (`/img/logo_philips.png`). Both are reduced to a
//! display label.

use std::sync::LazyLock;

use regex::Regex;

/// Label used when no brand can be derived.
pub const BRAND_FALLBACK: &str = "SFR HOME";

static LOGO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:logo)[_-]([A-Za-z0-9_\- ]*?)(?:\.[A-Za-z0-9]+)?$")
        .expect("Invalid regex")
});

/// Normalizes a raw brand value into a display label.
///
/// - empty or whitespace input gives [`BRAND_FALLBACK`]
/// - a `logo_<core>.<ext>` file name (possibly behind a path) gives the
///   core with separators turned into spaces, each word title-cased
/// - anything else is returned trimmed
///
/// The function is idempotent.
pub fn normalize_brand(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return BRAND_FALLBACK.to_string();
    }

    let segment = trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(trimmed)
        .trim();

    let Some(caps) = LOGO_RE.captures(segment) else {
        return trimmed.to_string();
    };

    let core = caps.get(1).map_or("", |m| m.as_str());
    let words: Vec<String> = core
        .split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(title_case)
        .collect();

    if words.is_empty() {
        BRAND_FALLBACK.to_string()
    } else {
        words.join(" ")
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
