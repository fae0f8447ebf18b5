use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static CAMEL_BOUNDARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([a-z0-9])([A-Z])").expect("camel case boundary pattern to compile")
});

static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("separator pattern to compile"));

/// Canonical form of a header, field key or label: lowercase ASCII words
/// joined by single underscores.
///
/// `"Owner Email"`, `"owner_email"`, `"ownerEmail"` and `"OWNER-EMAIL"` all
/// normalize to `owner_email`. Apostrophes are dropped rather than treated
/// as separators so `"Owner's Email"` becomes `owners_email`.
pub fn normalize_header(raw: &str) -> String {
    let stripped: String = raw
        .nfkd()
        .filter(|c| !is_combining_mark(*c) && *c != '\'' && *c != '\u{2019}')
        .collect();
    let split = CAMEL_BOUNDARY.replace_all(&stripped, "${1}_${2}");
    let lower = split.to_lowercase();
    SEPARATORS
        .replace_all(&lower, "_")
        .trim_matches('_')
        .to_string()
}

/// Two normalized names match when they agree once separators are ignored,
/// so `firstname` matches `first_name`.
pub(crate) fn names_match(normalized_a: &str, normalized_b: &str) -> bool {
    !normalized_a.is_empty()
        && normalized_a
            .chars()
            .filter(|c| *c != '_')
            .eq(normalized_b.chars().filter(|c| *c != '_'))
}

/// Removes the first occurrence of `needle` from `haystack` and re-joins the
/// remaining words. Returns `None` when the needle is absent or nothing is
/// left over.
pub(crate) fn strip_segment(haystack: &str, needle: &str) -> Option<String> {
    if needle.is_empty() {
        return None;
    }
    let start = haystack.find(needle)?;
    let rest = format!("{}_{}", &haystack[..start], &haystack[start + needle.len()..]);
    let joined = rest
        .split('_')
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    (!joined.is_empty()).then_some(joined)
}
