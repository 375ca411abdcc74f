//! Party-name normalization for family matching.
//!
//! "Acme Corp." and "ACME, Inc." both normalize to "acme", so amendments
//! that spell a party differently still land in the same family.

use std::sync::OnceLock;

use regex::Regex;

fn entity_suffixes() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)\b(LLC|L\.L\.C\.|Inc\.?|Incorporated|Ltd\.?|Limited|Corp\.?|Corporation",
            r"|LLP|L\.L\.P\.|LP|L\.P\.|PLC|P\.L\.C\.|GmbH|AG|SA|SAS|NV|BV",
            r"|Co\.?|Company|& Co\.?|Group|Holdings?|International|Intl\.?)\b",
        ))
        .expect("entity suffix pattern is valid")
    })
}

fn punctuation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("punctuation pattern is valid"))
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

/// Normalize a party / company name for matching.
///
/// Trims, removes common entity suffixes (LLC, Inc, Ltd, GmbH, ...),
/// replaces remaining punctuation with spaces, collapses whitespace and
/// lower-cases the result.
pub fn normalize_party_name(raw: &str) -> String {
    let name = entity_suffixes().replace_all(raw.trim(), "");
    let name = punctuation().replace_all(&name, " ");
    let name = whitespace().replace_all(&name, " ");
    name.trim().to_lowercase()
}
