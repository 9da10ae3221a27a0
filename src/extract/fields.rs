//! Field heuristics for a single candidate's flattened text.

use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;
use sha2::{Digest, Sha256};

pub const MIN_TEXT_CHARS: usize = 20;
pub const DEFAULT_KIND: &str = "Logement";
const ID_PREFIX_CHARS: usize = 100;
const ID_BUCKETS: u64 = 10_000;
const MAX_LOCATION_CHARS: usize = 50;
const MIN_LOCATION_CHARS: usize = 5;

// Whole words only: "tri" must not hit "électricité".
static BOILERPLATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(navigation|menu|header|footer|cookies?|rgpd|consentement|filtrer|recherche|tri|trier|page|pagination|résultats?)\b",
    )
    .unwrap()
});

static PRICE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(\d{2,4})\s*€",
        r"(?i)(\d{2,4})\s*euros?\b",
        r"€\s*(\d{2,4})",
        r"(?i)\bprix\b.*?(\d{2,4})",
        r"(?i)\bloyer\b.*?(\d{2,4})",
        r"(?i)\bprice\b.*?(\d{2,4})",
        r"(?i)\brent\b.*?(\d{2,4})",
    ])
});

static LOCATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)(r[ée]sidence[^0-9€\n]+)",
        r"(?i)(campus[^0-9€\n]+)",
        r"(\d+\s+[^0-9€\n]{10,50})",
        // proper noun pair, e.g. "Villejean Université"
        r"(\p{Lu}\p{Ll}+\s+\p{Lu}\p{Ll}+)",
    ])
});

static KIND_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\b(studio)",
        r"(?i)\b(t[1-9]|type\s*[1-9])\b",
        r"(?i)\b(chambre)",
        r"(?i)\b(appartement)",
        r"(?i)(\d+\s*pièces?)",
        r"(?i)(\d+\s*m²)",
    ])
});

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
}

/// Text nodes of the element, trimmed and joined by single spaces.
pub fn flatten_text(element: &ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn is_too_short(text: &str) -> bool {
    text.chars().count() < MIN_TEXT_CHARS
}

pub fn is_boilerplate(text: &str) -> bool {
    BOILERPLATE_RE.is_match(text)
}

/// First price matcher that hits, as the bare number.
pub fn find_price(text: &str) -> Option<&str> {
    PRICE_PATTERNS
        .iter()
        .find_map(|re| re.captures(text).and_then(|c| c.get(1)))
        .map(|m| m.as_str())
}

/// `{price}_{bucket}`. Distinct listings sharing price and leading text collide.
pub fn listing_id(price: &str, text: &str) -> String {
    let head: String = text.chars().take(ID_PREFIX_CHARS).collect();
    let digest = Sha256::digest(head.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    format!("{}_{}", price, u64::from_be_bytes(prefix) % ID_BUCKETS)
}

pub fn find_location(text: &str, default_area: &str) -> String {
    LOCATION_PATTERNS
        .iter()
        .filter_map(|re| re.captures(text).and_then(|c| c.get(1)))
        .map(|m| clean_location(m.as_str()))
        .find(|loc| loc.chars().count() > MIN_LOCATION_CHARS && !loc.contains('€'))
        .map(|loc| loc.chars().take(MAX_LOCATION_CHARS).collect::<String>().trim_end().to_string())
        .unwrap_or_else(|| default_area.to_string())
}

fn clean_location(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(|c: char| matches!(c, '-' | '–' | '|' | ',' | ':' | '/') || c.is_whitespace())
        .to_string()
}

pub fn find_kind(text: &str) -> String {
    KIND_PATTERNS
        .iter()
        .find_map(|re| re.captures(text).and_then(|c| c.get(1)))
        .map(|m| title_case(m.as_str()))
        .unwrap_or_else(|| DEFAULT_KIND.to_string())
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}
