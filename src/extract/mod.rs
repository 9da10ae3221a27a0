pub mod fields;
pub mod strategies;

use std::collections::HashSet;

use scraper::Html;
use tracing::{debug, info, warn};

use crate::error::CandidateRejection;
use crate::model::{CycleResult, Listing, RawPage};

pub const STRUCTURE_NOTE: &str = "structure may have changed";

const NO_RESULTS_PHRASES: &[&str] = &[
    "aucun résultat",
    "no results",
    "pas de logement",
    "aucun logement",
    "recherche vide",
    "aucune offre",
];

#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Location used when no residence, campus or address is found.
    pub default_area: String,
}

/// Markup → candidates → listings, then tri-state classification of the page.
pub fn extract(page: &RawPage, config: &ExtractConfig) -> CycleResult {
    let document = Html::parse_document(&page.body);

    let candidates = match strategies::select_candidates(&document) {
        Some((strategy, found)) => {
            info!("Found {} potential listing elements via {}", found.len(), strategy);
            found
        }
        None => {
            info!("No potential listing elements found");
            Vec::new()
        }
    };

    let mut seen = HashSet::new();
    let mut listings = Vec::new();
    for (i, element) in candidates.iter().enumerate() {
        let text = fields::flatten_text(element);
        match parse_candidate(&text, page, config, &mut seen) {
            Ok(listing) => {
                info!(
                    "Found listing: {} in {} for {}",
                    listing.kind, listing.location, listing.rent
                );
                listings.push(listing);
            }
            Err(reason) => debug!("Skipping candidate {}: {}", i, reason),
        }
    }

    if let Some(result) = CycleResult::available(listings) {
        return result;
    }

    if has_no_results_marker(&document) {
        info!("Page explicitly shows no results");
        CycleResult::ConfirmedEmpty
    } else {
        warn!("Could not find listings or a no-results message on {}", page.url);
        CycleResult::Indeterminate {
            note: STRUCTURE_NOTE.to_string(),
        }
    }
}

/// Filter one candidate's text and build its listing. `seen` holds ids accepted this cycle.
pub fn parse_candidate(
    text: &str,
    page: &RawPage,
    config: &ExtractConfig,
    seen: &mut HashSet<String>,
) -> Result<Listing, CandidateRejection> {
    if fields::is_too_short(text) {
        return Err(CandidateRejection::TooShort(fields::MIN_TEXT_CHARS));
    }
    if fields::is_boilerplate(text) {
        return Err(CandidateRejection::Boilerplate);
    }
    let price = fields::find_price(text).ok_or(CandidateRejection::NoPrice)?;

    let id = fields::listing_id(price, text);
    if !seen.insert(id.clone()) {
        return Err(CandidateRejection::Duplicate);
    }

    Ok(Listing {
        id,
        kind: fields::find_kind(text),
        location: fields::find_location(text, &config.default_area),
        rent: format!("{}€", price),
        source_url: page.url.clone(),
        observed_at: page.fetched_at,
    })
}

fn has_no_results_marker(document: &Html) -> bool {
    let page_text = document.root_element().text().collect::<String>().to_lowercase();
    NO_RESULTS_PHRASES.iter().any(|p| page_text.contains(p))
}

// ── Tests ──
