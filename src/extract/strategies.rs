use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

static CARD_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div, article").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static ITEM_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").unwrap());
static CONTAINER_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div, section").unwrap());

const CARD_KEYWORDS: &[&str] = &["logement", "accommodation", "room", "residence", "housing"];
const ROW_KEYWORDS: &[&str] = &["logement", "result", "row"];
const ITEM_KEYWORDS: &[&str] = &["logement", "accommodation", "result"];
const CONTAINER_KEYWORDS: &[&str] = &["results", "resultats", "listings", "accommodations"];

pub type Strategy = for<'a> fn(&'a Html) -> Vec<ElementRef<'a>>;

/// Tried in order; the first strategy returning anything wins.
pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("listing cards", listing_cards),
    ("table rows", table_rows),
    ("list items", list_items),
    ("results container", results_container),
];

/// Run the fallback chain. Returns the winning strategy's name with its candidates.
pub fn select_candidates(document: &Html) -> Option<(&'static str, Vec<ElementRef<'_>>)> {
    STRATEGIES.iter().find_map(|(name, strategy)| {
        let found = strategy(document);
        (!found.is_empty()).then_some((*name, found))
    })
}

fn listing_cards(document: &Html) -> Vec<ElementRef<'_>> {
    select_by_class(document, &CARD_SEL, CARD_KEYWORDS)
}

fn table_rows(document: &Html) -> Vec<ElementRef<'_>> {
    select_by_class(document, &ROW_SEL, ROW_KEYWORDS)
}

fn list_items(document: &Html) -> Vec<ElementRef<'_>> {
    select_by_class(document, &ITEM_SEL, ITEM_KEYWORDS)
}

fn results_container(document: &Html) -> Vec<ElementRef<'_>> {
    document
        .select(&CONTAINER_SEL)
        .find(|el| class_matches(el, CONTAINER_KEYWORDS))
        .map(|container| container.children().filter_map(ElementRef::wrap).collect())
        .unwrap_or_default()
}

fn select_by_class<'a>(
    document: &'a Html,
    selector: &Selector,
    keywords: &[&str],
) -> Vec<ElementRef<'a>> {
    document
        .select(selector)
        .filter(|el| class_matches(el, keywords))
        .collect()
}

fn class_matches(element: &ElementRef, keywords: &[&str]) -> bool {
    element
        .value()
        .attr("class")
        .map(|class| {
            let class = class.to_lowercase();
            keywords.iter().any(|k| class.contains(k))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn winner(html: &str) -> Option<(&'static str, usize)> {
        let doc = Html::parse_document(html);
        select_candidates(&doc).map(|(name, found)| (name, found.len()))
    }

    #[test]
    fn cards_match_class_substring_case_insensitively() {
        let html = r#"<div class="FicheLogement">a</div><article class="roomCard">b</article><div class="other">c</div>"#;
        assert_eq!(winner(html), Some(("listing cards", 2)));
    }

    #[test]
    fn cards_win_over_rows() {
        let html = r#"<div class="housing">a</div><table><tr class="result-row"><td>b</td></tr></table>"#;
        assert_eq!(winner(html), Some(("listing cards", 1)));
    }

    #[test]
    fn rows_are_second() {
        let html = r#"<table><tr class="result"><td>a</td></tr><tr class="row-odd"><td>b</td></tr><tr><td>c</td></tr></table>"#;
        assert_eq!(winner(html), Some(("table rows", 2)));
    }

    #[test]
    fn list_items_are_third() {
        let html = r#"<ul><li class="accommodation-item">a</li><li class="nav">b</li></ul>"#;
        assert_eq!(winner(html), Some(("list items", 1)));
    }

    #[test]
    fn container_takes_direct_children_only() {
        let html = r#"
            <section class="search-results">
                <p>first <span>nested</span></p>
                <p>second</p>
                <ul><li>deep</li></ul>
            </section>"#;
        assert_eq!(winner(html), Some(("results container", 3)));
    }

    #[test]
    fn nothing_matches() {
        let html = r#"<html><body><p>Bienvenue</p></body></html>"#;
        assert_eq!(winner(html), None);
    }
}
