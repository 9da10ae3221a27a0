use std::collections::HashSet;

use crate::model::{CycleResult, Listing};

/// Listings of the current page not yet notified, plus every id on the page.
#[derive(Debug, Clone, Default)]
pub struct Diff {
    pub novel: Vec<Listing>,
    pub current_ids: HashSet<String>,
}

/// Owns the set of listing ids already delivered. Lives for the whole process,
/// grows only, and is never persisted.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    notified: HashSet<String>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only `Available` results produce a non-empty diff.
    pub fn diff(&self, result: &CycleResult) -> Diff {
        let listings = result.listings();
        let current_ids = listings.iter().map(|l| l.id.clone()).collect();
        let novel = listings
            .iter()
            .filter(|l| !self.notified.contains(&l.id))
            .cloned()
            .collect();
        Diff { novel, current_ids }
    }

    /// Mark every id of the page as delivered. Called once per cycle after a
    /// delivery that reached at least one recipient.
    pub fn commit(&mut self, ids: HashSet<String>) {
        self.notified.extend(ids);
    }

    pub fn len(&self) -> usize {
        self.notified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notified.is_empty()
    }
}
