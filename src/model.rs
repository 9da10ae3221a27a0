use chrono::{DateTime, Local};
use serde::Serialize;

/// Raw markup of one fetched page.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub url: String,
    pub body: String,
    pub fetched_at: DateTime<Local>,
}

/// One housing offer extracted from a markup fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub id: String,
    pub kind: String,
    pub location: String,
    pub rent: String,
    pub source_url: String,
    pub observed_at: DateTime<Local>,
}

/// Outcome of running the extractor over one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleResult {
    /// Never empty; build through [`CycleResult::available`].
    Available(Vec<Listing>),
    ConfirmedEmpty,
    Indeterminate { note: String },
}

impl CycleResult {
    pub fn available(listings: Vec<Listing>) -> Option<Self> {
        if listings.is_empty() {
            None
        } else {
            Some(CycleResult::Available(listings))
        }
    }

    pub fn listings(&self) -> &[Listing] {
        match self {
            CycleResult::Available(listings) => listings,
            _ => &[],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CycleResult::Available(_) => "available",
            CycleResult::ConfirmedEmpty => "confirmed-empty",
            CycleResult::Indeterminate { .. } => "indeterminate",
        }
    }
}

/// Telegram chat id, kept opaque.
pub type Recipient = String;

/// Result of sending one message to every configured recipient.
#[derive(Debug, Clone, Default)]
pub struct DeliveryOutcome {
    pub success_count: usize,
    pub total: usize,
    pub failures: Vec<(Recipient, String)>,
}

impl DeliveryOutcome {
    /// At least one recipient accepted the message.
    pub fn is_success(&self) -> bool {
        self.success_count >= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_rejects_empty() {
        assert!(CycleResult::available(Vec::new()).is_none());
    }

    #[test]
    fn outcome_success_needs_one_recipient() {
        let none = DeliveryOutcome { success_count: 0, total: 2, failures: Vec::new() };
        let one = DeliveryOutcome { success_count: 1, total: 3, failures: Vec::new() };
        assert!(!none.is_success());
        assert!(one.is_success());
    }
}
