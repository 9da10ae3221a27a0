use std::fmt;

use anyhow::Context;
use tracing::{error, info, warn};

use crate::extract::{self, ExtractConfig};
use crate::fetch::PageSource;
use crate::model::{CycleResult, DeliveryOutcome, Listing};
use crate::notify::{Notifier, Transport};
use crate::tracker::ChangeTracker;

/// What one pass over the listings page ended with.
#[derive(Debug)]
pub enum CycleReport {
    FetchFailed { reason: String },
    Empty,
    Indeterminate { note: String },
    AlreadyNotified { total: usize },
    Delivered { novel: Vec<Listing>, outcome: DeliveryOutcome },
    DeliveryFailed { novel: Vec<Listing>, outcome: DeliveryOutcome },
    DryRun { novel: Vec<Listing>, message: String },
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleReport::FetchFailed { reason } => write!(f, "fetch failed: {}", reason),
            CycleReport::Empty => write!(f, "no rooms available"),
            CycleReport::Indeterminate { note } => write!(f, "indeterminate page ({})", note),
            CycleReport::AlreadyNotified { total } => {
                write!(f, "no new rooms ({} already notified)", total)
            }
            CycleReport::Delivered { novel, outcome } => write!(
                f,
                "{} new rooms sent to {}/{} recipients",
                novel.len(),
                outcome.success_count,
                outcome.total
            ),
            CycleReport::DeliveryFailed { novel, outcome } => write!(
                f,
                "{} new rooms, delivery failed for all {} recipients ({})",
                novel.len(),
                outcome.total,
                outcome.failures.first().map(|(_, e)| e.as_str()).unwrap_or("no recipients")
            ),
            CycleReport::DryRun { novel, .. } => write!(f, "{} new rooms (dry run, nothing sent)", novel.len()),
        }
    }
}

/// Fetch → extract → diff → notify, once per call. Holds the only
/// cross-cycle state: the tracker of delivered ids.
pub struct Watcher<S, T> {
    source: S,
    notifier: Notifier<T>,
    tracker: ChangeTracker,
    url: String,
    extract_config: ExtractConfig,
    dry_run: bool,
}

impl<S: PageSource, T: Transport> Watcher<S, T> {
    pub fn new(source: S, notifier: Notifier<T>, url: String, extract_config: ExtractConfig) -> Self {
        Self {
            source,
            notifier,
            tracker: ChangeTracker::new(),
            url,
            extract_config,
            dry_run: false,
        }
    }

    /// Render messages instead of sending them; nothing is committed.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn notifier(&self) -> &Notifier<T> {
        &self.notifier
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    pub async fn run_cycle(&mut self) -> anyhow::Result<CycleReport> {
        let page = match self.source.fetch(&self.url).await {
            Ok(page) => page,
            Err(e) => {
                error!(url = %self.url, "Failed to fetch listings page: {}", e);
                return Ok(CycleReport::FetchFailed { reason: e.to_string() });
            }
        };

        let config = self.extract_config.clone();
        let result = tokio::task::spawn_blocking(move || extract::extract(&page, &config))
            .await
            .context("listing extraction did not complete")?;

        let diff = match &result {
            CycleResult::ConfirmedEmpty => {
                info!("No rooms available");
                return Ok(CycleReport::Empty);
            }
            CycleResult::Indeterminate { note } => {
                warn!("Page could not be classified: {}", note);
                return Ok(CycleReport::Indeterminate { note: note.clone() });
            }
            CycleResult::Available(listings) => {
                let diff = self.tracker.diff(&result);
                if diff.novel.is_empty() {
                    info!("No new rooms ({} already notified)", listings.len());
                    return Ok(CycleReport::AlreadyNotified { total: listings.len() });
                }
                diff
            }
        };

        info!("Found {} new rooms!", diff.novel.len());

        if self.dry_run {
            let message = self.notifier.render(&diff.novel);
            return Ok(CycleReport::DryRun { novel: diff.novel, message });
        }

        let outcome = self.notifier.notify(&diff.novel).await;
        if outcome.is_success() {
            self.tracker.commit(diff.current_ids);
            Ok(CycleReport::Delivered { novel: diff.novel, outcome })
        } else {
            warn!("Nothing delivered, {} rooms will be offered again", diff.novel.len());
            Ok(CycleReport::DeliveryFailed { novel: diff.novel, outcome })
        }
    }
}
