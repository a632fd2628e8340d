//! Reconciliation pass: scrape every catalogued part, then write the diffs
//!
//! Scraping and writing are separate phases. Results are buffered for the
//! whole batch and only applied once it finishes, so the page session and
//! the database are never held at the same time.

use crate::config::{NavigatorSettings, SiteProfile};
use crate::database::{list_parts, rename_part, update_part, PartUpdate};
use crate::driver::PageDriver;
use crate::error::{PartsError, Result};
use crate::extraction::Extractor;
use crate::models::{CatalogItem, PartDiff, ScrapeResult};
use crate::navigation::Navigator;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Why an item produced no result this run
#[derive(Debug)]
pub enum SkipReason {
    /// Path could not be replayed, even after a retry
    Navigation(PartsError),
    /// Detail table could not be read, even after re-navigating
    Extraction(PartsError),
    /// Table was read but no row lists the part
    NotFound,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Navigation(e) => write!(f, "navigation failed: {}", e),
            SkipReason::Extraction(e) => write!(f, "extraction failed: {}", e),
            SkipReason::NotFound => write!(f, "part not listed"),
        }
    }
}

#[derive(Debug)]
pub struct SkippedItem {
    pub identifier: String,
    pub reason: SkipReason,
}

/// Everything gathered by one pass over the page
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub results: Vec<ScrapeResult>,
    pub skipped: Vec<SkippedItem>,
    /// The stop flag ended the batch before every item was visited
    pub stopped: bool,
}

/// Result of writing a batch back to the store
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub updated: usize,
    pub renamed: usize,
    /// Records whose only write was the date
    pub unchanged: usize,
    pub failures: Vec<(String, PartsError)>,
}

#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub batch: BatchOutcome,
    pub applied: ApplyReport,
}

/// Runs navigation and extraction over catalog items with one retry each
#[derive(Debug, Clone)]
pub struct Reconciler {
    navigator: Navigator,
    extractor: Extractor,
    stop: Option<Arc<AtomicBool>>,
}

impl Reconciler {
    pub fn new(profile: SiteProfile, settings: NavigatorSettings) -> Self {
        Self {
            navigator: Navigator::new(profile.clone(), settings),
            extractor: Extractor::new(profile, settings),
            stop: None,
        }
    }

    /// Check `flag` between items and end the batch once it is set.
    ///
    /// An item already in progress always runs to completion.
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    fn stop_requested(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Scrape every item in order; a failing item never aborts the batch
    pub fn scrape_batch<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        items: &[CatalogItem],
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for (i, item) in items.iter().enumerate() {
            if self.stop_requested() {
                log::warn!("Stop requested, ending batch after {} of {} items", i, items.len());
                outcome.stopped = true;
                break;
            }

            match self.scrape_item(driver, item) {
                Ok(result) => {
                    log::info!(
                        "Scraped {}: in stock: {}, price: {:?}, current MPN: {}",
                        result.queried_identifier,
                        result.in_stock,
                        result.price,
                        result.resolved_identifier
                    );
                    outcome.results.push(result);
                }
                Err(reason) => {
                    log::warn!("Skipping {}: {}", item.identifier, reason);
                    outcome.skipped.push(SkippedItem {
                        identifier: item.identifier.clone(),
                        reason,
                    });
                }
            }
        }

        outcome
    }

    /// Navigate to and extract one item.
    ///
    /// Navigation is retried once. A failed extraction re-navigates and is
    /// retried once. A missing row is not retried.
    pub fn scrape_item<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        item: &CatalogItem,
    ) -> std::result::Result<ScrapeResult, SkipReason> {
        self.navigate_with_retry(driver, item)
            .map_err(SkipReason::Navigation)?;

        let facts = match self.extractor.extract(driver, &item.identifier) {
            Ok(facts) => facts,
            Err(e) if e.is_transient() => {
                log::warn!("Reading {} failed, re-navigating: {}", item.identifier, e);
                self.navigator
                    .navigate(driver, &item.navigation_path)
                    .map_err(SkipReason::Navigation)?;
                self.extractor
                    .extract(driver, &item.identifier)
                    .map_err(SkipReason::Extraction)?
            }
            Err(e) => return Err(SkipReason::Extraction(e)),
        };

        facts
            .map(|f| ScrapeResult::from_facts(&item.identifier, f))
            .ok_or(SkipReason::NotFound)
    }

    fn navigate_with_retry<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        item: &CatalogItem,
    ) -> Result<()> {
        match self.navigator.navigate(driver, &item.navigation_path) {
            Err(e) if e.is_transient() => {
                log::warn!("Navigation for {} failed, retrying: {}", item.identifier, e);
                self.navigator.navigate(driver, &item.navigation_path)
            }
            other => other,
        }
    }
}

/// Write buffered results back to the store.
///
/// A failed write is recorded and the remaining results are still applied.
pub fn apply_results(
    conn: &mut Connection,
    items: &[CatalogItem],
    results: &[ScrapeResult],
    today: NaiveDate,
) -> ApplyReport {
    let by_mpn: HashMap<&str, &CatalogItem> = items
        .iter()
        .map(|item| (item.identifier.as_str(), item))
        .collect();
    let mut report = ApplyReport::default();

    for result in results {
        let item = by_mpn.get(result.queried_identifier.as_str()).copied();
        match apply_one(conn, item, result, today) {
            Ok(diff) => {
                if diff.rename.is_some() {
                    report.renamed += 1;
                }
                if diff.is_date_only() {
                    report.unchanged += 1;
                } else {
                    report.updated += 1;
                }
            }
            Err(e) => {
                log::error!("Failed to update part {}: {}", result.queried_identifier, e);
                report.failures.push((result.queried_identifier.clone(), e));
            }
        }
    }

    log::info!(
        "Applied {} results: {} updated ({} renamed), {} unchanged, {} failed",
        results.len(),
        report.updated,
        report.renamed,
        report.unchanged,
        report.failures.len()
    );
    report
}

fn apply_one(
    conn: &mut Connection,
    item: Option<&CatalogItem>,
    result: &ScrapeResult,
    today: NaiveDate,
) -> Result<PartDiff> {
    let diff = match item {
        Some(item) => PartDiff::between(item, result),
        None => PartDiff {
            rename: result
                .is_rename()
                .then(|| result.resolved_identifier.clone()),
            in_stock: Some(result.in_stock),
            price: result.price,
        },
    };

    let mut mpn = result.queried_identifier.as_str();
    if let Some(new_mpn) = diff.rename.as_deref() {
        rename_part(conn, mpn, new_mpn, today)?;
        mpn = new_mpn;
    }

    let update = PartUpdate {
        in_stock: diff.in_stock,
        price: diff.price,
    };
    update_part(conn, mpn, &update, today)?;
    Ok(diff)
}

/// Full pass: load the catalog, scrape it, then apply the results
pub fn reconcile<D: PageDriver + ?Sized>(
    driver: &mut D,
    conn: &mut Connection,
    reconciler: &Reconciler,
    today: NaiveDate,
) -> Result<ReconcileReport> {
    let items = list_parts(conn)?;
    log::info!("Reconciling {} parts", items.len());

    let batch = reconciler.scrape_batch(driver, &items);
    let applied = apply_results(conn, &items, &batch.results, today);

    Ok(ReconcileReport { batch, applied })
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
