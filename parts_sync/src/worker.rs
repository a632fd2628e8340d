//! Background batch worker
//!
//! Owns the page session on its own OS thread and runs one reconciliation
//! pass per trigger request. The store is only locked while the catalog is
//! read and while results are written, never during scraping.

use crate::database::{list_parts, today_date};
use crate::driver::PageDriver;
use crate::error::Result;
use crate::marketplace::{apply_revisions, link_listings, plan_revisions, Marketplace};
use crate::reconcile::{apply_results, Reconciler};
use crate::trigger::ScrapeRequests;
use rusqlite::Connection;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub type SharedStatus = Arc<Mutex<WorkerStatus>>;

/// What the control surface reports about the worker
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkerStatus {
    pub running: bool,
    pub runs: u64,
    pub last_run: Option<RunSummary>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub finished_at: String,
    pub scraped: usize,
    pub skipped: usize,
    pub updated: usize,
    pub renamed: usize,
    pub failed: usize,
    pub stopped: bool,
    /// Listings re-priced afterwards, when a marketplace is configured
    pub revised: Option<usize>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Worker<D> {
    driver: D,
    db: Arc<Mutex<Connection>>,
    reconciler: Reconciler,
    status: SharedStatus,
    market: Option<Box<dyn Marketplace + Send>>,
}

impl<D: PageDriver> Worker<D> {
    pub fn new(
        driver: D,
        db: Arc<Mutex<Connection>>,
        reconciler: Reconciler,
        status: SharedStatus,
    ) -> Self {
        Self {
            driver,
            db,
            reconciler,
            status,
            market: None,
        }
    }

    /// Re-price listings after every pass
    pub fn with_marketplace(mut self, market: Box<dyn Marketplace + Send>) -> Self {
        self.market = Some(market);
        self
    }

    /// Serve requests until every trigger is dropped
    pub fn run(mut self, mut requests: ScrapeRequests) {
        log::info!("Worker waiting for scrape requests");

        while requests.wait() {
            lock(&self.status).running = true;
            let outcome = self.run_once();

            let mut status = lock(&self.status);
            status.running = false;
            status.runs += 1;
            match outcome {
                Ok(summary) => {
                    status.last_run = Some(summary);
                    status.last_error = None;
                }
                Err(e) => {
                    log::error!("Scrape run failed: {}", e);
                    status.last_error = Some(e.to_string());
                }
            }
        }

        log::info!("Scrape trigger closed, worker exiting");
    }

    /// One full pass: read catalog, scrape, apply, then re-price
    pub fn run_once(&mut self) -> Result<RunSummary> {
        let items = list_parts(&lock(&self.db))?;
        log::info!("Worker scraping {} parts", items.len());

        let batch = self.reconciler.scrape_batch(&mut self.driver, &items);
        let today = today_date();
        let applied = apply_results(&mut lock(&self.db), &items, &batch.results, today);

        let revised = match &self.market {
            Some(market) => match self.reprice(market.as_ref(), today) {
                Ok(revised) => Some(revised),
                Err(e) => {
                    log::error!("Listing price sync failed: {}", e);
                    None
                }
            },
            None => None,
        };

        Ok(RunSummary {
            finished_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            scraped: batch.results.len(),
            skipped: batch.skipped.len(),
            updated: applied.updated,
            renamed: applied.renamed,
            failed: applied.failures.len(),
            stopped: batch.stopped,
            revised,
        })
    }

    fn reprice(&self, market: &dyn Marketplace, today: chrono::NaiveDate) -> Result<usize> {
        let listings = market.list_active_listings()?;
        let revisions = {
            let conn = lock(&self.db);
            link_listings(&conn, &listings, today);
            plan_revisions(&conn, &listings).revisions
        };
        Ok(apply_revisions(market, &revisions).revised)
    }
}
