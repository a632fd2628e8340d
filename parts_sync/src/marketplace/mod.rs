//! Marketplace listing sync
//!
//! Live listings are matched to catalog parts through their manufacturer
//! part number, linked in the store, and re-priced from the stored cost.

pub mod ebay;

pub use ebay::{EbayCredentials, EbayTrading};

use crate::database::{get_part, set_external_link};
use crate::error::{PartsError, Result};
use crate::pricing::{listing_price, needs_revision};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;

/// An active listing on the marketplace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub external_id: i64,
    pub published_price: f64,
    /// Manufacturer part number recorded on the listing, if any
    pub identifier: Option<String>,
}

/// A price change to push to one listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRevision {
    pub external_id: i64,
    pub identifier: String,
    pub published_price: f64,
    pub new_price: f64,
}

/// A selling channel whose listings can be read and re-priced
pub trait Marketplace {
    fn list_active_listings(&self) -> Result<Vec<Listing>>;

    fn revise_price(&self, external_id: i64, new_price: f64) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct LinkReport {
    pub linked: usize,
    /// Listings without a manufacturer part number
    pub unlabeled: usize,
    /// Listings whose part number is not catalogued
    pub unknown: Vec<String>,
    /// Listings the store failed to link
    pub failures: Vec<(i64, PartsError)>,
}

/// Revisions to send, plus listings whose part could not be read
#[derive(Debug, Default)]
pub struct RevisionPlan {
    pub revisions: Vec<PriceRevision>,
    pub failures: Vec<(i64, PartsError)>,
}

#[derive(Debug, Default)]
pub struct RevisionReport {
    pub revised: usize,
    pub failures: Vec<(i64, PartsError)>,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub listings: usize,
    pub links: LinkReport,
    pub planned: RevisionPlan,
    /// `None` on a dry run
    pub applied: Option<RevisionReport>,
}

/// Store each listing's id on the part it sells
///
/// A store error on one listing is recorded and the rest are still linked.
pub fn link_listings(conn: &Connection, listings: &[Listing], today: NaiveDate) -> LinkReport {
    let mut report = LinkReport::default();

    for listing in listings {
        let Some(mpn) = listing.identifier.as_deref() else {
            log::warn!("Listing {} has no part number", listing.external_id);
            report.unlabeled += 1;
            continue;
        };

        match set_external_link(conn, mpn, listing.external_id, today) {
            Ok(()) => report.linked += 1,
            Err(PartsError::PartNotFound(_)) => {
                log::warn!("Listing {} sells unknown part {}", listing.external_id, mpn);
                report.unknown.push(mpn.to_string());
            }
            Err(e) => {
                log::error!("Failed to link listing {} to {}: {}", listing.external_id, mpn, e);
                report.failures.push((listing.external_id, e));
            }
        }
    }

    log::info!(
        "Linked {} listings ({} without part number, {} unknown, {} failed)",
        report.linked,
        report.unlabeled,
        report.unknown.len(),
        report.failures.len()
    );
    report
}

/// Work out which listings are priced differently from their stored cost
///
/// Parts without a known cost (price 0) are left alone. A part that cannot
/// be read is recorded against its listing and the others are still planned.
pub fn plan_revisions(conn: &Connection, listings: &[Listing]) -> RevisionPlan {
    let mut plan = RevisionPlan::default();

    for listing in listings {
        let Some(mpn) = listing.identifier.as_deref() else {
            continue;
        };
        let part = match get_part(conn, mpn) {
            Ok(Some(part)) => part,
            Ok(None) => continue,
            Err(e) => {
                log::error!("Failed to read part {} for listing {}: {}", mpn, listing.external_id, e);
                plan.failures.push((listing.external_id, e));
                continue;
            }
        };
        if part.price <= 0.0 {
            log::debug!("Part {} has no cost, not re-pricing", mpn);
            continue;
        }

        let new_price = listing_price(part.price);
        if needs_revision(listing.published_price, new_price) {
            log::info!(
                "Listing {} ({}): cost {:.2}, listed {:.2}, new {:.2}",
                listing.external_id,
                mpn,
                part.price,
                listing.published_price,
                new_price
            );
            plan.revisions.push(PriceRevision {
                external_id: listing.external_id,
                identifier: mpn.to_string(),
                published_price: listing.published_price,
                new_price,
            });
        }
    }

    plan
}

/// Push every revision; a rejected one is recorded and the rest still run
pub fn apply_revisions<M: Marketplace + ?Sized>(market: &M, revisions: &[PriceRevision]) -> RevisionReport {
    let mut report = RevisionReport::default();

    for revision in revisions {
        match market.revise_price(revision.external_id, revision.new_price) {
            Ok(()) => {
                log::info!(
                    "Listing {} re-priced to {:.2}",
                    revision.external_id,
                    revision.new_price
                );
                report.revised += 1;
            }
            Err(e) => {
                log::error!("Failed to re-price listing {}: {}", revision.external_id, e);
                report.failures.push((revision.external_id, e));
            }
        }
    }

    report
}

/// List, link, plan and (unless `dry_run`) apply in one go
pub fn sync_listing_prices<M: Marketplace + ?Sized>(
    market: &M,
    conn: &Connection,
    today: NaiveDate,
    dry_run: bool,
) -> Result<SyncReport> {
    let listings = market.list_active_listings()?;
    log::info!("Found {} active listings", listings.len());

    let links = link_listings(conn, &listings, today);
    let planned = plan_revisions(conn, &listings);

    let applied = if dry_run {
        log::info!("Dry run: {} revisions not sent", planned.revisions.len());
        None
    } else {
        Some(apply_revisions(market, &planned.revisions))
    };

    Ok(SyncReport {
        listings: listings.len(),
        links,
        planned,
        applied,
    })
}
