//! Parts Sync - OEM Parts Catalog Navigation & Reconciliation
//!
//! Replays recorded dropdown paths on an OEM parts finder to refresh stock
//! and prices in a SQLite catalog, and re-prices marketplace listings from
//! the refreshed costs.

pub mod capture;
pub mod config;
pub mod database;
pub mod driver;
pub mod error;
pub mod extraction;
pub mod marketplace;
pub mod models;
pub mod navigation;
pub mod pricing;
pub mod reconcile;
pub mod trigger;
pub mod web;
pub mod webdriver;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use capture::capture_path;
pub use config::{default_db_path, NavigatorSettings, SiteProfile};
pub use database::{
    delete_all_parts, get_part, init_schema, insert_part, list_parts, part_count, remove_part,
    rename_part, set_external_link, today_date, update_part, PartUpdate,
};
pub use driver::PageDriver;
pub use error::{DriverError, PartsError, Result};
pub use extraction::Extractor;
pub use marketplace::{sync_listing_prices, EbayCredentials, EbayTrading, Listing, Marketplace};
pub use models::{new_catalog_item, CatalogItem, NavigationPath, ScrapeResult};
pub use navigation::Navigator;
pub use pricing::listing_price;
pub use reconcile::{apply_results, reconcile, Reconciler};
pub use trigger::{scrape_signal, ScrapeRequests, ScrapeTrigger};
pub use webdriver::{WebDriverOptions, WebDriverSession};
pub use worker::{SharedStatus, Worker, WorkerStatus};
