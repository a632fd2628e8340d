//! Parts Sync - OEM Parts Catalog Navigation & Reconciliation
//!
//! Captures parts from the OEM parts finder, refreshes their stock and
//! prices by replaying recorded paths, and re-prices eBay listings.

use clap::{Parser, Subcommand};
use parts_sync::config::{DEFAULT_SITE_URL, DEFAULT_WEBDRIVER_URL};
use parts_sync::marketplace::SyncReport;
use parts_sync::{
    capture_path, default_db_path, delete_all_parts, get_part, init_schema, insert_part,
    list_parts, new_catalog_item, part_count, reconcile, remove_part, scrape_signal,
    sync_listing_prices, today_date, web, EbayCredentials, EbayTrading, NavigatorSettings,
    PageDriver, PartsError, Reconciler, Result, SharedStatus, SiteProfile, WebDriverOptions,
    WebDriverSession, Worker,
};
use rusqlite::Connection;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

/// OEM parts catalog sync - stock, prices and marketplace listings
#[derive(Parser, Debug)]
#[command(name = "parts_sync")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, global = true, default_value_t = default_db_path())]
    database: String,

    /// WebDriver server (chromedriver) to drive the browser through
    #[arg(long, global = true, default_value = DEFAULT_WEBDRIVER_URL)]
    webdriver_url: String,

    /// Parts finder base URL; brand pages live directly beneath it
    #[arg(long, global = true, default_value = DEFAULT_SITE_URL)]
    site_url: String,

    /// Run the browser without a window
    #[arg(long, global = true, default_value_t = false)]
    headless: bool,

    #[command(flatten)]
    ebay: EbayArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct EbayArgs {
    #[arg(long, env = "EBAY_APP_ID", hide_env_values = true)]
    ebay_app_id: Option<String>,

    #[arg(long, env = "EBAY_DEV_ID", hide_env_values = true)]
    ebay_dev_id: Option<String>,

    #[arg(long, env = "EBAY_CERT_ID", hide_env_values = true)]
    ebay_cert_id: Option<String>,

    #[arg(long, env = "EBAY_TOKEN", hide_env_values = true)]
    ebay_token: Option<String>,
}

impl EbayArgs {
    /// Credentials when all four keys are set
    fn credentials(&self) -> Option<EbayCredentials> {
        Some(EbayCredentials {
            app_id: self.ebay_app_id.clone()?,
            dev_id: self.ebay_dev_id.clone()?,
            cert_id: self.ebay_cert_id.clone()?,
            token: self.ebay_token.clone()?,
        })
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database schema
    Init,
    /// Record a part: navigate to its schematic in the browser, then press Enter
    Add { mpn: String },
    /// Show one part
    Find { mpn: String },
    /// Show every part
    List,
    /// Delete one part
    Remove { mpn: String },
    /// Delete every part
    Clear {
        /// Confirm deleting the whole catalog
        #[arg(long)]
        yes: bool,
    },
    /// Refresh stock and prices for every part
    Update,
    /// Link eBay listings to parts and re-price them
    SyncPrices {
        /// Show the planned revisions without sending them
        #[arg(long)]
        dry_run: bool,
    },
    /// Run the control surface with a background scrape worker
    Serve {
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let conn = open_database(&args.database)?;
    let profile = SiteProfile::with_base_url(&args.site_url);

    match &args.command {
        Command::Init => {
            log::info!("Database ready with {} parts", part_count(&conn)?);
            Ok(())
        }
        Command::Add { mpn } => add_part(args, &conn, &profile, mpn),
        Command::Find { mpn } => {
            match get_part(&conn, mpn)? {
                Some(part) => {
                    println!("MPN:        {}", part.identifier);
                    println!("Brand:      {}", part.brand);
                    println!("In stock:   {}", part.in_stock);
                    println!("Price:      {:.2}", part.price);
                    println!("Path:       {}", part.navigation_path.steps().join(" > "));
                    if let Some(id) = part.external_link_id {
                        println!("Listing:    {}", id);
                    }
                    println!("Updated:    {}", part.last_modified);
                }
                None => println!("Part {} not found", mpn),
            }
            Ok(())
        }
        Command::List => {
            let parts = list_parts(&conn)?;
            for part in &parts {
                println!(
                    "{:<20} {:<14} {:<6} {:>9.2} {:>14} {}",
                    part.identifier,
                    part.brand,
                    if part.in_stock { "yes" } else { "no" },
                    part.price,
                    part.external_link_id.map(|id| id.to_string()).unwrap_or_default(),
                    part.last_modified
                );
            }
            println!("{} parts", parts.len());
            Ok(())
        }
        Command::Remove { mpn } => {
            if !remove_part(&conn, mpn)? {
                println!("Part {} not found", mpn);
            }
            Ok(())
        }
        Command::Clear { yes } => {
            if !yes {
                return Err(PartsError::Config(
                    "clearing deletes every part; pass --yes to confirm".to_string(),
                ));
            }
            delete_all_parts(&conn)?;
            Ok(())
        }
        Command::Update => update(args, conn, profile),
        Command::SyncPrices { dry_run } => {
            let credentials = args.ebay.credentials().ok_or_else(|| {
                PartsError::Config(
                    "EBAY_APP_ID, EBAY_DEV_ID, EBAY_CERT_ID and EBAY_TOKEN must be set".to_string(),
                )
            })?;
            let market = EbayTrading::new(credentials)?;
            let report = sync_listing_prices(&market, &conn, today_date(), *dry_run)?;
            print_sync_report(&report);
            Ok(())
        }
        Command::Serve { port } => serve(args, conn, profile, *port),
    }
}

/// Open the database, creating its directory and schema when missing
fn open_database(path: &str) -> Result<Connection> {
    let db_path = PathBuf::from(path);
    log::info!("Database path: {}", db_path.display());

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            log::info!("Created directory: {}", parent.display());
        }
    }

    let conn = Connection::open(&db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

fn start_browser(args: &Args) -> Result<WebDriverSession> {
    let options = WebDriverOptions {
        headless: args.headless,
        ..WebDriverOptions::default()
    };
    WebDriverSession::start(&args.webdriver_url, &options)
}

fn add_part(args: &Args, conn: &Connection, profile: &SiteProfile, mpn: &str) -> Result<()> {
    if get_part(conn, mpn)?.is_some() {
        println!("Part {} is already catalogued", mpn);
        return Ok(());
    }

    let mut browser = start_browser(args)?;
    browser.load(&profile.base_url)?;

    print!("Navigate to the schematic listing {} and press Enter...", mpn);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;

    let path = capture_path(&mut browser, profile)?;
    let item = new_catalog_item(mpn, path, today_date());
    insert_part(conn, &item)?;
    println!(
        "Added {} ({}): {}",
        item.identifier,
        item.brand,
        item.navigation_path.steps().join(" > ")
    );
    Ok(())
}

fn update(args: &Args, mut conn: Connection, profile: SiteProfile) -> Result<()> {
    let mut browser = start_browser(args)?;
    let reconciler = Reconciler::new(profile, NavigatorSettings::default());

    let report = reconcile(&mut browser, &mut conn, &reconciler, today_date())?;

    for skipped in &report.batch.skipped {
        println!("Skipped {}: {}", skipped.identifier, skipped.reason);
    }
    for (mpn, e) in &report.applied.failures {
        println!("Failed to update {}: {}", mpn, e);
    }
    println!(
        "{} scraped, {} skipped, {} updated ({} renamed), {} unchanged",
        report.batch.results.len(),
        report.batch.skipped.len(),
        report.applied.updated,
        report.applied.renamed,
        report.applied.unchanged
    );
    Ok(())
}

fn print_sync_report(report: &SyncReport) {
    for (id, e) in &report.links.failures {
        println!("Listing {} not linked: {}", id, e);
    }
    for (id, e) in &report.planned.failures {
        println!("Listing {} not planned: {}", id, e);
    }
    for revision in &report.planned.revisions {
        println!(
            "Listing {} ({}): {:.2} -> {:.2}",
            revision.external_id, revision.identifier, revision.published_price, revision.new_price
        );
    }
    println!(
        "{} listings, {} linked, {} unknown parts, {} revisions planned",
        report.listings,
        report.links.linked,
        report.links.unknown.len(),
        report.planned.revisions.len()
    );
    match &report.applied {
        Some(applied) => {
            for (id, e) in &applied.failures {
                println!("Listing {} not revised: {}", id, e);
            }
            println!("{} listings revised", applied.revised);
        }
        None => println!("Dry run, nothing sent"),
    }
}

fn serve(args: &Args, conn: Connection, profile: SiteProfile, port: u16) -> Result<()> {
    let db = Arc::new(Mutex::new(conn));
    let status = SharedStatus::default();
    let stop = Arc::new(AtomicBool::new(false));
    let (trigger, requests) = scrape_signal();

    // The browser and eBay clients are blocking, so both are built before the runtime
    let browser = start_browser(args)?;
    let reconciler = Reconciler::new(profile, NavigatorSettings::default()).with_stop_flag(stop.clone());
    let mut worker = Worker::new(browser, Arc::clone(&db), reconciler, status.clone());
    match args.ebay.credentials() {
        Some(credentials) => {
            worker = worker.with_marketplace(Box::new(EbayTrading::new(credentials)?));
            log::info!("Listings will be re-priced after each run");
        }
        None => log::info!("No eBay credentials, listing prices will not be synced"),
    }

    let worker_thread = thread::spawn(move || worker.run(requests));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let app = web::create_router(db, trigger, status);
    let served = runtime.block_on(web::serve(app, port));

    // Let an in-flight batch finish its current item, then exit
    stop.store(true, Ordering::SeqCst);
    if worker_thread.join().is_err() {
        log::error!("Scrape worker panicked");
    }

    served?;
    Ok(())
}
