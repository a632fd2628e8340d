//! Database operations for the parts catalog
//!
//! Uses parameterized queries exclusively (no SQL string concatenation).
//! Every mutation stamps `last_modified` with the caller's date.

use crate::error::{PartsError, Result};
use crate::models::{CatalogItem, NavigationPath};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

const PART_COLUMNS: &str =
    "mpn, in_stock, price, brand, navigation_path, listing_id, last_modified";

/// Initialize the database schema
///
/// `navigation_path` holds the recorded dropdown values as a JSON array.
/// `listing_id` links a part to its marketplace listing, if any.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS parts (
            mpn TEXT PRIMARY KEY,
            in_stock INTEGER NOT NULL,
            price REAL NOT NULL,
            brand TEXT NOT NULL,
            navigation_path TEXT NOT NULL,
            listing_id INTEGER DEFAULT NULL,
            last_modified TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_parts_listing ON parts(listing_id);
        ",
    )?;

    log::info!("Database schema initialized");
    Ok(())
}

/// Get today's date in local time
pub fn today_date() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<CatalogItem> {
    let path_json: String = row.get(4)?;
    let navigation_path: NavigationPath = serde_json::from_str(&path_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(CatalogItem {
        identifier: row.get(0)?,
        in_stock: row.get(1)?,
        price: row.get(2)?,
        brand: row.get(3)?,
        navigation_path,
        external_link_id: row.get(5)?,
        last_modified: row.get(6)?,
    })
}

fn check_price(price: f64) -> Result<()> {
    if price.is_finite() && price >= 0.0 {
        Ok(())
    } else {
        Err(PartsError::InvalidPrice(price))
    }
}

/// Insert a newly captured part
pub fn insert_part(conn: &Connection, item: &CatalogItem) -> Result<()> {
    check_price(item.price)?;
    let path_json = serde_json::to_string(&item.navigation_path)?;

    conn.execute(
        "INSERT INTO parts (mpn, in_stock, price, brand, navigation_path, listing_id, last_modified)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            &item.identifier,
            item.in_stock,
            item.price,
            &item.brand,
            path_json,
            item.external_link_id,
            item.last_modified,
        ],
    )?;

    log::info!("Part {} added", item.identifier);
    Ok(())
}

/// Look up a part by MPN
pub fn get_part(conn: &Connection, mpn: &str) -> Result<Option<CatalogItem>> {
    let sql = format!("SELECT {} FROM parts WHERE mpn = ?1", PART_COLUMNS);
    let item = conn
        .query_row(&sql, params![mpn], row_to_item)
        .optional()?;
    Ok(item)
}

/// All parts, ordered by MPN
///
/// A row that cannot be decoded is logged and left out, so one corrupt
/// record does not hide the rest of the catalog.
pub fn list_parts(conn: &Connection) -> Result<Vec<CatalogItem>> {
    let sql = format!("SELECT {} FROM parts ORDER BY mpn", PART_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;

    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        match row_to_item(row) {
            Ok(item) => items.push(item),
            Err(
                e @ (rusqlite::Error::FromSqlConversionFailure(..)
                | rusqlite::Error::InvalidColumnType(..)),
            ) => {
                let mpn: String = row.get(0).unwrap_or_default();
                log::warn!("Skipping unreadable part {}: {}", mpn, e);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(items)
}

/// Fields a reconciliation pass may change
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PartUpdate {
    pub in_stock: Option<bool>,
    pub price: Option<f64>,
}

/// Partially update a part; the date is always refreshed
pub fn update_part(conn: &Connection, mpn: &str, update: &PartUpdate, today: NaiveDate) -> Result<()> {
    if let Some(price) = update.price {
        check_price(price)?;
    }

    // COALESCE keeps the stored value for fields the update leaves out
    let changed = conn.execute(
        "UPDATE parts SET
             in_stock = COALESCE(?1, in_stock),
             price = COALESCE(?2, price),
             last_modified = ?3
         WHERE mpn = ?4",
        params![update.in_stock, update.price, today, mpn],
    )?;

    if changed == 0 {
        return Err(PartsError::PartNotFound(mpn.to_string()));
    }
    log::debug!("Part {} updated", mpn);
    Ok(())
}

/// Move a part to a new MPN, carrying every field except the date
///
/// Copy and delete run in one transaction. Fails if `new_mpn` is already
/// catalogued.
pub fn rename_part(conn: &mut Connection, old_mpn: &str, new_mpn: &str, today: NaiveDate) -> Result<()> {
    let tx = conn.transaction()?;
    let copied = tx.execute(
        "INSERT INTO parts (mpn, in_stock, price, brand, navigation_path, listing_id, last_modified)
         SELECT ?1, in_stock, price, brand, navigation_path, listing_id, ?2
         FROM parts WHERE mpn = ?3",
        params![new_mpn, today, old_mpn],
    )?;
    if copied == 0 {
        return Err(PartsError::PartNotFound(old_mpn.to_string()));
    }
    tx.execute("DELETE FROM parts WHERE mpn = ?1", params![old_mpn])?;
    tx.commit()?;

    log::info!("Part {} renamed to {}", old_mpn, new_mpn);
    Ok(())
}

/// Link a part to its marketplace listing
pub fn set_external_link(conn: &Connection, mpn: &str, listing_id: i64, today: NaiveDate) -> Result<()> {
    let changed = conn.execute(
        "UPDATE parts SET listing_id = ?1, last_modified = ?2 WHERE mpn = ?3",
        params![listing_id, today, mpn],
    )?;
    if changed == 0 {
        return Err(PartsError::PartNotFound(mpn.to_string()));
    }
    Ok(())
}

/// Remove one part; returns whether it existed
pub fn remove_part(conn: &Connection, mpn: &str) -> Result<bool> {
    let removed = conn.execute("DELETE FROM parts WHERE mpn = ?1", params![mpn])?;
    if removed > 0 {
        log::info!("Part {} removed", mpn);
    }
    Ok(removed > 0)
}

/// Remove every part; returns how many were deleted
pub fn delete_all_parts(conn: &Connection) -> Result<usize> {
    let removed = conn.execute("DELETE FROM parts", [])?;
    log::info!("Removed all {} parts", removed);
    Ok(removed)
}

/// Get total count of parts in database
pub fn part_count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM parts", [], |row| row.get(0))?)
}
