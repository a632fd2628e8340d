//! Catalog records and the ephemeral facts produced while scraping them

use crate::error::{PartsError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Recorded dropdown selections leading to a part's detail table.
///
/// Position 0 is the brand, the last position is the parts schematic, and
/// everything in between feeds the refinement controls in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct NavigationPath(Vec<String>);

impl NavigationPath {
    pub fn new(steps: Vec<String>) -> Result<Self> {
        if steps.is_empty() {
            return Err(PartsError::EmptyPath);
        }
        Ok(Self(steps))
    }

    pub fn brand(&self) -> &str {
        &self.0[0]
    }

    /// Selections between the brand and the schematic
    pub fn refinements(&self) -> &[String] {
        if self.0.len() > 2 {
            &self.0[1..self.0.len() - 1]
        } else {
            &[]
        }
    }

    /// Terminal schematic selection, absent for brand-only paths
    pub fn schematic(&self) -> Option<&str> {
        if self.0.len() > 1 {
            self.0.last().map(String::as_str)
        } else {
            None
        }
    }

    pub fn steps(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<String>> for NavigationPath {
    type Error = PartsError;

    fn try_from(steps: Vec<String>) -> Result<Self> {
        Self::new(steps)
    }
}

impl From<NavigationPath> for Vec<String> {
    fn from(path: NavigationPath) -> Self {
        path.0
    }
}

/// A catalogued part, keyed by vendor part number
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogItem {
    pub identifier: String,
    pub in_stock: bool,
    pub price: f64,
    pub brand: String,
    pub navigation_path: NavigationPath,
    pub external_link_id: Option<i64>,
    pub last_modified: NaiveDate,
}

/// Builds the initial record for a freshly captured part.
///
/// Price stays at zero until the first reconciliation pass fills it in.
pub fn new_catalog_item(identifier: &str, path: NavigationPath, today: NaiveDate) -> CatalogItem {
    CatalogItem {
        identifier: identifier.to_string(),
        in_stock: true,
        price: 0.0,
        brand: path.brand().to_string(),
        navigation_path: path,
        external_link_id: None,
        last_modified: today,
    }
}

/// Stock and price facts read from a matching detail row
#[derive(Debug, Clone, PartialEq)]
pub struct PartFacts {
    /// Primary identifier listed on the row
    pub identifier: String,
    pub in_stock: bool,
    pub price: Option<f64>,
}

/// Outcome of scraping one catalog item
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeResult {
    pub queried_identifier: String,
    /// Differs from the queried identifier when the part was superseded
    pub resolved_identifier: String,
    pub in_stock: bool,
    pub price: Option<f64>,
}

impl ScrapeResult {
    pub fn from_facts(queried: &str, facts: PartFacts) -> Self {
        Self {
            queried_identifier: queried.to_string(),
            resolved_identifier: facts.identifier,
            in_stock: facts.in_stock,
            price: facts.price,
        }
    }

    pub fn is_rename(&self) -> bool {
        self.resolved_identifier != self.queried_identifier
    }
}

/// Writes needed to bring a stored record in line with a scrape.
///
/// The modification date is always touched, so an empty diff still
/// produces a write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartDiff {
    pub rename: Option<String>,
    pub in_stock: Option<bool>,
    pub price: Option<f64>,
}

impl PartDiff {
    pub fn between(item: &CatalogItem, result: &ScrapeResult) -> Self {
        let rename = result
            .is_rename()
            .then(|| result.resolved_identifier.clone());
        let in_stock = (item.in_stock != result.in_stock).then_some(result.in_stock);
        let price = result
            .price
            .filter(|p| (p - item.price).abs() >= 0.005);
        Self {
            rename,
            in_stock,
            price,
        }
    }

    /// True when only the date needs touching
    pub fn is_date_only(&self) -> bool {
        self.rename.is_none() && self.in_stock.is_none() && self.price.is_none()
    }
}
