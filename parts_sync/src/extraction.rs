//! Reads stock, price and current part number from the detail table

use crate::config::{NavigatorSettings, SiteProfile};
use crate::driver::PageDriver;
use crate::error::{PartsError, Result};
use crate::models::PartFacts;
use lazy_static::lazy_static;
use regex::Regex;

/// Text the status cell carries for stocked parts
const IN_STOCK_MARKER: &str = "In-Stock";

lazy_static! {
    static ref REPLACES_RE: Regex = Regex::new(r"replaces part #\s*([\w-]+)").unwrap();
}

/// Pull the superseded part number out of a "replaces part #" annotation
pub fn parse_replaced_identifier(text: &str) -> Option<String> {
    REPLACES_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parse a price cell such as `$1,234.50`.
///
/// Placeholders, blanks and anything that is not a finite non-negative
/// number come back as `None`.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p >= 0.0)
}

/// Looks up a part on the currently displayed detail table
#[derive(Debug, Clone)]
pub struct Extractor {
    profile: SiteProfile,
    settings: NavigatorSettings,
}

impl Extractor {
    pub fn new(profile: SiteProfile, settings: NavigatorSettings) -> Self {
        Self { profile, settings }
    }

    /// Find the row listing `identifier`, directly or as a superseded number.
    ///
    /// Returns `Ok(None)` when the table is present but no row matches, and
    /// `PartsError::TableMissing` when the table has not rendered.
    pub fn extract<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        identifier: &str,
    ) -> Result<Option<PartFacts>> {
        driver.pause(self.settings.select_settle);
        if !driver.is_visible(&self.profile.detail_table) {
            return Err(PartsError::TableMissing);
        }

        let rows = driver.count(&self.profile.detail_rows())?;
        log::debug!("Detail table has {} rows", rows);

        for n in 1..=rows {
            match self.read_row(driver, n, identifier) {
                Ok(Some(facts)) => return Ok(Some(facts)),
                Ok(None) => {}
                Err(e) => log::debug!("Skipping row {}: {}", n, e),
            }
        }

        Ok(None)
    }

    fn read_row<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        n: usize,
        identifier: &str,
    ) -> Result<Option<PartFacts>> {
        let row = self.profile.detail_row(n);
        let primary = driver
            .read_text(&format!("{} td.partNum span", row))?
            .trim()
            .to_string();
        let replaced = driver
            .read_text(&format!("{} td.partNum p", row))
            .ok()
            .and_then(|text| parse_replaced_identifier(&text));

        if identifier != primary && replaced.as_deref() != Some(identifier) {
            return Ok(None);
        }
        if identifier != primary {
            log::info!("{} is superseded by {}", identifier, primary);
        }

        let status = driver.read_text(&format!("{} td.status", row))?;
        let our_price = driver
            .read_text(&format!("{} td.ourPrice", row))
            .ok()
            .and_then(|t| parse_price(&t));
        let price = match our_price {
            Some(p) => Some(p),
            None => driver
                .read_text(&format!("{} td.regPrice", row))
                .ok()
                .and_then(|t| parse_price(&t)),
        };

        Ok(Some(PartFacts {
            identifier: primary,
            in_stock: status.contains(IN_STOCK_MARKER),
            price,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakePage, FakeRow};

    fn extractor() -> Extractor {
        Extractor::new(SiteProfile::default(), NavigatorSettings::immediate())
    }

    /// A page already sitting on schematic "7133"
    fn page_with(rows: Vec<FakeRow>) -> FakePage {
        let profile = SiteProfile::default();
        let schematic = profile.schematic_control.clone();
        let mut page = FakePage::new(profile).with_table("7133", rows);
        page.select(&schematic, "7133").unwrap();
        page
    }

    #[test]
    fn parse_price_strips_currency_and_separators() {
        assert_eq!(parse_price("$1,234.50"), Some(1234.50));
        assert_eq!(parse_price(" $19.99 "), Some(19.99));
        assert_eq!(parse_price("42"), Some(42.0));
    }

    #[test]
    fn parse_price_placeholders_are_none() {
        assert_eq!(parse_price("-"), None);
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("   "), None);
        assert_eq!(parse_price("$"), None);
        assert_eq!(parse_price("Call for price"), None);
        assert_eq!(parse_price("-5.00"), None);
        assert_eq!(parse_price("NaN"), None);
    }

    #[test]
    fn parse_replaced_identifier_reads_annotation() {
        assert_eq!(
            parse_replaced_identifier("replaces part # 0470-877"),
            Some("0470-877".to_string())
        );
        assert_eq!(
            parse_replaced_identifier("Note: replaces part #ABC_12"),
            Some("ABC_12".to_string())
        );
        assert_eq!(parse_replaced_identifier("superseded"), None);
        assert_eq!(parse_replaced_identifier(""), None);
    }

    #[test]
    fn extracts_matching_row() {
        let mut page = page_with(vec![
            FakeRow::new("0470-100", "In-Stock", "$5.00", "$6.00"),
            FakeRow::new("0470-877", "In-Stock", "$19.99", "$24.99"),
        ]);

        let facts = extractor().extract(&mut page, "0470-877").unwrap().unwrap();
        assert_eq!(facts.identifier, "0470-877");
        assert!(facts.in_stock);
        assert_eq!(facts.price, Some(19.99));
    }

    #[test]
    fn out_of_stock_when_marker_missing() {
        let mut page = page_with(vec![FakeRow::new(
            "0470-877",
            "Special Order",
            "$19.99",
            "$24.99",
        )]);

        let facts = extractor().extract(&mut page, "0470-877").unwrap().unwrap();
        assert!(!facts.in_stock);
    }

    #[test]
    fn supersession_resolves_to_primary_identifier() {
        let mut page = page_with(vec![
            FakeRow::new("0470-999", "In-Stock", "$21.49", "$25.00").replacing("0470-877")
        ]);

        let facts = extractor().extract(&mut page, "0470-877").unwrap().unwrap();
        assert_eq!(facts.identifier, "0470-999");
        assert_eq!(facts.price, Some(21.49));
    }

    #[test]
    fn falls_back_to_list_price() {
        let mut page = page_with(vec![FakeRow::new("0470-877", "In-Stock", "-", "$1,024.99")]);

        let facts = extractor().extract(&mut page, "0470-877").unwrap().unwrap();
        assert_eq!(facts.price, Some(1024.99));
    }

    #[test]
    fn missing_prices_degrade_to_none() {
        let mut row = FakeRow::new("0470-877", "In-Stock", "", "-");
        row.our_price = None;
        let mut page = page_with(vec![row]);

        let facts = extractor().extract(&mut page, "0470-877").unwrap().unwrap();
        assert_eq!(facts.price, None);
    }

    #[test]
    fn unreadable_row_does_not_stop_scan() {
        let broken = FakeRow {
            part: None,
            ..FakeRow::default()
        };
        let mut page = page_with(vec![
            broken,
            FakeRow::new("0470-877", "In-Stock", "$19.99", "$24.99"),
        ]);

        let facts = extractor().extract(&mut page, "0470-877").unwrap();
        assert!(facts.is_some());
    }

    #[test]
    fn matched_row_without_status_is_skipped() {
        let mut row = FakeRow::new("0470-877", "", "$19.99", "$24.99");
        row.status = None;
        let mut page = page_with(vec![row]);

        assert_eq!(extractor().extract(&mut page, "0470-877").unwrap(), None);
    }

    #[test]
    fn no_match_is_not_found() {
        let mut page = page_with(vec![FakeRow::new("0470-100", "In-Stock", "$5.00", "$6.00")]);

        assert_eq!(extractor().extract(&mut page, "0470-877").unwrap(), None);
    }

    #[test]
    fn missing_table_fails() {
        let mut page = FakePage::new(SiteProfile::default());

        let err = extractor().extract(&mut page, "0470-877").unwrap_err();
        assert!(matches!(err, PartsError::TableMissing));
    }
}
