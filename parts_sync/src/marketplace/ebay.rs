//! eBay Trading API client
//!
//! Speaks the XML Trading API over a blocking HTTP client. Only the three
//! calls the price sync needs are implemented.

use super::{Listing, Marketplace};
use crate::error::{PartsError, Result};
use quick_xml::escape::escape;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

pub const DEFAULT_ENDPOINT: &str = "https://api.ebay.com/ws/api.dll";
const COMPATIBILITY_LEVEL: &str = "1193";
/// eBay US
const SITE_ID: &str = "0";
const ENTRIES_PER_PAGE: u32 = 100;
const PART_NUMBER_SPECIFIC: &str = "manufacturer part number";

/// Keys issued for the seller's developer account
#[derive(Debug, Clone)]
pub struct EbayCredentials {
    pub app_id: String,
    pub dev_id: String,
    pub cert_id: String,
    pub token: String,
}

// ── Response shapes ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AckHeader {
    ack: String,
    #[serde(default)]
    errors: Vec<ApiErrorEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiErrorEntry {
    short_message: Option<String>,
    long_message: Option<String>,
    error_code: Option<String>,
    severity_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MyeBaySellingResponse {
    active_list: Option<ActiveList>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ActiveList {
    item_array: Option<ItemArray>,
    pagination_result: Option<PaginationResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ItemArray {
    #[serde(default)]
    item: Vec<SummaryItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SummaryItem {
    #[serde(rename = "ItemID")]
    item_id: i64,
    selling_status: Option<SellingStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SellingStatus {
    current_price: Amount,
}

#[derive(Debug, Deserialize)]
struct Amount {
    #[serde(rename = "$text")]
    value: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PaginationResult {
    total_number_of_pages: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetItemResponse {
    item: Option<ItemDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ItemDetail {
    item_specifics: Option<ItemSpecifics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ItemSpecifics {
    #[serde(default)]
    name_value_list: Vec<NameValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NameValue {
    name: String,
    #[serde(default)]
    value: Vec<String>,
}

impl ItemDetail {
    fn part_number(&self) -> Option<String> {
        self.item_specifics
            .as_ref()?
            .name_value_list
            .iter()
            .find(|spec| spec.name.trim().eq_ignore_ascii_case(PART_NUMBER_SPECIFIC))?
            .value
            .first()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Turn a Failure acknowledgement into an error; warnings are only logged
fn check_ack(call_name: &str, xml: &str) -> Result<()> {
    let header: AckHeader = quick_xml::de::from_str(xml)?;
    let first_error = header
        .errors
        .iter()
        .find(|e| e.severity_code.as_deref() != Some("Warning"));

    match header.ack.as_str() {
        "Success" => Ok(()),
        "Warning" => {
            for e in &header.errors {
                log::warn!(
                    "{} warning: {}",
                    call_name,
                    e.short_message.as_deref().unwrap_or_default()
                );
            }
            Ok(())
        }
        _ => Err(PartsError::Marketplace {
            code: first_error
                .and_then(|e| e.error_code.clone())
                .unwrap_or_else(|| header.ack.clone()),
            message: first_error
                .and_then(|e| e.long_message.clone().or_else(|| e.short_message.clone()))
                .unwrap_or_else(|| format!("{} failed", call_name)),
        }),
    }
}

/// Trading API session for one seller account
pub struct EbayTrading {
    client: Client,
    endpoint: String,
    credentials: EbayCredentials,
}

impl EbayTrading {
    pub fn new(credentials: EbayCredentials) -> Result<Self> {
        Self::with_endpoint(credentials, DEFAULT_ENDPOINT)
    }

    /// Client for a different endpoint (sandbox or a mock server)
    pub fn with_endpoint(credentials: EbayCredentials, endpoint: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            credentials,
        })
    }

    fn call<T: DeserializeOwned>(&self, call_name: &str, body: &str) -> Result<T> {
        let request = format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<{call}Request xmlns="urn:ebay:apis:eBLBaseComponents">
<RequesterCredentials><eBayAuthToken>{token}</eBayAuthToken></RequesterCredentials>
{body}
</{call}Request>"#,
            call = call_name,
            token = escape(self.credentials.token.as_str()),
            body = body,
        );

        log::debug!("Calling {}", call_name);
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "text/xml")
            .header("X-EBAY-API-COMPATIBILITY-LEVEL", COMPATIBILITY_LEVEL)
            .header("X-EBAY-API-SITEID", SITE_ID)
            .header("X-EBAY-API-CALL-NAME", call_name)
            .header("X-EBAY-API-APP-NAME", &self.credentials.app_id)
            .header("X-EBAY-API-DEV-NAME", &self.credentials.dev_id)
            .header("X-EBAY-API-CERT-NAME", &self.credentials.cert_id)
            .body(request)
            .send()?;

        if !response.status().is_success() {
            return Err(PartsError::HttpStatus(response.status()));
        }

        let xml = response.text()?;
        check_ack(call_name, &xml)?;
        Ok(quick_xml::de::from_str(&xml)?)
    }

    fn active_listings_page(&self, page: u32) -> Result<(Vec<SummaryItem>, u32)> {
        let body = format!(
            "<ActiveList><Include>true</Include><Pagination>\
             <EntriesPerPage>{}</EntriesPerPage><PageNumber>{}</PageNumber>\
             </Pagination></ActiveList><DetailLevel>ReturnAll</DetailLevel>",
            ENTRIES_PER_PAGE, page
        );
        let response: MyeBaySellingResponse = self.call("GetMyeBaySelling", &body)?;

        let Some(active) = response.active_list else {
            return Ok((Vec::new(), 0));
        };
        let total_pages = active
            .pagination_result
            .map_or(1, |p| p.total_number_of_pages);
        let items = active.item_array.map(|a| a.item).unwrap_or_default();
        Ok((items, total_pages))
    }

    /// The listing's "Manufacturer Part Number" item specific
    pub fn part_number(&self, external_id: i64) -> Result<Option<String>> {
        let body = format!(
            "<ItemID>{}</ItemID><DetailLevel>ReturnAll</DetailLevel>\
             <IncludeItemSpecifics>true</IncludeItemSpecifics>",
            external_id
        );
        let response: GetItemResponse = self.call("GetItem", &body)?;
        Ok(response.item.and_then(|item| item.part_number()))
    }
}

impl Marketplace for EbayTrading {
    fn list_active_listings(&self) -> Result<Vec<Listing>> {
        let mut listings = Vec::new();
        let mut page = 1;

        loop {
            let (items, total_pages) = self.active_listings_page(page)?;
            if items.is_empty() {
                break;
            }

            for item in items {
                let identifier = match self.part_number(item.item_id) {
                    Ok(mpn) => mpn,
                    Err(e) => {
                        log::warn!("Failed to fetch details for listing {}: {}", item.item_id, e);
                        None
                    }
                };
                listings.push(Listing {
                    external_id: item.item_id,
                    published_price: item
                        .selling_status
                        .map_or(0.0, |s| s.current_price.value),
                    identifier,
                });
            }

            if page >= total_pages {
                break;
            }
            page += 1;
        }

        log::info!("Fetched {} active listings", listings.len());
        Ok(listings)
    }

    fn revise_price(&self, external_id: i64, new_price: f64) -> Result<()> {
        let body = format!(
            "<Item><ItemID>{}</ItemID><StartPrice>{:.2}</StartPrice></Item>",
            external_id, new_price
        );
        self.call::<AckHeader>("ReviseFixedPriceItem", &body)?;
        log::info!("Listing {} revised to {:.2}", external_id, new_price);
        Ok(())
    }
}

#[cfg(test)]
#[path = "ebay_tests.rs"]
mod tests;
