//! Error types for parts_sync

use thiserror::Error;

/// Failure reported by a page driver.
///
/// Drivers do not distinguish causes (timeout, missing element, script error);
/// the message is for logs only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DriverError(pub String);

impl DriverError {
    pub fn new(msg: impl Into<String>) -> Self {
        DriverError(msg.into())
    }
}

/// Unified error type for parts_sync operations
#[derive(Debug, Error)]
pub enum PartsError {
    /// Page driver call failed outside of a navigation step
    #[error("Page driver error: {0}")]
    Driver(#[from] DriverError),
    /// A page load or dropdown selection failed while replaying a path
    #[error("Navigation failed at step {step} ({control}): {source}")]
    Navigation {
        step: usize,
        control: String,
        #[source]
        source: DriverError,
    },
    /// Parts detail table is not rendered
    #[error("Parts detail table not found")]
    TableMissing,
    /// Navigation path has no elements
    #[error("Navigation path is empty")]
    EmptyPath,
    /// Price is negative or not finite
    #[error("Invalid price: {0}")]
    InvalidPrice(f64),
    /// No catalog record for this identifier
    #[error("Part not found: {0}")]
    PartNotFound(String),
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// HTTP request failed (network error, timeout, etc.)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP error status code
    #[error("HTTP error: {0}")]
    HttpStatus(reqwest::StatusCode),
    /// Failed to parse JSON
    #[error("Parse error: {0}")]
    Json(#[from] serde_json::Error),
    /// Failed to parse an XML response
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),
    /// Marketplace API answered with a failure acknowledgement
    #[error("Marketplace error {code}: {message}")]
    Marketplace { code: String, message: String },
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PartsError {
    /// Whether the failure may go away by re-navigating the page.
    ///
    /// The reconciler retries these once; everything else skips the item.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PartsError::Driver(_) | PartsError::Navigation { .. } | PartsError::TableMissing
        )
    }
}

/// Result alias for parts_sync operations
pub type Result<T> = std::result::Result<T, PartsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_error_names_step_and_control() {
        let err = PartsError::Navigation {
            step: 2,
            control: "select[title='Third Choice']".to_string(),
            source: DriverError::new("no such element"),
        };
        let msg = err.to_string();
        assert!(msg.contains("step 2"));
        assert!(msg.contains("Third Choice"));
        assert!(msg.contains("no such element"));
    }

    #[test]
    fn page_failures_are_transient() {
        assert!(PartsError::TableMissing.is_transient());
        assert!(PartsError::Driver(DriverError::new("timeout")).is_transient());
        assert!(!PartsError::EmptyPath.is_transient());
        assert!(!PartsError::PartNotFound("0470-877".into()).is_transient());
    }
}
