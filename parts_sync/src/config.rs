//! Site layout constants and tunable waits

use std::path::PathBuf;
use std::time::Duration;

/// OEM parts finder entry page
pub const DEFAULT_SITE_URL: &str = "https://www.rockymountainatvmc.com/oem-parts";

/// chromedriver's default listen address
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// Where controls and cells live on the parts finder.
///
/// The refinement pipeline is fixed by the site; paths longer than it are
/// truncated during navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteProfile {
    pub base_url: String,
    pub brand_control: String,
    pub refinement_controls: Vec<String>,
    pub schematic_control: String,
    pub detail_table: String,
}

impl SiteProfile {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// URL of the brand-scoped catalog page
    pub fn brand_url(&self, brand: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(brand)
        )
    }

    pub fn detail_rows(&self) -> String {
        format!("{} tbody tr", self.detail_table)
    }

    /// Selector for the n-th (1-based) detail row
    pub fn detail_row(&self, n: usize) -> String {
        format!("{} tbody tr:nth-child({})", self.detail_table, n)
    }
}

fn titled_select(title: &str) -> String {
    format!("select[title='{}']", title)
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SITE_URL.to_string(),
            brand_control: titled_select("First Choice"),
            refinement_controls: [
                "Second Choice",
                "Third Choice",
                "Fourth Choice",
                "Fifth Choice",
                "Sixth Choice",
            ]
            .iter()
            .map(|t| titled_select(t))
            .collect(),
            schematic_control: titled_select("Parts Schematic"),
            detail_table: "#oemparts_tblAssmDetails".to_string(),
        }
    }
}

/// Settle delays the site needs to re-render dependent controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigatorSettings {
    pub load_settle: Duration,
    pub select_settle: Duration,
}

impl NavigatorSettings {
    /// No waiting at all, for scripted drivers
    pub fn immediate() -> Self {
        Self {
            load_settle: Duration::ZERO,
            select_settle: Duration::ZERO,
        }
    }
}

impl Default for NavigatorSettings {
    fn default() -> Self {
        Self {
            load_settle: Duration::from_millis(1000),
            select_settle: Duration::from_millis(500),
        }
    }
}

/// Returns the default database path: ~/.local/share/parts_sync/parts.db
pub fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("parts_sync")
        .join("parts.db")
        .to_string_lossy()
        .to_string()
}
