//! Page driver capability
//!
//! The navigation and extraction engines only ever talk to a rendered page
//! through this trait. A session is passed explicitly as `&mut impl PageDriver`
//! so exactly one sequence drives it at a time.

use crate::error::DriverError;
use std::time::Duration;

/// Result type for page driver calls
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Minimal set of browser operations the engines need.
///
/// Every call waits a bounded time for its target to appear; failures are a
/// single `DriverError` regardless of cause.
pub trait PageDriver {
    /// Navigate the session to `url`
    fn load(&mut self, url: &str) -> DriverResult<()>;

    /// Choose the option with `value` in the `<select>` matched by `control`
    fn select(&mut self, control: &str, value: &str) -> DriverResult<()>;

    /// Visible text of the first element matched by `selector`
    fn read_text(&mut self, selector: &str) -> DriverResult<String>;

    /// Whether the first element matched by `selector` is displayed.
    ///
    /// A missing element is not visible.
    fn is_visible(&mut self, selector: &str) -> bool;

    /// Number of elements matched by `selector`
    fn count(&mut self, selector: &str) -> DriverResult<usize>;

    /// Value of the currently selected option in `control`
    fn selected_value(&mut self, control: &str) -> DriverResult<String>;

    /// Label of the currently selected option in `control`
    fn selected_label(&mut self, control: &str) -> DriverResult<String>;

    /// Let the page settle after an interaction
    fn pause(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}
