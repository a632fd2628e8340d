//! Scripted page driver for engine tests

use crate::config::SiteProfile;
use crate::driver::{DriverResult, PageDriver};
use crate::error::DriverError;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeRow {
    pub part: Option<String>,
    pub annotation: Option<String>,
    pub status: Option<String>,
    pub our_price: Option<String>,
    pub reg_price: Option<String>,
}

impl FakeRow {
    pub fn new(part: &str, status: &str, our_price: &str, reg_price: &str) -> Self {
        Self {
            part: Some(part.to_string()),
            annotation: None,
            status: Some(status.to_string()),
            our_price: Some(our_price.to_string()),
            reg_price: Some(reg_price.to_string()),
        }
    }

    pub fn replacing(mut self, old: &str) -> Self {
        self.annotation = Some(format!("replaces part # {}", old));
        self
    }
}

/// Parts finder stand-in: each schematic value owns one detail table.
#[derive(Default)]
pub(crate) struct FakePage {
    profile: SiteProfile,
    tables: HashMap<String, Vec<FakeRow>>,
    current: Option<String>,
    /// Value -> (successful selections still allowed, failures after that)
    failing_selects: HashMap<String, (u32, u32)>,
    hidden_tables: HashMap<String, u32>,
    controls: HashMap<String, (String, String)>,
    pub loads: Vec<String>,
    pub selections: Vec<(String, String)>,
    pub pauses: Vec<Duration>,
}

impl FakePage {
    pub fn new(profile: SiteProfile) -> Self {
        Self {
            profile,
            ..Self::default()
        }
    }

    pub fn with_table(mut self, schematic: &str, rows: Vec<FakeRow>) -> Self {
        self.tables.insert(schematic.to_string(), rows);
        self
    }

    /// Selecting `value` fails the next `times` attempts
    pub fn failing_select(self, value: &str, times: u32) -> Self {
        self.failing_select_after(value, 0, times)
    }

    /// Selecting `value` succeeds `successes` times, then fails `times` attempts
    pub fn failing_select_after(mut self, value: &str, successes: u32, times: u32) -> Self {
        self.failing_selects
            .insert(value.to_string(), (successes, times));
        self
    }

    /// The table for `schematic` is not rendered the next `times` checks
    pub fn hidden_table(mut self, schematic: &str, times: u32) -> Self {
        self.hidden_tables.insert(schematic.to_string(), times);
        self
    }

    pub fn with_control(mut self, control: &str, value: &str, label: &str) -> Self {
        self.controls
            .insert(control.to_string(), (value.to_string(), label.to_string()));
        self
    }

    fn rows(&self) -> &[FakeRow] {
        self.current
            .as_ref()
            .and_then(|s| self.tables.get(s))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn cell(&self, selector: &str) -> Option<Option<String>> {
        for (i, row) in self.rows().iter().enumerate() {
            let Some(rest) = selector.strip_prefix(&self.profile.detail_row(i + 1)) else {
                continue;
            };
            let cell = match rest {
                " td.partNum span" => &row.part,
                " td.partNum p" => &row.annotation,
                " td.status" => &row.status,
                " td.ourPrice" => &row.our_price,
                " td.regPrice" => &row.reg_price,
                _ => continue,
            };
            return Some(cell.clone());
        }
        None
    }
}

impl PageDriver for FakePage {
    fn load(&mut self, url: &str) -> DriverResult<()> {
        self.loads.push(url.to_string());
        self.current = None;
        Ok(())
    }

    fn select(&mut self, control: &str, value: &str) -> DriverResult<()> {
        if let Some((successes, failures)) = self.failing_selects.get_mut(value) {
            if *successes > 0 {
                *successes -= 1;
            } else if *failures > 0 {
                *failures -= 1;
                return Err(DriverError::new(format!("option {} not selectable", value)));
            }
        }
        self.selections.push((control.to_string(), value.to_string()));
        if control == self.profile.schematic_control {
            self.current = Some(value.to_string());
        }
        Ok(())
    }

    fn read_text(&mut self, selector: &str) -> DriverResult<String> {
        self.cell(selector)
            .flatten()
            .ok_or_else(|| DriverError::new(format!("no such element: {}", selector)))
    }

    fn is_visible(&mut self, selector: &str) -> bool {
        if selector != self.profile.detail_table {
            return false;
        }
        let Some(schematic) = self.current.clone() else {
            return false;
        };
        if let Some(left) = self.hidden_tables.get_mut(&schematic) {
            if *left > 0 {
                *left -= 1;
                return false;
            }
        }
        self.tables.contains_key(&schematic)
    }

    fn count(&mut self, selector: &str) -> DriverResult<usize> {
        if selector == self.profile.detail_rows() {
            Ok(self.rows().len())
        } else {
            Ok(0)
        }
    }

    fn selected_value(&mut self, control: &str) -> DriverResult<String> {
        self.controls
            .get(control)
            .map(|(value, _)| value.clone())
            .ok_or_else(|| DriverError::new(format!("no such element: {}", control)))
    }

    fn selected_label(&mut self, control: &str) -> DriverResult<String> {
        self.controls
            .get(control)
            .map(|(_, label)| label.clone())
            .ok_or_else(|| DriverError::new(format!("no such element: {}", control)))
    }

    fn pause(&mut self, duration: Duration) {
        self.pauses.push(duration);
    }
}
