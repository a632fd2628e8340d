//! Replays a recorded navigation path against the parts finder.
//!
//! The site re-populates every later dropdown after each selection, so a
//! path can only be reached by selecting its values in order.

use crate::config::{NavigatorSettings, SiteProfile};
use crate::driver::PageDriver;
use crate::error::{PartsError, Result};
use crate::models::NavigationPath;

/// Drives the dropdown pipeline for one site profile
#[derive(Debug, Clone)]
pub struct Navigator {
    profile: SiteProfile,
    settings: NavigatorSettings,
}

impl Navigator {
    pub fn new(profile: SiteProfile, settings: NavigatorSettings) -> Self {
        Self { profile, settings }
    }

    pub fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    /// Replay `path` until the schematic's detail table should be on screen.
    ///
    /// Refinements past the end of the control pipeline are dropped. Any
    /// failed load or selection aborts with `PartsError::Navigation`; retrying
    /// is the caller's business.
    pub fn navigate<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        path: &NavigationPath,
    ) -> Result<()> {
        let url = self.profile.brand_url(path.brand());
        log::debug!("Loading {}", url);
        driver.load(&url).map_err(|source| PartsError::Navigation {
            step: 0,
            control: url.clone(),
            source,
        })?;
        driver.pause(self.settings.load_settle);

        let refinements = path.refinements();
        if refinements.len() > self.profile.refinement_controls.len() {
            log::warn!(
                "Path for {} has {} refinements, only the first {} are replayed",
                path.brand(),
                refinements.len(),
                self.profile.refinement_controls.len()
            );
        }

        for (i, (control, value)) in self
            .profile
            .refinement_controls
            .iter()
            .zip(refinements)
            .enumerate()
        {
            self.select_step(driver, i + 1, control, value)?;
        }

        if let Some(schematic) = path.schematic() {
            self.select_step(
                driver,
                path.len() - 1,
                &self.profile.schematic_control,
                schematic,
            )?;
        }

        Ok(())
    }

    fn select_step<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        step: usize,
        control: &str,
        value: &str,
    ) -> Result<()> {
        log::debug!("Step {}: {} = {}", step, control, value);
        driver
            .select(control, value)
            .map_err(|source| PartsError::Navigation {
                step,
                control: control.to_string(),
                source,
            })?;
        driver.pause(self.settings.select_settle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakePage;
    use std::time::Duration;

    fn path(steps: &[&str]) -> NavigationPath {
        NavigationPath::new(steps.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    fn navigator() -> Navigator {
        Navigator::new(
            SiteProfile::with_base_url("https://parts.test/oem-parts"),
            NavigatorSettings::default(),
        )
    }

    #[test]
    fn replays_refinements_then_schematic_in_order() {
        let nav = navigator();
        let mut page = FakePage::new(nav.profile().clone());

        nav.navigate(&mut page, &path(&["Arctic-Cat", "14138", "14987", "15033", "7133"]))
            .unwrap();

        assert_eq!(page.loads, vec!["https://parts.test/oem-parts/Arctic-Cat"]);
        let expected: Vec<(String, String)> = vec![
            ("select[title='Second Choice']", "14138"),
            ("select[title='Third Choice']", "14987"),
            ("select[title='Fourth Choice']", "15033"),
            ("select[title='Parts Schematic']", "7133"),
        ]
        .into_iter()
        .map(|(c, v)| (c.to_string(), v.to_string()))
        .collect();
        assert_eq!(page.selections, expected);
    }

    #[test]
    fn settles_after_load_and_every_selection() {
        let nav = navigator();
        let mut page = FakePage::new(nav.profile().clone());

        nav.navigate(&mut page, &path(&["Honda", "23564", "84651"]))
            .unwrap();

        assert_eq!(
            page.pauses,
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(500),
                Duration::from_millis(500)
            ]
        );
    }

    #[test]
    fn brand_only_path_just_loads() {
        let nav = navigator();
        let mut page = FakePage::new(nav.profile().clone());

        nav.navigate(&mut page, &path(&["Honda"])).unwrap();

        assert_eq!(page.loads.len(), 1);
        assert!(page.selections.is_empty());
    }

    #[test]
    fn two_step_path_selects_schematic_directly() {
        let nav = navigator();
        let mut page = FakePage::new(nav.profile().clone());

        nav.navigate(&mut page, &path(&["Honda", "84651"])).unwrap();

        assert_eq!(
            page.selections,
            vec![(
                "select[title='Parts Schematic']".to_string(),
                "84651".to_string()
            )]
        );
    }

    #[test]
    fn refinements_beyond_pipeline_are_truncated() {
        let nav = navigator();
        let mut page = FakePage::new(nav.profile().clone());

        nav.navigate(
            &mut page,
            &path(&["Honda", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "schem"]),
        )
        .unwrap();

        let values: Vec<&str> = page.selections.iter().map(|(_, v)| v.as_str()).collect();
        assert_eq!(values, vec!["r1", "r2", "r3", "r4", "r5", "schem"]);
        assert_eq!(page.selections[4].0, "select[title='Sixth Choice']");
    }

    #[test]
    fn failed_selection_reports_step() {
        let nav = navigator();
        let mut page = FakePage::new(nav.profile().clone()).failing_select("14987", 1);

        let err = nav
            .navigate(&mut page, &path(&["Arctic-Cat", "14138", "14987", "7133"]))
            .unwrap_err();

        match err {
            PartsError::Navigation { step, control, .. } => {
                assert_eq!(step, 2);
                assert_eq!(control, "select[title='Third Choice']");
            }
            other => panic!("Expected navigation error, got: {other:?}"),
        }
        // Nothing after the failing step was attempted
        assert_eq!(page.selections.len(), 1);
    }
}
