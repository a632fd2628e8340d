//! Records the navigation path of the part currently on screen.
//!
//! The operator drives the browser to a part's schematic by hand; this reads
//! back every dropdown so the reconciler can replay the same selections later.

use crate::config::SiteProfile;
use crate::driver::PageDriver;
use crate::error::Result;
use crate::models::NavigationPath;

/// Brand labels are shown with spaces but the brand URL uses hyphens
fn brand_slug(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Read the current selection of every control, in pipeline order.
///
/// Controls that are missing or unset are skipped: shorter pipelines simply
/// produce shorter paths.
pub fn capture_path<D: PageDriver + ?Sized>(
    driver: &mut D,
    profile: &SiteProfile,
) -> Result<NavigationPath> {
    let mut steps = Vec::new();

    match driver.selected_label(&profile.brand_control) {
        Ok(label) if !label.trim().is_empty() => {
            let brand = brand_slug(&label);
            log::info!("Captured brand: {}", brand);
            steps.push(brand);
        }
        Ok(_) => log::warn!("No brand selected"),
        Err(e) => log::warn!("Could not read brand control: {}", e),
    }

    let value_controls = profile
        .refinement_controls
        .iter()
        .chain(std::iter::once(&profile.schematic_control));
    for control in value_controls {
        match driver.selected_value(control) {
            Ok(value) if !value.trim().is_empty() => {
                log::info!("Captured {}: {}", control, value.trim());
                steps.push(value.trim().to_string());
            }
            Ok(_) => log::debug!("No value for {}", control),
            Err(e) => log::debug!("Skipping {}: {}", control, e),
        }
    }

    NavigationPath::new(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PartsError;
    use crate::test_support::FakePage;

    #[test]
    fn brand_slug_hyphenates_spaces() {
        assert_eq!(brand_slug("Arctic Cat"), "Arctic-Cat");
        assert_eq!(brand_slug("  Can  Am "), "Can-Am");
        assert_eq!(brand_slug("Honda"), "Honda");
    }

    #[test]
    fn captures_brand_refinements_and_schematic() {
        let profile = SiteProfile::default();
        let mut page = FakePage::new(profile.clone())
            .with_control(&profile.brand_control, "12", "Arctic Cat")
            .with_control(&profile.refinement_controls[0], "14138", "2008")
            .with_control(&profile.refinement_controls[1], "14987", "ATV")
            .with_control(&profile.refinement_controls[2], "", "-- Select --")
            .with_control(&profile.schematic_control, "7133", "Engine");

        let path = capture_path(&mut page, &profile).unwrap();

        assert_eq!(path.steps(), &["Arctic-Cat", "14138", "14987", "7133"]);
        assert_eq!(path.brand(), "Arctic-Cat");
        assert_eq!(path.schematic(), Some("7133"));
    }

    #[test]
    fn nothing_selected_is_an_error() {
        let profile = SiteProfile::default();
        let mut page = FakePage::new(profile.clone());

        assert!(matches!(
            capture_path(&mut page, &profile),
            Err(PartsError::EmptyPath)
        ));
    }
}
