//! Platform classification for the cross-platform guard.

use crate::core::types::{ChainStep, PlatformClass};

/// Classify a platform label into the two execution families the planner
/// distinguishes. Anything that is not mobile-like is driven by a browser.
pub fn classify(platform: &str) -> PlatformClass {
    match platform.to_ascii_lowercase().as_str() {
        "ios" | "android" | "mobile" | "native" => PlatformClass::Mobile,
        _ => PlatformClass::Web,
    }
}

/// Incomplete, non-target steps whose platform family differs from the
/// caller's. The planner cannot drive another platform, so any such step
/// halts auto-execution entirely.
pub fn cross_platform_steps<'a>(
    chain: &'a [ChainStep],
    current_platform: &str,
) -> Vec<&'a ChainStep> {
    let current = classify(current_platform);
    chain
        .iter()
        .filter(|step| !step.complete && !step.is_target)
        .filter(|step| classify(&step.platform) != current)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::step;

    #[test]
    fn classifies_mobile_and_web_labels() {
        assert_eq!(classify("iOS"), PlatformClass::Mobile);
        assert_eq!(classify("android"), PlatformClass::Mobile);
        assert_eq!(classify("web"), PlatformClass::Web);
        assert_eq!(classify("desktop"), PlatformClass::Web);
    }

    #[test]
    fn flags_incomplete_steps_on_the_other_family() {
        let mut mobile = step("verified", "ios");
        mobile.complete = false;
        let mut done_mobile = step("installed", "android");
        done_mobile.complete = true;
        let mut target = step("accepted", "ios");
        target.is_target = true;
        let chain = vec![done_mobile, mobile, target];

        let cross = cross_platform_steps(&chain, "web");
        let statuses: Vec<&str> = cross.iter().map(|s| s.status.as_str()).collect();
        assert_eq!(statuses, vec!["verified"]);
    }

    #[test]
    fn same_family_steps_are_not_flagged() {
        let chain = vec![step("submitted", "web"), step("accepted", "desktop")];
        assert!(cross_platform_steps(&chain, "web").is_empty());
    }
}
