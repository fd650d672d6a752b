#![forbid(unsafe_code)]

//! Page scanner rules: which selects get enhanced.
//!
//! # Decision Rule
//!
//! 1) Already converted: skip.
//! 2) Carries the opt-in attribute: enhance.
//! 3) Carries the exclusion class: skip.
//! 4) At least `min_options` options with a non-empty `value` attribute:
//!    enhance.
//! 5) Otherwise skip.
//!
//! Manual initialization only applies rule 1; an explicit request overrides
//! both the exclusion class and the threshold.

use crate::config::SearchableSelectConfig;
use crate::option_index::threshold_count;
use crate::registry::PanelId;
use crate::surface::SelectDescriptor;

/// Classification of one select during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// Enhance: explicitly opted in.
    OptIn,
    /// Enhance: enough options.
    Threshold,
    /// Skip: already enhanced.
    AlreadyConverted,
    /// Skip: explicitly excluded.
    Excluded,
    /// Skip: too few options.
    BelowThreshold,
}

impl Eligibility {
    /// Whether the select should be enhanced.
    #[inline]
    pub const fn should_enhance(self) -> bool {
        matches!(self, Self::OptIn | Self::Threshold)
    }
}

/// Apply the automatic-scan rule.
#[must_use]
pub fn classify(desc: &SelectDescriptor, config: &SearchableSelectConfig) -> Eligibility {
    if desc.converted {
        Eligibility::AlreadyConverted
    } else if desc.opted_in {
        Eligibility::OptIn
    } else if desc.excluded {
        Eligibility::Excluded
    } else if threshold_count(&desc.options) >= config.min_options {
        Eligibility::Threshold
    } else {
        Eligibility::BelowThreshold
    }
}

/// Apply the manual-initialization rule.
#[must_use]
pub fn classify_manual(desc: &SelectDescriptor) -> Eligibility {
    if desc.converted {
        Eligibility::AlreadyConverted
    } else {
        Eligibility::OptIn
    }
}

/// Outcome of one scan pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Panels created in this pass, in document order.
    pub enhanced: Vec<PanelId>,
    pub already_converted: usize,
    pub excluded: usize,
    pub below_threshold: usize,
    /// Selects whose enhancement failed on the host side.
    pub failed: usize,
}

impl ScanReport {
    pub(crate) fn record_skip(&mut self, eligibility: Eligibility) {
        match eligibility {
            Eligibility::AlreadyConverted => self.already_converted += 1,
            Eligibility::Excluded => self.excluded += 1,
            Eligibility::BelowThreshold => self.below_threshold += 1,
            Eligibility::OptIn | Eligibility::Threshold => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option_index::SourceOption;

    fn desc(n: usize) -> SelectDescriptor {
        let mut options = vec![SourceOption::new("---------", "")];
        options.extend((0..n).map(|i| SourceOption::new(format!("Item {i}"), i.to_string())));
        SelectDescriptor {
            opted_in: false,
            excluded: false,
            converted: false,
            options,
        }
    }

    #[test]
    fn four_options_stay_plain() {
        let config = SearchableSelectConfig::default();
        assert_eq!(classify(&desc(4), &config), Eligibility::BelowThreshold);
    }

    #[test]
    fn five_options_convert() {
        let config = SearchableSelectConfig::default();
        assert_eq!(classify(&desc(5), &config), Eligibility::Threshold);
    }

    #[test]
    fn opt_in_ignores_count() {
        let config = SearchableSelectConfig::default();
        let d = SelectDescriptor {
            opted_in: true,
            ..desc(1)
        };
        assert_eq!(classify(&d, &config), Eligibility::OptIn);
    }

    #[test]
    fn exclusion_ignores_count() {
        let config = SearchableSelectConfig::default();
        let d = SelectDescriptor {
            excluded: true,
            ..desc(50)
        };
        assert_eq!(classify(&d, &config), Eligibility::Excluded);
        assert!(!classify(&d, &config).should_enhance());
    }

    #[test]
    fn opt_in_wins_over_exclusion() {
        let config = SearchableSelectConfig::default();
        let d = SelectDescriptor {
            opted_in: true,
            excluded: true,
            ..desc(0)
        };
        assert_eq!(classify(&d, &config), Eligibility::OptIn);
    }

    #[test]
    fn converted_is_skipped_everywhere() {
        let config = SearchableSelectConfig::default();
        let d = SelectDescriptor {
            converted: true,
            opted_in: true,
            ..desc(10)
        };
        assert_eq!(classify(&d, &config), Eligibility::AlreadyConverted);
        assert_eq!(classify_manual(&d), Eligibility::AlreadyConverted);
    }

    #[test]
    fn manual_overrides_exclusion_and_threshold() {
        let d = SelectDescriptor {
            excluded: true,
            ..desc(1)
        };
        assert!(classify_manual(&d).should_enhance());
    }

    #[test]
    fn implicit_values_do_not_count() {
        let config = SearchableSelectConfig::default();
        let d = SelectDescriptor {
            opted_in: false,
            excluded: false,
            converted: false,
            options: (0..8).map(|i| SourceOption::text_only(format!("T{i}"))).collect(),
        };
        assert_eq!(classify(&d, &config), Eligibility::BelowThreshold);
    }
}
