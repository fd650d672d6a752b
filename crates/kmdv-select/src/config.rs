#![forbid(unsafe_code)]

//! Tunables for scanning, placement and deferred work.
//!
//! Every field has a default matching the stock page behaviour, so hosts can
//! supply partial JSON:
//!
//! ```
//! use kmdv_select::config::SearchableSelectConfig;
//!
//! let config = SearchableSelectConfig::from_json(r#"{"min_options": 8}"#).unwrap();
//! assert_eq!(config.min_options, 8);
//! assert_eq!(config.exclusion_class, "no-search");
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::error::SelectError;

/// Configuration for the page scanner and every widget it creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchableSelectConfig {
    /// Minimum number of options with a non-empty `value` attribute before a
    /// plain select is enhanced automatically.
    /// Default: 5
    pub min_options: usize,

    /// Attribute that opts a select in regardless of option count.
    /// Default: `data-enhanced`
    pub opt_in_attribute: String,

    /// Class that excludes a select from automatic enhancement.
    /// Default: `no-search`
    pub exclusion_class: String,

    /// Class written onto a select once it has been enhanced.
    /// Default: `searchable-converted`
    pub converted_class: String,

    /// Option texts treated as placeholders when the option value is empty.
    /// Default: `["---------"]`
    pub placeholder_markers: Vec<String>,

    /// Upper bound on the panel height used for placement (px).
    /// Default: 250
    pub max_panel_height: f64,

    /// Height assumed when the panel has never been measured (px).
    /// Default: 250
    pub fallback_panel_height: f64,

    /// Gap between control and panel (px).
    /// Default: 2
    pub panel_gap: f64,

    /// Delay between an "elements added" notification and the rescan (ms).
    /// Default: 100
    pub rescan_delay_ms: u64,

    /// Delay between an external value change and the list refresh (ms).
    /// Default: 50
    pub refresh_delay_ms: u64,

    /// Placeholder text of the search box.
    /// Default: `Type to search...`
    pub search_placeholder: String,

    /// Maximum log level forwarded by the host (`off`, `error`, `warn`,
    /// `info`, `debug`, `trace`).
    /// Default: `warn`
    pub log_level: String,
}

impl Default for SearchableSelectConfig {
    fn default() -> Self {
        Self {
            min_options: 5,
            opt_in_attribute: "data-enhanced".into(),
            exclusion_class: "no-search".into(),
            converted_class: "searchable-converted".into(),
            placeholder_markers: vec!["---------".into()],
            max_panel_height: 250.0,
            fallback_panel_height: 250.0,
            panel_gap: 2.0,
            rescan_delay_ms: 100,
            refresh_delay_ms: 50,
            search_placeholder: "Type to search...".into(),
            log_level: "warn".into(),
        }
    }
}

impl SearchableSelectConfig {
    /// Parse a (possibly partial) JSON object and validate it.
    pub fn from_json(json: &str) -> Result<Self, SelectError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make scanning or placement meaningless.
    pub fn validate(&self) -> Result<(), SelectError> {
        if self.min_options == 0 {
            return Err(SelectError::InvalidConfig(
                "min_options must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("opt_in_attribute", &self.opt_in_attribute),
            ("exclusion_class", &self.exclusion_class),
            ("converted_class", &self.converted_class),
        ] {
            if value.trim().is_empty() || value.contains(char::is_whitespace) {
                return Err(SelectError::InvalidConfig(format!(
                    "{name} must be a single non-empty token"
                )));
            }
        }
        if !(self.max_panel_height > 0.0) || !(self.fallback_panel_height > 0.0) {
            return Err(SelectError::InvalidConfig(
                "panel heights must be positive".into(),
            ));
        }
        if !(self.panel_gap >= 0.0) {
            return Err(SelectError::InvalidConfig(
                "panel_gap must not be negative".into(),
            ));
        }
        self.max_level()?;
        Ok(())
    }

    /// Rescan debounce as a [`Duration`].
    #[must_use]
    pub fn rescan_delay(&self) -> Duration {
        Duration::from_millis(self.rescan_delay_ms)
    }

    /// External-change refresh delay as a [`Duration`].
    #[must_use]
    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }

    /// Parsed [`Self::log_level`].
    pub fn max_level(&self) -> Result<LevelFilter, SelectError> {
        self.log_level.parse::<LevelFilter>().map_err(|_| {
            SelectError::InvalidConfig(format!("unknown log level {:?}", self.log_level))
        })
    }

    /// Whether `text` is one of the configured placeholder markers.
    #[must_use]
    pub fn is_placeholder_text(&self, text: &str) -> bool {
        let text = text.trim();
        text.is_empty() || self.placeholder_markers.iter().any(|m| m == text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = SearchableSelectConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rescan_delay(), Duration::from_millis(100));
        assert_eq!(config.refresh_delay(), Duration::from_millis(50));
        assert_eq!(config.max_level().unwrap(), LevelFilter::WARN);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            SearchableSelectConfig::from_json(r#"{"rescan_delay_ms": 250, "log_level": "debug"}"#)
                .unwrap();
        assert_eq!(config.rescan_delay_ms, 250);
        assert_eq!(config.max_level().unwrap(), LevelFilter::DEBUG);
        assert_eq!(config.min_options, 5);
        assert_eq!(config.converted_class, "searchable-converted");
    }

    #[test]
    fn malformed_json_is_invalid_config() {
        let err = SearchableSelectConfig::from_json("{min_options: }").unwrap_err();
        assert!(matches!(err, SelectError::InvalidConfig(_)));
    }

    #[test]
    fn zero_threshold_rejected() {
        let err = SearchableSelectConfig::from_json(r#"{"min_options": 0}"#).unwrap_err();
        assert!(err.to_string().contains("min_options"));
    }

    #[test]
    fn marker_names_must_be_tokens() {
        let config = SearchableSelectConfig {
            exclusion_class: "no search".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_positive_heights_rejected() {
        let config = SearchableSelectConfig {
            fallback_panel_height: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_log_level_rejected() {
        let err = SearchableSelectConfig::from_json(r#"{"log_level": "loud"}"#).unwrap_err();
        assert!(err.to_string().contains("loud"));
    }

    #[test]
    fn placeholder_detection_trims() {
        let config = SearchableSelectConfig::default();
        assert!(config.is_placeholder_text("   "));
        assert!(config.is_placeholder_text(" --------- "));
        assert!(!config.is_placeholder_text("Choose a vendor"));
    }
}
