#![forbid(unsafe_code)]

//! Page-supplied configuration.
//!
//! A page may define `window.searchableSelectConfig` before the module loads
//! or call `configureSearchableSelect(options)` afterwards. Both arrive here as
//! JSON text.

use kmdv_select::{SearchableSelectConfig, SelectError};
use tracing::level_filters::LevelFilter;

/// Name of the global the page may define before the module starts.
pub const CONFIG_GLOBAL: &str = "searchableSelectConfig";

/// Resolve the configuration from optional page JSON.
///
/// `None`, `null` and `undefined` mean defaults. Anything else must be a
/// valid (possibly partial) configuration object.
pub fn resolve_config(json: Option<&str>) -> Result<SearchableSelectConfig, SelectError> {
    match json.map(str::trim) {
        None | Some("" | "null" | "undefined") => Ok(SearchableSelectConfig::default()),
        Some(json) => SearchableSelectConfig::from_json(json),
    }
}

/// Like [`resolve_config`], falling back to defaults on error.
///
/// Returns the error alongside so the caller can log it once logging is up.
pub fn resolve_config_or_default(
    json: Option<&str>,
) -> (SearchableSelectConfig, Option<SelectError>) {
    match resolve_config(json) {
        Ok(config) => (config, None),
        Err(err) => (SearchableSelectConfig::default(), Some(err)),
    }
}

/// Console level for a configuration, `WARN` if it cannot be parsed.
pub fn console_level(config: &SearchableSelectConfig) -> LevelFilter {
    config.max_level().unwrap_or(LevelFilter::WARN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_config_means_defaults() {
        assert_eq!(resolve_config(None).unwrap(), SearchableSelectConfig::default());
        assert_eq!(
            resolve_config(Some("null")).unwrap(),
            SearchableSelectConfig::default()
        );
    }

    #[test]
    fn partial_object_overrides_fields() {
        let config =
            resolve_config(Some(r#"{"min_options": 10, "log_level": "debug"}"#)).unwrap();
        assert_eq!(config.min_options, 10);
        assert_eq!(config.refresh_delay_ms, 50);
        assert_eq!(console_level(&config), LevelFilter::DEBUG);
    }

    #[test]
    fn invalid_config_falls_back() {
        let (config, err) = resolve_config_or_default(Some(r#"{"min_options": 0}"#));
        assert_eq!(config, SearchableSelectConfig::default());
        assert!(matches!(err, Some(SelectError::InvalidConfig(_))));
    }

    #[test]
    fn malformed_json_is_reported() {
        let (_, err) = resolve_config_or_default(Some("{min_options"));
        assert!(err.is_some());
    }
}
