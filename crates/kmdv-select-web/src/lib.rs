#![forbid(unsafe_code)]

//! Browser frontend for `kmdv-select`.
//!
//! On `wasm32` this crate binds the core's host traits to the DOM through
//! `web-sys` and exports the page entry points:
//! - module start: reads `window.searchableSelectConfig`, installs console
//!   logging, scans once the DOM is ready and watches for inserted content,
//! - `makeSelectSearchable(selector)`: enhance matching selects on demand
//!   (also installed on `window`),
//! - `configureSearchableSelect(options)`: replace the configuration.
//!
//! The console logging layer, configuration parsing, the re-entrancy gate and
//! the mutation filter are target independent and tested natively.

pub mod console_layer;
pub mod event_gate;
pub mod mutations;
pub mod page_config;

#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod runtime;

#[cfg(target_arch = "wasm32")]
pub use runtime::{configure_searchable_select, make_select_searchable, start};

/// Native builds compile the entry points as stubs so `cargo check --workspace`
/// stays green on non-wasm targets.
#[cfg(not(target_arch = "wasm32"))]
pub fn make_select_searchable(_selector: &str) -> Result<usize, kmdv_select::SelectError> {
    Err(kmdv_select::SelectError::host(
        "no DOM available on this target",
    ))
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn native_stub_reports_missing_dom() {
        let err = make_select_searchable("select").unwrap_err();
        assert!(err.to_string().starts_with("host error:"));
    }
}
