#![forbid(unsafe_code)]

//! Host boundary: the traits a DOM binding implements.
//!
//! The core never touches the DOM directly. A host provides a
//! [`DocumentHost`] to find and enhance selects, and one [`SelectSurface`]
//! per enhanced select to read options, write the value and draw the panel.
//! `kmdv-select-web` implements both over `web-sys`; [`crate::memory`]
//! implements them in memory for tests.

use crate::config::SearchableSelectConfig;
use crate::error::SelectError;
use crate::geometry::PanelLayout;
use crate::option_index::{Segment, SourceOption};
use crate::positioning::Placement;
use crate::registry::PanelId;

/// One row of the rendered option list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEntry {
    /// Native option value (`data-value` on the row).
    pub value: String,
    /// Text split into highlighted and plain runs.
    pub segments: Vec<Segment>,
    /// Whether the row is the select's current value.
    pub selected: bool,
}

impl RenderedEntry {
    /// Full row text.
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

/// The option list of one render pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedList {
    pub entries: Vec<RenderedEntry>,
    /// Keyboard cursor, if any row is highlighted.
    pub highlighted: Option<usize>,
}

/// Operations on one enhanced select and its panel.
pub trait SelectSurface {
    /// Current options of the native select, in source order.
    fn options(&self) -> Vec<SourceOption>;

    /// Write the native select's value.
    fn set_value(&mut self, value: &str) -> Result<(), SelectError>;

    /// Dispatch a bubbling `change` notification on the native select.
    fn dispatch_change(&mut self) -> Result<(), SelectError>;

    /// Measure control, container, panel and viewport.
    fn measure(&self) -> PanelLayout;

    /// Apply a computed placement to the panel.
    fn apply_placement(&mut self, placement: &Placement) -> Result<(), SelectError>;

    /// Show or hide the panel.
    fn set_panel_visible(&mut self, visible: bool) -> Result<(), SelectError>;

    /// Replace the search box text.
    fn set_search_text(&mut self, text: &str) -> Result<(), SelectError>;

    /// Move keyboard focus into the search box.
    fn focus_search(&mut self) -> Result<(), SelectError>;

    /// Replace the rendered option list.
    fn render(&mut self, list: &RenderedList) -> Result<(), SelectError>;

    /// Move the highlight without re-rendering rows.
    fn set_highlighted(&mut self, index: Option<usize>) -> Result<(), SelectError>;
}

/// What the scanner needs to know about a select to classify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectDescriptor {
    /// Carries the opt-in attribute.
    pub opted_in: bool,
    /// Carries the exclusion class.
    pub excluded: bool,
    /// Carries the converted class.
    pub converted: bool,
    /// Current options.
    pub options: Vec<SourceOption>,
}

/// Page-level host: finds selects and turns them into surfaces.
pub trait DocumentHost {
    /// Reference to a native select element.
    type Handle: Clone;
    /// Surface produced by [`DocumentHost::enhance`].
    type Surface: SelectSurface;

    /// Every `<select>` in the document, in document order.
    fn selects(&self) -> Vec<Self::Handle>;

    /// Selects matching a CSS selector; non-select matches are dropped.
    fn query_selects(&self, selector: &str) -> Result<Vec<Self::Handle>, SelectError>;

    /// Classification inputs for `select`.
    fn describe(&self, select: &Self::Handle, config: &SearchableSelectConfig)
        -> SelectDescriptor;

    /// Insert the wrapper and panel markup, mark the select converted, remove
    /// it from the tab order and route its events to `panel`.
    fn enhance(
        &mut self,
        select: &Self::Handle,
        panel: PanelId,
        config: &SearchableSelectConfig,
    ) -> Result<Self::Surface, SelectError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_entry_text_joins_segments() {
        let entry = RenderedEntry {
            value: "1".into(),
            segments: vec![
                Segment {
                    text: "Gr".into(),
                    highlighted: false,
                },
                Segment {
                    text: "ape".into(),
                    highlighted: true,
                },
            ],
            selected: false,
        };
        assert_eq!(entry.text(), "Grape");
    }
}
