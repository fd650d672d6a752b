#![forbid(unsafe_code)]

//! Widget controller: state and behaviour of one enhanced select.
//!
//! The controller owns its [`SelectSurface`] and the panel state
//! (`visible`, search term, highlighted row). Cross-widget concerns (the
//! open-panel registry, deferred work) live in [`crate::enhancer`], which
//! calls into the controller.
//!
//! # Invariants
//!
//! 1. `highlighted` is `None` or `< shown.len()`.
//! 2. Hiding always clears the search term and the search box.
//! 3. `shown` is the entry list of the most recent render pass only.

use tracing::{debug, trace};

use crate::config::SearchableSelectConfig;
use crate::error::SelectError;
use crate::option_index::{OptionEntry, OptionIndex};
use crate::positioning::{Placement, compute_placement};
use crate::registry::PanelId;
use crate::surface::{RenderedEntry, RenderedList, SelectSurface};

/// Keys the search box reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    ArrowDown,
    ArrowUp,
    Enter,
    Escape,
    /// Anything else; handled by the input's default behaviour.
    Other,
}

impl NavKey {
    /// Map a DOM `KeyboardEvent.key` value.
    pub fn from_dom_key(key: &str) -> Self {
        match key {
            "ArrowDown" | "Down" => Self::ArrowDown,
            "ArrowUp" | "Up" => Self::ArrowUp,
            "Enter" => Self::Enter,
            "Escape" | "Esc" => Self::Escape,
            _ => Self::Other,
        }
    }
}

/// What a key press asks of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    /// Activate the row at this index.
    Activate(usize),
    /// Close without changing the selection.
    Dismiss,
}

/// Result of [`WidgetController::handle_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyOutcome {
    /// The host should call `preventDefault()` on the event.
    pub prevent_default: bool,
    pub command: Option<KeyCommand>,
}

/// One enhanced select.
#[derive(Debug)]
pub struct WidgetController<S> {
    id: PanelId,
    surface: S,
    visible: bool,
    search_term: String,
    highlighted: Option<usize>,
    shown: Vec<OptionEntry>,
    placement: Option<Placement>,
}

impl<S: SelectSurface> WidgetController<S> {
    /// Wrap a freshly enhanced surface. Call [`Self::refresh`] to draw the
    /// initial list.
    pub fn new(id: PanelId, surface: S) -> Self {
        Self {
            id,
            surface,
            visible: false,
            search_term: String::new(),
            highlighted: None,
            shown: Vec::new(),
            placement: None,
        }
    }

    pub fn id(&self) -> PanelId {
        self.id
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    /// Entries of the last render pass.
    pub fn shown(&self) -> &[OptionEntry] {
        &self.shown
    }

    /// Placement applied on the last open or resize.
    pub fn placement(&self) -> Option<Placement> {
        self.placement
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Position, show and focus the panel with an unfiltered list.
    ///
    /// Registry bookkeeping is the caller's job.
    pub fn show(&mut self, config: &SearchableSelectConfig) -> Result<(), SelectError> {
        self.reposition(config)?;
        self.visible = true;
        self.surface.set_panel_visible(true)?;
        self.search_term.clear();
        self.surface.focus_search()?;
        self.surface.set_search_text("")?;
        self.render(config)?;
        debug!(panel = %self.id, entries = self.shown.len(), "opened panel");
        Ok(())
    }

    /// Hide the panel and reset the search box.
    pub fn hide(&mut self) -> Result<(), SelectError> {
        let was_visible = self.visible;
        self.visible = false;
        self.search_term.clear();
        self.surface.set_panel_visible(false)?;
        self.surface.set_search_text("")?;
        if was_visible {
            debug!(panel = %self.id, "closed panel");
        }
        Ok(())
    }

    /// Recompute and apply placement from fresh measurements.
    pub fn reposition(&mut self, config: &SearchableSelectConfig) -> Result<(), SelectError> {
        let placement = compute_placement(&self.surface.measure(), config);
        self.surface.apply_placement(&placement)?;
        self.placement = Some(placement);
        Ok(())
    }

    /// Re-render for a new search term.
    pub fn search(
        &mut self,
        text: &str,
        config: &SearchableSelectConfig,
    ) -> Result<(), SelectError> {
        self.search_term.clear();
        self.search_term.push_str(text);
        self.render(config)
    }

    /// Re-render from the live select with the current term.
    pub fn refresh(&mut self, config: &SearchableSelectConfig) -> Result<(), SelectError> {
        self.render(config)
    }

    /// Apply the keyboard contract to the current list.
    pub fn handle_key(&mut self, key: NavKey) -> Result<KeyOutcome, SelectError> {
        let count = self.shown.len();
        let outcome = match key {
            NavKey::ArrowDown => {
                if count > 0 {
                    let next = self.highlighted.map_or(0, |i| (i + 1).min(count - 1));
                    self.move_highlight(next)?;
                }
                KeyOutcome {
                    prevent_default: true,
                    command: None,
                }
            }
            NavKey::ArrowUp => {
                if count > 0 {
                    let next = self.highlighted.map_or(0, |i| i.saturating_sub(1));
                    self.move_highlight(next)?;
                }
                KeyOutcome {
                    prevent_default: true,
                    command: None,
                }
            }
            NavKey::Enter => KeyOutcome {
                prevent_default: true,
                command: self.highlighted.map(KeyCommand::Activate),
            },
            NavKey::Escape => KeyOutcome {
                prevent_default: false,
                command: Some(KeyCommand::Dismiss),
            },
            NavKey::Other => KeyOutcome::default(),
        };
        trace!(panel = %self.id, ?key, highlighted = ?self.highlighted, "key handled");
        Ok(outcome)
    }

    /// Write the row's value into the select, notify listeners and hide.
    ///
    /// Returns the chosen value, or `None` when `index` is out of range.
    pub fn activate(
        &mut self,
        index: usize,
        config: &SearchableSelectConfig,
    ) -> Result<Option<String>, SelectError> {
        let Some(value) = self.shown.get(index).map(|e| e.value.clone()) else {
            return Ok(None);
        };
        self.surface.set_value(&value)?;
        self.surface.dispatch_change()?;
        self.render(config)?;
        self.hide()?;
        debug!(panel = %self.id, value = %value, "activated option");
        Ok(Some(value))
    }

    fn move_highlight(&mut self, index: usize) -> Result<(), SelectError> {
        self.highlighted = Some(index);
        self.surface.set_highlighted(self.highlighted)
    }

    fn render(&mut self, config: &SearchableSelectConfig) -> Result<(), SelectError> {
        let index = OptionIndex::from_options(&self.surface.options(), config);
        let filtered = index.filter(&self.search_term);

        self.highlighted = filtered.iter().position(|f| f.entry.selected);
        let entries = filtered
            .iter()
            .map(|f| RenderedEntry {
                value: f.entry.value.clone(),
                segments: f.segments.clone(),
                selected: f.entry.selected,
            })
            .collect();
        self.shown = filtered.into_iter().map(|f| f.entry).collect();

        self.surface.render(&RenderedList {
            entries,
            highlighted: self.highlighted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{PanelLayout, Rect, Viewport};
    use crate::option_index::SourceOption;
    use crate::positioning::VerticalPlacement;

    /// Minimal in-struct surface; page-level behaviour is covered by the
    /// memory host in the integration tests.
    #[derive(Debug, Default)]
    struct StubSurface {
        options: Vec<SourceOption>,
        layout: PanelLayout,
        visible: bool,
        search_text: String,
        focused: bool,
        list: RenderedList,
        changes: usize,
    }

    impl SelectSurface for StubSurface {
        fn options(&self) -> Vec<SourceOption> {
            self.options.clone()
        }

        fn set_value(&mut self, value: &str) -> Result<(), SelectError> {
            for opt in &mut self.options {
                opt.selected = opt.value == value;
            }
            Ok(())
        }

        fn dispatch_change(&mut self) -> Result<(), SelectError> {
            self.changes += 1;
            Ok(())
        }

        fn measure(&self) -> PanelLayout {
            self.layout
        }

        fn apply_placement(&mut self, _placement: &Placement) -> Result<(), SelectError> {
            Ok(())
        }

        fn set_panel_visible(&mut self, visible: bool) -> Result<(), SelectError> {
            self.visible = visible;
            Ok(())
        }

        fn set_search_text(&mut self, text: &str) -> Result<(), SelectError> {
            self.search_text = text.to_string();
            Ok(())
        }

        fn focus_search(&mut self) -> Result<(), SelectError> {
            self.focused = true;
            Ok(())
        }

        fn render(&mut self, list: &RenderedList) -> Result<(), SelectError> {
            self.list = list.clone();
            Ok(())
        }

        fn set_highlighted(&mut self, index: Option<usize>) -> Result<(), SelectError> {
            self.list.highlighted = index;
            Ok(())
        }
    }

    fn controller(options: Vec<SourceOption>) -> WidgetController<StubSurface> {
        let control = Rect::new(0.0, 100.0, 200.0, 30.0);
        let surface = StubSurface {
            options,
            layout: PanelLayout {
                control,
                container: control,
                panel_height: 0.0,
                viewport: Viewport::new(800.0, 600.0),
            },
            ..Default::default()
        };
        let mut c = WidgetController::new(PanelId::new(0), surface);
        c.refresh(&SearchableSelectConfig::default()).unwrap();
        c
    }

    fn fruit() -> Vec<SourceOption> {
        vec![
            SourceOption::new("---------", ""),
            SourceOption::new("Apple", "a"),
            SourceOption::new("Banana", "b"),
            SourceOption::new("Grape", "g"),
        ]
    }

    #[test]
    fn dom_key_mapping() {
        assert_eq!(NavKey::from_dom_key("ArrowDown"), NavKey::ArrowDown);
        assert_eq!(NavKey::from_dom_key("Up"), NavKey::ArrowUp);
        assert_eq!(NavKey::from_dom_key("Esc"), NavKey::Escape);
        assert_eq!(NavKey::from_dom_key("a"), NavKey::Other);
    }

    #[test]
    fn initial_render_skips_placeholder() {
        let c = controller(fruit());
        assert!(!c.is_visible());
        assert_eq!(c.shown().len(), 3);
        assert_eq!(c.surface().list.entries[0].text(), "Apple");
    }

    #[test]
    fn show_focuses_and_places() {
        let mut c = controller(fruit());
        c.search("ban", &SearchableSelectConfig::default()).unwrap();
        c.show(&SearchableSelectConfig::default()).unwrap();
        assert!(c.is_visible());
        assert!(c.surface().focused);
        assert_eq!(c.search_term(), "");
        assert_eq!(c.shown().len(), 3);
        assert_eq!(
            c.placement().map(|p| p.vertical),
            Some(VerticalPlacement::Below)
        );
    }

    #[test]
    fn arrow_up_from_nothing_highlights_first() {
        let mut c = controller(fruit());
        assert_eq!(c.highlighted(), None);
        let out = c.handle_key(NavKey::ArrowUp).unwrap();
        assert!(out.prevent_default);
        assert_eq!(c.highlighted(), Some(0));
    }

    #[test]
    fn arrow_down_stops_at_last() {
        let mut c = controller(fruit());
        for _ in 0..10 {
            c.handle_key(NavKey::ArrowDown).unwrap();
        }
        assert_eq!(c.highlighted(), Some(2));
        assert_eq!(c.surface().list.highlighted, Some(2));
    }

    #[test]
    fn cursor_starts_at_current_selection() {
        let mut options = fruit();
        options[2].selected = true;
        let mut c = controller(options);
        assert_eq!(c.highlighted(), Some(1));
        c.handle_key(NavKey::ArrowDown).unwrap();
        assert_eq!(c.highlighted(), Some(2));
    }

    #[test]
    fn empty_list_navigation_is_noop() {
        let mut c = controller(vec![SourceOption::new("", "")]);
        assert!(c.shown().is_empty());
        c.handle_key(NavKey::ArrowDown).unwrap();
        c.handle_key(NavKey::ArrowUp).unwrap();
        assert_eq!(c.highlighted(), None);
        let out = c.handle_key(NavKey::Enter).unwrap();
        assert_eq!(out.command, None);
    }

    #[test]
    fn enter_activates_highlight() {
        let mut c = controller(fruit());
        c.handle_key(NavKey::ArrowDown).unwrap();
        c.handle_key(NavKey::ArrowDown).unwrap();
        let out = c.handle_key(NavKey::Enter).unwrap();
        assert_eq!(out.command, Some(KeyCommand::Activate(1)));
    }

    #[test]
    fn escape_dismisses_without_prevent_default() {
        let mut c = controller(fruit());
        let out = c.handle_key(NavKey::Escape).unwrap();
        assert_eq!(out.command, Some(KeyCommand::Dismiss));
        assert!(!out.prevent_default);
        assert_eq!(c.handle_key(NavKey::Other).unwrap(), KeyOutcome::default());
    }

    #[test]
    fn activate_writes_value_and_hides() {
        let config = SearchableSelectConfig::default();
        let mut c = controller(fruit());
        c.show(&config).unwrap();
        c.search("gr", &config).unwrap();
        let chosen = c.activate(0, &config).unwrap();
        assert_eq!(chosen.as_deref(), Some("g"));
        assert!(!c.is_visible());
        assert_eq!(c.surface().changes, 1);
        assert!(c.surface().options.iter().any(|o| o.value == "g" && o.selected));
        assert_eq!(c.surface().search_text, "");
    }

    #[test]
    fn activate_out_of_range_is_ignored() {
        let config = SearchableSelectConfig::default();
        let mut c = controller(fruit());
        assert_eq!(c.activate(99, &config).unwrap(), None);
        assert_eq!(c.surface().changes, 0);
    }

    #[test]
    fn search_keeps_term_and_filters() {
        let config = SearchableSelectConfig::default();
        let mut c = controller(fruit());
        c.search("AN", &config).unwrap();
        assert_eq!(c.search_term(), "AN");
        assert_eq!(c.shown().len(), 1);
        assert!(c.surface().list.entries[0].segments.iter().any(|s| s.highlighted));
    }
}
