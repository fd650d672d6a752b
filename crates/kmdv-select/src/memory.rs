#![forbid(unsafe_code)]

//! In-memory document host.
//!
//! A deterministic stand-in for the browser DOM: elements are plain structs,
//! layout is whatever the caller sets, and every surface operation is
//! recorded so tests can assert on it. Handles and surfaces share one
//! document, so a change made through a surface is visible through the
//! document and vice versa.
//!
//! ```
//! use kmdv_select::config::SearchableSelectConfig;
//! use kmdv_select::enhancer::Enhancer;
//! use kmdv_select::memory::{MemoryDocument, MemoryElement};
//! use kmdv_select::option_index::SourceOption;
//!
//! let doc = MemoryDocument::new();
//! let select = doc.insert(MemoryElement::select().with_options(
//!     (0..5).map(|i| SourceOption::new(format!("Item {i}"), i.to_string())),
//! ));
//! let mut enhancer = Enhancer::new(doc.clone(), SearchableSelectConfig::default());
//! let report = enhancer.scan();
//! assert_eq!(report.enhanced.len(), 1);
//! assert!(doc.element(select).is_converted("searchable-converted"));
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::config::SearchableSelectConfig;
use crate::error::SelectError;
use crate::geometry::{PanelLayout, Rect, Viewport};
use crate::option_index::SourceOption;
use crate::positioning::Placement;
use crate::registry::PanelId;
use crate::surface::{DocumentHost, RenderedList, SelectDescriptor, SelectSurface};

/// Recorded state of an enhanced select's panel.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryPanel {
    pub id: PanelId,
    pub visible: bool,
    pub search_text: String,
    pub search_focused: bool,
    pub placement: Option<Placement>,
    pub list: RenderedList,
    /// Number of full list renders.
    pub renders: usize,
}

impl MemoryPanel {
    fn new(id: PanelId) -> Self {
        Self {
            id,
            visible: false,
            search_text: String::new(),
            search_focused: false,
            placement: None,
            list: RenderedList::default(),
            renders: 0,
        }
    }

    /// Texts of the rendered rows.
    pub fn row_texts(&self) -> Vec<String> {
        self.list.entries.iter().map(|e| e.text()).collect()
    }
}

/// One element in the in-memory document.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryElement {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub options: Vec<SourceOption>,
    pub tab_index: i32,
    pub layout: PanelLayout,
    pub panel: Option<MemoryPanel>,
    /// `change` notifications dispatched on this element.
    pub change_events: usize,
    /// Wrapper containers inserted around this element.
    pub wrappers: usize,
}

impl MemoryElement {
    /// A generic element with the given tag name.
    pub fn new(tag: impl Into<String>) -> Self {
        let control = Rect::new(0.0, 100.0, 200.0, 30.0);
        Self {
            tag: tag.into().to_ascii_lowercase(),
            id: None,
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            options: Vec::new(),
            tab_index: 0,
            layout: PanelLayout {
                control,
                container: control,
                panel_height: 0.0,
                viewport: Viewport::new(1024.0, 768.0),
            },
            panel: None,
            change_events: 0,
            wrappers: 0,
        }
    }

    /// A `<select>` element.
    pub fn select() -> Self {
        Self::new("select")
    }

    /// Set the `id` (builder).
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a class (builder).
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Set an attribute (builder).
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Append options (builder).
    #[must_use]
    pub fn with_options(mut self, options: impl IntoIterator<Item = SourceOption>) -> Self {
        self.options.extend(options);
        self
    }

    /// Set the measured geometry (builder).
    #[must_use]
    pub fn with_layout(mut self, layout: PanelLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Whether the element carries `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Whether the element carries the converted marker.
    pub fn is_converted(&self, converted_class: &str) -> bool {
        self.has_class(converted_class)
    }

    /// Current value: the first selected option's value.
    pub fn value(&self) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.selected)
            .map(|o| o.value.as_str())
    }

    fn select_value(&mut self, value: &str) {
        let mut found = false;
        for opt in &mut self.options {
            opt.selected = !found && opt.value == value;
            found |= opt.selected;
        }
    }
}

/// Reference to an element in a [`MemoryDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementRef(usize);

type Shared = Rc<RefCell<Vec<MemoryElement>>>;

/// In-memory document; clones share the same elements.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    elements: Shared,
}

impl MemoryDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element in document order.
    pub fn insert(&self, element: MemoryElement) -> ElementRef {
        let mut elements = self.elements.borrow_mut();
        elements.push(element);
        ElementRef(elements.len() - 1)
    }

    /// Snapshot of an element.
    ///
    /// # Panics
    ///
    /// Panics if `r` came from a different document.
    pub fn element(&self, r: ElementRef) -> MemoryElement {
        self.elements.borrow()[r.0].clone()
    }

    /// Snapshot of an element's panel, if it was enhanced.
    pub fn panel(&self, r: ElementRef) -> Option<MemoryPanel> {
        self.elements.borrow()[r.0].panel.clone()
    }

    /// The select's current value.
    pub fn value(&self, r: ElementRef) -> Option<String> {
        self.elements.borrow()[r.0].value().map(str::to_string)
    }

    /// Change the value the way another script would: no events fire.
    pub fn set_value_externally(&self, r: ElementRef, value: &str) {
        self.elements.borrow_mut()[r.0].select_value(value);
    }

    /// Replace an element's options.
    pub fn set_options(&self, r: ElementRef, options: Vec<SourceOption>) {
        self.elements.borrow_mut()[r.0].options = options;
    }

    /// Replace an element's measured geometry.
    pub fn set_layout(&self, r: ElementRef, layout: PanelLayout) {
        self.elements.borrow_mut()[r.0].layout = layout;
    }

    /// Drop an element's panel markup, as another script tearing it out
    /// would. Later surface writes for that panel fail.
    pub fn remove_panel(&self, r: ElementRef) {
        self.elements.borrow_mut()[r.0].panel = None;
    }

    /// Number of visible panels across the document.
    pub fn visible_panels(&self) -> usize {
        self.elements
            .borrow()
            .iter()
            .filter(|e| e.panel.as_ref().is_some_and(|p| p.visible))
            .count()
    }

    fn matching(&self, selector: &Selector) -> Vec<ElementRef> {
        self.elements
            .borrow()
            .iter()
            .enumerate()
            .filter(|(_, el)| selector.matches(el))
            .map(|(i, _)| ElementRef(i))
            .collect()
    }
}

impl DocumentHost for MemoryDocument {
    type Handle = ElementRef;
    type Surface = MemorySurface;

    fn selects(&self) -> Vec<ElementRef> {
        self.elements
            .borrow()
            .iter()
            .enumerate()
            .filter(|(_, el)| el.tag == "select")
            .map(|(i, _)| ElementRef(i))
            .collect()
    }

    fn query_selects(&self, selector: &str) -> Result<Vec<ElementRef>, SelectError> {
        let selector = Selector::parse(selector)?;
        let elements = self.elements.borrow();
        Ok(self
            .matching(&selector)
            .into_iter()
            .filter(|r| elements[r.0].tag == "select")
            .collect())
    }

    fn describe(&self, select: &ElementRef, config: &SearchableSelectConfig) -> SelectDescriptor {
        let elements = self.elements.borrow();
        let el = &elements[select.0];
        SelectDescriptor {
            opted_in: el.attributes.contains_key(&config.opt_in_attribute),
            excluded: el.has_class(&config.exclusion_class),
            converted: el.has_class(&config.converted_class),
            options: el.options.clone(),
        }
    }

    fn enhance(
        &mut self,
        select: &ElementRef,
        panel: PanelId,
        config: &SearchableSelectConfig,
    ) -> Result<MemorySurface, SelectError> {
        let mut elements = self.elements.borrow_mut();
        let el = elements
            .get_mut(select.0)
            .ok_or_else(|| SelectError::host("element not in document"))?;
        if el.tag != "select" {
            return Err(SelectError::host(format!("<{}> is not a select", el.tag)));
        }
        el.classes.push(config.converted_class.clone());
        el.tab_index = -1;
        el.wrappers += 1;
        el.panel = Some(MemoryPanel::new(panel));
        Ok(MemorySurface {
            elements: Rc::clone(&self.elements),
            index: select.0,
        })
    }
}

/// Surface over one enhanced element of a [`MemoryDocument`].
#[derive(Debug, Clone)]
pub struct MemorySurface {
    elements: Shared,
    index: usize,
}

impl MemorySurface {
    fn with_panel<T>(&self, f: impl FnOnce(&mut MemoryPanel) -> T) -> Result<T, SelectError> {
        let mut elements = self.elements.borrow_mut();
        elements[self.index]
            .panel
            .as_mut()
            .map(f)
            .ok_or_else(|| SelectError::host("panel markup missing"))
    }
}

impl SelectSurface for MemorySurface {
    fn options(&self) -> Vec<SourceOption> {
        self.elements.borrow()[self.index].options.clone()
    }

    fn set_value(&mut self, value: &str) -> Result<(), SelectError> {
        self.elements.borrow_mut()[self.index].select_value(value);
        Ok(())
    }

    fn dispatch_change(&mut self) -> Result<(), SelectError> {
        self.elements.borrow_mut()[self.index].change_events += 1;
        Ok(())
    }

    fn measure(&self) -> PanelLayout {
        self.elements.borrow()[self.index].layout
    }

    fn apply_placement(&mut self, placement: &Placement) -> Result<(), SelectError> {
        self.with_panel(|p| p.placement = Some(*placement))
    }

    fn set_panel_visible(&mut self, visible: bool) -> Result<(), SelectError> {
        self.with_panel(|p| {
            p.visible = visible;
            if !visible {
                p.search_focused = false;
            }
        })
    }

    fn set_search_text(&mut self, text: &str) -> Result<(), SelectError> {
        self.with_panel(|p| p.search_text = text.to_string())
    }

    fn focus_search(&mut self) -> Result<(), SelectError> {
        self.with_panel(|p| p.search_focused = true)
    }

    fn render(&mut self, list: &RenderedList) -> Result<(), SelectError> {
        self.with_panel(|p| {
            p.list = list.clone();
            p.renders += 1;
        })
    }

    fn set_highlighted(&mut self, index: Option<usize>) -> Result<(), SelectError> {
        self.with_panel(|p| p.list.highlighted = index)
    }
}

/// A selector list of compound selectors: `tag#id.class[attr][attr=value]`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Selector {
    alternatives: Vec<Compound>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

impl Selector {
    fn parse(input: &str) -> Result<Self, SelectError> {
        let alternatives = input
            .split(',')
            .map(|part| Compound::parse(part.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { alternatives })
    }

    fn matches(&self, el: &MemoryElement) -> bool {
        self.alternatives.iter().any(|c| c.matches(el))
    }
}

const SIGILS: [char; 3] = ['#', '.', '['];

/// Combinators, pseudo-classes and whitespace are not supported.
fn is_name(token: &str) -> bool {
    !token.is_empty()
        && !token
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '>' | '+' | '~' | ':' | '(' | ')' | ']'))
}

impl Compound {
    fn parse(input: &str) -> Result<Self, SelectError> {
        let invalid = || SelectError::host(format!("unsupported selector {input:?}"));
        if input.is_empty() {
            return Err(invalid());
        }

        let mut compound = Self::default();
        let mut rest = input;
        let tag_end = rest.find(SIGILS).unwrap_or(rest.len());
        if tag_end > 0 {
            let tag = &rest[..tag_end];
            if !is_name(tag) && tag != "*" {
                return Err(invalid());
            }
            if tag != "*" {
                compound.tag = Some(tag.to_ascii_lowercase());
            }
            rest = &rest[tag_end..];
        }

        while let Some(sigil) = rest.chars().next() {
            rest = &rest[sigil.len_utf8()..];
            match sigil {
                '#' | '.' => {
                    let end = rest.find(SIGILS).unwrap_or(rest.len());
                    let name = &rest[..end];
                    if !is_name(name) {
                        return Err(invalid());
                    }
                    if sigil == '#' {
                        compound.id = Some(name.to_string());
                    } else {
                        compound.classes.push(name.to_string());
                    }
                    rest = &rest[end..];
                }
                '[' => {
                    let end = rest.find(']').ok_or_else(invalid)?;
                    let body = &rest[..end];
                    let attr = match body.split_once('=') {
                        Some((name, value)) => (
                            name.trim().to_string(),
                            Some(value.trim().trim_matches(['"', '\'']).to_string()),
                        ),
                        None => (body.trim().to_string(), None),
                    };
                    if !is_name(&attr.0) {
                        return Err(invalid());
                    }
                    compound.attributes.push(attr);
                    rest = &rest[end + 1..];
                }
                _ => return Err(invalid()),
            }
        }
        Ok(compound)
    }

    fn matches(&self, el: &MemoryElement) -> bool {
        self.tag.as_ref().is_none_or(|t| *t == el.tag)
            && self.id.as_ref().is_none_or(|id| el.id.as_ref() == Some(id))
            && self.classes.iter().all(|c| el.has_class(c))
            && self.attributes.iter().all(|(name, value)| {
                match (el.attributes.get(name), value) {
                    (Some(actual), Some(expected)) => actual == expected,
                    (Some(_), None) => true,
                    (None, _) => false,
                }
            })
    }
}
