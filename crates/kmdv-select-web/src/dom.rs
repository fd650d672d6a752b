#![forbid(unsafe_code)]

//! `web-sys` implementations of the core's host traits.
//!
//! Markup inserted per enhanced select:
//!
//! ```text
//! div.searchable-select-container
//! ├── select.searchable-converted        (moved inside, tabindex -1)
//! └── div.searchable-select-dropdown     (display: none until opened)
//!     ├── div.searchable-select-search-wrapper
//!     │   └── input.searchable-select-search
//!     └── div.searchable-select-options
//!         └── div.searchable-select-option[data-value][data-index]
//! ```
//!
//! Rows are built from text nodes and `span.searchable-highlight` elements;
//! option text never goes through `innerHTML`.

use kmdv_select::geometry::{PanelLayout, Rect, Viewport};
use kmdv_select::option_index::SourceOption;
use kmdv_select::positioning::Placement;
use kmdv_select::{
    DocumentHost, PanelId, RenderedEntry, RenderedList, SearchableSelectConfig, SelectDescriptor,
    SelectError, SelectSurface,
};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, DomRect, Element, Event, EventInit, HtmlElement, HtmlInputElement,
    HtmlOptionElement, HtmlSelectElement, Node, Window,
};

use crate::mutations::CONTAINER_CLASS;

pub(crate) const OPTION_CLASS: &str = "searchable-select-option";
const DROPDOWN_CLASS: &str = "searchable-select-dropdown";
const SEARCH_WRAPPER_CLASS: &str = "searchable-select-search-wrapper";
const SEARCH_CLASS: &str = "searchable-select-search";
const OPTIONS_CLASS: &str = "searchable-select-options";
const HIGHLIGHT_CLASS: &str = "searchable-highlight";
const SELECTED_CLASS: &str = "selected";
const CURSOR_CLASS: &str = "highlighted";

/// Attribute carrying a row's position in the rendered list.
pub(crate) const INDEX_ATTRIBUTE: &str = "data-index";

/// Convert a thrown JS value into a host error.
pub(crate) fn js_error(err: JsValue) -> SelectError {
    SelectError::host(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

fn create<T: JsCast>(document: &Document, tag: &str, class: &str) -> Result<T, SelectError> {
    let element = document.create_element(tag).map_err(js_error)?;
    element.set_class_name(class);
    element
        .dyn_into::<T>()
        .map_err(|_| SelectError::host(format!("<{tag}> has an unexpected type")))
}

fn to_rect(rect: &DomRect) -> Rect {
    Rect::new(rect.x(), rect.y(), rect.width(), rect.height())
}

fn read_options(select: &HtmlSelectElement) -> Vec<SourceOption> {
    let Ok(nodes) = select.query_selector_all("option") else {
        return Vec::new();
    };
    (0..nodes.length())
        .filter_map(|i| nodes.get(i))
        .filter_map(|node| node.dyn_into::<HtmlOptionElement>().ok())
        .map(|opt| SourceOption {
            text: opt.text_content().unwrap_or_default(),
            value: opt.value(),
            has_value_attribute: opt.has_attribute("value"),
            selected: opt.selected(),
        })
        .collect()
}

/// The live page.
#[derive(Debug, Clone)]
pub(crate) struct WebDocument {
    window: Window,
    document: Document,
}

impl WebDocument {
    pub(crate) fn new(window: Window, document: Document) -> Self {
        Self { window, document }
    }

    pub(crate) fn document(&self) -> &Document {
        &self.document
    }
}

impl DocumentHost for WebDocument {
    type Handle = HtmlSelectElement;
    type Surface = WebSurface;

    fn selects(&self) -> Vec<HtmlSelectElement> {
        let found = self.document.get_elements_by_tag_name("select");
        (0..found.length())
            .filter_map(|i| found.item(i))
            .filter_map(|el| el.dyn_into::<HtmlSelectElement>().ok())
            .collect()
    }

    fn query_selects(&self, selector: &str) -> Result<Vec<HtmlSelectElement>, SelectError> {
        let found = self.document.query_selector_all(selector).map_err(js_error)?;
        Ok((0..found.length())
            .filter_map(|i| found.get(i))
            .filter_map(|node| node.dyn_into::<HtmlSelectElement>().ok())
            .collect())
    }

    fn describe(
        &self,
        select: &HtmlSelectElement,
        config: &SearchableSelectConfig,
    ) -> SelectDescriptor {
        let classes = select.class_list();
        SelectDescriptor {
            opted_in: select.has_attribute(&config.opt_in_attribute),
            excluded: classes.contains(&config.exclusion_class),
            converted: classes.contains(&config.converted_class),
            options: read_options(select),
        }
    }

    fn enhance(
        &mut self,
        select: &HtmlSelectElement,
        panel: PanelId,
        config: &SearchableSelectConfig,
    ) -> Result<WebSurface, SelectError> {
        let parent = select
            .parent_node()
            .ok_or_else(|| SelectError::host("select is not attached to the document"))?;
        let doc = &self.document;

        let container: HtmlElement = create(doc, "div", CONTAINER_CLASS)?;
        let dropdown: HtmlElement = create(doc, "div", DROPDOWN_CLASS)?;
        let wrapper: HtmlElement = create(doc, "div", SEARCH_WRAPPER_CLASS)?;
        let search: HtmlInputElement = create(doc, "input", SEARCH_CLASS)?;
        let options: HtmlElement = create(doc, "div", OPTIONS_CLASS)?;
        search.set_type("text");
        search.set_placeholder(&config.search_placeholder);
        dropdown
            .style()
            .set_property("display", "none")
            .map_err(js_error)?;

        wrapper.append_child(&search).map_err(js_error)?;
        dropdown.append_child(&wrapper).map_err(js_error)?;
        dropdown.append_child(&options).map_err(js_error)?;

        let select_node: &Node = select;
        parent
            .insert_before(&container, Some(select_node))
            .map_err(js_error)?;
        container.append_child(select_node).map_err(js_error)?;
        container.append_child(&dropdown).map_err(js_error)?;

        select
            .class_list()
            .add_1(&config.converted_class)
            .map_err(js_error)?;
        select.set_tab_index(-1);
        container
            .set_attribute("data-searchable-panel", &panel.get().to_string())
            .map_err(js_error)?;

        Ok(WebSurface {
            window: self.window.clone(),
            document: self.document.clone(),
            select: select.clone(),
            container,
            dropdown,
            search,
            options,
        })
    }
}

/// DOM elements of one enhanced select.
#[derive(Debug, Clone)]
pub(crate) struct WebSurface {
    window: Window,
    document: Document,
    pub(crate) select: HtmlSelectElement,
    pub(crate) container: HtmlElement,
    dropdown: HtmlElement,
    pub(crate) search: HtmlInputElement,
    pub(crate) options: HtmlElement,
}

impl WebSurface {
    /// Whether `target` lies inside this widget's container.
    pub(crate) fn contains(&self, target: &Node) -> bool {
        self.container.contains(Some(target))
    }

    fn viewport(&self) -> Viewport {
        let dimension = |value: Result<JsValue, JsValue>| {
            value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0)
        };
        Viewport::new(
            dimension(self.window.inner_width()),
            dimension(self.window.inner_height()),
        )
    }

    fn row(&self, index: usize, entry: &RenderedEntry) -> Result<Element, SelectError> {
        let row: HtmlElement = create(&self.document, "div", OPTION_CLASS)?;
        row.set_attribute("data-value", &entry.value).map_err(js_error)?;
        row.set_attribute(INDEX_ATTRIBUTE, &index.to_string())
            .map_err(js_error)?;
        if entry.selected {
            row.class_list().add_1(SELECTED_CLASS).map_err(js_error)?;
        }
        for segment in &entry.segments {
            if segment.highlighted {
                let span: HtmlElement = create(&self.document, "span", HIGHLIGHT_CLASS)?;
                span.set_text_content(Some(&segment.text));
                row.append_child(&span).map_err(js_error)?;
            } else {
                let text = self.document.create_text_node(&segment.text);
                row.append_child(&text).map_err(js_error)?;
            }
        }
        Ok(row.into())
    }
}

impl SelectSurface for WebSurface {
    fn options(&self) -> Vec<SourceOption> {
        read_options(&self.select)
    }

    fn set_value(&mut self, value: &str) -> Result<(), SelectError> {
        self.select.set_value(value);
        Ok(())
    }

    fn dispatch_change(&mut self) -> Result<(), SelectError> {
        let init = EventInit::new();
        init.set_bubbles(true);
        let event = Event::new_with_event_init_dict("change", &init).map_err(js_error)?;
        self.select.dispatch_event(&event).map_err(js_error)?;
        Ok(())
    }

    fn measure(&self) -> PanelLayout {
        PanelLayout {
            control: to_rect(&self.select.get_bounding_client_rect()),
            container: to_rect(&self.container.get_bounding_client_rect()),
            panel_height: self.dropdown.get_bounding_client_rect().height(),
            viewport: self.viewport(),
        }
    }

    fn apply_placement(&mut self, placement: &Placement) -> Result<(), SelectError> {
        let style = self.dropdown.style();
        for (property, value) in placement.style_properties() {
            style.set_property(property, &value).map_err(js_error)?;
        }
        Ok(())
    }

    fn set_panel_visible(&mut self, visible: bool) -> Result<(), SelectError> {
        let display = if visible { "block" } else { "none" };
        self.dropdown
            .style()
            .set_property("display", display)
            .map_err(js_error)
    }

    fn set_search_text(&mut self, text: &str) -> Result<(), SelectError> {
        self.search.set_value(text);
        Ok(())
    }

    fn focus_search(&mut self) -> Result<(), SelectError> {
        self.search.focus().map_err(js_error)
    }

    fn render(&mut self, list: &RenderedList) -> Result<(), SelectError> {
        self.options.set_text_content(None);
        for (index, entry) in list.entries.iter().enumerate() {
            let row = self.row(index, entry)?;
            if list.highlighted == Some(index) {
                row.class_list().add_1(CURSOR_CLASS).map_err(js_error)?;
            }
            self.options.append_child(&row).map_err(js_error)?;
        }
        Ok(())
    }

    fn set_highlighted(&mut self, index: Option<usize>) -> Result<(), SelectError> {
        let rows = self.options.children();
        for i in 0..rows.length() {
            if let Some(row) = rows.item(i) {
                let on = index == Some(i as usize);
                row.class_list()
                    .toggle_with_force(CURSOR_CLASS, on)
                    .map_err(js_error)?;
                if on {
                    row.scroll_into_view_with_bool(false);
                }
            }
        }
        Ok(())
    }
}
