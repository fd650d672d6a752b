#![forbid(unsafe_code)]

//! Page runtime: one [`Enhancer`] per page, driven by DOM events.
//!
//! Listeners post [`PageEvent`]s into a thread-local [`EventGate`]. An event
//! raised while the runtime is already held (the `change` listener firing
//! inside our own `dispatchEvent`, or page code calling back into the exports
//! from a `change` handler) is queued and handled before the outer access
//! ends. Deferred work is driven by a single `setTimeout` armed for the
//! enhancer's next deadline.

use std::cell::RefCell;
use std::time::Duration;

use kmdv_select::{Enhancer, KeyOutcome, NavKey, PanelId, SearchableSelectConfig, SelectError};
use tracing::level_filters::LevelFilter;
use tracing::{debug, info, trace, warn};
use tracing_subscriber::layer::SubscriberExt;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    AddEventListenerOptions, Document, Element, Event, EventTarget, KeyboardEvent,
    MutationObserver, MutationObserverInit, MutationRecord, Node, Window,
};
use web_time::Instant;

use crate::console_layer::{ConsoleLayer, LevelHandle};
use crate::dom::{INDEX_ATTRIBUTE, OPTION_CLASS, WebDocument, WebSurface, js_error};
use crate::event_gate::{EventGate, GateState};
use crate::mutations::{AddedNode, CONTAINER_CLASS, triggers_rescan};
use crate::page_config::{
    CONFIG_GLOBAL, console_level, resolve_config, resolve_config_or_default,
};

#[derive(Debug)]
enum PageEvent {
    Open(PanelId),
    Search(PanelId, String),
    Activate(PanelId, usize),
    DocumentClick(Node),
    Resize,
    Changed(PanelId),
    ElementsAdded,
    Timer,
    Manual(String),
    Configure(Box<SearchableSelectConfig>),
}

/// A `setTimeout` registration. Dropping it frees the callback.
struct ArmedTimer {
    handle: i32,
    deadline: Duration,
    _callback: Closure<dyn FnMut()>,
}

struct Runtime {
    window: Window,
    enhancer: Enhancer<WebDocument>,
    started: Instant,
    timer: Option<ArmedTimer>,
    /// The last timer that fired. Its callback is still on the stack while
    /// the runtime handles its event, so it is freed on the next firing.
    fired: Option<ArmedTimer>,
    /// Panels whose listeners are installed.
    wired: usize,
    observing: bool,
}

thread_local! {
    static RUNTIME: EventGate<Runtime> = const { EventGate::new() };
    static LOG_LEVEL: RefCell<Option<LevelHandle>> = const { RefCell::new(None) };
}

/// Run `f` against the runtime. `None` when the runtime is missing or
/// already held.
fn with_runtime<T>(f: impl FnOnce(&mut Runtime) -> T) -> Option<T> {
    RUNTIME.with(|gate| gate.with(f))
}

fn post(event: PageEvent) {
    RUNTIME.with(|gate| gate.post(event));
}

impl GateState for Runtime {
    type Event = PageEvent;

    fn handle(&mut self, event: PageEvent) {
        let now = self.now();
        let result = match event {
            PageEvent::Open(id) => self.enhancer.open(id),
            PageEvent::Search(id, text) => self.enhancer.search_input(id, &text),
            PageEvent::Activate(id, index) => self.enhancer.activate(id, index).map(drop),
            PageEvent::DocumentClick(target) => self.document_click(&target),
            PageEvent::Resize => self.enhancer.viewport_resized(),
            PageEvent::Changed(id) => {
                self.enhancer.select_changed(id, now);
                Ok(())
            }
            PageEvent::ElementsAdded => {
                self.enhancer.elements_added(now);
                Ok(())
            }
            PageEvent::Timer => {
                self.fired = self.timer.take();
                let ran = self.enhancer.run_due(now);
                trace!(ran, "deferred tasks ran");
                Ok(())
            }
            PageEvent::Manual(selector) => self.enhance_matching(&selector).map(drop),
            PageEvent::Configure(config) => {
                self.enhancer.set_config(*config);
                Ok(())
            }
        };
        if let Err(err) = result {
            warn!(error = %err, "event handling failed");
        }
        self.wire_new_panels();
    }

    fn settle(&mut self) {
        self.arm_timer();
    }
}

impl Runtime {
    fn new(window: Window, document: Document, config: SearchableSelectConfig) -> Self {
        Self {
            enhancer: Enhancer::new(WebDocument::new(window.clone(), document), config),
            window,
            started: Instant::now(),
            timer: None,
            fired: None,
            wired: 0,
            observing: false,
        }
    }

    fn now(&self) -> Duration {
        self.started.elapsed()
    }

    fn key(&mut self, id: PanelId, key: NavKey) -> KeyOutcome {
        let outcome = self.enhancer.key(id, key).unwrap_or_else(|err| {
            warn!(panel = %id, error = %err, "key handling failed");
            KeyOutcome::default()
        });
        self.wire_new_panels();
        outcome
    }

    fn enhance_matching(&mut self, selector: &str) -> Result<usize, SelectError> {
        let report = self.enhancer.enhance_matching(selector)?;
        self.wire_new_panels();
        Ok(report.enhanced.len())
    }

    fn document_click(&mut self, target: &Node) -> Result<(), SelectError> {
        let Some(id) = self.enhancer.open_panel() else {
            return Ok(());
        };
        let inside = self
            .enhancer
            .controller(id)
            .is_some_and(|c| c.surface().contains(target));
        if inside {
            Ok(())
        } else {
            self.enhancer.pointer_outside(id)
        }
    }

    /// First scan once the body exists; also starts observing insertions.
    fn start_page(&mut self) {
        if !self.observing {
            match observe_insertions(self.enhancer.document().document()) {
                Ok(()) => self.observing = true,
                Err(err) => warn!(error = %err, "cannot observe page mutations"),
            }
        }
        let report = self.enhancer.scan();
        self.wire_new_panels();
        info!(enhanced = report.enhanced.len(), "searchable selects initialised");
    }

    fn wire_new_panels(&mut self) {
        while self.wired < self.enhancer.panel_count() {
            let Ok(raw) = u32::try_from(self.wired) else {
                break;
            };
            let id = PanelId::new(raw);
            if let Some(controller) = self.enhancer.controller(id)
                && let Err(err) = wire_panel(id, controller.surface())
            {
                warn!(panel = %id, error = %err, "failed to install listeners");
            }
            self.wired += 1;
        }
    }

    fn arm_timer(&mut self) {
        let Some(deadline) = self.enhancer.next_deadline() else {
            return;
        };
        if let Some(armed) = &self.timer {
            if armed.deadline <= deadline {
                return;
            }
            self.window.clear_timeout_with_handle(armed.handle);
            // Cancelled before firing; dropping frees the callback.
            self.timer = None;
        }
        let delay = deadline.saturating_sub(self.now());
        let millis = i32::try_from(delay.as_micros().div_ceil(1000)).unwrap_or(i32::MAX);
        let callback = Closure::<dyn FnMut()>::new(|| post(PageEvent::Timer));
        match self.window.set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.as_ref().unchecked_ref(),
            millis,
        ) {
            Ok(handle) => {
                self.timer = Some(ArmedTimer {
                    handle,
                    deadline,
                    _callback: callback,
                });
            }
            Err(err) => warn!(error = %js_error(err), "failed to arm timer"),
        }
    }
}

// --- Listeners ---

fn listen(
    target: &EventTarget,
    event: &str,
    handler: impl FnMut(Event) + 'static,
) -> Result<(), SelectError> {
    let closure = Closure::<dyn FnMut(Event)>::new(handler);
    target
        .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
        .map_err(js_error)?;
    // Widgets are never torn down, so their listeners live as long as the page.
    closure.forget();
    Ok(())
}

fn wire_panel(id: PanelId, surface: &WebSurface) -> Result<(), SelectError> {
    listen(&surface.select, "focus", move |_| post(PageEvent::Open(id)))?;
    listen(&surface.select, "click", move |_| post(PageEvent::Open(id)))?;
    listen(&surface.select, "change", move |_| post(PageEvent::Changed(id)))?;

    let input = surface.search.clone();
    listen(&surface.search, "input", move |_| {
        post(PageEvent::Search(id, input.value()));
    })?;

    listen(&surface.search, "keydown", move |event| {
        let Some(key) = event
            .dyn_ref::<KeyboardEvent>()
            .map(|k| NavKey::from_dom_key(&k.key()))
        else {
            return;
        };
        if key == NavKey::Other {
            return;
        }
        if with_runtime(|runtime| runtime.key(id, key)).is_some_and(|o| o.prevent_default) {
            event.prevent_default();
        }
    })?;

    let row_selector = format!(".{OPTION_CLASS}");
    listen(&surface.options, "click", move |event| {
        let index = event
            .target()
            .and_then(|t| t.dyn_into::<Element>().ok())
            .and_then(|el| el.closest(&row_selector).ok().flatten())
            .and_then(|row| row.get_attribute(INDEX_ATTRIBUTE))
            .and_then(|raw| raw.parse::<usize>().ok());
        if let Some(index) = index {
            post(PageEvent::Activate(id, index));
        }
    })?;

    debug!(panel = %id, "listeners installed");
    Ok(())
}

fn wire_page(window: &Window, document: &Document) -> Result<(), SelectError> {
    listen(document, "click", |event| {
        if let Some(node) = event.target().and_then(|t| t.dyn_into::<Node>().ok()) {
            post(PageEvent::DocumentClick(node));
        }
    })?;
    listen(window, "resize", |_| post(PageEvent::Resize))
}

fn added_node(node: &Node) -> AddedNode {
    match node.dyn_ref::<Element>() {
        Some(el) if node.node_type() == Node::ELEMENT_NODE => {
            let classes = el.class_list();
            AddedNode::element((0..classes.length()).filter_map(|i| classes.item(i)))
        }
        _ => AddedNode::Other,
    }
}

/// Whether a mutation inserted elements outside every widget container.
fn adds_page_elements(record: &MutationRecord) -> bool {
    let container_selector = format!(".{CONTAINER_CLASS}");
    let inside_widget = record
        .target()
        .and_then(|t| t.dyn_into::<Element>().ok())
        .and_then(|el| el.closest(&container_selector).ok().flatten())
        .is_some();
    let added = record.added_nodes();
    let nodes = (0..added.length())
        .filter_map(|i| added.get(i))
        .map(|node| added_node(&node));
    triggers_rescan(&record.type_(), inside_widget, nodes)
}

fn observe_insertions(document: &Document) -> Result<(), SelectError> {
    let body = document
        .body()
        .ok_or_else(|| SelectError::host("document has no body"))?;
    let callback = Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::new(
        |records: js_sys::Array, _observer: MutationObserver| {
            let relevant = records
                .iter()
                .filter_map(|r| r.dyn_into::<MutationRecord>().ok())
                .any(|r| adds_page_elements(&r));
            if relevant {
                post(PageEvent::ElementsAdded);
            }
        },
    );
    let observer = MutationObserver::new(callback.as_ref().unchecked_ref()).map_err(js_error)?;
    let init = MutationObserverInit::new();
    init.set_child_list(true);
    init.set_subtree(true);
    observer
        .observe_with_options(&body, &init)
        .map_err(js_error)?;
    callback.forget();
    Ok(())
}

// --- Setup ---

fn stringify(value: &JsValue) -> Option<String> {
    if value.is_undefined() || value.is_null() {
        return None;
    }
    js_sys::JSON::stringify(value).ok().map(String::from)
}

fn install_logging(level: LevelFilter) {
    let (layer, handle) = ConsoleLayer::browser(level);
    let subscriber = tracing_subscriber::registry().with(layer);
    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        LOG_LEVEL.with(|slot| *slot.borrow_mut() = Some(handle));
    }
}

fn expose_global(window: &Window) -> Result<(), JsValue> {
    let entry = Closure::<dyn Fn(String) -> JsValue>::new(|selector: String| {
        match make_select_searchable(&selector) {
            Ok(count) => JsValue::from_f64(count as f64),
            Err(err) => {
                warn!(selector = %selector, error = ?err, "makeSelectSearchable failed");
                JsValue::UNDEFINED
            }
        }
    });
    js_sys::Reflect::set(
        window,
        &JsValue::from_str("makeSelectSearchable"),
        entry.as_ref(),
    )?;
    entry.forget();
    Ok(())
}

fn to_js(err: SelectError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Module entry point: read page configuration, install logging and
/// listeners, and scan once the DOM is ready.
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let page_json = js_sys::Reflect::get(&window, &JsValue::from_str(CONFIG_GLOBAL))
        .ok()
        .and_then(|value| stringify(&value));
    let (config, config_error) = resolve_config_or_default(page_json.as_deref());
    install_logging(console_level(&config));
    if let Some(err) = config_error {
        warn!(error = %err, "ignoring window.{CONFIG_GLOBAL}");
    }

    wire_page(&window, &document).map_err(to_js)?;
    let runtime = Runtime::new(window.clone(), document.clone(), config);
    if !RUNTIME.with(|gate| gate.install(runtime)) {
        return Err(JsValue::from_str("runtime is busy"));
    }
    expose_global(&window)?;

    if document.ready_state() == "loading" {
        let options = AddEventListenerOptions::new();
        options.set_once(true);
        let ready = Closure::once_into_js(|| {
            with_runtime(Runtime::start_page);
        });
        document.add_event_listener_with_callback_and_add_event_listener_options(
            "DOMContentLoaded",
            ready.unchecked_ref(),
            &options,
        )?;
    } else {
        with_runtime(Runtime::start_page);
    }
    Ok(())
}

/// Enhance every select matching `selector`, ignoring the option threshold
/// and the exclusion class. Returns how many selects were enhanced.
#[wasm_bindgen(js_name = makeSelectSearchable)]
pub fn make_select_searchable(selector: &str) -> Result<usize, JsValue> {
    match with_runtime(|runtime| runtime.enhance_matching(selector)) {
        Some(result) => result.map_err(to_js),
        None => {
            post(PageEvent::Manual(selector.to_string()));
            Ok(0)
        }
    }
}

/// Replace the configuration from a plain JS object.
#[wasm_bindgen(js_name = configureSearchableSelect)]
pub fn configure_searchable_select(options: JsValue) -> Result<(), JsValue> {
    let config = resolve_config(stringify(&options).as_deref()).map_err(to_js)?;
    if let Some(handle) = LOG_LEVEL.with(|slot| slot.borrow().clone()) {
        handle.set(console_level(&config));
    }
    post(PageEvent::Configure(Box::new(config)));
    Ok(())
}
