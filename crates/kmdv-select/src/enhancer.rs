#![forbid(unsafe_code)]

//! Page orchestrator: the scanner, every widget controller, the open-panel
//! registry and the deferred task queue.
//!
//! Hosts forward DOM events to the matching method (`open`, `key`,
//! `search_input`, `pointer_outside`, `viewport_resized`, `select_changed`,
//! `elements_added`) and call [`Enhancer::run_due`] whenever the deadline
//! reported by [`Enhancer::next_deadline`] passes.
//!
//! # Invariants
//!
//! 1. At most one panel is visible: every open goes through the registry and
//!    the displaced panel is hidden before the new one is shown.
//! 2. A select is enhanced at most once: converted selects are skipped.
//! 3. Controller slots are never removed, so a [`PanelId`] stays valid for
//!    the lifetime of the enhancer.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::SearchableSelectConfig;
use crate::controller::{KeyCommand, KeyOutcome, NavKey, WidgetController};
use crate::error::SelectError;
use crate::registry::{DropdownRegistry, PanelId, SingleOpenRegistry};
use crate::scanner::{Eligibility, ScanReport, classify, classify_manual};
use crate::schedule::{DeferredTask, TaskQueue};
use crate::surface::DocumentHost;

fn slot<S>(
    controllers: &mut [WidgetController<S>],
    id: PanelId,
) -> Result<&mut WidgetController<S>, SelectError> {
    controllers
        .get_mut(id.get() as usize)
        .ok_or(SelectError::UnknownPanel(id))
}

/// Enhances selects of one document and routes their events.
pub struct Enhancer<D: DocumentHost, R = SingleOpenRegistry> {
    document: D,
    registry: R,
    config: SearchableSelectConfig,
    controllers: Vec<WidgetController<D::Surface>>,
    tasks: TaskQueue,
}

impl<D: DocumentHost> Enhancer<D, SingleOpenRegistry> {
    /// Create an enhancer with the stock registry.
    pub fn new(document: D, config: SearchableSelectConfig) -> Self {
        Self::with_registry(document, SingleOpenRegistry::new(), config)
    }
}

impl<D: DocumentHost, R: DropdownRegistry> Enhancer<D, R> {
    /// Create an enhancer with a caller-supplied registry.
    pub fn with_registry(document: D, registry: R, config: SearchableSelectConfig) -> Self {
        Self {
            document,
            registry,
            config,
            controllers: Vec::new(),
            tasks: TaskQueue::new(),
        }
    }

    pub fn config(&self) -> &SearchableSelectConfig {
        &self.config
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Replace the configuration. Already enhanced selects keep their
    /// markup; scans, renders and delays use the new values from now on.
    pub fn set_config(&mut self, config: SearchableSelectConfig) {
        debug!(?config, "configuration replaced");
        self.config = config;
    }

    /// Number of enhanced selects.
    pub fn panel_count(&self) -> usize {
        self.controllers.len()
    }

    pub fn controller(&self, id: PanelId) -> Option<&WidgetController<D::Surface>> {
        self.controllers.get(id.get() as usize)
    }

    /// Panel holding the registry's open slot.
    pub fn open_panel(&self) -> Option<PanelId> {
        self.registry.current()
    }

    /// Panels whose controller reports visible.
    pub fn visible_panels(&self) -> Vec<PanelId> {
        self.controllers
            .iter()
            .filter(|c| c.is_visible())
            .map(|c| c.id())
            .collect()
    }

    /// Earliest deferred deadline, for the host's timer.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.tasks.next_deadline()
    }

    // --- Scanning ---

    /// Enhance every eligible select in the document.
    pub fn scan(&mut self) -> ScanReport {
        let mut report = ScanReport::default();
        for select in self.document.selects() {
            let descriptor = self.document.describe(&select, &self.config);
            let eligibility = classify(&descriptor, &self.config);
            self.apply(&select, eligibility, &mut report);
        }
        if !report.enhanced.is_empty() {
            info!(
                enhanced = report.enhanced.len(),
                total = self.controllers.len(),
                "scan enhanced selects"
            );
        }
        debug!(?report, "scan finished");
        report
    }

    /// Enhance every unconverted select matching `selector`, ignoring the
    /// exclusion class and the option threshold.
    pub fn enhance_matching(&mut self, selector: &str) -> Result<ScanReport, SelectError> {
        let mut report = ScanReport::default();
        for select in self.document.query_selects(selector)? {
            let eligibility = classify_manual(&self.document.describe(&select, &self.config));
            self.apply(&select, eligibility, &mut report);
        }
        debug!(selector, ?report, "manual enhancement finished");
        Ok(report)
    }

    fn apply(&mut self, select: &D::Handle, eligibility: Eligibility, report: &mut ScanReport) {
        if !eligibility.should_enhance() {
            report.record_skip(eligibility);
            return;
        }
        match self.enhance(select) {
            Ok(id) => report.enhanced.push(id),
            Err(err) => {
                warn!(error = %err, "failed to enhance select; leaving it plain");
                report.failed += 1;
            }
        }
    }

    fn enhance(&mut self, select: &D::Handle) -> Result<PanelId, SelectError> {
        let raw = u32::try_from(self.controllers.len())
            .map_err(|_| SelectError::host("panel id space exhausted"))?;
        let id = PanelId::new(raw);
        let surface = self.document.enhance(select, id, &self.config)?;
        let mut controller = WidgetController::new(id, surface);
        if let Err(err) = controller.refresh(&self.config) {
            warn!(panel = %id, error = %err, "initial render failed");
        }
        self.controllers.push(controller);
        debug!(panel = %id, "enhanced select");
        Ok(id)
    }

    // --- Panel lifecycle ---

    /// Open `id`, closing whichever panel was open before.
    pub fn open(&mut self, id: PanelId) -> Result<(), SelectError> {
        slot(&mut self.controllers, id)?;
        let displaced = self.registry.acquire(id);
        let result = displaced
            .map_or(Ok(()), |prev| {
                slot(&mut self.controllers, prev).and_then(WidgetController::hide)
            })
            .and_then(|()| slot(&mut self.controllers, id)?.show(&self.config));
        if result.is_err() {
            self.registry.release(id);
        }
        result
    }

    /// Close `id` and release the registry if it holds the open slot.
    pub fn close(&mut self, id: PanelId) -> Result<(), SelectError> {
        let result = slot(&mut self.controllers, id)?.hide();
        self.registry.release(id);
        result
    }

    /// The search box of `id` changed.
    pub fn search_input(&mut self, id: PanelId, text: &str) -> Result<(), SelectError> {
        slot(&mut self.controllers, id)?.search(text, &self.config)
    }

    /// A key went down in the search box of `id`.
    pub fn key(&mut self, id: PanelId, key: NavKey) -> Result<KeyOutcome, SelectError> {
        let outcome = slot(&mut self.controllers, id)?.handle_key(key)?;
        match outcome.command {
            Some(KeyCommand::Activate(index)) => {
                self.activate(id, index)?;
            }
            Some(KeyCommand::Dismiss) => self.close(id)?,
            None => {}
        }
        Ok(outcome)
    }

    /// A rendered row of `id` was chosen (click or Enter).
    pub fn activate(&mut self, id: PanelId, index: usize) -> Result<Option<String>, SelectError> {
        let chosen = slot(&mut self.controllers, id)?.activate(index, &self.config)?;
        if chosen.is_some() {
            self.registry.release(id);
        }
        Ok(chosen)
    }

    /// A pointer interaction happened outside the container of `id`.
    pub fn pointer_outside(&mut self, id: PanelId) -> Result<(), SelectError> {
        if slot(&mut self.controllers, id)?.is_visible() {
            self.close(id)?;
        }
        Ok(())
    }

    /// The window was resized; re-place the open panel only.
    pub fn viewport_resized(&mut self) -> Result<(), SelectError> {
        let Some(id) = self.registry.current() else {
            return Ok(());
        };
        let controller = slot(&mut self.controllers, id)?;
        if controller.is_visible() {
            controller.reposition(&self.config)?;
        }
        Ok(())
    }

    // --- Deferred work ---

    /// The native select of `id` reported a value change.
    pub fn select_changed(&mut self, id: PanelId, now: Duration) {
        self.tasks
            .schedule(now, self.config.refresh_delay(), DeferredTask::Refresh(id));
    }

    /// Element nodes were added somewhere in the observed subtree.
    pub fn elements_added(&mut self, now: Duration) {
        if self
            .tasks
            .schedule(now, self.config.rescan_delay(), DeferredTask::Rescan)
        {
            debug!("rescan scheduled");
        }
    }

    /// Run every deferred task due at `now`. Returns how many ran.
    pub fn run_due(&mut self, now: Duration) -> usize {
        let due = self.tasks.take_due(now);
        for task in &due {
            match *task {
                DeferredTask::Rescan => {
                    self.scan();
                }
                DeferredTask::Refresh(id) => {
                    if let Err(err) =
                        slot(&mut self.controllers, id).and_then(|c| c.refresh(&self.config))
                    {
                        warn!(panel = %id, error = %err, "refresh failed");
                    }
                }
            }
        }
        due.len()
    }
}

impl<D: DocumentHost, R: core::fmt::Debug> core::fmt::Debug for Enhancer<D, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Enhancer")
            .field("registry", &self.registry)
            .field("panels", &self.controllers.len())
            .field("pending_tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDocument, MemoryElement};
    use crate::option_index::SourceOption;

    fn options(n: usize) -> Vec<SourceOption> {
        (0..n)
            .map(|i| SourceOption::new(format!("Item {i}"), i.to_string()))
            .collect()
    }

    fn setup(selects: usize) -> (MemoryDocument, Enhancer<MemoryDocument>) {
        let doc = MemoryDocument::new();
        for _ in 0..selects {
            doc.insert(MemoryElement::select().with_options(options(6)));
        }
        let mut enhancer = Enhancer::new(doc.clone(), SearchableSelectConfig::default());
        enhancer.scan();
        (doc, enhancer)
    }

    #[test]
    fn unknown_panel_is_an_error() {
        let (_, mut e) = setup(1);
        assert_eq!(
            e.open(PanelId::new(5)),
            Err(SelectError::UnknownPanel(PanelId::new(5)))
        );
        assert_eq!(e.open_panel(), None);
    }

    #[test]
    fn opening_second_closes_first() {
        let (doc, mut e) = setup(2);
        e.open(PanelId::new(0)).unwrap();
        e.open(PanelId::new(1)).unwrap();
        assert_eq!(e.visible_panels(), vec![PanelId::new(1)]);
        assert_eq!(doc.visible_panels(), 1);
        assert_eq!(e.open_panel(), Some(PanelId::new(1)));
    }

    #[test]
    fn escape_releases_registry() {
        let (_, mut e) = setup(1);
        let id = PanelId::new(0);
        e.open(id).unwrap();
        e.key(id, NavKey::Escape).unwrap();
        assert_eq!(e.open_panel(), None);
        assert!(e.visible_panels().is_empty());
    }

    #[test]
    fn new_config_applies_to_later_scans() {
        let doc = MemoryDocument::new();
        doc.insert(MemoryElement::select().with_options(options(3)));
        let mut e = Enhancer::new(doc.clone(), SearchableSelectConfig::default());
        assert!(e.scan().enhanced.is_empty());
        e.set_config(SearchableSelectConfig {
            min_options: 3,
            ..SearchableSelectConfig::default()
        });
        assert_eq!(e.scan().enhanced, vec![PanelId::new(0)]);
    }

    #[test]
    fn resize_without_open_panel_is_noop() {
        let (_, mut e) = setup(1);
        assert!(e.viewport_resized().is_ok());
    }

    #[tracing_test::traced_test]
    #[test]
    fn refresh_for_unknown_panel_is_logged_not_fatal() {
        let (_, mut e) = setup(1);
        e.select_changed(PanelId::new(42), Duration::ZERO);
        assert_eq!(e.run_due(Duration::from_millis(50)), 1);
        assert!(logs_contain("refresh failed"));
        assert!(logs_contain("unknown panel #42"));
    }

    #[tracing_test::traced_test]
    #[test]
    fn open_and_activation_are_logged() {
        let (_, mut e) = setup(1);
        let id = PanelId::new(0);
        e.open(id).unwrap();
        assert!(logs_contain("opened panel"));
        e.activate(id, 3).unwrap();
        assert!(logs_contain("activated option"));
        assert!(logs_contain("value=3"));
        assert!(logs_contain("closed panel"));
    }

    #[test]
    fn failed_displacement_leaves_registry_empty() {
        let doc = MemoryDocument::new();
        let first = doc.insert(MemoryElement::select().with_options(options(6)));
        doc.insert(MemoryElement::select().with_options(options(6)));
        let mut e = Enhancer::new(doc.clone(), SearchableSelectConfig::default());
        e.scan();
        e.open(PanelId::new(0)).unwrap();
        doc.remove_panel(first);

        assert!(matches!(e.open(PanelId::new(1)), Err(SelectError::Host(_))));
        assert_eq!(e.open_panel(), None);
        assert!(!e.controller(PanelId::new(1)).unwrap().is_visible());
    }

    #[test]
    fn custom_registry_is_consulted() {
        #[derive(Debug, Default)]
        struct CountingRegistry {
            inner: SingleOpenRegistry,
            acquired: usize,
            released: usize,
        }

        impl DropdownRegistry for CountingRegistry {
            fn current(&self) -> Option<PanelId> {
                self.inner.current()
            }

            fn acquire(&mut self, panel: PanelId) -> Option<PanelId> {
                self.acquired += 1;
                self.inner.acquire(panel)
            }

            fn release(&mut self, panel: PanelId) -> bool {
                self.released += 1;
                self.inner.release(panel)
            }
        }

        let doc = MemoryDocument::new();
        doc.insert(MemoryElement::select().with_options(options(6)));
        let mut e = Enhancer::with_registry(
            doc,
            CountingRegistry::default(),
            SearchableSelectConfig::default(),
        );
        e.scan();
        e.open(PanelId::new(0)).unwrap();
        e.close(PanelId::new(0)).unwrap();
        assert_eq!(e.registry().acquired, 1);
        assert_eq!(e.registry().released, 1);
        assert_eq!(e.open_panel(), None);
    }
}
