#![forbid(unsafe_code)]

//! Open-dropdown registry: tracks the single panel allowed to be open.
//!
//! The registry is a service handed to the page orchestrator rather than a
//! global, so tests can substitute their own [`DropdownRegistry`].

use tracing::debug;

/// Identifier of one enhanced select and its panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PanelId(u32);

impl PanelId {
    /// Wrap a raw index.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw index (also the controller's slot in the orchestrator).
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for PanelId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Mutual-exclusion service for open panels.
///
/// # Invariants
///
/// 1. At most one panel is held at any time.
/// 2. `release` only clears the reference when it names the held panel, so a
///    stale release never clobbers a newer acquisition.
pub trait DropdownRegistry {
    /// Panel currently holding the open slot.
    fn current(&self) -> Option<PanelId>;

    /// Make `panel` the open one.
    ///
    /// Returns the previously held panel when it differs from `panel`; the
    /// caller must close it.
    fn acquire(&mut self, panel: PanelId) -> Option<PanelId>;

    /// Clear the slot if `panel` holds it. Returns whether it did.
    fn release(&mut self, panel: PanelId) -> bool;
}

/// The stock registry: one nullable reference.
#[derive(Debug, Clone, Default)]
pub struct SingleOpenRegistry {
    open: Option<PanelId>,
}

impl SingleOpenRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DropdownRegistry for SingleOpenRegistry {
    fn current(&self) -> Option<PanelId> {
        self.open
    }

    fn acquire(&mut self, panel: PanelId) -> Option<PanelId> {
        let displaced = self.open.filter(|held| *held != panel);
        if let Some(prev) = displaced {
            debug!(%prev, next = %panel, "displacing open panel");
        }
        self.open = Some(panel);
        displaced
    }

    fn release(&mut self, panel: PanelId) -> bool {
        if self.open == Some(panel) {
            self.open = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_empty_displaces_nothing() {
        let mut reg = SingleOpenRegistry::new();
        assert_eq!(reg.acquire(PanelId::new(1)), None);
        assert_eq!(reg.current(), Some(PanelId::new(1)));
    }

    #[test]
    fn acquire_other_returns_previous() {
        let mut reg = SingleOpenRegistry::new();
        reg.acquire(PanelId::new(1));
        assert_eq!(reg.acquire(PanelId::new(2)), Some(PanelId::new(1)));
        assert_eq!(reg.current(), Some(PanelId::new(2)));
    }

    #[test]
    fn reacquire_same_panel_is_noop() {
        let mut reg = SingleOpenRegistry::new();
        reg.acquire(PanelId::new(3));
        assert_eq!(reg.acquire(PanelId::new(3)), None);
        assert_eq!(reg.current(), Some(PanelId::new(3)));
    }

    #[test]
    fn stale_release_is_ignored() {
        let mut reg = SingleOpenRegistry::new();
        reg.acquire(PanelId::new(1));
        reg.acquire(PanelId::new(2));
        assert!(!reg.release(PanelId::new(1)));
        assert_eq!(reg.current(), Some(PanelId::new(2)));
        assert!(reg.release(PanelId::new(2)));
        assert_eq!(reg.current(), None);
    }

    #[test]
    fn release_on_empty_is_ignored() {
        let mut reg = SingleOpenRegistry::new();
        assert!(!reg.release(PanelId::new(9)));
    }
}
