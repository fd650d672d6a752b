#![forbid(unsafe_code)]

//! Core of the searchable select: turns native single-selects into
//! filterable, keyboard-navigable dropdowns.
//!
//! This crate is host-agnostic. It owns the option index, placement rules,
//! keyboard contract, open-panel registry and page scanning, and talks to
//! the page only through the [`surface`] traits. `kmdv-select-web` binds
//! those traits to the browser DOM; [`memory`] binds them to an in-memory
//! document for tests.
//!
//! Design goals:
//! - **Host-driven time**: deferred work is queued against a `now` supplied by
//!   the host; nothing sleeps or reads the clock.
//! - **No threads, no blocking**: suitable for `wasm32-unknown-unknown`.
//! - **Degrade, never fail**: host errors leave a select plain and are logged.

pub mod config;
pub mod controller;
pub mod enhancer;
pub mod error;
pub mod geometry;
pub mod memory;
pub mod option_index;
pub mod positioning;
pub mod registry;
pub mod scanner;
pub mod schedule;
pub mod surface;

pub use config::SearchableSelectConfig;
pub use controller::{KeyCommand, KeyOutcome, NavKey, WidgetController};
pub use enhancer::Enhancer;
pub use error::SelectError;
pub use registry::{DropdownRegistry, PanelId, SingleOpenRegistry};
pub use surface::{DocumentHost, RenderedEntry, RenderedList, SelectDescriptor, SelectSurface};
