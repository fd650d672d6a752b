#![forbid(unsafe_code)]

//! `tracing` layer that forwards events to the browser console.
//!
//! Events are formatted as `LEVEL target: message key=value ...` and handed to
//! a [`ConsoleWriter`]. On `wasm32` the stock [`BrowserConsole`] writes to
//! `console.error` / `warn` / `log` / `debug`; elsewhere it discards output,
//! so the layer can still be exercised natively with a capturing writer.
//!
//! The maximum level lives behind a [`LevelHandle`] so a page can change it
//! after the global subscriber is installed.

use std::fmt::{self, Write as _};
use std::sync::{Arc, RwLock};

use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Destination of formatted log lines.
pub trait ConsoleWriter: Send + Sync + 'static {
    fn write(&self, level: Level, line: &str);
}

/// Writes to the browser's `console` object.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserConsole;

impl ConsoleWriter for BrowserConsole {
    #[cfg(target_arch = "wasm32")]
    fn write(&self, level: Level, line: &str) {
        use web_sys::console;

        let line = wasm_bindgen::JsValue::from_str(line);
        match level {
            Level::ERROR => console::error_1(&line),
            Level::WARN => console::warn_1(&line),
            Level::INFO => console::log_1(&line),
            _ => console::debug_1(&line),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn write(&self, _level: Level, _line: &str) {}
}

/// Shared, adjustable maximum level.
#[derive(Debug, Clone)]
pub struct LevelHandle(Arc<RwLock<LevelFilter>>);

impl LevelHandle {
    pub fn new(level: LevelFilter) -> Self {
        Self(Arc::new(RwLock::new(level)))
    }

    pub fn get(&self) -> LevelFilter {
        self.0.read().map_or(LevelFilter::OFF, |level| *level)
    }

    /// Change the level and invalidate cached callsite interest.
    pub fn set(&self, level: LevelFilter) {
        if let Ok(mut current) = self.0.write() {
            *current = level;
        }
        tracing::callsite::rebuild_interest_cache();
    }
}

/// Formats events and hands them to a [`ConsoleWriter`].
#[derive(Debug)]
pub struct ConsoleLayer<W = BrowserConsole> {
    level: LevelHandle,
    writer: W,
}

impl ConsoleLayer<BrowserConsole> {
    /// Layer writing to the browser console.
    pub fn browser(level: LevelFilter) -> (Self, LevelHandle) {
        Self::with_writer(BrowserConsole, level)
    }
}

impl<W: ConsoleWriter> ConsoleLayer<W> {
    /// Layer writing to `writer`. The returned handle adjusts the level.
    pub fn with_writer(writer: W, level: LevelFilter) -> (Self, LevelHandle) {
        let handle = LevelHandle::new(level);
        let layer = Self {
            level: handle.clone(),
            writer,
        };
        (layer, handle)
    }
}

impl<S, W> Layer<S> for ConsoleLayer<W>
where
    S: Subscriber,
    W: ConsoleWriter,
{
    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        self.level.get() >= *metadata.level()
    }

    fn max_level_hint(&self) -> Option<LevelFilter> {
        Some(self.level.get())
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);
        let line = visitor.finish(metadata.level(), metadata.target());
        self.writer.write(*metadata.level(), &line);
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl LineVisitor {
    fn finish(self, level: &Level, target: &str) -> String {
        let mut line = format!("{level} {target}: {}", self.message);
        line.push_str(&self.fields);
        line
    }

    fn push_field(&mut self, name: &str, value: fmt::Arguments<'_>) {
        let _ = write!(self.fields, " {name}={value}");
    }
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.push_field(field.name(), format_args!("{value}"));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            self.push_field(field.name(), format_args!("{value:?}"));
        }
    }
}
