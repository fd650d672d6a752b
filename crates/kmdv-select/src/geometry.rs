#![forbid(unsafe_code)]

//! Geometric primitives in CSS pixel client coordinates.

/// An axis-aligned box as reported by `getBoundingClientRect()`.
///
/// Origin is the top-left of the viewport; values may be negative or exceed
/// the viewport when the element is scrolled partly out of view.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width in px.
    pub width: f64,
    /// Height in px.
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Left edge. Alias for `self.x`.
    #[inline]
    pub const fn left(&self) -> f64 {
        self.x
    }

    /// Top edge. Alias for `self.y`.
    #[inline]
    pub const fn top(&self) -> f64 {
        self.y
    }

    /// Right edge.
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Inner size of the browser window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// Create a viewport size.
    #[inline]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Everything the positioning engine needs from the host, measured at once.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PanelLayout {
    /// Bounding box of the native select.
    pub control: Rect,
    /// Bounding box of the wrapper container.
    pub container: Rect,
    /// Measured panel height; `0.0` when it has never been rendered.
    pub panel_height: f64,
    /// Current window size.
    pub viewport: Viewport,
}
