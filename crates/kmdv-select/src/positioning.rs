#![forbid(unsafe_code)]

//! Panel placement relative to the control and the viewport.
//!
//! # Decision Rule
//!
//! 1) `space_below = viewport.height - control.bottom`,
//!    `space_above = control.top`.
//! 2) `height = min(max_panel_height, measured)`, or the fallback height when
//!    the panel has never been measured.
//! 3) Place **below** when `space_below >= height` or
//!    `space_below >= space_above`; otherwise **above**.
//! 4) Anchor to the container's **right** edge when the container overflows
//!    the viewport's right edge; otherwise to its **left** edge.
//!
//! Placement is a pure function of the measured geometry and is recomputed on
//! every open and every resize of an open panel.

use tracing::trace;

use crate::config::SearchableSelectConfig;
use crate::geometry::PanelLayout;

/// Which side of the control the panel sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalPlacement {
    /// Top edge flush with the control's bottom edge.
    Below,
    /// Bottom edge flush with the control's top edge.
    Above,
}

/// Which container edge the panel is aligned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAnchor {
    Left,
    Right,
}

/// Result of the positioning engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub vertical: VerticalPlacement,
    pub horizontal: HorizontalAnchor,
    /// Gap between control and panel in px.
    pub gap: f64,
}

impl Placement {
    /// Inline style assignments realising this placement on a panel that is
    /// absolutely positioned inside the wrapper container.
    pub fn style_properties(&self) -> [(&'static str, String); 6] {
        let gap = format!("{}px", self.gap);
        let (top, bottom, margin_top, margin_bottom) = match self.vertical {
            VerticalPlacement::Below => ("100%", "auto", gap, "0".to_string()),
            VerticalPlacement::Above => ("auto", "100%", "0".to_string(), gap),
        };
        let (left, right) = match self.horizontal {
            HorizontalAnchor::Left => ("0", "auto"),
            HorizontalAnchor::Right => ("auto", "0"),
        };
        [
            ("top", top.to_string()),
            ("bottom", bottom.to_string()),
            ("margin-top", margin_top),
            ("margin-bottom", margin_bottom),
            ("left", left.to_string()),
            ("right", right.to_string()),
        ]
    }
}

/// Panel height used for placement decisions.
#[must_use]
pub fn effective_panel_height(measured: f64, config: &SearchableSelectConfig) -> f64 {
    let height = if measured > 0.0 {
        measured
    } else {
        config.fallback_panel_height
    };
    height.min(config.max_panel_height)
}

/// Compute where the panel goes for the given geometry.
#[must_use]
pub fn compute_placement(layout: &PanelLayout, config: &SearchableSelectConfig) -> Placement {
    let space_below = layout.viewport.height - layout.control.bottom();
    let space_above = layout.control.top();
    let height = effective_panel_height(layout.panel_height, config);

    let vertical = if space_below >= height || space_below >= space_above {
        VerticalPlacement::Below
    } else {
        VerticalPlacement::Above
    };
    let horizontal = if layout.container.right() > layout.viewport.width {
        HorizontalAnchor::Right
    } else {
        HorizontalAnchor::Left
    };

    trace!(
        space_below,
        space_above,
        height,
        ?vertical,
        ?horizontal,
        "computed placement"
    );
    Placement {
        vertical,
        horizontal,
        gap: config.panel_gap,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Rect, Viewport};
    use pretty_assertions::assert_eq;

    fn layout(control_top: f64, panel_height: f64) -> PanelLayout {
        let control = Rect::new(20.0, control_top, 200.0, 30.0);
        PanelLayout {
            control,
            container: control,
            panel_height,
            viewport: Viewport::new(1024.0, 768.0),
        }
    }

    #[test]
    fn ample_space_below_places_below() {
        let p = compute_placement(&layout(100.0, 200.0), &SearchableSelectConfig::default());
        assert_eq!(p.vertical, VerticalPlacement::Below);
        assert_eq!(p.horizontal, HorizontalAnchor::Left);
    }

    #[test]
    fn near_bottom_flips_above() {
        // 768 - 730 = 38 below, 700 above.
        let p = compute_placement(&layout(700.0, 200.0), &SearchableSelectConfig::default());
        assert_eq!(p.vertical, VerticalPlacement::Above);
    }

    #[test]
    fn cramped_both_ways_prefers_larger_side() {
        let mut l = layout(40.0, 200.0);
        l.viewport = Viewport::new(1024.0, 120.0);
        // 120 - 70 = 50 below, 40 above.
        let p = compute_placement(&l, &SearchableSelectConfig::default());
        assert_eq!(p.vertical, VerticalPlacement::Below);
    }

    #[test]
    fn tall_measurement_is_capped() {
        // 768 - 530 = 238 below, under the 250 cap and under 500 above.
        let p = compute_placement(&layout(500.0, 600.0), &SearchableSelectConfig::default());
        assert_eq!(p.vertical, VerticalPlacement::Above);
        // 338 below fits the capped 250 even though 400 above is larger.
        let p = compute_placement(&layout(400.0, 600.0), &SearchableSelectConfig::default());
        assert_eq!(p.vertical, VerticalPlacement::Below);
    }

    #[test]
    fn unmeasured_panel_uses_fallback() {
        let config = SearchableSelectConfig::default();
        assert_eq!(effective_panel_height(0.0, &config), 250.0);
        assert_eq!(effective_panel_height(120.0, &config), 120.0);
        assert_eq!(effective_panel_height(900.0, &config), 250.0);
        // 768 - 530 = 238 below < 250 fallback, 500 above.
        let p = compute_placement(&layout(500.0, 0.0), &config);
        assert_eq!(p.vertical, VerticalPlacement::Above);
    }

    #[test]
    fn overflowing_container_anchors_right() {
        let mut l = layout(100.0, 100.0);
        l.container = Rect::new(900.0, 100.0, 200.0, 30.0);
        let p = compute_placement(&l, &SearchableSelectConfig::default());
        assert_eq!(p.horizontal, HorizontalAnchor::Right);
    }

    #[test]
    fn style_properties_below_left() {
        let p = Placement {
            vertical: VerticalPlacement::Below,
            horizontal: HorizontalAnchor::Left,
            gap: 2.0,
        };
        let props = p.style_properties();
        assert_eq!(
            props,
            [
                ("top", "100%".to_string()),
                ("bottom", "auto".to_string()),
                ("margin-top", "2px".to_string()),
                ("margin-bottom", "0".to_string()),
                ("left", "0".to_string()),
                ("right", "auto".to_string()),
            ]
        );
    }

    #[test]
    fn style_properties_above_right() {
        let p = Placement {
            vertical: VerticalPlacement::Above,
            horizontal: HorizontalAnchor::Right,
            gap: 4.0,
        };
        let props = p.style_properties();
        assert_eq!(props[0], ("top", "auto".to_string()));
        assert_eq!(props[1], ("bottom", "100%".to_string()));
        assert_eq!(props[3], ("margin-bottom", "4px".to_string()));
        assert_eq!(props[4], ("left", "auto".to_string()));
        assert_eq!(props[5], ("right", "0".to_string()));
    }
}
