#![forbid(unsafe_code)]

//! Which DOM mutations warrant a rescan.
//!
//! The observer watches the whole body, so it also sees the widgets' own
//! work: wrapping a select in its container and re-rendering option rows.
//! Only insertions of page elements outside every widget count.

/// Class of the container wrapped around each enhanced select.
pub const CONTAINER_CLASS: &str = "searchable-select-container";

/// A node from a mutation record's `addedNodes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddedNode {
    /// An element; `container` when it carries [`CONTAINER_CLASS`].
    Element { container: bool },
    /// Text, comments and other non-element nodes.
    Other,
}

impl AddedNode {
    /// Classify an element from its class list.
    pub fn element<C: AsRef<str>>(classes: impl IntoIterator<Item = C>) -> Self {
        Self::Element {
            container: classes.into_iter().any(|c| c.as_ref() == CONTAINER_CLASS),
        }
    }
}

/// Whether one mutation record should schedule a rescan.
///
/// `record_type` is `MutationRecord.type`; `target_in_widget` tells whether
/// the record's target sits inside a widget container.
pub fn triggers_rescan(
    record_type: &str,
    target_in_widget: bool,
    added: impl IntoIterator<Item = AddedNode>,
) -> bool {
    record_type == "childList"
        && !target_in_widget
        && added
            .into_iter()
            .any(|node| node == AddedNode::Element { container: false })
}
