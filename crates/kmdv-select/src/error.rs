#![forbid(unsafe_code)]

//! Error type shared by the core and its hosts.

use crate::registry::PanelId;

/// Failures surfaced by configuration parsing and host operations.
///
/// None of these are fatal to the page: the orchestration layer logs them and
/// leaves the affected select behaving like a plain `<select>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    /// Configuration JSON could not be parsed or failed validation.
    InvalidConfig(String),
    /// The host (DOM binding) rejected an operation.
    Host(String),
    /// An operation named a panel that was never created.
    UnknownPanel(PanelId),
}

impl SelectError {
    /// Build a [`SelectError::Host`] from anything printable.
    pub fn host(msg: impl Into<String>) -> Self {
        Self::Host(msg.into())
    }
}

impl core::fmt::Display for SelectError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::Host(msg) => write!(f, "host error: {msg}"),
            Self::UnknownPanel(id) => write!(f, "unknown panel {id}"),
        }
    }
}

impl std::error::Error for SelectError {}

impl From<serde_json::Error> for SelectError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_prefixed_by_kind() {
        assert_eq!(
            SelectError::InvalidConfig("min_options".into()).to_string(),
            "invalid config: min_options"
        );
        assert_eq!(SelectError::host("detached").to_string(), "host error: detached");
        assert_eq!(
            SelectError::UnknownPanel(PanelId::new(7)).to_string(),
            "unknown panel #7"
        );
    }
}
