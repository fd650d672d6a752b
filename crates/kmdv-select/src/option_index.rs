#![forbid(unsafe_code)]

//! Option index: entries derived from a select's live options, plus
//! case-insensitive substring filtering with match highlighting.
//!
//! # Invariants
//!
//! 1. Filtering preserves source order.
//! 2. An empty term yields every entry with no highlighted segments.
//! 3. Concatenating an entry's segments reproduces its text exactly.
//! 4. Entries with an empty value and empty or placeholder text never appear.
//!
//! # Usage
//!
//! ```
//! use kmdv_select::config::SearchableSelectConfig;
//! use kmdv_select::option_index::{OptionIndex, SourceOption};
//!
//! let options = [
//!     SourceOption::new("Apple", "1"),
//!     SourceOption::new("Banana", "2"),
//!     SourceOption::new("Grape", "3"),
//! ];
//! let index = OptionIndex::from_options(&options, &SearchableSelectConfig::default());
//! let hits = index.filter("ap");
//! assert_eq!(hits.len(), 2); // "Apple" and "Grape"
//! assert_eq!(hits[0].segments[0].text, "Ap");
//! assert!(hits[0].segments[0].highlighted);
//! ```

use std::ops::Range;

use tracing::trace;

use crate::config::SearchableSelectConfig;

/// One `<option>` as read from the live select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOption {
    /// `textContent` of the option.
    pub text: String,
    /// Effective value (`option.value`).
    pub value: String,
    /// Whether the option carries an explicit `value` attribute.
    pub has_value_attribute: bool,
    /// Whether the option is currently selected.
    pub selected: bool,
}

impl SourceOption {
    /// An option with an explicit `value` attribute.
    pub fn new(text: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            value: value.into(),
            has_value_attribute: true,
            selected: false,
        }
    }

    /// An option without a `value` attribute; its value is the text with
    /// whitespace stripped and collapsed, as browsers report it.
    pub fn text_only(text: impl Into<String>) -> Self {
        let text = text.into();
        let value = text.split_whitespace().collect::<Vec<_>>().join(" ");
        Self {
            text,
            value,
            has_value_attribute: false,
            selected: false,
        }
    }

    /// Mark as selected (builder).
    #[must_use]
    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }

    /// Whether this option counts toward the auto-enhancement threshold.
    #[inline]
    pub fn counts_toward_threshold(&self) -> bool {
        self.has_value_attribute && !self.value.is_empty()
    }
}

/// Number of options that count toward the auto-enhancement threshold.
pub fn threshold_count(options: &[SourceOption]) -> usize {
    options
        .iter()
        .filter(|opt| opt.counts_toward_threshold())
        .count()
}

/// A filterable, selectable entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionEntry {
    pub text: String,
    pub value: String,
    /// Whether this is the select's current selection at read time.
    pub selected: bool,
}

/// A run of entry text, marked when it matches the search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub highlighted: bool,
}

impl Segment {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            highlighted: false,
        }
    }

    fn marked(text: &str) -> Self {
        Self {
            text: text.to_string(),
            highlighted: true,
        }
    }
}

/// An entry that passed the filter, with its text split for highlighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredEntry {
    pub entry: OptionEntry,
    pub segments: Vec<Segment>,
}

/// Entries of one select for one render pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionIndex {
    entries: Vec<OptionEntry>,
}

impl OptionIndex {
    /// Derive entries from the live options, dropping placeholders.
    pub fn from_options(options: &[SourceOption], config: &SearchableSelectConfig) -> Self {
        let entries = options
            .iter()
            .filter(|opt| !(opt.value.is_empty() && config.is_placeholder_text(&opt.text)))
            .map(|opt| OptionEntry {
                text: opt.text.clone(),
                value: opt.value.clone(),
                selected: opt.selected,
            })
            .collect();
        Self { entries }
    }

    /// All entries in source order.
    pub fn entries(&self) -> &[OptionEntry] {
        &self.entries
    }

    /// Entries whose text contains `term` (case-insensitive), in source order.
    pub fn filter(&self, term: &str) -> Vec<FilteredEntry> {
        let filtered: Vec<FilteredEntry> = if term.is_empty() {
            self.entries
                .iter()
                .map(|entry| FilteredEntry {
                    entry: entry.clone(),
                    segments: vec![Segment::plain(&entry.text)],
                })
                .collect()
        } else {
            self.entries
                .iter()
                .filter_map(|entry| {
                    let ranges = match_ranges(&entry.text, term);
                    (!ranges.is_empty()).then(|| FilteredEntry {
                        entry: entry.clone(),
                        segments: split_segments(&entry.text, &ranges),
                    })
                })
                .collect()
        };
        trace!(
            term,
            total = self.entries.len(),
            matched = filtered.len(),
            "filtered options"
        );
        filtered
    }
}

/// Byte ranges of every non-overlapping case-insensitive occurrence of
/// `term` in `text`, left to right.
///
/// Ranges always fall on char boundaries of `text`. An empty term has no
/// occurrences.
pub fn match_ranges(text: &str, term: &str) -> Vec<Range<usize>> {
    let needle: Vec<char> = term.chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return Vec::new();
    }

    // Lowercased haystack, each folded char tagged with the byte span of the
    // source char it came from.
    let mut folded: Vec<char> = Vec::with_capacity(text.len());
    let mut owner: Vec<Range<usize>> = Vec::with_capacity(text.len());
    for (start, ch) in text.char_indices() {
        let span = start..start + ch.len_utf8();
        for lower in ch.to_lowercase() {
            folded.push(lower);
            owner.push(span.clone());
        }
    }

    let mut ranges: Vec<Range<usize>> = Vec::new();
    let mut i = 0;
    while i + needle.len() <= folded.len() {
        if folded[i..i + needle.len()] == needle[..] {
            let start = owner[i].start;
            let end = owner[i + needle.len() - 1].end;
            if ranges.last().is_none_or(|last| last.end <= start) {
                ranges.push(start..end);
            }
            i += needle.len();
        } else {
            i += 1;
        }
    }
    ranges
}

fn split_segments(text: &str, ranges: &[Range<usize>]) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(ranges.len() * 2 + 1);
    let mut cursor = 0;
    for range in ranges {
        if range.start > cursor {
            segments.push(Segment::plain(&text[cursor..range.start]));
        }
        segments.push(Segment::marked(&text[range.clone()]));
        cursor = range.end;
    }
    if cursor < text.len() {
        segments.push(Segment::plain(&text[cursor..]));
    }
    segments
}
