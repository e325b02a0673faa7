// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filtering test units by name.
//!
//! The main structure in this module is [`TestFilter`].

use crate::errors::TestFilterBuildError;
use aho_corasick::AhoCorasick;

/// A filter for test units, matching against their fully-qualified names.
#[derive(Clone, Debug)]
pub struct TestFilter {
    name_match: NameMatch,
}

#[derive(Clone, Debug)]
enum NameMatch {
    MatchAll,
    Substring(String),
    MatchSet(Box<AhoCorasick>),
}

impl TestFilter {
    /// Creates a new `TestFilter` from the given substring patterns.
    ///
    /// A name matches if it contains any of the patterns. If no patterns are passed, or if any of
    /// the patterns is empty, the filter matches every name.
    pub fn new(patterns: &[impl AsRef<str>]) -> Result<Self, TestFilterBuildError> {
        let patterns: Vec<&str> = patterns.iter().map(|pattern| pattern.as_ref()).collect();
        if !patterns.is_empty() && patterns.iter().all(|pattern| !pattern.is_empty()) {
            let set = AhoCorasick::new(&patterns).map_err(TestFilterBuildError::new)?;
            Ok(Self {
                name_match: NameMatch::MatchSet(Box::new(set)),
            })
        } else {
            Ok(Self::any())
        }
    }

    /// Creates a new `TestFilter` matching names that contain `pattern`.
    ///
    /// The empty pattern matches every name. Unlike [`new`](Self::new), this never fails.
    pub fn substring(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        if pattern.is_empty() {
            Self::any()
        } else {
            Self {
                name_match: NameMatch::Substring(pattern),
            }
        }
    }

    /// Creates a new `TestFilter` that matches every name.
    pub fn any() -> Self {
        Self {
            name_match: NameMatch::MatchAll,
        }
    }

    /// Returns true if this filter matches every name.
    pub fn is_any(&self) -> bool {
        matches!(self.name_match, NameMatch::MatchAll)
    }

    /// Returns true if the given fully-qualified name matches this filter.
    pub fn is_match(&self, name: &str) -> bool {
        match &self.name_match {
            NameMatch::MatchAll => true,
            NameMatch::Substring(pattern) => name.contains(pattern.as_str()),
            NameMatch::MatchSet(set) => set.is_match(name),
        }
    }
}

impl Default for TestFilter {
    fn default() -> Self {
        Self::any()
    }
}
