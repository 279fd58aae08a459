//! Filter and search engine
//!
//! [`apply_filters`] composes a case-insensitive text search with status and
//! priority predicates. It is a pure function: presentation code calls it again
//! whenever the source list or any [`FilterState`] field changes.
//!
//! The three predicates are AND-ed in a single pass, so their order does not
//! matter. Output keeps the relative order of the input.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::models::{Requirement, RequirementListing, RequirementPriority, RequirementStatus};

/// Either "no constraint" or an exact value to match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Selection<T> {
    #[default]
    All,
    Only(T),
}

impl<T: PartialEq> Selection<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(wanted) => wanted == value,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Selection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => f.write_str("all"),
            Selection::Only(value) => value.fmt(f),
        }
    }
}

impl<T: FromStr> FromStr for Selection<T> {
    type Err = T::Err;

    /// `all` (or an empty string) means no constraint
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            Ok(Selection::All)
        } else {
            trimmed.parse().map(Selection::Only)
        }
    }
}

pub type StatusFilter = Selection<RequirementStatus>;
pub type PriorityFilter = Selection<RequirementPriority>;

/// Per-view filter inputs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(default)]
    pub search_term: String,
    #[serde(default)]
    pub status_filter: StatusFilter,
    #[serde(default)]
    pub priority_filter: PriorityFilter,
}

impl FilterState {
    /// Builds a filter state from raw form values
    pub fn parse(search_term: &str, status: &str, priority: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            search_term: search_term.to_string(),
            status_filter: status.parse()?,
            priority_filter: priority.parse()?,
        })
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search_term = term.into();
        self
    }

    pub fn with_status(mut self, status: RequirementStatus) -> Self {
        self.status_filter = Selection::Only(status);
        self
    }

    pub fn with_priority(mut self, priority: RequirementPriority) -> Self {
        self.priority_filter = Selection::Only(priority);
        self
    }

    /// True when no predicate narrows the list
    pub fn is_unfiltered(&self) -> bool {
        self.search_term.is_empty()
            && self.status_filter == Selection::All
            && self.priority_filter == Selection::All
    }

    /// Whether a single item passes all three predicates
    pub fn matches<T: Filterable + ?Sized>(&self, item: &T) -> bool {
        self.status_filter.matches(&item.status())
            && self.priority_filter.matches(&item.priority())
            && self.matches_text(item)
    }

    fn matches_text<T: Filterable + ?Sized>(&self, item: &T) -> bool {
        if self.search_term.is_empty() {
            return true;
        }
        let needle = self.search_term.to_lowercase();
        item.title().to_lowercase().contains(&needle)
            || item
                .description()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    }
}

/// Anything the engine can filter
pub trait Filterable {
    fn title(&self) -> &str;
    fn description(&self) -> Option<&str>;
    fn status(&self) -> RequirementStatus;
    fn priority(&self) -> RequirementPriority;
}

impl Filterable for Requirement {
    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn status(&self) -> RequirementStatus {
        self.status
    }

    fn priority(&self) -> RequirementPriority {
        self.priority
    }
}

impl Filterable for RequirementListing {
    fn title(&self) -> &str {
        self.requirement.title()
    }

    fn description(&self) -> Option<&str> {
        self.requirement.description()
    }

    fn status(&self) -> RequirementStatus {
        self.requirement.status
    }

    fn priority(&self) -> RequirementPriority {
        self.requirement.priority
    }
}

/// Returns the items that pass `state`, in their original order
pub fn apply_filters<T: Filterable + Clone>(items: &[T], state: &FilterState) -> Vec<T> {
    items
        .iter()
        .filter(|item| state.matches(*item))
        .cloned()
        .collect()
}
