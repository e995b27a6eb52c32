//! Listing view state and its query-string codec.
//!
//! The query string is the only durable copy of a listing's state. Fields
//! at their default value are omitted when encoding, and decoding is total:
//! missing, unknown or malformed values resolve to the field default.

use crate::catalog::{CategoryCode, Entry};
use crate::data::Difficulty;
use crate::filter::Filter;
use crate::sort::{SortKey, SortOrder};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use tracing::debug;
use url::form_urlencoded;

pub const KEY_CATEGORY: &str = "category";
pub const KEY_DIFFICULTY: &str = "difficulty";
pub const KEY_SEARCH: &str = "search";
pub const KEY_SORT: &str = "sort";
pub const KEY_ORDER: &str = "order";
pub const KEY_PAGE: &str = "page";
pub const KEY_VIEW: &str = "view";

/// Characters left unescaped in encoded values. Commas stay readable so a
/// category list encodes as `category=viral,thread`.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b',');

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Card,
    List,
}

impl ViewMode {
    pub const fn query_value(self) -> &'static str {
        match self {
            ViewMode::Card => "card",
            ViewMode::List => "list",
        }
    }

    pub fn from_query(value: &str) -> Option<Self> {
        match value {
            "card" => Some(ViewMode::Card),
            "list" => Some(ViewMode::List),
            _ => None,
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_value())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewState<C> {
    pub categories: BTreeSet<C>,
    pub difficulty: Option<Difficulty>,
    pub search: String,
    pub sort_by: SortKey,
    pub sort_order: SortOrder,
    /// 1-based.
    pub page: usize,
    pub view: ViewMode,
}

impl<C> Default for ViewState<C> {
    fn default() -> Self {
        Self {
            categories: BTreeSet::new(),
            difficulty: None,
            search: String::new(),
            sort_by: SortKey::Default,
            sort_order: SortOrder::Asc,
            page: 1,
            view: ViewMode::Card,
        }
    }
}

/// A user interaction on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewChange<C> {
    ToggleCategory(C),
    SetCategories(BTreeSet<C>),
    ClearCategories,
    SetDifficulty(Option<Difficulty>),
    SetSearch(String),
    /// Also switches the order to the key's natural direction.
    SetSort(SortKey),
    SetSortOrder(SortOrder),
    ToggleSortOrder,
    /// Clears filters, search and sort; keeps the view mode.
    ResetFilters,
    SetPage(usize),
    SetViewMode(ViewMode),
}

impl<C: CategoryCode> ViewState<C> {
    /// Returns the state after `change`. Every change other than a page or
    /// view-mode change sends the listing back to page 1. Sort keys and the
    /// difficulty filter the surface does not offer resolve to their
    /// defaults, exactly as [`decode`] would.
    pub fn apply(&self, change: ViewChange<C>) -> Self {
        let mut next = self.clone();
        match change {
            ViewChange::SetPage(page) => {
                next.page = page.max(1);
                return next;
            }
            ViewChange::SetViewMode(view) => {
                next.view = view;
                return next;
            }
            ViewChange::ToggleCategory(category) => {
                if !next.categories.remove(&category) {
                    next.categories.insert(category);
                }
            }
            ViewChange::SetCategories(categories) => next.categories = categories,
            ViewChange::ClearCategories => next.categories.clear(),
            ViewChange::SetDifficulty(difficulty) => {
                next.difficulty = difficulty.filter(|_| C::FILTERS_DIFFICULTY);
            }
            ViewChange::SetSearch(search) => next.search = search,
            ViewChange::SetSort(key) => {
                next.sort_by = if C::supports_sort(key) {
                    key
                } else {
                    SortKey::Default
                };
                next.sort_order = next.sort_by.natural_order();
            }
            ViewChange::SetSortOrder(order) => next.sort_order = order,
            ViewChange::ToggleSortOrder => next.sort_order = next.sort_order.reversed(),
            ViewChange::ResetFilters => {
                next = Self {
                    view: self.view,
                    ..Self::default()
                };
            }
        }
        next.page = 1;
        next
    }

    /// True when any filter or search narrows the catalog.
    pub fn has_filters(&self) -> bool {
        !self.categories.is_empty() || self.difficulty.is_some() || !self.search.is_empty()
    }

    pub fn filter(&self) -> Filter<'_, C> {
        Filter {
            categories: &self.categories,
            difficulty: self.difficulty,
            search: &self.search,
        }
    }

    /// Non-default fields as `(key, value)` pairs, in canonical key order.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if !self.categories.is_empty() {
            let joined = self
                .categories
                .iter()
                .map(|category| category.code())
                .collect::<Vec<_>>()
                .join(",");
            pairs.push((KEY_CATEGORY, joined));
        }
        if let Some(difficulty) = self.difficulty {
            pairs.push((KEY_DIFFICULTY, difficulty.code().to_string()));
        }
        if !self.search.is_empty() {
            pairs.push((KEY_SEARCH, self.search.clone()));
        }
        if self.sort_by != SortKey::Default {
            pairs.push((KEY_SORT, self.sort_by.query_value().to_string()));
        }
        if self.sort_order != SortOrder::Asc {
            pairs.push((KEY_ORDER, self.sort_order.query_value().to_string()));
        }
        if self.page != 1 {
            pairs.push((KEY_PAGE, self.page.to_string()));
        }
        if self.view != ViewMode::Card {
            pairs.push((KEY_VIEW, self.view.query_value().to_string()));
        }
        pairs
    }

    /// Encodes the state without a leading `?`. The default state encodes
    /// to an empty string.
    pub fn to_query(&self) -> String {
        self.to_pairs()
            .iter()
            .map(|(key, value)| format!("{key}={}", encode_component(value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn href(&self, path: &str) -> String {
        let query = self.to_query();
        if query.is_empty() {
            path.to_string()
        } else {
            format!("{path}?{query}")
        }
    }
}

/// Decodes a query string for the listing surface of `E`. Never fails.
///
/// Sort keys the surface does not offer fall back to `SortKey::Default`, and
/// `difficulty` is ignored on surfaces that do not filter by it.
pub fn decode<E: Entry>(query: &str) -> ViewState<E::Category> {
    let mut state = ViewState::default();
    let mut seen = HashSet::new();
    for (key, value) in parse_query(query) {
        if !seen.insert(key.clone()) {
            continue;
        }
        match key.as_str() {
            KEY_CATEGORY => {
                for code in value.split(',').map(str::trim).filter(|c| !c.is_empty()) {
                    match E::Category::from_code(code) {
                        Some(category) => {
                            state.categories.insert(category);
                        }
                        None => debug!(code, "dropping unknown category"),
                    }
                }
            }
            KEY_DIFFICULTY if E::Category::FILTERS_DIFFICULTY => {
                state.difficulty = Difficulty::from_code(&value);
            }
            KEY_SEARCH => state.search = value,
            KEY_SORT => {
                state.sort_by = SortKey::from_query(&value)
                    .filter(|key| E::Category::supports_sort(*key))
                    .unwrap_or_default();
            }
            KEY_ORDER => state.sort_order = SortOrder::from_query(&value).unwrap_or_default(),
            KEY_PAGE => {
                state.page = value
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .filter(|page| *page >= 1)
                    .unwrap_or(1);
            }
            KEY_VIEW => state.view = ViewMode::from_query(&value).unwrap_or_default(),
            _ => debug!(key = %key, "ignoring unknown query key"),
        }
    }
    state
}

/// Splits a query string into decoded `(key, value)` pairs, in order.
/// A leading `?` is accepted and `+` decodes to a space.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    let query = query.strip_prefix('?').unwrap_or(query);
    form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}
