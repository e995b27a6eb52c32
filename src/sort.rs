use crate::catalog::{CategoryCode, Entry};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Catalog order.
    #[default]
    Default,
    Category,
    Difficulty,
    Engagement,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::Default,
        SortKey::Category,
        SortKey::Difficulty,
        SortKey::Engagement,
    ];

    pub const fn query_value(self) -> &'static str {
        match self {
            SortKey::Default => "default",
            SortKey::Category => "category",
            SortKey::Difficulty => "difficulty",
            SortKey::Engagement => "engagement",
        }
    }

    pub fn from_query(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.query_value() == value)
    }

    /// Direction a key is presented in when first selected.
    pub const fn natural_order(self) -> SortOrder {
        match self {
            SortKey::Engagement => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            SortKey::Default => "標準",
            SortKey::Category => "カテゴリ",
            SortKey::Difficulty => "難易度",
            SortKey::Engagement => "エンゲージメント",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_value())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub const fn query_value(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn from_query(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub const fn reversed(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_value())
    }
}

/// Orders `entries` in place. The ascending order is established with a
/// stable sort starting from catalog order; `Desc` reverses the result as a
/// separate step.
pub fn sort_entries<E: Entry>(entries: &mut [&E], key: SortKey, order: SortOrder) {
    match key {
        SortKey::Default => {}
        SortKey::Category => entries.sort_by(|a, b| a.category().code().cmp(b.category().code())),
        SortKey::Difficulty => entries.sort_by_key(|entry| entry.difficulty().map(|d| d.rank())),
        SortKey::Engagement => entries.sort_by_key(|entry| entry.engagement_score()),
    }
    if order == SortOrder::Desc {
        entries.reverse();
    }
}
