use crate::catalog::Entry;
use crate::data::Difficulty;
use std::collections::BTreeSet;

/// The conjunction of predicates applied to a catalog.
#[derive(Debug, Clone)]
pub struct Filter<'s, C> {
    pub categories: &'s BTreeSet<C>,
    pub difficulty: Option<Difficulty>,
    pub search: &'s str,
}

impl<C: Ord> Filter<'_, C> {
    pub fn matches<E>(&self, entry: &E, needle: &str) -> bool
    where
        E: Entry<Category = C>,
    {
        if !self.categories.is_empty() && !self.categories.contains(&entry.category()) {
            return false;
        }
        if let Some(difficulty) = self.difficulty {
            if entry.difficulty() != Some(difficulty) {
                return false;
            }
        }
        needle.is_empty() || text_matches(entry, needle)
    }

    /// Entries satisfying every predicate, in catalog order.
    pub fn apply<'a, E>(&self, entries: &'a [E]) -> Vec<&'a E>
    where
        E: Entry<Category = C>,
    {
        let needle = self.search.to_lowercase();
        entries
            .iter()
            .filter(|entry| self.matches(*entry, &needle))
            .collect()
    }
}

/// Case-insensitive substring match over title, description and extra text.
/// `needle` must already be lowercased.
fn text_matches<E: Entry>(entry: &E, needle: &str) -> bool {
    let contains = |field: &str| field.to_lowercase().contains(needle);
    contains(entry.title())
        || contains(entry.description())
        || entry.extra_text().into_iter().any(contains)
}
