use crate::catalog::{Catalog, Entry};
use crate::paginate::{DEFAULT_ITEMS_PER_PAGE, Page, paginate};
use crate::sort::sort_entries;
use crate::view_state::{self, ViewState};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingConfig {
    pub items_per_page: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
        }
    }
}

/// One evaluated listing: the decoded state and the page it selects.
#[derive(Debug, Clone)]
pub struct Listing<'a, E: Entry> {
    pub state: ViewState<E::Category>,
    pub page: Page<'a, E>,
    /// Catalog size before filtering.
    pub catalog_size: usize,
}

impl<E: Entry> Listing<'_, E> {
    /// No entry survived the filters.
    pub fn is_empty(&self) -> bool {
        self.page.info.total_items == 0
    }
}

/// Decode, filter, sort and paginate in one synchronous pass.
pub fn evaluate<'a, E: Entry>(
    catalog: &'a Catalog<E>,
    query: &str,
    config: &ListingConfig,
) -> Listing<'a, E> {
    let state = view_state::decode::<E>(query);
    evaluate_state(catalog, state, config)
}

/// Same as [`evaluate`] for an already decoded state.
pub fn evaluate_state<'a, E: Entry>(
    catalog: &'a Catalog<E>,
    state: ViewState<E::Category>,
    config: &ListingConfig,
) -> Listing<'a, E> {
    let mut matches = state.filter().apply(catalog.get_all());
    sort_entries(&mut matches, state.sort_by, state.sort_order);
    let page = paginate(&matches, state.page, config.items_per_page);
    debug!(
        query = %state.to_query(),
        matched = matches.len(),
        page = page.info.current_page,
        total_pages = page.info.total_pages,
        "evaluated listing"
    );
    Listing {
        state,
        page,
        catalog_size: catalog.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::template;
    use crate::data::Difficulty::*;
    use crate::data::Template;
    use crate::data::TemplateCategory::*;

    fn catalog_of(n: usize) -> Catalog<Template> {
        let categories = [Viral, Thread, Tips];
        let difficulties = [Beginner, Intermediate, Advanced];
        Catalog::new(
            (0..n)
                .map(|i| template(&format!("t{i:02}"), categories[i % 3], difficulties[i % 3]))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn default_query_pages_the_whole_catalog() {
        let catalog = catalog_of(45);
        let config = ListingConfig::default();
        let first = evaluate(&catalog, "", &config);
        assert_eq!(first.page.info.total_pages, 3);
        assert_eq!(first.page.items.len(), 20);
        assert_eq!(first.catalog_size, 45);
        let third = evaluate(&catalog, "?page=3", &config);
        assert_eq!(third.page.items.len(), 5);
        assert_eq!(third.page.items[0].id, "t40");
    }

    #[test]
    fn stale_page_is_served_as_the_last_page() {
        let catalog = catalog_of(45);
        let listing = evaluate(&catalog, "category=viral&page=99", &ListingConfig::default());
        assert_eq!(listing.page.info.total_items, 15);
        assert_eq!(listing.page.info.current_page, 1);
        assert_eq!(listing.state.page, 99);
        assert!(!listing.is_empty());
    }

    #[test]
    fn filters_then_sorts_then_pages() {
        let catalog = catalog_of(12);
        let listing = evaluate(
            &catalog,
            "category=viral,tips&sort=difficulty&order=desc",
            &ListingConfig { items_per_page: 3 },
        );
        let ids: Vec<_> = listing.page.items.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t11", "t08", "t05"]);
        assert_eq!(listing.page.info.total_pages, 3);
    }

    #[test]
    fn no_matches_is_reported_as_empty() {
        let catalog = catalog_of(10);
        let listing = evaluate(&catalog, "search=nothing-like-this", &ListingConfig::default());
        assert!(listing.is_empty());
        assert_eq!(listing.page.info.total_pages, 0);
    }

    #[test]
    fn repeated_evaluation_is_identical() {
        let catalog = catalog_of(30);
        let query = "sort=category&order=desc&page=2";
        let a = evaluate(&catalog, query, &ListingConfig::default());
        let b = evaluate(&catalog, query, &ListingConfig::default());
        let ids = |l: &Listing<'_, Template>| {
            l.page.items.iter().map(|t| t.id.clone()).collect::<Vec<_>>()
        };
        assert_eq!(ids(&a), ids(&b));
        assert_eq!(a.page.info, b.page.info);
    }
}
