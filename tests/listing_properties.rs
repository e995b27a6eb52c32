use std::collections::BTreeSet;

use guide_site::view_state::{self, ViewChange};
use guide_site::{
    Catalog, CategoryCode, Difficulty, EngagementLevel, EngagementProfile, Entry, GlossaryCategory,
    GlossaryTerm, ListingConfig, SortKey, SortOrder, Template, TemplateCategory, ViewMode,
    ViewState, evaluate, evaluate_state,
};
use proptest::prelude::*;

const LEVELS: [EngagementLevel; 3] = [
    EngagementLevel::Low,
    EngagementLevel::Medium,
    EngagementLevel::High,
];

fn make_template(
    index: usize,
    category: TemplateCategory,
    difficulty: Difficulty,
    levels: (usize, usize, usize),
    title: &str,
) -> Template {
    Template {
        id: format!("t{index:03}"),
        title: title.to_string(),
        category,
        difficulty,
        description: format!("説明 {index}"),
        body: String::new(),
        effects: vec![format!("効果 {}", index % 4)],
        engagement: EngagementProfile {
            likes: LEVELS[levels.0],
            replies: LEVELS[levels.1],
            reposts: LEVELS[levels.2],
        },
        related_chapters: Vec::new(),
    }
}

fn template_strategy() -> impl Strategy<Value = (usize, usize, usize, usize, usize, usize)> {
    (
        0..TemplateCategory::ALL.len(),
        0..Difficulty::ALL.len(),
        0..3usize,
        0..3usize,
        0..3usize,
        0..4usize,
    )
}

prop_compose! {
    fn catalog_strategy()(specs in prop::collection::vec(template_strategy(), 0..60)) -> Catalog<Template> {
        const TITLES: [&str; 4] = ["バズる投稿", "スレッドの型", "リプライ誘導", "Poll ideas"];
        let entries = specs
            .into_iter()
            .enumerate()
            .map(|(i, (c, d, l, r, p, t))| {
                make_template(
                    i,
                    TemplateCategory::ALL[c],
                    Difficulty::ALL[d],
                    (l, r, p),
                    TITLES[t],
                )
            })
            .collect();
        Catalog::new(entries).expect("generated ids are unique")
    }
}

prop_compose! {
    fn state_strategy()(
        categories in prop::collection::btree_set(prop::sample::select(TemplateCategory::ALL.to_vec()), 0..4),
        difficulty in prop::option::of(prop::sample::select(Difficulty::ALL.to_vec())),
        search in "[a-zA-Z0-9 +&=%?,リプライ]{0,8}",
        sort_by in prop::sample::select(SortKey::ALL.to_vec()),
        desc in any::<bool>(),
        page in 1usize..12,
        list in any::<bool>(),
    ) -> ViewState<TemplateCategory> {
        ViewState {
            categories,
            difficulty,
            search,
            sort_by,
            sort_order: if desc { SortOrder::Desc } else { SortOrder::Asc },
            page,
            view: if list { ViewMode::List } else { ViewMode::Card },
        }
    }
}

fn ids(items: &[&Template]) -> Vec<String> {
    items.iter().map(|t| t.id.clone()).collect()
}

fn sorted_matches<'a>(
    catalog: &'a Catalog<Template>,
    state: &ViewState<TemplateCategory>,
) -> Vec<&'a Template> {
    let mut matches = state.filter().apply(catalog.get_all());
    guide_site::sort::sort_entries(&mut matches, state.sort_by, state.sort_order);
    matches
}

proptest! {
    #[test]
    fn evaluation_is_deterministic(catalog in catalog_strategy(), state in state_strategy()) {
        let config = ListingConfig::default();
        let a = evaluate_state(&catalog, state.clone(), &config);
        let b = evaluate_state(&catalog, state, &config);
        prop_assert_eq!(ids(&a.page.items), ids(&b.page.items));
        prop_assert_eq!(a.page.info, b.page.info);
    }

    #[test]
    fn reachable_states_round_trip(state in state_strategy()) {
        let query = state.to_query();
        let decoded = view_state::decode::<Template>(&query);
        prop_assert_eq!(&decoded, &state);
        prop_assert_eq!(decoded.to_query(), query.clone());
        let with_prefix = format!("?{query}");
        prop_assert_eq!(view_state::decode::<Template>(&with_prefix), state);
    }

    #[test]
    fn decode_is_total(query in ".{0,40}") {
        let state = view_state::decode::<Template>(&query);
        prop_assert!(state.page >= 1);
        let reencoded = state.to_query();
        prop_assert_eq!(view_state::decode::<Template>(&reencoded), state);
    }

    #[test]
    fn narrowing_never_grows_the_result(
        catalog in catalog_strategy(),
        state in state_strategy(),
        extra in prop::sample::select(TemplateCategory::ALL.to_vec()),
        difficulty in prop::sample::select(Difficulty::ALL.to_vec()),
    ) {
        let before = state.filter().apply(catalog.get_all()).len();

        if state.categories.len() > 1 {
            let mut narrower = state.categories.clone();
            narrower.remove(&extra);
            if !narrower.is_empty() {
                let narrowed = state.apply(ViewChange::SetCategories(narrower));
                prop_assert!(narrowed.filter().apply(catalog.get_all()).len() <= before);
            }
        }
        if state.categories.is_empty() {
            let narrowed = state.apply(ViewChange::ToggleCategory(extra));
            prop_assert!(narrowed.filter().apply(catalog.get_all()).len() <= before);
        }
        if state.difficulty.is_none() {
            let narrowed = state.apply(ViewChange::SetDifficulty(Some(difficulty)));
            prop_assert!(narrowed.filter().apply(catalog.get_all()).len() <= before);
        }
        let longer = state.apply(ViewChange::SetSearch(format!("{}x", state.search)));
        prop_assert!(longer.filter().apply(catalog.get_all()).len() <= before);
    }

    #[test]
    fn equal_keys_keep_catalog_order(
        catalog in catalog_strategy(),
        key in prop::sample::select(SortKey::ALL.to_vec()),
    ) {
        let mut entries: Vec<&Template> = catalog.get_all().iter().collect();
        guide_site::sort::sort_entries(&mut entries, key, SortOrder::Asc);
        let sort_value = |t: &Template| match key {
            SortKey::Default => 0,
            SortKey::Category => {
                TemplateCategory::ALL.iter().position(|c| *c == t.category).unwrap_or(0) as u32
            }
            SortKey::Difficulty => t.difficulty.rank() as u32,
            SortKey::Engagement => t.engagement.score(),
        };
        for pair in entries.windows(2) {
            if sort_value(pair[0]) == sort_value(pair[1]) {
                prop_assert!(pair[0].id < pair[1].id, "{} before {}", pair[0].id, pair[1].id);
            }
        }

        let mut reversed: Vec<&Template> = catalog.get_all().iter().collect();
        guide_site::sort::sort_entries(&mut reversed, key, SortOrder::Desc);
        entries.reverse();
        prop_assert_eq!(ids(&reversed), ids(&entries));
    }

    #[test]
    fn pages_cover_the_sorted_result(
        catalog in catalog_strategy(),
        state in state_strategy(),
        per_page in 1usize..9,
    ) {
        let config = ListingConfig { items_per_page: per_page };
        let expected = sorted_matches(&catalog, &state);
        let first = evaluate_state(&catalog, state.apply(ViewChange::SetPage(1)), &config);
        let total_pages = first.page.info.total_pages;
        prop_assert_eq!(total_pages == 0, expected.is_empty());

        let mut collected = Vec::new();
        for page in 1..=total_pages {
            let listing = evaluate_state(&catalog, state.apply(ViewChange::SetPage(page)), &config);
            prop_assert_eq!(listing.page.info.current_page, page);
            collected.extend(ids(&listing.page.items));
        }
        prop_assert_eq!(collected, ids(&expected));
    }

    #[test]
    fn non_page_changes_reset_the_page(
        state in state_strategy(),
        category in prop::sample::select(TemplateCategory::ALL.to_vec()),
        key in prop::sample::select(SortKey::ALL.to_vec()),
        search in "[a-z]{1,5}",
    ) {
        let on_page_three = state.apply(ViewChange::SetPage(3));
        prop_assert_eq!(on_page_three.page, 3);
        let changes = vec![
            ViewChange::SetSearch(search),
            ViewChange::ToggleCategory(category),
            ViewChange::ClearCategories,
            ViewChange::SetDifficulty(Some(Difficulty::Advanced)),
            ViewChange::SetSort(key),
            ViewChange::ToggleSortOrder,
            ViewChange::ResetFilters,
        ];
        for change in changes {
            prop_assert_eq!(on_page_three.apply(change).page, 1);
        }
        prop_assert_eq!(on_page_three.apply(ViewChange::SetViewMode(ViewMode::List)).page, 3);
    }

    #[test]
    fn glossary_states_built_by_changes_round_trip(
        changes in prop::collection::vec(glossary_change_strategy(), 0..12),
    ) {
        let state = changes
            .into_iter()
            .fold(ViewState::<GlossaryCategory>::default(), |state, change| state.apply(change));
        prop_assert_eq!(state.difficulty, None);
        prop_assert!(GlossaryCategory::supports_sort(state.sort_by));
        let decoded = view_state::decode::<GlossaryTerm>(&state.to_query());
        prop_assert_eq!(decoded, state);
    }

    #[test]
    fn template_states_built_by_changes_round_trip(
        start in state_strategy(),
        key in prop::sample::select(SortKey::ALL.to_vec()),
        difficulty in prop::option::of(prop::sample::select(Difficulty::ALL.to_vec())),
    ) {
        let state = start
            .apply(ViewChange::SetSort(key))
            .apply(ViewChange::SetDifficulty(difficulty));
        prop_assert_eq!(state.sort_by, key);
        prop_assert_eq!(state.difficulty, difficulty);
        prop_assert_eq!(view_state::decode::<Template>(&state.to_query()), state);
    }
}

fn glossary_change_strategy() -> impl Strategy<Value = ViewChange<GlossaryCategory>> {
    prop_oneof![
        prop::sample::select(GlossaryCategory::ALL.to_vec()).prop_map(ViewChange::ToggleCategory),
        Just(ViewChange::ClearCategories),
        prop::option::of(prop::sample::select(Difficulty::ALL.to_vec()))
            .prop_map(ViewChange::SetDifficulty),
        "[a-z ]{0,6}".prop_map(ViewChange::SetSearch),
        prop::sample::select(SortKey::ALL.to_vec()).prop_map(ViewChange::SetSort),
        Just(ViewChange::ToggleSortOrder),
        Just(ViewChange::ResetFilters),
        (1usize..9).prop_map(ViewChange::SetPage),
        prop::sample::select(vec![ViewMode::Card, ViewMode::List]).prop_map(ViewChange::SetViewMode),
    ]
}

fn uniform_catalog(n: usize) -> Catalog<Template> {
    Catalog::new(
        (0..n)
            .map(|i| {
                make_template(
                    i,
                    TemplateCategory::Tips,
                    Difficulty::Beginner,
                    (0, 0, 0),
                    "テンプレート",
                )
            })
            .collect(),
    )
    .unwrap()
}

#[test]
fn forty_five_templates_make_three_pages() {
    let catalog = uniform_catalog(45);
    let config = ListingConfig::default();
    let first = evaluate(&catalog, "", &config);
    assert_eq!(first.page.info.total_pages, 3);
    assert_eq!(first.page.items.len(), 20);
    let last = evaluate(&catalog, "page=3", &config);
    assert_eq!(last.page.items.len(), 5);
}

#[test]
fn difficulty_tiers_keep_catalog_order() {
    use Difficulty::*;
    let tiers = [
        Beginner,
        Beginner,
        Advanced,
        Intermediate,
        Beginner,
        Advanced,
        Intermediate,
        Beginner,
        Intermediate,
        Advanced,
    ];
    let catalog = Catalog::new(
        tiers
            .iter()
            .enumerate()
            .map(|(i, d)| make_template(i, TemplateCategory::Viral, *d, (0, 0, 0), "型"))
            .collect(),
    )
    .unwrap();
    let listing = evaluate(&catalog, "sort=difficulty", &ListingConfig::default());
    assert_eq!(
        ids(&listing.page.items),
        vec![
            "t000", "t001", "t004", "t007", "t003", "t006", "t008", "t002", "t005", "t009"
        ]
    );
}

#[test]
fn category_and_page_decode_from_a_bookmark() {
    let state = view_state::decode::<Template>("?category=viral,thread&page=2");
    let expected = ViewState {
        categories: BTreeSet::from([TemplateCategory::Viral, TemplateCategory::Thread]),
        page: 2,
        ..ViewState::default()
    };
    assert_eq!(state, expected);
}

#[test]
fn search_returns_exact_matches_in_catalog_order() {
    let titles = [
        "リプライで会話を広げる",
        "スレッドの始め方",
        "バズる投稿",
        "質問して返信を集める",
        "引用とリプライの使い分け",
        "日常の記録",
    ];
    let mut entries: Vec<Template> = titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            make_template(i, TemplateCategory::Reply, Difficulty::Beginner, (0, 0, 0), title)
        })
        .collect();
    entries[5].description = "最後にリプライを促す".to_string();
    let catalog = Catalog::new(entries).unwrap();

    let query = format!("search={}", view_state::encode_component("リプライ"));
    let listing = evaluate(&catalog, &query, &ListingConfig::default());
    assert_eq!(ids(&listing.page.items), vec!["t000", "t004", "t005"]);
}

#[test]
fn stale_page_serves_the_last_page() {
    let catalog = uniform_catalog(70);
    let listing = evaluate(&catalog, "page=99", &ListingConfig::default());
    assert_eq!(listing.page.info.total_pages, 4);
    assert_eq!(listing.page.info.current_page, 4);
    assert_eq!(listing.page.items.len(), 10);
    assert_eq!(listing.page.items[0].id(), "t060");
}
