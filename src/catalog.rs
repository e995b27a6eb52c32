//! Immutable, in-memory catalogs of templates and glossary terms.

use crate::data::{Difficulty, GlossaryCategory, GlossaryTerm, Template, TemplateCategory};
use crate::sort::SortKey;
use fst::Automaton;
use fst::automaton::Str;
use fst::{IntoStreamer, Map, MapBuilder, Streamer};
use serde::Serialize;
use std::fmt;
use std::hash::Hash;

/// A closed set of category codes.
pub trait CategoryCode: Copy + Eq + Ord + Hash + fmt::Debug + Serialize + 'static {
    /// Every member, in declaration order.
    const ALL: &'static [Self];

    /// Sort keys offered by the listing surface of this category set,
    /// besides `SortKey::Default`.
    const SORT_KEYS: &'static [SortKey];

    /// Whether that listing surface filters by difficulty.
    const FILTERS_DIFFICULTY: bool;

    fn code(self) -> &'static str;

    fn label(self) -> &'static str;

    fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    /// Whether the listing surface offers `key`.
    fn supports_sort(key: SortKey) -> bool {
        key == SortKey::Default || Self::SORT_KEYS.contains(&key)
    }
}

/// One catalog item as seen by the filter, sort and pagination stages.
pub trait Entry {
    type Category: CategoryCode;

    fn id(&self) -> &str;

    fn category(&self) -> Self::Category;

    fn title(&self) -> &str;

    fn description(&self) -> &str;

    /// Additional free-text fields matched by the search filter.
    fn extra_text(&self) -> Vec<&str> {
        Vec::new()
    }

    fn difficulty(&self) -> Option<Difficulty> {
        None
    }

    fn engagement_score(&self) -> Option<u32> {
        None
    }

    /// Ids of entries this one explicitly points to.
    fn related_ids(&self) -> &[String] {
        &[]
    }

    fn related_chapters(&self) -> &[u32] {
        &[]
    }
}

impl CategoryCode for TemplateCategory {
    const SORT_KEYS: &'static [SortKey] =
        &[SortKey::Category, SortKey::Difficulty, SortKey::Engagement];

    const FILTERS_DIFFICULTY: bool = true;

    const ALL: &'static [Self] = &[
        TemplateCategory::Viral,
        TemplateCategory::Thread,
        TemplateCategory::Question,
        TemplateCategory::Story,
        TemplateCategory::Tips,
        TemplateCategory::Announcement,
        TemplateCategory::Promotion,
        TemplateCategory::Community,
        TemplateCategory::Reply,
        TemplateCategory::Quote,
        TemplateCategory::Poll,
        TemplateCategory::Media,
        TemplateCategory::News,
        TemplateCategory::Personal,
    ];

    fn code(self) -> &'static str {
        match self {
            TemplateCategory::Viral => "viral",
            TemplateCategory::Thread => "thread",
            TemplateCategory::Question => "question",
            TemplateCategory::Story => "story",
            TemplateCategory::Tips => "tips",
            TemplateCategory::Announcement => "announcement",
            TemplateCategory::Promotion => "promotion",
            TemplateCategory::Community => "community",
            TemplateCategory::Reply => "reply",
            TemplateCategory::Quote => "quote",
            TemplateCategory::Poll => "poll",
            TemplateCategory::Media => "media",
            TemplateCategory::News => "news",
            TemplateCategory::Personal => "personal",
        }
    }

    fn label(self) -> &'static str {
        match self {
            TemplateCategory::Viral => "バズ狙い",
            TemplateCategory::Thread => "スレッド",
            TemplateCategory::Question => "質問",
            TemplateCategory::Story => "ストーリー",
            TemplateCategory::Tips => "ノウハウ",
            TemplateCategory::Announcement => "告知",
            TemplateCategory::Promotion => "宣伝",
            TemplateCategory::Community => "コミュニティ",
            TemplateCategory::Reply => "リプライ",
            TemplateCategory::Quote => "引用",
            TemplateCategory::Poll => "投票",
            TemplateCategory::Media => "メディア",
            TemplateCategory::News => "ニュース",
            TemplateCategory::Personal => "日常",
        }
    }
}

impl CategoryCode for GlossaryCategory {
    const SORT_KEYS: &'static [SortKey] = &[SortKey::Category];

    const FILTERS_DIFFICULTY: bool = false;

    const ALL: &'static [Self] = &[
        GlossaryCategory::Algorithm,
        GlossaryCategory::Ranking,
        GlossaryCategory::Engagement,
        GlossaryCategory::Safety,
        GlossaryCategory::Account,
        GlossaryCategory::Content,
    ];

    fn code(self) -> &'static str {
        match self {
            GlossaryCategory::Algorithm => "algorithm",
            GlossaryCategory::Ranking => "ranking",
            GlossaryCategory::Engagement => "engagement",
            GlossaryCategory::Safety => "safety",
            GlossaryCategory::Account => "account",
            GlossaryCategory::Content => "content",
        }
    }

    fn label(self) -> &'static str {
        match self {
            GlossaryCategory::Algorithm => "アルゴリズム",
            GlossaryCategory::Ranking => "ランキング",
            GlossaryCategory::Engagement => "エンゲージメント",
            GlossaryCategory::Safety => "安全性",
            GlossaryCategory::Account => "アカウント",
            GlossaryCategory::Content => "コンテンツ",
        }
    }
}

impl Entry for Template {
    type Category = TemplateCategory;

    fn id(&self) -> &str {
        &self.id
    }

    fn category(&self) -> TemplateCategory {
        self.category
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn extra_text(&self) -> Vec<&str> {
        self.effects.iter().map(String::as_str).collect()
    }

    fn difficulty(&self) -> Option<Difficulty> {
        Some(self.difficulty)
    }

    fn engagement_score(&self) -> Option<u32> {
        Some(self.engagement.score())
    }

    fn related_chapters(&self) -> &[u32] {
        &self.related_chapters
    }
}

impl Entry for GlossaryTerm {
    type Category = GlossaryCategory;

    fn id(&self) -> &str {
        &self.id
    }

    fn category(&self) -> GlossaryCategory {
        self.category
    }

    fn title(&self) -> &str {
        &self.term
    }

    fn description(&self) -> &str {
        &self.short_description
    }

    fn extra_text(&self) -> Vec<&str> {
        let mut fields = vec![self.description.as_str()];
        if let Some(english) = self.english.as_deref() {
            fields.push(english);
        }
        fields
    }

    fn related_ids(&self) -> &[String] {
        &self.related_terms
    }

    fn related_chapters(&self) -> &[u32] {
        &self.related_chapters
    }
}

#[derive(Debug)]
pub enum CatalogError {
    DuplicateId(String),
    Index(fst::Error),
    Decompress(std::io::Error),
    Record {
        line: usize,
        source: serde_json::Error,
    },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::DuplicateId(id) => write!(f, "duplicate catalog id {id:?}"),
            CatalogError::Index(err) => write!(f, "id index error: {err}"),
            CatalogError::Decompress(err) => write!(f, "failed to decompress records: {err}"),
            CatalogError::Record { line, source } => {
                write!(f, "invalid record on line {line}: {source}")
            }
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::DuplicateId(_) => None,
            CatalogError::Index(err) => Some(err),
            CatalogError::Decompress(err) => Some(err),
            CatalogError::Record { source, .. } => Some(source),
        }
    }
}

impl From<fst::Error> for CatalogError {
    fn from(value: fst::Error) -> Self {
        CatalogError::Index(value)
    }
}

/// Entries in catalog order plus an `fst` index from id to position.
pub struct Catalog<E> {
    entries: Vec<E>,
    ids: Map<Vec<u8>>,
}

impl<E: fmt::Debug> fmt::Debug for Catalog<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("entries", &self.entries)
            .field("indexed_ids", &self.ids.len())
            .finish()
    }
}

impl<E: Entry> Catalog<E> {
    /// Builds a catalog and its id index. Fails on duplicate ids.
    pub fn new(entries: Vec<E>) -> Result<Self, CatalogError> {
        let mut sorted: Vec<(&str, u64)> = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.id(), position as u64))
            .collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        if let Some(pair) = sorted.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            return Err(CatalogError::DuplicateId(pair[0].0.to_string()));
        }
        let mut builder = MapBuilder::memory();
        for (id, position) in &sorted {
            builder.insert(id, *position)?;
        }
        let ids = Map::new(builder.into_inner()?)?;
        Ok(Self { entries, ids })
    }

    /// Wraps entries with an id index produced at build time.
    pub fn with_index(entries: Vec<E>, index: Vec<u8>) -> Result<Self, CatalogError> {
        let ids = Map::new(index)?;
        Ok(Self { entries, ids })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry in catalog order.
    pub fn get_all(&self) -> &[E] {
        &self.entries
    }

    pub fn get_by_category(&self, category: E::Category) -> Vec<&E> {
        self.entries
            .iter()
            .filter(|entry| entry.category() == category)
            .collect()
    }

    /// Same as [`Catalog::get_by_category`], keyed by the category code.
    /// Unknown codes yield an empty list.
    pub fn get_by_category_code(&self, code: &str) -> Vec<&E> {
        E::Category::from_code(code)
            .map(|category| self.get_by_category(category))
            .unwrap_or_default()
    }

    pub fn get_by_id(&self, id: &str) -> Option<&E> {
        let position = self.ids.get(id)? as usize;
        self.entries
            .get(position)
            .filter(|entry| entry.id() == id)
    }

    /// Declared relations first, then same category, then shared chapters;
    /// each group in catalog order, never the entry itself.
    pub fn get_related(&self, id: &str, limit: usize) -> Vec<&E> {
        let Some(source) = self.get_by_id(id) else {
            return Vec::new();
        };
        let mut related: Vec<&E> = Vec::new();
        for target in source.related_ids() {
            if let Some(entry) = self.get_by_id(target) {
                push_unique(&mut related, source, entry);
            }
        }
        for entry in &self.entries {
            if entry.category() == source.category() {
                push_unique(&mut related, source, entry);
            }
        }
        let chapters = source.related_chapters();
        for entry in &self.entries {
            if entry
                .related_chapters()
                .iter()
                .any(|chapter| chapters.contains(chapter))
            {
                push_unique(&mut related, source, entry);
            }
        }
        related.truncate(limit);
        related
    }

    /// Entry count per category, in category declaration order.
    pub fn category_counts(&self) -> Vec<(E::Category, usize)> {
        E::Category::ALL
            .iter()
            .map(|&category| {
                let count = self
                    .entries
                    .iter()
                    .filter(|entry| entry.category() == category)
                    .count();
                (category, count)
            })
            .collect()
    }

    /// Returns up to `limit` ids that start with `prefix`, in byte order.
    pub fn suggest_ids(&self, prefix: &str, limit: usize) -> Vec<&str> {
        let automaton = Str::new(prefix).starts_with();
        let mut stream = self.ids.search(automaton).into_stream();
        let mut results = Vec::new();
        while results.len() < limit {
            let Some((_, position)) = stream.next() else {
                break;
            };
            if let Some(entry) = self.entries.get(position as usize) {
                results.push(entry.id());
            }
        }
        results
    }
}

fn push_unique<'a, E: Entry>(related: &mut Vec<&'a E>, source: &E, candidate: &'a E) {
    if candidate.id() != source.id() && !related.iter().any(|seen| seen.id() == candidate.id()) {
        related.push(candidate);
    }
}
