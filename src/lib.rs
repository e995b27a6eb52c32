mod data;

pub mod catalog;
pub mod filter;
pub mod listing;
pub mod paginate;
pub mod sort;
pub mod view_state;

#[cfg(feature = "web")]
pub mod web;

pub use catalog::{Catalog, CatalogError, CategoryCode, Entry};
pub use data::{
    Difficulty, EngagementLevel, EngagementProfile, GlossaryCategory, GlossaryTerm, Template,
    TemplateCategory,
};
pub use listing::{Listing, ListingConfig, evaluate, evaluate_state};
pub use paginate::{DEFAULT_ITEMS_PER_PAGE, Page, PageInfo};
pub use sort::{SortKey, SortOrder};
pub use view_state::{ViewChange, ViewMode, ViewState};

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use std::io::Cursor;
use zstd::stream::decode_all;

static TEMPLATE_INDEX_BYTES: &[u8] = include_bytes!(env!("GUIDE_TEMPLATES_FST"));
static TEMPLATE_DATA_BYTES: &[u8] = include_bytes!(env!("GUIDE_TEMPLATES_DATA"));
static GLOSSARY_INDEX_BYTES: &[u8] = include_bytes!(env!("GUIDE_GLOSSARY_FST"));
static GLOSSARY_DATA_BYTES: &[u8] = include_bytes!(env!("GUIDE_GLOSSARY_DATA"));

static TEMPLATES: Lazy<Catalog<Template>> = Lazy::new(|| {
    let entries = decode_records(TEMPLATE_DATA_BYTES).expect("decode embedded templates");
    Catalog::with_index(entries, TEMPLATE_INDEX_BYTES.to_vec()).expect("valid template id index")
});
static GLOSSARY: Lazy<Catalog<GlossaryTerm>> = Lazy::new(|| {
    let entries = decode_records(GLOSSARY_DATA_BYTES).expect("decode embedded glossary");
    Catalog::with_index(entries, GLOSSARY_INDEX_BYTES.to_vec()).expect("valid glossary id index")
});

/// The post template catalog compiled into the binary.
pub fn templates() -> &'static Catalog<Template> {
    &TEMPLATES
}

/// The glossary compiled into the binary.
pub fn glossary() -> &'static Catalog<GlossaryTerm> {
    &GLOSSARY
}

/// Decompresses a zstd-packed JSON Lines blob into records, in line order.
pub fn decode_records<T: DeserializeOwned>(compressed: &[u8]) -> Result<Vec<T>, CatalogError> {
    let raw = decode_all(Cursor::new(compressed)).map_err(CatalogError::Decompress)?;
    let text = String::from_utf8_lossy(&raw);
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|source| CatalogError::Record {
                line: idx + 1,
                source,
            })
        })
        .collect()
}
