use serde::Serialize;

pub const DEFAULT_ITEMS_PER_PAGE: usize = 20;

/// Page metadata reported alongside every slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    /// The page actually served, after clamping.
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub items_per_page: usize,
}

impl PageInfo {
    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    /// 1-based position of the first item on this page, 0 when empty.
    pub fn first_item(&self) -> usize {
        if self.total_items == 0 {
            0
        } else {
            (self.current_page - 1) * self.items_per_page + 1
        }
    }

    pub fn last_item(&self) -> usize {
        (self.current_page * self.items_per_page).min(self.total_items)
    }
}

#[derive(Debug, Clone)]
pub struct Page<'a, E> {
    pub items: Vec<&'a E>,
    pub info: PageInfo,
}

/// Slices `sorted` into the requested page. Out-of-range requests are
/// clamped into `1..=total_pages`; an empty input yields page 1 of 0.
pub fn paginate<'a, E>(sorted: &[&'a E], requested: usize, items_per_page: usize) -> Page<'a, E> {
    let items_per_page = items_per_page.max(1);
    let total_items = sorted.len();
    let total_pages = total_items.div_ceil(items_per_page);
    let current_page = requested.clamp(1, total_pages.max(1));
    if current_page != requested {
        tracing::debug!(requested, current_page, total_pages, "clamped page request");
    }
    let start = ((current_page - 1) * items_per_page).min(total_items);
    let end = (current_page * items_per_page).min(total_items);
    Page {
        items: sorted[start..end].to_vec(),
        info: PageInfo {
            current_page,
            total_pages,
            total_items,
            items_per_page,
        },
    }
}
