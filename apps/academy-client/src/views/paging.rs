/// One page of a client-side list.
#[derive(Debug, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// 1-based, clamped into range.
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
}

/// Slice `items` into the 1-based `page` of `per_page` entries.
pub fn paginate<T>(items: &[T], page: usize, per_page: usize) -> Page<'_, T> {
    let per_page = per_page.max(1);
    let total = items.len();
    let total_pages = total.div_ceil(per_page);
    let page = page.clamp(1, total_pages.max(1));
    let start = (page - 1) * per_page;
    let end = (start + per_page).min(total);

    Page {
        items: &items[start.min(total)..end],
        page,
        total_pages,
        total,
    }
}
