use serde::Serialize;

use crate::models::Service;

pub const PAGE_SIZE: usize = 12;

/// Distinct categories in the order they first appear.
pub fn categories(services: &[Service]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for s in services {
        if !seen.contains(&s.category) {
            seen.push(s.category.clone());
        }
    }
    seen
}

/// Exact category match, then a case-insensitive substring match on the
/// name. Empty filters are ignored.
pub fn filter_services<'a>(
    services: &'a [Service],
    category: Option<&str>,
    search: Option<&str>,
) -> Vec<&'a Service> {
    let category = category.filter(|c| !c.is_empty());
    let needle = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    services
        .iter()
        .filter(|s| category.map_or(true, |c| s.category == c))
        .filter(|s| {
            needle
                .as_deref()
                .map_or(true, |n| s.name.to_lowercase().contains(n))
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
}

/// One-based pages. Out-of-range pages come back empty.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let page = page.max(1);
    let start = (page - 1).saturating_mul(per_page);

    Page {
        items: items.iter().skip(start).take(per_page).cloned().collect(),
        page,
        total_pages: items.len().div_ceil(per_page),
        total: items.len(),
    }
}
