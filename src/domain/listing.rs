// Search and pagination for administration listings
use serde::Serialize;

use super::measurement::VariableDefinition;
use super::network::{Administrator, Microcuenca, Station};

pub const ROWS_PER_PAGE: usize = 5;

/// Text fields a listing search looks at.
pub trait Searchable {
    fn search_fields(&self) -> Vec<&str>;
}

impl Searchable for Microcuenca {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }
}

impl Searchable for Station {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }
}

impl Searchable for VariableDefinition {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }
}

impl Searchable for Administrator {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.names.as_str(), self.surnames.as_str(), self.email.as_str()]
    }
}

/// Case-insensitive substring search; a blank term keeps everything.
pub fn search<T: Searchable>(items: Vec<T>, term: &str) -> Vec<T> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return items;
    }
    items
        .into_iter()
        .filter(|item| {
            item.search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&term))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageLink {
    Prev { page: usize },
    Number { page: usize, active: bool },
    Ellipsis,
    Next { page: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub links: Vec<PageLink>,
}

/// Slice one page out of `items`. Page numbers start at 1 and are clamped.
pub fn paginate<T>(items: Vec<T>, page: usize, rows_per_page: usize) -> Page<T> {
    let rows_per_page = rows_per_page.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(rows_per_page);
    let page = page.clamp(1, total_pages.max(1));

    let items = items
        .into_iter()
        .skip((page - 1) * rows_per_page)
        .take(rows_per_page)
        .collect();

    Page {
        items,
        page,
        total_pages,
        total_items,
        links: page_links(page, total_pages),
    }
}

/// First, last and neighbouring pages, with ellipses for the gaps.
fn page_links(current: usize, total: usize) -> Vec<PageLink> {
    if total <= 1 {
        return Vec::new();
    }
    let mut links = Vec::new();
    if current > 1 {
        links.push(PageLink::Prev { page: current - 1 });
    }
    for i in 1..=total {
        if i == 1 || i == total || current.abs_diff(i) <= 1 {
            links.push(PageLink::Number {
                page: i,
                active: i == current,
            });
        } else if (i + 2 == current && current > 3) || (i == current + 2 && current + 2 < total) {
            links.push(PageLink::Ellipsis);
        }
    }
    if current < total {
        links.push(PageLink::Next { page: current + 1 });
    }
    links
}
