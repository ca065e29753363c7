//! Pagination primitives shared between the HTTP layer and the services.
//!
//! `Pagination` normalizes raw page inputs, `Sort` carries an opaque
//! `field,direction` request through to the entity services, and `Page` is the
//! response envelope every listing returns.

use serde::Serialize;

/// Pagination parameters
#[derive(Clone, Copy, Debug)]
pub struct Pagination {
    /// 1-based page index
    pub page: u32,
    /// items per page
    pub per_page: u32,
}

impl Pagination {
    /// Clamp to sane defaults and convert to a 0-based `(page_index, page_size)`
    pub fn normalize(self) -> (u64, u64) {
        let page = if self.page == 0 { 1 } else { self.page };
        let per_page = self.per_page.clamp(1, 100);
        ((page - 1) as u64, per_page as u64)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, per_page: 10 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Requested sort order, parsed from the `sort=field,direction` query form.
/// The field name stays opaque here; each entity service maps it onto one of
/// its own sortable columns and ignores names it does not recognize.
#[derive(Clone, Debug)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    /// Parse `"title"`, `"title,asc"` or `"title,desc"`. Direction defaults to
    /// ascending; an empty field yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(2, ',');
        let field = parts.next()?.trim();
        if field.is_empty() {
            return None;
        }
        let direction = match parts.next().map(str::trim) {
            Some(d) if d.eq_ignore_ascii_case("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        };
        Some(Self { field: field.to_string(), direction })
    }
}

/// One page of results plus the totals a client needs to page further.
#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: u64, per_page: u64, total_items: u64, total_pages: u64) -> Self {
        Self { items, page, per_page, total_items, total_pages }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Page, Pagination, Sort, SortDirection};

    #[test]
    fn normalize_clamps_zero_to_defaults() {
        let (idx, per) = Pagination { page: 0, per_page: 0 }.normalize();
        assert_eq!(idx, 0);
        assert_eq!(per, 1);
    }

    #[test]
    fn normalize_clamps_upper_bound() {
        let (idx, per) = Pagination { page: 5, per_page: 1000 }.normalize();
        assert_eq!(idx, 4);
        assert_eq!(per, 100);
    }

    #[test]
    fn default_values_are_sane() {
        let d = Pagination::default();
        assert_eq!(d.page, 1);
        assert_eq!(d.per_page, 10);
    }

    #[test]
    fn sort_parse_field_only_defaults_to_asc() {
        let s = Sort::parse("title").unwrap();
        assert_eq!(s.field, "title");
        assert_eq!(s.direction, SortDirection::Asc);
    }

    #[test]
    fn sort_parse_with_direction() {
        let s = Sort::parse("startDate,desc").unwrap();
        assert_eq!(s.field, "startDate");
        assert_eq!(s.direction, SortDirection::Desc);

        let s = Sort::parse(" email , ASC ").unwrap();
        assert_eq!(s.field, "email");
        assert_eq!(s.direction, SortDirection::Asc);
    }

    #[test]
    fn sort_parse_rejects_empty_field() {
        assert!(Sort::parse("").is_none());
        assert!(Sort::parse(" ,desc").is_none());
    }

    #[test]
    fn page_reports_emptiness() {
        let empty: Page<u8> = Page::new(vec![], 1, 10, 0, 0);
        assert!(empty.is_empty());
        let full = Page::new(vec![1u8], 1, 10, 1, 1);
        assert!(!full.is_empty());
    }
}
