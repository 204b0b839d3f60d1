//! ---
//! dfbs_section: "05-networking-external-interfaces"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Backend REST client and permission endpoints."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

const DEFAULT_PAGE_SIZE: u32 = 20;

/// Paginated listing as returned by the backend (0-based `number`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpringPage<T> {
    /// Rows of the current page.
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    /// Total rows across all pages.
    #[serde(default)]
    pub total_elements: u64,
    /// Total number of pages.
    #[serde(default)]
    pub total_pages: u32,
    /// 0-based page index.
    #[serde(default)]
    pub number: u32,
    /// Requested page size.
    #[serde(default)]
    pub size: u32,
}

impl<T> SpringPage<T> {
    /// Page with no rows.
    pub fn empty(size: u32) -> Self {
        Self {
            content: Vec::new(),
            total_elements: 0,
            total_pages: 0,
            number: 0,
            size,
        }
    }
}

/// Listing shaped for table widgets (1-based `page`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePage<T> {
    /// Rows of the current page.
    pub data: Vec<T>,
    /// Total rows across all pages.
    pub total: u64,
    /// Always `true` for an adapted page.
    pub success: bool,
    /// 1-based page index.
    pub page: u32,
    /// Page size.
    pub page_size: u32,
}

impl<T> From<SpringPage<T>> for TablePage<T> {
    fn from(page: SpringPage<T>) -> Self {
        Self {
            data: page.content,
            total: page.total_elements,
            success: true,
            page: page.number.saturating_add(1),
            page_size: page.size,
        }
    }
}

/// Page selection as the UI expresses it (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number; `0` is treated as the first page.
    pub page: u32,
    /// Rows per page; `0` falls back to the default size.
    pub size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Select `page` (1-based) with `size` rows.
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    /// Query parameters in backend form (`page` 0-based).
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let size = if self.size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.size
        };
        vec![
            ("page", self.page.saturating_sub(1).to_string()),
            ("size", size.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapts_backend_page() {
        let raw = r#"{"content":[{"id":1},{"id":2}],"totalElements":42,"totalPages":3,"number":1,"size":20}"#;
        let page: SpringPage<serde_json::Value> = serde_json::from_str(raw).unwrap();
        let table: TablePage<serde_json::Value> = page.into();
        assert_eq!(table.data.len(), 2);
        assert_eq!(table.total, 42);
        assert_eq!(table.page, 2);
        assert!(table.success);
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let page: SpringPage<u32> = serde_json::from_str("{}").unwrap();
        let table = TablePage::from(page);
        assert!(table.data.is_empty());
        assert_eq!(table.total, 0);
        assert_eq!(table.page, 1);
    }

    #[test]
    fn last_representable_page_number_does_not_overflow() {
        let page: SpringPage<u32> = serde_json::from_str(r#"{"number":4294967295}"#).unwrap();
        assert_eq!(TablePage::from(page).page, u32::MAX);
    }

    #[test]
    fn request_converts_to_zero_based_query() {
        assert_eq!(
            PageRequest::new(3, 50).to_query(),
            vec![("page", "2".to_string()), ("size", "50".to_string())]
        );
        assert_eq!(
            PageRequest::new(0, 0).to_query(),
            vec![("page", "0".to_string()), ("size", "20".to_string())]
        );
    }
}
