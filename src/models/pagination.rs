//! Page-number pagination for list endpoints

use serde::{Deserialize, Serialize};

/// `?page=` query parameter
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
}

impl PageParams {
    /// 1-based page number
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Row offset for the given page size
    pub fn offset(&self, page_size: u32) -> i64 {
        i64::from(self.page() - 1) * i64::from(page_size)
    }
}

/// Paginated list envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// Total number of matching records
    pub count: i64,
    pub page: u32,
    pub page_size: u32,
    pub next: Option<u32>,
    pub previous: Option<u32>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, count: i64, page: u32, page_size: u32) -> Self {
        let shown = i64::from(page) * i64::from(page_size);
        Self {
            count,
            page,
            page_size,
            next: (shown < count).then_some(page + 1),
            previous: (page > 1).then(|| page - 1),
            results,
        }
    }
}
