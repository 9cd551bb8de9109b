use serde::{Deserialize, Serialize};

/// Position in a paginated remote listing. Pages are 1-based.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageCursor {
    pub page: u32,
    /// `None` lets the remote apply its default page size
    pub limit: Option<u32>,
}

impl PageCursor {
    pub fn first(limit: Option<u32>) -> Self {
        Self { page: 1, limit }
    }

    pub fn next(self) -> Self {
        Self {
            page: self.page + 1,
            limit: self.limit,
        }
    }
}

/// One page of results plus the page count the remote reported for the listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: u32, total_pages: u32) -> Self {
        Self {
            items,
            page,
            total_pages,
        }
    }
}
