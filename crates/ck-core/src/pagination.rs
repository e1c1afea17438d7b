//! Pagination types
//!
//! Pages are 1-indexed. Invalid bounds are rejected rather than clamped.

use serde::{Deserialize, Serialize};

use crate::error::QsError;
use crate::result::QsResult;

/// A validated page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    /// Page number (1-indexed)
    pub page: u64,
    /// Items per page
    pub page_size: u64,
}

impl PageRequest {
    /// Validate a page request; `page < 1` or `page_size < 1` is a range error
    pub fn new(page: i64, page_size: i64) -> QsResult<Self> {
        if page < 1 {
            return Err(QsError::out_of_range("page", page, "page must be at least 1"));
        }
        if page_size < 1 {
            return Err(QsError::out_of_range(
                "page_size",
                page_size,
                "page size must be at least 1",
            ));
        }
        Ok(Self {
            page: page as u64,
            page_size: page_size as u64,
        })
    }

    /// Number of rows to skip
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.page_size
    }

    /// Number of rows to take
    pub fn limit(&self) -> u64 {
        self.page_size
    }
}

/// Query result with pagination metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl<T> PagedResult<T> {
    /// Build a result from the bounds that were actually requested
    pub fn new(items: Vec<T>, total: u64, skip: u64, take: u64) -> Self {
        let page = if take == 0 { 1 } else { skip / take + 1 };
        Self {
            items,
            total,
            page,
            page_size: take,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            1
        } else {
            self.total.div_ceil(self.page_size)
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}
