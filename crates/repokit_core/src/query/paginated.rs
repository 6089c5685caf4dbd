//! Page windows over ordered sequences.
//!
//! # Responsibility
//! - Validate 1-based page requests.
//! - Carry one page of items plus metadata derived from the total count.
//!
//! # Invariants
//! - `total_count` is counted before the window is applied.
//! - `items.len() <= page_size`; pages past the end are empty, never clamped.

use super::{QueryError, QueryResult};
use serde::{Deserialize, Serialize};

/// Validated 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page_number: u32,
    page_size: u32,
}

impl PageRequest {
    /// Builds a request, rejecting zero page numbers and zero page sizes.
    pub fn new(page_number: u32, page_size: u32) -> QueryResult<Self> {
        if page_number == 0 {
            return Err(QueryError::InvalidArgument(
                "page number must be at least 1".to_string(),
            ));
        }
        if page_size == 0 {
            return Err(QueryError::InvalidArgument(
                "page size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            page_number,
            page_size,
        })
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of items before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page_number - 1) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

/// Page metadata without items, as exposed to API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMetadata {
    pub page_number: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u64,
    pub has_previous: bool,
    pub has_next: bool,
}

/// One page of items together with count-derived metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedList<T> {
    items: Vec<T>,
    page_number: u32,
    page_size: u32,
    total_count: u64,
    total_pages: u64,
}

impl<T> PaginatedList<T> {
    /// Wraps an already-windowed page.
    pub fn new(items: Vec<T>, page: PageRequest, total_count: u64) -> Self {
        let page_size = u64::from(page.page_size());
        Self {
            items,
            page_number: page.page_number(),
            page_size: page.page_size(),
            total_count,
            total_pages: total_count.div_ceil(page_size),
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page_number > 1
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page_number) < self.total_pages
    }

    pub fn metadata(&self) -> PaginationMetadata {
        PaginationMetadata {
            page_number: self.page_number,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages,
            has_previous: self.has_previous(),
            has_next: self.has_next(),
        }
    }

    /// Converts every item, keeping page metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedList<U> {
        PaginatedList {
            items: self.items.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages,
        }
    }

    /// Fallible variant of [`PaginatedList::map`].
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<PaginatedList<U>, E> {
        let items = self.items.into_iter().map(f).collect::<Result<Vec<_>, E>>()?;
        Ok(PaginatedList {
            items,
            page_number: self.page_number,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages,
        })
    }
}

/// Counts `source`, then keeps the requested window.
pub fn to_paginated_list<T>(
    source: impl IntoIterator<Item = T>,
    page: PageRequest,
) -> PaginatedList<T> {
    let all = source.into_iter().collect::<Vec<_>>();
    let total_count = all.len() as u64;
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let items = all
        .into_iter()
        .skip(offset)
        .take(page.page_size() as usize)
        .collect();
    PaginatedList::new(items, page, total_count)
}

/// Validates raw page arguments and paginates `source`.
pub fn paginate<T>(
    source: impl IntoIterator<Item = T>,
    page_number: u32,
    page_size: u32,
) -> QueryResult<PaginatedList<T>> {
    let page = PageRequest::new(page_number, page_size)?;
    Ok(to_paginated_list(source, page))
}
