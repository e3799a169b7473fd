use async_trait::async_trait;

use crate::{error::EtlResult, models::Record, schema::Table};

pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Position of the next page within one table scan.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Cursor {
    offset: u64,
}

impl Cursor {
    pub fn start() -> Self {
        Self::default()
    }

    pub fn offset(self) -> u64 {
        self.offset
    }

    /// Moves past a full page, whatever the page actually held.
    pub fn advance(self, page_size: u64) -> Self {
        Self { offset: self.offset.saturating_add(page_size) }
    }

    pub fn reset(&mut self) {
        self.offset = 0;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,
    /// Cursor to pass to the following `next_page` call.
    pub next: Cursor,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Paginated read access shared by both ends of the migration.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn row_count(&self, table: Table) -> EtlResult<u64>;

    /// Returns the page at `cursor`, ordered by id; empty once the table is exhausted.
    async fn next_page(&self, table: Table, cursor: Cursor) -> EtlResult<Page>;
}

#[async_trait]
pub trait PageSink: Send + Sync {
    /// Applies `records` atomically and returns the number of rows affected.
    async fn upsert(&self, table: Table, records: &[Record]) -> EtlResult<u64>;
}
