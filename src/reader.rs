use async_trait::async_trait;

use crate::{
    db::Store,
    error::EtlResult,
    page::{Cursor, Page, PageSource},
    schema::{Layout, Table},
};

/// Pages typed records out of the source store.
pub struct SourceReader {
    store: Store,
    layout: Layout,
    page_size: u64,
}

impl SourceReader {
    pub fn new(store: Store, layout: Layout, page_size: u64) -> Self {
        Self { store, layout, page_size: page_size.max(1) }
    }
}

#[async_trait]
impl PageSource for SourceReader {
    async fn row_count(&self, table: Table) -> EtlResult<u64> {
        self.store.row_count(table).await
    }

    async fn next_page(&self, table: Table, cursor: Cursor) -> EtlResult<Page> {
        let columns = &self.layout.table(table).source_columns;
        self.store.fetch_page(table, columns, cursor, self.page_size).await
    }
}
