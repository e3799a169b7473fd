use async_trait::async_trait;
use sea_orm::{
    ConnectionTrait, Statement, TransactionTrait,
    sea_query::{Alias, OnConflict, Query, SimpleExpr},
};
use tracing::debug;

use crate::{
    db::{Store, StoreRole},
    error::{EtlError, EtlResult},
    models::Record,
    page::{Cursor, Page, PageSink, PageSource},
    schema::{Layout, Table, TableLayout},
};

/// Upserts typed records into the destination store and reads them back.
pub struct DestinationWriter {
    store: Store,
    layout: Layout,
    page_size: u64,
}

impl DestinationWriter {
    pub fn new(store: Store, layout: Layout, page_size: u64) -> Self {
        Self { store, layout, page_size: page_size.max(1) }
    }

    fn upsert_statement(&self, layout: &TableLayout, record: &Record) -> EtlResult<Statement> {
        let table = layout.table;
        let spec = table.spec();

        let values = layout
            .columns
            .iter()
            .map(|c| {
                record.value(c.name).map(SimpleExpr::Value).ok_or_else(|| {
                    EtlError::Config(format!("record {record} has no field `{}`", c.name))
                })
            })
            .collect::<EtlResult<Vec<_>>>()?;

        let mut insert = Query::insert();
        insert
            .into_table(self.store.table_ref(table))
            .columns(layout.columns.iter().map(|c| Alias::new(c.name)))
            .values(values)
            .map_err(|e| EtlError::Config(format!("cannot build upsert for {record}: {e}")))?;
        insert.on_conflict(
            OnConflict::columns(spec.conflict_key.iter().map(|c| Alias::new(*c)))
                .update_columns(layout.update_columns().map(|c| Alias::new(c.name)))
                .to_owned(),
        );

        Ok(self.store.connection().get_database_backend().build(&insert))
    }
}

#[async_trait]
impl PageSink for DestinationWriter {
    /// Runs one statement per record inside a single transaction. Nothing from
    /// this call is kept if any record fails; earlier calls stay committed.
    async fn upsert(&self, table: Table, records: &[Record]) -> EtlResult<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let layout = self.layout.table(table);
        if let Some(stray) = records.iter().find(|r| r.table() != table) {
            return Err(EtlError::Config(format!("record {stray} cannot be written to {table}")));
        }

        let txn = self
            .store
            .connection()
            .begin()
            .await
            .map_err(|e| EtlError::from_query(StoreRole::Destination, table, e))?;

        let mut affected = 0;
        for record in records {
            let stmt = self.upsert_statement(layout, record)?;
            let result = txn
                .execute(stmt)
                .await
                .map_err(|e| EtlError::from_write(table, Some(record.id()), e))?;
            affected += result.rows_affected();
        }

        // Deferred foreign keys are only checked here.
        txn.commit().await.map_err(|e| EtlError::from_write(table, None, e))?;

        debug!(table = %table, records = records.len(), affected, "upserted page");
        Ok(affected)
    }
}

#[async_trait]
impl PageSource for DestinationWriter {
    async fn row_count(&self, table: Table) -> EtlResult<u64> {
        self.store.row_count(table).await
    }

    async fn next_page(&self, table: Table, cursor: Cursor) -> EtlResult<Page> {
        let columns = &self.layout.table(table).columns;
        self.store.fetch_page(table, columns, cursor, self.page_size).await
    }
}
