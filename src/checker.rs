//! Re-scans both stores and compares them page by page.

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    error::{EtlError, EtlResult},
    models::Record,
    page::{Cursor, PageSource},
    schema::Table,
};

#[derive(Clone, Debug, Default, Serialize)]
pub struct TableCheck {
    pub table: String,
    pub rows: u64,
    pub pages: u64,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct CheckReport {
    pub tables: Vec<TableCheck>,
}

pub struct ConsistencyChecker<'a, S, D> {
    source: &'a S,
    destination: &'a D,
    tables: Vec<Table>,
}

impl<'a, S, D> ConsistencyChecker<'a, S, D>
where
    S: PageSource,
    D: PageSource,
{
    pub fn new(source: &'a S, destination: &'a D) -> Self {
        Self { source, destination, tables: Table::LOAD_ORDER.to_vec() }
    }

    pub fn with_tables(mut self, tables: Vec<Table>) -> Self {
        self.tables = tables;
        self
    }

    /// Stops at the first divergent page or row count.
    pub async fn run(&self) -> EtlResult<CheckReport> {
        let mut report = CheckReport::default();
        for &table in &self.tables {
            let check = self.check_table(table).await?;
            info!(table = %table, rows = check.rows, pages = check.pages, "table consistent");
            report.tables.push(check);
        }
        Ok(report)
    }

    async fn check_table(&self, table: Table) -> EtlResult<TableCheck> {
        let mut cursor = Cursor::start();
        let mut pages = 0;

        loop {
            let (source, destination) = tokio::try_join!(
                self.source.next_page(table, cursor),
                self.destination.next_page(table, cursor),
            )?;

            if let Some(detail) = describe_difference(&source.records, &destination.records) {
                return Err(EtlError::ConsistencyMismatch { table, offset: cursor.offset(), detail });
            }
            if source.is_empty() {
                break;
            }

            debug!(table = %table, offset = cursor.offset(), rows = source.len(), "page matches");
            pages += 1;
            cursor = source.next;
        }

        let (source_rows, destination_rows) =
            tokio::try_join!(self.source.row_count(table), self.destination.row_count(table))?;
        if source_rows != destination_rows {
            return Err(EtlError::ConsistencyMismatch {
                table,
                offset: cursor.offset(),
                detail: format!(
                    "source has {source_rows} rows, destination has {destination_rows}"
                ),
            });
        }

        Ok(TableCheck { table: table.to_string(), rows: source_rows, pages })
    }
}

fn describe_difference(source: &[Record], destination: &[Record]) -> Option<String> {
    if let Some(index) = source.iter().zip(destination).position(|(s, d)| s != d) {
        return Some(format!(
            "record {index} differs: source {:?}, destination {:?}",
            source[index], destination[index]
        ));
    }
    if source.len() != destination.len() {
        return Some(format!(
            "source page has {} records, destination page has {}",
            source.len(),
            destination.len()
        ));
    }
    None
}
