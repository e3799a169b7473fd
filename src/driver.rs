use serde::Serialize;
use tracing::{debug, error, info};

use crate::{
    error::EtlResult,
    page::{Cursor, PageSink, PageSource},
    schema::Table,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DriverState {
    Idle,
    Draining { table: Table, cursor: Cursor },
    Advancing { table: Table, cursor: Cursor },
    Done,
    Failed,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct TableReport {
    pub table: String,
    pub pages: u64,
    pub rows: u64,
    pub affected: u64,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct MigrationReport {
    pub tables: Vec<TableReport>,
}

impl MigrationReport {
    pub fn rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

/// Copies every table from `source` to `sink`, one page at a time.
pub struct MigrationDriver<'a, S, W> {
    source: &'a S,
    sink: &'a W,
    tables: Vec<Table>,
    state: DriverState,
}

impl<'a, S, W> MigrationDriver<'a, S, W>
where
    S: PageSource,
    W: PageSink,
{
    pub fn new(source: &'a S, sink: &'a W) -> Self {
        Self { source, sink, tables: Table::LOAD_ORDER.to_vec(), state: DriverState::Idle }
    }

    /// Restricts the run to `tables`, in the given order.
    pub fn with_tables(mut self, tables: Vec<Table>) -> Self {
        self.tables = tables;
        self
    }

    pub fn state(&self) -> &DriverState {
        &self.state
    }

    pub async fn run(&mut self) -> EtlResult<MigrationReport> {
        let mut report = MigrationReport::default();
        let mut current = TableReport::default();
        let mut pending = self.tables.clone().into_iter();
        self.state = DriverState::Idle;

        loop {
            self.state = match self.state.clone() {
                DriverState::Idle => start_next(&mut pending, &mut current, Cursor::start()),
                DriverState::Draining { table, cursor } => {
                    match self.transfer_page(table, cursor, &mut current).await {
                        Ok(Some(next)) => DriverState::Draining { table, cursor: next },
                        Ok(None) => DriverState::Advancing { table, cursor },
                        Err(err) => {
                            let completed: Vec<&str> =
                                report.tables.iter().map(|t| t.table.as_str()).collect();
                            error!(
                                table = %table,
                                offset = cursor.offset(),
                                completed = ?completed,
                                error = %err,
                                "migration failed"
                            );
                            self.state = DriverState::Failed;
                            return Err(err);
                        },
                    }
                },
                DriverState::Advancing { table, mut cursor } => {
                    info!(table = %table, pages = current.pages, rows = current.rows, "table migrated");
                    report.tables.push(std::mem::take(&mut current));
                    cursor.reset();
                    start_next(&mut pending, &mut current, cursor)
                },
                DriverState::Done | DriverState::Failed => break,
            };
        }

        info!(tables = report.tables.len(), rows = report.rows(), "migration finished");
        Ok(report)
    }

    /// Moves one page; `None` once the source is exhausted.
    async fn transfer_page(
        &self,
        table: Table,
        cursor: Cursor,
        report: &mut TableReport,
    ) -> EtlResult<Option<Cursor>> {
        let page = self.source.next_page(table, cursor).await?;
        if page.is_empty() {
            return Ok(None);
        }

        let affected = self.sink.upsert(table, &page.records).await?;
        debug!(table = %table, offset = cursor.offset(), rows = page.len(), "page transferred");

        report.pages += 1;
        report.rows += page.len() as u64;
        report.affected += affected;
        Ok(Some(page.next))
    }
}

fn start_next(
    pending: &mut impl Iterator<Item = Table>,
    current: &mut TableReport,
    cursor: Cursor,
) -> DriverState {
    match pending.next() {
        Some(table) => {
            info!(table = %table, "migrating table");
            *current = TableReport { table: table.to_string(), ..Default::default() };
            DriverState::Draining { table, cursor }
        },
        None => DriverState::Done,
    }
}
