use std::fmt;

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, QueryResult,
    Statement, Value,
    prelude::{Date, DateTimeUtc, Uuid},
    sea_query::{Alias, Expr, Func, IntoTableRef, Order, Query, TableRef},
};
use tracing::debug;

use crate::{
    error::{EtlError, EtlResult},
    models::{Record, Row},
    page::{Cursor, Page},
    schema::{ColumnKind, ColumnSpec, LiveColumns, Table},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StoreRole {
    Source,
    Destination,
}

impl fmt::Display for StoreRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreRole::Source => f.write_str("source"),
            StoreRole::Destination => f.write_str("destination"),
        }
    }
}

/// One open connection to either end of the migration.
pub struct Store {
    db: DatabaseConnection,
    role: StoreRole,
    namespace: Option<String>,
}

impl Store {
    pub async fn connect(url: &str, role: StoreRole, namespace: Option<String>) -> EtlResult<Self> {
        let mut options = ConnectOptions::new(url.to_string());
        options.max_connections(1).min_connections(1).sqlx_logging(false);

        let db = Database::connect(options)
            .await
            .map_err(|source| EtlError::StoreUnavailable { store: role, source })?;

        Self::from_connection(db, role, namespace).await
    }

    /// Wraps an existing connection. The namespace only applies to Postgres.
    pub async fn from_connection(
        db: DatabaseConnection,
        role: StoreRole,
        namespace: Option<String>,
    ) -> EtlResult<Self> {
        let backend = db.get_database_backend();

        if backend == DbBackend::Sqlite {
            db.execute(Statement::from_string(backend, "PRAGMA foreign_keys=ON".to_string()))
                .await
                .map_err(|source| EtlError::StoreUnavailable { store: role, source })?;
        }

        let namespace = match backend {
            DbBackend::Postgres => namespace,
            _ => None,
        };

        Ok(Self { db, role, namespace })
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn table_ref(&self, table: Table) -> TableRef {
        match &self.namespace {
            Some(namespace) => {
                (Alias::new(namespace.as_str()), Alias::new(table.name())).into_table_ref()
            },
            None => Alias::new(table.name()).into_table_ref(),
        }
    }

    pub async fn live_columns(&self) -> EtlResult<LiveColumns> {
        let backend = self.db.get_database_backend();
        let mut live = LiveColumns::new();

        for table in Table::LOAD_ORDER {
            let stmt = match backend {
                DbBackend::Sqlite => Statement::from_sql_and_values(
                    backend,
                    "SELECT name FROM pragma_table_info(?)",
                    [table.name().into()],
                ),
                DbBackend::Postgres => Statement::from_sql_and_values(
                    backend,
                    "SELECT column_name::text AS name FROM information_schema.columns \
                     WHERE table_schema = $1 AND table_name = $2",
                    [self.namespace.as_deref().unwrap_or("public").into(), table.name().into()],
                ),
                other => {
                    return Err(EtlError::Config(format!(
                        "{} store uses unsupported backend {other:?}",
                        self.role
                    )));
                },
            };

            let rows = self.db.query_all(stmt).await.map_err(|e| self.query_error(table, e))?;
            let columns = rows
                .iter()
                .map(|row| row.try_get::<String>("", "name"))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| self.query_error(table, e))?;
            live.insert(table, columns);
        }

        Ok(live)
    }

    pub async fn row_count(&self, table: Table) -> EtlResult<u64> {
        let stmt = Query::select()
            .expr_as(Func::count(Expr::col(Alias::new("id"))), Alias::new("count"))
            .from(self.table_ref(table))
            .to_owned();

        let row = self
            .db
            .query_one(self.db.get_database_backend().build(&stmt))
            .await
            .map_err(|e| self.query_error(table, e))?;

        let count = match row {
            Some(row) => row.try_get::<i64>("", "count").map_err(|e| self.query_error(table, e))?,
            None => 0,
        };
        Ok(count.max(0) as u64)
    }

    /// Reads `page_size` rows of `columns` at `cursor`, ordered by id.
    pub async fn fetch_page(
        &self,
        table: Table,
        columns: &[&'static ColumnSpec],
        cursor: Cursor,
        page_size: u64,
    ) -> EtlResult<Page> {
        let stmt = Query::select()
            .columns(columns.iter().map(|c| Alias::new(c.name)))
            .from(self.table_ref(table))
            .order_by(Alias::new("id"), Order::Asc)
            .limit(page_size)
            .offset(cursor.offset())
            .to_owned();

        let rows = self
            .db
            .query_all(self.db.get_database_backend().build(&stmt))
            .await
            .map_err(|e| self.query_error(table, e))?;

        let mut records = Vec::with_capacity(rows.len());
        for (index, result) in rows.iter().enumerate() {
            let offset = cursor.offset() + index as u64;
            let record = decode_row(result, columns)
                .and_then(|row| Record::from_row(table, &row))
                .map_err(|reason| EtlError::RowMapping { table, offset, reason })?;
            records.push(record);
        }

        debug!(store = %self.role, table = %table, offset = cursor.offset(), rows = records.len(), "fetched page");

        Ok(Page { records, next: cursor.advance(page_size) })
    }

    fn query_error(&self, table: Table, err: sea_orm::DbErr) -> EtlError {
        EtlError::from_query(self.role, table, err)
    }
}

fn decode_row(result: &QueryResult, columns: &[&'static ColumnSpec]) -> Result<Row, String> {
    let mut row = Row::new();
    for column in columns {
        row.insert(column.name, decode_column(result, column)?);
    }
    Ok(row)
}

// SQLite keeps ids, dates and timestamps as text; Postgres has native types.
// Try the native decoding first and fall back to parsing text.
fn decode_column(result: &QueryResult, column: &ColumnSpec) -> Result<Value, String> {
    let name = column.name;
    let text = || {
        result.try_get::<Option<String>>("", name).map_err(|e| format!("column `{name}`: {e}"))
    };

    let value: Value = match column.kind {
        ColumnKind::Text => text()?.into(),
        ColumnKind::Uuid => match result.try_get::<Option<Uuid>>("", name) {
            Ok(v) => v.into(),
            Err(_) => text()?
                .map(|t| Uuid::parse_str(t.trim()))
                .transpose()
                .map_err(|e| format!("column `{name}`: {e}"))?
                .into(),
        },
        ColumnKind::Date => match result.try_get::<Option<Date>>("", name) {
            Ok(v) => v.into(),
            Err(_) => text()?.as_deref().map(parse_date).transpose()?.into(),
        },
        ColumnKind::Timestamp => match result.try_get::<Option<DateTimeUtc>>("", name) {
            Ok(v) => v.into(),
            Err(_) => text()?.as_deref().map(parse_timestamp).transpose()?.into(),
        },
        ColumnKind::Float => match result.try_get::<Option<f64>>("", name) {
            Ok(v) => v.into(),
            Err(_) => result
                .try_get::<Option<i64>>("", name)
                .map(|v| v.map(|i| i as f64))
                .map_err(|e| format!("column `{name}`: {e}"))?
                .into(),
        },
    };
    Ok(value)
}

/// Parses `2021-06-16 20:14:09.221838+00`, RFC 3339, or an offset-less value taken as UTC.
pub fn parse_timestamp(text: &str) -> Result<DateTimeUtc, String> {
    let text = text.trim();
    let ts = match text.parse::<jiff::Timestamp>() {
        Ok(ts) => ts,
        Err(_) => text
            .parse::<jiff::civil::DateTime>()
            .and_then(|dt| dt.to_zoned(jiff::tz::TimeZone::UTC))
            .map(|zoned| zoned.timestamp())
            .map_err(|e| format!("invalid timestamp `{text}`: {e}"))?,
    };
    DateTimeUtc::from_timestamp(ts.as_second(), ts.subsec_nanosecond() as u32)
        .ok_or_else(|| format!("timestamp `{text}` out of range"))
}

pub fn parse_date(text: &str) -> Result<Date, String> {
    let text = text.trim();
    let date = text
        .parse::<jiff::civil::Date>()
        .or_else(|_| text.get(..10).unwrap_or(text).parse::<jiff::civil::Date>())
        .map_err(|e| format!("invalid date `{text}`: {e}"))?;
    Date::from_ymd_opt(date.year().into(), date.month() as u32, date.day() as u32)
        .ok_or_else(|| format!("date `{text}` out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sqlite_timestamps() {
        let ts = parse_timestamp("2021-06-16 20:14:09.221838+00").unwrap();
        assert_eq!(ts, DateTimeUtc::from_timestamp(1_623_874_449, 221_838_000).unwrap());
    }

    #[test]
    fn offsetless_timestamp_is_utc() {
        let ts = parse_timestamp("2021-06-16 20:14:09").unwrap();
        assert_eq!(ts, DateTimeUtc::from_timestamp(1_623_874_449, 0).unwrap());
    }

    #[test]
    fn rejects_garbage_timestamp() {
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn parses_dates() {
        assert_eq!(parse_date("1972-03-20").unwrap(), Date::from_ymd_opt(1972, 3, 20).unwrap());
        assert_eq!(
            parse_date("1972-03-20 00:00:00").unwrap(),
            Date::from_ymd_opt(1972, 3, 20).unwrap()
        );
    }
}
