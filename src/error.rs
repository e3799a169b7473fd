use sea_orm::{DbErr, SqlErr, prelude::Uuid};
use thiserror::Error;

use crate::{db::StoreRole, schema::Table};

#[derive(Debug, Error)]
pub enum EtlError {
    #[error("{store} store unavailable: {source}")]
    StoreUnavailable {
        store: StoreRole,
        #[source]
        source: DbErr,
    },

    #[error("cannot map row at offset {offset} of table {table}: {reason}")]
    RowMapping { table: Table, offset: u64, reason: String },

    #[error("constraint violation in table {table}{}: {message}", describe_record(.record))]
    ConstraintViolation { table: Table, record: Option<Uuid>, message: String },

    #[error("consistency mismatch in table {table} at offset {offset}: {detail}")]
    ConsistencyMismatch { table: Table, offset: u64, detail: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("query on table {table} failed: {source}")]
    Query {
        table: Table,
        #[source]
        source: DbErr,
    },
}

impl EtlError {
    /// Classifies a failed read or count against `table`.
    pub fn from_query(store: StoreRole, table: Table, err: DbErr) -> Self {
        if is_connection_error(&err) {
            Self::StoreUnavailable { store, source: err }
        } else {
            Self::Query { table, source: err }
        }
    }

    /// Classifies a failed write into `table`. `record` is unknown when the
    /// failure surfaces at commit.
    pub fn from_write(table: Table, record: Option<Uuid>, err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(message))
            | Some(SqlErr::ForeignKeyConstraintViolation(message)) => {
                Self::ConstraintViolation { table, record, message }
            },
            _ => Self::from_query(StoreRole::Destination, table, err),
        }
    }
}

fn describe_record(record: &Option<Uuid>) -> String {
    match record {
        Some(id) => format!(" for record {id}"),
        None => String::new(),
    }
}

fn is_connection_error(err: &DbErr) -> bool {
    matches!(err, DbErr::Conn(_) | DbErr::ConnectionAcquire(_))
}

pub type EtlResult<T> = Result<T, EtlError>;
