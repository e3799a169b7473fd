//! Declarative table mappings and the startup check that ties them to the
//! live source and destination schemas.

use std::{collections::HashMap, fmt, str::FromStr};

use tracing::{info, warn};

use crate::error::{EtlError, EtlResult};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub enum Table {
    Genre,
    Filmwork,
    Person,
    GenreFilmwork,
    PersonFilmwork,
}

impl Table {
    /// Parents first, so junction rows always find the rows they reference.
    pub const LOAD_ORDER: [Table; 5] = [
        Table::Genre,
        Table::Filmwork,
        Table::Person,
        Table::GenreFilmwork,
        Table::PersonFilmwork,
    ];

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn spec(self) -> &'static TableSpec {
        match self {
            Table::Genre => &GENRE,
            Table::Filmwork => &FILM_WORK,
            Table::Person => &PERSON,
            Table::GenreFilmwork => &GENRE_FILM_WORK,
            Table::PersonFilmwork => &PERSON_FILM_WORK,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColumnKind {
    Uuid,
    Text,
    Date,
    Timestamp,
    Float,
}

#[derive(Debug)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
    /// Present in only one of the schema variants.
    pub drift: Option<DriftField>,
}

impl ColumnSpec {
    const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind, drift: None }
    }

    const fn drift(name: &'static str, kind: ColumnKind, field: DriftField) -> Self {
        Self { name, kind, drift: Some(field) }
    }
}

#[derive(Debug)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [ColumnSpec],
    pub primary_key: &'static [&'static str],
    pub conflict_key: &'static [&'static str],
}

static GENRE: TableSpec = TableSpec {
    name: "genre",
    columns: &[
        ColumnSpec::new("id", ColumnKind::Uuid),
        ColumnSpec::new("name", ColumnKind::Text),
        ColumnSpec::new("description", ColumnKind::Text),
        ColumnSpec::new("created_at", ColumnKind::Timestamp),
        ColumnSpec::new("updated_at", ColumnKind::Timestamp),
    ],
    primary_key: &["id"],
    conflict_key: &["id"],
};

static FILM_WORK: TableSpec = TableSpec {
    name: "film_work",
    columns: &[
        ColumnSpec::new("id", ColumnKind::Uuid),
        ColumnSpec::new("title", ColumnKind::Text),
        ColumnSpec::new("description", ColumnKind::Text),
        ColumnSpec::new("creation_date", ColumnKind::Date),
        ColumnSpec::drift("certificate", ColumnKind::Text, DriftField::Certificate),
        ColumnSpec::new("file_path", ColumnKind::Text),
        ColumnSpec::new("rating", ColumnKind::Float),
        ColumnSpec::new("type", ColumnKind::Text),
        ColumnSpec::new("created_at", ColumnKind::Timestamp),
        ColumnSpec::new("updated_at", ColumnKind::Timestamp),
    ],
    primary_key: &["id"],
    conflict_key: &["id"],
};

static PERSON: TableSpec = TableSpec {
    name: "person",
    columns: &[
        ColumnSpec::new("id", ColumnKind::Uuid),
        ColumnSpec::new("full_name", ColumnKind::Text),
        ColumnSpec::drift("birth_date", ColumnKind::Date, DriftField::BirthDate),
        ColumnSpec::new("created_at", ColumnKind::Timestamp),
        ColumnSpec::new("updated_at", ColumnKind::Timestamp),
    ],
    primary_key: &["id"],
    conflict_key: &["id"],
};

static GENRE_FILM_WORK: TableSpec = TableSpec {
    name: "genre_film_work",
    columns: &[
        ColumnSpec::new("id", ColumnKind::Uuid),
        ColumnSpec::new("film_work_id", ColumnKind::Uuid),
        ColumnSpec::new("genre_id", ColumnKind::Uuid),
        ColumnSpec::new("created_at", ColumnKind::Timestamp),
    ],
    primary_key: &["id"],
    conflict_key: &["id"],
};

// Keyed on id like the others; a regenerated id for an existing
// (film_work_id, person_id) pair is reported as a constraint violation.
static PERSON_FILM_WORK: TableSpec = TableSpec {
    name: "person_film_work",
    columns: &[
        ColumnSpec::new("id", ColumnKind::Uuid),
        ColumnSpec::new("film_work_id", ColumnKind::Uuid),
        ColumnSpec::new("person_id", ColumnKind::Uuid),
        ColumnSpec::new("role", ColumnKind::Text),
        ColumnSpec::new("created_at", ColumnKind::Timestamp),
    ],
    primary_key: &["id"],
    conflict_key: &["id"],
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DriftField {
    Certificate,
    BirthDate,
}

/// Which optional columns take part in the migration.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FieldSet {
    pub certificate: bool,
    pub birth_date: bool,
}

impl FieldSet {
    pub fn current() -> Self {
        Self { certificate: false, birth_date: false }
    }

    pub fn legacy() -> Self {
        Self { certificate: true, birth_date: true }
    }

    pub fn includes(&self, column: &ColumnSpec) -> bool {
        match column.drift {
            None => true,
            Some(DriftField::Certificate) => self.certificate,
            Some(DriftField::BirthDate) => self.birth_date,
        }
    }
}

impl FromStr for FieldSet {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "current" => Ok(Self::current()),
            "legacy" => Ok(Self::legacy()),
            other => Err(EtlError::Config(format!(
                "unknown schema variant `{other}` (expected `current` or `legacy`)"
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TableLayout {
    pub table: Table,
    /// Columns written to, and read back from, the destination.
    pub columns: Vec<&'static ColumnSpec>,
    /// Columns selected from the source; drift columns it lacks are left out.
    pub source_columns: Vec<&'static ColumnSpec>,
}

impl TableLayout {
    pub fn update_columns(&self) -> impl Iterator<Item = &'static ColumnSpec> + '_ {
        let spec = self.table.spec();
        self.columns
            .iter()
            .copied()
            .filter(move |c| {
                !spec.conflict_key.contains(&c.name) && !spec.primary_key.contains(&c.name)
            })
    }
}

#[derive(Clone, Debug)]
pub struct Layout {
    tables: Vec<TableLayout>,
}

/// Live column names per table, as reported by one store.
pub type LiveColumns = HashMap<Table, Vec<String>>;

impl Layout {
    /// Uses every column the field set enables, without consulting either store.
    pub fn unchecked(fields: FieldSet) -> Self {
        let tables = Table::LOAD_ORDER
            .iter()
            .map(|&table| {
                let columns: Vec<_> =
                    table.spec().columns.iter().filter(|c| fields.includes(c)).collect();
                TableLayout { table, source_columns: columns.clone(), columns }
            })
            .collect();
        Self { tables }
    }

    pub fn resolve(
        fields: FieldSet,
        source: &LiveColumns,
        destination: &LiveColumns,
    ) -> EtlResult<Self> {
        let mut tables = Vec::with_capacity(Table::LOAD_ORDER.len());

        for table in Table::LOAD_ORDER {
            let spec = table.spec();
            let source_live = live_for(source, table, "source")?;
            let destination_live = live_for(destination, table, "destination")?;

            let mut columns = Vec::new();
            let mut source_columns = Vec::new();
            for column in spec.columns {
                if !fields.includes(column) {
                    if source_live.contains(&column.name) {
                        info!(table = %table, column = column.name, "column not in field set, skipping");
                    }
                    continue;
                }

                if !destination_live.contains(&column.name) {
                    return Err(EtlError::Config(format!(
                        "destination table {table} has no column `{}`",
                        column.name
                    )));
                }

                if source_live.contains(&column.name) {
                    source_columns.push(column);
                } else if column.drift.is_some() {
                    warn!(table = %table, column = column.name, "source lacks column, migrating as NULL");
                } else {
                    return Err(EtlError::Config(format!(
                        "source table {table} has no column `{}`",
                        column.name
                    )));
                }
                columns.push(column);
            }

            if let Some(unknown) =
                source_live.iter().find(|name| !spec.columns.iter().any(|c| c.name == **name))
            {
                return Err(EtlError::Config(format!(
                    "source table {table} has column `{unknown}` with no mapping"
                )));
            }

            tables.push(TableLayout { table, columns, source_columns });
        }

        Ok(Self { tables })
    }

    pub fn table(&self, table: Table) -> &TableLayout {
        // Built in LOAD_ORDER, which follows declaration order.
        &self.tables[table as usize]
    }
}

fn live_for<'a>(live: &'a LiveColumns, table: Table, side: &str) -> EtlResult<Vec<&'a str>> {
    match live.get(&table) {
        Some(columns) if !columns.is_empty() => Ok(columns.iter().map(String::as_str).collect()),
        _ => Err(EtlError::Config(format!("{side} store has no table {table}"))),
    }
}
