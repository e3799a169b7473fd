#![allow(dead_code)]

use std::path::{Path, PathBuf};

use movies_etl::{
    db::{Store, StoreRole},
    models::Record,
    page::{Cursor, PageSource},
    reader::SourceReader,
    schema::{FieldSet, Layout, Table},
    writer::DestinationWriter,
};
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, Statement, Value,
    prelude::Uuid,
};
use tempfile::TempDir;

const SOURCE_SCHEMA: &str = include_str!("../fixtures/source.sql");
const DESTINATION_SCHEMA: &str = include_str!("../fixtures/destination.sql");

pub const CREATED: &str = "2021-06-16 20:14:09.221838+00";
pub const GENRES: u128 = 23;
pub const FILMS: u128 = 12;
pub const PERSONS: u128 = 15;
pub const FILM_BASE: u128 = 100;
pub const PERSON_BASE: u128 = 200;
pub const GENRE_LINK_BASE: u128 = 300;
pub const PERSON_LINK_BASE: u128 = 400;

/// A source and a destination SQLite file with the five tables created.
pub struct Fixture {
    _dir: TempDir,
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
}

impl Fixture {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let source_path = dir.path().join("source.sqlite");
        let destination_path = dir.path().join("destination.sqlite");

        let source = Database::connect(writable_url(&source_path)).await.expect("source");
        run_sql(&source, SOURCE_SCHEMA).await.expect("source schema");
        let destination =
            Database::connect(writable_url(&destination_path)).await.expect("destination");
        run_sql(&destination, DESTINATION_SCHEMA).await.expect("destination schema");

        Self { _dir: dir, source_path, destination_path }
    }

    pub async fn source(&self) -> DatabaseConnection {
        Database::connect(writable_url(&self.source_path)).await.expect("source")
    }

    pub fn destination_url(&self) -> String {
        writable_url(&self.destination_path)
    }

    /// Opens a reader and writer the way the binaries do, validating `fields`.
    pub async fn open(&self, fields: FieldSet) -> (SourceReader, DestinationWriter) {
        let source = Store::connect(&writable_url(&self.source_path), StoreRole::Source, None)
            .await
            .expect("source store");
        let destination = Store::connect(&self.destination_url(), StoreRole::Destination, None)
            .await
            .expect("destination store");

        let layout = Layout::resolve(
            fields,
            &source.live_columns().await.expect("source columns"),
            &destination.live_columns().await.expect("destination columns"),
        )
        .expect("layout");

        (
            SourceReader::new(source, layout.clone(), 10),
            DestinationWriter::new(destination, layout, 10),
        )
    }
}

fn writable_url(path: &Path) -> String {
    format!("sqlite://{}?mode=rwc", path.display())
}

/// Executes each `;`-separated statement of `sql` in turn.
pub async fn run_sql(db: &DatabaseConnection, sql: &str) -> Result<(), DbErr> {
    for stmt in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        db.execute(Statement::from_string(db.get_database_backend(), stmt.to_string())).await?;
    }
    Ok(())
}

pub fn uuid(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

fn id(n: u128) -> Value {
    uuid(n).to_string().into()
}

async fn insert(db: &DatabaseConnection, sql: &str, values: Vec<Value>) {
    db.execute(Statement::from_sql_and_values(DbBackend::Sqlite, sql, values))
        .await
        .unwrap_or_else(|e| panic!("`{sql}` failed: {e}"));
}

pub async fn insert_genre(db: &DatabaseConnection, n: u128, name: &str) {
    insert(
        db,
        "INSERT INTO genre (id, name, description, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        vec![id(n), name.into(), Option::<String>::None.into(), CREATED.into(), CREATED.into()],
    )
    .await;
}

pub async fn insert_film(db: &DatabaseConnection, n: u128, title: &str, rating: Option<f64>) {
    let kind = if n % 2 == 0 { "movie" } else { "tv_show" };
    let creation_date = (n % 2 == 0).then(|| "2001-05-20".to_string());
    insert(
        db,
        "INSERT INTO film_work (id, title, description, creation_date, file_path, rating, type, \
         created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        vec![
            id(n),
            title.into(),
            format!("About {title}").into(),
            creation_date.into(),
            Option::<String>::None.into(),
            rating.into(),
            kind.into(),
            CREATED.into(),
            CREATED.into(),
        ],
    )
    .await;
}

pub async fn insert_person(db: &DatabaseConnection, n: u128, full_name: &str) {
    insert(
        db,
        "INSERT INTO person (id, full_name, created_at, updated_at) VALUES (?, ?, ?, ?)",
        vec![id(n), full_name.into(), CREATED.into(), CREATED.into()],
    )
    .await;
}

pub async fn insert_genre_link(db: &DatabaseConnection, n: u128, film: u128, genre: u128) {
    insert(
        db,
        "INSERT INTO genre_film_work (id, film_work_id, genre_id, created_at) VALUES (?, ?, ?, ?)",
        vec![id(n), id(film), id(genre), CREATED.into()],
    )
    .await;
}

pub async fn insert_person_link(
    db: &DatabaseConnection,
    n: u128,
    film: u128,
    person: u128,
    role: &str,
) {
    insert(
        db,
        "INSERT INTO person_film_work (id, film_work_id, person_id, role, created_at) \
         VALUES (?, ?, ?, ?, ?)",
        vec![id(n), id(film), id(person), role.into(), CREATED.into()],
    )
    .await;
}

pub async fn seed_genres(db: &DatabaseConnection) {
    for n in 1..=GENRES {
        insert_genre(db, n, &format!("Genre {n:02}")).await;
    }
}

/// 23 genres, 12 film works, 15 persons and 24 rows in each junction table.
pub async fn seed_catalog(db: &DatabaseConnection) {
    seed_genres(db).await;

    for f in 1..=FILMS {
        let rating = (f % 2 == 0).then(|| 3.0 + f as f64 * 0.5);
        insert_film(db, FILM_BASE + f, &format!("Film {f:02}"), rating).await;
    }
    for p in 1..=PERSONS {
        insert_person(db, PERSON_BASE + p, &format!("Person {p:02}")).await;
    }

    let roles = ["actor", "director", "screenwriter"];
    for f in 0..FILMS {
        let film = FILM_BASE + f + 1;
        insert_genre_link(db, GENRE_LINK_BASE + 2 * f + 1, film, f + 1).await;
        insert_genre_link(db, GENRE_LINK_BASE + 2 * f + 2, film, (f + 12) % GENRES + 1).await;
        insert_person_link(
            db,
            PERSON_LINK_BASE + 2 * f + 1,
            film,
            PERSON_BASE + f + 1,
            roles[(f % 3) as usize],
        )
        .await;
        insert_person_link(
            db,
            PERSON_LINK_BASE + 2 * f + 2,
            film,
            PERSON_BASE + (f + 3) % PERSONS + 1,
            roles[((f + 1) % 3) as usize],
        )
        .await;
    }
}

/// Every record of `table`, read page by page from offset zero.
pub async fn scan(store: &impl PageSource, table: Table) -> Vec<Record> {
    let mut cursor = Cursor::start();
    let mut records = Vec::new();
    loop {
        let page = store.next_page(table, cursor).await.expect("page");
        if page.is_empty() {
            return records;
        }
        records.extend(page.records);
        cursor = page.next;
    }
}
