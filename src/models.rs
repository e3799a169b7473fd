use std::{collections::BTreeMap, fmt, str::FromStr};

use sea_orm::{
    Value,
    prelude::{Date, DateTimeUtc, Uuid},
    sea_query::{Nullable, ValueType},
};

use crate::schema::Table;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FilmworkType {
    Movie,
    TvShow,
}

impl FilmworkType {
    pub fn as_str(self) -> &'static str {
        match self {
            FilmworkType::Movie => "movie",
            FilmworkType::TvShow => "tv_show",
        }
    }
}

impl FromStr for FilmworkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(FilmworkType::Movie),
            "tv_show" => Ok(FilmworkType::TvShow),
            other => Err(format!("unknown film work type `{other}`")),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PersonRole {
    Screenwriter,
    Actor,
    Director,
}

impl PersonRole {
    pub fn as_str(self) -> &'static str {
        match self {
            PersonRole::Screenwriter => "screenwriter",
            PersonRole::Actor => "actor",
            PersonRole::Director => "director",
        }
    }
}

impl FromStr for PersonRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "screenwriter" => Ok(PersonRole::Screenwriter),
            "actor" => Ok(PersonRole::Actor),
            "director" => Ok(PersonRole::Director),
            other => Err(format!("unknown person role `{other}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Genre {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Person {
    pub id: Uuid,
    pub full_name: String,
    pub birth_date: Option<Date>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Filmwork {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub creation_date: Option<Date>,
    pub certificate: Option<String>,
    pub file_path: Option<String>,
    pub rating: Option<f64>,
    pub kind: FilmworkType,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenreFilmwork {
    pub id: Uuid,
    pub film_work_id: Uuid,
    pub genre_id: Uuid,
    pub created_at: DateTimeUtc,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PersonFilmwork {
    pub id: Uuid,
    pub film_work_id: Uuid,
    pub person_id: Uuid,
    pub role: PersonRole,
    pub created_at: DateTimeUtc,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    Genre(Genre),
    Filmwork(Filmwork),
    Person(Person),
    GenreFilmwork(GenreFilmwork),
    PersonFilmwork(PersonFilmwork),
}

impl Record {
    pub fn table(&self) -> Table {
        match self {
            Record::Genre(_) => Table::Genre,
            Record::Filmwork(_) => Table::Filmwork,
            Record::Person(_) => Table::Person,
            Record::GenreFilmwork(_) => Table::GenreFilmwork,
            Record::PersonFilmwork(_) => Table::PersonFilmwork,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Record::Genre(r) => r.id,
            Record::Filmwork(r) => r.id,
            Record::Person(r) => r.id,
            Record::GenreFilmwork(r) => r.id,
            Record::PersonFilmwork(r) => r.id,
        }
    }

    /// Builds the record for `table` from a row keyed by column name.
    ///
    /// Nullable columns missing from the row default to `None`; any other
    /// missing column, a NULL in a non-null column, or an out-of-range value
    /// is an error.
    pub fn from_row(table: Table, row: &Row) -> Result<Self, String> {
        let record = match table {
            Table::Genre => Record::Genre(Genre {
                id: row.get("id")?,
                name: row.get("name")?,
                description: row.get_nullable("description")?,
                created_at: row.get("created_at")?,
                updated_at: row.get("updated_at")?,
            }),
            Table::Filmwork => {
                let rating: Option<f64> = row.get_nullable("rating")?;
                if let Some(rating) = rating {
                    if !(0.0..=10.0).contains(&rating) {
                        return Err(format!("rating {rating} outside [0, 10]"));
                    }
                }
                let kind: String = row.get("type")?;
                Record::Filmwork(Filmwork {
                    id: row.get("id")?,
                    title: row.get("title")?,
                    description: row.get_nullable("description")?,
                    creation_date: row.get_nullable("creation_date")?,
                    certificate: row.get_nullable("certificate")?,
                    file_path: row.get_nullable("file_path")?,
                    rating,
                    kind: kind.parse()?,
                    created_at: row.get("created_at")?,
                    updated_at: row.get("updated_at")?,
                })
            },
            Table::Person => Record::Person(Person {
                id: row.get("id")?,
                full_name: row.get("full_name")?,
                birth_date: row.get_nullable("birth_date")?,
                created_at: row.get("created_at")?,
                updated_at: row.get("updated_at")?,
            }),
            Table::GenreFilmwork => Record::GenreFilmwork(GenreFilmwork {
                id: row.get("id")?,
                film_work_id: row.get("film_work_id")?,
                genre_id: row.get("genre_id")?,
                created_at: row.get("created_at")?,
            }),
            Table::PersonFilmwork => {
                let role: String = row.get("role")?;
                Record::PersonFilmwork(PersonFilmwork {
                    id: row.get("id")?,
                    film_work_id: row.get("film_work_id")?,
                    person_id: row.get("person_id")?,
                    role: role.parse()?,
                    created_at: row.get("created_at")?,
                })
            },
        };
        Ok(record)
    }

    /// The value bound for `column`, or `None` if the record has no such field.
    pub fn value(&self, column: &str) -> Option<Value> {
        let value = match (self, column) {
            (_, "id") => self.id().into(),
            (Record::Genre(r), "name") => r.name.clone().into(),
            (Record::Genre(r), "description") => r.description.clone().into(),
            (Record::Genre(r), "created_at") => r.created_at.into(),
            (Record::Genre(r), "updated_at") => r.updated_at.into(),
            (Record::Filmwork(r), "title") => r.title.clone().into(),
            (Record::Filmwork(r), "description") => r.description.clone().into(),
            (Record::Filmwork(r), "creation_date") => r.creation_date.into(),
            (Record::Filmwork(r), "certificate") => r.certificate.clone().into(),
            (Record::Filmwork(r), "file_path") => r.file_path.clone().into(),
            (Record::Filmwork(r), "rating") => r.rating.into(),
            (Record::Filmwork(r), "type") => r.kind.as_str().into(),
            (Record::Filmwork(r), "created_at") => r.created_at.into(),
            (Record::Filmwork(r), "updated_at") => r.updated_at.into(),
            (Record::Person(r), "full_name") => r.full_name.clone().into(),
            (Record::Person(r), "birth_date") => r.birth_date.into(),
            (Record::Person(r), "created_at") => r.created_at.into(),
            (Record::Person(r), "updated_at") => r.updated_at.into(),
            (Record::GenreFilmwork(r), "film_work_id") => r.film_work_id.into(),
            (Record::GenreFilmwork(r), "genre_id") => r.genre_id.into(),
            (Record::GenreFilmwork(r), "created_at") => r.created_at.into(),
            (Record::PersonFilmwork(r), "film_work_id") => r.film_work_id.into(),
            (Record::PersonFilmwork(r), "person_id") => r.person_id.into(),
            (Record::PersonFilmwork(r), "role") => r.role.as_str().into(),
            (Record::PersonFilmwork(r), "created_at") => r.created_at.into(),
            _ => return None,
        };
        Some(value)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table(), self.id())
    }
}

/// One fetched row, keyed by column name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row(BTreeMap<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: &str, value: impl Into<Value>) {
        self.0.insert(column.to_string(), value.into());
    }

    pub fn get<T: ValueType>(&self, column: &str) -> Result<T, String> {
        let value = self.0.get(column).ok_or_else(|| format!("missing column `{column}`"))?;
        <T as ValueType>::try_from(value.clone())
            .map_err(|_| format!("column `{column}` is NULL or mistyped"))
    }

    pub fn get_nullable<T: ValueType + Nullable>(&self, column: &str) -> Result<Option<T>, String> {
        match self.0.get(column) {
            None => Ok(None),
            Some(value) => <Option<T> as ValueType>::try_from(value.clone())
                .map_err(|_| format!("column `{column}` is mistyped")),
        }
    }
}
