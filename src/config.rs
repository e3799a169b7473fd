use std::path::PathBuf;

use anyhow::{Context, bail};

use crate::{page::DEFAULT_PAGE_SIZE, schema::FieldSet};

#[derive(Clone, Debug)]
pub struct Config {
    pub sqlite_path: PathBuf,
    pub destination_url: String,
    pub destination_schema: String,
    pub fields: FieldSet,
    pub page_size: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let sqlite_path =
            PathBuf::from(lookup("SQLITE_PATH").unwrap_or_else(|| "db.sqlite".to_string()));

        let destination_url = match lookup("DATABASE_URL") {
            Some(url) => url,
            None => {
                let host = lookup("DB_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
                let port: u16 = lookup("DB_PORT")
                    .unwrap_or_else(|| "5432".to_string())
                    .parse()
                    .context("DB_PORT")?;
                let user = lookup("DB_USER").context("DB_USER is not set")?;
                let password = lookup("DB_PASSWORD").context("DB_PASSWORD is not set")?;
                let name = lookup("DB_NAME").context("DB_NAME is not set")?;
                format!(
                    "postgres://{}:{}@{host}:{port}/{}",
                    urlencoding::encode(&user),
                    urlencoding::encode(&password),
                    urlencoding::encode(&name)
                )
            },
        };

        let destination_schema = lookup("DB_SCHEMA").unwrap_or_else(|| "content".to_string());

        let fields = match lookup("SCHEMA_VARIANT") {
            Some(variant) => variant.parse::<FieldSet>().context("SCHEMA_VARIANT")?,
            None => FieldSet::current(),
        };

        let page_size: u64 = match lookup("PAGE_SIZE") {
            Some(size) => size.parse().context("PAGE_SIZE")?,
            None => DEFAULT_PAGE_SIZE,
        };
        if page_size == 0 {
            bail!("PAGE_SIZE must be greater than zero");
        }

        Ok(Self { sqlite_path, destination_url, destination_schema, fields, page_size })
    }

    pub fn source_url(&self) -> String {
        format!("sqlite://{}?mode=ro", self.sqlite_path.display())
    }
}
