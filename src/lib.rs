pub mod checker;
pub mod config;
pub mod db;
pub mod driver;
pub mod error;
pub mod logging;
pub mod models;
pub mod page;
pub mod reader;
pub mod schema;
pub mod writer;

use tracing::info;

use crate::{
    config::Config,
    db::{Store, StoreRole},
    error::EtlResult,
    reader::SourceReader,
    schema::Layout,
    writer::DestinationWriter,
};

/// Opens both stores and validates the configured field set against them.
pub async fn open(config: &Config) -> EtlResult<(SourceReader, DestinationWriter)> {
    let source = Store::connect(&config.source_url(), StoreRole::Source, None).await?;
    let destination = Store::connect(
        &config.destination_url,
        StoreRole::Destination,
        Some(config.destination_schema.clone()),
    )
    .await?;

    let layout = Layout::resolve(
        config.fields,
        &source.live_columns().await?,
        &destination.live_columns().await?,
    )?;
    info!(source = %config.sqlite_path.display(), page_size = config.page_size, "stores ready");

    Ok((
        SourceReader::new(source, layout.clone(), config.page_size),
        DestinationWriter::new(destination, layout, config.page_size),
    ))
}
