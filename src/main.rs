use movies_etl::{config::Config, driver::MigrationDriver, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = Config::from_env()?;
    let (reader, writer) = movies_etl::open(&config).await?;

    let report = MigrationDriver::new(&reader, &writer).run().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
