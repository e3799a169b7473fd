pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,movies_etl=debug,sqlx=warn".to_string()),
        )
        .with_writer(std::io::stderr)
        .init();
}
