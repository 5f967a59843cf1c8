use storybook_illustrator::{logger, server, Config};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let env_loaded = dotenv::dotenv().is_ok();

    if let Err(e) = logger::init_with_config(logger::LoggerConfig::from_env()) {
        eprintln!("{}", e);
    }

    if env_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let config = Config::from_env();
    logger::log_startup_info(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        config.port.unwrap_or(8080),
    );
    logger::log_config_info(&config);

    if config.gemini.api_key.is_none() {
        log::warn!("⚠️  GEMINI_API_KEY missing: generation endpoints will return configuration errors");
    }

    server::run(config).await
}
