use todo_api::config::AppConfig;

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; real deployments set variables directly.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        environment = %config.environment,
        port = config.port,
        has_database_url = config.database.url.is_some(),
        "starting todo api"
    );

    let repo = todo_api::postgres_repository(&config.database);
    let _rocket = todo_api::rocket(config, repo).launch().await?;

    Ok(())
}
