use mechlink::{app, db, events, AppConfig, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("startup error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let db_url =
        dotenv::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://./data/mechlink.db".to_string());
    let db_pool = db::connect(&db_url).await?;
    db::run_migrations(&db_pool).await?;
    db::seed_admin(&db_pool).await?;

    let state = AppState {
        db_pool,
        events: events::channel(),
        config: AppConfig::from_env(),
    };

    let addr = dotenv::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    tracing::info!(%addr, "starting mechlink");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}
