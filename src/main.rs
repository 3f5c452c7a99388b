use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use event_admin::{config::Config, db, repository::Repositories, routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let repos = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url, config.database_max_connections).await?;
            if config.run_migrations {
                db::run_migrations(&pool).await?;
                info!("Database connected and migrations applied");
            } else {
                info!("Database connected");
            }
            Repositories::postgres(pool)
        }
        None => {
            warn!("DATABASE_URL not set, data is kept in memory and lost on exit");
            Repositories::in_memory()
        }
    };

    let app = routes::router(AppState { repos });

    let addr = format!("{}:{}", config.host, config.port);
    info!("event-admin listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
