use migration::{Migrator, MigratorTrait};
use settings::Database;
use tokio::sync::broadcast::error::RecvError;

mod settings;

const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "malipo={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    if let Some(server) = settings.server {
        let db = parse_database(&server.database).await?;

        let engine = engine::Engine::builder()
            .database(db.clone())
            .build()
            .await?;
        let mut events = engine.subscribe();

        tasks.spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => tracing::info!(?event, "settlement event"),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event logger lagged behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        let sweep_interval = server
            .sweep_interval_secs
            .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS);
        let sweeper = engine::Engine::builder()
            .database(db.clone())
            .build()
            .await?;
        tasks.spawn(async move {
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_secs(sweep_interval));
            loop {
                ticker.tick().await;
                match sweeper.release_due_holds(chrono::Utc::now()).await {
                    Ok(0) => {}
                    Ok(released) => tracing::info!(released, "auto-released due escrow holds"),
                    Err(err) => tracing::error!("auto-release sweep failed: {err}"),
                }
            }
        });

        tasks.spawn(async move {
            let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
            let addr = format!("{}:{}", bind, server.port);
            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => listener,
                Err(err) => {
                    tracing::error!("failed to bind server listener: {err}");
                    return;
                }
            };
            if let Err(err) = server::run_with_listener(engine, listener).await {
                tracing::error!("server failed: {err}");
            }
        });
    }

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
