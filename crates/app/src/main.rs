use std::time::Duration;

use engine::{AdminAccount, BcryptCredentials};
use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "khata={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let Some(server) = settings.server else {
        tracing::warn!("no [server] settings found, nothing to run");
        return Ok(());
    };
    tracing::info!("Found server settings...");

    let db = parse_database(&server.database).await?;
    let mut builder = engine::Engine::builder()
        .database(db)
        .credentials(BcryptCredentials::new(settings.engine.bcrypt_cost))
        .lock_timeout(Duration::from_millis(settings.engine.lock_timeout_ms));
    match settings.admin {
        Some(admin) => {
            builder = builder.admin(AdminAccount {
                login_name: admin.login_name,
                password_hash: admin.password_hash,
            });
        }
        None => tracing::warn!("no [admin] settings found, admin login is disabled"),
    }
    let engine = builder.build().await?;

    let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    server::run_with_listener(engine, listener).await?;

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
