//! Schema runner for the khata database.
//!
//! `migration [up|down|fresh|status]`, defaulting to `up`. The database is
//! taken from `DATABASE_URL`, falling back to `./khata.db`.

use sea_orm::Database;
use sea_orm_migration::prelude::*;

const DEFAULT_DATABASE_URL: &str = "sqlite:./khata.db?mode=rwc";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cmd = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());
    let db_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

    let db = Database::connect(&db_url).await?;

    match cmd.as_str() {
        "up" => {
            migration::Migrator::up(&db, None).await?;
            println!("khata schema is up to date ({db_url})");
        }
        // Dropping the schema deletes every principal and ledger entry.
        "down" => migration::Migrator::down(&db, None).await?,
        "fresh" => migration::Migrator::fresh(&db).await?,
        "status" => migration::Migrator::status(&db).await?,
        other => {
            eprintln!("unknown command `{other}`");
            eprintln!("usage: migration [up|down|fresh|status] (DATABASE_URL={DEFAULT_DATABASE_URL})");
            std::process::exit(2);
        }
    }

    Ok(())
}
