use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use thiserror::Error;
use tracing::info;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

#[derive(Error, Debug)]
pub enum DatabaseSetupError {
    #[error("Failed to connect to database: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("Failed to run migrations: {0}")]
    Migration(String),
}

pub fn establish_connection(
    database_url: &str,
    run_migrations: bool,
) -> Result<SqliteConnection, DatabaseSetupError> {
    let mut connection = SqliteConnection::establish(database_url)?;

    if run_migrations {
        let applied = connection
            .run_pending_migrations(MIGRATIONS)
            .map_err(|err| DatabaseSetupError::Migration(err.to_string()))?;
        info!(count = applied.len(), "Applied pending migrations");
    }

    Ok(connection)
}

/// Fresh private database with the schema applied.
pub fn establish_in_memory_connection() -> Result<SqliteConnection, DatabaseSetupError> {
    establish_connection(":memory:", true)
}
